//! Projection of decoded ABI values into JSON for application state.

use alloy::hex;
use serde_json::Value;

use crate::alloy::dyn_abi::DynSolValue;

/// Convert a decoded ABI value to JSON. Integers become decimal strings so
/// 256-bit values survive the round trip; byte strings become `0x` hex.
pub fn dyn_value_to_json(value: &DynSolValue) -> Value {
    match value {
        DynSolValue::Bool(b) => Value::Bool(*b),
        DynSolValue::Int(i, _) => Value::String(i.to_string()),
        DynSolValue::Uint(u, _) => Value::String(u.to_string()),
        DynSolValue::FixedBytes(word, size) => Value::String(hex::encode_prefixed(&word[..*size])),
        DynSolValue::Address(address) => Value::String(address.to_checksum(None)),
        DynSolValue::Function(function) => Value::String(function.to_string()),
        DynSolValue::Bytes(bytes) => Value::String(hex::encode_prefixed(bytes)),
        DynSolValue::String(s) => Value::String(s.clone()),
        DynSolValue::Array(values) | DynSolValue::FixedArray(values) | DynSolValue::Tuple(values) => {
            Value::Array(values.iter().map(dyn_value_to_json).collect())
        }
        #[allow(unreachable_patterns)]
        _ => Value::Null,
    }
}

/// Project a call output: a single return value is unwrapped, several become
/// a JSON array.
pub fn outputs_to_json(outputs: &[DynSolValue]) -> Value {
    match outputs {
        [] => Value::Null,
        [single] => dyn_value_to_json(single),
        many => Value::Array(many.iter().map(dyn_value_to_json).collect()),
    }
}
