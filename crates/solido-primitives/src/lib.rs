//! Core types shared by the solido adapter crates
//!
//! This module re-exports the alloy types the adapter speaks in so that every
//! crate in the workspace resolves the same versions.

pub mod alloy {
    pub mod primitives {
        pub use alloy::primitives::{address, b256, keccak256, Address, Bytes, TxHash, B256, U256};
    }

    pub mod dyn_abi {
        pub use alloy::dyn_abi::{DynSolType, DynSolValue, EventExt};
    }

    pub mod json_abi {
        pub use alloy::json_abi::{Event, EventParam, Function, JsonAbi, Param, StateMutability};
    }

    pub mod eips {
        pub use alloy::eips::BlockNumberOrTag;
    }
}

pub mod contract;
pub mod env;
pub mod error;
pub mod events;
pub mod topic;
pub mod values;

pub use error::{PrimitivesError, Result};
