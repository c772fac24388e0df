use std::sync::Arc;

use rstest::*;
use serde_json::json;
use solido_adapter::{
    backend::ChainConnector, AdapterSettings, ContractAdapter, MapAction, ReactiveContractStore,
};
use solido_primitives::{
    alloy::{
        dyn_abi::DynSolValue,
        primitives::{address, Address, U256},
    },
    contract::ContractImport,
    events::DecodedLog,
};

use super::mocks::MockConnector;

pub const NETWORK: &str = "local";

pub const TOKEN_ADDRESS: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");

/// first anvil dev account
pub const ACCOUNT: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

pub const PRIVATE_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub const TOKEN_ARTIFACT: &str = r#"{
    "abi": [
        {
            "type": "function",
            "name": "balanceOf",
            "inputs": [{ "name": "owner", "type": "address", "internalType": "address" }],
            "outputs": [{ "name": "", "type": "uint256", "internalType": "uint256" }],
            "stateMutability": "view"
        },
        {
            "type": "function",
            "name": "transfer",
            "inputs": [
                { "name": "to", "type": "address", "internalType": "address" },
                { "name": "amount", "type": "uint256", "internalType": "uint256" }
            ],
            "outputs": [{ "name": "", "type": "bool", "internalType": "bool" }],
            "stateMutability": "nonpayable"
        },
        {
            "type": "event",
            "name": "logNewTransfer",
            "inputs": [
                { "name": "from", "type": "address", "indexed": true, "internalType": "address" },
                { "name": "amount", "type": "uint256", "indexed": false, "internalType": "uint256" }
            ],
            "anonymous": false
        }
    ],
    "address": {
        "local": "0x5FbDB2315678afecb367f032d93F642f64180aa3"
    }
}"#;

#[fixture]
pub fn token_import() -> ContractImport {
    ContractImport::from_json(TOKEN_ARTIFACT).unwrap()
}

#[fixture]
pub fn connector() -> Arc<MockConnector> {
    Arc::new(MockConnector::default())
}

#[fixture]
pub fn adapter(token_import: ContractImport) -> ContractAdapter {
    ContractAdapter::new(token_import)
}

/// Store mirroring `balanceOf` into the `balanceOf` field on every transfer.
#[fixture]
pub fn balance_store() -> ReactiveContractStore {
    ReactiveContractStore::new()
        .with_action(
            "balance",
            MapAction::mirror_getter("balanceOf", "logNewTransfer"),
        )
        .with_field("balanceOf", json!("0"))
}

pub fn settings(connector: &Arc<MockConnector>) -> AdapterSettings {
    let provider: Arc<dyn ChainConnector> = connector.clone();
    AdapterSettings::new(provider, NETWORK, ACCOUNT)
}

pub fn transfer_log(amount: u64) -> DecodedLog {
    DecodedLog {
        event: "logNewTransfer".into(),
        address: TOKEN_ADDRESS,
        block_number: Some(1),
        transaction_hash: None,
        log_index: Some(0),
        indexed: vec![DynSolValue::Address(ACCOUNT)],
        body: vec![DynSolValue::Uint(U256::from(amount), 256)],
    }
}

pub fn uint(value: u64) -> DynSolValue {
    DynSolValue::Uint(U256::from(value), 256)
}
