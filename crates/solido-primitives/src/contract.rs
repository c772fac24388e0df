//! Contract artifacts: the ABI plus the deployed address per network.

use std::{collections::HashMap, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::alloy::{json_abi::JsonAbi, primitives::Address};
use crate::error::{PrimitivesError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractImport {
    pub abi: JsonAbi,
    /// deployed address keyed by network name
    pub address: HashMap<String, Address>,
}

impl ContractImport {
    pub fn new(abi: JsonAbi) -> Self {
        Self {
            abi,
            address: HashMap::new(),
        }
    }

    pub fn with_address(mut self, network: impl Into<String>, address: Address) -> Self {
        self.address.insert(network.into(), address);
        self
    }

    pub fn from_json(data: &str) -> Result<Self> {
        serde_json::from_str(data).map_err(|e| PrimitivesError::ArtifactParseError(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read_to_string(path.as_ref())
            .map_err(|e| PrimitivesError::ArtifactReadError(e.to_string()))?;
        Self::from_json(&data)
    }

    pub fn address_for(&self, network: &str) -> Option<Address> {
        self.address.get(network).copied()
    }
}
