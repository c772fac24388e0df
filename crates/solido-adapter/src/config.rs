use std::{fs, str::FromStr, time::Duration};

use serde::Deserialize;
use solido_primitives::alloy::primitives::{Address, B256};
use thiserror::Error;
use tracing::Level;
use url::Url;

fn default_poll_interval_ms() -> u64 {
    4_000
}

fn default_confirmations() -> u64 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdapterConfig {
    pub rpc_url: String,
    pub network: String,
    pub default_account: Address,
    pub artifact_path: String,
    pub log_level: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,
    pub event_name: Option<String>,
    /// view method mirrored into the store by `store_watch`
    pub getter: Option<String>,
    /// argument-less write method `store_watch` submits to start listening
    pub write_method: Option<String>,
    pub topics: Option<Vec<B256>>,
    pub from_block: Option<u64>,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileReadError(#[from] std::io::Error),
    #[error("Failed to parse JSON: {0}")]
    JsonParseError(#[from] serde_json::Error),
    #[error("Failed to parse URL: {0}")]
    UrlParseError(#[from] url::ParseError),
    #[error("Failed to parse log level: {0}")]
    LogLevelParseError(String),
}

impl AdapterConfig {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self, ConfigError> {
        let config: AdapterConfig = serde_json::from_str(data)?;
        Ok(config)
    }

    pub fn rpc_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.rpc_url).map_err(ConfigError::from)
    }

    pub fn log_level(&self) -> Result<Level, ConfigError> {
        Level::from_str(&self.log_level)
            .map_err(|_| ConfigError::LogLevelParseError(self.log_level.clone()))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
