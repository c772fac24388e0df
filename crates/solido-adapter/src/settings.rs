//! Bind-time settings and per-call options.

use std::{fmt, sync::Arc};

use solido_primitives::alloy::primitives::Address;

use crate::backend::ChainConnector;
use crate::store::ReactiveContractStore;

/// Gas limit applied to write calls that do not specify one.
pub const DEFAULT_GAS_LIMIT: u64 = 1_000_000;

/// Settings applied by `on_ready`.
#[derive(Clone)]
pub struct AdapterSettings {
    pub provider: Arc<dyn ChainConnector>,
    pub network: String,
    pub default_account: Address,
    pub private_key: Option<String>,
    pub store: Option<ReactiveContractStore>,
}

impl AdapterSettings {
    pub fn new(
        provider: Arc<dyn ChainConnector>,
        network: impl Into<String>,
        default_account: Address,
    ) -> Self {
        Self {
            provider,
            network: network.into(),
            default_account,
            private_key: None,
            store: None,
        }
    }

    pub fn with_private_key(mut self, private_key: impl Into<String>) -> Self {
        self.private_key = Some(private_key.into());
        self
    }

    pub fn with_store(mut self, store: ReactiveContractStore) -> Self {
        self.store = Some(store);
        self
    }
}

impl fmt::Debug for AdapterSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterSettings")
            .field("provider", &self.provider)
            .field("network", &self.network)
            .field("default_account", &self.default_account)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("store", &self.store)
            .finish()
    }
}

/// Selective overrides applied by `set_instance_options`. The provider is
/// always replaced, every other field only when present.
#[derive(Clone)]
pub struct InstanceOptions {
    pub provider: Arc<dyn ChainConnector>,
    pub network: Option<String>,
    pub default_account: Option<Address>,
    pub private_key: Option<String>,
    pub store: Option<ReactiveContractStore>,
}

impl InstanceOptions {
    pub fn new(provider: Arc<dyn ChainConnector>) -> Self {
        Self {
            provider,
            network: None,
            default_account: None,
            private_key: None,
            store: None,
        }
    }

    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    pub fn with_default_account(mut self, default_account: Address) -> Self {
        self.default_account = Some(default_account);
        self
    }

    pub fn with_private_key(mut self, private_key: impl Into<String>) -> Self {
        self.private_key = Some(private_key.into());
        self
    }

    pub fn with_store(mut self, store: ReactiveContractStore) -> Self {
        self.store = Some(store);
        self
    }
}

impl fmt::Debug for InstanceOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceOptions")
            .field("provider", &self.provider)
            .field("network", &self.network)
            .field("default_account", &self.default_account)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("store", &self.store)
            .finish()
    }
}

/// Options of a single read or write call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// gas limit for writes, [`DEFAULT_GAS_LIMIT`] when unset
    pub gas: Option<u64>,
    /// map action key whose listener a write should register
    pub dispatch: Option<String>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gas(mut self, gas: u64) -> Self {
        self.gas = Some(gas);
        self
    }

    pub fn with_dispatch(mut self, dispatch: impl Into<String>) -> Self {
        self.dispatch = Some(dispatch.into());
        self
    }

    pub fn gas_limit(&self) -> u64 {
        self.gas.unwrap_or(DEFAULT_GAS_LIMIT)
    }
}
