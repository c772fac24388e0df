//! The two capabilities an adapter exposes to the orchestration layer.

use async_trait::async_trait;
use solido_primitives::{
    alloy::{
        dyn_abi::DynSolValue,
        json_abi::{Event, Function},
        primitives::Address,
    },
    events::{DecodedLog, EventFilterOptions},
};

use crate::backend::{PendingTransaction, TxOverrides};
use crate::error::Result;
use crate::settings::{AdapterSettings, CallOptions, InstanceOptions};
use crate::signer::TransactionSigner;

/// Chain client family behind an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    Alloy,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::Alloy => "alloy",
        }
    }
}

/// Binding lifecycle of a provider backed contract.
pub trait ProviderCapability {
    fn provider_type(&self) -> ProviderType;

    fn describe(&self) -> String;

    fn network(&self) -> Option<&str>;

    fn address(&self) -> Option<Address>;

    fn on_ready(&mut self, settings: AdapterSettings) -> Result<()>;

    fn connect(&mut self) -> Result<()>;

    fn set_instance_options(&mut self, options: InstanceOptions) -> Result<()>;
}

/// A contract method resolved by name, ready to be submitted.
#[async_trait]
pub trait MethodCall: Send + Sync {
    fn name(&self) -> &str;

    async fn submit(
        &self,
        args: Vec<DynSolValue>,
        overrides: TxOverrides,
    ) -> Result<PendingTransaction>;
}

/// Method dispatch and event queries against a bound contract.
#[async_trait]
pub trait ContractCapability: Send + Sync {
    type Method: MethodCall + 'static;

    fn get_abi_method(&self, name: &str) -> Option<Function>;

    fn get_method(&self, name: &str) -> Result<Self::Method>;

    fn get_event(&self, name: &str) -> Result<Event>;

    async fn call_method(&self, name: &str, args: Vec<DynSolValue>) -> Result<Vec<DynSolValue>>;

    async fn prepare_signing<M>(
        &self,
        method: M,
        options: &CallOptions,
        args: Vec<DynSolValue>,
    ) -> Result<TransactionSigner>
    where
        M: MethodCall + 'static;

    async fn get_events(
        &self,
        name: &str,
        options: Option<EventFilterOptions>,
    ) -> Result<Vec<DecodedLog>>;
}
