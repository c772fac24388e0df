//! Seam between the adapter and the chain client.
//!
//! The adapter only ever talks to a [`ChainConnector`] (the provider handle it
//! is configured with) and the [`ContractBackend`] bindings it produces.

use std::{fmt, pin::Pin, sync::Arc};

use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use futures::Stream;
use solido_primitives::{
    alloy::{
        dyn_abi::DynSolValue,
        json_abi::JsonAbi,
        primitives::{Address, TxHash},
    },
    events::{DecodedLog, EventQuery},
};

use crate::error::Result;
use crate::signer::SigningResult;

pub mod alloy_http;

pub use alloy_http::{AlloyContract, HttpConnector};

// type alias for the stream of decoded logs delivered to event listeners
pub type LogStream = Pin<Box<dyn Stream<Item = Result<DecodedLog>> + Send>>;

/// Transaction parameters appended to a write call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxOverrides {
    pub gas_limit: u64,
    /// Sender used when the binding carries no signer.
    pub from: Option<Address>,
}

/// Handle of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTransaction {
    pub tx_hash: TxHash,
    pub gas_limit: u64,
}

/// Opaque chain client handle. Produces contract bindings, credential bearing
/// when a signer is supplied.
pub trait ChainConnector: Send + Sync {
    fn connect_contract(
        &self,
        address: Address,
        abi: Arc<JsonAbi>,
        credential: Option<&PrivateKeySigner>,
    ) -> Result<Arc<dyn ContractBackend>>;

    fn describe(&self) -> String;
}

impl fmt::Debug for dyn ChainConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainConnector")
            .field("endpoint", &self.describe())
            .finish()
    }
}

/// A contract bound to a chain client.
#[async_trait]
pub trait ContractBackend: Send + Sync {
    fn address(&self) -> Address;

    fn abi(&self) -> &JsonAbi;

    /// Address of the signing credential, `None` for read-only bindings.
    fn signer_address(&self) -> Option<Address>;

    async fn call_method(
        &self,
        name: &str,
        args: &[DynSolValue],
        from: Option<Address>,
    ) -> Result<Vec<DynSolValue>>;

    async fn send_method(
        &self,
        name: &str,
        args: &[DynSolValue],
        overrides: TxOverrides,
    ) -> Result<PendingTransaction>;

    async fn get_past_events(&self, name: &str, query: &EventQuery) -> Result<Vec<DecodedLog>>;

    async fn watch_event(&self, name: &str) -> Result<LogStream>;

    async fn wait_for_receipt(&self, tx_hash: TxHash, confirmations: u64) -> Result<SigningResult>;
}

impl fmt::Debug for dyn ContractBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractBackend")
            .field("address", &self.address())
            .field("signer", &self.signer_address())
            .finish()
    }
}
