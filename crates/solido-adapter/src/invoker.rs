//! Explicit read/write/event invokers, classified once from the contract ABI.

use std::collections::BTreeMap;

use solido_primitives::{
    alloy::{
        dyn_abi::DynSolValue,
        json_abi::{JsonAbi, StateMutability},
    },
    events::{DecodedLog, EventFilterOptions},
};

use crate::capability::ContractCapability;
use crate::error::{AdapterError, Result};
use crate::settings::CallOptions;
use crate::signer::TransactionSigner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Read,
    Write,
    Events,
}

impl Dispatch {
    pub fn for_mutability(mutability: StateMutability) -> Self {
        match mutability {
            StateMutability::Pure | StateMutability::View => Dispatch::Read,
            StateMutability::NonPayable | StateMutability::Payable => Dispatch::Write,
        }
    }
}

/// Calls a view method and returns its decoded output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadInvoker {
    method: String,
}

impl ReadInvoker {
    pub fn method(&self) -> &str {
        &self.method
    }

    pub async fn invoke<C>(&self, contract: &C, args: Vec<DynSolValue>) -> Result<Vec<DynSolValue>>
    where
        C: ContractCapability,
    {
        contract.call_method(&self.method, args).await
    }
}

/// Resolves a state changing method and hands back its signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteInvoker {
    method: String,
    options: CallOptions,
}

impl WriteInvoker {
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn options(&self) -> &CallOptions {
        &self.options
    }

    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    pub async fn invoke<C>(&self, contract: &C, args: Vec<DynSolValue>) -> Result<TransactionSigner>
    where
        C: ContractCapability,
    {
        let method = contract.get_method(&self.method)?;
        contract.prepare_signing(method, &self.options, args).await
    }
}

/// Queries the past emissions of one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventsInvoker {
    event: String,
}

impl EventsInvoker {
    pub fn event(&self) -> &str {
        &self.event
    }

    pub async fn invoke<C>(
        &self,
        contract: &C,
        options: Option<EventFilterOptions>,
    ) -> Result<Vec<DecodedLog>>
    where
        C: ContractCapability,
    {
        contract.get_events(&self.event, options).await
    }
}

pub fn read_invoker(method: impl Into<String>) -> ReadInvoker {
    ReadInvoker {
        method: method.into(),
    }
}

pub fn write_invoker(method: impl Into<String>) -> WriteInvoker {
    WriteInvoker {
        method: method.into(),
        options: CallOptions::default(),
    }
}

pub fn events_invoker(event: impl Into<String>) -> EventsInvoker {
    EventsInvoker {
        event: event.into(),
    }
}

/// Name to dispatch kind table. A function shadows an event of the same name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodRegistry {
    entries: BTreeMap<String, Dispatch>,
}

impl MethodRegistry {
    pub fn from_abi(abi: &JsonAbi) -> Self {
        let mut entries = BTreeMap::new();
        for event in abi.events() {
            entries.insert(event.name.clone(), Dispatch::Events);
        }
        for function in abi.functions() {
            entries.insert(
                function.name.clone(),
                Dispatch::for_mutability(function.state_mutability),
            );
        }
        Self { entries }
    }

    /// Override or add a classification.
    pub fn declare(mut self, name: impl Into<String>, dispatch: Dispatch) -> Self {
        self.entries.insert(name.into(), dispatch);
        self
    }

    pub fn dispatch(&self, name: &str) -> Option<Dispatch> {
        self.entries.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn read(&self, name: &str) -> Result<ReadInvoker> {
        self.ensure_kind(name, Dispatch::Read)?;
        Ok(read_invoker(name))
    }

    pub fn write(&self, name: &str) -> Result<WriteInvoker> {
        self.ensure_kind(name, Dispatch::Write)?;
        Ok(write_invoker(name))
    }

    pub fn events(&self, name: &str) -> Result<EventsInvoker> {
        self.ensure_kind(name, Dispatch::Events)?;
        Ok(events_invoker(name))
    }

    fn ensure_kind(&self, name: &str, wanted: Dispatch) -> Result<()> {
        match self.dispatch(name) {
            Some(found) if found == wanted => Ok(()),
            Some(found) => Err(AdapterError::ConfigError(format!(
                "{} is declared as {:?}, not {:?}",
                name, found, wanted
            ))),
            None if wanted == Dispatch::Events => Err(AdapterError::EventNotFound(name.into())),
            None => Err(AdapterError::MethodNotFound(name.into())),
        }
    }
}
