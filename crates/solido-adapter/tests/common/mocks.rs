use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use solido_adapter::{
    backend::{ChainConnector, ContractBackend, LogStream, PendingTransaction, TxOverrides},
    AdapterError, CallOptions, ContractCapability, MethodCall, Result, SigningResult,
    TransactionSigner,
};
use solido_primitives::{
    alloy::{
        dyn_abi::DynSolValue,
        json_abi::{Event, Function, JsonAbi},
        primitives::{Address, TxHash},
    },
    events::{DecodedLog, EventFilterOptions, EventQuery},
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Every request a [`MockBackend`] received.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Call {
        name: String,
        args: Vec<DynSolValue>,
        from: Option<Address>,
    },
    Send {
        name: String,
        args: Vec<DynSolValue>,
        overrides: TxOverrides,
    },
    PastEvents {
        name: String,
        query: EventQuery,
    },
    Watch {
        name: String,
    },
    Receipt {
        tx_hash: TxHash,
        confirmations: u64,
    },
}

type LogSender = mpsc::UnboundedSender<Result<DecodedLog>>;

/// Recording contract binding. Call outputs are scripted per method name and
/// events are pushed with [`MockBackend::emit`].
pub struct MockBackend {
    address: Address,
    abi: Arc<JsonAbi>,
    signer: Option<Address>,
    calls: Mutex<Vec<BackendCall>>,
    outputs: Mutex<HashMap<String, Vec<DynSolValue>>>,
    watchers: Mutex<Vec<LogSender>>,
}

impl MockBackend {
    pub fn new(address: Address, abi: Arc<JsonAbi>, signer: Option<Address>) -> Self {
        Self {
            address,
            abi,
            signer,
            calls: Mutex::new(Vec::new()),
            outputs: Mutex::new(HashMap::new()),
            watchers: Mutex::new(Vec::new()),
        }
    }

    pub fn set_output(&self, name: &str, output: Vec<DynSolValue>) {
        self.outputs
            .lock()
            .unwrap()
            .insert(name.to_string(), output);
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sends(&self) -> Vec<BackendCall> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, BackendCall::Send { .. }))
            .collect()
    }

    /// Push a log to every open watcher, returns how many received it.
    pub fn emit(&self, log: DecodedLog) -> usize {
        let watchers = self.watchers.lock().unwrap();
        watchers
            .iter()
            .filter(|sender| sender.send(Ok(log.clone())).is_ok())
            .count()
    }

    pub fn emit_error(&self, message: &str) {
        for sender in self.watchers.lock().unwrap().iter() {
            let _ = sender.send(Err(AdapterError::LogParseError(message.to_string())));
        }
    }

    pub fn open_watchers(&self) -> usize {
        self.watchers
            .lock()
            .unwrap()
            .iter()
            .filter(|sender| !sender.is_closed())
            .count()
    }

    fn record(&self, call: BackendCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ContractBackend for MockBackend {
    fn address(&self) -> Address {
        self.address
    }

    fn abi(&self) -> &JsonAbi {
        &self.abi
    }

    fn signer_address(&self) -> Option<Address> {
        self.signer
    }

    async fn call_method(
        &self,
        name: &str,
        args: &[DynSolValue],
        from: Option<Address>,
    ) -> Result<Vec<DynSolValue>> {
        self.record(BackendCall::Call {
            name: name.to_string(),
            args: args.to_vec(),
            from,
        });
        Ok(self
            .outputs
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_default())
    }

    async fn send_method(
        &self,
        name: &str,
        args: &[DynSolValue],
        overrides: TxOverrides,
    ) -> Result<PendingTransaction> {
        self.record(BackendCall::Send {
            name: name.to_string(),
            args: args.to_vec(),
            overrides,
        });
        let nonce = self.sends().len() as u8;
        Ok(PendingTransaction {
            tx_hash: TxHash::with_last_byte(nonce),
            gas_limit: overrides.gas_limit,
        })
    }

    async fn get_past_events(&self, name: &str, query: &EventQuery) -> Result<Vec<DecodedLog>> {
        self.record(BackendCall::PastEvents {
            name: name.to_string(),
            query: query.clone(),
        });
        Ok(Vec::new())
    }

    async fn watch_event(&self, name: &str) -> Result<LogStream> {
        self.record(BackendCall::Watch {
            name: name.to_string(),
        });
        // opening a filter is a round trip on a real client
        tokio::task::yield_now().await;
        let (sender, receiver) = mpsc::unbounded_channel();
        self.watchers.lock().unwrap().push(sender);
        Ok(Box::pin(UnboundedReceiverStream::new(receiver)))
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash, confirmations: u64) -> Result<SigningResult> {
        self.record(BackendCall::Receipt {
            tx_hash,
            confirmations,
        });
        Ok(SigningResult {
            tx_hash,
            block_number: Some(1),
            success: true,
        })
    }
}

/// Records every bind and hands out a fresh [`MockBackend`] each time.
#[derive(Default)]
pub struct MockConnector {
    backends: Mutex<Vec<Arc<MockBackend>>>,
    outputs: Mutex<HashMap<String, Vec<DynSolValue>>>,
}

impl MockConnector {
    /// Output every backend created from now on returns for `name`.
    pub fn with_output(self, name: &str, output: Vec<DynSolValue>) -> Self {
        self.outputs
            .lock()
            .unwrap()
            .insert(name.to_string(), output);
        self
    }

    pub fn bind_count(&self) -> usize {
        self.backends.lock().unwrap().len()
    }

    /// Signer address seen by each bind, in order.
    pub fn credentials(&self) -> Vec<Option<Address>> {
        self.backends
            .lock()
            .unwrap()
            .iter()
            .map(|backend| backend.signer)
            .collect()
    }

    pub fn latest(&self) -> Arc<MockBackend> {
        self.backends
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no contract bound yet")
    }
}

impl ChainConnector for MockConnector {
    fn connect_contract(
        &self,
        address: Address,
        abi: Arc<JsonAbi>,
        credential: Option<&PrivateKeySigner>,
    ) -> Result<Arc<dyn ContractBackend>> {
        let backend = Arc::new(MockBackend::new(
            address,
            abi,
            credential.map(|signer| signer.address()),
        ));
        for (name, output) in self.outputs.lock().unwrap().iter() {
            backend.set_output(name, output.clone());
        }
        self.backends.lock().unwrap().push(backend.clone());
        Ok(backend)
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

#[derive(Debug, Clone)]
pub struct MockMethod {
    name: String,
}

#[async_trait]
impl MethodCall for MockMethod {
    fn name(&self) -> &str {
        &self.name
    }

    async fn submit(
        &self,
        _args: Vec<DynSolValue>,
        overrides: TxOverrides,
    ) -> Result<PendingTransaction> {
        Ok(PendingTransaction {
            tx_hash: TxHash::ZERO,
            gas_limit: overrides.gas_limit,
        })
    }
}

/// Contract capability that only records the order it was driven in.
pub struct MockContract {
    log: Mutex<Vec<String>>,
    backend: Arc<MockBackend>,
}

impl MockContract {
    pub fn new(backend: Arc<MockBackend>) -> Self {
        Self {
            log: Mutex::new(Vec::new()),
            backend,
        }
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl ContractCapability for MockContract {
    type Method = MockMethod;

    fn get_abi_method(&self, _name: &str) -> Option<Function> {
        None
    }

    fn get_method(&self, name: &str) -> Result<MockMethod> {
        self.record(format!("get_method:{name}"));
        Ok(MockMethod {
            name: name.to_string(),
        })
    }

    fn get_event(&self, name: &str) -> Result<Event> {
        Err(AdapterError::EventNotFound(name.to_string()))
    }

    async fn call_method(&self, name: &str, args: Vec<DynSolValue>) -> Result<Vec<DynSolValue>> {
        self.record(format!("call_method:{name}"));
        Ok(args)
    }

    async fn prepare_signing<M>(
        &self,
        method: M,
        options: &CallOptions,
        args: Vec<DynSolValue>,
    ) -> Result<TransactionSigner>
    where
        M: MethodCall + 'static,
    {
        self.record(format!("prepare_signing:{}", method.name()));
        let overrides = TxOverrides {
            gas_limit: options.gas_limit(),
            from: None,
        };
        let tx = method.submit(args, overrides).await?;
        Ok(TransactionSigner::new(self.backend.clone(), tx))
    }

    async fn get_events(
        &self,
        name: &str,
        _options: Option<EventFilterOptions>,
    ) -> Result<Vec<DecodedLog>> {
        self.record(format!("get_events:{name}"));
        Ok(Vec::new())
    }
}
