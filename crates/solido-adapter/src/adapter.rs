//! Contract adapter: owns the chain client binding, dispatches calls, builds
//! event queries and bridges events into the reactive store.

use std::{
    collections::HashMap,
    fmt,
    str::FromStr,
    sync::{Arc, Mutex, PoisonError},
};

use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use solido_primitives::{
    alloy::{
        dyn_abi::DynSolValue,
        json_abi::{Event, Function, JsonAbi},
        primitives::Address,
    },
    contract::ContractImport,
    events::{DecodedLog, EventFilterOptions, EventQuery},
};
use tokio::task::JoinHandle;

use crate::backend::{ChainConnector, ContractBackend, PendingTransaction, TxOverrides};
use crate::capability::{ContractCapability, MethodCall, ProviderCapability, ProviderType};
use crate::error::{AdapterError, Result};
use crate::reconciler::EventReconciler;
use crate::settings::{AdapterSettings, CallOptions, InstanceOptions};
use crate::signer::TransactionSigner;
use crate::store::{
    FieldSubscription, MapAction, ReactiveContractStore, StoreChannel, StoreState,
    DEFAULT_CHANNEL_CAPACITY,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    Unbound,
    Ready,
    Rebound,
}

/// Resolved contract binding for one network.
#[derive(Debug, Clone)]
pub struct ContractBinding {
    pub network: String,
    pub address: Address,
    pub abi: Arc<JsonAbi>,
    pub client: Arc<dyn ContractBackend>,
}

/// (dispatch key, event name)
type ListenerKey = (String, String);

/// Registered event listeners. A key is reserved under the lock before the
/// watch is opened, so concurrent write calls register a pair only once.
#[derive(Debug, Default)]
struct ListenerRegistry {
    listeners: Mutex<HashMap<ListenerKey, Option<JoinHandle<()>>>>,
}

impl ListenerRegistry {
    /// Claim `key`; false when it is already reserved or running.
    fn reserve(&self, key: &ListenerKey) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        if listeners.contains_key(key) {
            return false;
        }
        listeners.insert(key.clone(), None);
        true
    }

    fn activate(&self, key: ListenerKey, handle: JoinHandle<()>) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Some(handle));
    }

    fn release(&self, key: &ListenerKey) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    fn count_for_event(&self, event: &str) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|((_, registered), handle)| {
                registered == event && handle.as_ref().is_some_and(|h| !h.is_finished())
            })
            .count()
    }

    fn abort_all(&self) {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        for handle in listeners.drain().filter_map(|(_, handle)| handle) {
            handle.abort();
        }
    }
}

/// Settings a bind is attempted with. Fields are copied onto the adapter only
/// once the bind succeeds.
struct PendingSettings {
    provider: Option<Arc<dyn ChainConnector>>,
    network: Option<String>,
    default_account: Option<Address>,
    private_key: Option<String>,
    store: Option<ReactiveContractStore>,
    store_replaced: bool,
}

/// Contract method bound to the adapter's client.
#[derive(Debug, Clone)]
pub struct ContractMethod {
    name: String,
    client: Arc<dyn ContractBackend>,
}

#[async_trait]
impl MethodCall for ContractMethod {
    fn name(&self) -> &str {
        &self.name
    }

    async fn submit(
        &self,
        args: Vec<DynSolValue>,
        overrides: TxOverrides,
    ) -> Result<PendingTransaction> {
        self.client.send_method(&self.name, &args, overrides).await
    }
}

pub struct ContractAdapter {
    import: ContractImport,
    abi: Arc<JsonAbi>,
    provider: Option<Arc<dyn ChainConnector>>,
    network: Option<String>,
    default_account: Option<Address>,
    private_key: Option<String>,
    store: Option<ReactiveContractStore>,
    binding: Option<ContractBinding>,
    channel: Option<StoreChannel>,
    listeners: ListenerRegistry,
    state: BindingState,
    confirmations: u64,
    channel_capacity: usize,
}

impl ContractAdapter {
    pub fn new(import: ContractImport) -> Self {
        let abi = Arc::new(import.abi.clone());
        Self {
            import,
            abi,
            provider: None,
            network: None,
            default_account: None,
            private_key: None,
            store: None,
            binding: None,
            channel: None,
            listeners: ListenerRegistry::default(),
            state: BindingState::Unbound,
            confirmations: 1,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Confirmations awaited by the signers this adapter hands out.
    pub fn with_confirmations(mut self, confirmations: u64) -> Self {
        self.confirmations = confirmations;
        self
    }

    pub fn with_channel_capacity(mut self, channel_capacity: usize) -> Self {
        self.channel_capacity = channel_capacity;
        self
    }

    pub fn state(&self) -> BindingState {
        self.state
    }

    pub fn binding(&self) -> Option<&ContractBinding> {
        self.binding.as_ref()
    }

    pub fn default_account(&self) -> Option<Address> {
        self.default_account
    }

    pub fn abi(&self) -> &JsonAbi {
        &self.abi
    }

    fn bound(&self) -> Result<&ContractBinding> {
        self.binding.as_ref().ok_or(AdapterError::NotBound)
    }

    /// Live subscription to one store field, only if the field exists now.
    pub fn subscribe(&self, key: &str) -> Option<FieldSubscription> {
        self.channel.as_ref()?.subscribe_field(key)
    }

    pub fn store_state(&self) -> Option<StoreState> {
        self.channel.as_ref().map(StoreChannel::snapshot)
    }

    /// Explicit external push through the store channel.
    pub fn publish(&self, state: StoreState) -> Result<usize> {
        let channel = self
            .channel
            .as_ref()
            .ok_or_else(|| AdapterError::ConfigError("no store configured".into()))?;
        Ok(channel.publish(state))
    }

    /// Number of live listeners registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.count_for_event(event)
    }

    fn map_action(&self, dispatch_key: &str) -> Option<&MapAction> {
        self.store.as_ref()?.map_actions.get(dispatch_key)
    }

    fn current_settings(&self) -> PendingSettings {
        PendingSettings {
            provider: self.provider.clone(),
            network: self.network.clone(),
            default_account: self.default_account,
            private_key: self.private_key.clone(),
            store: self.store.clone(),
            store_replaced: false,
        }
    }

    /// The single bind routine used by every lifecycle path. Nothing on the
    /// adapter changes unless the new binding is established.
    fn bind(&mut self, next: PendingSettings) -> Result<()> {
        let (provider, network) = match (&next.provider, &next.network, next.default_account) {
            (Some(provider), Some(network), Some(_)) => (provider.clone(), network.clone()),
            _ => {
                return Err(AdapterError::ConfigError(
                    "missing required settings".into(),
                ))
            }
        };

        let address = self
            .import
            .address_for(&network)
            .ok_or_else(|| AdapterError::UnknownNetwork(network.clone()))?;

        let credential = next
            .private_key
            .as_deref()
            .map(parse_credential)
            .transpose()?;

        let client = provider.connect_contract(address, self.abi.clone(), credential.as_ref())?;

        // listeners hold the previous client
        self.listeners.abort_all();

        let capacity = self.channel_capacity;
        let previous = self.channel.take();
        self.channel = next.store.as_ref().map(|store| {
            let seed = match previous {
                Some(previous) if !next.store_replaced => previous.snapshot(),
                // subscribers of the previous store are released
                _ => store.state.clone(),
            };
            StoreChannel::new(seed, capacity)
        });

        tracing::info!(
            "bound contract {} on {} via {} ({})",
            address,
            network,
            provider.describe(),
            if credential.is_some() { "signing" } else { "read-only" }
        );

        self.record(next);
        self.binding = Some(ContractBinding {
            network,
            address,
            abi: self.abi.clone(),
            client,
        });
        Ok(())
    }

    fn record(&mut self, next: PendingSettings) {
        self.provider = next.provider;
        self.network = next.network;
        self.default_account = next.default_account;
        self.private_key = next.private_key;
        self.store = next.store;
    }

    async fn register_listener(
        &self,
        dispatch_key: &str,
        action: &MapAction,
        call_args: &[DynSolValue],
    ) -> Result<()> {
        let Some(channel) = &self.channel else {
            return Ok(());
        };
        let binding = self.bound()?;

        let key = (dispatch_key.to_string(), action.on_filter.clone());
        if !self.listeners.reserve(&key) {
            return Ok(());
        }

        let events = match binding.client.watch_event(&action.on_filter).await {
            Ok(events) => events,
            Err(e) => {
                self.listeners.release(&key);
                return Err(e);
            }
        };
        let reconciler = EventReconciler::new(
            dispatch_key,
            action.clone(),
            call_args.to_vec(),
            binding.client.clone(),
            channel.clone(),
        );

        self.listeners
            .activate(key, tokio::spawn(reconciler.run(events)));
        tracing::info!(
            "registered {} listener for dispatch key {}",
            action.on_filter,
            dispatch_key
        );
        Ok(())
    }
}

fn parse_credential(private_key: &str) -> Result<PrivateKeySigner> {
    PrivateKeySigner::from_str(private_key)
        .map_err(|e| AdapterError::InvalidCredential(e.to_string()))
}

impl ProviderCapability for ContractAdapter {
    fn describe(&self) -> String {
        format!("network: {}", self.network.as_deref().unwrap_or_default())
    }

    fn network(&self) -> Option<&str> {
        self.network.as_deref()
    }

    fn address(&self) -> Option<Address> {
        self.binding.as_ref().map(|binding| binding.address)
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::Alloy
    }

    fn on_ready(&mut self, settings: AdapterSettings) -> Result<()> {
        let AdapterSettings {
            provider,
            network,
            default_account,
            private_key,
            store,
        } = settings;

        let next = PendingSettings {
            provider: Some(provider),
            network: Some(network),
            default_account: Some(default_account),
            private_key,
            store_replaced: store.is_some(),
            store: store.or_else(|| self.store.clone()),
        };

        self.bind(next)?;
        self.state = BindingState::Ready;
        Ok(())
    }

    fn connect(&mut self) -> Result<()> {
        self.bind(self.current_settings())?;
        self.state = BindingState::Ready;
        Ok(())
    }

    fn set_instance_options(&mut self, options: InstanceOptions) -> Result<()> {
        let InstanceOptions {
            provider,
            network,
            default_account,
            private_key,
            store,
        } = options;

        let mut next = self.current_settings();
        next.provider = Some(provider);
        if let Some(network) = network {
            next.network = Some(network);
        }
        if let Some(default_account) = default_account {
            next.default_account = Some(default_account);
        }
        if let Some(private_key) = private_key {
            next.private_key = Some(private_key);
        }
        if let Some(store) = store {
            next.store = Some(store);
            next.store_replaced = true;
        }

        if self.state == BindingState::Unbound {
            self.record(next);
            return Ok(());
        }
        self.bind(next)?;
        self.state = BindingState::Rebound;
        Ok(())
    }
}

#[async_trait]
impl ContractCapability for ContractAdapter {
    type Method = ContractMethod;

    fn get_abi_method(&self, name: &str) -> Option<Function> {
        self.abi
            .function(name)
            .and_then(|functions| functions.first())
            .cloned()
    }

    fn get_method(&self, name: &str) -> Result<ContractMethod> {
        let binding = self.bound()?;
        if self.abi.function(name).is_none() {
            return Err(AdapterError::MethodNotFound(name.to_string()));
        }
        Ok(ContractMethod {
            name: name.to_string(),
            client: binding.client.clone(),
        })
    }

    fn get_event(&self, name: &str) -> Result<Event> {
        self.abi
            .event(name)
            .and_then(|events| events.first())
            .cloned()
            .ok_or_else(|| AdapterError::EventNotFound(name.to_string()))
    }

    async fn call_method(&self, name: &str, args: Vec<DynSolValue>) -> Result<Vec<DynSolValue>> {
        let binding = self.bound()?;
        binding
            .client
            .call_method(name, &args, self.default_account)
            .await
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
        let binding = self.bound()?;
        let overrides = TxOverrides {
            gas_limit: options.gas_limit(),
            from: self.default_account,
        };

        let tx = method.submit(args.clone(), overrides).await?;

        if let Some(dispatch_key) = options.dispatch.as_deref() {
            match self.map_action(dispatch_key) {
                Some(action) => {
                    // the transaction is already out, a failed registration
                    // must not hide its handle from the caller
                    if let Err(e) = self.register_listener(dispatch_key, action, &args).await {
                        tracing::error!(
                            "Failed to register {} listener for {}: {}",
                            action.on_filter,
                            dispatch_key,
                            e
                        );
                    }
                }
                None => {
                    tracing::debug!("no map action for dispatch key {}, skipping", dispatch_key);
                }
            }
        }

        Ok(TransactionSigner::new(binding.client.clone(), tx).with_confirmations(self.confirmations))
    }

    async fn get_events(
        &self,
        name: &str,
        options: Option<EventFilterOptions>,
    ) -> Result<Vec<DecodedLog>> {
        let binding = self.bound()?;
        let query = options.map(EventQuery::from).unwrap_or_default();
        binding.client.get_past_events(name, &query).await
    }
}

impl fmt::Debug for ContractAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractAdapter")
            .field("state", &self.state)
            .field("network", &self.network)
            .field("default_account", &self.default_account)
            .field("binding", &self.binding)
            .field("store", &self.store)
            .finish()
    }
}

impl Drop for ContractAdapter {
    fn drop(&mut self) {
        self.listeners.abort_all();
    }
}
