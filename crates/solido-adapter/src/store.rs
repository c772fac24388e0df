//! Reactive contract store and its single publish channel.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    future::Future,
    sync::{Arc, PoisonError, RwLock},
};

use futures::{future::BoxFuture, FutureExt, Stream, StreamExt};
use serde_json::Value;
use solido_primitives::{
    alloy::dyn_abi::DynSolValue, events::DecodedLog, values::outputs_to_json,
};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_stream::wrappers::BroadcastStream;

use crate::backend::ContractBackend;
use crate::error::Result;

/// Application state keyed by field name.
pub type StoreState = BTreeMap<String, Value>;

pub type MutationFuture = BoxFuture<'static, Result<Value>>;

type Mutation = Arc<dyn Fn(MutationContext) -> MutationFuture + Send + Sync>;

/// Default capacity of the publish channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Arguments used when re-invoking a map action's getter.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum GetterArgs {
    #[default]
    Empty,
    /// reuse the arguments of the write call that registered the listener
    FromCall,
    Fixed(Vec<DynSolValue>),
}

impl GetterArgs {
    pub fn resolve(&self, call_args: &[DynSolValue]) -> Vec<DynSolValue> {
        match self {
            GetterArgs::Empty => Vec::new(),
            GetterArgs::FromCall => call_args.to_vec(),
            GetterArgs::Fixed(args) => args.clone(),
        }
    }
}

/// Everything a mutation can see when an event is reconciled.
#[derive(Debug, Clone)]
pub struct MutationContext {
    pub getter: String,
    pub getter_output: Vec<DynSolValue>,
    pub call_args: Vec<DynSolValue>,
    pub event: DecodedLog,
    pub contract: Arc<dyn ContractBackend>,
}

/// Links a write method's completion event to a getter re-invocation and a
/// state transform.
#[derive(Clone)]
pub struct MapAction {
    pub getter: String,
    pub on_filter: String,
    pub getter_args: GetterArgs,
    mutation: Mutation,
}

impl MapAction {
    pub fn new<F, Fut>(getter: impl Into<String>, on_filter: impl Into<String>, mutation: F) -> Self
    where
        F: Fn(MutationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Self {
            getter: getter.into(),
            on_filter: on_filter.into(),
            getter_args: GetterArgs::default(),
            mutation: Arc::new(move |ctx| mutation(ctx).boxed()),
        }
    }

    /// Map action storing the getter output, projected to JSON, as is.
    pub fn mirror_getter(getter: impl Into<String>, on_filter: impl Into<String>) -> Self {
        Self::new(getter, on_filter, |ctx: MutationContext| async move {
            Ok(outputs_to_json(&ctx.getter_output))
        })
    }

    pub fn with_getter_args(mut self, getter_args: GetterArgs) -> Self {
        self.getter_args = getter_args;
        self
    }

    pub async fn mutate(&self, ctx: MutationContext) -> Result<Value> {
        (self.mutation)(ctx).await
    }
}

impl fmt::Debug for MapAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapAction")
            .field("getter", &self.getter)
            .field("on_filter", &self.on_filter)
            .field("getter_args", &self.getter_args)
            .field("mutation", &"<Mutation>")
            .finish()
    }
}

/// Store supplied at bind time: the map actions keyed by dispatch key and the
/// initial state.
#[derive(Debug, Clone, Default)]
pub struct ReactiveContractStore {
    pub map_actions: HashMap<String, MapAction>,
    pub state: StoreState,
}

impl ReactiveContractStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_action(mut self, dispatch_key: impl Into<String>, action: MapAction) -> Self {
        self.map_actions.insert(dispatch_key.into(), action);
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.state.insert(key.into(), value);
        self
    }
}

/// Single writer publish channel. Every publish is mirrored into the state
/// before it is broadcast.
#[derive(Debug, Clone)]
pub struct StoreChannel {
    sender: broadcast::Sender<StoreState>,
    state: Arc<RwLock<StoreState>>,
}

impl StoreChannel {
    pub fn new(initial: StoreState, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            state: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn snapshot(&self) -> StoreState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the whole state. Returns the number of subscribers reached.
    pub fn publish(&self, next: StoreState) -> usize {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        *state = next.clone();
        self.send(next)
    }

    /// Overlay one field on the current state and publish the result. The
    /// read-modify-write happens under the write lock.
    pub fn merge(&self, field: &str, value: Value) -> StoreState {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.insert(field.to_string(), value);
        let next = state.clone();
        self.send(next.clone());
        next
    }

    /// Subscribe to one field, only if it exists in the state right now.
    pub fn subscribe_field(&self, key: &str) -> Option<FieldSubscription> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        if !state.contains_key(key) {
            return None;
        }
        Some(FieldSubscription {
            key: key.to_string(),
            receiver: self.sender.subscribe(),
        })
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }

    fn send(&self, next: StoreState) -> usize {
        // no subscribers is not an error for a store
        self.sender.send(next).unwrap_or(0)
    }
}

/// Live projection of one store field.
#[derive(Debug)]
pub struct FieldSubscription {
    key: String,
    receiver: broadcast::Receiver<StoreState>,
}

impl FieldSubscription {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Next value of the field, `Value::Null` when a snapshot lacks it.
    /// Returns `None` once the channel is closed.
    pub async fn recv(&mut self) -> Option<Value> {
        loop {
            match self.receiver.recv().await {
                Ok(state) => return Some(project(&state, &self.key)),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("subscriber of {} lagged by {} snapshots", self.key, skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = Value> + Send {
        let key = self.key;
        BroadcastStream::new(self.receiver).filter_map(move |item| {
            let value = item.ok().map(|state| project(&state, &key));
            futures::future::ready(value)
        })
    }
}

fn project(state: &StoreState, key: &str) -> Value {
    state.get(key).cloned().unwrap_or(Value::Null)
}
