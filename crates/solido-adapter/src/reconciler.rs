//! Turns contract event emissions into store updates.

use std::sync::Arc;

use futures_util::StreamExt;
use solido_primitives::{alloy::dyn_abi::DynSolValue, events::DecodedLog};

use crate::backend::{ContractBackend, LogStream};
use crate::error::Result;
use crate::store::{MapAction, MutationContext, StoreChannel, StoreState};

/// Reconciles the emissions of one (dispatch key, event) pair.
///
/// Emissions are handled one at a time in delivery order, so two emissions for
/// the same dispatch key never interleave between getter call and publish.
/// Publishes for different keys go through [`StoreChannel::merge`], which
/// overlays the field on the state current at publish time.
#[derive(Debug)]
pub struct EventReconciler {
    dispatch_key: String,
    action: MapAction,
    call_args: Vec<DynSolValue>,
    contract: Arc<dyn ContractBackend>,
    channel: StoreChannel,
}

impl EventReconciler {
    pub fn new(
        dispatch_key: impl Into<String>,
        action: MapAction,
        call_args: Vec<DynSolValue>,
        contract: Arc<dyn ContractBackend>,
        channel: StoreChannel,
    ) -> Self {
        Self {
            dispatch_key: dispatch_key.into(),
            action,
            call_args,
            contract,
            channel,
        }
    }

    pub fn dispatch_key(&self) -> &str {
        &self.dispatch_key
    }

    /// Re-invoke the getter, run the mutation and publish the merged state.
    /// Nothing is published if either step fails.
    pub async fn reconcile(&self, event: DecodedLog) -> Result<StoreState> {
        let getter = &self.action.getter;
        let getter_args = self.action.getter_args.resolve(&self.call_args);

        let getter_output = self
            .contract
            .call_method(getter, &getter_args, None)
            .await?;

        let value = self
            .action
            .mutate(MutationContext {
                getter: getter.clone(),
                getter_output,
                call_args: self.call_args.clone(),
                event,
                contract: self.contract.clone(),
            })
            .await?;

        Ok(self.channel.merge(getter, value))
    }

    /// Drive the reconciler until the event stream ends.
    pub async fn run(self, mut events: LogStream) {
        tracing::info!(
            "listening to {} for dispatch key {}",
            self.action.on_filter,
            self.dispatch_key
        );
        while let Some(log_result) = events.next().await {
            match log_result {
                Ok(event) => {
                    if let Err(e) = self.reconcile(event).await {
                        tracing::error!(
                            "Failed to reconcile {} for {}: {}",
                            self.action.on_filter,
                            self.dispatch_key,
                            e
                        );
                    }
                }
                Err(e) => {
                    tracing::error!("Error processing log: {:?}", e);
                }
            }
        }
        tracing::info!("event stream for {} closed", self.dispatch_key);
    }
}
