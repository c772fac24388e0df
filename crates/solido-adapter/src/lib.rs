pub mod adapter;
pub mod backend;
pub mod capability;
pub mod config;
pub mod error;
pub mod invoker;
pub mod reconciler;
pub mod settings;
pub mod signer;
pub mod store;

pub use adapter::{BindingState, ContractAdapter, ContractBinding, ContractMethod};
pub use capability::{ContractCapability, MethodCall, ProviderCapability, ProviderType};
pub use error::{AdapterError, Result};
pub use settings::{AdapterSettings, CallOptions, InstanceOptions, DEFAULT_GAS_LIMIT};
pub use signer::{SigningResult, TransactionSigner};
pub use store::{FieldSubscription, GetterArgs, MapAction, MutationContext, ReactiveContractStore};
