use solido_primitives::PrimitivesError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Config error: {0}")]
    ConfigError(String),
    #[error("No contract address configured for network: {0}")]
    UnknownNetwork(String),
    #[error("Invalid signing credential: {0}")]
    InvalidCredential(String),
    #[error("Adapter is not bound to a contract, call on_ready or connect first")]
    NotBound,
    #[error("Method not found in contract abi: {0}")]
    MethodNotFound(String),
    #[error("Event not found in contract abi: {0}")]
    EventNotFound(String),
    #[error("Failed contract call: {0}")]
    CallError(String),
    #[error("Failed to send transaction: {0}")]
    TransactionError(String),
    #[error("Transaction failed: {0}")]
    TransactionFailure(String),
    #[error("Failed to setup event filter: {0}")]
    EventFilterError(String),
    #[error("Failed to parse logs: {0}")]
    LogParseError(String),
    #[error("State mutation failed: {0}")]
    MutationError(String),
    #[error("Primitives error: {0}")]
    PrimitivesError(#[from] PrimitivesError),
}

impl AdapterError {
    /// Failures reported by the chain client rather than by the adapter itself.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            AdapterError::CallError(_)
                | AdapterError::TransactionError(_)
                | AdapterError::TransactionFailure(_)
                | AdapterError::EventFilterError(_)
                | AdapterError::LogParseError(_)
        )
    }
}

pub type Result<T> = core::result::Result<T, AdapterError>;
