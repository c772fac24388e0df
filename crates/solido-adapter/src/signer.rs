//! Uniform signing handle returned by write calls.

use std::{fmt, sync::Arc};

use solido_primitives::alloy::primitives::TxHash;

use crate::backend::{ContractBackend, PendingTransaction};
use crate::error::Result;

/// Outcome of a signed and mined transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigningResult {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub success: bool,
}

/// Wraps a submitted transaction. Owned by the caller; the adapter keeps no
/// reference to it.
pub struct TransactionSigner {
    client: Arc<dyn ContractBackend>,
    tx: PendingTransaction,
    confirmations: u64,
}

impl TransactionSigner {
    pub fn new(client: Arc<dyn ContractBackend>, tx: PendingTransaction) -> Self {
        Self {
            client,
            tx,
            confirmations: 1,
        }
    }

    pub fn with_confirmations(mut self, confirmations: u64) -> Self {
        self.confirmations = confirmations;
        self
    }

    /// The underlying transaction handle.
    pub fn transaction(&self) -> &PendingTransaction {
        &self.tx
    }

    pub fn tx_hash(&self) -> TxHash {
        self.tx.tx_hash
    }

    /// The transaction was signed by the credential bearing client on
    /// submission; this waits until it is mined with the configured number of
    /// confirmations and reports the result.
    pub async fn request_signing(&self) -> Result<SigningResult> {
        tracing::info!(
            "waiting for {} confirmation(s) of txs {}",
            self.confirmations,
            self.tx.tx_hash
        );
        let result = self
            .client
            .wait_for_receipt(self.tx.tx_hash, self.confirmations)
            .await?;
        tracing::info!("txs {} mined, success: {}", result.tx_hash, result.success);
        Ok(result)
    }
}

impl fmt::Debug for TransactionSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionSigner")
            .field("tx", &self.tx)
            .field("confirmations", &self.confirmations)
            .field("client", &"<ContractBackend>")
            .finish()
    }
}
