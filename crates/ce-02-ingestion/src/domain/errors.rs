//! # Ingestion Errors

use ce_01_ledger_store::StoreError;
use shared_types::ChainError;
use thiserror::Error;

/// Errors that abort one sync cycle.
///
/// None of them stop the run loop; the next tick retries from the last
/// committed boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestionError {
    /// The ledger store rejected or failed to write a batch.
    #[error("Ledger store error: {0}")]
    Store(#[from] StoreError),

    /// A chain call failed.
    #[error("External call {operation} failed: {source}")]
    ExternalCallFailed {
        operation: &'static str,
        #[source]
        source: ChainError,
    },

    /// No authoritative address has been recorded.
    #[error("No authoritative token address configured")]
    NoAuthoritativeAddress,

    #[error("Invalid ingestion config: {0}")]
    InvalidConfig(&'static str),
}

impl IngestionError {
    pub(crate) fn external(operation: &'static str) -> impl FnOnce(ChainError) -> Self {
        move |source| Self::ExternalCallFailed { operation, source }
    }

    /// True when retrying cannot help without operator action.
    pub fn is_consistency_violation(&self) -> bool {
        matches!(
            self,
            Self::Store(StoreError::NegativeBalance { .. })
                | Self::Store(StoreError::BalanceOverflow { .. })
                | Self::Store(StoreError::DuplicateSequence { .. })
        )
    }
}
