use ce_01_ledger_store::StoreError;
use shared_types::{Address, ChainError};
use thiserror::Error;

/// Snapshot generation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// No block has been ingested yet.
    #[error("Indexer has not processed any blocks yet")]
    NotIndexed,

    #[error("No authoritative token address configured")]
    NoAuthoritativeAddress,

    /// Reading or replaying the Event Store failed.
    #[error("Ledger store error: {0}")]
    Store(#[from] StoreError),

    /// An authoritative `balanceOf` read failed.
    #[error("balanceOf({holder}) at block {block} failed: {source}")]
    ExternalCallFailed {
        holder: Address,
        block: u64,
        #[source]
        source: ChainError,
    },
}
