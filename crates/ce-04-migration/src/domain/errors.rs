use ce_01_ledger_store::StoreError;
use ce_03_snapshot::SnapshotError;
use shared_types::{Address, ChainError};
use thiserror::Error;

use super::step::MigrationStep;

/// Failure to load a deployment artifact.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArtifactError {
    #[error("Artifact not found: {path}")]
    NotFound { path: String },

    #[error("Failed to read artifact {path}: {message}")]
    Io { path: String, message: String },

    #[error("Malformed artifact: {0}")]
    Parse(String),

    /// Bytecode is absent or not `0x`-prefixed.
    #[error("Artifact missing bytecode")]
    MissingBytecode,
}

/// Migration errors.
///
/// Failures inside the protocol carry the `step` being attempted, named by
/// the state it would have reached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MigrationError {
    #[error("Split ratio must be an integer greater than 1, got {0}")]
    InvalidRatio(u64),

    #[error("New symbol must not be empty")]
    InvalidSymbol,

    #[error("Admin wallet must not be the zero address")]
    InvalidAdmin,

    #[error("A migration is already in progress")]
    MigrationInProgress,

    #[error("No authoritative token address configured")]
    NoAuthoritativeAddress,

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("Snapshot failed: {0}")]
    Snapshot(#[source] SnapshotError),

    #[error("Deployment receipt carries no contract address")]
    DeploymentFailed,

    #[error("[{step}] {operation} failed: {source}")]
    ExternalCallFailed {
        step: MigrationStep,
        operation: &'static str,
        #[source]
        source: ChainError,
    },

    /// Mined, but the receipt reports failure.
    #[error("[{step}] {operation} transaction {tx_hash} reverted")]
    TransactionFailed {
        step: MigrationStep,
        operation: &'static str,
        tx_hash: String,
    },

    #[error("Scaled balance of {holder} overflows uint256")]
    MintOverflow { holder: Address },

    #[error("Cutover failed: {0}")]
    Store(#[source] StoreError),
}

impl MigrationError {
    /// The protocol step that failed, if the error came from inside the
    /// protocol.
    pub fn step(&self) -> Option<MigrationStep> {
        match self {
            Self::ExternalCallFailed { step, .. } | Self::TransactionFailed { step, .. } => {
                Some(*step)
            }
            Self::Snapshot(_) => Some(MigrationStep::Snapshotted),
            Self::DeploymentFailed => Some(MigrationStep::Deployed),
            Self::MintOverflow { .. } => Some(MigrationStep::Replicated),
            Self::Store(_) => Some(MigrationStep::CutOver),
            Self::InvalidRatio(_)
            | Self::InvalidSymbol
            | Self::InvalidAdmin
            | Self::MigrationInProgress
            | Self::NoAuthoritativeAddress
            | Self::Artifact(_) => None,
        }
    }

    pub(crate) fn external(
        step: MigrationStep,
        operation: &'static str,
    ) -> impl FnOnce(ChainError) -> Self {
        move |source| Self::ExternalCallFailed {
            step,
            operation,
            source,
        }
    }
}
