//! Inbound port of the Migration Orchestrator.

use async_trait::async_trait;

use crate::domain::{MigrationError, MigrationResult, MigrationStep};

#[async_trait]
pub trait MigrationApi: Send + Sync {
    /// Move every holder to a new instance with `balance * ratio`.
    ///
    /// ## Errors
    ///
    /// - `InvalidRatio`: `ratio < 2`
    /// - `MigrationInProgress`: another migration holds the lock
    /// - any protocol failure, tagged with its step
    async fn split(&self, ratio: u64) -> Result<MigrationResult, MigrationError>;

    /// Move every holder to a new instance with a new symbol (and name).
    ///
    /// ## Errors
    ///
    /// - `InvalidSymbol`: symbol blank after trimming
    /// - `MigrationInProgress`, protocol failures as for `split`
    async fn rename(
        &self,
        new_symbol: &str,
        new_name: Option<&str>,
    ) -> Result<MigrationResult, MigrationError>;

    /// State of the current or most recent migration.
    fn step(&self) -> MigrationStep;
}
