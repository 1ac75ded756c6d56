//! # Inbound Ports (Driving Ports)

use async_trait::async_trait;

use crate::domain::errors::IngestionError;
use crate::domain::state::{SchedulerState, SyncOutcome};

/// API of the Ingestion Scheduler.
#[async_trait]
pub trait IngestionApi: Send + Sync {
    /// Run one sync cycle: ingest every confirmed block not yet processed,
    /// batch by batch.
    ///
    /// ## Atomicity
    ///
    /// Each batch commits atomically. A failure aborts the cycle; batches
    /// committed before it stay, nothing of the failed batch is visible.
    async fn run_cycle(&self) -> Result<SyncOutcome, IngestionError>;

    /// Current scheduler state.
    fn state(&self) -> SchedulerState;
}
