//! Inbound port of the Snapshot Engine.

use async_trait::async_trait;

use crate::domain::{Snapshot, SnapshotError};

#[async_trait]
pub trait SnapshotApi: Send + Sync {
    /// Cap table at `requested_block`, or at the last processed block when
    /// `None` or when the request is ahead of ingestion.
    async fn generate(&self, requested_block: Option<u64>) -> Result<Snapshot, SnapshotError>;
}
