//! Scheduler configuration.

use std::time::Duration;

use super::errors::IngestionError;

/// Ingestion tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionConfig {
    /// Blocks behind head before a block is considered confirmed.
    pub confirmations: u64,
    /// Time between sync cycles.
    pub poll_interval: Duration,
    /// Maximum blocks per atomic batch.
    pub batch_size: u64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            confirmations: 5,
            poll_interval: Duration::from_millis(5000),
            batch_size: 500,
        }
    }
}

impl IngestionConfig {
    /// Reject a zero poll interval or batch size.
    pub fn validate(&self) -> Result<(), IngestionError> {
        if self.poll_interval.is_zero() {
            return Err(IngestionError::InvalidConfig(
                "poll interval must be greater than zero",
            ));
        }
        if self.batch_size == 0 {
            return Err(IngestionError::InvalidConfig(
                "batch size must be greater than zero",
            ));
        }
        Ok(())
    }
}
