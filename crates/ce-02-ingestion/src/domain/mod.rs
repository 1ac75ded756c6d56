//! Domain layer for the Ingestion Scheduler.

pub mod config;
pub mod errors;
pub mod state;

pub use config::IngestionConfig;
pub use errors::IngestionError;
pub use state::{confirmed_target, plan_batches, BlockRange, SchedulerState, SyncOutcome};
