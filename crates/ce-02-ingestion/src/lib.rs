//! # Ingestion Scheduler (ce-02)
//!
//! Turns the confirmation-lagged stream of on-chain Transfer logs into
//! committed ledger batches.
//!
//! ## Cycle
//!
//! ```text
//! get_chain_head ──→ target = head - confirmations (saturating)
//!                         │
//!        last_processed_block (None → start at 0)
//!                         │
//!        [last+1, target] in batch_size chunks
//!                         │
//!     get_logs ──→ commit_batch (events + balances + boundary, atomic)
//! ```
//!
//! ## Crate Structure
//!
//! - `domain/` - Config, batch planning, scheduler state, errors
//! - `ports/` - `IngestionApi`
//! - `service.rs` - `IngestionScheduler` and its cancellable run loop

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{
    confirmed_target, plan_batches, BlockRange, IngestionConfig, IngestionError, SchedulerState,
    SyncOutcome,
};
pub use ports::IngestionApi;
pub use service::IngestionScheduler;
