//! # ChainEquity Ledger Runtime
//!
//! Wires the ledger subsystems into one process.
//!
//! ```text
//!                ┌────────────────────────────┐
//!  ChainClient ──┤ IngestionScheduler (ce-02) ├──→ LedgerStore (ce-01)
//!      │         └────────────────────────────┘         │
//!      │         ┌────────────────────────────┐         │
//!      ├─────────┤ SnapshotEngine (ce-03)     ├←────────┤
//!      │         └────────────────────────────┘         │
//!      │         ┌────────────────────────────┐         │
//!      └─────────┤ MigrationOrchestrator      ├──cutover┘
//!                │ (ce-04)                    │
//!                └────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `config` - `RuntimeConfig` from environment variables
//! - `telemetry` - tracing subscriber setup
//! - `runtime` - `LedgerRuntime` startup and shutdown

pub mod config;
pub mod runtime;
pub mod telemetry;

pub use config::{ConfigError, RuntimeConfig};
pub use runtime::{LedgerRuntime, RuntimeError};
pub use telemetry::init_tracing;
