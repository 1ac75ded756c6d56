//! # Migration Orchestrator (ce-04)
//!
//! Moves every holder of the authoritative token to a freshly deployed
//! instance, either multiplying balances (split) or changing metadata
//! (rename), then repoints the ledger at the new instance.
//!
//! ## Protocol
//!
//! | Step | Action | Failure |
//! |------|--------|---------|
//! | Paused | `pause()` unless `paused()` is already true | `ExternalCallFailed`, `TransactionFailed` |
//! | Snapshotted | Snapshot at the last processed block | `Snapshot` |
//! | Deployed | Deploy with current or overridden name/symbol | `DeploymentFailed` |
//! | Replicated | Per holder: allow-list, then mint `balance * ratio` | `ExternalCallFailed`, `TransactionFailed` |
//! | CutOver | Clear events, holders, boundary; repoint address | `Store` |
//!
//! There is no rollback. A failed migration leaves the old instance paused
//! and the ledger untouched; the replication journal records how far the
//! new instance got.
//!
//! ## Crate Structure
//!
//! - `domain/` - Plan, steps, journal, result, config, errors
//! - `ports/` - `MigrationApi`
//! - `adapters/` - Deployment artifact loading
//! - `service.rs` - `MigrationOrchestrator`

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{load_artifact, resolve_artifact_path};
pub use domain::{
    ArtifactError, HolderReplication, MigrationConfig, MigrationError, MigrationPlan,
    MigrationResult, MigrationStep, Ratio, ReplicationJournal,
};
pub use ports::MigrationApi;
pub use service::MigrationOrchestrator;
