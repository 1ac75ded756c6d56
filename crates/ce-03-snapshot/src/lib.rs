//! # Snapshot Engine (ce-03)
//!
//! Reconstructs the cap table at any ingested block by replaying stored
//! Transfer events, then reconciles each holder against the token's own
//! `balanceOf` at that block.
//!
//! ## Flow
//!
//! ```text
//! requested ──→ block = min(requested, last_processed)
//!                    │
//!      read_up_to(block) ──→ replay into a fresh BalanceMap
//!                    │
//!      balanceOf(holder, block) per holder ──→ discrepancies
//!                    │
//!      rows sorted by balance desc, ownership in basis points
//! ```
//!
//! The replay never touches the live balance map, so a snapshot can run
//! while ingestion keeps committing.

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{
    format_pct, ownership_bp, Discrepancy, Snapshot, SnapshotError, SnapshotRow, CSV_HEADER,
};
pub use ports::SnapshotApi;
pub use service::SnapshotEngine;
