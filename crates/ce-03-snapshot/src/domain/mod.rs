pub mod errors;
pub mod ownership;
pub mod snapshot;

pub use errors::SnapshotError;
pub use ownership::{format_pct, ownership_bp, FULL_OWNERSHIP_BP};
pub use snapshot::{Discrepancy, Snapshot, SnapshotRow, CSV_HEADER};
