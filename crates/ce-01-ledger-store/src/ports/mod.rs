//! Port definitions for the Ledger Store subsystem.

pub mod inbound;
pub mod outbound;

pub use inbound::{BalanceLedgerApi, EventStoreApi};
pub use outbound::{BatchOperation, KeyValueStore, ScanResult};
