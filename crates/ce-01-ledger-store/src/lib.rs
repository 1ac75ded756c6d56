//! # Ledger Store (ce-01)
//!
//! Persistence for the event-sourced balance ledger: the append-only Event
//! Store, the materialized Balance Ledger, and the Ledger Meta pointers.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Total Order | Events are unique and ordered by `(block, log_index)` |
//! | 2 | No Negative Balances | A debit below zero fails; the ledger never clamps |
//! | 3 | No Zero Entries | Absent means zero; the zero address is never stored |
//! | 4 | Conservation | Sum of balances equals minted minus burned |
//! | 5 | Atomic Batches | Events, balances and `last_processed_block` commit together |
//! | 6 | Monotonic Boundary | `last_processed_block` only moves forward (until cutover) |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Balance fold, key layout, record encodings, errors
//! - `ports/` - Inbound APIs (`EventStoreApi`, `BalanceLedgerApi`) and the
//!   outbound `KeyValueStore`
//! - `adapters/` - In-memory, file-backed and RocksDB stores; data dir lock
//! - `service/` - `LedgerStore`, batch commit and cutover
//!
//! ## Usage
//!
//! ```ignore
//! use ce_01_ledger_store::{FileBackedKVStore, LedgerStore};
//!
//! let kv = FileBackedKVStore::open("./data/ledger.db")?;
//! let mut store = LedgerStore::open(Box::new(kv))?;
//! store.commit_batch(&events, from_block, to_block)?;
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{DataDirLock, FileBackedKVStore, InMemoryKVStore, LockError};
#[cfg(feature = "rocksdb")]
pub use adapters::{RocksDbConfig, RocksDbStore};
pub use domain::{BalanceChange, BalanceMap, KVStoreError, KeyPrefix, LedgerMeta, StoreError};
pub use ports::{BalanceLedgerApi, BatchOperation, EventStoreApi, KeyValueStore, ScanResult};
pub use service::{CommitSummary, LedgerStore, SharedLedgerStore};
