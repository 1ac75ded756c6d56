//! Adapters for the Ledger Store subsystem.

pub mod lock;
pub mod storage;

pub use lock::{DataDirLock, LockError};
pub use storage::{FileBackedKVStore, InMemoryKVStore};
#[cfg(feature = "rocksdb")]
pub use storage::{RocksDbConfig, RocksDbStore};
