//! Storage Adapters
//!
//! Implementations of the `KeyValueStore` trait.

mod file;
mod memory;
#[cfg(feature = "rocksdb")]
mod rocks;

pub use file::FileBackedKVStore;
pub use memory::InMemoryKVStore;
#[cfg(feature = "rocksdb")]
pub use rocks::{RocksDbConfig, RocksDbStore};

use crate::ports::outbound::ScanResult;
use std::collections::BTreeMap;
use std::ops::Bound;

/// Entries of an ordered map in `[start, end)`; empty `end` is unbounded.
pub(crate) fn scan_ordered(data: &BTreeMap<Vec<u8>, Vec<u8>>, start: &[u8], end: &[u8]) -> ScanResult {
    let upper = if end.is_empty() {
        Bound::Unbounded
    } else if start >= end {
        return Vec::new();
    } else {
        Bound::Excluded(end)
    };
    data.range::<[u8], _>((Bound::Included(start), upper))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
