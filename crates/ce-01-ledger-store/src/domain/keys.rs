//! # Key Layout
//!
//! Logical tables mapped onto one ordered key space by prefix.
//!
//! | Prefix | Key suffix | Value |
//! |--------|------------|-------|
//! | `meta:` | meta key name | text |
//! | `events:` | `block` (be u64) ++ `log_index` (be u64) | JSON [`EventRow`](super::records::EventRow) |
//! | `events_tx:` | tx hash ++ `block` ++ `log_index` | event key |
//! | `holders:` | 20 address bytes | decimal balance |
//!
//! Big-endian integers make byte order equal `(block, log_index)` order, so a
//! forward scan over `events:` yields the Event Store's total order.

use shared_types::{Address, EventSequence, Hash};

use super::errors::StoreError;

/// Key prefixes of the ledger store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPrefix {
    Meta,
    Event,
    EventByTx,
    Holder,
}

impl KeyPrefix {
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            KeyPrefix::Meta => b"meta:",
            KeyPrefix::Event => b"events:",
            KeyPrefix::EventByTx => b"events_tx:",
            KeyPrefix::Holder => b"holders:",
        }
    }

    /// Build a full key with the given suffix.
    pub fn key(&self, suffix: &[u8]) -> Vec<u8> {
        let mut key = self.as_bytes().to_vec();
        key.extend_from_slice(suffix);
        key
    }

    pub fn meta_key(name: &str) -> Vec<u8> {
        KeyPrefix::Meta.key(name.as_bytes())
    }

    pub fn event_key(sequence: EventSequence) -> Vec<u8> {
        let mut suffix = [0u8; 16];
        suffix[..8].copy_from_slice(&sequence.block.to_be_bytes());
        suffix[8..].copy_from_slice(&sequence.log_index.to_be_bytes());
        KeyPrefix::Event.key(&suffix)
    }

    /// Exclusive upper bound of all events with `block <= to_block`.
    pub fn event_range_end(to_block: u64) -> Vec<u8> {
        match to_block.checked_add(1) {
            Some(next) => KeyPrefix::event_key(EventSequence::new(next, 0)),
            None => prefix_end(KeyPrefix::Event.as_bytes()),
        }
    }

    pub fn tx_index_key(tx_hash: &Hash, sequence: EventSequence) -> Vec<u8> {
        let mut key = KeyPrefix::tx_index_prefix(tx_hash);
        key.extend_from_slice(&sequence.block.to_be_bytes());
        key.extend_from_slice(&sequence.log_index.to_be_bytes());
        key
    }

    pub fn tx_index_prefix(tx_hash: &Hash) -> Vec<u8> {
        KeyPrefix::EventByTx.key(tx_hash)
    }

    pub fn holder_key(address: &Address) -> Vec<u8> {
        KeyPrefix::Holder.key(address.as_bytes())
    }

    /// Recover the address from a `holders:` key.
    pub fn parse_holder_key(key: &[u8]) -> Result<Address, StoreError> {
        let suffix = key
            .strip_prefix(KeyPrefix::Holder.as_bytes())
            .filter(|s| s.len() == 20)
            .ok_or_else(|| StoreError::Corrupt {
                key: String::from_utf8_lossy(key).into_owned(),
                reason: "malformed holder key".into(),
            })?;
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(suffix);
        Ok(Address(bytes))
    }
}

/// Smallest key greater than every key starting with `prefix`.
pub fn prefix_end(prefix: &[u8]) -> Vec<u8> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return end;
        }
    }
    // All 0xFF: no finite upper bound; callers use an empty end as "unbounded".
    Vec::new()
}
