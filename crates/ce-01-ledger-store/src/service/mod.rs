//! # Ledger Store Service
//!
//! Event Store, Balance Ledger and Ledger Meta over one key-value store.
//!
//! ## Architecture
//!
//! The three logical tables share a single `KeyValueStore` so that an
//! ingestion batch (events + balance changes + `last_processed_block`) and a
//! migration cutover (clear + repoint) each land as ONE atomic batch write.
//!
//! The live balances are cached in a [`BalanceMap`]. Mutations fold into a
//! working copy first; the copy replaces the cache only after the batch
//! write succeeds, so a failure leaves both memory and disk untouched.

mod batch;
mod events;
mod ledger;
#[cfg(test)]
mod tests;

pub use batch::CommitSummary;

use crate::adapters::storage::InMemoryKVStore;
use crate::domain::balances::BalanceMap;
use crate::domain::errors::StoreError;
use crate::domain::keys::KeyPrefix;
use crate::domain::records::{
    corrupt, decode_balance, decode_text, encode_balance, LedgerMeta, MetaKey,
};
use crate::ports::inbound::EventStoreApi;
use crate::ports::outbound::{BatchOperation, KeyValueStore};
use parking_lot::RwLock;
use shared_types::{Address, U256};
use std::collections::BTreeMap;
use std::sync::Arc;

/// The store as shared between the scheduler, snapshot engine and
/// migration orchestrator.
pub type SharedLedgerStore = Arc<RwLock<LedgerStore>>;

/// The Ledger Store.
pub struct LedgerStore {
    pub(crate) kv: Box<dyn KeyValueStore>,
    pub(crate) balances: BalanceMap,
    pub(crate) meta: LedgerMeta,
}

impl std::fmt::Debug for LedgerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerStore")
            .field("holders", &self.balances.len())
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

impl LedgerStore {
    /// Load the holder table and meta from `kv`.
    ///
    /// ## Errors
    ///
    /// - `Corrupt`: a holder or meta record cannot be decoded
    /// - `Storage`: the underlying store failed
    pub fn open(kv: Box<dyn KeyValueStore>) -> Result<Self, StoreError> {
        let mut holders = Vec::new();
        for (key, value) in kv.prefix_scan(KeyPrefix::Holder.as_bytes())? {
            let address = KeyPrefix::parse_holder_key(&key)?;
            holders.push((address, decode_balance(&key, &value)?));
        }
        let balances = BalanceMap::from_holders(holders)?;
        let meta = Self::load_meta(kv.as_ref())?;

        #[cfg(feature = "tracing-log")]
        tracing::info!(
            holders = balances.len(),
            last_processed_block = ?meta.last_processed_block,
            "[ce-01] Ledger store opened"
        );

        Ok(Self { kv, balances, meta })
    }

    pub fn into_shared(self) -> SharedLedgerStore {
        Arc::new(RwLock::new(self))
    }

    /// Empty store over an [`InMemoryKVStore`].
    pub fn in_memory() -> Self {
        Self {
            kv: Box::new(InMemoryKVStore::new()),
            balances: BalanceMap::new(),
            meta: LedgerMeta::default(),
        }
    }

    fn load_meta(kv: &dyn KeyValueStore) -> Result<LedgerMeta, StoreError> {
        let mut meta = LedgerMeta::default();

        let key = KeyPrefix::meta_key(MetaKey::LastProcessedBlock.as_str());
        if let Some(bytes) = kv.get(&key)? {
            let block = decode_text(&key, &bytes)?
                .parse::<u64>()
                .map_err(|e| corrupt(&key, e.to_string()))?;
            meta.last_processed_block = Some(block);
        }

        let key = KeyPrefix::meta_key(MetaKey::CurrentAuthoritativeAddress.as_str());
        if let Some(bytes) = kv.get(&key)? {
            let address = decode_text(&key, &bytes)?
                .parse::<Address>()
                .map_err(|e| corrupt(&key, e.to_string()))?;
            meta.current_authoritative_address = Some(address);
        }

        Ok(meta)
    }

    /// Highest block whose events are fully applied; `None` before the first
    /// batch and after a cutover.
    pub fn last_processed_block(&self) -> Option<u64> {
        self.meta.last_processed_block
    }

    /// The instance ingestion currently reads from.
    pub fn authoritative_address(&self) -> Option<Address> {
        self.meta.current_authoritative_address
    }

    /// Return the persisted authoritative address, persisting `initial` if
    /// none is recorded yet.
    pub fn ensure_authoritative_address(&mut self, initial: Address) -> Result<Address, StoreError> {
        if let Some(current) = self.meta.current_authoritative_address {
            return Ok(current);
        }
        let key = KeyPrefix::meta_key(MetaKey::CurrentAuthoritativeAddress.as_str());
        self.kv.put(&key, initial.to_string().as_bytes())?;
        self.meta.current_authoritative_address = Some(initial);
        Ok(initial)
    }

    /// The live balance fold.
    pub fn balances(&self) -> &BalanceMap {
        &self.balances
    }

    /// Replay the whole Event Store and compare with the materialized ledger.
    ///
    /// ## Errors
    ///
    /// - `LedgerDrift`: first address (ascending) whose balances differ
    /// - `NegativeBalance`: the stored event log itself is inconsistent
    pub fn verify_against_replay(&self) -> Result<(), StoreError> {
        let events = self.read_up_to(u64::MAX)?;
        let replayed = BalanceMap::replay(&events)?;

        let mut addresses: Vec<Address> = self
            .balances
            .iter()
            .chain(replayed.iter())
            .map(|(a, _)| *a)
            .collect();
        addresses.sort();
        addresses.dedup();

        for address in addresses {
            let materialized = self.balances.get(&address);
            let from_log = replayed.get(&address);
            if materialized != from_log {
                return Err(StoreError::LedgerDrift {
                    address,
                    materialized,
                    replayed: from_log,
                });
            }
        }
        Ok(())
    }

    /// Stage the final balance of each touched address.
    pub(crate) fn stage_holders(touched: &BTreeMap<Address, U256>, ops: &mut Vec<BatchOperation>) {
        for (address, balance) in touched {
            let key = KeyPrefix::holder_key(address);
            if balance.is_zero() {
                ops.push(BatchOperation::delete(key));
            } else {
                ops.push(BatchOperation::put(key, encode_balance(balance)));
            }
        }
    }
}
