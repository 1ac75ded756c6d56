//! # Inbound Ports (Driving Ports)
//!
//! The APIs the Ledger Store exposes to the scheduler, the snapshot engine
//! and the migration orchestrator.

use shared_types::{Address, Hash, TransferEvent, U256};

use crate::domain::errors::StoreError;

/// Append-only, strictly ordered record of observed transfer events.
pub trait EventStoreApi {
    /// Durably append events.
    ///
    /// ## Errors
    ///
    /// - `DuplicateSequence`: a `(block, log_index)` is already stored or
    ///   appears twice in `events`. Nothing is written.
    fn append(&mut self, events: &[TransferEvent]) -> Result<(), StoreError>;

    /// Events with `from_block <= block <= to_block` in total order.
    ///
    /// ## Errors
    ///
    /// - `InvalidRange`: `from_block > to_block`
    fn read_range(&self, from_block: u64, to_block: u64) -> Result<Vec<TransferEvent>, StoreError>;

    /// Events with `block <= block` in total order.
    fn read_up_to(&self, block: u64) -> Result<Vec<TransferEvent>, StoreError>;

    /// Events emitted by one transaction, in total order.
    fn find_by_transaction(&self, tx_hash: &Hash) -> Result<Vec<TransferEvent>, StoreError>;

    /// Number of stored events.
    fn event_count(&self) -> Result<usize, StoreError>;

    /// Remove every event and its index entries in one write. Returns the
    /// number of events removed.
    ///
    /// Balances are left alone; a migration cutover clears both together.
    fn clear(&mut self) -> Result<usize, StoreError>;
}

/// Materialized address → balance view.
pub trait BalanceLedgerApi {
    /// Apply one event durably.
    ///
    /// ## Errors
    ///
    /// - `NegativeBalance`: the debit exceeds the sender's balance. The
    ///   ledger is unchanged.
    fn apply(&mut self, event: &TransferEvent) -> Result<(), StoreError>;

    /// Balance of `address`, zero if absent.
    fn current(&self, address: &Address) -> U256;

    /// Every non-zero balance, address ascending.
    fn all(&self) -> Vec<(Address, U256)>;

    /// Sum of all balances.
    fn total(&self) -> U256;

    /// Sum of balances equals net minted minus burned.
    fn check_invariant(&self) -> Result<(), StoreError>;
}
