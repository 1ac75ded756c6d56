//! # Domain Errors
//!
//! Error types for the Ledger Store subsystem.
//!
//! ## Design Principles
//!
//! - Each error maps to a specific ledger invariant violation
//! - `NegativeBalance` is fatal for ingestion: the ledger never clamps
//! - No panics in domain logic (use Result instead)

use shared_types::{Address, EventSequence, U256};
use thiserror::Error;

/// Errors that can occur during ledger store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// `from_block > to_block` in a range query.
    #[error("Invalid range: from_block {from_block} > to_block {to_block}")]
    InvalidRange { from_block: u64, to_block: u64 },

    /// An event with this `(block, log_index)` is already stored.
    #[error("Duplicate event sequence {sequence}")]
    DuplicateSequence { sequence: EventSequence },

    /// The event stream debits more from an address than it ever received.
    #[error("Negative balance for {address}: balance {balance}, debit {debit}")]
    NegativeBalance {
        address: Address,
        balance: U256,
        debit: U256,
    },

    /// A credit would exceed the uint256 range.
    #[error("Balance overflow for {address}")]
    BalanceOverflow { address: Address },

    /// Tracked balances no longer sum to minted minus burned.
    #[error("Ledger invariant violated: tracked total {tracked}, net supply {net_supply}")]
    InvariantViolated { tracked: U256, net_supply: U256 },

    /// The materialized ledger disagrees with a replay of the event log.
    #[error("Ledger drift for {address}: materialized {materialized}, replayed {replayed}")]
    LedgerDrift {
        address: Address,
        materialized: U256,
        replayed: U256,
    },

    /// A batch tried to move `last_processed_block` backwards.
    #[error("Ingestion boundary regression: requested {requested}, current {current}")]
    BoundaryRegression { requested: u64, current: u64 },

    /// An event in a batch lies outside the batch's block range.
    #[error("Event {sequence} outside batch range {from_block}..={to_block}")]
    EventOutsideBatch {
        sequence: EventSequence,
        from_block: u64,
        to_block: u64,
    },

    /// A persisted record could not be decoded.
    #[error("Corrupt record under {key}: {reason}")]
    Corrupt { key: String, reason: String },

    /// Underlying key-value store failure.
    #[error(transparent)]
    Storage(#[from] KVStoreError),
}

/// Key-value store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KVStoreError {
    /// I/O error during read/write.
    #[error("KV store I/O error: {message}")]
    IOError { message: String },

    /// Data corruption in the store.
    #[error("KV store corruption: {message}")]
    CorruptionError { message: String },
}
