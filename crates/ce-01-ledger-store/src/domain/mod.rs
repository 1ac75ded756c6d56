//! Domain layer for the Ledger Store subsystem.

pub mod balances;
pub mod errors;
pub mod keys;
pub mod records;

pub use balances::{BalanceChange, BalanceMap};
pub use errors::{KVStoreError, StoreError};
pub use keys::KeyPrefix;
pub use records::{EventRow, LedgerMeta, MetaKey};
