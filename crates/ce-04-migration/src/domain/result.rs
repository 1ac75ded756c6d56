use serde::Serialize;
use shared_types::Address;

use super::journal::HolderReplication;

/// Balance multiplier, always `ratio : 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ratio {
    pub numerator: u64,
    pub denominator: u64,
}

impl Ratio {
    pub fn whole(numerator: u64) -> Self {
        Self {
            numerator,
            denominator: 1,
        }
    }
}

/// Outcome of a completed migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationResult {
    pub old_authoritative_address: Address,
    pub new_authoritative_address: Address,
    pub ratio: Ratio,
    pub holder_count: usize,
    /// Decimal string.
    pub minted_total: String,
    /// Unix seconds at the start of the migration.
    pub timestamp: u64,
    pub new_name: String,
    pub new_symbol: String,
    /// Block the holder set was frozen at.
    pub snapshot_block: u64,
    /// Block of the pause transaction, `None` if the token was already paused.
    pub pause_block: Option<u64>,
    /// Blocks mined after `snapshot_block` and before `pause_block`. Transfers
    /// in them are not carried over to the new instance.
    pub snapshot_lag: u64,
    pub journal: Vec<HolderReplication>,
}
