//! # Snapshot Entities
//!
//! A snapshot is the ledger replayed up to one block, set beside the
//! authoritative token's own `balanceOf` at that block.

use std::collections::BTreeMap;

use ce_01_ledger_store::BalanceMap;
use serde::{Serialize, Serializer};
use shared_types::{Address, U256};

use super::ownership::{format_pct, ownership_bp};

/// Header of the CSV export.
pub const CSV_HEADER: &str = "wallet,balance,ownership_pct,on_chain_balance";

fn decimal<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

fn percentage<S: Serializer>(bp: &u32, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_pct(*bp))
}

/// One holder in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotRow {
    pub address: Address,
    /// Balance derived from the replayed events.
    #[serde(serialize_with = "decimal")]
    pub ledger_balance: U256,
    /// `balanceOf` reported by the token at the snapshot block.
    #[serde(serialize_with = "decimal")]
    pub authoritative_balance: U256,
    /// Share of the ledger total, in basis points. Serialized as the
    /// four-decimal percentage.
    #[serde(rename = "ownership_pct", serialize_with = "percentage")]
    pub ownership_bp: u32,
}

impl SnapshotRow {
    /// Ownership as a percentage with four decimals, e.g. `70.0000`.
    pub fn ownership_pct(&self) -> String {
        format_pct(self.ownership_bp)
    }

    pub fn is_reconciled(&self) -> bool {
        self.ledger_balance == self.authoritative_balance
    }
}

/// A holder whose replayed balance differs from the token's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discrepancy {
    pub address: Address,
    #[serde(serialize_with = "decimal")]
    pub ledger_balance: U256,
    #[serde(serialize_with = "decimal")]
    pub authoritative_balance: U256,
}

/// Cap table at a single block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// Effective block: the requested block capped at the last processed one.
    pub block: u64,
    /// Token the authoritative balances were read from.
    pub token: Address,
    /// Sum of the replayed ledger balances.
    #[serde(serialize_with = "decimal")]
    pub total_supply: U256,
    /// Ordered by ledger balance descending, then address ascending.
    pub rows: Vec<SnapshotRow>,
    /// Ordered by address ascending.
    pub discrepancies: Vec<Discrepancy>,
}

impl Snapshot {
    /// Assemble a snapshot from a replayed ledger and the authoritative
    /// balance of each of its holders.
    ///
    /// Holders missing from `authoritative` are reported with a zero
    /// authoritative balance.
    pub fn assemble(
        block: u64,
        token: Address,
        replayed: &BalanceMap,
        authoritative: &BTreeMap<Address, U256>,
    ) -> Self {
        let total_supply = replayed.total();
        let mut rows = Vec::with_capacity(replayed.len());
        let mut discrepancies = Vec::new();

        for (address, balance) in replayed.iter() {
            let on_chain = authoritative.get(address).copied().unwrap_or_default();
            if *balance != on_chain {
                discrepancies.push(Discrepancy {
                    address: *address,
                    ledger_balance: *balance,
                    authoritative_balance: on_chain,
                });
            }
            rows.push(SnapshotRow {
                address: *address,
                ledger_balance: *balance,
                authoritative_balance: on_chain,
                ownership_bp: ownership_bp(*balance, total_supply),
            });
        }

        rows.sort_by(|a, b| {
            b.ledger_balance
                .cmp(&a.ledger_balance)
                .then_with(|| a.address.cmp(&b.address))
        });

        Self {
            block,
            token,
            total_supply,
            rows,
            discrepancies,
        }
    }

    pub fn holder_count(&self) -> usize {
        self.rows.len()
    }

    /// True when every holder matched the authoritative token.
    pub fn is_reconciled(&self) -> bool {
        self.discrepancies.is_empty()
    }

    /// Render as CSV: one header line plus one line per row, joined by
    /// `\n` with no trailing newline.
    pub fn to_csv(&self) -> String {
        let mut lines = Vec::with_capacity(self.rows.len() + 1);
        lines.push(CSV_HEADER.to_string());
        for row in &self.rows {
            lines.push(format!(
                "{},{},{},{}",
                row.address,
                row.ledger_balance,
                row.ownership_pct(),
                row.authoritative_balance
            ));
        }
        lines.join("\n")
    }
}
