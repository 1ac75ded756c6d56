//! Per-holder replication journal.
//!
//! One entry per snapshot row, in snapshot order. Entries are marked as each
//! confirmed transaction lands, so a failed migration shows exactly which
//! holders were allow-listed and minted on the new instance.

use serde::{Serialize, Serializer};
use shared_types::{Address, U256};

use super::errors::MigrationError;

fn decimal<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HolderReplication {
    pub address: Address,
    /// Amount to mint on the new instance.
    #[serde(serialize_with = "decimal")]
    pub amount: U256,
    pub allowlisted: bool,
    pub minted: bool,
}

impl HolderReplication {
    /// Nothing left to submit for this holder.
    pub fn is_complete(&self) -> bool {
        self.allowlisted && (self.minted || self.amount.is_zero())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplicationJournal {
    entries: Vec<HolderReplication>,
}

impl ReplicationJournal {
    /// Plan one entry per holder with `balance * ratio` to mint.
    pub fn plan(
        holders: impl IntoIterator<Item = (Address, U256)>,
        ratio: u64,
    ) -> Result<Self, MigrationError> {
        let ratio = U256::from(ratio);
        let entries = holders
            .into_iter()
            .map(|(address, balance)| {
                let amount = balance
                    .checked_mul(ratio)
                    .ok_or(MigrationError::MintOverflow { holder: address })?;
                Ok(HolderReplication {
                    address,
                    amount,
                    allowlisted: false,
                    minted: false,
                })
            })
            .collect::<Result<Vec<_>, MigrationError>>()?;
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[HolderReplication] {
        &self.entries
    }

    pub(crate) fn entry_mut(&mut self, index: usize) -> Option<&mut HolderReplication> {
        self.entries.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn completed(&self) -> usize {
        self.entries.iter().filter(|e| e.is_complete()).count()
    }

    /// Holders still missing a confirmed allow-list or mint.
    pub fn pending(&self) -> impl Iterator<Item = &HolderReplication> {
        self.entries.iter().filter(|e| !e.is_complete())
    }

    /// Sum of confirmed mints.
    pub fn minted_total(&self) -> Result<U256, MigrationError> {
        self.entries
            .iter()
            .filter(|e| e.minted)
            .try_fold(U256::zero(), |total, e| {
                total
                    .checked_add(e.amount)
                    .ok_or(MigrationError::MintOverflow { holder: e.address })
            })
    }

    pub fn into_entries(self) -> Vec<HolderReplication> {
        self.entries
    }
}
