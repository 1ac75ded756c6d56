//! # Balance Fold
//!
//! The pure debit/credit fold shared by the live Balance Ledger and by
//! snapshot replay.
//!
//! ## Invariants
//!
//! - No entry holds zero (absent = zero).
//! - The zero address is never tracked.
//! - Sum of entries == minted - burned over all applied events.
//! - A failed `apply` leaves the map unchanged.

use shared_types::{Address, TransferEvent, U256};
use std::collections::BTreeMap;

use super::errors::StoreError;

/// The post-event balance of one touched address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceChange {
    pub address: Address,
    pub balance: U256,
}

/// Address → balance map built by folding transfer events in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalanceMap {
    balances: BTreeMap<Address, U256>,
    minted: U256,
    burned: U256,
}

impl BalanceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted holder rows.
    ///
    /// Persisted rows carry no mint/burn history, so the net supply is taken
    /// to be the sum of the rows.
    pub fn from_holders(
        holders: impl IntoIterator<Item = (Address, U256)>,
    ) -> Result<Self, StoreError> {
        let mut map = Self::new();
        for (address, balance) in holders {
            if address.is_zero() || balance.is_zero() {
                continue;
            }
            map.minted = map
                .minted
                .checked_add(balance)
                .ok_or(StoreError::BalanceOverflow { address })?;
            map.balances.insert(address, balance);
        }
        Ok(map)
    }

    /// Fold a sequence of events, failing on the first violation.
    pub fn replay<'a>(
        events: impl IntoIterator<Item = &'a TransferEvent>,
    ) -> Result<Self, StoreError> {
        let mut map = Self::new();
        for event in events {
            map.apply(event)?;
        }
        Ok(map)
    }

    /// Debit `from`, credit `to`. Zero-address sides are skipped.
    ///
    /// Returns the new balance of every touched address.
    pub fn apply(&mut self, event: &TransferEvent) -> Result<Vec<BalanceChange>, StoreError> {
        let value = event.value;
        let mut changes = Vec::with_capacity(2);

        let debited = if event.from.is_zero() {
            None
        } else {
            let balance = self.get(&event.from);
            let next = balance
                .checked_sub(value)
                .ok_or(StoreError::NegativeBalance {
                    address: event.from,
                    balance,
                    debit: value,
                })?;
            Some(next)
        };

        let credited = if event.to.is_zero() {
            None
        } else {
            let base = match debited {
                Some(next) if event.to == event.from => next,
                _ => self.get(&event.to),
            };
            Some(
                base.checked_add(value)
                    .ok_or(StoreError::BalanceOverflow { address: event.to })?,
            )
        };

        let minted = if event.from.is_zero() {
            self.minted
                .checked_add(value)
                .ok_or(StoreError::BalanceOverflow { address: event.to })?
        } else {
            self.minted
        };
        let burned = if event.to.is_zero() {
            self.burned
                .checked_add(value)
                .ok_or(StoreError::BalanceOverflow { address: event.from })?
        } else {
            self.burned
        };

        // Everything validated; commit.
        if let Some(next) = debited {
            self.set(event.from, next);
            changes.push(BalanceChange {
                address: event.from,
                balance: next,
            });
        }
        if let Some(next) = credited {
            self.set(event.to, next);
            changes.retain(|c| c.address != event.to);
            changes.push(BalanceChange {
                address: event.to,
                balance: next,
            });
        }
        self.minted = minted;
        self.burned = burned;
        Ok(changes)
    }

    fn set(&mut self, address: Address, balance: U256) {
        if balance.is_zero() {
            self.balances.remove(&address);
        } else {
            self.balances.insert(address, balance);
        }
    }

    /// Balance of `address`, zero if untracked.
    pub fn get(&self, address: &Address) -> U256 {
        self.balances.get(address).copied().unwrap_or_default()
    }

    /// Entries in ascending address order.
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &U256)> {
        self.balances.iter()
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    /// Sum of all tracked balances.
    pub fn total(&self) -> U256 {
        self.balances
            .values()
            .fold(U256::zero(), |acc, v| acc.saturating_add(*v))
    }

    /// Minted minus burned.
    pub fn net_supply(&self) -> U256 {
        self.minted.saturating_sub(self.burned)
    }

    pub fn check_invariant(&self) -> Result<(), StoreError> {
        let tracked = self.total();
        let net_supply = self.net_supply();
        if tracked != net_supply || self.burned > self.minted {
            return Err(StoreError::InvariantViolated {
                tracked,
                net_supply,
            });
        }
        Ok(())
    }

    pub fn into_inner(self) -> BTreeMap<Address, U256> {
        self.balances
    }
}
