//! Balance Ledger operations.

use super::LedgerStore;
use crate::domain::errors::StoreError;
use crate::ports::inbound::BalanceLedgerApi;
use shared_types::{Address, TransferEvent, U256};
use std::collections::BTreeMap;

impl BalanceLedgerApi for LedgerStore {
    fn apply(&mut self, event: &TransferEvent) -> Result<(), StoreError> {
        let mut working = self.balances.clone();
        let touched: BTreeMap<Address, U256> = working
            .apply(event)?
            .into_iter()
            .map(|c| (c.address, c.balance))
            .collect();

        let mut ops = Vec::with_capacity(touched.len());
        Self::stage_holders(&touched, &mut ops);
        self.kv.atomic_batch_write(ops)?;
        self.balances = working;
        Ok(())
    }

    fn current(&self, address: &Address) -> U256 {
        self.balances.get(address)
    }

    fn all(&self) -> Vec<(Address, U256)> {
        self.balances.iter().map(|(a, b)| (*a, *b)).collect()
    }

    fn total(&self) -> U256 {
        self.balances.total()
    }

    fn check_invariant(&self) -> Result<(), StoreError> {
        self.balances.check_invariant()
    }
}
