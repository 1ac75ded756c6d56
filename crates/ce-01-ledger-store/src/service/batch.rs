//! Atomic ingestion batches and migration cutover.

use super::LedgerStore;
use crate::domain::balances::BalanceMap;
use crate::domain::errors::StoreError;
use crate::domain::keys::KeyPrefix;
use crate::domain::records::{LedgerMeta, MetaKey};
use crate::ports::outbound::BatchOperation;
use shared_types::{Address, TransferEvent, U256};
use std::collections::BTreeMap;

/// What one committed batch changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitSummary {
    pub from_block: u64,
    pub to_block: u64,
    pub events: usize,
    pub holders_touched: usize,
}

impl LedgerStore {
    /// Append `events`, fold them into the ledger and advance
    /// `last_processed_block` to `to_block`, all in one batch write.
    ///
    /// `events` may arrive in any order; they are applied in
    /// `(block, log_index)` order.
    ///
    /// ## Errors
    ///
    /// - `InvalidRange`: `from_block > to_block`
    /// - `BoundaryRegression`: `to_block` does not advance past the current
    ///   `last_processed_block`
    /// - `EventOutsideBatch`: an event's block is outside the range
    /// - `DuplicateSequence`: an event is already stored or repeated
    /// - `NegativeBalance` / `BalanceOverflow`: the fold failed
    ///
    /// On any error nothing of the batch is visible.
    pub fn commit_batch(
        &mut self,
        events: &[TransferEvent],
        from_block: u64,
        to_block: u64,
    ) -> Result<CommitSummary, StoreError> {
        if from_block > to_block {
            return Err(StoreError::InvalidRange {
                from_block,
                to_block,
            });
        }
        if let Some(current) = self.meta.last_processed_block {
            if to_block <= current {
                return Err(StoreError::BoundaryRegression {
                    requested: to_block,
                    current,
                });
            }
        }

        let ordered = self.ordered_new_events(events)?;
        if let Some(outside) = ordered
            .iter()
            .find(|e| e.block < from_block || e.block > to_block)
        {
            return Err(StoreError::EventOutsideBatch {
                sequence: outside.sequence(),
                from_block,
                to_block,
            });
        }

        let mut working = self.balances.clone();
        let mut touched: BTreeMap<Address, U256> = BTreeMap::new();
        let mut ops = Vec::with_capacity(ordered.len() * 3 + 1);
        for event in &ordered {
            for change in working.apply(event)? {
                touched.insert(change.address, change.balance);
            }
            Self::stage_event(event, &mut ops)?;
        }
        Self::stage_holders(&touched, &mut ops);
        ops.push(BatchOperation::put(
            KeyPrefix::meta_key(MetaKey::LastProcessedBlock.as_str()),
            to_block.to_string().into_bytes(),
        ));

        self.kv.atomic_batch_write(ops)?;
        self.balances = working;
        self.meta.last_processed_block = Some(to_block);

        let summary = CommitSummary {
            from_block,
            to_block,
            events: ordered.len(),
            holders_touched: touched.len(),
        };

        #[cfg(feature = "tracing-log")]
        tracing::debug!(
            from_block,
            to_block,
            events = summary.events,
            holders_touched = summary.holders_touched,
            "[ce-01] Batch committed"
        );

        Ok(summary)
    }

    /// Clear events, holders and `last_processed_block`, and repoint the
    /// authoritative address, in one batch write.
    pub fn cutover(&mut self, new_address: Address) -> Result<(), StoreError> {
        let mut ops = Vec::new();
        let events_cleared = self.stage_prefix_delete(KeyPrefix::Event, &mut ops)?;
        self.stage_prefix_delete(KeyPrefix::EventByTx, &mut ops)?;
        let holders_cleared = self.stage_prefix_delete(KeyPrefix::Holder, &mut ops)?;
        ops.push(BatchOperation::delete(KeyPrefix::meta_key(
            MetaKey::LastProcessedBlock.as_str(),
        )));
        ops.push(BatchOperation::put(
            KeyPrefix::meta_key(MetaKey::CurrentAuthoritativeAddress.as_str()),
            new_address.to_string().into_bytes(),
        ));

        self.kv.atomic_batch_write(ops)?;
        let previous = self.meta.current_authoritative_address;
        self.balances = BalanceMap::new();
        self.meta = LedgerMeta {
            last_processed_block: None,
            current_authoritative_address: Some(new_address),
        };

        #[cfg(feature = "tracing-log")]
        tracing::info!(
            previous = ?previous,
            new = %new_address,
            events_cleared,
            holders_cleared,
            "[ce-01] Cutover complete"
        );
        #[cfg(not(feature = "tracing-log"))]
        let _ = (previous, events_cleared, holders_cleared);

        Ok(())
    }
}
