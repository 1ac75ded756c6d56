//! Event Store operations.

use super::LedgerStore;
use crate::domain::errors::StoreError;
use crate::domain::keys::KeyPrefix;
use crate::domain::records::{corrupt, EventRow};
use crate::ports::inbound::EventStoreApi;
use crate::ports::outbound::{BatchOperation, ScanResult};
use shared_types::{EventSequence, Hash, TransferEvent};

impl LedgerStore {
    /// Sort `events` into total order and reject any sequence that repeats
    /// within the input or is already stored.
    pub(crate) fn ordered_new_events<'a>(
        &self,
        events: &'a [TransferEvent],
    ) -> Result<Vec<&'a TransferEvent>, StoreError> {
        let mut ordered: Vec<&TransferEvent> = events.iter().collect();
        ordered.sort_by_key(|e| e.sequence());

        if let Some(pair) = ordered
            .windows(2)
            .find(|pair| pair[0].sequence() == pair[1].sequence())
        {
            return Err(StoreError::DuplicateSequence {
                sequence: pair[1].sequence(),
            });
        }
        for event in &ordered {
            if self.kv.exists(&KeyPrefix::event_key(event.sequence()))? {
                return Err(StoreError::DuplicateSequence {
                    sequence: event.sequence(),
                });
            }
        }
        Ok(ordered)
    }

    /// Stage the event row and its transaction index entry.
    pub(crate) fn stage_event(
        event: &TransferEvent,
        ops: &mut Vec<BatchOperation>,
    ) -> Result<(), StoreError> {
        let key = KeyPrefix::event_key(event.sequence());
        let row = EventRow::from(event).encode()?;
        ops.push(BatchOperation::put(
            KeyPrefix::tx_index_key(&event.transaction_hash, event.sequence()),
            key.clone(),
        ));
        ops.push(BatchOperation::put(key, row));
        Ok(())
    }

    /// Stage a delete for every key under `prefix`. Returns how many.
    pub(crate) fn stage_prefix_delete(
        &self,
        prefix: KeyPrefix,
        ops: &mut Vec<BatchOperation>,
    ) -> Result<usize, StoreError> {
        let rows = self.kv.prefix_scan(prefix.as_bytes())?;
        let count = rows.len();
        ops.extend(rows.into_iter().map(|(key, _)| BatchOperation::delete(key)));
        Ok(count)
    }

    fn decode_events(rows: ScanResult) -> Result<Vec<TransferEvent>, StoreError> {
        rows.into_iter()
            .map(|(key, value)| EventRow::decode(&key, &value)?.into_event(&key))
            .collect()
    }
}

impl EventStoreApi for LedgerStore {
    fn append(&mut self, events: &[TransferEvent]) -> Result<(), StoreError> {
        let ordered = self.ordered_new_events(events)?;
        let mut ops = Vec::with_capacity(ordered.len() * 2);
        for event in &ordered {
            Self::stage_event(event, &mut ops)?;
        }
        self.kv.atomic_batch_write(ops)?;

        #[cfg(feature = "tracing-log")]
        tracing::debug!(count = ordered.len(), "[ce-01] Appended events");
        Ok(())
    }

    fn read_range(&self, from_block: u64, to_block: u64) -> Result<Vec<TransferEvent>, StoreError> {
        if from_block > to_block {
            return Err(StoreError::InvalidRange {
                from_block,
                to_block,
            });
        }
        let start = KeyPrefix::event_key(EventSequence::new(from_block, 0));
        let end = KeyPrefix::event_range_end(to_block);
        Self::decode_events(self.kv.range_scan(&start, &end)?)
    }

    fn read_up_to(&self, block: u64) -> Result<Vec<TransferEvent>, StoreError> {
        self.read_range(0, block)
    }

    fn find_by_transaction(&self, tx_hash: &Hash) -> Result<Vec<TransferEvent>, StoreError> {
        let mut events = Vec::new();
        for (index_key, event_key) in self.kv.prefix_scan(&KeyPrefix::tx_index_prefix(tx_hash))? {
            let value = self
                .kv
                .get(&event_key)?
                .ok_or_else(|| corrupt(&index_key, "index points at a missing event"))?;
            events.push(EventRow::decode(&event_key, &value)?.into_event(&event_key)?);
        }
        Ok(events)
    }

    fn event_count(&self) -> Result<usize, StoreError> {
        Ok(self.kv.prefix_scan(KeyPrefix::Event.as_bytes())?.len())
    }

    fn clear(&mut self) -> Result<usize, StoreError> {
        let mut ops = Vec::new();
        let cleared = self.stage_prefix_delete(KeyPrefix::Event, &mut ops)?;
        self.stage_prefix_delete(KeyPrefix::EventByTx, &mut ops)?;
        self.kv.atomic_batch_write(ops)?;

        #[cfg(feature = "tracing-log")]
        tracing::debug!(cleared, "[ce-01] Event store cleared");
        Ok(cleared)
    }
}
