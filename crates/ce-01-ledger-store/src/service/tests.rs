use super::*;
use crate::domain::errors::KVStoreError;
use crate::ports::inbound::{BalanceLedgerApi, EventStoreApi};
use crate::ports::outbound::ScanResult;
use shared_types::{EventSequence, TransferEvent, TRANSFER_TOPIC};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn addr(b: u8) -> Address {
    Address([b; 20])
}

fn event(block: u64, log_index: u64, from: Address, to: Address, value: u64) -> TransferEvent {
    TransferEvent {
        block,
        log_index,
        transaction_hash: [block as u8; 32],
        from,
        to,
        value: U256::from(value),
        topic: TRANSFER_TOPIC,
        raw_data: vec![],
    }
}

/// In-memory store whose batch writes can be made to fail.
struct FlakyKVStore {
    inner: InMemoryKVStore,
    fail_batches: Arc<AtomicBool>,
}

impl KeyValueStore for FlakyKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        self.inner.get(key)
    }
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        self.inner.put(key, value)
    }
    fn delete(&mut self, key: &[u8]) -> Result<(), KVStoreError> {
        self.inner.delete(key)
    }
    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        if self.fail_batches.load(Ordering::SeqCst) {
            return Err(KVStoreError::IOError {
                message: "disk full".into(),
            });
        }
        self.inner.atomic_batch_write(operations)
    }
    fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        self.inner.exists(key)
    }
    fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, KVStoreError> {
        self.inner.prefix_scan(prefix)
    }
    fn range_scan(&self, start: &[u8], end: &[u8]) -> Result<ScanResult, KVStoreError> {
        self.inner.range_scan(start, end)
    }
}

fn funded_store() -> LedgerStore {
    let mut store = LedgerStore::in_memory();
    store
        .commit_batch(
            &[
                event(1, 0, Address::ZERO, addr(1), 100),
                event(1, 1, Address::ZERO, addr(2), 100),
            ],
            0,
            1,
        )
        .unwrap();
    store
}

// =============================================================================
// Event Store
// =============================================================================

#[test]
fn test_append_and_read_range_in_total_order() {
    let mut store = LedgerStore::in_memory();
    store
        .append(&[
            event(3, 0, Address::ZERO, addr(1), 1),
            event(1, 2, Address::ZERO, addr(1), 1),
            event(1, 0, Address::ZERO, addr(1), 1),
            event(2, 5, Address::ZERO, addr(1), 1),
        ])
        .unwrap();

    let sequences: Vec<_> = store
        .read_range(1, 2)
        .unwrap()
        .iter()
        .map(|e| e.sequence())
        .collect();
    assert_eq!(
        sequences,
        vec![
            EventSequence::new(1, 0),
            EventSequence::new(1, 2),
            EventSequence::new(2, 5)
        ]
    );
    assert_eq!(store.read_up_to(u64::MAX).unwrap().len(), 4);
    assert_eq!(store.event_count().unwrap(), 4);
}

#[test]
fn test_read_range_rejects_inverted_range() {
    let store = LedgerStore::in_memory();
    assert_eq!(
        store.read_range(5, 4).unwrap_err(),
        StoreError::InvalidRange {
            from_block: 5,
            to_block: 4
        }
    );
    assert!(store.read_range(4, 4).unwrap().is_empty());
}

#[test]
fn test_append_rejects_duplicates_atomically() {
    let mut store = LedgerStore::in_memory();
    store.append(&[event(1, 0, Address::ZERO, addr(1), 1)]).unwrap();

    let err = store
        .append(&[
            event(2, 0, Address::ZERO, addr(1), 1),
            event(1, 0, Address::ZERO, addr(1), 1),
        ])
        .unwrap_err();
    assert_eq!(
        err,
        StoreError::DuplicateSequence {
            sequence: EventSequence::new(1, 0)
        }
    );
    assert_eq!(store.event_count().unwrap(), 1);

    let err = store
        .append(&[
            event(4, 1, Address::ZERO, addr(1), 1),
            event(4, 1, Address::ZERO, addr(2), 2),
        ])
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateSequence { .. }));
    assert_eq!(store.event_count().unwrap(), 1);
}

#[test]
fn test_find_by_transaction() {
    let mut store = LedgerStore::in_memory();
    let mut a = event(7, 1, Address::ZERO, addr(1), 5);
    let mut b = event(7, 0, Address::ZERO, addr(2), 6);
    let other = event(8, 0, Address::ZERO, addr(3), 7);
    a.transaction_hash = [0xAA; 32];
    b.transaction_hash = [0xAA; 32];
    store.append(&[a.clone(), other, b.clone()]).unwrap();

    assert_eq!(store.find_by_transaction(&[0xAA; 32]).unwrap(), vec![b, a]);
    assert!(store.find_by_transaction(&[0x01; 32]).unwrap().is_empty());
}

// =============================================================================
// Balance Ledger
// =============================================================================

#[test]
fn test_apply_negative_balance_leaves_ledger_unchanged() {
    let mut store = funded_store();
    let before = store.all();

    let err = store
        .apply(&event(2, 0, addr(1), addr(2), 101))
        .unwrap_err();
    assert!(matches!(err, StoreError::NegativeBalance { address, .. } if address == addr(1)));
    assert_eq!(store.all(), before);
    assert_eq!(store.current(&addr(9)), U256::zero());
}

#[test]
fn test_all_is_address_ascending_and_total_matches() {
    let mut store = funded_store();
    store.apply(&event(2, 0, addr(2), addr(1), 100)).unwrap();

    assert_eq!(store.all(), vec![(addr(1), U256::from(200))]);
    assert_eq!(store.total(), U256::from(200));
    store.check_invariant().unwrap();
}

// =============================================================================
// Batches and cutover
// =============================================================================

#[test]
fn test_commit_batch_advances_meta() {
    let mut store = funded_store();
    let summary = store
        .commit_batch(&[event(3, 0, addr(1), addr(3), 40)], 2, 10)
        .unwrap();

    assert_eq!(summary.events, 1);
    assert_eq!(summary.holders_touched, 2);
    assert_eq!(store.last_processed_block(), Some(10));
    assert_eq!(store.current(&addr(3)), U256::from(40));

    // Empty batches still advance the boundary.
    store.commit_batch(&[], 11, 20).unwrap();
    assert_eq!(store.last_processed_block(), Some(20));
}

#[test]
fn test_commit_batch_failure_is_invisible() {
    let mut store = funded_store();
    let err = store
        .commit_batch(
            &[
                event(2, 0, addr(1), addr(3), 50),
                event(2, 1, addr(2), addr(3), 500),
            ],
            2,
            2,
        )
        .unwrap_err();

    assert!(matches!(err, StoreError::NegativeBalance { .. }));
    assert_eq!(store.last_processed_block(), Some(1));
    assert_eq!(store.current(&addr(1)), U256::from(100));
    assert_eq!(store.current(&addr(3)), U256::zero());
    assert!(store.read_range(2, 2).unwrap().is_empty());
}

#[test]
fn test_commit_batch_rejects_bad_ranges() {
    let mut store = funded_store();
    assert_eq!(
        store.commit_batch(&[], 1, 1).unwrap_err(),
        StoreError::BoundaryRegression {
            requested: 1,
            current: 1
        }
    );
    let err = store
        .commit_batch(&[event(9, 0, Address::ZERO, addr(1), 1)], 2, 5)
        .unwrap_err();
    assert!(matches!(err, StoreError::EventOutsideBatch { .. }));
}

#[test]
fn test_kv_failure_leaves_memory_untouched() {
    let fail = Arc::new(AtomicBool::new(false));
    let mut store = LedgerStore::open(Box::new(FlakyKVStore {
        inner: InMemoryKVStore::new(),
        fail_batches: fail.clone(),
    }))
    .unwrap();
    store
        .commit_batch(&[event(1, 0, Address::ZERO, addr(1), 10)], 0, 1)
        .unwrap();

    fail.store(true, Ordering::SeqCst);
    let err = store
        .commit_batch(&[event(2, 0, addr(1), addr(2), 5)], 2, 2)
        .unwrap_err();
    assert!(matches!(err, StoreError::Storage(_)));
    assert_eq!(store.current(&addr(1)), U256::from(10));
    assert_eq!(store.last_processed_block(), Some(1));
}

#[test]
fn test_cutover_clears_and_repoints() {
    let mut store = funded_store();
    store.ensure_authoritative_address(addr(0xA0)).unwrap();
    store.cutover(addr(0xB0)).unwrap();

    assert_eq!(store.last_processed_block(), None);
    assert_eq!(store.authoritative_address(), Some(addr(0xB0)));
    assert!(store.all().is_empty());
    assert_eq!(store.event_count().unwrap(), 0);
    assert!(store.find_by_transaction(&[1u8; 32]).unwrap().is_empty());
    assert_eq!(store.kv.prefix_scan(b"").unwrap().len(), 1);
}

#[test]
fn test_clear_removes_events_and_index_only() {
    let mut store = funded_store();

    assert_eq!(store.clear().unwrap(), 2);
    assert_eq!(store.event_count().unwrap(), 0);
    assert!(store.find_by_transaction(&[1u8; 32]).unwrap().is_empty());
    assert_eq!(store.current(&addr(1)), U256::from(100));
    assert_eq!(store.last_processed_block(), Some(1));
}

#[test]
fn test_ensure_authoritative_address_keeps_existing() {
    let mut store = LedgerStore::in_memory();
    assert_eq!(store.ensure_authoritative_address(addr(1)).unwrap(), addr(1));
    assert_eq!(store.ensure_authoritative_address(addr(2)).unwrap(), addr(1));
}

#[test]
fn test_verify_against_replay_detects_drift() {
    let mut store = funded_store();
    store.verify_against_replay().unwrap();

    // A holder row written behind the event log's back.
    store
        .kv
        .put(&KeyPrefix::holder_key(&addr(1)), b"99")
        .unwrap();
    let reopened = LedgerStore::open(std::mem::replace(
        &mut store.kv,
        Box::new(InMemoryKVStore::new()),
    ))
    .unwrap();
    assert_eq!(
        reopened.verify_against_replay().unwrap_err(),
        StoreError::LedgerDrift {
            address: addr(1),
            materialized: U256::from(99),
            replayed: U256::from(100),
        }
    );
}
