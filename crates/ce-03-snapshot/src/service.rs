//! # Snapshot Engine Service
//!
//! The store read lock is held only while the effective block, token, and
//! events are read. Replay and every chain read run without it.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use ce_01_ledger_store::{BalanceMap, EventStoreApi, SharedLedgerStore};
use shared_types::{Address, ChainClient, ContractRead, TransferEvent, U256};
use tracing::{debug, info, warn};

use crate::domain::{Snapshot, SnapshotError};
use crate::ports::inbound::SnapshotApi;

/// Generates point-in-time cap tables.
pub struct SnapshotEngine<C: ChainClient> {
    chain: Arc<C>,
    store: SharedLedgerStore,
}

impl<C: ChainClient> SnapshotEngine<C> {
    pub fn new(chain: Arc<C>, store: SharedLedgerStore) -> Self {
        Self { chain, store }
    }

    fn load(
        &self,
        requested_block: Option<u64>,
    ) -> Result<(u64, Address, Vec<TransferEvent>), SnapshotError> {
        let store = self.store.read();
        let last = store
            .last_processed_block()
            .ok_or(SnapshotError::NotIndexed)?;
        let token = store
            .authoritative_address()
            .ok_or(SnapshotError::NoAuthoritativeAddress)?;
        let block = requested_block.map_or(last, |requested| requested.min(last));
        let events = store.read_up_to(block)?;
        Ok((block, token, events))
    }

    async fn balance_at(
        &self,
        token: Address,
        holder: Address,
        block: u64,
    ) -> Result<U256, SnapshotError> {
        let external = |source| SnapshotError::ExternalCallFailed {
            holder,
            block,
            source,
        };
        self.chain
            .read_contract(token, ContractRead::BalanceOf(holder), Some(block))
            .await
            .map_err(external)?
            .into_uint()
            .map_err(external)
    }
}

#[async_trait]
impl<C: ChainClient> SnapshotApi for SnapshotEngine<C> {
    async fn generate(&self, requested_block: Option<u64>) -> Result<Snapshot, SnapshotError> {
        let (block, token, events) = self.load(requested_block)?;
        let replayed = BalanceMap::replay(events.iter())?;
        debug!(
            block,
            events = events.len(),
            holders = replayed.len(),
            "[ce-03] Ledger replayed"
        );

        let mut authoritative = BTreeMap::new();
        for (holder, _) in replayed.iter() {
            let balance = self.balance_at(token, *holder, block).await?;
            authoritative.insert(*holder, balance);
        }

        let snapshot = Snapshot::assemble(block, token, &replayed, &authoritative);
        if !snapshot.is_reconciled() {
            warn!(
                block,
                discrepancies = snapshot.discrepancies.len(),
                "[ce-03] Ledger disagrees with authoritative balances"
            );
        }
        info!(
            block,
            holders = snapshot.holder_count(),
            total_supply = %snapshot.total_supply,
            "[ce-03] Snapshot generated"
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ce_01_ledger_store::{LedgerStore, StoreError};
    use shared_types::{DevChain, FailurePoint, TRANSFER_TOPIC};

    fn admin() -> Address {
        Address([0xAD; 20])
    }
    fn alice() -> Address {
        Address([0x0A; 20])
    }
    fn bob() -> Address {
        Address([0x0B; 20])
    }

    /// Ingest every block up to the chain head, as the scheduler would.
    async fn ingest_all(chain: &DevChain, token: Address, store: &SharedLedgerStore) {
        let head = chain.head();
        let from = store.read().last_processed_block().map_or(0, |b| b + 1);
        let events: Vec<TransferEvent> = chain
            .get_logs(token, TRANSFER_TOPIC, from, head)
            .await
            .unwrap()
            .into_iter()
            .map(TransferEvent::from)
            .collect();
        store.write().commit_batch(&events, from, head).unwrap();
    }

    /// alice mint 700 (3), bob mint 300 (5).
    async fn seeded() -> (Arc<DevChain>, Address, SharedLedgerStore) {
        let chain = DevChain::new();
        let token = chain.deploy_token("ChainEquity", "CEQ", admin());
        chain.seed_holder(token, alice(), U256::from(700)).unwrap();
        chain.seed_holder(token, bob(), U256::from(300)).unwrap();

        let mut store = LedgerStore::in_memory();
        store.ensure_authoritative_address(token).unwrap();
        let store = store.into_shared();
        ingest_all(&chain, token, &store).await;
        (Arc::new(chain), token, store)
    }

    #[tokio::test]
    async fn test_snapshot_matches_chain() {
        let (chain, token, store) = seeded().await;
        let engine = SnapshotEngine::new(chain, store);

        let snapshot = engine.generate(None).await.unwrap();

        assert_eq!(snapshot.block, 5);
        assert_eq!(snapshot.token, token);
        assert_eq!(snapshot.total_supply, U256::from(1000));
        assert!(snapshot.is_reconciled());
        let expected = format!(
            "wallet,balance,ownership_pct,on_chain_balance\n{},700,70.0000,700\n{},300,30.0000,300",
            alice(),
            bob()
        );
        assert_eq!(snapshot.to_csv(), expected);
    }

    #[tokio::test]
    async fn test_requested_block_capped_at_last_processed() {
        let (chain, _, store) = seeded().await;
        chain.mine_blocks(10);
        let engine = SnapshotEngine::new(chain, store);

        let snapshot = engine.generate(Some(1_000)).await.unwrap();
        assert_eq!(snapshot.block, 5);
    }

    #[tokio::test]
    async fn test_historical_block_replays_prefix() {
        let (chain, _, store) = seeded().await;
        let engine = SnapshotEngine::new(chain, store);

        let snapshot = engine.generate(Some(4)).await.unwrap();

        assert_eq!(snapshot.block, 4);
        assert_eq!(snapshot.holder_count(), 1);
        assert_eq!(snapshot.rows[0].address, alice());
        assert_eq!(snapshot.rows[0].ownership_pct(), "100.0000");
        assert!(snapshot.is_reconciled());
    }

    #[tokio::test]
    async fn test_replay_is_deterministic_and_leaves_ledger_alone() {
        let (chain, token, store) = seeded().await;
        chain.transfer(token, alice(), bob(), U256::from(200)).unwrap();
        ingest_all(&chain, token, &store).await;
        let engine = SnapshotEngine::new(chain, store.clone());

        let first = engine.generate(Some(5)).await.unwrap();
        let second = engine.generate(Some(5)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.rows[0].ledger_balance, U256::from(700));
        assert_eq!(store.read().balances().get(&alice()), U256::from(500));
    }

    #[tokio::test]
    async fn test_unlogged_drift_reported_as_discrepancy() {
        let (chain, token, store) = seeded().await;
        chain.set_balance_unlogged(token, bob(), U256::from(350));
        ingest_all(&chain, token, &store).await;
        let engine = SnapshotEngine::new(chain, store);

        let snapshot = engine.generate(None).await.unwrap();

        assert_eq!(snapshot.discrepancies.len(), 1);
        let d = &snapshot.discrepancies[0];
        assert_eq!(d.address, bob());
        assert_eq!(d.ledger_balance, U256::from(300));
        assert_eq!(d.authoritative_balance, U256::from(350));
        // Ledger figures still drive the cap table.
        assert_eq!(snapshot.total_supply, U256::from(1000));
    }

    #[tokio::test]
    async fn test_zero_supply_snapshot() {
        let chain = Arc::new(DevChain::new());
        let token = chain.deploy_token("ChainEquity", "CEQ", admin());
        let mut store = LedgerStore::in_memory();
        store.ensure_authoritative_address(token).unwrap();
        let store = store.into_shared();
        ingest_all(&chain, token, &store).await;
        let engine = SnapshotEngine::new(chain, store);

        let snapshot = engine.generate(None).await.unwrap();

        assert_eq!(snapshot.total_supply, U256::zero());
        assert!(snapshot.rows.is_empty());
        assert_eq!(snapshot.to_csv(), "wallet,balance,ownership_pct,on_chain_balance");
    }

    #[tokio::test]
    async fn test_block_before_first_mint_has_zero_supply() {
        let (chain, _, store) = seeded().await;
        let engine = SnapshotEngine::new(chain, store);

        // Block 2 holds alice's allow-listing, her mint lands in block 3.
        let snapshot = engine.generate(Some(2)).await.unwrap();

        assert_eq!(snapshot.block, 2);
        assert_eq!(snapshot.total_supply, U256::zero());
        assert!(snapshot.rows.is_empty());
        assert!(snapshot.discrepancies.is_empty());
        assert_eq!(snapshot.to_csv(), crate::domain::CSV_HEADER);
    }

    #[tokio::test]
    async fn test_not_indexed() {
        let chain = Arc::new(DevChain::new());
        let token = chain.deploy_token("ChainEquity", "CEQ", admin());
        let mut store = LedgerStore::in_memory();
        store.ensure_authoritative_address(token).unwrap();
        let engine = SnapshotEngine::new(chain, store.into_shared());

        assert_eq!(engine.generate(None).await.unwrap_err(), SnapshotError::NotIndexed);
    }

    #[tokio::test]
    async fn test_balance_read_failure() {
        let (chain, _, store) = seeded().await;
        chain.inject_failure(FailurePoint::Read);
        let engine = SnapshotEngine::new(chain, store);

        let err = engine.generate(None).await.unwrap_err();
        assert!(matches!(err, SnapshotError::ExternalCallFailed { block: 5, .. }));
    }

    #[test]
    fn test_store_errors_convert() {
        let inner = StoreError::InvalidRange {
            from_block: 4,
            to_block: 2,
        };
        let err: SnapshotError = inner.clone().into();
        assert_eq!(err, SnapshotError::Store(inner));
    }
}
