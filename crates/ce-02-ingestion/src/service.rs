//! # Ingestion Scheduler Service
//!
//! Polls the chain head, derives the confirmed target, and walks the
//! unprocessed range in fixed-size batches. Each batch is fetched, then
//! committed to the ledger store (events, balances, boundary) in one write.
//!
//! The store lock is never held across a chain call.

use std::sync::Arc;

use async_trait::async_trait;
use ce_01_ledger_store::SharedLedgerStore;
use parking_lot::Mutex;
use shared_types::{ChainClient, TransferEvent, TRANSFER_TOPIC};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::domain::config::IngestionConfig;
use crate::domain::errors::IngestionError;
use crate::domain::state::{confirmed_target, plan_batches, SchedulerState, SyncOutcome};
use crate::ports::inbound::IngestionApi;

/// The Ingestion Scheduler.
pub struct IngestionScheduler<C: ChainClient> {
    chain: Arc<C>,
    store: SharedLedgerStore,
    config: IngestionConfig,
    state: Mutex<SchedulerState>,
}

impl<C: ChainClient> IngestionScheduler<C> {
    pub fn new(
        chain: Arc<C>,
        store: SharedLedgerStore,
        config: IngestionConfig,
    ) -> Result<Self, IngestionError> {
        config.validate()?;
        Ok(Self {
            chain,
            store,
            config,
            state: Mutex::new(SchedulerState::Idle),
        })
    }

    pub fn config(&self) -> &IngestionConfig {
        &self.config
    }

    /// Tick every `poll_interval` until `shutdown` turns true or its sender
    /// is dropped. An in-flight cycle always completes before the loop exits.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            confirmations = self.config.confirmations,
            batch_size = self.config.batch_size,
            poll_ms = self.config.poll_interval.as_millis() as u64,
            "[ce-02] Ingestion scheduler started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => self.tick().await,
            }
        }

        info!("[ce-02] Ingestion scheduler stopped");
    }

    async fn tick(&self) {
        match self.run_cycle().await {
            Ok(SyncOutcome::UpToDate) => debug!("[ce-02] Up to date"),
            Ok(SyncOutcome::Advanced { from, to, events }) => {
                info!(from, to, events, "[ce-02] Ingested confirmed blocks")
            }
            Ok(SyncOutcome::Superseded) => {
                info!("[ce-02] Authoritative address changed, cycle discarded")
            }
            Err(e) if e.is_consistency_violation() => {
                error!(error = %e, "[ce-02] Consistency violation, ingestion halted at last boundary")
            }
            Err(e) => warn!(error = %e, "[ce-02] Sync cycle failed, retrying next tick"),
        }
    }

    async fn sync(&self) -> Result<SyncOutcome, IngestionError> {
        let head = self
            .chain
            .get_chain_head()
            .await
            .map_err(IngestionError::external("get_chain_head"))?;
        let target = confirmed_target(head, self.config.confirmations);

        let (token, last) = {
            let store = self.store.read();
            let token = store
                .authoritative_address()
                .ok_or(IngestionError::NoAuthoritativeAddress)?;
            (token, store.last_processed_block())
        };

        let batches = plan_batches(last, target, self.config.batch_size);
        let Some(first) = batches.first().copied() else {
            return Ok(SyncOutcome::UpToDate);
        };

        let mut events_total = 0;
        for range in &batches {
            let events: Vec<TransferEvent> = self
                .chain
                .get_logs(token, TRANSFER_TOPIC, range.from, range.to)
                .await
                .map_err(IngestionError::external("get_logs"))?
                .into_iter()
                .map(TransferEvent::from)
                .collect();

            let mut store = self.store.write();
            if store.authoritative_address() != Some(token) {
                return Ok(SyncOutcome::Superseded);
            }
            let summary = store.commit_batch(&events, range.from, range.to)?;
            events_total += summary.events;
            debug!(
                from = range.from,
                to = range.to,
                events = summary.events,
                "[ce-02] Batch committed"
            );
        }

        Ok(SyncOutcome::Advanced {
            from: first.from,
            to: target,
            events: events_total,
        })
    }
}

#[async_trait]
impl<C: ChainClient> IngestionApi for IngestionScheduler<C> {
    async fn run_cycle(&self) -> Result<SyncOutcome, IngestionError> {
        *self.state.lock() = SchedulerState::Syncing;
        let result = self.sync().await;
        *self.state.lock() = SchedulerState::Idle;
        result
    }

    fn state(&self) -> SchedulerState {
        *self.state.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ce_01_ledger_store::{BalanceLedgerApi, EventStoreApi, LedgerStore, StoreError};
    use shared_types::{
        Address, ChainError, ContractArtifact, ContractCall, ContractRead, DevChain, FailurePoint,
        Hash, RawLog, ReadValue, TokenConstructor, TransactionReceipt, U256,
    };
    use std::time::Duration;

    /// Cuts the store over to `next` while a batch's logs are in flight.
    struct CutoverDuringLogs {
        inner: Arc<DevChain>,
        store: SharedLedgerStore,
        next: Address,
    }

    #[async_trait]
    impl ChainClient for CutoverDuringLogs {
        async fn get_chain_head(&self) -> Result<u64, ChainError> {
            self.inner.get_chain_head().await
        }

        async fn get_logs(
            &self,
            address: Address,
            event_signature: Hash,
            from_block: u64,
            to_block: u64,
        ) -> Result<Vec<RawLog>, ChainError> {
            let logs = self
                .inner
                .get_logs(address, event_signature, from_block, to_block)
                .await?;
            self.store.write().cutover(self.next).unwrap();
            Ok(logs)
        }

        async fn read_contract(
            &self,
            address: Address,
            call: ContractRead,
            at_block: Option<u64>,
        ) -> Result<ReadValue, ChainError> {
            self.inner.read_contract(address, call, at_block).await
        }

        async fn submit_transaction(
            &self,
            address: Address,
            call: ContractCall,
        ) -> Result<Hash, ChainError> {
            self.inner.submit_transaction(address, call).await
        }

        async fn wait_for_receipt(&self, tx_hash: Hash) -> Result<TransactionReceipt, ChainError> {
            self.inner.wait_for_receipt(tx_hash).await
        }

        async fn deploy_contract(
            &self,
            artifact: &ContractArtifact,
            constructor: TokenConstructor,
        ) -> Result<TransactionReceipt, ChainError> {
            self.inner.deploy_contract(artifact, constructor).await
        }
    }

    fn admin() -> Address {
        Address([0xAD; 20])
    }
    fn alice() -> Address {
        Address([0x0A; 20])
    }
    fn bob() -> Address {
        Address([0x0B; 20])
    }

    /// deploy(1), alice allowlist(2) mint 100(3), bob allowlist(4) mint 50(5),
    /// alice → bob 30(6).
    fn busy_chain() -> (Arc<DevChain>, Address) {
        let chain = DevChain::new();
        let token = chain.deploy_token("ChainEquity", "CEQ", admin());
        chain.seed_holder(token, alice(), U256::from(100)).unwrap();
        chain.seed_holder(token, bob(), U256::from(50)).unwrap();
        chain.transfer(token, alice(), bob(), U256::from(30)).unwrap();
        assert_eq!(chain.head(), 6);
        (Arc::new(chain), token)
    }

    fn store_for(token: Address) -> SharedLedgerStore {
        let mut store = LedgerStore::in_memory();
        store.ensure_authoritative_address(token).unwrap();
        store.into_shared()
    }

    fn config(confirmations: u64, batch_size: u64) -> IngestionConfig {
        IngestionConfig {
            confirmations,
            poll_interval: Duration::from_millis(10),
            batch_size,
        }
    }

    #[tokio::test]
    async fn test_cycle_ingests_confirmed_range() {
        let (chain, token) = busy_chain();
        let store = store_for(token);
        let scheduler =
            IngestionScheduler::new(chain.clone(), store.clone(), config(0, 500)).unwrap();

        let outcome = scheduler.run_cycle().await.unwrap();
        assert_eq!(
            outcome,
            SyncOutcome::Advanced {
                from: 0,
                to: 6,
                events: 3
            }
        );
        let store = store.read();
        assert_eq!(store.current(&alice()), U256::from(70));
        assert_eq!(store.current(&bob()), U256::from(80));
        assert_eq!(store.last_processed_block(), Some(6));
        store.check_invariant().unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[tokio::test]
    async fn test_confirmation_depth_holds_back_recent_blocks() {
        let (chain, token) = busy_chain();
        let store = store_for(token);
        let scheduler =
            IngestionScheduler::new(chain.clone(), store.clone(), config(3, 500)).unwrap();

        scheduler.run_cycle().await.unwrap();
        assert_eq!(store.read().last_processed_block(), Some(3));
        assert_eq!(store.read().current(&bob()), U256::zero());

        assert_eq!(scheduler.run_cycle().await.unwrap(), SyncOutcome::UpToDate);

        chain.mine_blocks(3);
        scheduler.run_cycle().await.unwrap();
        assert_eq!(store.read().current(&bob()), U256::from(80));
    }

    #[tokio::test]
    async fn test_head_below_confirmations_still_syncs_genesis() {
        let chain = Arc::new(DevChain::new());
        let token = chain.deploy_token("ChainEquity", "CEQ", admin());
        let store = store_for(token);
        let scheduler = IngestionScheduler::new(chain, store.clone(), config(5, 500)).unwrap();

        assert_eq!(
            scheduler.run_cycle().await.unwrap(),
            SyncOutcome::Advanced {
                from: 0,
                to: 0,
                events: 0
            }
        );
        assert_eq!(scheduler.run_cycle().await.unwrap(), SyncOutcome::UpToDate);
    }

    #[tokio::test]
    async fn test_resume_after_failure_matches_uninterrupted_run() {
        let (chain, token) = busy_chain();

        let clean = store_for(token);
        IngestionScheduler::new(chain.clone(), clean.clone(), config(0, 2))
            .unwrap()
            .run_cycle()
            .await
            .unwrap();

        let resumed = store_for(token);
        let scheduler =
            IngestionScheduler::new(chain.clone(), resumed.clone(), config(0, 2)).unwrap();
        chain.inject_failure(FailurePoint::Logs { from_block: 2 });

        let err = scheduler.run_cycle().await.unwrap_err();
        assert!(matches!(
            err,
            IngestionError::ExternalCallFailed {
                operation: "get_logs",
                ..
            }
        ));
        assert_eq!(resumed.read().last_processed_block(), Some(1));

        let outcome = scheduler.run_cycle().await.unwrap();
        assert_eq!(
            outcome,
            SyncOutcome::Advanced {
                from: 2,
                to: 6,
                events: 3
            }
        );

        let (clean, resumed) = (clean.read(), resumed.read());
        assert_eq!(clean.all(), resumed.all());
        assert_eq!(clean.last_processed_block(), resumed.last_processed_block());
        assert_eq!(clean.read_up_to(6).unwrap(), resumed.read_up_to(6).unwrap());
    }

    #[tokio::test]
    async fn test_negative_balance_halts_at_boundary() {
        let (chain, token) = busy_chain();
        let store = store_for(token);
        // Skip the block holding alice's mint.
        store.write().commit_batch(&[], 0, 3).unwrap();

        let scheduler = IngestionScheduler::new(chain, store.clone(), config(0, 500)).unwrap();
        let err = scheduler.run_cycle().await.unwrap_err();

        assert!(matches!(
            err,
            IngestionError::Store(StoreError::NegativeBalance { .. })
        ));
        assert!(err.is_consistency_violation());
        let store = store.read();
        assert_eq!(store.last_processed_block(), Some(3));
        assert!(store.all().is_empty());
    }

    #[tokio::test]
    async fn test_chain_head_failure_is_external() {
        let (chain, token) = busy_chain();
        chain.inject_failure(FailurePoint::ChainHead);
        let scheduler = IngestionScheduler::new(chain, store_for(token), config(0, 500)).unwrap();

        let err = scheduler.run_cycle().await.unwrap_err();
        assert!(matches!(
            err,
            IngestionError::ExternalCallFailed {
                operation: "get_chain_head",
                ..
            }
        ));
        assert!(!err.is_consistency_violation());
    }

    #[tokio::test]
    async fn test_missing_authoritative_address() {
        let (chain, _) = busy_chain();
        let scheduler =
            IngestionScheduler::new(chain, LedgerStore::in_memory().into_shared(), config(0, 500))
                .unwrap();
        assert_eq!(
            scheduler.run_cycle().await.unwrap_err(),
            IngestionError::NoAuthoritativeAddress
        );
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let (chain, token) = busy_chain();
        let result = IngestionScheduler::new(chain, store_for(token), config(0, 0));
        assert!(matches!(result, Err(IngestionError::InvalidConfig(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_loop_stops_on_shutdown() {
        let (chain, token) = busy_chain();
        let store = store_for(token);
        let scheduler =
            Arc::new(IngestionScheduler::new(chain, store.clone(), config(0, 500)).unwrap());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { scheduler.run(shutdown_rx).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("scheduler did not stop")
            .unwrap();

        assert_eq!(store.read().last_processed_block(), Some(6));
    }

    #[tokio::test]
    async fn test_cutover_mid_cycle_discards_pending_batch() {
        let (chain, token) = busy_chain();
        let store = store_for(token);
        let next = Address([0x5E; 20]);
        let client = Arc::new(CutoverDuringLogs {
            inner: chain,
            store: store.clone(),
            next,
        });
        let scheduler = IngestionScheduler::new(client, store.clone(), config(0, 500)).unwrap();

        assert_eq!(scheduler.run_cycle().await.unwrap(), SyncOutcome::Superseded);

        let store = store.read();
        assert_eq!(store.authoritative_address(), Some(next));
        assert_eq!(store.last_processed_block(), None);
        assert!(store.all().is_empty());
        assert_eq!(store.read_up_to(u64::MAX).unwrap(), vec![]);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_loop_retries_after_failed_cycle() {
        let (chain, token) = busy_chain();
        chain.inject_failure(FailurePoint::ChainHead);
        let store = store_for(token);
        let scheduler =
            Arc::new(IngestionScheduler::new(chain, store.clone(), config(0, 500)).unwrap());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { scheduler.run(shutdown_rx).await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(store.read().last_processed_block(), Some(6));
        assert_eq!(store.read().current(&bob()), U256::from(80));

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("scheduler did not stop")
            .unwrap();
    }
}
