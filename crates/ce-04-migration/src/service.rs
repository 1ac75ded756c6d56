//! # Migration Orchestrator Service
//!
//! Runs the pause → snapshot → deploy → replicate → cutover protocol. Chain
//! calls are awaited one at a time and every transaction is confirmed before
//! the next is submitted. The ledger store is written exactly once, at
//! cutover, after all on-chain replication has succeeded.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use ce_01_ledger_store::SharedLedgerStore;
use ce_03_snapshot::{Snapshot, SnapshotApi, SnapshotEngine};
use parking_lot::Mutex;
use shared_types::{
    hash_to_hex, Address, ChainClient, ContractCall, ContractRead, TokenConstructor,
    TransactionReceipt,
};
use tracing::{error, info, warn};

use crate::domain::{
    HolderReplication, MigrationConfig, MigrationError, MigrationPlan, MigrationResult,
    MigrationStep, Ratio, ReplicationJournal,
};
use crate::ports::inbound::MigrationApi;

/// The Migration Orchestrator.
pub struct MigrationOrchestrator<C: ChainClient, S: SnapshotApi = SnapshotEngine<C>> {
    chain: Arc<C>,
    store: SharedLedgerStore,
    snapshots: Arc<S>,
    config: MigrationConfig,
    step: Mutex<MigrationStep>,
    last_journal: Mutex<ReplicationJournal>,
    running: tokio::sync::Mutex<()>,
}

impl<C: ChainClient, S: SnapshotApi> MigrationOrchestrator<C, S> {
    pub fn new(
        chain: Arc<C>,
        store: SharedLedgerStore,
        snapshots: Arc<S>,
        config: MigrationConfig,
    ) -> Result<Self, MigrationError> {
        config.validate()?;
        Ok(Self {
            chain,
            store,
            snapshots,
            config,
            step: Mutex::new(MigrationStep::Idle),
            last_journal: Mutex::new(ReplicationJournal::default()),
            running: tokio::sync::Mutex::new(()),
        })
    }

    /// Journal of the current or most recent migration.
    pub fn last_journal(&self) -> ReplicationJournal {
        self.last_journal.lock().clone()
    }

    async fn execute(&self, plan: MigrationPlan) -> Result<MigrationResult, MigrationError> {
        let _running = self
            .running
            .try_lock()
            .map_err(|_| MigrationError::MigrationInProgress)?;

        *self.step.lock() = MigrationStep::Idle;
        *self.last_journal.lock() = ReplicationJournal::default();
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        info!(
            kind = plan.kind(),
            ratio = plan.ratio,
            "[ce-04] Migration started"
        );

        let result = self.run_protocol(&plan, timestamp).await;
        match &result {
            Ok(done) => info!(
                old = %done.old_authoritative_address,
                new = %done.new_authoritative_address,
                holders = done.holder_count,
                minted_total = %done.minted_total,
                "[ce-04] Migration complete"
            ),
            Err(e) => {
                *self.step.lock() = MigrationStep::Failed;
                let journal = self.last_journal.lock();
                error!(
                    error = %e,
                    step = ?e.step(),
                    replicated = journal.completed(),
                    pending = journal.pending().count(),
                    "[ce-04] Migration failed"
                );
                for entry in journal.pending() {
                    warn!(
                        holder = %entry.address,
                        allowlisted = entry.allowlisted,
                        minted = entry.minted,
                        amount = %entry.amount,
                        "[ce-04] Holder not fully replicated"
                    );
                }
            }
        }
        result
    }

    fn advance(&self, step: MigrationStep) {
        *self.step.lock() = step;
        info!(step = %step, "[ce-04] Migration step reached");
    }

    async fn run_protocol(
        &self,
        plan: &MigrationPlan,
        timestamp: u64,
    ) -> Result<MigrationResult, MigrationError> {
        let old = self
            .store
            .read()
            .authoritative_address()
            .ok_or(MigrationError::NoAuthoritativeAddress)?;

        let pause_block = self.ensure_paused(old).await?;
        self.advance(MigrationStep::Paused);

        let snapshot = self
            .snapshots
            .generate(None)
            .await
            .map_err(MigrationError::Snapshot)?;
        let snapshot_lag = Self::check_snapshot(&snapshot, pause_block);
        self.advance(MigrationStep::Snapshotted);

        let (new_name, new_symbol) = self.resolve_metadata(old, plan).await?;
        let new = self.deploy(&new_name, &new_symbol).await?;
        self.advance(MigrationStep::Deployed);

        let journal = ReplicationJournal::plan(
            snapshot.rows.iter().map(|r| (r.address, r.ledger_balance)),
            plan.ratio,
        )?;
        *self.last_journal.lock() = journal.clone();
        let journal = self.replicate(new, journal).await?;
        self.advance(MigrationStep::Replicated);

        self.store
            .write()
            .cutover(new)
            .map_err(MigrationError::Store)?;
        self.advance(MigrationStep::CutOver);

        Ok(MigrationResult {
            old_authoritative_address: old,
            new_authoritative_address: new,
            ratio: Ratio::whole(plan.ratio),
            holder_count: journal.len(),
            minted_total: journal.minted_total()?.to_string(),
            timestamp,
            new_name,
            new_symbol,
            snapshot_block: snapshot.block,
            pause_block,
            snapshot_lag,
            journal: journal.into_entries(),
        })
    }

    /// Pause `token` unless it already is. Returns the pause block, if a
    /// pause was submitted.
    async fn ensure_paused(&self, token: Address) -> Result<Option<u64>, MigrationError> {
        let step = MigrationStep::Paused;
        let paused = self
            .chain
            .read_contract(token, ContractRead::Paused, None)
            .await
            .and_then(|v| v.into_bool())
            .map_err(MigrationError::external(step, "paused"))?;
        if paused {
            info!(token = %token, "[ce-04] Token already paused");
            return Ok(None);
        }
        let receipt = self.confirm(step, token, ContractCall::Pause).await?;
        info!(token = %token, block = receipt.block, "[ce-04] Paused original token");
        Ok(Some(receipt.block))
    }

    /// Returns the number of blocks between the snapshot and the pause.
    fn check_snapshot(snapshot: &Snapshot, pause_block: Option<u64>) -> u64 {
        let lag = snapshot_lag(snapshot.block, pause_block);
        if lag > 0 {
            warn!(
                snapshot_block = snapshot.block,
                pause_block = ?pause_block,
                lag,
                "[ce-04] Ledger lags the pause block, transfers after the snapshot are not carried over"
            );
        }
        if !snapshot.is_reconciled() {
            warn!(
                discrepancies = snapshot.discrepancies.len(),
                "[ce-04] Migrating from ledger balances despite discrepancies"
            );
        }
        info!(
            block = snapshot.block,
            holders = snapshot.holder_count(),
            "[ce-04] Holder set frozen"
        );
        lag
    }

    async fn resolve_metadata(
        &self,
        token: Address,
        plan: &MigrationPlan,
    ) -> Result<(String, String), MigrationError> {
        let step = MigrationStep::Deployed;
        let name = match &plan.new_name {
            Some(name) => name.clone(),
            None => self.read_text(token, ContractRead::Name, step).await?,
        };
        let symbol = match &plan.new_symbol {
            Some(symbol) => symbol.clone(),
            None => self.read_text(token, ContractRead::Symbol, step).await?,
        };
        Ok((name, symbol))
    }

    async fn read_text(
        &self,
        token: Address,
        read: ContractRead,
        step: MigrationStep,
    ) -> Result<String, MigrationError> {
        self.chain
            .read_contract(token, read, None)
            .await
            .and_then(|v| v.into_text())
            .map_err(MigrationError::external(step, read.function_name()))
    }

    async fn deploy(&self, name: &str, symbol: &str) -> Result<Address, MigrationError> {
        let step = MigrationStep::Deployed;
        let receipt = self
            .chain
            .deploy_contract(
                &self.config.artifact,
                TokenConstructor {
                    name: name.to_string(),
                    symbol: symbol.to_string(),
                    admin: self.config.admin,
                },
            )
            .await
            .map_err(MigrationError::external(step, "deploy"))?;
        if !receipt.success {
            return Err(MigrationError::TransactionFailed {
                step,
                operation: "deploy",
                tx_hash: hash_to_hex(&receipt.transaction_hash),
            });
        }
        let address = receipt
            .created_address
            .ok_or(MigrationError::DeploymentFailed)?;
        info!(
            token = %address,
            name,
            symbol,
            block = receipt.block,
            "[ce-04] Deployed new token contract"
        );
        Ok(address)
    }

    /// Allow-list then mint each holder, in snapshot order.
    async fn replicate(
        &self,
        token: Address,
        mut journal: ReplicationJournal,
    ) -> Result<ReplicationJournal, MigrationError> {
        let step = MigrationStep::Replicated;
        for index in 0..journal.len() {
            let Some(entry) = journal.entries().get(index).cloned() else {
                break;
            };

            self.confirm(
                step,
                token,
                ContractCall::SetAllowlistStatus {
                    wallet: entry.address,
                    approved: true,
                },
            )
            .await?;
            self.record(&mut journal, index, |e| e.allowlisted = true);

            if !entry.amount.is_zero() {
                self.confirm(
                    step,
                    token,
                    ContractCall::Mint {
                        to: entry.address,
                        amount: entry.amount,
                    },
                )
                .await?;
                self.record(&mut journal, index, |e| e.minted = true);
            }
        }
        Ok(journal)
    }

    fn record(
        &self,
        journal: &mut ReplicationJournal,
        index: usize,
        mark: impl Fn(&mut HolderReplication),
    ) {
        if let Some(entry) = journal.entry_mut(index) {
            mark(entry);
        }
        if let Some(entry) = self.last_journal.lock().entry_mut(index) {
            mark(entry);
        }
    }

    /// Submit `call` and wait for a successful receipt.
    async fn confirm(
        &self,
        step: MigrationStep,
        token: Address,
        call: ContractCall,
    ) -> Result<TransactionReceipt, MigrationError> {
        let operation = call.function_name();
        let tx_hash = self
            .chain
            .submit_transaction(token, call)
            .await
            .map_err(MigrationError::external(step, operation))?;
        let receipt = self
            .chain
            .wait_for_receipt(tx_hash)
            .await
            .map_err(MigrationError::external(step, operation))?;
        if !receipt.success {
            return Err(MigrationError::TransactionFailed {
                step,
                operation,
                tx_hash: hash_to_hex(&tx_hash),
            });
        }
        Ok(receipt)
    }
}

/// Blocks strictly between the snapshot and the pause transaction.
fn snapshot_lag(snapshot_block: u64, pause_block: Option<u64>) -> u64 {
    pause_block.map_or(0, |pause| {
        pause.saturating_sub(snapshot_block).saturating_sub(1)
    })
}

#[async_trait]
impl<C: ChainClient, S: SnapshotApi> MigrationApi for MigrationOrchestrator<C, S> {
    async fn split(&self, ratio: u64) -> Result<MigrationResult, MigrationError> {
        self.execute(MigrationPlan::split(ratio)?).await
    }

    async fn rename(
        &self,
        new_symbol: &str,
        new_name: Option<&str>,
    ) -> Result<MigrationResult, MigrationError> {
        self.execute(MigrationPlan::rename(new_symbol, new_name)?).await
    }

    fn step(&self) -> MigrationStep {
        *self.step.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ce_01_ledger_store::{EventStoreApi, LedgerStore};
    use shared_types::{
        ContractArtifact, DevChain, FailurePoint, TransferEvent, TRANSFER_TOPIC, U256,
    };

    fn admin() -> Address {
        Address([0xAD; 20])
    }
    fn alice() -> Address {
        Address([0x0A; 20])
    }
    fn bob() -> Address {
        Address([0x0B; 20])
    }

    fn config() -> MigrationConfig {
        MigrationConfig::new(
            admin(),
            ContractArtifact {
                abi: serde_json::json!([]),
                bytecode: "0x6080".into(),
            },
        )
    }

    struct Harness {
        chain: Arc<DevChain>,
        token: Address,
        store: SharedLedgerStore,
        orchestrator: MigrationOrchestrator<DevChain>,
    }

    /// alice 100, bob 100, fully ingested.
    async fn harness() -> Harness {
        let chain = Arc::new(DevChain::new());
        let token = chain.deploy_token("ChainEquity", "CEQ", admin());
        chain.seed_holder(token, alice(), U256::from(100)).unwrap();
        chain.seed_holder(token, bob(), U256::from(100)).unwrap();

        let mut store = LedgerStore::in_memory();
        store.ensure_authoritative_address(token).unwrap();
        let head = chain.head();
        let events: Vec<TransferEvent> = chain
            .get_logs(token, TRANSFER_TOPIC, 0, head)
            .await
            .unwrap()
            .into_iter()
            .map(TransferEvent::from)
            .collect();
        store.commit_batch(&events, 0, head).unwrap();
        let store = store.into_shared();

        let snapshots = Arc::new(SnapshotEngine::new(chain.clone(), store.clone()));
        let orchestrator =
            MigrationOrchestrator::new(chain.clone(), store.clone(), snapshots, config()).unwrap();
        Harness {
            chain,
            token,
            store,
            orchestrator,
        }
    }

    #[tokio::test]
    async fn test_split_replicates_and_cuts_over() {
        let h = harness().await;

        let result = h.orchestrator.split(3).await.unwrap();

        let new = result.new_authoritative_address;
        assert_ne!(new, h.token);
        assert_eq!(result.old_authoritative_address, h.token);
        assert_eq!(result.ratio, Ratio::whole(3));
        assert_eq!(result.holder_count, 2);
        assert_eq!(result.minted_total, "600");
        assert_eq!(result.new_symbol, "CEQ");
        assert_eq!(result.new_name, "ChainEquity");
        assert!(result.journal.iter().all(|e| e.is_complete()));
        assert!(h.chain.is_paused(h.token));
        assert_eq!(h.chain.balance_of(new, alice()), U256::from(300));
        assert_eq!(h.orchestrator.step(), MigrationStep::CutOver);

        let store = h.store.read();
        assert_eq!(store.authoritative_address(), Some(new));
        assert_eq!(store.last_processed_block(), None);
        assert_eq!(store.event_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ledger_lag_behind_pause_is_reported() {
        let h = harness().await;
        h.chain.mine_blocks(2);

        let result = h.orchestrator.split(2).await.unwrap();

        assert_eq!(result.snapshot_block, 5);
        assert_eq!(result.pause_block, Some(8));
        assert_eq!(result.snapshot_lag, 2);
    }

    #[tokio::test]
    async fn test_caught_up_ledger_has_no_lag() {
        let h = harness().await;

        let result = h.orchestrator.split(2).await.unwrap();

        assert_eq!(result.snapshot_block, 5);
        assert_eq!(result.pause_block, Some(6));
        assert_eq!(result.snapshot_lag, 0);
    }

    #[test]
    fn test_snapshot_lag_bounds() {
        assert_eq!(snapshot_lag(5, None), 0);
        assert_eq!(snapshot_lag(5, Some(6)), 0);
        assert_eq!(snapshot_lag(5, Some(9)), 3);
        assert_eq!(snapshot_lag(9, Some(5)), 0);
    }

    #[tokio::test]
    async fn test_already_paused_token_is_not_paused_again() {
        let h = harness().await;
        h.chain
            .submit_transaction(h.token, ContractCall::Pause)
            .await
            .unwrap();

        let result = h.orchestrator.split(2).await.unwrap();
        assert_eq!(result.pause_block, None);
        assert_eq!(result.snapshot_lag, 0);

        let pauses = h
            .chain
            .call_log()
            .iter()
            .filter(|c| c.starts_with("pause@"))
            .count();
        assert_eq!(pauses, 1);
    }

    #[tokio::test]
    async fn test_deployment_without_address_fails_before_cutover() {
        let h = harness().await;
        h.chain.inject_failure(FailurePoint::DeployWithoutAddress);

        let err = h.orchestrator.split(2).await.unwrap_err();

        assert_eq!(err, MigrationError::DeploymentFailed);
        assert_eq!(err.step(), Some(MigrationStep::Deployed));
        assert_eq!(h.orchestrator.step(), MigrationStep::Failed);
        let store = h.store.read();
        assert_eq!(store.authoritative_address(), Some(h.token));
        assert_eq!(store.event_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_mint_failure_leaves_partial_journal() {
        let h = harness().await;
        h.chain.inject_failure(FailurePoint::Submit { function: "mint" });

        let err = h.orchestrator.split(2).await.unwrap_err();

        assert!(matches!(
            err,
            MigrationError::ExternalCallFailed {
                step: MigrationStep::Replicated,
                operation: "mint",
                ..
            }
        ));
        let journal = h.orchestrator.last_journal();
        assert_eq!(journal.len(), 2);
        assert!(journal.entries()[0].allowlisted);
        assert!(!journal.entries()[0].minted);
        assert_eq!(journal.completed(), 0);
        assert_eq!(h.store.read().authoritative_address(), Some(h.token));
    }

    #[tokio::test]
    async fn test_concurrent_migration_rejected() {
        let h = harness().await;
        let _held = h.orchestrator.running.try_lock().unwrap();

        assert_eq!(
            h.orchestrator.split(2).await.unwrap_err(),
            MigrationError::MigrationInProgress
        );
        assert!(!h.chain.is_paused(h.token));
    }

    #[tokio::test]
    async fn test_unindexed_ledger_fails_at_snapshot() {
        let chain = Arc::new(DevChain::new());
        let token = chain.deploy_token("ChainEquity", "CEQ", admin());
        let mut store = LedgerStore::in_memory();
        store.ensure_authoritative_address(token).unwrap();
        let store = store.into_shared();
        let snapshots = Arc::new(SnapshotEngine::new(chain.clone(), store.clone()));
        let orchestrator =
            MigrationOrchestrator::new(chain.clone(), store, snapshots, config()).unwrap();

        let err = orchestrator.rename("NEW", None).await.unwrap_err();

        assert_eq!(
            err,
            MigrationError::Snapshot(ce_03_snapshot::SnapshotError::NotIndexed)
        );
        assert!(chain.is_paused(token));
    }

    #[tokio::test]
    async fn test_invalid_requests_touch_nothing() {
        let h = harness().await;

        assert_eq!(
            h.orchestrator.split(1).await.unwrap_err(),
            MigrationError::InvalidRatio(1)
        );
        assert_eq!(
            h.orchestrator.rename("  ", None).await.unwrap_err(),
            MigrationError::InvalidSymbol
        );
        assert!(!h.chain.is_paused(h.token));
        assert_eq!(h.orchestrator.step(), MigrationStep::Idle);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let chain = Arc::new(DevChain::new());
        let store = LedgerStore::in_memory().into_shared();
        let snapshots = Arc::new(SnapshotEngine::new(chain.clone(), store.clone()));
        let mut bad = config();
        bad.admin = Address::ZERO;

        assert!(matches!(
            MigrationOrchestrator::new(chain, store, snapshots, bad),
            Err(MigrationError::InvalidAdmin)
        ));
    }
}
