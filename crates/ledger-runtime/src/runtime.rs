//! # Ledger Runtime
//!
//! ## Startup Sequence
//!
//! 1. Lock the data directory
//! 2. Open the ledger store and seed the authoritative address if unset
//! 3. Check the materialized balances against a full event replay
//! 4. Build the scheduler, snapshot engine and (with an artifact) the
//!    migration orchestrator
//! 5. Spawn the ingestion loop

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ce_01_ledger_store::{
    DataDirLock, KeyValueStore, LedgerStore, LockError, SharedLedgerStore, StoreError,
};
use ce_02_ingestion::{IngestionError, IngestionScheduler};
use ce_03_snapshot::SnapshotEngine;
use ce_04_migration::{
    load_artifact, ArtifactError, MigrationConfig, MigrationError, MigrationOrchestrator,
};
use shared_types::{Address, ChainClient};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::RuntimeConfig;

/// Startup failures.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("Ledger store: {0}")]
    Store(#[from] StoreError),

    #[error("Ingestion: {0}")]
    Ingestion(#[from] IngestionError),

    #[error("Migration: {0}")]
    Migration(#[from] MigrationError),

    #[error("Deployment artifact: {0}")]
    Artifact(#[from] ArtifactError),
}

/// The running ledger: store, subsystems and the ingestion task.
pub struct LedgerRuntime<C: ChainClient + 'static> {
    store: SharedLedgerStore,
    scheduler: Arc<IngestionScheduler<C>>,
    snapshots: Arc<SnapshotEngine<C>>,
    migrations: Option<Arc<MigrationOrchestrator<C>>>,
    shutdown_tx: watch::Sender<bool>,
    ingestion: JoinHandle<()>,
    data_dir: PathBuf,
    // Released last, after the ingestion task has stopped.
    _lock: DataDirLock,
}

impl<C: ChainClient + 'static> LedgerRuntime<C> {
    /// Start the runtime against `chain`. Must be called inside a tokio
    /// runtime.
    pub async fn start(config: RuntimeConfig, chain: Arc<C>) -> Result<Self, RuntimeError> {
        let lock = DataDirLock::acquire(&config.data_dir)?;
        let kv = open_kv(&config.data_dir)?;

        let mut store = LedgerStore::open(kv)?;
        let authoritative = store.ensure_authoritative_address(config.token_address)?;
        if authoritative != config.token_address {
            info!(
                configured = %config.token_address,
                authoritative = %authoritative,
                "[runtime] Using migrated authoritative address from the store"
            );
        }
        store.verify_against_replay()?;
        info!(
            data_dir = %config.data_dir.display(),
            token = %authoritative,
            last_processed_block = ?store.last_processed_block(),
            holders = store.balances().len(),
            "[runtime] Ledger store opened"
        );
        let store = store.into_shared();

        let scheduler = Arc::new(IngestionScheduler::new(
            Arc::clone(&chain),
            store.clone(),
            config.ingestion.clone(),
        )?);
        let snapshots = Arc::new(SnapshotEngine::new(Arc::clone(&chain), store.clone()));
        let migrations = match &config.artifact_path {
            Some(path) => {
                let artifact = load_artifact(path)?;
                Some(Arc::new(MigrationOrchestrator::new(
                    Arc::clone(&chain),
                    store.clone(),
                    Arc::clone(&snapshots),
                    MigrationConfig::new(config.admin_wallet, artifact),
                )?))
            }
            None => {
                warn!("[runtime] No deployment artifact configured, migrations disabled");
                None
            }
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let ingestion = {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { scheduler.run(shutdown_rx).await })
        };

        Ok(Self {
            store,
            scheduler,
            snapshots,
            migrations,
            shutdown_tx,
            ingestion,
            data_dir: config.data_dir,
            _lock: lock,
        })
    }

    pub fn store(&self) -> &SharedLedgerStore {
        &self.store
    }

    pub fn scheduler(&self) -> &Arc<IngestionScheduler<C>> {
        &self.scheduler
    }

    pub fn snapshots(&self) -> &Arc<SnapshotEngine<C>> {
        &self.snapshots
    }

    /// `None` when no deployment artifact was configured.
    pub fn migrations(&self) -> Option<&Arc<MigrationOrchestrator<C>>> {
        self.migrations.as_ref()
    }

    pub fn authoritative_address(&self) -> Option<Address> {
        self.store.read().authoritative_address()
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Stop the ingestion loop, wait for its in-flight cycle, then release
    /// the data directory.
    pub async fn shutdown(self) {
        info!("[runtime] Initiating graceful shutdown");
        // The receiver lives in the task; a send error means it already ended.
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.ingestion.await {
            warn!(error = %e, "[runtime] Ingestion task ended abnormally");
        }
        info!(
            last_processed_block = ?self.store.read().last_processed_block(),
            "[runtime] Shutdown complete"
        );
    }
}

#[cfg(not(feature = "rocksdb"))]
fn open_kv(data_dir: &Path) -> Result<Box<dyn KeyValueStore>, RuntimeError> {
    let kv = ce_01_ledger_store::FileBackedKVStore::open(data_dir.join("ledger.db"))
        .map_err(StoreError::from)?;
    warn!(
        path = %kv.path().display(),
        "[runtime] Using the file-backed store, build with the rocksdb feature for production"
    );
    Ok(Box::new(kv))
}

#[cfg(feature = "rocksdb")]
fn open_kv(data_dir: &Path) -> Result<Box<dyn KeyValueStore>, RuntimeError> {
    let kv = ce_01_ledger_store::RocksDbStore::open_default(data_dir.join("ledger.rocksdb"))
        .map_err(StoreError::from)?;
    Ok(Box::new(kv))
}
