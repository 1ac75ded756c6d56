//! # Ledger Runtime Binary
//!
//! Runs the ledger against an in-process devnet. The configured token is
//! deployed at `CE_TOKEN_ADDRESS` on startup so ingestion has something to
//! index; a production deployment supplies its own `ChainClient` through
//! `LedgerRuntime::start`.

use std::sync::Arc;

use anyhow::{Context, Result};
use ledger_runtime::{init_tracing, LedgerRuntime, RuntimeConfig};
use shared_types::DevChain;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("info")?;

    let config = RuntimeConfig::from_env().context("Failed to load configuration")?;

    let chain = Arc::new(DevChain::new());
    chain.deploy_token_at(config.token_address, "ChainEquity", "CEQ", config.admin_wallet);
    info!(token = %config.token_address, "[runtime] Devnet token deployed");

    let runtime = LedgerRuntime::start(config, chain)
        .await
        .context("Failed to start ledger runtime")?;

    info!("[runtime] Ledger is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    runtime.shutdown().await;
    Ok(())
}
