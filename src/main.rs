//! Testnet driver - scripted wallet activity over Ethereum JSON-RPC
//!
//! Every configured wallet gets its own transaction submitter and works
//! through the task list; wallets run side by side.

use anyhow::Result;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

mod chain;
mod config;
mod error;
mod logging;
mod metrics;
mod runner;
mod tx;

use chain::ChainRegistry;
use config::Settings;
use logging::WalletContext;
use metrics::MetricsServer;
use runner::WalletRunner;
use tx::{load_wallets, SubmitterOptions, TransactionSubmitter};

use ethers::signers::Signer;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::load()?;

    // Initialize logging
    logging::init_logging(&settings.logging);

    info!("Starting testnet driver v{}", env!("CARGO_PKG_VERSION"));
    for warning in settings.warnings() {
        warn!("{}", warning);
    }
    info!(
        "Loaded configuration: {} networks, {} tasks",
        settings.configured_networks().len(),
        settings.tasks.len()
    );

    // Initialize chain connections
    let registry = ChainRegistry::new(&settings)?;
    for (network, healthy) in registry.health_check().await {
        if !healthy {
            warn!("Network {} health check failed", network);
        }
    }

    let wallets = load_wallets(&settings.wallet)?;
    info!("Loaded {} wallets", wallets.len());

    // Start metrics server
    let metrics_handle = if settings.metrics.enabled {
        let server = MetricsServer::new(settings.metrics.port);
        Some(tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("Metrics server error: {}", e);
            }
        }))
    } else {
        None
    };

    let shutdown = Arc::new(RwLock::new(false));
    let tasks = Arc::new(settings.tasks.clone());
    let gas_policy = settings.gas_policy();
    let options = SubmitterOptions {
        nonce_policy: settings.runner.nonce_policy,
        wait_for_receipt: settings.runner.wait_for_receipt,
    };

    let runners: Vec<WalletRunner> = wallets
        .into_iter()
        .enumerate()
        .map(|(i, wallet)| {
            let context = WalletContext::new(i + 1, wallet.address());
            let submitter = TransactionSubmitter::new(
                wallet,
                context,
                registry.handles(),
                gas_policy.clone(),
                options,
            );
            WalletRunner::new(
                submitter,
                tasks.clone(),
                settings.runner.clone(),
                shutdown.clone(),
            )
        })
        .collect();

    let mut run_handle = tokio::spawn(runner::run_all(
        runners,
        settings.runner.max_concurrent_wallets,
    ));

    let finished = tokio::select! {
        result = &mut run_handle => Some(result?),
        _ = shutdown_signal() => None,
    };

    let summaries = match finished {
        Some(summaries) => summaries,
        None => {
            info!("Shutdown signal received, finishing in-flight transactions...");
            *shutdown.write().await = true;
            run_handle.await?
        }
    };

    let mut indices: Vec<usize> = summaries.iter().map(|e| *e.key()).collect();
    indices.sort_unstable();
    let (mut succeeded, mut failed) = (0, 0);
    for index in indices {
        if let Some(summary) = summaries.get(&index) {
            info!(
                "wallet#{}: {} succeeded, {} failed, {} skipped, {} retries",
                index, summary.succeeded, summary.failed, summary.skipped, summary.retries
            );
            succeeded += summary.succeeded;
            failed += summary.failed;
        }
    }

    if let Some(h) = metrics_handle {
        h.abort();
    }

    info!(
        "Testnet driver finished: {} transactions succeeded, {} failed",
        succeeded, failed
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
