//! Runs the configured task list for every wallet
//!
//! Each wallet works through its tasks sequentially; wallets run concurrently
//! with each other. Retries happen here, not in the submitter.

pub mod task;

use crate::chain::Network;
use crate::config::{RunnerConfig, TaskConfig};
use crate::tx::{FailureReason, FailureStage, TransactionSubmitter, TxIntent, TxResult};

use dashmap::DashMap;
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{RwLock, Semaphore};
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

/// Per-wallet outcome counts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletSummary {
    pub succeeded: u32,
    pub failed: u32,
    pub skipped: u32,
    pub retries: u32,
}

/// Drives one wallet through the task list
pub struct WalletRunner {
    /// Submitter owning this wallet's account and nonces
    submitter: TransactionSubmitter,
    /// Shared task list
    tasks: Arc<Vec<TaskConfig>>,
    /// Configuration
    config: RunnerConfig,
    /// Shutdown flag
    shutdown: Arc<RwLock<bool>>,
}

impl WalletRunner {
    pub fn new(
        submitter: TransactionSubmitter,
        tasks: Arc<Vec<TaskConfig>>,
        config: RunnerConfig,
        shutdown: Arc<RwLock<bool>>,
    ) -> Self {
        Self {
            submitter,
            tasks,
            config,
            shutdown,
        }
    }

    pub fn wallet_index(&self) -> usize {
        self.submitter.context().index
    }

    async fn is_shutting_down(&self) -> bool {
        *self.shutdown.read().await
    }

    /// Run every cycle of the task list
    pub async fn run(&mut self) -> WalletSummary {
        let mut summary = WalletSummary::default();
        let wallet = self.submitter.context().clone();

        info!("Starting {} ({} cycles)", wallet, self.config.cycles);

        for cycle in 1..=self.config.cycles {
            if self.is_shutting_down().await {
                break;
            }

            debug!("{} cycle {}/{}", wallet, cycle, self.config.cycles);
            self.submitter.reset_all_nonces();

            let funded = self.funded_networks().await;
            let tasks = self.tasks.clone();

            for (task_idx, task) in tasks.iter().enumerate() {
                if !funded.contains(&task.network()) {
                    summary.skipped += task.count();
                    continue;
                }

                for run in 1..=task.count() {
                    if self.is_shutting_down().await {
                        info!("{} stopping on shutdown", wallet);
                        return summary;
                    }

                    let label = format!("{}#{}.{}", task.name(), task_idx + 1, run);
                    let intent = match task::build_intent(task, self.submitter.address()) {
                        Ok(intent) => intent,
                        Err(e) => {
                            error!("{} {}: {}", wallet, label, e);
                            summary.failed += 1;
                            continue;
                        }
                    };

                    let (result, retries) = self
                        .submit_with_retries(&intent, &label, task.network())
                        .await;
                    summary.retries += retries;
                    if result.success {
                        summary.succeeded += 1;
                    } else {
                        summary.failed += 1;
                    }

                    self.pause().await;
                }
            }
        }

        info!(
            "{} finished: {} succeeded, {} failed, {} skipped",
            wallet, summary.succeeded, summary.failed, summary.skipped
        );
        summary
    }

    /// Networks used by the task list whose balance clears the minimum
    async fn funded_networks(&self) -> HashSet<Network> {
        let used: HashSet<Network> = self.tasks.iter().map(|t| t.network()).collect();
        let mut funded = HashSet::new();

        for network in used {
            match self.submitter.get_balance(network).await {
                Ok(balance) => {
                    info!(
                        "{} balance on {}: {} {}",
                        self.submitter.context(),
                        network,
                        balance.ether,
                        balance.currency
                    );
                    let ether: f64 = balance.ether.parse().unwrap_or(0.0);
                    if ether < self.config.min_balance_eth {
                        warn!(
                            "{} balance on {} below minimum {} - skipping its tasks",
                            self.submitter.context(),
                            network,
                            self.config.min_balance_eth
                        );
                        continue;
                    }
                    funded.insert(network);
                }
                Err(e) => {
                    // An unreadable balance does not block submissions
                    warn!(
                        "{} balance check failed on {}: {}",
                        self.submitter.context(),
                        network,
                        e
                    );
                    funded.insert(network);
                }
            }
        }

        funded
    }

    /// Send, re-sending with an escalated gas price on retryable failures
    async fn submit_with_retries(
        &mut self,
        intent: &TxIntent,
        label: &str,
        network: Network,
    ) -> (TxResult, u32) {
        let mut retry_count = 0;
        let mut result = self.submitter.send_transaction(intent, label, network).await;

        loop {
            let failure = match &result.error {
                Some(failure) => failure,
                None => return (result, retry_count),
            };

            // A transaction that reached the node is never sent again
            if let Some(tx_hash) = result.tx_hash {
                warn!(
                    "{} {} on {} failed after broadcast of {:?}: {}",
                    self.submitter.context(),
                    result.label,
                    result.network,
                    tx_hash,
                    failure
                );
                return (result, retry_count);
            }
            if !failure.retryable || retry_count >= self.config.max_retries {
                warn!(
                    "{} {} on {} failed: {}",
                    self.submitter.context(),
                    result.label,
                    result.network,
                    failure
                );
                return (result, retry_count);
            }

            // A rejected broadcast never used its nonce
            if failure.stage == FailureStage::Broadcast
                || failure.reason == Some(FailureReason::NonceTooLow)
            {
                self.submitter.reset_nonce(result.network);
            }

            retry_count += 1;
            warn!(
                "{} {} on {} failed ({}), retry {}/{}",
                self.submitter.context(),
                result.label,
                result.network,
                failure.message,
                retry_count,
                self.config.max_retries
            );
            sleep(Duration::from_millis(self.config.retry_delay_ms)).await;

            result = self
                .submitter
                .send_transaction_attempt(intent, label, network, retry_count)
                .await;
        }
    }

    /// Random delay between submissions
    async fn pause(&self) {
        let (min, max) = (self.config.delay_min_ms, self.config.delay_max_ms);
        let delay = if max > min {
            rand::thread_rng().gen_range(min..=max)
        } else {
            min
        };
        if delay > 0 {
            sleep(Duration::from_millis(delay)).await;
        }
    }
}

/// Run all wallets, at most `max_concurrent` at a time (0 = unbounded)
pub async fn run_all(
    runners: Vec<WalletRunner>,
    max_concurrent: usize,
) -> Arc<DashMap<usize, WalletSummary>> {
    let summaries = Arc::new(DashMap::new());
    let permits = if max_concurrent == 0 {
        runners.len().max(1)
    } else {
        max_concurrent
    };
    let semaphore = Arc::new(Semaphore::new(permits));

    let mut handles = Vec::new();
    for mut runner in runners {
        let summaries = summaries.clone();
        let semaphore = semaphore.clone();

        handles.push(tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };
            let summary = runner.run().await;
            summaries.insert(runner.wallet_index(), summary);
        }));
    }

    for result in futures::future::join_all(handles).await {
        if let Err(e) = result {
            error!("Wallet task failed: {}", e);
        }
    }

    summaries
}
