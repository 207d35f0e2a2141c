//! JSON-RPC chain client with multi-RPC support and automatic failover

use super::Network;
use crate::config::NetworkConfig;
use crate::error::{SubmitError, SubmitResult};

use async_trait::async_trait;
use ethers::providers::{Http, Middleware, PendingTransaction, Provider, ProviderError, RpcError};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, BlockId, BlockNumber, Bytes, TransactionReceipt, H256, U256};
#[cfg(test)]
use mockall::automock;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, error, warn};

/// The Ethereum JSON-RPC calls the submitter depends on
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// `eth_getTransactionCount` at the latest block
    async fn get_transaction_count(&self, address: Address) -> SubmitResult<u64>;

    /// `eth_gasPrice`
    async fn gas_price(&self) -> SubmitResult<U256>;

    /// `eth_estimateGas`
    async fn estimate_gas(&self, tx: &TypedTransaction) -> SubmitResult<U256>;

    /// `eth_sendRawTransaction`
    async fn send_raw_transaction(&self, raw: Bytes) -> SubmitResult<H256>;

    /// Poll until the transaction is mined; `None` if it was dropped
    async fn wait_for_receipt(&self, tx_hash: H256) -> SubmitResult<Option<TransactionReceipt>>;

    /// `eth_getBalance` at the latest block
    async fn get_balance(&self, address: Address) -> SubmitResult<U256>;

    /// `eth_blockNumber`
    async fn block_number(&self) -> SubmitResult<u64>;
}

/// HTTP provider set for one network
pub struct RpcProvider {
    network: Network,
    /// HTTP providers (multiple for failover)
    http_providers: Vec<Provider<Http>>,
    /// Current active provider index
    current_provider: AtomicUsize,
}

impl RpcProvider {
    /// Create a provider set from a network config
    pub fn new(network: Network, config: &NetworkConfig) -> SubmitResult<Self> {
        let mut http_providers = Vec::new();

        for url in &config.rpc_urls {
            match Provider::<Http>::try_from(url.as_str()) {
                Ok(provider) => {
                    let provider = provider.interval(Duration::from_millis(500));
                    http_providers.push(provider);
                    debug!("Added HTTP provider for {}: {}", network, url);
                }
                Err(e) => {
                    warn!("Failed to create provider for {}: {}", url, e);
                }
            }
        }

        if http_providers.is_empty() {
            return Err(SubmitError::ChainConnection {
                network,
                message: "No valid RPC providers".to_string(),
            });
        }

        Ok(Self {
            network,
            http_providers,
            current_provider: AtomicUsize::new(0),
        })
    }

    /// Get the active HTTP provider
    pub fn http(&self) -> &Provider<Http> {
        let idx = self.current_provider.load(Ordering::Relaxed);
        &self.http_providers[idx % self.http_providers.len()]
    }

    /// Switch to next available provider
    pub fn failover(&self) {
        if self.http_providers.len() < 2 {
            return;
        }
        let current = self.current_provider.load(Ordering::Relaxed);
        let next = (current + 1) % self.http_providers.len();
        self.current_provider.store(next, Ordering::Relaxed);
        warn!("{} failover to provider {}", self.network, next);
    }

    /// Run a read call, moving to the next endpoint on transport errors.
    ///
    /// Errors carrying a JSON-RPC response are returned as-is: another node
    /// would answer the same way.
    async fn with_failover<'a, T, F, Fut>(&'a self, method: &'static str, call: F) -> SubmitResult<T>
    where
        F: Fn(&'a Provider<Http>) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>> + 'a,
    {
        let mut last_error = None;

        for _ in 0..self.http_providers.len() {
            match call(self.http()).await {
                Ok(value) => return Ok(value),
                Err(e) if e.as_error_response().is_some() => return Err(rpc_error(method, e)),
                Err(e) => {
                    warn!("{} failed on {}: {}", method, self.network, e);
                    last_error = Some(rpc_error(method, e));
                    self.failover();
                }
            }
        }

        Err(last_error.unwrap_or_else(|| SubmitError::ChainConnection {
            network: self.network,
            message: format!("All providers failed for {}", method),
        }))
    }

    /// Health check
    pub async fn health_check(&self) -> bool {
        match self.block_number().await {
            Ok(_) => true,
            Err(e) => {
                error!("Health check failed for {}: {}", self.network, e);
                false
            }
        }
    }
}

#[async_trait]
impl ChainClient for RpcProvider {
    async fn get_transaction_count(&self, address: Address) -> SubmitResult<u64> {
        let latest: Option<BlockId> = Some(BlockNumber::Latest.into());
        let count = self
            .with_failover("eth_getTransactionCount", |p| {
                p.get_transaction_count(address, latest)
            })
            .await?;
        transaction_count(count)
    }

    async fn gas_price(&self) -> SubmitResult<U256> {
        self.with_failover("eth_gasPrice", |p| p.get_gas_price())
            .await
    }

    async fn estimate_gas(&self, tx: &TypedTransaction) -> SubmitResult<U256> {
        self.with_failover("eth_estimateGas", |p| p.estimate_gas(tx, None))
            .await
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> SubmitResult<H256> {
        // A broadcast is never replayed against another endpoint
        let pending = self
            .http()
            .send_raw_transaction(raw)
            .await
            .map_err(|e| rpc_error("eth_sendRawTransaction", e))?;
        Ok(pending.tx_hash())
    }

    async fn wait_for_receipt(&self, tx_hash: H256) -> SubmitResult<Option<TransactionReceipt>> {
        PendingTransaction::new(tx_hash, self.http())
            .await
            .map_err(|e| rpc_error("eth_getTransactionReceipt", e))
    }

    async fn get_balance(&self, address: Address) -> SubmitResult<U256> {
        let latest: Option<BlockId> = Some(BlockNumber::Latest.into());
        self.with_failover("eth_getBalance", |p| p.get_balance(address, latest))
            .await
    }

    async fn block_number(&self) -> SubmitResult<u64> {
        let block = self
            .with_failover("eth_blockNumber", |p| p.get_block_number())
            .await?;
        Ok(block.as_u64())
    }
}

/// Narrow a node-reported transaction count to a nonce
fn transaction_count(count: U256) -> SubmitResult<u64> {
    u64::try_from(count).map_err(|_| SubmitError::Rpc {
        method: "eth_getTransactionCount",
        message: format!("transaction count {} does not fit in u64", count),
        code: None,
        data: None,
    })
}

/// Convert a provider error, keeping the node's JSON-RPC code and data
pub fn rpc_error(method: &'static str, err: ProviderError) -> SubmitError {
    match err.as_error_response() {
        Some(response) => SubmitError::Rpc {
            method,
            message: response.message.clone(),
            code: Some(response.code),
            data: response.data.clone(),
        },
        None => SubmitError::Rpc {
            method,
            message: err.to_string(),
            code: None,
            data: None,
        },
    }
}
