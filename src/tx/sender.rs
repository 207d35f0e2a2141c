//! Transaction submitter: one per wallet, every send goes through it

use super::gas::{GasOracle, GasPolicy, GasQuote};
use super::nonce::{NonceCounter, NoncePolicy, NonceStrategy};
use super::types::{Balance, FailureStage, TxFailure, TxIntent, TxResult};
use crate::chain::{Network, NetworkHandle};
use crate::config::WalletConfig;
use crate::error::{SubmitError, SubmitResult};
use crate::logging::WalletContext;

use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, TransactionRequest, U64};
use ethers::utils::format_ether;
use std::collections::HashMap;
use tracing::{debug, error, info, instrument, warn};

/// Submitter behaviour switches
#[derive(Debug, Clone, Copy)]
pub struct SubmitterOptions {
    pub nonce_policy: NoncePolicy,
    /// Wait for the receipt after a successful broadcast
    pub wait_for_receipt: bool,
}

impl Default for SubmitterOptions {
    fn default() -> Self {
        Self {
            nonce_policy: NoncePolicy::Optimistic,
            wait_for_receipt: true,
        }
    }
}

/// Signs and broadcasts transactions for one account.
///
/// Calls take `&mut self`, so sends for a wallet are serialized and nonces are
/// handed out in call order.
pub struct TransactionSubmitter {
    /// Account signing key
    wallet: LocalWallet,
    /// Log context for this wallet
    context: WalletContext,
    /// Networks this wallet can send on
    networks: HashMap<Network, NetworkHandle>,
    /// Per-network nonce counters
    nonces: HashMap<Network, NonceCounter>,
    /// Gas price and limit source
    gas_oracle: GasOracle,
    /// Counter movement around broadcast
    nonce_strategy: Box<dyn NonceStrategy>,
    wait_for_receipt: bool,
}

impl TransactionSubmitter {
    /// Create a submitter for one wallet
    pub fn new(
        wallet: LocalWallet,
        context: WalletContext,
        networks: Vec<NetworkHandle>,
        gas_policy: GasPolicy,
        options: SubmitterOptions,
    ) -> Self {
        let nonce_strategy = options.nonce_policy.strategy();
        debug!(
            "Submitter for {} using {} nonce strategy",
            context,
            nonce_strategy.name()
        );

        Self {
            wallet,
            context,
            networks: networks.into_iter().map(|h| (h.network, h)).collect(),
            nonces: HashMap::new(),
            gas_oracle: GasOracle::new(gas_policy),
            nonce_strategy,
            wait_for_receipt: options.wait_for_receipt,
        }
    }

    /// Get wallet address
    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub fn context(&self) -> &WalletContext {
        &self.context
    }

    fn handle(&self, network: Network) -> SubmitResult<NetworkHandle> {
        self.networks
            .get(&network)
            .cloned()
            .ok_or(SubmitError::NetworkNotConfigured { network })
    }

    /// Next nonce for a network, fetched from the node on first use
    pub async fn get_nonce(&mut self, network: Network) -> SubmitResult<u64> {
        let handle = self.handle(network)?;
        let address = self.address();
        self.nonces
            .entry(network)
            .or_default()
            .get(handle.client.as_ref(), address)
            .await
            .map_err(|e| SubmitError::Nonce {
                network,
                source: Box::new(e),
            })
    }

    pub fn increment_nonce(&mut self, network: Network) {
        if let Some(counter) = self.nonces.get_mut(&network) {
            counter.increment();
        }
    }

    /// Forget the cached nonce for a network
    pub fn reset_nonce(&mut self, network: Network) {
        if let Some(counter) = self.nonces.get_mut(&network) {
            if counter.cached().is_some() {
                debug!("Reset nonce on {} for {}", network, self.context);
                crate::metrics::record_nonce_reset(network);
            }
            counter.reset();
        }
    }

    pub fn reset_all_nonces(&mut self) {
        let networks: Vec<Network> = self.nonces.keys().copied().collect();
        for network in networks {
            self.reset_nonce(network);
        }
    }

    /// Adjusted gas price for a network; never fails on a node error
    pub async fn get_gas_price(&self, retry_count: u32, network: Network) -> SubmitResult<GasQuote> {
        let handle = self.handle(network)?;
        Ok(self.gas_oracle.gas_price(&handle, retry_count).await)
    }

    /// Buffered gas limit for a template; never fails on a node error
    pub async fn estimate_gas(
        &self,
        template: &TypedTransaction,
        network: Network,
    ) -> SubmitResult<GasQuote> {
        let handle = self.handle(network)?;
        Ok(self.gas_oracle.estimate_gas(&handle, template).await)
    }

    /// Get wallet balance on a network
    pub async fn get_balance(&self, network: Network) -> SubmitResult<Balance> {
        let handle = self.handle(network)?;
        let wei = handle.client.get_balance(self.address()).await?;
        let ether = format_ether(wei);

        if let Ok(value) = ether.parse::<f64>() {
            crate::metrics::record_wallet_balance(network, self.context.index, value);
        }

        Ok(Balance {
            wei,
            ether,
            currency: handle.currency,
        })
    }

    /// Send with the base gas price
    pub async fn send_transaction(
        &mut self,
        intent: &TxIntent,
        label: &str,
        network: Network,
    ) -> TxResult {
        self.send_transaction_attempt(intent, label, network, 0).await
    }

    /// Send with the gas price escalated for `retry_count`.
    ///
    /// Every failure is reported in the returned [`TxResult`].
    #[instrument(skip_all, fields(wallet = %self.context, network = %network, label = label, retry = retry_count))]
    pub async fn send_transaction_attempt(
        &mut self,
        intent: &TxIntent,
        label: &str,
        network: Network,
        retry_count: u32,
    ) -> TxResult {
        let mut result = TxResult::new(label, network);

        match self.submit(intent, network, retry_count, &mut result).await {
            Ok(()) => {
                result.success = true;
                info!(
                    "{} sent: {:?} (nonce {:?})",
                    label,
                    result.tx_hash.unwrap_or_default(),
                    result.nonce
                );
                crate::metrics::record_tx_submitted(network);
            }
            Err((stage, e)) => {
                let failure = TxFailure::from_error(stage, &e);
                error!("{} {}", label, failure);
                crate::metrics::record_tx_failed(network, stage);
                result.fail(failure);
            }
        }

        result
    }

    async fn submit(
        &mut self,
        intent: &TxIntent,
        network: Network,
        retry_count: u32,
        result: &mut TxResult,
    ) -> Result<(), (FailureStage, SubmitError)> {
        let prepare = |e: SubmitError| (FailureStage::Prepare, e);

        let handle = self.handle(network).map_err(prepare)?;
        let from = self.address();
        if let Some(requested) = intent.from {
            if requested != from {
                return Err(prepare(SubmitError::InvalidIntent(format!(
                    "from {:?} does not match account {:?}",
                    requested, from
                ))));
            }
        }
        let value = intent.value_wei().map_err(prepare)?;
        let data = intent.calldata().map_err(prepare)?;

        let nonce = self
            .get_nonce(network)
            .await
            .map_err(|e| (FailureStage::Nonce, e))?;
        result.nonce = Some(nonce);

        let gas_price = self
            .get_gas_price(retry_count, network)
            .await
            .map_err(prepare)?
            .value();
        result.gas_price = Some(gas_price);

        let mut tx: TypedTransaction = TransactionRequest::new()
            .from(from)
            .to(intent.to)
            .value(value)
            .data(data)
            .nonce(nonce)
            .chain_id(handle.chain_id)
            .into();

        let gas_limit = match intent.gas {
            Some(gas) => gas,
            None => self.estimate_gas(&tx, network).await.map_err(prepare)?.value(),
        };
        result.gas_limit = Some(gas_limit);

        tx.set_gas(gas_limit);
        tx.set_gas_price(gas_price);

        let signer = self.wallet.clone().with_chain_id(handle.chain_id);
        let signature = signer
            .sign_transaction(&tx)
            .await
            .map_err(|e| (FailureStage::Signing, SubmitError::Signing(e.to_string())))?;
        let raw = tx.rlp_signed(&signature);

        // Taken before the broadcast so the next send can go out unconfirmed
        self.increment_nonce(network);

        debug!(
            "Broadcasting nonce {} with gas {} at {} wei",
            nonce, gas_limit, gas_price
        );
        let tx_hash = match handle.client.send_raw_transaction(raw).await {
            Ok(hash) => hash,
            Err(e) => {
                if let Some(counter) = self.nonces.get_mut(&network) {
                    self.nonce_strategy.on_broadcast_failure(counter);
                }
                return Err((FailureStage::Broadcast, e));
            }
        };
        result.tx_hash = Some(tx_hash);

        if !self.wait_for_receipt {
            return Ok(());
        }

        let receipt = handle
            .client
            .wait_for_receipt(tx_hash)
            .await
            .map_err(|e| (FailureStage::Receipt, e))?
            .ok_or((FailureStage::Receipt, SubmitError::Dropped { tx_hash }))?;

        let reverted = receipt.status == Some(U64::zero());
        result.receipt = Some(receipt);
        if reverted {
            return Err((FailureStage::Receipt, SubmitError::Reverted { tx_hash }));
        }

        Ok(())
    }
}

/// Load signing keys from the configured environment variable and key file
pub fn load_wallets(config: &WalletConfig) -> SubmitResult<Vec<LocalWallet>> {
    let mut keys: Vec<String> = Vec::new();

    if let Some(var) = &config.private_keys_env {
        match std::env::var(var) {
            Ok(value) => keys.extend(value.split(',').map(|k| k.trim().to_string())),
            Err(_) => warn!("Environment variable {} is not set", var),
        }
    }

    if let Some(path) = &config.keys_file {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SubmitError::Wallet(format!("Failed to read key file {:?}: {}", path, e))
        })?;
        keys.extend(contents.lines().map(|l| l.trim().to_string()));
    }

    let wallets = keys
        .iter()
        .filter(|k| !k.is_empty() && !k.starts_with('#'))
        .enumerate()
        .map(|(i, key)| {
            key.parse::<LocalWallet>()
                .map_err(|_| SubmitError::Wallet(format!("Invalid private key at position {}", i + 1)))
        })
        .collect::<SubmitResult<Vec<_>>>()?;

    if wallets.is_empty() {
        return Err(SubmitError::Wallet(
            "No wallet configured. Set wallet.private_keys_env or wallet.keys_file".to_string(),
        ));
    }

    Ok(wallets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::provider::MockChainClient;
    use crate::config::GasConfig;
    use crate::tx::FailureReason;
    use ethers::types::{TransactionReceipt, H256, U256};
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    const KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    fn gwei(n: u64) -> U256 {
        U256::from(n) * U256::exp10(9)
    }

    fn policy() -> GasPolicy {
        GasPolicy::from_config(&GasConfig {
            multiplier: 1.2,
            min_gwei: 1.0,
            max_gwei: 50.0,
            default_gas_limit: 300_000,
            retry_escalation_factor: 1.3,
        })
    }

    fn rpc_failure(method: &'static str, message: &str) -> SubmitError {
        SubmitError::Rpc {
            method,
            message: message.to_string(),
            code: Some(-32000),
            data: None,
        }
    }

    fn submitter_with(client: MockChainClient, options: SubmitterOptions) -> TransactionSubmitter {
        let wallet: LocalWallet = KEY.parse().unwrap();
        let context = WalletContext::new(1, wallet.address());
        let handle = NetworkHandle {
            network: Network::Primary,
            name: "sepolia".to_string(),
            chain_id: 11155111,
            currency: "ETH".to_string(),
            client: Arc::new(client),
        };
        TransactionSubmitter::new(wallet, context, vec![handle], policy(), options)
    }

    fn no_receipts() -> SubmitterOptions {
        SubmitterOptions {
            nonce_policy: NoncePolicy::Optimistic,
            wait_for_receipt: false,
        }
    }

    fn intent() -> TxIntent {
        TxIntent::transfer(Address::repeat_byte(0x11), "1000")
    }

    /// Client that hands out `start` once and records every estimated nonce
    fn recording_client(start: u64, nonces: Arc<Mutex<Vec<U256>>>) -> MockChainClient {
        let mut client = MockChainClient::new();
        client
            .expect_get_transaction_count()
            .times(1)
            .returning(move |_| Ok(start));
        client.expect_gas_price().returning(|| Ok(gwei(10)));
        client.expect_estimate_gas().returning(move |tx| {
            nonces.lock().unwrap().push(*tx.nonce().unwrap());
            Ok(U256::from(21_000))
        });
        client
            .expect_send_raw_transaction()
            .returning(|_| Ok(H256::random()));
        client
    }

    #[tokio::test]
    async fn test_sequential_sends_use_contiguous_nonces() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut submitter = submitter_with(recording_client(5, seen.clone()), no_receipts());

        let first = submitter
            .send_transaction(&intent(), "transfer", Network::Primary)
            .await;
        assert!(first.success);
        assert_eq!(first.nonce, Some(5));
        assert_eq!(submitter.get_nonce(Network::Primary).await.unwrap(), 6);

        let second = submitter
            .send_transaction(&intent(), "transfer", Network::Primary)
            .await;
        assert!(second.success);
        assert_eq!(second.nonce, Some(6));

        for _ in 0..3 {
            assert!(submitter
                .send_transaction(&intent(), "transfer", Network::Primary)
                .await
                .success);
        }

        let expected: Vec<U256> = (5..10u64).map(U256::from).collect();
        assert_eq!(*seen.lock().unwrap(), expected);
    }

    #[tokio::test]
    async fn test_send_applies_gas_policy() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut submitter = submitter_with(recording_client(0, seen), no_receipts());

        let result = submitter
            .send_transaction_attempt(&intent(), "transfer", Network::Primary, 1)
            .await;
        assert!(result.success);
        assert_eq!(result.gas_price, Some(U256::from(15_600_000_000u64)));
        assert_eq!(result.gas_limit, Some(U256::from(25_200)));
        assert!(result.tx_hash.is_some());
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_estimate_failure_uses_default_gas_limit() {
        let mut client = MockChainClient::new();
        client.expect_get_transaction_count().returning(|_| Ok(0));
        client.expect_gas_price().returning(|| Ok(gwei(10)));
        client
            .expect_estimate_gas()
            .returning(|_| Err(rpc_failure("eth_estimateGas", "execution reverted")));
        client
            .expect_send_raw_transaction()
            .returning(|_| Ok(H256::random()));

        let mut submitter = submitter_with(client, no_receipts());
        let result = submitter
            .send_transaction(&intent(), "transfer", Network::Primary)
            .await;

        assert!(result.success);
        assert_eq!(result.gas_limit, Some(U256::from(300_000)));
    }

    #[tokio::test]
    async fn test_explicit_gas_skips_estimation() {
        let mut client = MockChainClient::new();
        client.expect_get_transaction_count().returning(|_| Ok(0));
        client.expect_gas_price().returning(|| Ok(gwei(10)));
        client.expect_estimate_gas().never();
        client
            .expect_send_raw_transaction()
            .returning(|_| Ok(H256::random()));

        let mut submitter = submitter_with(client, no_receipts());
        let result = submitter
            .send_transaction(&intent().with_gas(90_000u64), "transfer", Network::Primary)
            .await;

        assert!(result.success);
        assert_eq!(result.gas_limit, Some(U256::from(90_000)));
    }

    #[tokio::test]
    async fn test_gas_price_failure_uses_minimum() {
        let mut client = MockChainClient::new();
        client.expect_get_transaction_count().returning(|_| Ok(0));
        client
            .expect_gas_price()
            .returning(|| Err(rpc_failure("eth_gasPrice", "rate limited")));
        client
            .expect_estimate_gas()
            .returning(|_| Ok(U256::from(21_000)));
        client
            .expect_send_raw_transaction()
            .returning(|_| Ok(H256::random()));

        let mut submitter = submitter_with(client, no_receipts());
        let result = submitter
            .send_transaction(&intent(), "transfer", Network::Primary)
            .await;

        assert!(result.success);
        assert_eq!(result.gas_price, Some(gwei(1)));
    }

    #[tokio::test]
    async fn test_broadcast_failure_keeps_optimistic_nonce() {
        let mut client = MockChainClient::new();
        client
            .expect_get_transaction_count()
            .times(1)
            .returning(|_| Ok(5));
        client.expect_gas_price().returning(|| Ok(gwei(10)));
        client
            .expect_estimate_gas()
            .returning(|_| Ok(U256::from(21_000)));
        client.expect_send_raw_transaction().returning(|_| {
            Err(rpc_failure(
                "eth_sendRawTransaction",
                "insufficient funds for gas * price + value",
            ))
        });

        let mut submitter = submitter_with(client, no_receipts());
        let result = submitter
            .send_transaction(&intent(), "transfer", Network::Primary)
            .await;

        assert!(!result.success);
        assert!(result.tx_hash.is_none());
        let failure = result.error.unwrap();
        assert_eq!(failure.stage, FailureStage::Broadcast);
        assert_eq!(failure.code, Some(-32000));
        assert_eq!(failure.reason, Some(FailureReason::InsufficientFunds));

        // The gap stays until an explicit reset
        assert_eq!(submitter.get_nonce(Network::Primary).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_strict_policy_refetches_after_broadcast_failure() {
        let mut client = MockChainClient::new();
        client
            .expect_get_transaction_count()
            .times(2)
            .returning(|_| Ok(5));
        client.expect_gas_price().returning(|| Ok(gwei(10)));
        client
            .expect_estimate_gas()
            .returning(|_| Ok(U256::from(21_000)));
        client
            .expect_send_raw_transaction()
            .returning(|_| Err(rpc_failure("eth_sendRawTransaction", "transaction underpriced")));

        let mut submitter = submitter_with(
            client,
            SubmitterOptions {
                nonce_policy: NoncePolicy::Strict,
                wait_for_receipt: false,
            },
        );
        let result = submitter
            .send_transaction(&intent(), "transfer", Network::Primary)
            .await;
        assert!(!result.success);
        assert!(result.error.unwrap().retryable);

        assert_eq!(submitter.get_nonce(Network::Primary).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_nonce_fetch_failure_is_reported() {
        let mut client = MockChainClient::new();
        client
            .expect_get_transaction_count()
            .returning(|_| Err(rpc_failure("eth_getTransactionCount", "header not found")));
        client.expect_send_raw_transaction().never();

        let mut submitter = submitter_with(client, no_receipts());
        let result = submitter
            .send_transaction(&intent(), "transfer", Network::Primary)
            .await;

        assert!(!result.success);
        assert_eq!(result.nonce, None);
        let failure = result.error.unwrap();
        assert_eq!(failure.stage, FailureStage::Nonce);
        assert_eq!(failure.code, Some(-32000));
    }

    #[tokio::test]
    async fn test_invalid_intent_is_reported_without_network_calls() {
        let client = MockChainClient::new();
        let mut submitter = submitter_with(client, no_receipts());

        let bad_value = submitter
            .send_transaction(&TxIntent::transfer(Address::zero(), "-1"), "transfer", Network::Primary)
            .await;
        assert_eq!(bad_value.error.unwrap().stage, FailureStage::Prepare);

        let foreign = intent().with_from(Address::repeat_byte(0x22));
        let result = submitter
            .send_transaction(&foreign, "transfer", Network::Primary)
            .await;
        assert_eq!(result.error.unwrap().stage, FailureStage::Prepare);

        let unknown = submitter
            .send_transaction(&intent(), "transfer", Network::Secondary)
            .await;
        assert!(!unknown.success);
    }

    #[tokio::test]
    async fn test_waits_for_receipt() {
        let hash = H256::repeat_byte(0xab);
        let mut client = MockChainClient::new();
        client.expect_get_transaction_count().returning(|_| Ok(0));
        client.expect_gas_price().returning(|| Ok(gwei(10)));
        client
            .expect_estimate_gas()
            .returning(|_| Ok(U256::from(21_000)));
        client
            .expect_send_raw_transaction()
            .returning(move |_| Ok(hash));
        client.expect_wait_for_receipt().returning(|tx_hash| {
            Ok(Some(TransactionReceipt {
                transaction_hash: tx_hash,
                status: Some(U64::one()),
                ..Default::default()
            }))
        });

        let mut submitter = submitter_with(client, SubmitterOptions::default());
        let result = submitter
            .send_transaction(&intent(), "transfer", Network::Primary)
            .await;

        assert!(result.success);
        assert_eq!(result.tx_hash, Some(hash));
        assert_eq!(result.receipt.unwrap().transaction_hash, hash);
    }

    #[tokio::test]
    async fn test_reverted_receipt_is_a_failure() {
        let mut client = MockChainClient::new();
        client.expect_get_transaction_count().returning(|_| Ok(0));
        client.expect_gas_price().returning(|| Ok(gwei(10)));
        client
            .expect_estimate_gas()
            .returning(|_| Ok(U256::from(21_000)));
        client
            .expect_send_raw_transaction()
            .returning(|_| Ok(H256::random()));
        client.expect_wait_for_receipt().returning(|tx_hash| {
            Ok(Some(TransactionReceipt {
                transaction_hash: tx_hash,
                status: Some(U64::zero()),
                ..Default::default()
            }))
        });

        let mut submitter = submitter_with(client, SubmitterOptions::default());
        let result = submitter
            .send_transaction(&intent(), "transfer", Network::Primary)
            .await;

        assert!(!result.success);
        assert!(result.tx_hash.is_some());
        assert!(result.receipt.is_some());
        let failure = result.error.unwrap();
        assert_eq!(failure.stage, FailureStage::Receipt);
        assert_eq!(failure.reason, Some(FailureReason::Reverted));
        // The transaction was mined, so its nonce stays consumed
        assert_eq!(submitter.get_nonce(Network::Primary).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_reset_nonce_refetches_once() {
        let mut client = MockChainClient::new();
        client
            .expect_get_transaction_count()
            .times(2)
            .returning(|_| Ok(7));

        let mut submitter = submitter_with(client, no_receipts());
        assert_eq!(submitter.get_nonce(Network::Primary).await.unwrap(), 7);
        submitter.increment_nonce(Network::Primary);
        assert_eq!(submitter.get_nonce(Network::Primary).await.unwrap(), 8);

        submitter.reset_nonce(Network::Primary);
        assert_eq!(submitter.get_nonce(Network::Primary).await.unwrap(), 7);
        assert_eq!(submitter.get_nonce(Network::Primary).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_gas_reads_never_fail_on_node_errors() {
        let mut client = MockChainClient::new();
        client
            .expect_gas_price()
            .returning(|| Err(rpc_failure("eth_gasPrice", "bad gateway")));
        client
            .expect_estimate_gas()
            .returning(|_| Err(rpc_failure("eth_estimateGas", "execution reverted")));

        let submitter = submitter_with(client, no_receipts());
        let price = submitter.get_gas_price(3, Network::Primary).await.unwrap();
        assert!(matches!(price, GasQuote::Fallback { .. }));
        assert_eq!(price.value(), gwei(1));

        let template: TypedTransaction = TransactionRequest::new().to(Address::zero()).into();
        let limit = submitter.estimate_gas(&template, Network::Primary).await.unwrap();
        assert!(matches!(limit, GasQuote::Fallback { .. }));
        assert_eq!(limit.value(), U256::from(300_000));

        assert!(matches!(
            submitter.get_gas_price(0, Network::Secondary).await,
            Err(SubmitError::NetworkNotConfigured { network: Network::Secondary })
        ));
    }

    #[tokio::test]
    async fn test_get_balance() {
        let mut client = MockChainClient::new();
        client
            .expect_get_balance()
            .returning(|_| Ok(U256::exp10(18) / 2));

        let submitter = submitter_with(client, no_receipts());
        let balance = submitter.get_balance(Network::Primary).await.unwrap();
        assert_eq!(balance.wei, U256::exp10(18) / 2);
        assert_eq!(balance.ether, "0.500000000000000000");
        assert_eq!(balance.currency, "ETH");
    }

    #[test]
    fn test_load_wallets_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# funded on sepolia").unwrap();
        writeln!(file, "0x{}", KEY).unwrap();
        writeln!(file).unwrap();
        writeln!(file, "{}", "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d").unwrap();

        let config = WalletConfig {
            private_keys_env: None,
            keys_file: Some(file.path().to_path_buf()),
        };
        let wallets = load_wallets(&config).unwrap();
        assert_eq!(wallets.len(), 2);
        assert_ne!(wallets[0].address(), wallets[1].address());
    }

    #[test]
    fn test_load_wallets_rejects_bad_key() {
        std::env::set_var("DRIVER_TEST_BAD_KEYS", "not-a-key");
        let config = WalletConfig {
            private_keys_env: Some("DRIVER_TEST_BAD_KEYS".to_string()),
            keys_file: None,
        };
        let err = load_wallets(&config).unwrap_err();
        assert!(!err.to_string().contains("not-a-key"));
    }
}
