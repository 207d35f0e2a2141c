//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Network health
//! - Transaction submission outcomes
//! - Gas fallbacks and nonce resets
//! - Wallet balances

use crate::chain::Network;
use crate::error::{SubmitError, SubmitResult};
use crate::tx::FailureStage;

use axum::{http::StatusCode, routing::get, Router};
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge_vec, CounterVec, Encoder, GaugeVec, TextEncoder,
};
use std::net::SocketAddr;
use tracing::info;

lazy_static! {
    pub static ref NETWORK_HEALTHY: GaugeVec = register_gauge_vec!(
        "testnet_driver_network_healthy",
        "Network RPC health (1=healthy, 0=unreachable)",
        &["network"]
    ).unwrap();

    pub static ref TX_SUBMITTED: CounterVec = register_counter_vec!(
        "testnet_driver_transactions_submitted_total",
        "Total transactions broadcast successfully",
        &["network"]
    ).unwrap();

    pub static ref TX_FAILED: CounterVec = register_counter_vec!(
        "testnet_driver_transactions_failed_total",
        "Total failed submissions by pipeline stage",
        &["network", "stage"]
    ).unwrap();

    pub static ref GAS_PRICE_FALLBACKS: CounterVec = register_counter_vec!(
        "testnet_driver_gas_price_fallbacks_total",
        "Gas price reads that fell back to the configured minimum",
        &["network"]
    ).unwrap();

    pub static ref GAS_ESTIMATE_FALLBACKS: CounterVec = register_counter_vec!(
        "testnet_driver_gas_estimate_fallbacks_total",
        "Gas estimates that fell back to the default gas limit",
        &["network"]
    ).unwrap();

    pub static ref NONCE_RESETS: CounterVec = register_counter_vec!(
        "testnet_driver_nonce_resets_total",
        "Cached nonces discarded",
        &["network"]
    ).unwrap();

    pub static ref WALLET_BALANCE: GaugeVec = register_gauge_vec!(
        "testnet_driver_wallet_balance",
        "Wallet balance in the network's native currency",
        &["network", "wallet"]
    ).unwrap();
}

/// Prometheus metrics server
pub struct MetricsServer {
    port: u16,
}

impl MetricsServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub async fn run(&self) -> SubmitResult<()> {
        let app = Router::new().route("/metrics", get(metrics_handler));

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Starting metrics server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| SubmitError::Internal(format!("metrics bind {}: {}", addr, e)))?;
        axum::serve(listener, app)
            .await
            .map_err(|e| SubmitError::Internal(format!("metrics server: {}", e)))?;

        Ok(())
    }
}

async fn metrics_handler() -> Result<String, StatusCode> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    String::from_utf8(buffer).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

// Helper functions to record metrics

pub fn record_network_health(network: Network, healthy: bool) {
    NETWORK_HEALTHY
        .with_label_values(&[network.as_str()])
        .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_tx_submitted(network: Network) {
    TX_SUBMITTED.with_label_values(&[network.as_str()]).inc();
}

pub fn record_tx_failed(network: Network, stage: FailureStage) {
    TX_FAILED
        .with_label_values(&[network.as_str(), stage.as_str()])
        .inc();
}

pub fn record_gas_price_fallback(network: Network) {
    GAS_PRICE_FALLBACKS
        .with_label_values(&[network.as_str()])
        .inc();
}

pub fn record_gas_estimate_fallback(network: Network) {
    GAS_ESTIMATE_FALLBACKS
        .with_label_values(&[network.as_str()])
        .inc();
}

pub fn record_nonce_reset(network: Network) {
    NONCE_RESETS.with_label_values(&[network.as_str()]).inc();
}

pub fn record_wallet_balance(network: Network, wallet: usize, balance: f64) {
    WALLET_BALANCE
        .with_label_values(&[network.as_str(), &wallet.to_string()])
        .set(balance);
}
