//! Gas pricing and gas limit estimation
//!
//! Neither step can fail a submission: a failed network read yields a
//! [`GasQuote::Fallback`] carrying the configured fallback value.

use crate::chain::NetworkHandle;
use crate::config::GasConfig;

use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::U256;
use tracing::{debug, warn};

/// Safety margin added on top of `eth_estimateGas`
pub const GAS_LIMIT_BUFFER_PERCENT: u64 = 20;

/// Fixed-point scale used to apply float multipliers to wei amounts
const MULTIPLIER_SCALE: u64 = 1_000_000;

const WEI_PER_GWEI: f64 = 1_000_000_000.0;

/// Resolved gas settings
#[derive(Debug, Clone, PartialEq)]
pub struct GasPolicy {
    pub multiplier: f64,
    pub retry_escalation_factor: f64,
    /// Wei
    pub min_price: U256,
    /// Wei
    pub max_price: U256,
    pub default_gas_limit: U256,
}

impl GasPolicy {
    pub fn from_config(config: &GasConfig) -> Self {
        Self {
            multiplier: config.multiplier,
            retry_escalation_factor: config.retry_escalation_factor,
            min_price: gwei_to_wei(config.min_gwei),
            max_price: gwei_to_wei(config.max_gwei),
            default_gas_limit: U256::from(config.default_gas_limit),
        }
    }

    /// Base multiplier, escalated once per retry
    pub fn effective_multiplier(&self, retry_count: u32) -> f64 {
        if retry_count == 0 {
            return self.multiplier;
        }
        let exponent = i32::try_from(retry_count).unwrap_or(i32::MAX);
        self.multiplier * self.retry_escalation_factor.powi(exponent)
    }

    /// Apply the multiplier to a network price and clamp into [min, max].
    ///
    /// The product is truncated to whole wei.
    pub fn adjust(&self, network_price: U256, retry_count: u32) -> U256 {
        // `as` saturates, so an infinite multiplier maps to u64::MAX
        let scale = (self.effective_multiplier(retry_count) * MULTIPLIER_SCALE as f64).round() as u64;
        let adjusted = network_price.saturating_mul(U256::from(scale)) / U256::from(MULTIPLIER_SCALE);
        self.clamp(adjusted)
    }

    pub fn clamp(&self, price: U256) -> U256 {
        price.max(self.min_price).min(self.max_price)
    }
}

/// Estimate plus the buffer, rounded up
pub fn buffered_gas_limit(estimate: U256) -> U256 {
    let numerator = estimate.saturating_mul(U256::from(100 + GAS_LIMIT_BUFFER_PERCENT));
    let hundred = U256::from(100);
    let (quotient, remainder) = numerator.div_mod(hundred);
    if remainder.is_zero() {
        quotient
    } else {
        quotient + 1
    }
}

pub fn gwei_to_wei(gwei: f64) -> U256 {
    U256::from((gwei * WEI_PER_GWEI).round() as u128)
}

/// A gas value and where it came from
#[derive(Debug, Clone, PartialEq)]
pub enum GasQuote {
    Network(U256),
    Fallback { value: U256, reason: String },
}

impl GasQuote {
    pub fn value(&self) -> U256 {
        match self {
            GasQuote::Network(value) | GasQuote::Fallback { value, .. } => *value,
        }
    }
}

/// Gas price and limit source for a submitter
#[derive(Debug, Clone)]
pub struct GasOracle {
    policy: GasPolicy,
}

impl GasOracle {
    pub fn new(policy: GasPolicy) -> Self {
        Self { policy }
    }

    /// Network gas price adjusted for `retry_count`; policy minimum on fetch error
    pub async fn gas_price(&self, handle: &NetworkHandle, retry_count: u32) -> GasQuote {
        match handle.client.gas_price().await {
            Ok(network_price) => {
                let adjusted = self.policy.adjust(network_price, retry_count);
                debug!(
                    "Gas price on {}: network {} wei, adjusted {} wei (retry {})",
                    handle.network, network_price, adjusted, retry_count
                );
                GasQuote::Network(adjusted)
            }
            Err(e) => {
                warn!(
                    "Gas price fetch failed on {}, using minimum {} wei: {}",
                    handle.network, self.policy.min_price, e
                );
                crate::metrics::record_gas_price_fallback(handle.network);
                GasQuote::Fallback {
                    value: self.policy.min_price,
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Buffered estimate; default gas limit on estimation error
    pub async fn estimate_gas(&self, handle: &NetworkHandle, template: &TypedTransaction) -> GasQuote {
        match handle.client.estimate_gas(template).await {
            Ok(estimate) => {
                let limit = buffered_gas_limit(estimate);
                debug!("Gas estimate on {}: {} -> {}", handle.network, estimate, limit);
                GasQuote::Network(limit)
            }
            Err(e) => {
                warn!(
                    "Gas estimation failed on {}, using default {}: {}",
                    handle.network, self.policy.default_gas_limit, e
                );
                crate::metrics::record_gas_estimate_fallback(handle.network);
                GasQuote::Fallback {
                    value: self.policy.default_gas_limit,
                    reason: e.to_string(),
                }
            }
        }
    }
}
