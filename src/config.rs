//! Configuration management for the testnet driver
//!
//! Loads configuration from TOML files with environment variable substitution.
//! Gas settings are resolved once into a typed [`GasPolicy`] so that nothing
//! downstream reads raw config values.

use crate::chain::Network;
use crate::tx::{GasPolicy, NoncePolicy};

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub runner: RunnerConfig,
    #[serde(default)]
    pub gas: GasConfig,
    pub networks: NetworksConfig,
    pub wallet: WalletConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub tasks: Vec<TaskConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunnerConfig {
    #[serde(default = "default_cycles")]
    pub cycles: u32,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default)]
    pub delay_min_ms: u64,
    #[serde(default)]
    pub delay_max_ms: u64,
    /// 0 runs every wallet at once
    #[serde(default)]
    pub max_concurrent_wallets: usize,
    #[serde(default)]
    pub min_balance_eth: f64,
    #[serde(default = "default_true")]
    pub wait_for_receipt: bool,
    #[serde(default)]
    pub nonce_policy: NoncePolicy,
}

/// Raw gas settings as written in the config file
#[derive(Debug, Clone, Deserialize)]
pub struct GasConfig {
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default = "default_min_gwei")]
    pub min_gwei: f64,
    #[serde(default = "default_max_gwei")]
    pub max_gwei: f64,
    #[serde(default = "default_gas_limit")]
    pub default_gas_limit: u64,
    #[serde(default = "default_escalation")]
    pub retry_escalation_factor: f64,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            multiplier: default_multiplier(),
            min_gwei: default_min_gwei(),
            max_gwei: default_max_gwei(),
            default_gas_limit: default_gas_limit(),
            retry_escalation_factor: default_escalation(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworksConfig {
    pub primary: NetworkConfig,
    pub secondary: Option<NetworkConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub name: String,
    pub rpc_urls: Vec<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    /// Environment variable holding comma-separated private keys
    pub private_keys_env: Option<String>,
    /// File with one private key per line
    pub keys_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 9090,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// A scripted task run by every wallet
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskConfig {
    /// Send a random amount back to the wallet itself
    SelfTransfer {
        network: Network,
        #[serde(default = "default_count")]
        count: u32,
        /// Decimal wei
        min_value_wei: String,
        /// Decimal wei
        max_value_wei: String,
    },
    /// Call a contract with fixed calldata
    ContractCall {
        network: Network,
        #[serde(default = "default_count")]
        count: u32,
        to: String,
        data: String,
        #[serde(default = "default_zero")]
        value_wei: String,
        gas_limit: Option<u64>,
    },
}

impl TaskConfig {
    pub fn network(&self) -> Network {
        match self {
            TaskConfig::SelfTransfer { network, .. } | TaskConfig::ContractCall { network, .. } => {
                *network
            }
        }
    }

    pub fn count(&self) -> u32 {
        match self {
            TaskConfig::SelfTransfer { count, .. } | TaskConfig::ContractCall { count, .. } => {
                *count
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TaskConfig::SelfTransfer { .. } => "self_transfer",
            TaskConfig::ContractCall { .. } => "contract_call",
        }
    }
}

fn default_cycles() -> u32 {
    1
}

fn default_retry_delay_ms() -> u64 {
    3_000
}

fn default_true() -> bool {
    true
}

fn default_multiplier() -> f64 {
    1.2
}

fn default_min_gwei() -> f64 {
    1.0
}

fn default_max_gwei() -> f64 {
    50.0
}

fn default_gas_limit() -> u64 {
    300_000
}

fn default_escalation() -> f64 {
    1.3
}

fn default_currency() -> String {
    "ETH".to_string()
}

fn default_count() -> u32 {
    1
}

fn default_zero() -> String {
    "0".to_string()
}

impl Settings {
    /// Load settings from the file named by `TESTNET_DRIVER_CONFIG`
    pub fn load() -> Result<Self> {
        let config_path = env::var("TESTNET_DRIVER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        Self::load_from(&config_path)
    }

    /// Load settings from a specific file
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        Self::from_toml(&config_str)
    }

    /// Parse settings from TOML text, substituting `${VAR}` references first
    pub fn from_toml(input: &str) -> Result<Self> {
        let config_str = substitute_env_vars(input);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        let gas = &self.gas;
        if !(gas.multiplier > 0.0) {
            anyhow::bail!("gas.multiplier must be positive, got {}", gas.multiplier);
        }
        if !(gas.retry_escalation_factor > 1.0) {
            anyhow::bail!(
                "gas.retry_escalation_factor must be greater than 1, got {}",
                gas.retry_escalation_factor
            );
        }
        if gas.min_gwei < 0.0 || gas.min_gwei > gas.max_gwei {
            anyhow::bail!(
                "gas bounds are invalid: min_gwei={} max_gwei={}",
                gas.min_gwei,
                gas.max_gwei
            );
        }
        if gas.default_gas_limit == 0 {
            anyhow::bail!("gas.default_gas_limit must be non-zero");
        }

        if self.runner.delay_min_ms > self.runner.delay_max_ms {
            anyhow::bail!(
                "runner.delay_min_ms ({}) exceeds runner.delay_max_ms ({})",
                self.runner.delay_min_ms,
                self.runner.delay_max_ms
            );
        }

        for network in [Network::Primary, Network::Secondary] {
            if let Some(config) = self.network(network) {
                if config.rpc_urls.is_empty() {
                    anyhow::bail!("Network {} has no RPC URLs configured", network);
                }
            }
        }

        for task in &self.tasks {
            if self.network(task.network()).is_none() {
                anyhow::bail!(
                    "Task {} targets unconfigured network {}",
                    task.name(),
                    task.network()
                );
            }
        }

        if self.wallet.private_keys_env.is_none() && self.wallet.keys_file.is_none() {
            anyhow::bail!("wallet.private_keys_env or wallet.keys_file must be set");
        }

        Ok(())
    }

    /// Non-fatal problems, reported once logging is up
    pub fn warnings(&self) -> Vec<String> {
        self.tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| task.count() == 0)
            .map(|(i, task)| format!("Task {}#{} has count 0 - will skip", task.name(), i + 1))
            .collect()
    }

    /// Get config for a network, if configured
    pub fn network(&self, network: Network) -> Option<&NetworkConfig> {
        match network {
            Network::Primary => Some(&self.networks.primary),
            Network::Secondary => self.networks.secondary.as_ref(),
        }
    }

    /// Get list of configured networks
    pub fn configured_networks(&self) -> Vec<(Network, &NetworkConfig)> {
        [Network::Primary, Network::Secondary]
            .into_iter()
            .filter_map(|n| self.network(n).map(|c| (n, c)))
            .collect()
    }

    /// Resolve the gas section into the typed policy used by submitters
    pub fn gas_policy(&self) -> GasPolicy {
        GasPolicy::from_config(&self.gas)
    }
}

lazy_static! {
    static ref ENV_VAR: Regex = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    ENV_VAR
        .replace_all(input, |caps: &regex::Captures| {
            env::var(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}
