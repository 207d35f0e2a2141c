//! Chain module - JSON-RPC access to the configured networks
//!
//! This module provides:
//! - The [`ChainClient`] seam the submitter talks through
//! - Multi-RPC HTTP providers with automatic failover
//! - A registry resolving `primary` / `secondary` to live handles

pub mod provider;

pub use provider::{ChainClient, RpcProvider};

use crate::config::Settings;
use crate::error::SubmitResult;

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Logical network a transaction targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Primary,
    Secondary,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Primary => "primary",
            Network::Secondary => "secondary",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a submitter needs to talk to one network
#[derive(Clone)]
pub struct NetworkHandle {
    pub network: Network,
    pub name: String,
    pub chain_id: u64,
    pub currency: String,
    pub client: Arc<dyn ChainClient>,
}

impl fmt::Debug for NetworkHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkHandle")
            .field("network", &self.network)
            .field("name", &self.name)
            .field("chain_id", &self.chain_id)
            .field("currency", &self.currency)
            .finish()
    }
}

/// Holds the providers for all configured networks
pub struct ChainRegistry {
    handles: HashMap<Network, NetworkHandle>,
    providers: HashMap<Network, Arc<RpcProvider>>,
}

impl ChainRegistry {
    /// Create providers for every configured network
    pub fn new(settings: &Settings) -> SubmitResult<Self> {
        let mut handles = HashMap::new();
        let mut providers = HashMap::new();

        for (network, config) in settings.configured_networks() {
            info!(
                "Initializing {} network {} (chain ID: {})",
                network, config.name, config.chain_id
            );

            let provider = Arc::new(RpcProvider::new(network, config)?);
            providers.insert(network, provider.clone());
            handles.insert(
                network,
                NetworkHandle {
                    network,
                    name: config.name.clone(),
                    chain_id: config.chain_id,
                    currency: config.currency.clone(),
                    client: provider,
                },
            );
        }

        Ok(Self { handles, providers })
    }

    /// Handles for all configured networks
    pub fn handles(&self) -> Vec<NetworkHandle> {
        self.handles.values().cloned().collect()
    }

    /// Health check for all networks
    pub async fn health_check(&self) -> Vec<(Network, bool)> {
        let mut results = Vec::new();

        for (network, provider) in &self.providers {
            let healthy = provider.health_check().await;
            results.push((*network, healthy));

            crate::metrics::record_network_health(*network, healthy);
        }

        results
    }
}
