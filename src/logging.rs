//! Logging setup and per-wallet log context

use crate::config::{LogFormat, LoggingConfig};

use ethers::types::Address;
use std::fmt;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter};

/// Identifies the wallet a submitter logs for.
///
/// Handed to each submitter at construction; there is no global registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletContext {
    pub index: usize,
    pub address: Address,
}

impl WalletContext {
    pub fn new(index: usize, address: Address) -> Self {
        Self { index, address }
    }
}

impl fmt::Display for WalletContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wallet#{} {:?}", self.index, self.address)
    }
}

pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,testnet_driver=debug,hyper=warn,reqwest=warn"));

    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Json => registry.with(subscriber_fmt::layer().json()).init(),
        LogFormat::Pretty => registry
            .with(subscriber_fmt::layer().with_target(true).with_thread_ids(true))
            .init(),
    }
}
