//! Error types for the testnet driver

use crate::chain::Network;

use ethers::types::H256;
use thiserror::Error;

/// Main error type for chain access and transaction submission
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Chain connection error for {network}: {message}")]
    ChainConnection { network: Network, message: String },

    #[error("RPC {method} failed: {message}")]
    Rpc {
        method: &'static str,
        message: String,
        code: Option<i64>,
        data: Option<serde_json::Value>,
    },

    #[error("Nonce error on {network}: {source}")]
    Nonce {
        network: Network,
        #[source]
        source: Box<SubmitError>,
    },

    #[error("Invalid transaction intent: {0}")]
    InvalidIntent(String),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Transaction {tx_hash:?} reverted")]
    Reverted { tx_hash: H256 },

    #[error("Transaction {tx_hash:?} was dropped before inclusion")]
    Dropped { tx_hash: H256 },

    #[error("Network {network} is not configured")]
    NetworkNotConfigured { network: Network },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SubmitError {
    /// JSON-RPC error code reported by the node, if any
    pub fn code(&self) -> Option<i64> {
        match self {
            SubmitError::Rpc { code, .. } => *code,
            SubmitError::Nonce { source, .. } => source.code(),
            _ => None,
        }
    }

    /// JSON-RPC error data reported by the node, if any
    pub fn data(&self) -> Option<&serde_json::Value> {
        match self {
            SubmitError::Rpc { data, .. } => data.as_ref(),
            SubmitError::Nonce { source, .. } => source.data(),
            _ => None,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            SubmitError::ChainConnection { .. } => true,
            SubmitError::Nonce { source, .. } => source.is_retryable(),
            // Transport failures carry no JSON-RPC code
            SubmitError::Rpc { code, .. } => code.is_none(),
            _ => false,
        }
    }
}

/// Result type for chain and submission operations
pub type SubmitResult<T> = Result<T, SubmitError>;
