//! Nonce tracking for sequential transaction submission
//!
//! Handles:
//! - Lazy fetch of the confirmed transaction count
//! - Optimistic local increments so back-to-back sends pipeline
//! - Pluggable reaction to broadcast failures

use crate::chain::ChainClient;
use crate::error::SubmitResult;

use ethers::types::Address;
use serde::Deserialize;
use tracing::debug;

/// Cached next nonce for one (account, network) pair
#[derive(Debug, Default)]
pub struct NonceCounter {
    current: Option<u64>,
}

impl NonceCounter {
    /// Next nonce to use, fetching the confirmed count on first use
    pub async fn get(&mut self, client: &dyn ChainClient, address: Address) -> SubmitResult<u64> {
        if let Some(nonce) = self.current {
            return Ok(nonce);
        }

        let fetched = client.get_transaction_count(address).await?;
        debug!("Fetched nonce {} for {:?}", fetched, address);
        self.current = Some(fetched);
        Ok(fetched)
    }

    /// No-op while uninitialized
    pub fn increment(&mut self) {
        if let Some(nonce) = self.current.as_mut() {
            *nonce += 1;
        }
    }

    /// Forget the cached value; the next `get` hits the network
    pub fn reset(&mut self) {
        self.current = None;
    }

    pub fn cached(&self) -> Option<u64> {
        self.current
    }
}

/// Which nonce strategy a submitter uses
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoncePolicy {
    #[default]
    Optimistic,
    Strict,
}

impl NoncePolicy {
    pub fn strategy(self) -> Box<dyn NonceStrategy> {
        match self {
            NoncePolicy::Optimistic => Box::new(OptimisticNonce),
            NoncePolicy::Strict => Box::new(StrictNonce),
        }
    }
}

/// How the counter reacts to a failed broadcast.
///
/// The submitter always increments once the transaction is signed.
pub trait NonceStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Called when the node rejects the signed transaction
    fn on_broadcast_failure(&self, counter: &mut NonceCounter);
}

/// Keeps the incremented value after a failed broadcast.
///
/// The cached nonce then runs ahead of the network until `reset` is called,
/// and later sends will be rejected for the gap.
pub struct OptimisticNonce;

impl NonceStrategy for OptimisticNonce {
    fn name(&self) -> &'static str {
        "optimistic"
    }

    fn on_broadcast_failure(&self, _counter: &mut NonceCounter) {}
}

/// Drops the cached value after a failed broadcast so the next send re-fetches
pub struct StrictNonce;

impl NonceStrategy for StrictNonce {
    fn name(&self) -> &'static str {
        "strict"
    }

    fn on_broadcast_failure(&self, counter: &mut NonceCounter) {
        counter.reset();
    }
}
