//! Intents handed to the submitter and the results it reports back

use crate::chain::Network;
use crate::error::{SubmitError, SubmitResult};

use ethers::types::{Address, Bytes, TransactionReceipt, H256, U256};
use std::fmt;

/// What the caller wants sent
#[derive(Debug, Clone, PartialEq)]
pub struct TxIntent {
    pub to: Address,
    /// Decimal wei
    pub value: String,
    /// Hex calldata, `0x` prefix optional
    pub data: String,
    /// Explicit gas limit; skips estimation when set
    pub gas: Option<U256>,
    /// Must match the submitter's account when set
    pub from: Option<Address>,
}

impl TxIntent {
    /// Plain value transfer
    pub fn transfer(to: Address, value_wei: impl Into<String>) -> Self {
        Self {
            to,
            value: value_wei.into(),
            data: String::new(),
            gas: None,
            from: None,
        }
    }

    /// Contract call without value
    pub fn call(to: Address, data: impl Into<String>) -> Self {
        Self {
            to,
            value: "0".to_string(),
            data: data.into(),
            gas: None,
            from: None,
        }
    }

    pub fn with_value(mut self, value_wei: impl Into<String>) -> Self {
        self.value = value_wei.into();
        self
    }

    pub fn with_gas(mut self, gas: impl Into<U256>) -> Self {
        self.gas = Some(gas.into());
        self
    }

    pub fn with_from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    /// Parse the decimal value
    pub fn value_wei(&self) -> SubmitResult<U256> {
        let value = self.value.trim();
        if value.is_empty() {
            return Ok(U256::zero());
        }
        U256::from_dec_str(value)
            .map_err(|e| SubmitError::InvalidIntent(format!("value {:?}: {}", self.value, e)))
    }

    /// Decode the hex calldata
    pub fn calldata(&self) -> SubmitResult<Bytes> {
        let data = self.data.trim();
        let data = data.strip_prefix("0x").unwrap_or(data);
        hex::decode(data)
            .map(Bytes::from)
            .map_err(|e| SubmitError::InvalidIntent(format!("calldata: {}", e)))
    }
}

/// Step of the submission pipeline a failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Prepare,
    Nonce,
    Signing,
    Broadcast,
    Receipt,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::Prepare => "prepare",
            FailureStage::Nonce => "nonce",
            FailureStage::Signing => "signing",
            FailureStage::Broadcast => "broadcast",
            FailureStage::Receipt => "receipt",
        }
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Well-known node rejections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    NonceTooLow,
    InsufficientFunds,
    Underpriced,
    AlreadyKnown,
    Reverted,
}

impl FailureReason {
    /// Classify a node error message
    pub fn classify(message: &str) -> Option<Self> {
        let message = message.to_lowercase();
        if message.contains("nonce too low") || message.contains("nonce has already been used") {
            Some(FailureReason::NonceTooLow)
        } else if message.contains("insufficient funds") {
            Some(FailureReason::InsufficientFunds)
        } else if message.contains("underpriced") || message.contains("fee too low") {
            Some(FailureReason::Underpriced)
        } else if message.contains("already known") || message.contains("known transaction") {
            Some(FailureReason::AlreadyKnown)
        } else if message.contains("revert") {
            Some(FailureReason::Reverted)
        } else {
            None
        }
    }
}

/// Structured failure extracted from whatever the node or signer reported
#[derive(Debug, Clone, PartialEq)]
pub struct TxFailure {
    pub stage: FailureStage,
    pub message: String,
    pub code: Option<i64>,
    pub data: Option<serde_json::Value>,
    pub reason: Option<FailureReason>,
    pub retryable: bool,
}

impl TxFailure {
    pub fn from_error(stage: FailureStage, err: &SubmitError) -> Self {
        let message = err.to_string();
        let reason = match err {
            SubmitError::Reverted { .. } => Some(FailureReason::Reverted),
            _ => FailureReason::classify(&message),
        };
        // Once broadcast, a resend would duplicate the transaction
        let retryable = stage != FailureStage::Receipt
            && (err.is_retryable()
                || matches!(
                    reason,
                    Some(FailureReason::Underpriced) | Some(FailureReason::NonceTooLow)
                ));

        Self {
            stage,
            message,
            code: err.code(),
            data: err.data().cloned(),
            reason,
            retryable,
        }
    }
}

impl fmt::Display for TxFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.message)?;
        if let Some(code) = self.code {
            write!(f, " (code {})", code)?;
        }
        if let Some(reason) = self.reason {
            write!(f, " [{:?}]", reason)?;
        }
        Ok(())
    }
}

/// Outcome of one `send_transaction` call
#[derive(Debug, Clone)]
pub struct TxResult {
    pub label: String,
    pub network: Network,
    pub success: bool,
    pub tx_hash: Option<H256>,
    pub nonce: Option<u64>,
    pub gas_limit: Option<U256>,
    pub gas_price: Option<U256>,
    pub receipt: Option<TransactionReceipt>,
    pub error: Option<TxFailure>,
}

impl TxResult {
    pub(crate) fn new(label: &str, network: Network) -> Self {
        Self {
            label: label.to_string(),
            network,
            success: false,
            tx_hash: None,
            nonce: None,
            gas_limit: None,
            gas_price: None,
            receipt: None,
            error: None,
        }
    }

    pub(crate) fn fail(&mut self, failure: TxFailure) {
        self.success = false;
        self.error = Some(failure);
    }
}

/// Account balance on one network
#[derive(Debug, Clone, PartialEq)]
pub struct Balance {
    pub wei: U256,
    pub ether: String,
    pub currency: String,
}
