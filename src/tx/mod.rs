//! Transaction submission module with nonce management and gas pricing

mod gas;
mod nonce;
mod sender;
mod types;

pub use gas::GasPolicy;
pub use nonce::NoncePolicy;
pub use sender::{load_wallets, SubmitterOptions, TransactionSubmitter};
pub use types::{FailureReason, FailureStage, TxIntent, TxResult};
