//! Turns configured tasks into transaction intents

use crate::config::TaskConfig;
use crate::error::{SubmitError, SubmitResult};
use crate::tx::TxIntent;

use ethers::types::{Address, U256};
use rand::Rng;

/// Build the intent for one run of a task
pub fn build_intent(task: &TaskConfig, wallet: Address) -> SubmitResult<TxIntent> {
    match task {
        TaskConfig::SelfTransfer {
            min_value_wei,
            max_value_wei,
            ..
        } => {
            let min = parse_wei(min_value_wei)?;
            let max = parse_wei(max_value_wei)?;
            let value = random_value(min, max)?;
            Ok(TxIntent::transfer(wallet, value.to_string()).with_from(wallet))
        }
        TaskConfig::ContractCall {
            to,
            data,
            value_wei,
            gas_limit,
            ..
        } => {
            let to: Address = to
                .parse()
                .map_err(|e| SubmitError::Config(format!("contract_call to {:?}: {}", to, e)))?;
            let intent = TxIntent::call(to, data.clone())
                .with_value(value_wei.clone())
                .with_from(wallet);
            Ok(match gas_limit {
                Some(gas) => intent.with_gas(*gas),
                None => intent,
            })
        }
    }
}

fn parse_wei(value: &str) -> SubmitResult<U256> {
    U256::from_dec_str(value.trim())
        .map_err(|e| SubmitError::Config(format!("wei amount {:?}: {}", value, e)))
}

/// Uniform value in [min, max]
fn random_value(min: U256, max: U256) -> SubmitResult<U256> {
    if min > max {
        return Err(SubmitError::Config(format!(
            "self_transfer range is inverted: {} > {}",
            min, max
        )));
    }
    if min == max {
        return Ok(min);
    }
    if max > U256::from(u128::MAX) {
        return Err(SubmitError::Config(format!(
            "self_transfer amount {} is out of range",
            max
        )));
    }

    let value = rand::thread_rng().gen_range(min.as_u128()..=max.as_u128());
    Ok(U256::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::Network;

    fn self_transfer(min: &str, max: &str) -> TaskConfig {
        TaskConfig::SelfTransfer {
            network: Network::Primary,
            count: 1,
            min_value_wei: min.to_string(),
            max_value_wei: max.to_string(),
        }
    }

    #[test]
    fn test_self_transfer_targets_wallet_within_range() {
        let wallet = Address::repeat_byte(0x42);
        for _ in 0..50 {
            let intent = build_intent(&self_transfer("100", "200"), wallet).unwrap();
            assert_eq!(intent.to, wallet);
            assert_eq!(intent.from, Some(wallet));
            let value = intent.value_wei().unwrap();
            assert!(value >= U256::from(100) && value <= U256::from(200));
            assert!(intent.data.is_empty());
        }
    }

    #[test]
    fn test_self_transfer_rejects_inverted_range() {
        let err = build_intent(&self_transfer("5", "1"), Address::zero()).unwrap_err();
        assert!(matches!(err, SubmitError::Config(_)));
    }

    #[test]
    fn test_contract_call_intent() {
        let task = TaskConfig::ContractCall {
            network: Network::Secondary,
            count: 1,
            to: "0x00000000000000000000000000000000000000aa".to_string(),
            data: "0xd09de08a".to_string(),
            value_wei: "0".to_string(),
            gas_limit: Some(80_000),
        };

        let wallet = Address::repeat_byte(0x42);
        let intent = build_intent(&task, wallet).unwrap();
        assert_eq!(intent.to, Address::from_low_u64_be(0xaa));
        assert_eq!(intent.from, Some(wallet));
        assert_eq!(intent.gas, Some(U256::from(80_000)));
        assert_eq!(intent.data, "0xd09de08a");
    }

    #[test]
    fn test_contract_call_rejects_bad_address() {
        let task = TaskConfig::ContractCall {
            network: Network::Primary,
            count: 1,
            to: "0x1234".to_string(),
            data: String::new(),
            value_wei: "0".to_string(),
            gas_limit: None,
        };
        assert!(build_intent(&task, Address::zero()).is_err());
    }
}
