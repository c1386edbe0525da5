use alloy_primitives::U256;

use crate::models::datasets::blocks::{BlockRecord, RawBlock};
use crate::models::errors::BlockError;

/// Wei per ether.
pub const WEI_PER_ETH: f64 = 1e18;

pub trait BlockTransformer {
    fn transform_block(&self) -> Result<BlockRecord, BlockError>;
}

impl BlockTransformer for RawBlock {
    fn transform_block(&self) -> Result<BlockRecord, BlockError> {
        if self.gas_limit == 0 {
            return Err(BlockError::MalformedBlock {
                number: self.number,
                reason: "gas limit is zero".to_string(),
            });
        }

        let base_fee_per_gas = self.base_fee_per_gas.unwrap_or(0);

        // gas_used > gas_limit is not clamped; fullness may exceed 100
        let block_fullness = self.gas_used as f64 / self.gas_limit as f64 * 100.0;

        let priority_fees: Vec<u128> = self
            .transactions
            .iter()
            .filter_map(|tx| tx.max_priority_fee_per_gas)
            .collect();
        let (avg_priority_fee, max_priority_fee, min_priority_fee) = priority_fee_summary(&priority_fees);

        // Exact product in wei, rounded once into f64 before scaling
        let burned_wei = u128::from(base_fee_per_gas) * u128::from(self.gas_used);
        let eth_burned = burned_wei as f64 / WEI_PER_ETH;

        Ok(BlockRecord {
            number: self.number,
            timestamp: self.timestamp,
            base_fee_per_gas,
            gas_used: self.gas_used,
            gas_limit: self.gas_limit,
            transaction_count: self.transactions.len() as u64,
            miner: self.miner.clone(),
            gas_target: self.gas_limit / 2,
            block_fullness,
            avg_priority_fee,
            max_priority_fee,
            min_priority_fee,
            eth_burned,
        })
    }
}

/// (avg, max, min) of the fees, with the average floored. All zero when empty.
fn priority_fee_summary(fees: &[u128]) -> (u128, u128, u128) {
    let (Some(max), Some(min)) = (fees.iter().max(), fees.iter().min()) else {
        return (0, 0, 0);
    };

    let sum = fees.iter().fold(U256::ZERO, |acc, fee| acc + U256::from(*fee));
    let avg = sum / U256::from(fees.len());

    // avg <= max, so it always fits
    (avg.to::<u128>(), *max, *min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::datasets::blocks::RawTransaction;

    fn tx(fee: Option<u128>) -> RawTransaction {
        RawTransaction {
            max_priority_fee_per_gas: fee,
        }
    }

    fn raw_block() -> RawBlock {
        RawBlock {
            number: 100,
            timestamp: 1_700_000_000,
            base_fee_per_gas: Some(50),
            gas_used: 10_000_000,
            gas_limit: 20_000_000,
            miner: "0x95222290DD7278Aa3Ddd389Cc1E1d165CC4BAfe5".to_string(),
            transactions: vec![tx(Some(2)), tx(Some(4))],
        }
    }

    #[test]
    fn test_transform_reference_block() {
        let record = raw_block().transform_block().unwrap();

        assert_eq!(record.number, 100);
        assert_eq!(record.gas_target, 10_000_000);
        assert_eq!(record.block_fullness, 50.0);
        assert_eq!(record.avg_priority_fee, 3);
        assert_eq!(record.max_priority_fee, 4);
        assert_eq!(record.min_priority_fee, 2);
        assert_eq!(record.transaction_count, 2);
        assert_eq!(record.eth_burned, 50.0 * 10_000_000.0 / 1e18);
        assert_eq!(record.miner, "0x95222290DD7278Aa3Ddd389Cc1E1d165CC4BAfe5");
    }

    #[test]
    fn test_average_priority_fee_is_floored() {
        let mut block = raw_block();
        block.transactions = vec![tx(Some(5)), tx(Some(15))];
        let record = block.transform_block().unwrap();
        assert_eq!((record.avg_priority_fee, record.max_priority_fee, record.min_priority_fee), (10, 15, 5));

        block.transactions = vec![tx(Some(1)), tx(Some(2))];
        let record = block.transform_block().unwrap();
        assert_eq!(record.avg_priority_fee, 1);
    }

    #[test]
    fn test_legacy_transactions_are_ignored_for_priority_fees() {
        let mut block = raw_block();
        block.transactions = vec![tx(None), tx(Some(7)), tx(None)];
        let record = block.transform_block().unwrap();
        assert_eq!(record.transaction_count, 3);
        assert_eq!((record.avg_priority_fee, record.max_priority_fee, record.min_priority_fee), (7, 7, 7));
    }

    #[test]
    fn test_no_priority_fees_yields_zeroes() {
        let mut block = raw_block();
        block.transactions = vec![tx(None), tx(None)];
        let record = block.transform_block().unwrap();
        assert_eq!((record.avg_priority_fee, record.max_priority_fee, record.min_priority_fee), (0, 0, 0));

        block.transactions.clear();
        let record = block.transform_block().unwrap();
        assert_eq!(record.transaction_count, 0);
        assert_eq!(record.avg_priority_fee, 0);
    }

    #[test]
    fn test_pre_london_block_has_zero_base_fee() {
        let mut block = raw_block();
        block.base_fee_per_gas = None;
        let record = block.transform_block().unwrap();
        assert_eq!(record.base_fee_per_gas, 0);
        assert_eq!(record.eth_burned, 0.0);
    }

    #[test]
    fn test_zero_gas_limit_is_malformed() {
        let mut block = raw_block();
        block.gas_limit = 0;
        assert_eq!(
            block.transform_block(),
            Err(BlockError::MalformedBlock {
                number: 100,
                reason: "gas limit is zero".to_string(),
            })
        );
    }

    #[test]
    fn test_overfull_block_is_not_clamped() {
        let mut block = raw_block();
        block.gas_used = 30_000_000;
        let record = block.transform_block().unwrap();
        assert_eq!(record.block_fullness, 150.0);
    }

    #[test]
    fn test_odd_gas_limit_target_is_floored() {
        let mut block = raw_block();
        block.gas_limit = 30_000_001;
        let record = block.transform_block().unwrap();
        assert_eq!(record.gas_target, 15_000_000);
        assert!((record.block_fullness - 10_000_000.0 / 30_000_001.0 * 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_large_priority_fees_do_not_overflow() {
        let mut block = raw_block();
        block.transactions = vec![tx(Some(u128::MAX)), tx(Some(u128::MAX - 2))];
        let record = block.transform_block().unwrap();
        assert_eq!(record.avg_priority_fee, u128::MAX - 1);
    }
}
