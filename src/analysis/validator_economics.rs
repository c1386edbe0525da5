//! ETH burned through the base fee against priority fees paid to block producers.

use serde::Serialize;

use crate::analysis::stats::{mean, percent_change, require, share, to_gwei};
use crate::indexer::transformations::blocks::WEI_PER_ETH;
use crate::models::datasets::blocks::BlockRecord;
use crate::models::errors::AnalysisError;

const CONGESTION_THRESHOLD: f64 = 50.0;
const REVENUE_SAMPLE_BLOCKS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BurnAndTips {
    pub total_burned: f64,
    pub total_tips: f64,
    pub burn_to_tip_ratio: Option<f64>,
    pub net_deflation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CongestionBurn {
    pub blocks: usize,
    pub total_burned: f64,
    pub avg_burned: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BurnByCongestion {
    pub low_congestion: CongestionBurn,
    pub high_congestion: CongestionBurn,
    pub burn_increase: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockRevenue {
    pub number: u64,
    pub burned: f64,
    pub tips: f64,
    pub total_fees: f64,
    pub burned_share: Option<f64>,
    pub tips_share: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaseFeeVsTips {
    pub mean_base_fee_gwei: f64,
    pub mean_tip_gwei: f64,
    pub tips_pct_of_base_fee: Option<f64>,
    pub blocks_tip_above_base_fee: usize,
    pub share_tip_above_base_fee: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatorEconomicsReport {
    pub burn_and_tips: BurnAndTips,
    pub burn_by_congestion: BurnByCongestion,
    pub revenue_composition: Vec<BlockRevenue>,
    pub base_fee_vs_tips: BaseFeeVsTips,
}

/// Estimated tips in ETH: the block's average tip paid on all of its gas.
pub fn estimated_tips(block: &BlockRecord) -> f64 {
    let gas_used = u128::from(block.gas_used);
    match block.avg_priority_fee.checked_mul(gas_used) {
        Some(wei) => wei as f64 / WEI_PER_ETH,
        None => block.avg_priority_fee as f64 * gas_used as f64 / WEI_PER_ETH,
    }
}

pub fn burn_and_tips(records: &[BlockRecord]) -> BurnAndTips {
    let total_burned: f64 = records.iter().map(|b| b.eth_burned).sum();
    let total_tips: f64 = records
        .iter()
        .filter(|b| b.transaction_count > 0)
        .map(estimated_tips)
        .sum();

    BurnAndTips {
        total_burned,
        total_tips,
        burn_to_tip_ratio: (total_tips > 0.0).then(|| total_burned / total_tips),
        net_deflation: total_burned - total_tips,
    }
}

fn congestion_burn(records: &[BlockRecord], pred: impl Fn(&BlockRecord) -> bool) -> CongestionBurn {
    let burned: Vec<f64> = records.iter().filter(|b| pred(b)).map(|b| b.eth_burned).collect();
    CongestionBurn {
        blocks: burned.len(),
        total_burned: burned.iter().sum(),
        avg_burned: mean("burn per block", &burned).ok(),
    }
}

pub fn burn_by_congestion(records: &[BlockRecord]) -> BurnByCongestion {
    let low = congestion_burn(records, |b| b.block_fullness < CONGESTION_THRESHOLD);
    let high = congestion_burn(records, |b| b.block_fullness >= CONGESTION_THRESHOLD);

    let burn_increase = match (low.avg_burned, high.avg_burned) {
        (Some(low), Some(high)) => percent_change(low, high),
        _ => None,
    };

    BurnByCongestion {
        low_congestion: low,
        high_congestion: high,
        burn_increase,
    }
}

pub fn revenue_composition(records: &[BlockRecord]) -> Vec<BlockRevenue> {
    records
        .iter()
        .take(REVENUE_SAMPLE_BLOCKS)
        .map(|block| {
            let burned = block.eth_burned;
            let tips = estimated_tips(block);
            let total_fees = burned + tips;
            let of_total = |part: f64| (total_fees > 0.0).then(|| part / total_fees * 100.0);

            BlockRevenue {
                number: block.number,
                burned,
                tips,
                total_fees,
                burned_share: of_total(burned),
                tips_share: of_total(tips),
            }
        })
        .collect()
}

pub fn base_fee_vs_tips(records: &[BlockRecord]) -> Result<BaseFeeVsTips, AnalysisError> {
    let base_fees: Vec<f64> = records
        .iter()
        .map(|b| to_gwei(u128::from(b.base_fee_per_gas)))
        .collect();
    let tips: Vec<f64> = records.iter().map(|b| to_gwei(b.avg_priority_fee)).collect();

    let mean_base_fee_gwei = mean("base fee", &base_fees)?;
    let mean_tip_gwei = mean("tip", &tips)?;
    let blocks_tip_above_base_fee = records
        .iter()
        .filter(|b| b.avg_priority_fee > u128::from(b.base_fee_per_gas))
        .count();

    Ok(BaseFeeVsTips {
        mean_base_fee_gwei,
        mean_tip_gwei,
        tips_pct_of_base_fee: (mean_base_fee_gwei > 0.0).then(|| mean_tip_gwei / mean_base_fee_gwei * 100.0),
        blocks_tip_above_base_fee,
        share_tip_above_base_fee: share(blocks_tip_above_base_fee, records.len()),
    })
}

pub fn analyze(records: &[BlockRecord]) -> Result<ValidatorEconomicsReport, AnalysisError> {
    require("validator economics", 1, records.len())?;

    Ok(ValidatorEconomicsReport {
        burn_and_tips: burn_and_tips(records),
        burn_by_congestion: burn_by_congestion(records),
        revenue_composition: revenue_composition(records),
        base_fee_vs_tips: base_fee_vs_tips(records)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::record;

    #[test]
    fn test_estimated_tips() {
        let block = record(1, 0, 10_000_000, 2_000_000_000);
        assert_eq!(estimated_tips(&block), 0.02);
    }

    #[test]
    fn test_burn_and_tips_totals() {
        // 10 Gwei * 10M gas = 0.1 ETH burned; 1 Gwei * 10M gas = 0.01 ETH tips
        let records = vec![
            record(1, 10_000_000_000, 10_000_000, 1_000_000_000),
            record(2, 10_000_000_000, 10_000_000, 1_000_000_000),
        ];
        let totals = burn_and_tips(&records);
        assert!((totals.total_burned - 0.2).abs() < 1e-12);
        assert!((totals.total_tips - 0.02).abs() < 1e-12);
        assert!((totals.burn_to_tip_ratio.unwrap() - 10.0).abs() < 1e-9);
        assert!((totals.net_deflation - 0.18).abs() < 1e-12);
    }

    #[test]
    fn test_no_tips_means_no_ratio() {
        let records = vec![record(1, 10_000_000_000, 10_000_000, 0)];
        assert_eq!(burn_and_tips(&records).burn_to_tip_ratio, None);
    }

    #[test]
    fn test_empty_blocks_do_not_count_tips() {
        let mut block = record(1, 10_000_000_000, 10_000_000, 1_000_000_000);
        block.transaction_count = 0;
        assert_eq!(burn_and_tips(&[block]).total_tips, 0.0);
    }

    #[test]
    fn test_burn_by_congestion() {
        let records = vec![
            record(1, 10_000_000_000, 6_000_000, 0),
            record(2, 10_000_000_000, 24_000_000, 0),
        ];
        let report = burn_by_congestion(&records);
        assert_eq!(report.low_congestion.blocks, 1);
        assert_eq!(report.high_congestion.blocks, 1);
        assert!((report.burn_increase.unwrap() - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_revenue_composition_takes_first_blocks() {
        let records: Vec<BlockRecord> = (1..=8)
            .map(|n| record(n, 3_000_000_000, 10_000_000, 1_000_000_000))
            .collect();
        let revenue = revenue_composition(&records);
        assert_eq!(revenue.len(), 5);
        assert_eq!(revenue[0].number, 1);
        assert!((revenue[0].burned_share.unwrap() - 75.0).abs() < 1e-9);
        assert!((revenue[0].tips_share.unwrap() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_fee_block_has_no_shares() {
        let revenue = revenue_composition(&[record(1, 0, 10_000_000, 0)]);
        assert_eq!(revenue[0].total_fees, 0.0);
        assert_eq!(revenue[0].burned_share, None);
    }

    #[test]
    fn test_base_fee_vs_tips() {
        let records = vec![
            record(1, 10_000_000_000, 15_000_000, 1_000_000_000),
            record(2, 1_000_000_000, 15_000_000, 3_000_000_000),
        ];
        let report = base_fee_vs_tips(&records).unwrap();
        assert_eq!(report.mean_base_fee_gwei, 5.5);
        assert_eq!(report.mean_tip_gwei, 2.0);
        assert_eq!(report.blocks_tip_above_base_fee, 1);
        assert_eq!(report.share_tip_above_base_fee, Some(50.0));
    }

    #[test]
    fn test_empty_dataset_is_insufficient() {
        assert!(matches!(
            analyze(&[]),
            Err(AnalysisError::InsufficientData { actual: 0, .. })
        ));
    }
}
