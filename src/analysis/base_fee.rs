//! How the base fee responds to block fullness relative to the gas target.

use serde::Serialize;

use crate::analysis::stats::{Summary, mean, require, share, to_gwei};
use crate::models::datasets::blocks::BlockRecord;
use crate::models::errors::AnalysisError;

/// Base fee movement from one block to the next, together with the parent block's usage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaseFeeChange {
    pub block: u64,
    pub prev_base_fee: u64,
    pub curr_base_fee: u64,
    pub absolute_change: i128,
    pub percent_change: f64, // 0 when the parent block had no base fee
    pub gas_used: u64,
    pub gas_target: u64,
    pub block_fullness: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdjustmentGroup {
    pub blocks: usize,
    pub share: Option<f64>,
    pub mean_change: Option<f64>,
    pub max_change: Option<f64>,
    pub min_change: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeeAdjustmentReport {
    pub total_changes: usize,
    pub above_target: AdjustmentGroup,
    pub below_target: AdjustmentGroup,
    pub at_target: AdjustmentGroup,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaseFeeReport {
    pub base_fee_gwei: Summary,
    pub adjustment: FeeAdjustmentReport,
}

pub fn base_fee_changes(records: &[BlockRecord]) -> Vec<BaseFeeChange> {
    records
        .windows(2)
        .map(|pair| {
            let (prev, curr) = (&pair[0], &pair[1]);
            let percent_change = if prev.base_fee_per_gas > 0 {
                (curr.base_fee_per_gas as f64 - prev.base_fee_per_gas as f64) / prev.base_fee_per_gas as f64 * 100.0
            } else {
                0.0
            };

            BaseFeeChange {
                block: curr.number,
                prev_base_fee: prev.base_fee_per_gas,
                curr_base_fee: curr.base_fee_per_gas,
                absolute_change: i128::from(curr.base_fee_per_gas) - i128::from(prev.base_fee_per_gas),
                percent_change,
                gas_used: prev.gas_used,
                gas_target: prev.gas_target,
                block_fullness: prev.block_fullness,
            }
        })
        .collect()
}

fn adjustment_group(changes: &[&BaseFeeChange], total: usize) -> AdjustmentGroup {
    let percents: Vec<f64> = changes.iter().map(|c| c.percent_change).collect();
    AdjustmentGroup {
        blocks: changes.len(),
        share: share(changes.len(), total),
        mean_change: mean("base fee change", &percents).ok(),
        max_change: percents.iter().copied().reduce(f64::max),
        min_change: percents.iter().copied().reduce(f64::min),
    }
}

/// Groups consecutive-block changes by whether the parent block was above, below or at target.
pub fn fee_adjustment(records: &[BlockRecord]) -> Result<FeeAdjustmentReport, AnalysisError> {
    require("base fee adjustment", 2, records.len())?;

    let changes = base_fee_changes(records);
    let total = changes.len();
    let above: Vec<&BaseFeeChange> = changes.iter().filter(|c| c.gas_used > c.gas_target).collect();
    let below: Vec<&BaseFeeChange> = changes.iter().filter(|c| c.gas_used < c.gas_target).collect();
    let at: Vec<&BaseFeeChange> = changes.iter().filter(|c| c.gas_used == c.gas_target).collect();

    Ok(FeeAdjustmentReport {
        total_changes: total,
        above_target: adjustment_group(&above, total),
        below_target: adjustment_group(&below, total),
        at_target: adjustment_group(&at, total),
    })
}

pub fn base_fee_stats(records: &[BlockRecord]) -> Result<Summary, AnalysisError> {
    let base_fees: Vec<f64> = records
        .iter()
        .map(|b| to_gwei(u128::from(b.base_fee_per_gas)))
        .collect();
    Summary::from_samples("base fee", &base_fees)
}

pub fn analyze(records: &[BlockRecord]) -> Result<BaseFeeReport, AnalysisError> {
    Ok(BaseFeeReport {
        base_fee_gwei: base_fee_stats(records)?,
        adjustment: fee_adjustment(records)?,
    })
}
