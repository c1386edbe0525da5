use serde::Serialize;

use crate::analysis::stats::{Bucket, Summary, bucketize, mean, median, percent_change, require, share};
use crate::models::datasets::blocks::BlockRecord;
use crate::models::errors::AnalysisError;

const FULLNESS_BUCKETS: [(&str, Option<f64>, Option<f64>); 5] = [
    ("nearly_empty", None, Some(25.0)),
    ("low", Some(25.0), Some(50.0)),
    ("medium", Some(50.0), Some(75.0)),
    ("high", Some(75.0), Some(90.0)),
    ("nearly_full", Some(90.0), None),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetCount {
    pub blocks: usize,
    pub share: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GasVsTarget {
    pub above_target: TargetCount,
    pub below_target: TargetCount,
    pub at_target: TargetCount,
    pub average_gas_used: f64,
    // Target of the first block in the dataset
    pub target_gas: u64,
    pub difference_from_target: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionPatterns {
    pub mean: f64,
    pub median: f64,
    pub min: u64,
    pub max: u64,
    // Mean fullness of blocks with more transactions than average
    pub avg_fullness_high_tx: Option<f64>,
    // Mean fullness of blocks with at most the average transaction count
    pub avg_fullness_low_tx: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GasUsageReport {
    pub fullness: Summary,
    pub fullness_distribution: Vec<Bucket>,
    pub gas_vs_target: GasVsTarget,
    pub transactions: TransactionPatterns,
}

pub fn fullness_distribution(records: &[BlockRecord]) -> Vec<Bucket> {
    let fullness: Vec<f64> = records.iter().map(|b| b.block_fullness).collect();
    bucketize(&fullness, &FULLNESS_BUCKETS)
}

fn target_count(records: &[BlockRecord], pred: impl Fn(&BlockRecord) -> bool) -> TargetCount {
    let blocks = records.iter().filter(|b| pred(b)).count();
    TargetCount {
        blocks,
        share: share(blocks, records.len()),
    }
}

pub fn gas_vs_target(records: &[BlockRecord]) -> Result<GasVsTarget, AnalysisError> {
    let Some(first) = records.first() else {
        return Err(AnalysisError::InsufficientData {
            statistic: "gas usage vs target",
            required: 1,
            actual: 0,
        });
    };

    let gas_used: Vec<f64> = records.iter().map(|b| b.gas_used as f64).collect();
    let average_gas_used = mean("gas used", &gas_used)?;
    let target_gas = first.gas_target;

    Ok(GasVsTarget {
        above_target: target_count(records, |b| b.gas_used > b.gas_target),
        below_target: target_count(records, |b| b.gas_used < b.gas_target),
        at_target: target_count(records, |b| b.gas_used == b.gas_target),
        average_gas_used,
        target_gas,
        difference_from_target: percent_change(target_gas as f64, average_gas_used),
    })
}

fn mean_fullness_where(records: &[BlockRecord], pred: impl Fn(&BlockRecord) -> bool) -> Option<f64> {
    let fullness: Vec<f64> = records
        .iter()
        .filter(|b| pred(b))
        .map(|b| b.block_fullness)
        .collect();
    mean("fullness by transaction count", &fullness).ok()
}

pub fn transaction_patterns(records: &[BlockRecord]) -> Result<TransactionPatterns, AnalysisError> {
    require("transaction patterns", 1, records.len())?;

    let tx_counts: Vec<f64> = records.iter().map(|b| b.transaction_count as f64).collect();
    let mean_tx = mean("transaction count", &tx_counts)?;

    Ok(TransactionPatterns {
        mean: mean_tx,
        median: median("transaction count", &tx_counts)?,
        min: records.iter().map(|b| b.transaction_count).min().unwrap_or_default(),
        max: records.iter().map(|b| b.transaction_count).max().unwrap_or_default(),
        avg_fullness_high_tx: mean_fullness_where(records, |b| b.transaction_count as f64 > mean_tx),
        avg_fullness_low_tx: mean_fullness_where(records, |b| b.transaction_count as f64 <= mean_tx),
    })
}

pub fn analyze(records: &[BlockRecord]) -> Result<GasUsageReport, AnalysisError> {
    let fullness: Vec<f64> = records.iter().map(|b| b.block_fullness).collect();

    Ok(GasUsageReport {
        fullness: Summary::from_samples("block fullness", &fullness)?,
        fullness_distribution: fullness_distribution(records),
        gas_vs_target: gas_vs_target(records)?,
        transactions: transaction_patterns(records)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::record;

    fn with_txs(mut block: BlockRecord, transaction_count: u64) -> BlockRecord {
        block.transaction_count = transaction_count;
        block
    }

    #[test]
    fn test_fullness_buckets() {
        // 30M gas limit: 5%, 30%, 50%, 80%, 100%
        let records: Vec<BlockRecord> = [1_500_000, 9_000_000, 15_000_000, 24_000_000, 30_000_000]
            .iter()
            .enumerate()
            .map(|(i, gas)| record(i as u64, 100, *gas, 0))
            .collect();
        let counts: Vec<usize> = fullness_distribution(&records).iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 1, 1, 1, 1]);
    }

    #[test]
    fn test_gas_vs_target() {
        let records = vec![
            record(1, 100, 20_000_000, 0),
            record(2, 100, 10_000_000, 0),
            record(3, 100, 15_000_000, 0),
            record(4, 100, 15_000_000, 0),
        ];
        let report = gas_vs_target(&records).unwrap();
        assert_eq!(report.above_target.blocks, 1);
        assert_eq!(report.below_target.blocks, 1);
        assert_eq!(report.at_target.blocks, 2);
        assert_eq!(report.at_target.share, Some(50.0));
        assert_eq!(report.average_gas_used, 15_000_000.0);
        assert_eq!(report.target_gas, 15_000_000);
        assert_eq!(report.difference_from_target, Some(0.0));
    }

    #[test]
    fn test_transaction_patterns_split_on_mean() {
        let records = vec![
            with_txs(record(1, 100, 30_000_000, 0), 300),
            with_txs(record(2, 100, 6_000_000, 0), 100),
            with_txs(record(3, 100, 12_000_000, 0), 200),
        ];
        let patterns = transaction_patterns(&records).unwrap();
        assert_eq!(patterns.mean, 200.0);
        assert_eq!(patterns.median, 200.0);
        assert_eq!((patterns.min, patterns.max), (100, 300));
        assert_eq!(patterns.avg_fullness_high_tx, Some(100.0));
        assert_eq!(patterns.avg_fullness_low_tx, Some(30.0));
    }

    #[test]
    fn test_uniform_transaction_counts_have_no_high_group() {
        let records = vec![record(1, 100, 15_000_000, 0), record(2, 100, 15_000_000, 0)];
        let patterns = transaction_patterns(&records).unwrap();
        assert_eq!(patterns.avg_fullness_high_tx, None);
        assert_eq!(patterns.avg_fullness_low_tx, Some(50.0));
    }

    #[test]
    fn test_needs_two_blocks() {
        assert!(matches!(
            analyze(&[record(1, 100, 15_000_000, 0)]),
            Err(AnalysisError::InsufficientData { statistic: "block fullness", .. })
        ));
    }
}
