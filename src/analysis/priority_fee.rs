use serde::Serialize;

use crate::analysis::stats::{Bucket, Summary, bucketize, mean, median, percent_change, require, share, to_gwei};
use crate::models::datasets::blocks::BlockRecord;
use crate::models::errors::AnalysisError;

// Bounds in Gwei
const TIP_BUCKETS: [(&str, Option<f64>, Option<f64>); 5] = [
    ("very_low", None, Some(0.001)),
    ("low", Some(0.001), Some(0.01)),
    ("medium", Some(0.01), Some(0.1)),
    ("high", Some(0.1), Some(1.0)),
    ("very_high", Some(1.0), None),
];

const CONGESTION_THRESHOLD: f64 = 50.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CongestionTips {
    pub blocks_with_tips: usize,
    pub mean_tip_gwei: Option<f64>,
    pub median_tip_gwei: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TipsVsCongestion {
    pub low_congestion: CongestionTips,
    pub high_congestion: CongestionTips,
    pub tip_increase: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriorityFeeReport {
    pub blocks_with_tips: usize,
    pub share_with_tips: Option<f64>,
    // None when fewer than two blocks carry tips
    pub tips_gwei: Option<Summary>,
    pub tips_vs_congestion: TipsVsCongestion,
    pub tip_distribution: Vec<Bucket>,
}

/// Average tips in Gwei of the blocks that carry any, optionally filtered by fullness.
fn tips_gwei(records: &[BlockRecord], pred: impl Fn(&BlockRecord) -> bool) -> Vec<f64> {
    records
        .iter()
        .filter(|b| b.avg_priority_fee > 0 && pred(b))
        .map(|b| to_gwei(b.avg_priority_fee))
        .collect()
}

fn congestion_tips(tips: &[f64]) -> CongestionTips {
    CongestionTips {
        blocks_with_tips: tips.len(),
        mean_tip_gwei: mean("tip", tips).ok(),
        median_tip_gwei: median("tip", tips).ok(),
    }
}

pub fn tips_vs_congestion(records: &[BlockRecord]) -> TipsVsCongestion {
    let low = congestion_tips(&tips_gwei(records, |b| b.block_fullness < CONGESTION_THRESHOLD));
    let high = congestion_tips(&tips_gwei(records, |b| b.block_fullness >= CONGESTION_THRESHOLD));

    let tip_increase = match (low.mean_tip_gwei, high.mean_tip_gwei) {
        (Some(low), Some(high)) => percent_change(low, high),
        _ => None,
    };

    TipsVsCongestion {
        low_congestion: low,
        high_congestion: high,
        tip_increase,
    }
}

pub fn tip_distribution(records: &[BlockRecord]) -> Vec<Bucket> {
    let tips = tips_gwei(records, |_| true);
    if tips.is_empty() {
        return Vec::new();
    }
    bucketize(&tips, &TIP_BUCKETS)
}

pub fn analyze(records: &[BlockRecord]) -> Result<PriorityFeeReport, AnalysisError> {
    require("priority fee analysis", 1, records.len())?;

    let tips = tips_gwei(records, |_| true);

    Ok(PriorityFeeReport {
        blocks_with_tips: tips.len(),
        share_with_tips: share(tips.len(), records.len()),
        tips_gwei: Summary::from_samples("tip", &tips).ok(),
        tips_vs_congestion: tips_vs_congestion(records),
        tip_distribution: tip_distribution(records),
    })
}
