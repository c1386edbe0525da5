//! Read-only reports over a fetched dataset.
//!
//! Every analyzer takes the ordered block records and never modifies them. Statistics that are
//! undefined for the sample at hand surface as [`AnalysisError::InsufficientData`] or as `None`
//! fields, never as NaN.

pub mod base_fee;
pub mod gas_usage;
pub mod priority_fee;
pub mod stats;
pub mod validator_economics;

use serde::Serialize;

use crate::models::datasets::blocks::BlockRecord;
use crate::models::errors::AnalysisError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    BaseFee,
    GasUsage,
    PriorityFee,
    ValidatorEconomics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)] // Serialize without enum variant name
pub enum Report {
    BaseFee(base_fee::BaseFeeReport),
    GasUsage(gas_usage::GasUsageReport),
    PriorityFee(priority_fee::PriorityFeeReport),
    ValidatorEconomics(validator_economics::ValidatorEconomicsReport),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullReport {
    pub blocks: usize,
    pub first_block: u64,
    pub last_block: u64,
    pub base_fee: base_fee::BaseFeeReport,
    pub gas_usage: gas_usage::GasUsageReport,
    pub priority_fee: priority_fee::PriorityFeeReport,
    pub validator_economics: validator_economics::ValidatorEconomicsReport,
}

pub fn run(kind: ReportKind, records: &[BlockRecord]) -> Result<Report, AnalysisError> {
    Ok(match kind {
        ReportKind::BaseFee => Report::BaseFee(base_fee::analyze(records)?),
        ReportKind::GasUsage => Report::GasUsage(gas_usage::analyze(records)?),
        ReportKind::PriorityFee => Report::PriorityFee(priority_fee::analyze(records)?),
        ReportKind::ValidatorEconomics => {
            Report::ValidatorEconomics(validator_economics::analyze(records)?)
        }
    })
}

pub fn run_all(records: &[BlockRecord]) -> Result<FullReport, AnalysisError> {
    let (Some(first), Some(last)) = (records.first(), records.last()) else {
        return Err(AnalysisError::InsufficientData {
            statistic: "full report",
            required: 2,
            actual: 0,
        });
    };

    Ok(FullReport {
        blocks: records.len(),
        first_block: first.number,
        last_block: last.number,
        base_fee: base_fee::analyze(records)?,
        gas_usage: gas_usage::analyze(records)?,
        priority_fee: priority_fee::analyze(records)?,
        validator_economics: validator_economics::analyze(records)?,
    })
}
