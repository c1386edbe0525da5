use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
    #[error("RPC error: {0}")]
    Rpc(String),
    #[error("Provider returned no block for number {number}")]
    MissingBlock { number: u64 },
    #[error("Invalid block format: Expected full transaction objects but received only transaction hashes")]
    TransactionHashesOnly,
    #[error("No provider configured for endpoint {endpoint}")]
    UnknownEndpoint { endpoint: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BlockError {
    #[error("Malformed block {number}: {reason}")]
    MalformedBlock { number: u64, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Invalid block range: start {start} is greater than end {end}")]
    InvalidRange { start: u64, end: u64 },
}

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Dataset not found: {path}")]
    NotFound { path: PathBuf },
    #[error("Dataset is corrupt: {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Dataset is corrupt: {path}: block {number} does not follow block {previous}")]
    OutOfOrder {
        path: PathBuf,
        previous: u64,
        number: u64,
    },
    #[error("Dataset I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Insufficient data for {statistic}: need at least {required} samples, got {actual}")]
    InsufficientData {
        statistic: &'static str,
        required: usize,
        actual: usize,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid config value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}
