use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::models::datasets::blocks::BlockRecord;
use crate::models::errors::ConfigError;
use crate::utils::retry::RetryConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_address")]
    pub address: String,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: default_metrics_address(),
            port: default_metrics_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    pub primary_url: Url,
    pub backup_url: Url,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,
}

impl RpcConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.retry_attempts,
            base_delay_ms: self.retry_delay_ms,
            max_delay_ms: self.max_retry_delay_ms,
            exponential: self.backoff_factor,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    pub start_block: Option<u64>,
    pub end_block: Option<u64>,
    #[serde(default = "default_pacing_delay_ms")]
    pub pacing_delay_ms: u64,
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
    #[serde(default = "default_save_interval")]
    pub save_interval: u64,
    #[serde(default = "default_resume")]
    pub resume: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            start_block: None,
            end_block: None,
            pacing_delay_ms: default_pacing_delay_ms(),
            progress_interval: default_progress_interval(),
            save_interval: default_save_interval(),
            resume: default_resume(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub rpc: RpcConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default = "default_dataset_path")]
    pub dataset_path: PathBuf,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    /// Rejects values the pipeline cannot run with. Every knob must be positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("rpc.request_timeout_secs", self.rpc.request_timeout_secs),
            ("rpc.retry_attempts", u64::from(self.rpc.retry_attempts)),
            ("rpc.retry_delay_ms", self.rpc.retry_delay_ms),
            ("rpc.max_retry_delay_ms", self.rpc.max_retry_delay_ms),
            ("fetch.progress_interval", self.fetch.progress_interval),
            ("fetch.save_interval", self.fetch.save_interval),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be positive".to_string(),
                });
            }
        }

        if !self.rpc.backoff_factor.is_finite() || self.rpc.backoff_factor < 1.0 {
            return Err(ConfigError::Invalid {
                field: "rpc.backoff_factor",
                reason: format!("must be >= 1.0, got {}", self.rpc.backoff_factor),
            });
        }

        if let (Some(start), Some(end)) = (self.fetch.start_block, self.fetch.end_block) {
            if start > end {
                return Err(ConfigError::Invalid {
                    field: "fetch.start_block",
                    reason: format!("start block {start} is after end block {end}"),
                });
            }
        }

        Ok(())
    }
}

fn default_metrics_address() -> String {
    "0.0.0.0".to_string()
}

fn default_metrics_port() -> u16 {
    9100
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2_000
}

fn default_backoff_factor() -> f64 {
    1.0
}

fn default_max_retry_delay_ms() -> u64 {
    60_000
}

fn default_pacing_delay_ms() -> u64 {
    100
}

fn default_progress_interval() -> u64 {
    10
}

fn default_save_interval() -> u64 {
    500
}

fn default_resume() -> bool {
    true
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("data/blocks.json")
}

/// Result of driving the normalizer over one block range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOutcome {
    pub records: Vec<BlockRecord>,
    // Blocks lost to transport failure after retries and fail-over
    pub gaps: Vec<u64>,
    // Blocks the normalizer rejected
    pub malformed: Vec<u64>,
}
