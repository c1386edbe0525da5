use std::{fmt::Display, future::Future, time::Duration};
use tokio::time::sleep;
use tracing::{error, warn};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub exponential: f64, // 1.0 keeps the delay fixed
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2_000,
            max_delay_ms: 60_000,
            exponential: 1.0,
        }
    }
}

impl RetryConfig {
    /// Delay to wait after an attempt that waited `delay` ms.
    pub fn next_delay(&self, delay: u64) -> u64 {
        if self.exponential <= 1.0 {
            return delay;
        }

        // Exponential backoff with full jitter
        // https://aws.amazon.com/blogs/architecture/exponential-backoff-and-jitter/
        let next_delay = delay as f64 * self.exponential;
        std::cmp::min(self.max_delay_ms, (fastrand::f64() * next_delay) as u64)
    }
}

/// Runs `operation` until it succeeds or `max_attempts` is reached, returning the last error.
pub async fn retry<F, Fut, T, E>(mut operation: F, config: &RetryConfig, context: &str) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 1;
    let mut delay = config.base_delay_ms;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if attempt >= config.max_attempts {
                    error!(
                        "Operation '{}' failed after {} attempts. Final error: {}",
                        context, attempt, e
                    );
                    return Err(e);
                }

                warn!(
                    "Attempt {}/{} for '{}' failed: {}. Retrying in {}ms...",
                    attempt, config.max_attempts, context, e, delay
                );

                sleep(Duration::from_millis(delay)).await;

                delay = config.next_delay(delay);
                attempt += 1;
            }
        }
    }
}
