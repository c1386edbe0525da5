pub mod endpoints;
pub mod rpc;
pub mod session;
pub mod transformations;

use std::time::Duration;

use tracing::{error, info, warn};
use url::Url;

use crate::indexer::endpoints::EndpointSelector;
use crate::indexer::rpc::BlockTransport;
use crate::indexer::transformations::blocks::BlockTransformer;
use crate::metrics::Metrics;
use crate::models::common::{FetchOutcome, RpcConfig};
use crate::models::datasets::blocks::RawBlock;
use crate::models::errors::{FetchError, TransportError};
use crate::utils::retry::{RetryConfig, retry};

/// Knobs for a range fetch.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub retry: RetryConfig,
    pub pacing_delay: Duration,
    pub progress_interval: u64,
}

impl FetchOptions {
    pub fn new(rpc: &RpcConfig, pacing_delay_ms: u64, progress_interval: u64) -> Self {
        Self {
            retry: rpc.retry_config(),
            pacing_delay: Duration::from_millis(pacing_delay_ms),
            progress_interval,
        }
    }
}

async fn fetch_exact<T: BlockTransport>(
    transport: &T,
    endpoint: &Url,
    block_number: u64,
) -> Result<RawBlock, TransportError> {
    let block = transport.fetch_block(endpoint, block_number).await?;
    if block.number != block_number {
        return Err(TransportError::Rpc(format!(
            "requested block {} but received block {}",
            block_number, block.number
        )));
    }
    Ok(block)
}

/// Fetches one block through the active endpoint with retries. When every attempt on the primary
/// fails, fails over and makes a single final attempt against the backup.
pub async fn fetch_block_with_failover<T: BlockTransport>(
    transport: &T,
    endpoints: &mut EndpointSelector,
    retry_config: &RetryConfig,
    block_number: u64,
    metrics: Option<&Metrics>,
) -> Result<RawBlock, TransportError> {
    let context = format!("get_block_by_number({block_number})");

    let endpoint = endpoints.active().clone();
    let first_error = match retry(
        || fetch_exact(transport, &endpoint, block_number),
        retry_config,
        &context,
    )
    .await
    {
        Ok(block) => return Ok(block),
        Err(e) => e,
    };

    // Already on the backup: the retries above were the last chance for this block
    if !endpoints.fail_over() {
        return Err(first_error);
    }
    if let Some(metrics) = metrics {
        metrics.endpoint_failovers.add(1, &[]);
    }

    let endpoint = endpoints.active();
    warn!(
        "Block {} failed on every attempt ({}). Final attempt against backup {}",
        block_number, first_error, endpoint
    );
    fetch_exact(transport, endpoint, block_number).await
}

/// Counts handled blocks across one or more range fetches for progress lines.
#[derive(Debug, Clone)]
pub struct Progress {
    handled: u64,
    total: u64,
    interval: u64,
}

impl Progress {
    pub fn new(total: u64, interval: u64) -> Self {
        Self {
            handled: 0,
            total,
            interval: interval.max(1),
        }
    }

    /// Counts one block. Returns the position and percentage when a progress line is due.
    pub fn advance(&mut self) -> Option<(u64, f64)> {
        self.handled += 1;
        (self.handled % self.interval == 0 || self.handled == self.total)
            .then(|| (self.handled, self.handled as f64 / self.total as f64 * 100.0))
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}

/// Fetches and normalizes every block in `[start, end]` in order.
///
/// Blocks that cannot be fetched are recorded as gaps and blocks the normalizer rejects are
/// recorded as malformed; neither aborts the range.
pub async fn fetch_range<T: BlockTransport>(
    transport: &T,
    endpoints: &mut EndpointSelector,
    options: &FetchOptions,
    start: u64,
    end: u64,
    metrics: Option<&Metrics>,
) -> Result<FetchOutcome, FetchError> {
    if start > end {
        return Err(FetchError::InvalidRange { start, end });
    }

    let total_blocks = end - start + 1;
    info!(
        "Fetching blocks {} to {} ({} blocks)",
        start, end, total_blocks
    );

    let mut progress = Progress::new(total_blocks, options.progress_interval);
    let outcome = fetch_blocks(transport, endpoints, options, start, end, &mut progress, metrics).await;

    info!(
        "Fetched {} blocks successfully ({} gaps, {} malformed)",
        outcome.records.len(),
        outcome.gaps.len(),
        outcome.malformed.len()
    );

    Ok(outcome)
}

/// Range loop behind [`fetch_range`]. `start <= end` is the caller's job; `progress` may span
/// more blocks than this range.
pub(crate) async fn fetch_blocks<T: BlockTransport>(
    transport: &T,
    endpoints: &mut EndpointSelector,
    options: &FetchOptions,
    start: u64,
    end: u64,
    progress: &mut Progress,
    metrics: Option<&Metrics>,
) -> FetchOutcome {
    let mut outcome = FetchOutcome::default();

    for block_number in start..=end {
        match fetch_block_with_failover(transport, endpoints, &options.retry, block_number, metrics).await {
            Ok(raw_block) => match raw_block.transform_block() {
                Ok(record) => {
                    outcome.records.push(record);
                    if let Some(metrics) = metrics {
                        metrics.blocks_fetched.add(1, &[]);
                        metrics.latest_fetched_block.record(block_number, &[]);
                    }
                }
                Err(e) => {
                    warn!("Skipping block {}: {}", block_number, e);
                    outcome.malformed.push(block_number);
                    if let Some(metrics) = metrics {
                        metrics.malformed_blocks.add(1, &[]);
                    }
                }
            },
            Err(e) => {
                error!("Giving up on block {}: {}", block_number, e);
                outcome.gaps.push(block_number);
                if let Some(metrics) = metrics {
                    metrics.block_gaps.add(1, &[]);
                }
            }
        }

        if let Some((handled, percent)) = progress.advance() {
            info!(
                "Progress: {}/{} ({:.1}%) - Block {}",
                handled,
                progress.total(),
                percent,
                block_number
            );
        }

        // Pace requests to stay under provider rate limits
        if block_number < end && !options.pacing_delay.is_zero() {
            tokio::time::sleep(options.pacing_delay).await;
        }
    }

    outcome
}
