pub mod blocks;

use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy_eips::BlockNumberOrTag;
use alloy_network::AnyNetwork;
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use tokio::time::timeout;
use tracing::{debug, warn};
use url::Url;

use crate::indexer::rpc::blocks::BlockParser;
use crate::metrics::Metrics;
use crate::models::datasets::blocks::RawBlock;
use crate::models::errors::TransportError;
use crate::utils::strip_html;

/// Fetches one block, with full transaction objects, from a given endpoint.
#[allow(async_fn_in_trait)]
pub trait BlockTransport {
    async fn fetch_block(&self, endpoint: &Url, block_number: u64) -> Result<RawBlock, TransportError>;
}

/// JSON-RPC transport backed by one alloy provider per endpoint.
pub struct RpcTransport {
    providers: Vec<(Url, DynProvider<AnyNetwork>)>,
    request_timeout: Duration,
    metrics: Option<Arc<Metrics>>,
}

impl RpcTransport {
    pub fn new<'a>(
        endpoints: impl IntoIterator<Item = &'a Url>,
        request_timeout: Duration,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        let providers = endpoints
            .into_iter()
            .map(|url| {
                let provider = ProviderBuilder::new()
                    .network::<AnyNetwork>()
                    .connect_http(url.clone())
                    .erased();
                (url.clone(), provider)
            })
            .collect();

        Self {
            providers,
            request_timeout,
            metrics,
        }
    }

    fn provider(&self, endpoint: &Url) -> Result<&DynProvider<AnyNetwork>, TransportError> {
        self.providers
            .iter()
            .find(|(url, _)| url == endpoint)
            .map(|(_, provider)| provider)
            .ok_or_else(|| TransportError::UnknownEndpoint {
                endpoint: endpoint.to_string(),
            })
    }

    fn record(&self, method: &'static str, endpoint: &Url, start: Instant, is_error: bool) {
        if let Some(metrics) = &self.metrics {
            metrics.record_rpc(
                method,
                endpoint.host_str().unwrap_or_default(),
                start.elapsed().as_secs_f64(),
                is_error,
            );
        }
    }

    pub async fn latest_block_number(&self, endpoint: &Url) -> Result<u64, TransportError> {
        let provider = self.provider(endpoint)?;
        let start = Instant::now();

        let result = match timeout(self.request_timeout, async { provider.get_block_number().await }).await {
            Ok(result) => result.map_err(|e| TransportError::Rpc(strip_html(&e.to_string()))),
            Err(_) => Err(TransportError::Timeout {
                timeout_secs: self.request_timeout.as_secs(),
            }),
        };

        self.record("eth_blockNumber", endpoint, start, result.is_err());
        if let Err(e) = &result {
            warn!("Failed to get latest block number from {}: {}", endpoint, e);
        }
        result
    }
}

impl BlockTransport for RpcTransport {
    async fn fetch_block(&self, endpoint: &Url, block_number: u64) -> Result<RawBlock, TransportError> {
        let provider = self.provider(endpoint)?;
        let start = Instant::now();

        let response = timeout(self.request_timeout, async {
            provider
                .get_block_by_number(BlockNumberOrTag::Number(block_number))
                .full()
                .await
        })
        .await;

        let result = match response {
            Ok(Ok(Some(block))) => block.parse_block(),
            Ok(Ok(None)) => Err(TransportError::MissingBlock {
                number: block_number,
            }),
            Ok(Err(e)) => Err(TransportError::Rpc(strip_html(&e.to_string()))),
            Err(_) => Err(TransportError::Timeout {
                timeout_secs: self.request_timeout.as_secs(),
            }),
        };

        self.record("eth_getBlockByNumber", endpoint, start, result.is_err());
        debug!(
            "eth_getBlockByNumber({}) on {} took {:?}",
            block_number,
            endpoint,
            start.elapsed()
        );
        result
    }
}
