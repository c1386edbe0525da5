use std::sync::Arc;
use tracing::{error, info};

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Gauge, Histogram, MeterProvider};
use opentelemetry_sdk::metrics::{MetricError, SdkMeterProvider};
use prometheus::{Encoder, TextEncoder};
use std::net::SocketAddr;

pub struct Metrics {
    registry: Arc<prometheus::Registry>,
    _provider: SdkMeterProvider,

    // Block fetching metrics
    pub blocks_fetched: Counter<u64>,
    pub block_gaps: Counter<u64>,
    pub malformed_blocks: Counter<u64>,
    pub latest_fetched_block: Gauge<u64>,

    // Endpoint metrics
    pub endpoint_failovers: Counter<u64>,

    // RPC metrics
    pub rpc_requests: Counter<u64>,
    pub rpc_errors: Counter<u64>,
    pub rpc_latency: Histogram<f64>,
}

impl Metrics {
    pub fn new() -> Result<Self, MetricError> {
        // Create a new prometheus registry
        let registry = prometheus::Registry::new();

        // Configure OpenTelemetry to use this registry
        let exporter = opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()?;

        // Set up a meter to create instruments
        let provider = SdkMeterProvider::builder().with_reader(exporter).build();
        let meter = provider.meter("indexer_metrics");

        let blocks_fetched = meter
            .u64_counter("indexer_blocks_fetched")
            .with_description("Total number of blocks fetched and normalized")
            .build();

        let block_gaps = meter
            .u64_counter("indexer_block_gaps")
            .with_description("Blocks skipped after exhausting retries and fail-over")
            .build();

        let malformed_blocks = meter
            .u64_counter("indexer_malformed_blocks")
            .with_description("Blocks rejected during normalization")
            .build();

        let latest_fetched_block = meter
            .u64_gauge("indexer_latest_fetched_block")
            .with_description("Latest block number fetched")
            .build();

        let endpoint_failovers = meter
            .u64_counter("indexer_endpoint_failovers")
            .with_description("Number of switches from the primary to the backup endpoint")
            .build();

        let rpc_requests = meter
            .u64_counter("indexer_rpc_requests")
            .with_description("Number of RPC requests made")
            .build();

        let rpc_errors = meter
            .u64_counter("indexer_rpc_errors")
            .with_description("Number of RPC errors encountered")
            .build();

        let rpc_latency = meter
            .f64_histogram("indexer_rpc_latency")
            .with_description("RPC request latency")
            .with_boundaries(vec![
                0.025, 0.05, 0.075, 0.1, 0.15, 0.2, 0.3, 0.5, 1.0, 5.0, 10.0,
            ])
            .with_unit("s")
            .build();

        Ok(Self {
            registry: Arc::new(registry),
            _provider: provider,
            blocks_fetched,
            block_gaps,
            malformed_blocks,
            latest_fetched_block,
            endpoint_failovers,
            rpc_requests,
            rpc_errors,
            rpc_latency,
        })
    }

    pub fn record_rpc(&self, method: &'static str, endpoint: &str, latency_secs: f64, is_error: bool) {
        let labels = [
            KeyValue::new("method", method),
            KeyValue::new("endpoint", endpoint.to_string()),
        ];
        self.rpc_requests.add(1, &labels);
        self.rpc_latency.record(latency_secs, &labels);
        if is_error {
            self.rpc_errors.add(1, &labels);
        }
    }

    pub async fn start_metrics_server(&self, addr: &str, port: u16) -> Result<()> {
        let addr = format!("{addr}:{port}")
            .parse::<SocketAddr>()
            .context("invalid metrics address")?;
        let registry = self.registry.clone();

        let app = Router::new().route("/metrics", get(move || metrics_handler(registry.clone())));

        // Determine the access URL based on the binding address. Only used for logging.
        let access_url = if addr.ip().to_string() == "0.0.0.0" {
            format!("http://localhost:{port}/metrics")
        } else {
            format!("http://{}:{port}/metrics", addr.ip())
        };

        info!(
            "Starting metrics server - binding to {} (accessible at {})",
            addr, access_url
        );

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .context("failed to bind metrics server")?;

        // Spawn the server in a separate task
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("Metrics server error: {}", e);
            }
        });

        Ok(())
    }
}

async fn metrics_handler(registry: Arc<prometheus::Registry>) -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_metrics_are_exported() {
        let metrics = Metrics::new().unwrap();
        metrics.blocks_fetched.add(3, &[]);
        metrics.record_rpc("eth_getBlockByNumber", "eth.drpc.org", 0.2, true);

        let body = metrics_handler(metrics.registry.clone()).await;
        assert!(body.contains("indexer_blocks_fetched"));
        assert!(body.contains("indexer_rpc_errors"));
    }
}
