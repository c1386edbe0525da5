use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{self, EnvFilter};

use fee_market_indexer::analysis::{self, ReportKind};
use fee_market_indexer::indexer::FetchOptions;
use fee_market_indexer::indexer::endpoints::EndpointSelector;
use fee_market_indexer::indexer::rpc::RpcTransport;
use fee_market_indexer::indexer::session::FetchSession;
use fee_market_indexer::metrics::Metrics;
use fee_market_indexer::models::common::Config;
use fee_market_indexer::storage;
use fee_market_indexer::utils::load_config;
use fee_market_indexer::utils::retry::retry;

#[derive(Debug, Parser)]
#[command(name = "fee-market-indexer", version, about = "Fetch EIP-1559 block data and analyze the fee market")]
struct Cli {
    /// Path to the YAML config file
    #[arg(long, default_value = "config.yml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch a block range and save it to the dataset file
    Fetch {
        #[arg(long)]
        start: Option<u64>,
        /// Defaults to the latest block on the active endpoint
        #[arg(long)]
        end: Option<u64>,
    },
    /// Print reports over the dataset file as JSON
    Analyze {
        #[arg(long, value_enum, default_value_t = ReportArg::All)]
        report: ReportArg,
        /// Overrides `dataset_path` from the config
        #[arg(long)]
        dataset: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ReportArg {
    BaseFee,
    GasUsage,
    PriorityFee,
    ValidatorEconomics,
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Fetch { start, end } => {
            let config = read_config(&cli.config)?;
            fetch(config, start, end).await
        }
        Command::Analyze { report, dataset } => {
            let dataset_path = match dataset {
                Some(path) => path,
                None => read_config(&cli.config)?.dataset_path,
            };
            analyze(report, dataset_path)
        }
    }
}

fn read_config(path: &Path) -> Result<Config> {
    match load_config(path) {
        Ok(config) => {
            info!("Config loaded successfully");
            Ok(config)
        }
        Err(e) => {
            error!("Failed to load config: {:#}", e);
            Err(e)
        }
    }
}

async fn latest_block(transport: &RpcTransport, endpoints: &mut EndpointSelector, config: &Config) -> Result<u64> {
    let retry_config = config.rpc.retry_config();
    let endpoint = endpoints.active().clone();
    match retry(
        || transport.latest_block_number(&endpoint),
        &retry_config,
        "get_latest_block_number",
    )
    .await
    {
        Ok(number) => Ok(number),
        Err(_) => {
            endpoints.fail_over();
            transport
                .latest_block_number(endpoints.active())
                .await
                .context("failed to get latest block number")
        }
    }
}

async fn fetch(config: Config, start: Option<u64>, end: Option<u64>) -> Result<()> {
    println!();
    info!("=========================== INITIALIZING ===========================");

    // Initialize optional metrics
    let metrics = if config.metrics.enabled {
        Some(Arc::new(Metrics::new()?))
    } else {
        info!("Metrics are disabled");
        None
    };

    // Start metrics server if metrics are enabled
    if let Some(metrics_instance) = &metrics {
        metrics_instance
            .start_metrics_server(&config.metrics.address, config.metrics.port)
            .await?;
    }

    let mut endpoints = EndpointSelector::new(config.rpc.primary_url.clone(), config.rpc.backup_url.clone());
    let transport = RpcTransport::new(
        [&config.rpc.primary_url, &config.rpc.backup_url],
        config.rpc.request_timeout(),
        metrics.clone(),
    );
    info!("Primary endpoint: {}", config.rpc.primary_url);
    info!("Backup endpoint: {}", config.rpc.backup_url);

    let start = start
        .or(config.fetch.start_block)
        .ok_or_else(|| anyhow!("No start block given. Pass --start or set fetch.start_block"))?;
    let end = match end.or(config.fetch.end_block) {
        Some(end) => end,
        None => {
            let latest = latest_block(&transport, &mut endpoints, &config).await?;
            info!("Latest block: {}", latest);
            latest
        }
    };

    let options = FetchOptions::new(&config.rpc, config.fetch.pacing_delay_ms, config.fetch.progress_interval);
    let mut session = FetchSession::new(
        &transport,
        &mut endpoints,
        options,
        config.fetch.save_interval,
        config.fetch.resume,
        metrics.as_deref(),
    );

    println!();
    info!("========================= STARTING FETCH ===========================");

    // The dataset on disk always holds the last completed checkpoint, so an interrupted run
    // can simply stop here.
    tokio::select! {
        result = session.run(start, end, &config.dataset_path) => {
            let summary = result?;
            if !summary.gaps.is_empty() {
                warn!("Blocks missing from dataset after retries: {:?}", summary.gaps);
            }
            if !summary.malformed.is_empty() {
                warn!("Malformed blocks skipped: {:?}", summary.malformed);
            }
        }
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C signal, stopping. The dataset holds the last checkpoint.");
        }
    }

    Ok(())
}

fn analyze(report: ReportArg, dataset_path: PathBuf) -> Result<()> {
    let records = storage::load(&dataset_path)
        .with_context(|| format!("failed to load dataset {}", dataset_path.display()))?;
    info!("Loaded {} blocks for analysis", records.len());

    let kind = match report {
        ReportArg::BaseFee => Some(ReportKind::BaseFee),
        ReportArg::GasUsage => Some(ReportKind::GasUsage),
        ReportArg::PriorityFee => Some(ReportKind::PriorityFee),
        ReportArg::ValidatorEconomics => Some(ReportKind::ValidatorEconomics),
        ReportArg::All => None,
    };

    let output = match kind {
        Some(kind) => serde_json::to_string_pretty(&analysis::run(kind, &records)?)?,
        None => serde_json::to_string_pretty(&analysis::run_all(&records)?)?,
    };
    println!("{output}");

    Ok(())
}
