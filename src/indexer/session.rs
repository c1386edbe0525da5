use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::indexer::endpoints::EndpointSelector;
use crate::indexer::rpc::BlockTransport;
use crate::indexer::{FetchOptions, Progress, fetch_blocks};
use crate::metrics::Metrics;
use crate::models::datasets::blocks::BlockRecord;
use crate::models::errors::{DatasetError, FetchError};
use crate::storage;

/// Drives range fetches in checkpoint windows and persists the dataset after each one.
pub struct FetchSession<'a, T: BlockTransport> {
    transport: &'a T,
    endpoints: &'a mut EndpointSelector,
    options: FetchOptions,
    save_interval: u64,
    resume: bool,
    metrics: Option<&'a Metrics>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    // First block actually requested, after resume
    pub first_block: Option<u64>,
    pub end_block: u64,
    pub fetched: usize,
    pub gaps: Vec<u64>,
    pub malformed: Vec<u64>,
    pub total_records: usize,
}

impl<'a, T: BlockTransport> FetchSession<'a, T> {
    pub fn new(
        transport: &'a T,
        endpoints: &'a mut EndpointSelector,
        options: FetchOptions,
        save_interval: u64,
        resume: bool,
        metrics: Option<&'a Metrics>,
    ) -> Self {
        Self {
            transport,
            endpoints,
            options,
            save_interval: save_interval.max(1),
            resume,
            metrics,
        }
    }

    fn existing_records(&self, dataset_path: &Path) -> Result<Vec<BlockRecord>> {
        if !self.resume {
            return Ok(Vec::new());
        }

        match storage::load(dataset_path) {
            Ok(records) => {
                info!(
                    "Resuming from existing dataset with {} blocks",
                    records.len()
                );
                Ok(records)
            }
            Err(DatasetError::NotFound { .. }) => Ok(Vec::new()),
            Err(e) => Err(e).context("failed to load existing dataset for resume"),
        }
    }

    /// Fetches `[start, end]` into the dataset at `dataset_path`.
    ///
    /// With resume enabled, blocks at or below the last stored block are not fetched again and
    /// new records are appended to the stored ones.
    pub async fn run(&mut self, start: u64, end: u64, dataset_path: &Path) -> Result<SessionSummary> {
        if start > end {
            return Err(FetchError::InvalidRange { start, end }.into());
        }

        let mut dataset = self.existing_records(dataset_path)?;

        let first_block = match dataset.last() {
            Some(last) => start.max(last.number + 1),
            None => start,
        };

        let mut summary = SessionSummary {
            first_block: None,
            end_block: end,
            fetched: 0,
            gaps: Vec::new(),
            malformed: Vec::new(),
            total_records: dataset.len(),
        };

        if first_block > end {
            info!(
                "Dataset already covers blocks up to {}. Nothing to fetch.",
                end
            );
            return Ok(summary);
        }
        summary.first_block = Some(first_block);

        let total_blocks = end - first_block + 1;
        info!(
            "Fetching blocks {} to {} ({} blocks, checkpoint every {})",
            first_block, end, total_blocks, self.save_interval
        );
        let mut progress = Progress::new(total_blocks, self.options.progress_interval);

        let mut window_start = first_block;
        loop {
            let window_end = window_start
                .saturating_add(self.save_interval - 1)
                .min(end);

            let window = fetch_blocks(
                self.transport,
                self.endpoints,
                &self.options,
                window_start,
                window_end,
                &mut progress,
                self.metrics,
            )
            .await;

            summary.fetched += window.records.len();
            summary.gaps.extend(window.gaps);
            summary.malformed.extend(window.malformed);
            dataset.extend(window.records);

            storage::save(&dataset, dataset_path).context("failed to save dataset checkpoint")?;
            info!(
                "Checkpoint saved: {} blocks in {} (through block {})",
                dataset.len(),
                dataset_path.display(),
                window_end
            );

            if window_end >= end {
                break;
            }
            window_start = window_end + 1;
        }

        summary.total_records = dataset.len();

        info!(
            "Session complete: fetched {} blocks, {} gaps, {} malformed, {} blocks in dataset",
            summary.fetched,
            summary.gaps.len(),
            summary.malformed.len(),
            summary.total_records
        );

        Ok(summary)
    }
}
