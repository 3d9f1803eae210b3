//! Crawl coordinator - partitions the search and runs segment workers
//!
//! This module ties the crawl together:
//! - Building the shared fetcher, ledger, extractor and batch sink
//! - Splitting the base search into segments under the page ceiling
//! - Running segments on a fixed-size worker pool
//! - Collecting per-segment outcomes into a crawl report

use crate::config::Config;
use crate::crawler::orchestrator::SegmentOrchestrator;
use crate::crawler::pacing::Pacing;
use crate::extract::Extractor;
use crate::fetcher::{build_fetcher, Fetcher};
use crate::ledger::ProcessedIdLedger;
use crate::output::{BatchSink, ColumnLayout, CrawlReport, CsvBatchSink, SegmentReport};
use crate::partition::{Partitioner, SearchSegment};
use crate::HarvestError;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use url::Url;

/// Main crawl coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    fetcher: Arc<dyn Fetcher>,
    ledger: Arc<ProcessedIdLedger>,
    sink: Arc<dyn BatchSink>,
    extractor: Arc<Extractor>,
}

impl Coordinator {
    /// Creates a coordinator from configuration
    ///
    /// Builds the configured fetcher backend, loads the ledger and prepares
    /// the CSV sink in the output directory.
    ///
    /// # Arguments
    ///
    /// * `config` - The validated crawl configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to plan and run
    /// * `Err(HarvestError)` - A component could not be initialized
    pub async fn from_config(config: Config) -> Result<Self, HarvestError> {
        let fetcher = build_fetcher(&config.fetcher).await?;
        let ledger = Arc::new(ProcessedIdLedger::load(&config.output.ledger_path)?);
        let layout = ColumnLayout::from_config(&config.extractor);
        let sink: Arc<dyn BatchSink> =
            Arc::new(CsvBatchSink::from_config(&config.output, layout));

        Self::new(config, fetcher, ledger, sink)
    }

    /// Creates a coordinator around already-built components
    pub fn new(
        config: Config,
        fetcher: Arc<dyn Fetcher>,
        ledger: Arc<ProcessedIdLedger>,
        sink: Arc<dyn BatchSink>,
    ) -> Result<Self, HarvestError> {
        let extractor = Arc::new(Extractor::new(&config.extractor)?);

        Ok(Self {
            config: Arc::new(config),
            fetcher,
            ledger,
            sink,
            extractor,
        })
    }

    pub fn ledger(&self) -> &ProcessedIdLedger {
        &self.ledger
    }

    /// Probes the base search and returns the segments to crawl
    ///
    /// The plan is truncated to `max-segments` when that limit is set.
    pub async fn plan(&self) -> Result<Vec<SearchSegment>, HarvestError> {
        let base = Url::parse(&self.config.search.base_url)?;
        let partitioner = Partitioner::new(Arc::clone(&self.fetcher), &self.config.search)?;

        let mut segments = partitioner.partition(&base).await;
        if let Some(limit) = self.config.crawler.max_segments {
            if segments.len() > limit {
                tracing::info!(
                    "Limiting crawl to the first {} of {} segments",
                    limit,
                    segments.len()
                );
                segments.truncate(limit);
            }
        }

        Ok(segments)
    }

    /// Plans the crawl and runs every segment
    pub async fn run(&self) -> Result<CrawlReport, HarvestError> {
        let start_time = Instant::now();
        let segments = self.plan().await?;
        let mut report = self.run_segments(segments).await?;
        report.elapsed = start_time.elapsed();
        Ok(report)
    }

    /// Runs `segments` on the worker pool
    ///
    /// At most `workers` segments are in flight at once. A failing segment
    /// is recorded in the report and never stops its siblings.
    ///
    /// # Returns
    ///
    /// A report with one entry per segment, ordered by segment index
    pub async fn run_segments(
        &self,
        segments: Vec<SearchSegment>,
    ) -> Result<CrawlReport, HarvestError> {
        let start_time = Instant::now();
        let total = segments.len();
        let workers = self.config.crawler.workers.max(1) as usize;

        tracing::info!(
            "Crawling {} segment(s) with {} worker(s), {} ids already processed",
            total,
            workers,
            self.ledger.len()
        );

        let orchestrator = Arc::new(SegmentOrchestrator::new(
            Arc::clone(&self.fetcher),
            Arc::clone(&self.extractor),
            Arc::clone(&self.ledger),
            Arc::clone(&self.sink),
            Pacing::from_config(&self.config.crawler),
            self.config.crawler.max_pages_per_segment,
        )?);
        let permits = Arc::new(Semaphore::new(workers));

        let mut handles: Vec<(usize, String, JoinHandle<SegmentReport>)> =
            Vec::with_capacity(total);
        for segment in segments {
            let index = segment.index();
            let description = segment.describe();
            let orchestrator = Arc::clone(&orchestrator);
            let permits = Arc::clone(&permits);

            let handle = tokio::spawn(async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        return SegmentReport::failed(
                            segment.index(),
                            segment.describe(),
                            e.to_string(),
                        )
                    }
                };

                match orchestrator.run(&segment).await {
                    Ok(report) => report,
                    Err(e) => {
                        tracing::error!(
                            "Segment {} ({}) failed: {}",
                            segment.index(),
                            segment.describe(),
                            e
                        );
                        SegmentReport::failed(segment.index(), segment.describe(), e.to_string())
                    }
                }
            });
            handles.push((index, description, handle));
        }

        let mut report = CrawlReport::default();
        for (done, (index, description, handle)) in handles.into_iter().enumerate() {
            let segment_report = match handle.await {
                Ok(segment_report) => segment_report,
                Err(e) => {
                    let e = HarvestError::Task(e.to_string());
                    tracing::error!("Segment {} ({}) failed: {}", index, description, e);
                    SegmentReport::failed(index, description, e.to_string())
                }
            };
            report.segments.push(segment_report);

            tracing::info!("Progress: {}/{} segments finished", done + 1, total);
        }

        report.fetch = self.fetcher.stats();
        report.elapsed = start_time.elapsed();

        tracing::info!(
            "Crawl complete: {} record(s) written, {} segment(s) failed",
            report.records_written(),
            report.failed()
        );

        Ok(report)
    }
}
