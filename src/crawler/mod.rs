//! Crawler module for segment processing
//!
//! This module contains the core crawling logic, including:
//! - Results page parsing into listing references
//! - Politeness pacing between items and pages
//! - Per-segment orchestration from first page to published batch
//! - Overall crawl coordination across a worker pool

mod coordinator;
mod listing;
mod orchestrator;
mod pacing;

pub use coordinator::Coordinator;
pub use listing::{ListingReference, ReferenceParser};
pub use orchestrator::SegmentOrchestrator;
pub use pacing::Pacing;

use crate::config::Config;
use crate::output::CrawlReport;
use crate::HarvestError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the fetcher, ledger and output sink
/// 2. Probe the base search and split it into segments
/// 3. Process every segment on the worker pool
/// 4. Return the aggregated run report
///
/// # Arguments
///
/// * `config` - The validated crawl configuration
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Every segment was attempted
/// * `Err(HarvestError)` - The crawl could not start
pub async fn crawl(config: Config) -> Result<CrawlReport, HarvestError> {
    Coordinator::from_config(config).await?.run().await
}
