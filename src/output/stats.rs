//! Run statistics and reporting
//!
//! This module aggregates per-segment outcomes into a crawl report and
//! prints it (and the segment plan) to stdout.

use crate::fetcher::FetchStatsSnapshot;
use crate::partition::SearchSegment;
use std::path::PathBuf;
use std::time::Duration;

/// How a segment ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentStatus {
    /// Records were written to `file`
    Completed { records: usize, file: PathBuf },

    /// The scan finished without any new listing
    NoData,

    /// The segment was abandoned; nothing from it was published
    Failed(String),
}

/// Outcome of one segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentReport {
    pub index: usize,
    pub description: String,
    pub pages_scanned: u32,
    /// Listing references found on result pages
    pub references_seen: usize,
    /// References skipped because their id was already claimed
    pub duplicates_skipped: usize,
    /// Claimed listings whose detail page could not be fetched
    pub items_failed: usize,
    pub status: SegmentStatus,
}

impl SegmentReport {
    /// A failed report for a segment that never produced its own
    pub fn failed(index: usize, description: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            index,
            description: description.into(),
            pages_scanned: 0,
            references_seen: 0,
            duplicates_skipped: 0,
            items_failed: 0,
            status: SegmentStatus::Failed(reason.into()),
        }
    }

    pub fn records_written(&self) -> usize {
        match self.status {
            SegmentStatus::Completed { records, .. } => records,
            _ => 0,
        }
    }
}

/// Aggregated outcome of a crawl run
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    /// Segment reports ordered by segment index
    pub segments: Vec<SegmentReport>,
    pub fetch: FetchStatsSnapshot,
    pub elapsed: Duration,
}

impl CrawlReport {
    pub fn completed(&self) -> usize {
        self.count(|s| matches!(s, SegmentStatus::Completed { .. }))
    }

    pub fn no_data(&self) -> usize {
        self.count(|s| matches!(s, SegmentStatus::NoData))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, SegmentStatus::Failed(_)))
    }

    pub fn records_written(&self) -> usize {
        self.segments.iter().map(SegmentReport::records_written).sum()
    }

    pub fn duplicates_skipped(&self) -> usize {
        self.segments.iter().map(|s| s.duplicates_skipped).sum()
    }

    pub fn items_failed(&self) -> usize {
        self.segments.iter().map(|s| s.items_failed).sum()
    }

    fn count(&self, predicate: impl Fn(&SegmentStatus) -> bool) -> usize {
        self.segments.iter().filter(|s| predicate(&s.status)).count()
    }
}

/// Prints a crawl report to stdout in a formatted manner
///
/// # Arguments
///
/// * `report` - The report to display
pub fn print_report(report: &CrawlReport) {
    println!("=== Crawl Report ===\n");

    println!("Segments:");
    println!("  Total: {}", report.segments.len());
    println!("  Completed: {}", report.completed());
    println!("  No data: {}", report.no_data());
    println!("  Failed: {}", report.failed());
    println!();

    println!("Listings:");
    println!("  Records written: {}", report.records_written());
    println!("  Duplicates skipped: {}", report.duplicates_skipped());
    println!("  Items failed: {}", report.items_failed());
    println!();

    println!("Requests:");
    println!("  Sent: {}", report.fetch.requests);
    println!("  Retries: {}", report.fetch.retries);
    println!("  Challenges: {}", report.fetch.challenges);
    println!("  Gave up: {}", report.fetch.failures);
    println!();

    let failed: Vec<_> = report
        .segments
        .iter()
        .filter_map(|s| match &s.status {
            SegmentStatus::Failed(reason) => Some((s, reason)),
            _ => None,
        })
        .collect();
    if !failed.is_empty() {
        println!("Failed Segments ({}):", failed.len());
        for (segment, reason) in failed {
            println!(
                "  - #{} ({}): {}",
                segment.index, segment.description, reason
            );
        }
        println!();
    }

    println!("Elapsed: {:.1}s", report.elapsed.as_secs_f64());
}

/// Prints the segment plan produced by the partitioner
pub fn print_segment_plan(segments: &[SearchSegment]) {
    println!("=== Segment Plan ({} segment(s)) ===\n", segments.len());

    for segment in segments {
        let marker = if segment.exceeds_ceiling() {
            " [over ceiling]"
        } else {
            ""
        };
        println!(
            "  #{:<4} {:<28} {:>4} page(s){}",
            segment.index(),
            segment.describe(),
            segment.measured_pages(),
            marker
        );
        println!("        {}", segment.url());
    }

    let reachable: u64 = segments.iter().map(|s| u64::from(s.reachable_pages())).sum();
    println!("\nReachable result pages: {}", reachable);
}
