//! Output module for segment batches and run reports
//!
//! This module handles:
//! - The fixed column layout of output rows
//! - Staging and publishing segment batches as CSV files
//! - Aggregating and printing crawl statistics

mod columns;
mod csv_sink;
pub mod stats;
mod traits;

pub use columns::{ColumnLayout, TRAILING_COLUMNS, VIN_COLUMN};
pub use csv_sink::CsvBatchSink;
pub use stats::{
    print_report, print_segment_plan, CrawlReport, SegmentReport, SegmentStatus,
};
pub use traits::{BatchSink, OutputError, OutputResult, StagedBatch};
