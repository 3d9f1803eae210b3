//! Batch sink trait and types
//!
//! A segment's records are written in two steps so the ledger commit can
//! sit between them: the batch is first staged, then published (or
//! discarded if the commit fails).

use crate::extract::ListingRecord;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// A batch written to a staging location, not yet visible
#[derive(Debug)]
pub struct StagedBatch {
    pub(crate) staging_path: PathBuf,
    pub(crate) final_path: PathBuf,
    pub(crate) rows: usize,
}

impl StagedBatch {
    /// Where the batch will appear once published
    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    pub fn rows(&self) -> usize {
        self.rows
    }
}

/// Destination for segment batches
///
/// Implementations must be thread-safe; every segment worker shares one sink.
pub trait BatchSink: Send + Sync {
    /// Writes `records` for segment `segment` to a staging location
    ///
    /// # Arguments
    ///
    /// * `segment` - 1-based segment index
    /// * `records` - The segment's batch, never empty
    fn stage(&self, segment: usize, records: &[ListingRecord]) -> OutputResult<StagedBatch>;

    /// Makes a staged batch visible under its final name
    fn publish(&self, staged: StagedBatch) -> OutputResult<PathBuf>;

    /// Removes a staged batch that must not be published
    fn discard(&self, staged: StagedBatch);
}
