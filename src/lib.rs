//! Listing-Harvest: a dedup-aware catalog crawler
//!
//! This crate crawls a paginated, rate-limited listing catalog, splits
//! oversized queries into segments that stay under the site's page ceiling,
//! and turns every new listing into a fixed-column record.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod fetcher;
pub mod ledger;
pub mod output;
pub mod partition;
pub mod state;

use thiserror::Error;

/// Main error type for Listing-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] fetcher::FetchFailure),

    #[error("Ledger error: {0}")]
    Ledger(#[from] ledger::LedgerError),

    #[error("Ledger commit failed for segment {segment}: {source}")]
    LedgerCommit {
        segment: usize,
        source: ledger::LedgerError,
    },

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Invalid segment transition: {from} -> {to}")]
    InvalidTransition {
        from: state::SegmentState,
        to: state::SegmentState,
    },

    #[error("Invalid selector '{0}'")]
    Selector(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Segment task aborted: {0}")]
    Task(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Listing-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, SegmentOrchestrator};
pub use extract::{Extractor, ListingRecord};
pub use fetcher::{Document, Fetcher};
pub use ledger::ProcessedIdLedger;
pub use partition::{Partitioner, SearchSegment};
pub use state::SegmentState;
