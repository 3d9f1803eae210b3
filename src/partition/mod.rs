//! URL space partitioning
//!
//! The catalog exposes at most a fixed number of result pages per query.
//! This module splits an oversized query into segments that each stay under
//! that ceiling:
//! - First by single production year, from the configured minimum year up to
//!   the current year
//! - Then, for years still over the ceiling, by gearbox (manual / automatic)
//!
//! The gearbox split is terminal. A year+gearbox segment still over the
//! ceiling is kept as-is and only its first `page_ceiling` pages are reachable.

mod pagination;
mod partitioner;
pub mod query;

pub use pagination::PaginationReader;
pub use partitioner::Partitioner;

use std::fmt;
use url::Url;

/// Gearbox values understood by the site's gearbox filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gearbox {
    Manual,
    Automatic,
}

impl Gearbox {
    /// Every gearbox value, in split order
    pub const ALL: [Gearbox; 2] = [Gearbox::Manual, Gearbox::Automatic];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Automatic => "automatic",
        }
    }
}

impl fmt::Display for Gearbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One filtered sub-query of the base search
///
/// Segments are created once by the `Partitioner` and consumed by exactly
/// one orchestrator task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSegment {
    index: usize,
    url: Url,
    year: Option<i32>,
    gearbox: Option<Gearbox>,
    measured_pages: u32,
    page_ceiling: u32,
}

impl SearchSegment {
    pub fn new(
        index: usize,
        url: Url,
        year: Option<i32>,
        gearbox: Option<Gearbox>,
        measured_pages: u32,
        page_ceiling: u32,
    ) -> Self {
        Self {
            index,
            url,
            year,
            gearbox,
            measured_pages,
            page_ceiling,
        }
    }

    /// 1-based position of the segment in the crawl plan
    pub fn index(&self) -> usize {
        self.index
    }

    /// The filtered search URL, without a page selector
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn year(&self) -> Option<i32> {
        self.year
    }

    pub fn gearbox(&self) -> Option<Gearbox> {
        self.gearbox
    }

    /// Page count probed when the segment was created
    pub fn measured_pages(&self) -> u32 {
        self.measured_pages
    }

    pub fn page_ceiling(&self) -> u32 {
        self.page_ceiling
    }

    /// Returns true if the probe saw more pages than the site serves
    pub fn exceeds_ceiling(&self) -> bool {
        self.measured_pages > self.page_ceiling
    }

    /// Number of result pages worth walking, never past the ceiling
    pub fn reachable_pages(&self) -> u32 {
        self.measured_pages.min(self.page_ceiling).max(1)
    }

    /// URL of result page `page`
    pub fn page_url(&self, page: u32) -> Url {
        query::with_page(&self.url, page)
    }

    /// Short human-readable description of the segment's filters
    pub fn describe(&self) -> String {
        match (self.year, self.gearbox) {
            (Some(year), Some(gearbox)) => format!("year {}, {} gearbox", year, gearbox),
            (Some(year), None) => format!("year {}", year),
            (None, Some(gearbox)) => format!("{} gearbox", gearbox),
            (None, None) => "unfiltered".to_string(),
        }
    }
}
