//! Per-segment politeness pacing
//!
//! Within a segment, work is strictly sequential: a randomized pause comes
//! before every listing detail fetch and after every results page. These
//! pauses are on top of the fetcher's own per-request politeness delay.

use crate::config::{CrawlerConfig, DelayRange};
use std::time::Duration;

/// Pauses applied between a segment's requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    item_delay: DelayRange,
    page_delay: DelayRange,
}

impl Pacing {
    pub fn new(item_delay: DelayRange, page_delay: DelayRange) -> Self {
        Self {
            item_delay,
            page_delay,
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(config.item_delay, config.page_delay)
    }

    /// Waits before fetching a listing detail page
    pub async fn before_item(&self) {
        sleep(self.item_delay.sample()).await;
    }

    /// Waits after a results page has been processed
    pub async fn after_page(&self) {
        sleep(self.page_delay.sample()).await;
    }
}

async fn sleep(duration: Duration) {
    if !duration.is_zero() {
        tracing::trace!("Pacing for {:?}", duration);
        tokio::time::sleep(duration).await;
    }
}
