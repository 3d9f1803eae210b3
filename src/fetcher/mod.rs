//! Fetcher module for retrieving rendered documents
//!
//! This module contains everything between a URL and a parsed page:
//! - The `Fetcher` capability callers depend on
//! - A single-attempt `Transport` seam with HTTP and browser implementations
//! - Retry, challenge cooldown and politeness pacing in `ResilientFetcher`
//! - Client identity rotation

#[cfg(feature = "browser")]
mod browser;
mod http;
mod identity;
mod policy;
mod resilient;

#[cfg(feature = "browser")]
pub use browser::BrowserTransport;
pub use http::{build_http_client, HttpTransport};
pub use identity::IdentityPool;
pub use policy::BackoffPolicy;
pub use resilient::{FetchStats, FetchStatsSnapshot, ResilientFetcher};

use crate::config::{FetcherBackend, FetcherConfig};
use crate::HarvestError;
use async_trait::async_trait;
use scraper::Html;
use std::sync::Arc;
use thiserror::Error;

/// Elements whose text never counts as visible page content
const INVISIBLE_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Markers of a CAPTCHA or rate-limit interstitial, matched case-insensitively
const CHALLENGE_MARKERS: &[&str] = &["captcha", "too many requests"];

/// A fetched page body together with the URL it was served from
///
/// The body is kept as text and parsed on demand, so documents can move
/// freely between tasks.
#[derive(Debug, Clone)]
pub struct Document {
    url: String,
    body: String,
}

impl Document {
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
        }
    }

    /// The URL the document was served from (after redirects)
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Parses the body into an HTML tree
    pub fn html(&self) -> Html {
        Html::parse_document(&self.body)
    }

    /// Returns the visible text content of the page
    pub fn text_content(&self) -> String {
        visible_text(&self.html())
    }

    /// Returns true if the page is a CAPTCHA or rate-limit challenge
    pub fn is_challenge(&self) -> bool {
        let text = self.text_content().to_lowercase();
        CHALLENGE_MARKERS.iter().any(|marker| text.contains(marker))
    }
}

fn visible_text(html: &Html) -> String {
    let mut text = String::new();

    for node in html.root_element().descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };

        let hidden = node
            .parent()
            .and_then(|parent| parent.value().as_element().map(|el| el.name()))
            .map(|name| INVISIBLE_ELEMENTS.contains(&name))
            .unwrap_or(false);

        if !hidden {
            text.push_str(fragment);
            text.push(' ');
        }
    }

    text
}

/// Why a single attempt did not produce a usable document
#[derive(Debug, Clone, Error)]
pub enum AttemptFailure {
    #[error("HTTP status {0}")]
    Status(u16),

    #[error("challenge page served instead of content")]
    Challenge,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Transport-level failure of one request
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("{0}")]
    Other(String),
}

/// Returned once every attempt for a URL has failed
#[derive(Debug, Clone, Error)]
#[error("giving up on {url} after {attempts} attempt(s): {last_cause}")]
pub struct FetchFailure {
    pub url: String,
    pub attempts: u32,
    pub last_cause: AttemptFailure,
}

/// A raw response from one transport attempt
#[derive(Debug, Clone)]
pub struct RawPage {
    pub status: u16,
    pub final_url: String,
    pub body: String,
}

/// One request, no retries
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issues a single GET for `url` presenting `user_agent`
    async fn get(&self, url: &str, user_agent: &str) -> Result<RawPage, TransportError>;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}

/// The capability every crawl component depends on
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Retrieves a rendered document or reports that all attempts failed
    async fn fetch(&self, url: &str) -> Result<Document, FetchFailure>;

    /// Counters accumulated since the fetcher was created
    fn stats(&self) -> FetchStatsSnapshot {
        FetchStatsSnapshot::default()
    }
}

/// Builds the fetcher selected by configuration
pub async fn build_fetcher(config: &FetcherConfig) -> Result<Arc<dyn Fetcher>, HarvestError> {
    let policy = BackoffPolicy::from_config(config);
    let identities = IdentityPool::from_config(config);

    match config.backend {
        FetcherBackend::Http => {
            let transport = HttpTransport::new(policy.request_timeout)?;
            Ok(Arc::new(ResilientFetcher::new(transport, policy, identities)))
        }
        FetcherBackend::Browser => build_browser_fetcher(config, policy, identities).await,
    }
}

#[cfg(feature = "browser")]
async fn build_browser_fetcher(
    config: &FetcherConfig,
    policy: BackoffPolicy,
    identities: IdentityPool,
) -> Result<Arc<dyn Fetcher>, HarvestError> {
    let transport = BrowserTransport::from_config(config, policy.request_timeout).await?;
    Ok(Arc::new(ResilientFetcher::new(transport, policy, identities)))
}

#[cfg(not(feature = "browser"))]
async fn build_browser_fetcher(
    _config: &FetcherConfig,
    _policy: BackoffPolicy,
    _identities: IdentityPool,
) -> Result<Arc<dyn Fetcher>, HarvestError> {
    Err(HarvestError::Config(crate::ConfigError::Validation(
        "browser backend is not compiled in; rebuild with --features browser".to_string(),
    )))
}
