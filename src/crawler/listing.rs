//! Results page parser
//!
//! Extracts listing references from a search results page. A reference is
//! an `<article data-id="...">` holding a heading link to the detail page.

use crate::fetcher::Document;
use crate::HarvestError;
use scraper::Selector;
use url::Url;

/// A listing found on a results page, not yet fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingReference {
    /// Catalog-wide listing id, the ledger key
    pub item_id: String,

    /// Absolute URL of the listing detail page
    pub detail_url: String,

    /// Index of the segment whose results page listed it
    pub segment: usize,
}

/// Parses listing references out of results pages
pub struct ReferenceParser {
    article: Selector,
    link: Selector,
}

impl ReferenceParser {
    pub fn new() -> Result<Self, HarvestError> {
        let article = Selector::parse("article[data-id]")
            .map_err(|_| HarvestError::Selector("article[data-id]".to_string()))?;
        let link = Selector::parse("h2 a[href]")
            .map_err(|_| HarvestError::Selector("h2 a[href]".to_string()))?;
        Ok(Self { article, link })
    }

    /// Extracts every listing reference from `document`
    ///
    /// Articles without an id or a usable detail link are skipped. Relative
    /// links are resolved against the document URL.
    ///
    /// # Arguments
    ///
    /// * `document` - A fetched results page
    /// * `segment` - Index of the segment being scanned
    ///
    /// # Returns
    ///
    /// References in page order, one per distinct id
    pub fn parse(&self, document: &Document, segment: usize) -> Vec<ListingReference> {
        let base_url = Url::parse(document.url()).ok();
        let html = document.html();
        let mut references: Vec<ListingReference> = Vec::new();

        for article in html.select(&self.article) {
            let Some(item_id) = article
                .value()
                .attr("data-id")
                .map(str::trim)
                .filter(|id| !id.is_empty())
            else {
                continue;
            };

            let Some(detail_url) = article
                .select(&self.link)
                .filter_map(|a| a.value().attr("href"))
                .find_map(|href| resolve_link(href, base_url.as_ref()))
            else {
                tracing::debug!("Listing {} has no detail link, skipping", item_id);
                continue;
            };

            if references.iter().any(|r| r.item_id == item_id) {
                continue;
            }

            references.push(ListingReference {
                item_id: item_id.to_string(),
                detail_url,
                segment,
            });
        }

        references
    }
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel:, data: schemes
/// - Fragment-only links
/// - Relative links when there is no base URL
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: Option<&Url>) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute_url = match base_url {
        Some(base) => base.join(href).ok()?,
        None => Url::parse(href).ok()?,
    };

    if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
        Some(absolute_url.to_string())
    } else {
        None
    }
}
