use crate::fetcher::Document;
use crate::HarvestError;
use scraper::Selector;

/// Reads the number of result pages from a search results document
#[derive(Debug, Clone)]
pub struct PaginationReader {
    list: Selector,
    item: Selector,
}

impl PaginationReader {
    /// Creates a reader for the pagination list matched by `selector`
    pub fn new(selector: &str) -> Result<Self, HarvestError> {
        let list =
            Selector::parse(selector).map_err(|_| HarvestError::Selector(selector.to_string()))?;
        let item = Selector::parse("li").map_err(|_| HarvestError::Selector("li".to_string()))?;
        Ok(Self { list, item })
    }

    /// Returns the highest numeric page label, or 1 when there is none
    pub fn page_count(&self, document: &Document) -> u32 {
        let html = document.html();
        let Some(list) = html.select(&self.list).next() else {
            return 1;
        };

        list.select(&self.item)
            .filter_map(|li| {
                let text = li.text().collect::<String>();
                let text = text.trim();
                if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
                    text.parse::<u32>().ok()
                } else {
                    None
                }
            })
            .max()
            .unwrap_or(1)
    }
}
