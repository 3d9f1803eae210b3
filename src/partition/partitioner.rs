use super::query::{with_gearbox, with_year};
use super::{Gearbox, PaginationReader, SearchSegment};
use crate::config::SearchConfig;
use crate::fetcher::Fetcher;
use crate::HarvestError;
use std::sync::Arc;
use url::Url;

/// Splits a base search into segments under the page ceiling
pub struct Partitioner {
    fetcher: Arc<dyn Fetcher>,
    pagination: PaginationReader,
    page_ceiling: u32,
    min_year: i32,
    max_year: i32,
}

impl Partitioner {
    /// Creates a partitioner probing through `fetcher`
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Shared fetcher used for page-count probes
    /// * `config` - Ceiling, year range and pagination selector
    ///
    /// # Returns
    ///
    /// * `Ok(Partitioner)` - Ready to partition
    /// * `Err(HarvestError::Selector)` - The pagination selector is invalid
    pub fn new(fetcher: Arc<dyn Fetcher>, config: &SearchConfig) -> Result<Self, HarvestError> {
        Ok(Self {
            fetcher,
            pagination: PaginationReader::new(&config.pagination_selector)?,
            page_ceiling: config.page_ceiling,
            min_year: config.min_year,
            max_year: config.effective_max_year(),
        })
    }

    /// Returns the number of result pages `url` exposes
    ///
    /// A probe whose fetch fails counts as a single page.
    pub async fn probe(&self, url: &Url) -> u32 {
        match self.fetcher.fetch(url.as_str()).await {
            Ok(document) => self.pagination.page_count(&document),
            Err(e) => {
                tracing::warn!("Page count probe failed, assuming 1 page: {}", e);
                1
            }
        }
    }

    /// Splits `base` into segments
    ///
    /// # Algorithm
    ///
    /// 1. Probe `base`; if it is within the ceiling, return it as the only segment
    /// 2. For every year from `min_year` through `max_year`, probe the
    ///    year-filtered URL and keep it if within the ceiling
    /// 3. Otherwise split that year by gearbox, keeping both halves whatever
    ///    their page count
    ///
    /// Segments are numbered from 1 in the order produced.
    pub async fn partition(&self, base: &Url) -> Vec<SearchSegment> {
        tracing::info!("Checking total pages for {}", base);
        let total = self.probe(base).await;

        if total <= self.page_ceiling {
            tracing::info!("Base search has {} pages, no split needed", total);
            return vec![SearchSegment::new(
                1,
                base.clone(),
                None,
                None,
                total,
                self.page_ceiling,
            )];
        }

        tracing::info!(
            "Base search has {} pages (ceiling {}), splitting by year {}..={}",
            total,
            self.page_ceiling,
            self.min_year,
            self.max_year
        );

        let mut segments = Vec::new();
        for year in self.min_year..=self.max_year {
            let year_url = with_year(base, year);
            let pages = self.probe(&year_url).await;

            if pages <= self.page_ceiling {
                tracing::debug!("Year {}: {} pages", year, pages);
                segments.push(self.segment(segments.len(), year_url, Some(year), None, pages));
                continue;
            }

            tracing::info!("Year {}: {} pages, splitting by gearbox", year, pages);
            for gearbox in Gearbox::ALL {
                let gearbox_url = with_gearbox(&year_url, gearbox);
                let pages = self.probe(&gearbox_url).await;
                if pages > self.page_ceiling {
                    tracing::warn!(
                        "Year {}, {} gearbox still has {} pages; only the first {} are reachable",
                        year,
                        gearbox,
                        pages,
                        self.page_ceiling
                    );
                }
                segments.push(self.segment(
                    segments.len(),
                    gearbox_url,
                    Some(year),
                    Some(gearbox),
                    pages,
                ));
            }
        }

        tracing::info!("Generated {} segment(s)", segments.len());
        segments
    }

    fn segment(
        &self,
        produced: usize,
        url: Url,
        year: Option<i32>,
        gearbox: Option<Gearbox>,
        pages: u32,
    ) -> SearchSegment {
        SearchSegment::new(produced + 1, url, year, gearbox, pages, self.page_ceiling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::{AttemptFailure, Document, FetchFailure};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Serves a pagination list whose size depends on the requested URL
    struct PageCountFetcher<F> {
        pages_for: F,
        requested: Mutex<Vec<String>>,
    }

    impl<F> PageCountFetcher<F>
    where
        F: Fn(&str) -> Option<u32> + Send + Sync,
    {
        fn new(pages_for: F) -> Self {
            Self {
                pages_for,
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl<F> Fetcher for PageCountFetcher<F>
    where
        F: Fn(&str) -> Option<u32> + Send + Sync,
    {
        async fn fetch(&self, url: &str) -> Result<Document, FetchFailure> {
            self.requested.lock().unwrap().push(url.to_string());
            match (self.pages_for)(url) {
                Some(pages) => {
                    let items: String = [1, 2, pages]
                        .iter()
                        .map(|n| format!("<li>{}</li>", n))
                        .collect();
                    Ok(Document::new(
                        url,
                        format!(r#"<ul class="ooa-1vdlgt7">{}</ul>"#, items),
                    ))
                }
                None => Err(FetchFailure {
                    url: url.to_string(),
                    attempts: 3,
                    last_cause: AttemptFailure::Status(503),
                }),
            }
        }
    }

    fn config(max_year: i32) -> SearchConfig {
        SearchConfig {
            base_url: "https://example.com/osobowe?x=1".to_string(),
            max_year: Some(max_year),
            ..SearchConfig::default()
        }
    }

    fn base() -> Url {
        Url::parse("https://example.com/osobowe?x=1").unwrap()
    }

    fn is_base(url: &str) -> bool {
        !url.contains("od-")
    }

    #[tokio::test]
    async fn test_small_search_is_not_split() {
        let fetcher = Arc::new(PageCountFetcher::new(|_: &str| Some(120)));
        let partitioner = Partitioner::new(fetcher.clone(), &config(2025)).unwrap();

        let segments = partitioner.partition(&base()).await;
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].url(), &base());
        assert_eq!(segments[0].measured_pages(), 120);
        assert_eq!(fetcher.requested.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_exactly_at_ceiling_is_not_split() {
        let fetcher = Arc::new(PageCountFetcher::new(|_: &str| Some(500)));
        let partitioner = Partitioner::new(fetcher, &config(2025)).unwrap();
        assert_eq!(partitioner.partition(&base()).await.len(), 1);
    }

    #[tokio::test]
    async fn test_oversized_year_splits_by_gearbox() {
        let fetcher = Arc::new(PageCountFetcher::new(|url: &str| {
            if is_base(url) {
                Some(1200)
            } else if url.contains("od-2022") && !url.contains("gearbox") {
                Some(600)
            } else if url.contains("od-2022") {
                Some(300)
            } else {
                Some(150)
            }
        }));
        let partitioner = Partitioner::new(fetcher, &config(2025)).unwrap();

        let segments = partitioner.partition(&base()).await;
        assert_eq!(segments.len(), (2025 - 2000) + 2);

        let split: Vec<_> = segments.iter().filter(|s| s.year() == Some(2022)).collect();
        assert_eq!(split.len(), 2);
        assert_eq!(split[0].gearbox(), Some(Gearbox::Manual));
        assert_eq!(split[1].gearbox(), Some(Gearbox::Automatic));
        assert!(segments.iter().all(|s| !s.exceeds_ceiling()));

        let indices: Vec<usize> = segments.iter().map(|s| s.index()).collect();
        assert_eq!(indices, (1..=segments.len()).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_default_year_range_ends_at_current_year() {
        use chrono::Datelike;

        let fetcher = Arc::new(PageCountFetcher::new(|url: &str| {
            if is_base(url) {
                Some(1200)
            } else if url.contains("od-2022") && !url.contains("gearbox") {
                Some(600)
            } else {
                Some(400)
            }
        }));
        let search = SearchConfig {
            max_year: None,
            ..config(0)
        };
        let partitioner = Partitioner::new(fetcher, &search).unwrap();

        let current_year = chrono::Local::now().year();
        let segments = partitioner.partition(&base()).await;
        assert_eq!(segments.len(), (current_year - 2000) as usize + 2);
    }

    #[tokio::test]
    async fn test_gearbox_split_is_terminal() {
        let fetcher = Arc::new(PageCountFetcher::new(|url: &str| {
            if url.contains("od-2020") || is_base(url) {
                Some(900)
            } else {
                Some(10)
            }
        }));
        let search = SearchConfig {
            min_year: 2020,
            ..config(2020)
        };
        let partitioner = Partitioner::new(fetcher, &search).unwrap();

        let segments = partitioner.partition(&base()).await;
        assert_eq!(segments.len(), 2);
        assert!(segments.iter().all(|s| s.exceeds_ceiling()));
        assert!(segments.iter().all(|s| s.reachable_pages() == 500));
    }

    #[tokio::test]
    async fn test_failed_probe_counts_as_one_page() {
        let fetcher = Arc::new(PageCountFetcher::new(|_: &str| None));
        let partitioner = Partitioner::new(fetcher, &config(2025)).unwrap();

        assert_eq!(partitioner.probe(&base()).await, 1);
        let segments = partitioner.partition(&base()).await;
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].measured_pages(), 1);
    }
}
