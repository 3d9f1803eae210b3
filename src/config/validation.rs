use crate::config::types::{
    Config, CrawlerConfig, DelayRange, ExtractorConfig, FetcherBackend, FetcherConfig,
    OutputConfig, SearchConfig,
};
use crate::ConfigError;
use url::Url;

/// Lowest politeness delay accepted before a request
const MIN_POLITENESS_MS: u64 = 500;

/// Lowest pause accepted before a listing detail fetch
const MIN_ITEM_DELAY_MS: u64 = 1000;

/// Lowest pause accepted between results pages
const MIN_PAGE_DELAY_MS: u64 = 1000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_search_config(&config.search)?;
    validate_crawler_config(&config.crawler)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_extractor_config(&config.extractor)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if config.page_ceiling < 1 {
        return Err(ConfigError::Validation(
            "page-ceiling must be >= 1".to_string(),
        ));
    }

    let max_year = config.effective_max_year();
    if config.min_year > max_year {
        return Err(ConfigError::Validation(format!(
            "min-year ({}) must not be after max-year ({})",
            config.min_year, max_year
        )));
    }

    if config.pagination_selector.trim().is_empty() {
        return Err(ConfigError::Validation(
            "pagination-selector cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 100 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 100, got {}",
            config.workers
        )));
    }

    if config.max_segments == Some(0) {
        return Err(ConfigError::Validation(
            "max-segments must be >= 1 when set".to_string(),
        ));
    }

    if config.max_pages_per_segment == Some(0) {
        return Err(ConfigError::Validation(
            "max-pages-per-segment must be >= 1 when set".to_string(),
        ));
    }

    validate_range("item-delay-ms", &config.item_delay)?;
    validate_floor("item-delay-ms", &config.item_delay, MIN_ITEM_DELAY_MS)?;
    validate_range("page-delay-ms", &config.page_delay)?;
    validate_floor("page-delay-ms", &config.page_delay, MIN_PAGE_DELAY_MS)?;

    Ok(())
}

fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.max_retries < 1 {
        return Err(ConfigError::Validation(
            "max-retries must be >= 1".to_string(),
        ));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    validate_range("politeness-delay-ms", &config.politeness_delay)?;
    if config.politeness_delay.min_ms < MIN_POLITENESS_MS {
        return Err(ConfigError::Validation(format!(
            "politeness-delay-ms lower bound must be >= {}ms, got {}ms",
            MIN_POLITENESS_MS, config.politeness_delay.min_ms
        )));
    }

    if config.user_agents.iter().all(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "user-agents must contain at least one non-empty entry".to_string(),
        ));
    }

    if config.backend == FetcherBackend::Browser {
        if !cfg!(feature = "browser") {
            return Err(ConfigError::Validation(
                "backend = \"browser\" requires building with the `browser` feature".to_string(),
            ));
        }

        if let Some(ref remote) = config.browser_url {
            Url::parse(remote)
                .map_err(|e| ConfigError::InvalidUrl(format!("Invalid browser-url: {}", e)))?;
        }
    }

    Ok(())
}

fn validate_extractor_config(config: &ExtractorConfig) -> Result<(), ConfigError> {
    if config.required_labels.is_empty() {
        return Err(ConfigError::Validation(
            "required-labels cannot be empty".to_string(),
        ));
    }

    if let Some(label) = config.required_labels.iter().find(|l| l.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "required-labels contains a blank label: '{}'",
            label
        )));
    }

    if config.description_heading.trim().is_empty() {
        return Err(ConfigError::Validation(
            "description-heading cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    if config.ledger_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "ledger-path cannot be empty".to_string(),
        ));
    }

    if config.file_prefix.is_empty()
        || !config
            .file_prefix
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "file-prefix must be non-empty and contain only alphanumerics, '-' or '_', got '{}'",
            config.file_prefix
        )));
    }

    Ok(())
}

fn validate_range(name: &str, range: &DelayRange) -> Result<(), ConfigError> {
    if range.min_ms > range.max_ms {
        return Err(ConfigError::Validation(format!(
            "{} lower bound ({}) exceeds upper bound ({})",
            name, range.min_ms, range.max_ms
        )));
    }
    Ok(())
}

fn validate_floor(name: &str, range: &DelayRange, floor_ms: u64) -> Result<(), ConfigError> {
    if range.min_ms < floor_ms {
        return Err(ConfigError::Validation(format!(
            "{} lower bound must be >= {}ms, got {}ms",
            name, floor_ms, range.min_ms
        )));
    }
    Ok(())
}
