use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Labels every record carries, in output column order
pub const DEFAULT_REQUIRED_LABELS: &[&str] = &[
    "Marka pojazdu",
    "Model pojazdu",
    "Wersja",
    "Kolor",
    "Liczba drzwi",
    "Liczba miejsc",
    "Rok produkcji",
    "Generacja",
    "Rodzaj paliwa",
    "Pojemność skokowa",
    "Moc",
    "Typ nadwozia",
    "Rodzaj koloru",
    "Skrzynia biegów",
    "Napęd",
    "Emisja CO2",
    "Spalanie W Mieście",
    "Spalanie Poza Miastem",
    "Kraj pochodzenia",
    "Przebieg",
    "Numer rejestracyjny pojazdu",
    "Stan",
    "Bezwypadkowy",
    "Data pierwszej rejestracji w historii pojazdu",
    "Zarejestrowany w Polsce",
    "Pierwszy właściciel (od nowości)",
    "Serwisowany w ASO",
    "Ma numer rejestracyjny",
    "Pojemność baterii",
    "Autonomia",
    "Średnie zużycie",
    "Kondycja baterii",
    "Typ złącza ładowania",
    "Elektryczna moc maksymalna HP",
    "Liczba silników",
    "Odzyskiwanie energii hamowania",
    "Liczba baterii",
];

/// Client identities rotated across requests
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/98.0.4758.102 Safari/537.36",
    "Mozilla/5.0 (Windows NT 6.1; Win64; x64; rv:95.0) Gecko/20100101 Firefox/95.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 12_0_1) AppleWebKit/535.36 (KHTML, like Gecko) Chrome/99.0.4844.51 Safari/535.36",
];

/// Main configuration structure for Listing-Harvest
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// The query being harvested and how it is partitioned
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Base search URL with encoded filter parameters
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum number of result pages the site exposes per query
    #[serde(rename = "page-ceiling", default = "default_page_ceiling")]
    pub page_ceiling: u32,

    /// First production year probed when splitting by year
    #[serde(rename = "min-year", default = "default_min_year")]
    pub min_year: i32,

    /// Last production year probed; the current year when unset
    #[serde(rename = "max-year", default)]
    pub max_year: Option<i32>,

    /// CSS selector of the pagination list
    #[serde(rename = "pagination-selector", default = "default_pagination_selector")]
    pub pagination_selector: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.otomoto.pl/osobowe?search%5Bfilter_enum_damaged%5D=0&search%5Badvanced_search_expanded%5D=true".to_string(),
            page_ceiling: default_page_ceiling(),
            min_year: default_min_year(),
            max_year: None,
            pagination_selector: default_pagination_selector(),
        }
    }
}

impl SearchConfig {
    /// Returns the last year to probe, falling back to the current year
    pub fn effective_max_year(&self) -> i32 {
        use chrono::Datelike;
        self.max_year.unwrap_or_else(|| chrono::Local::now().year())
    }
}

/// Segment worker behavior
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of segments processed concurrently
    #[serde(default = "default_workers")]
    pub workers: u32,

    /// Only process the first N segments
    #[serde(rename = "max-segments", default)]
    pub max_segments: Option<usize>,

    /// Only scan the first N result pages of each segment
    #[serde(rename = "max-pages-per-segment", default)]
    pub max_pages_per_segment: Option<u32>,

    /// Pause before each listing detail fetch (milliseconds)
    #[serde(rename = "item-delay-ms", default = "default_item_delay")]
    pub item_delay: DelayRange,

    /// Pause after each results page (milliseconds)
    #[serde(rename = "page-delay-ms", default = "default_page_delay")]
    pub page_delay: DelayRange,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            max_segments: None,
            max_pages_per_segment: None,
            item_delay: default_item_delay(),
            page_delay: default_page_delay(),
        }
    }
}

/// Which transport renders pages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetcherBackend {
    /// Plain HTTP requests
    #[default]
    Http,
    /// Fully rendered pages from a Chrome DevTools session
    Browser,
}

/// How the client identity is chosen for each attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    #[default]
    Random,
    Cyclic,
}

/// Retry, pacing and identity settings for the fetcher
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    #[serde(default)]
    pub backend: FetcherBackend,

    /// Attempts per logical fetch
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Flat pause after a failed attempt (milliseconds)
    #[serde(rename = "retry-delay-ms", default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    /// Pause after a CAPTCHA or rate-limit page (milliseconds)
    #[serde(rename = "challenge-cooldown-ms", default = "default_challenge_cooldown")]
    pub challenge_cooldown_ms: u64,

    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Randomized pause before every request (milliseconds)
    #[serde(rename = "politeness-delay-ms", default = "default_politeness_delay")]
    pub politeness_delay: DelayRange,

    #[serde(default)]
    pub rotation: Rotation,

    #[serde(rename = "user-agents", default = "default_user_agents")]
    pub user_agents: Vec<String>,

    /// Remote DevTools endpoint (e.g. "ws://127.0.0.1:9222") for the browser backend
    #[serde(rename = "browser-url", default)]
    pub browser_url: Option<String>,

    /// Chrome binary launched when no remote endpoint is configured
    #[serde(rename = "chrome-executable", default)]
    pub chrome_executable: Option<PathBuf>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            backend: FetcherBackend::default(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay(),
            challenge_cooldown_ms: default_challenge_cooldown(),
            request_timeout_secs: default_request_timeout(),
            politeness_delay: default_politeness_delay(),
            rotation: Rotation::default(),
            user_agents: default_user_agents(),
            browser_url: None,
            chrome_executable: None,
        }
    }
}

/// Field extraction settings
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorConfig {
    /// Field labels copied into every record
    #[serde(rename = "required-labels", default = "default_required_labels")]
    pub required_labels: Vec<String>,

    /// Heading text of the description section
    #[serde(rename = "description-heading", default = "default_description_heading")]
    pub description_heading: String,

    /// Add a VIN column before the equipment column
    #[serde(rename = "capture-vin", default)]
    pub capture_vin: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            required_labels: default_required_labels(),
            description_heading: default_description_heading(),
            capture_vin: false,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving one CSV file per segment
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,

    /// Append-only file of processed listing ids
    #[serde(rename = "ledger-path", default = "default_ledger_path")]
    pub ledger_path: PathBuf,

    #[serde(rename = "file-prefix", default = "default_file_prefix")]
    pub file_prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            ledger_path: default_ledger_path(),
            file_prefix: default_file_prefix(),
        }
    }
}

/// An inclusive millisecond range, written as `[min, max]` in TOML
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "(u64, u64)")]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const ZERO: DelayRange = DelayRange {
        min_ms: 0,
        max_ms: 0,
    };

    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// Draws a uniformly distributed duration from the range
    pub fn sample(&self) -> Duration {
        use rand::Rng;

        if self.max_ms <= self.min_ms {
            return Duration::from_millis(self.min_ms);
        }
        let ms = rand::rng().random_range(self.min_ms..=self.max_ms);
        Duration::from_millis(ms)
    }
}

impl From<(u64, u64)> for DelayRange {
    fn from((min_ms, max_ms): (u64, u64)) -> Self {
        Self { min_ms, max_ms }
    }
}

fn default_page_ceiling() -> u32 {
    500
}

fn default_min_year() -> i32 {
    2000
}

fn default_pagination_selector() -> String {
    "ul.ooa-1vdlgt7".to_string()
}

fn default_workers() -> u32 {
    10
}

fn default_item_delay() -> DelayRange {
    DelayRange::new(2000, 4000)
}

fn default_page_delay() -> DelayRange {
    DelayRange::new(3000, 6000)
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    10_000
}

fn default_challenge_cooldown() -> u64 {
    60_000
}

fn default_request_timeout() -> u64 {
    15
}

fn default_politeness_delay() -> DelayRange {
    DelayRange::new(1500, 3500)
}

fn default_user_agents() -> Vec<String> {
    DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect()
}

fn default_required_labels() -> Vec<String> {
    DEFAULT_REQUIRED_LABELS.iter().map(|s| s.to_string()).collect()
}

fn default_description_heading() -> String {
    "Opis".to_string()
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("data")
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("data/ids.txt")
}

fn default_file_prefix() -> String {
    "offers".to_string()
}
