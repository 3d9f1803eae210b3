//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small listing catalog and run the
//! full crawl cycle end-to-end over real HTTP.

use listing_harvest::config::{Config, DelayRange, FetcherConfig};
use listing_harvest::crawler::{crawl, Coordinator};
use listing_harvest::fetcher::{BackoffPolicy, HttpTransport, IdentityPool, ResilientFetcher};
use listing_harvest::ledger::ProcessedIdLedger;
use listing_harvest::output::{BatchSink, ColumnLayout, CrawlReport, CsvBatchSink, SegmentStatus};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CHALLENGE_PAGE: &str =
    "<html><body><h1>Please confirm you are human</h1><p>CAPTCHA required</p></body></html>";

/// Creates a test configuration pointing at the mock server
fn create_test_config(server_uri: &str, dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.search.base_url = format!("{}/osobowe?search%5Bfilter_enum_damaged%5D=0", server_uri);
    config.crawler.workers = 2;
    config.crawler.item_delay = DelayRange::ZERO;
    config.crawler.page_delay = DelayRange::ZERO;
    config.extractor.required_labels = vec!["Marka pojazdu".to_string(), "Przebieg".to_string()];
    config.output.directory = dir.path().join("out");
    config.output.ledger_path = dir.path().join("ids.txt");
    config
}

/// Builds a coordinator over a real HTTP fetcher with zero delays
fn create_coordinator(config: Config) -> Coordinator {
    let transport =
        HttpTransport::new(Duration::from_secs(5)).expect("Failed to build HTTP transport");
    let fetcher = ResilientFetcher::new(
        transport,
        BackoffPolicy::immediate(3),
        IdentityPool::from_config(&FetcherConfig::default()),
    );
    let ledger = Arc::new(
        ProcessedIdLedger::load(&config.output.ledger_path).expect("Failed to load ledger"),
    );
    let sink: Arc<dyn BatchSink> = Arc::new(CsvBatchSink::from_config(
        &config.output,
        ColumnLayout::from_config(&config.extractor),
    ));

    Coordinator::new(config, Arc::new(fetcher), ledger, sink)
        .expect("Failed to create coordinator")
}

async fn run_crawl(config: Config) -> CrawlReport {
    create_coordinator(config).run().await.expect("Crawl failed")
}

/// A single results page listing `ids`, with a one-page pagination list
fn results_page(server_uri: &str, ids: &[&str]) -> String {
    let articles: String = ids
        .iter()
        .map(|id| {
            format!(
                r#"<article data-id="{id}"><h2><a href="{uri}/oferta/{id}">Offer {id}</a></h2></article>"#,
                id = id,
                uri = server_uri
            )
        })
        .collect();

    format!(
        r#"<html><body><main>{}</main><ul class="ooa-1vdlgt7"><li>1</li></ul></body></html>"#,
        articles
    )
}

fn detail_page(make: &str, mileage: &str) -> String {
    format!(
        r#"<html><body>
        <div><p data-sentry-element="Label">Marka pojazdu</p><p>{}</p></div>
        <div><p data-sentry-element="Label">Przebieg</p><p>{}</p></div>
        </body></html>"#,
        make, mileage
    )
}

async fn mount_results(server: &MockServer, ids: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/osobowe"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(&server.uri(), ids)))
        .mount(server)
        .await;
}

async fn mount_detail(server: &MockServer, id: &str, make: &str, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/oferta/{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_page(make, "120 000 km")))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn output_files(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().map(|x| x == "csv").unwrap_or(false))
            .collect(),
        Err(_) => Vec::new(),
    }
}

fn ledger_ids(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_known_listing_is_not_revisited() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&mock_server.uri(), &dir);

    std::fs::write(&config.output.ledger_path, "202\n").expect("Failed to seed ledger");

    mount_results(&mock_server, &["201", "202", "203"]).await;
    mount_detail(&mock_server, "201", "Toyota", 1).await;
    mount_detail(&mock_server, "202", "Opel", 0).await;
    mount_detail(&mock_server, "203", "Kia", 1).await;

    let ledger_path = config.output.ledger_path.clone();
    let out_dir = config.output.directory.clone();
    let report = run_crawl(config).await;

    assert_eq!(report.segments.len(), 1);
    assert_eq!(report.records_written(), 2);
    assert_eq!(report.duplicates_skipped(), 1);
    assert_eq!(ledger_ids(&ledger_path), vec!["202", "201", "203"]);

    let files = output_files(&out_dir);
    assert_eq!(files.len(), 1, "Expected exactly one segment file");

    let mut reader = csv::Reader::from_path(&files[0]).expect("Failed to open output");
    let headers = reader.headers().expect("Missing header").clone();
    assert_eq!(&headers[0], "Marka pojazdu");
    assert_eq!(&headers[1], "Przebieg");
    assert_eq!(&headers[2], "equipment");

    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.expect("Bad row")).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][0], "Toyota");
    assert_eq!(&rows[1][0], "Kia");
    assert_eq!(&rows[0][1], "120 000 km");
    assert!(rows.iter().all(|row| row.len() == headers.len()));
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().expect("Failed to create temp dir");

    mount_results(&mock_server, &["301", "302"]).await;
    // Each listing is fetched by the first run only
    mount_detail(&mock_server, "301", "Mazda", 1).await;
    mount_detail(&mock_server, "302", "Fiat", 1).await;

    let first = run_crawl(create_test_config(&mock_server.uri(), &dir)).await;
    assert_eq!(first.records_written(), 2);

    let second = run_crawl(create_test_config(&mock_server.uri(), &dir)).await;
    assert_eq!(second.records_written(), 0);
    assert_eq!(second.duplicates_skipped(), 2);
    assert_eq!(second.segments[0].status, SegmentStatus::NoData);

    assert_eq!(output_files(&dir.path().join("out")).len(), 1);
    assert_eq!(ledger_ids(&dir.path().join("ids.txt")).len(), 2);
}

#[tokio::test]
async fn test_challenge_pages_are_retried_until_content() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&mock_server.uri(), &dir);

    mount_results(&mock_server, &["401"]).await;

    // The first two visits hit a CAPTCHA interstitial
    Mock::given(method("GET"))
        .and(path("/oferta/401"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CHALLENGE_PAGE))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;
    mount_detail(&mock_server, "401", "Volvo", 1).await;

    let report = run_crawl(config).await;

    assert_eq!(report.records_written(), 1);
    assert_eq!(report.fetch.challenges, 2);
    assert_eq!(report.fetch.failures, 0);
}

#[tokio::test]
async fn test_unreachable_listing_is_dropped_and_retried_next_run() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&mock_server.uri(), &dir);

    mount_results(&mock_server, &["501", "502"]).await;
    mount_detail(&mock_server, "501", "Honda", 1).await;
    Mock::given(method("GET"))
        .and(path("/oferta/502"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let ledger_path = config.output.ledger_path.clone();
    let report = run_crawl(config).await;

    assert_eq!(report.records_written(), 1);
    assert_eq!(report.items_failed(), 1);
    assert_eq!(report.fetch.failures, 1);
    assert_eq!(ledger_ids(&ledger_path), vec!["501"]);
}

#[tokio::test]
async fn test_empty_results_produce_no_file() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&mock_server.uri(), &dir);

    mount_results(&mock_server, &[]).await;

    let out_dir = config.output.directory.clone();
    let report = run_crawl(config).await;

    assert_eq!(report.no_data(), 1);
    assert!(output_files(&out_dir).is_empty());
    assert!(!dir.path().join("ids.txt").exists());
}

#[tokio::test]
async fn test_crawl_builds_components_from_config() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = create_test_config(&mock_server.uri(), &dir);
    config.fetcher.politeness_delay = DelayRange::ZERO;
    config.fetcher.retry_delay_ms = 0;
    config.fetcher.challenge_cooldown_ms = 0;

    mount_results(&mock_server, &["601"]).await;
    mount_detail(&mock_server, "601", "Dacia", 1).await;

    let ledger_path = config.output.ledger_path.clone();
    let out_dir = config.output.directory.clone();
    let report = crawl(config).await.expect("Crawl failed");

    assert_eq!(report.records_written(), 1);
    assert_eq!(ledger_ids(&ledger_path), vec!["601"]);
    assert_eq!(output_files(&out_dir).len(), 1);
}
