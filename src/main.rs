//! Listing-Harvest main entry point
//!
//! This is the command-line interface for the Listing-Harvest catalog crawler.

use anyhow::Context;
use clap::Parser;
use listing_harvest::config::{load_config_with_hash, Config, FetcherBackend};
use listing_harvest::crawler::{crawl, Coordinator};
use listing_harvest::ledger::ProcessedIdLedger;
use listing_harvest::output::{print_report, print_segment_plan, ColumnLayout};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Listing-Harvest: a dedup-aware catalog crawler
///
/// Listing-Harvest splits a large search into segments that fit under the
/// site's page ceiling, visits every listing it has not seen before and
/// writes one CSV file per segment.
#[derive(Parser, Debug)]
#[command(name = "listing-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A dedup-aware listing catalog crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and print the effective settings without crawling
    #[arg(long, conflicts_with_all = ["partition_only", "ledger_stats"])]
    dry_run: bool,

    /// Probe the search and print the segment plan without visiting listings
    #[arg(long, conflicts_with_all = ["dry_run", "ledger_stats"])]
    partition_only: bool,

    /// Print the number of processed ids in the ledger and exit
    #[arg(long, conflicts_with_all = ["dry_run", "partition_only"])]
    ledger_stats: bool,

    /// Crawl only the first results page of the first segment
    #[arg(long)]
    sample: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.sample {
        tracing::info!("Sample mode: first segment, first results page only");
        config.crawler.max_segments = Some(1);
        config.crawler.max_pages_per_segment = Some(1);
    }

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.ledger_stats {
        handle_ledger_stats(&config)?;
    } else if cli.partition_only {
        handle_partition_only(config).await?;
    } else {
        handle_crawl(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("listing_harvest=info,warn"),
            1 => EnvFilter::new("listing_harvest=debug,info"),
            2 => EnvFilter::new("listing_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: prints the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Listing-Harvest Dry Run ===\n");

    println!("Search:");
    println!("  Base URL: {}", config.search.base_url);
    println!("  Page ceiling: {}", config.search.page_ceiling);
    println!(
        "  Year range: {}..={}",
        config.search.min_year,
        config.search.effective_max_year()
    );

    println!("\nCrawler:");
    println!("  Workers: {}", config.crawler.workers);
    if let Some(limit) = config.crawler.max_segments {
        println!("  Max segments: {}", limit);
    }
    if let Some(limit) = config.crawler.max_pages_per_segment {
        println!("  Max pages per segment: {}", limit);
    }
    println!(
        "  Item delay: {}-{}ms",
        config.crawler.item_delay.min_ms, config.crawler.item_delay.max_ms
    );
    println!(
        "  Page delay: {}-{}ms",
        config.crawler.page_delay.min_ms, config.crawler.page_delay.max_ms
    );

    println!("\nFetcher:");
    let backend = match config.fetcher.backend {
        FetcherBackend::Http => "http",
        FetcherBackend::Browser => "browser",
    };
    println!("  Backend: {}", backend);
    println!("  Max attempts: {}", config.fetcher.max_retries);
    println!("  Retry delay: {}ms", config.fetcher.retry_delay_ms);
    println!(
        "  Challenge cooldown: {}ms",
        config.fetcher.challenge_cooldown_ms
    );
    println!(
        "  User agents: {} ({:?} rotation)",
        config.fetcher.user_agents.len(),
        config.fetcher.rotation
    );

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory.display());
    println!("  Ledger: {}", config.output.ledger_path.display());
    let layout = ColumnLayout::from_config(&config.extractor);
    println!("  Columns: {}", layout.len());

    println!("\n✓ Configuration is valid");
}

/// Handles the --ledger-stats mode: reports how many ids are already processed
fn handle_ledger_stats(config: &Config) -> anyhow::Result<()> {
    let ledger = ProcessedIdLedger::load(&config.output.ledger_path)
        .context("failed to load the processed id ledger")?;

    println!("Ledger: {}\n", ledger.path().display());
    println!("Processed ids: {}", ledger.len());

    Ok(())
}

/// Handles the --partition-only mode: prints the segment plan
async fn handle_partition_only(config: Config) -> anyhow::Result<()> {
    let coordinator = Coordinator::from_config(config)
        .await
        .context("failed to initialize the crawler")?;
    let segments = coordinator
        .plan()
        .await
        .context("failed to partition the search")?;

    print_segment_plan(&segments);
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        "Starting crawl of {} with {} worker(s)",
        config.search.base_url,
        config.crawler.workers
    );

    let report = crawl(config).await.context("crawl failed")?;

    if report.failed() > 0 {
        tracing::error!(
            "{} of {} segment(s) failed; their listings will be retried on the next run",
            report.failed(),
            report.segments.len()
        );
    } else {
        tracing::info!("Crawl completed successfully");
    }

    print_report(&report);
    Ok(())
}
