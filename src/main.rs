//! Carros crawler main entry point
//!
//! This is the command-line interface for the used-car listing harvester.

use anyhow::Context;
use carros_crawler::clock::{Clock, SystemClock};
use carros_crawler::config::{load_config_with_hash, Config};
use carros_crawler::crawler::{Coordinator, HttpFetcher, RunScheduler};
use carros_crawler::export::{BatchExporter, SupabaseStore};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Carros crawler: periodic used-car listing harvester
///
/// Walks the configured listing index, enriches every listing from its
/// detail page, and uploads each batch as a timestamped CSV object.
#[derive(Parser, Debug)]
#[command(name = "carros-crawler")]
#[command(version = "1.0.0")]
#[command(about = "Periodic used-car listing harvester", long_about = None)]
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

    /// Run a single crawl and export cycle, then exit
    #[arg(long, conflicts_with = "dry_run")]
    once: bool,

    /// Validate config and show what would be crawled without any network access
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else {
        handle_crawl(config, cli.once).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("carros_crawler=info,warn"),
            1 => EnvFilter::new("carros_crawler=debug,info"),
            2 => EnvFilter::new("carros_crawler=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let coordinator = Coordinator::new(
        config.crawler.clone(),
        HttpFetcher::new(
            &config.user_agent,
            Duration::from_secs(config.crawler.request_timeout_secs),
        )?,
        Arc::new(SystemClock),
    )?;

    println!("=== Carros Crawler Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  First listing page: {}", coordinator.page_url(1));
    println!("  Target count: {}", config.crawler.target_count);
    println!("  Page delay: {}ms", config.crawler.page_delay_ms);
    println!("  Detail delay: {}ms", config.crawler.detail_delay_ms);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!("  Power marker: {:?}", config.crawler.power_marker);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.value);

    println!("\nStorage:");
    println!("  Endpoint: {}", config.storage.endpoint);
    println!("  Bucket: {}", config.storage.bucket);
    println!("  Key pattern: {}<unix timestamp>.csv", config.storage.key_prefix);
    println!("  Local directory: {}", config.storage.local_dir.display());
    println!(
        "  Credential variable: {} ({})",
        config.storage.api_key_env,
        if std::env::var_os(&config.storage.api_key_env).is_some() {
            "set"
        } else {
            "NOT SET"
        }
    );

    println!("\nSchedule:");
    println!("  Interval: {}s", config.schedule.interval_secs);

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, once: bool) -> anyhow::Result<()> {
    let timeout = Duration::from_secs(config.crawler.request_timeout_secs);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let fetcher = HttpFetcher::new(&config.user_agent, timeout)
        .context("Failed to build HTTP client")?;
    let coordinator = Coordinator::new(config.crawler.clone(), fetcher, clock.clone())?;

    let store = SupabaseStore::from_config(&config.storage, timeout)
        .context("Failed to set up object storage")?;
    let exporter = BatchExporter::new(config.storage.clone(), store, clock.clone());

    let scheduler = RunScheduler::new(
        coordinator,
        exporter,
        clock,
        Duration::from_secs(config.schedule.interval_secs),
    );

    let max_cycles = once.then_some(1);
    tracing::info!(
        "Crawling {} (target {} records per cycle)",
        config.crawler.base_url,
        config.crawler.target_count
    );

    tokio::select! {
        cycles = scheduler.run(max_cycles) => {
            tracing::info!("Finished after {} cycle(s)", cycles);
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted; records of the running cycle were not exported");
        }
    }

    Ok(())
}
