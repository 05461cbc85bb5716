//! Article-Ingest main entry point
//!
//! This is the command-line interface for the Article-Ingest listing harvester.

use anyhow::Context;
use article_ingest::config::{load_config_with_hash, Config};
use article_ingest::crawler::{run_full_crawl, run_incremental_crawl};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Article-Ingest: a paginated news listing harvester
///
/// Article-Ingest walks a publisher's article listing page by page and stores
/// every article exactly once. A full crawl backfills the whole listing; an
/// incremental crawl picks up new articles and stops once it catches up.
#[derive(Parser, Debug)]
#[command(name = "article-ingest")]
#[command(version = "1.0.0")]
#[command(about = "A paginated news listing harvester", long_about = None)]
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

    /// First page of a full crawl
    #[arg(long, value_name = "N", default_value_t = 1, allow_negative_numbers = true)]
    start_page: i64,

    /// Crawl only new articles, stopping at the first page with none
    #[arg(long, conflicts_with = "start_page")]
    incremental: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "incremental"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "incremental"])]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config, cli.start_page, cli.incremental);
        return Ok(());
    }
    if cli.stats {
        return handle_stats(&config);
    }

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let success = if cli.incremental {
        let response = run_incremental_crawl(&config, &config_hash, &cancel).await;
        print_response(&response)?;
        response.success
    } else {
        let response = run_full_crawl(&config, &config_hash, cli.start_page, &cancel).await;
        print_response(&response)?;
        response.success
    };

    if !success {
        std::process::exit(1);
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
            0 => EnvFilter::new("article_ingest=info,warn"),
            1 => EnvFilter::new("article_ingest=debug,info"),
            2 => EnvFilter::new("article_ingest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Logs go to stderr so the JSON response on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Cancels the session on the first Ctrl-C
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::warn!("Interrupt received, finishing in-flight pages");
                cancel.cancel();
            }
            Err(e) => tracing::error!("Failed to listen for Ctrl-C: {}", e),
        }
    });
}

fn print_response<T: Serialize>(response: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(response).context("Failed to encode response")?;
    println!("{}", json);
    Ok(())
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config, start_page: i64, incremental: bool) {
    println!("=== Article-Ingest Dry Run ===\n");

    println!("Source:");
    println!("  Publisher: {}", config.source.publisher.display_name());
    println!("  Base URL: {}", config.source.base_url);
    println!("  Listing path: {}", config.source.listing_path);
    println!(
        "  Timeouts: connect {}ms, request {}ms",
        config.source.connect_timeout_ms, config.source.request_timeout_ms
    );

    println!("\nCrawler Configuration:");
    println!("  Batch size: {}", config.crawler.batch_size);
    println!(
        "  Max concurrent fetches: {}",
        config.crawler.max_concurrent_fetches
    );
    println!("  Pause between batches: {}s", config.crawler.macro_pause_secs);
    println!(
        "  Incremental pause: {}ms every {} requests",
        config.crawler.micro_pause_ms, config.crawler.micro_pause_every
    );

    println!("\nRetry:");
    println!("  Max retries: {}", config.retry.max_retries);
    println!(
        "  Backoff: {}ms x{} up to {}ms (jitter {})",
        config.retry.base_delay_ms,
        config.retry.multiplier,
        config.retry.max_delay_ms,
        config.retry.jitter_factor
    );

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\n✓ Configuration is valid");
    if incremental {
        println!("✓ Would run an incremental crawl from page 1");
    } else {
        println!("✓ Would run a full crawl from page {}", start_page);
    }
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use article_ingest::output::{load_statistics, print_statistics};
    use article_ingest::storage::SqliteArticleStore;
    use std::path::Path;

    println!("Database: {}\n", config.output.database_path);

    let store = SqliteArticleStore::new(Path::new(&config.output.database_path))
        .context("Failed to open database")?;
    let stats = load_statistics(&store).context("Failed to load statistics")?;
    print_statistics(&stats);

    Ok(())
}
