//! Crawler module for paginated listing ingestion
//!
//! This module contains the core crawling logic, including:
//! - Retry with exponential backoff around every fetch
//! - Macro and micro pacing between requests
//! - Batch partitioning of the page range
//! - The full and incremental crawl sessions

mod batch;
mod orchestrator;
mod rate_gate;
mod retry;

pub use batch::PageBatch;
pub use orchestrator::{CrawlOrchestrator, CrawlReport, DEFAULT_BATCH_SIZE, DEFAULT_CONCURRENCY};
pub use rate_gate::{PauseOutcome, RateGate, RequestCounter, Sleeper, TokioSleeper};
pub use retry::{RetryError, RetryPolicy, RetryState};

use crate::config::Config;
use crate::output::{FullCrawlResponse, IncrementalCrawlResponse};
use crate::source::HttpListingFetcher;
use crate::state::SessionState;
use crate::storage::SqliteArticleStore;
use crate::IngestError;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Which crawl session a run belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlMode {
    Full,
    Incremental,
}

impl CrawlMode {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            CrawlMode::Full => "full",
            CrawlMode::Incremental => "incremental",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "full" => Some(CrawlMode::Full),
            "incremental" => Some(CrawlMode::Incremental),
            _ => None,
        }
    }
}

impl std::fmt::Display for CrawlMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// Runs a full crawl and wraps the outcome in a response envelope
///
/// This is the main entry point for a backfill. It will:
/// 1. Validate the start page
/// 2. Open the article store and record a new run
/// 3. Probe the listing and crawl every page from `start_page` on
/// 4. Close the run record with the final state
///
/// Errors never escape; they become a failure envelope.
pub async fn run_full_crawl(
    config: &Config,
    config_hash: &str,
    start_page: i64,
    cancel: &CancellationToken,
) -> FullCrawlResponse {
    match full_crawl_session(config, config_hash, start_page, cancel).await {
        Ok(report) => FullCrawlResponse::from_report(start_page, &report),
        Err(e) => {
            tracing::error!("Full crawl failed (start page {}): {}", start_page, e);
            FullCrawlResponse::failure(start_page, &e)
        }
    }
}

/// Runs an incremental crawl and wraps the outcome in a response envelope
pub async fn run_incremental_crawl(
    config: &Config,
    config_hash: &str,
    cancel: &CancellationToken,
) -> IncrementalCrawlResponse {
    match incremental_crawl_session(config, config_hash, cancel).await {
        Ok(report) => IncrementalCrawlResponse::from_report(&report),
        Err(e) => {
            tracing::error!("Incremental crawl failed: {}", e);
            IncrementalCrawlResponse::failure(&e)
        }
    }
}

async fn full_crawl_session(
    config: &Config,
    config_hash: &str,
    start_page: i64,
    cancel: &CancellationToken,
) -> crate::Result<CrawlReport> {
    if start_page < 1 {
        return Err(IngestError::InvalidStartPage(start_page));
    }
    let first_page = u32::try_from(start_page).unwrap_or(u32::MAX);

    let store = open_store(config)?;
    let orchestrator = build_orchestrator(config, store.clone())?;
    let run_id = store.create_run(CrawlMode::Full, Some(first_page), config_hash)?;
    tracing::info!("Started run {} (full, start page {})", run_id, first_page);

    let result = orchestrator.run_full(start_page, cancel).await;
    close_run(&store, run_id, &result);
    result
}

async fn incremental_crawl_session(
    config: &Config,
    config_hash: &str,
    cancel: &CancellationToken,
) -> crate::Result<CrawlReport> {
    let store = open_store(config)?;
    let orchestrator = build_orchestrator(config, store.clone())?;
    let run_id = store.create_run(CrawlMode::Incremental, None, config_hash)?;
    tracing::info!("Started run {} (incremental)", run_id);

    let result = orchestrator.run_incremental(cancel).await;
    close_run(&store, run_id, &result);
    result
}

fn open_store(config: &Config) -> crate::Result<Arc<SqliteArticleStore>> {
    let path = Path::new(&config.output.database_path);
    tracing::debug!("Opening article store at {}", path.display());
    Ok(Arc::new(SqliteArticleStore::new(path)?))
}

/// Wires the live HTTP source, pacing and retry settings into an orchestrator
pub fn build_orchestrator(
    config: &Config,
    store: Arc<SqliteArticleStore>,
) -> crate::Result<CrawlOrchestrator> {
    let fetcher = HttpListingFetcher::new(&config.source, &config.user_agent)?;
    let sleeper: Arc<dyn Sleeper> = Arc::new(TokioSleeper);

    Ok(CrawlOrchestrator::new(Arc::new(fetcher), store)
        .with_retry_policy(RetryPolicy::from_config(&config.retry, sleeper.clone()))
        .with_rate_gate(RateGate::from_config(&config.crawler, sleeper))
        .with_batch_size(config.crawler.batch_size)
        .with_concurrency(config.crawler.max_concurrent_fetches as usize))
}

/// Records the session outcome; the crawl result stands even if this fails
fn close_run(store: &SqliteArticleStore, run_id: i64, result: &crate::Result<CrawlReport>) {
    let closed = match result {
        Ok(report) if report.final_state.is_terminal() => store.finish_run(
            run_id,
            report.final_state,
            report.total_saved,
            &report.degraded_pages,
        ),
        Ok(report) => {
            tracing::warn!(
                "Run {} ended in non-terminal state {}, recording it as failed",
                run_id,
                report.final_state
            );
            store.finish_run(
                run_id,
                SessionState::Failed,
                report.total_saved,
                &report.degraded_pages,
            )
        }
        Err(_) => store.finish_run(run_id, SessionState::Failed, 0, &[]),
    };

    if let Err(e) = closed {
        tracing::warn!("Failed to close run {}: {}", run_id, e);
    }
}
