//! Crawl orchestration - the two crawl sessions
//!
//! This module composes a [`PageFetcher`], a [`DedupStore`], a [`RetryPolicy`]
//! and a [`RateGate`] into:
//! - A full crawl: every page from a start page to the last, in sequential
//!   batches with bounded concurrency inside each batch
//! - An incremental crawl: pages in order from 1, stopping at the first page
//!   that holds nothing new
//!
//! Pages that cannot be fetched after retries count as zero articles and are
//! reported as degraded. Only a failed probe or an invalid start page ends a
//! session with an error.

use crate::article::Article;
use crate::crawler::batch::PageBatch;
use crate::crawler::rate_gate::{PauseOutcome, RateGate, RequestCounter};
use crate::crawler::retry::{RetryError, RetryPolicy};
use crate::crawler::CrawlMode;
use crate::source::PageFetcher;
use crate::state::{SessionState, SessionTracker};
use crate::storage::DedupStore;
use crate::IngestError;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Default pages per full-crawl batch
pub const DEFAULT_BATCH_SIZE: u32 = 500;

/// Default simultaneous fetches within a batch
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Summary of one crawl session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    pub mode: CrawlMode,

    /// Last listing page reported by the probe (0 if the probe never finished)
    pub total_pages: u32,

    /// Articles newly written to the store
    pub total_saved: u64,

    /// Page fetches attempted, retries not included
    pub pages_attempted: u32,

    /// Pages that yielded nothing because every attempt failed, ascending
    pub degraded_pages: Vec<u32>,

    /// Articles that could not be written
    pub persist_failures: u64,

    /// True if the session stopped because of cancellation
    pub cancelled: bool,

    /// True if an incremental crawl stopped at an all-duplicate page
    pub stopped_early: bool,

    pub final_state: SessionState,
}

impl CrawlReport {
    fn new(mode: CrawlMode) -> Self {
        Self {
            mode,
            total_pages: 0,
            total_saved: 0,
            pages_attempted: 0,
            degraded_pages: Vec::new(),
            persist_failures: 0,
            cancelled: false,
            stopped_early: false,
            final_state: SessionState::Idle,
        }
    }
}

/// Result of crawling one page of a full crawl
#[derive(Debug)]
enum PageOutcome {
    Saved {
        page: u32,
        fetched: usize,
        saved: u64,
        failures: u64,
    },
    Degraded {
        page: u32,
    },
    Cancelled {
        page: u32,
    },
}

/// Per-batch reduction of page outcomes
#[derive(Debug, Default)]
struct BatchTally {
    attempted: u32,
    saved: u64,
    failures: u64,
    degraded: Vec<u32>,
    cancelled: bool,
}

impl BatchTally {
    fn record(mut self, outcome: PageOutcome) -> Self {
        self.attempted += 1;
        match outcome {
            PageOutcome::Saved {
                page,
                fetched,
                saved,
                failures,
            } => {
                tracing::info!("Page {} done: fetched={}, saved={}", page, fetched, saved);
                self.saved += saved;
                self.failures += failures;
            }
            PageOutcome::Degraded { page } => self.degraded.push(page),
            PageOutcome::Cancelled { page } => {
                tracing::debug!("Page {} abandoned by cancellation", page);
                self.cancelled = true;
            }
        }
        self
    }
}

/// Runs crawl sessions against one source and one store
///
/// The orchestrator keeps no state between sessions; each call to
/// [`run_full`](Self::run_full) or [`run_incremental`](Self::run_incremental)
/// starts from scratch.
pub struct CrawlOrchestrator {
    fetcher: Arc<dyn PageFetcher>,
    store: Arc<dyn DedupStore>,
    retry: RetryPolicy,
    gate: RateGate,
    batch_size: u32,
    concurrency: usize,
}

impl CrawlOrchestrator {
    /// Creates an orchestrator with no retries and no pauses
    pub fn new(fetcher: Arc<dyn PageFetcher>, store: Arc<dyn DedupStore>) -> Self {
        Self {
            fetcher,
            store,
            retry: RetryPolicy::no_retry(),
            gate: RateGate::disabled(),
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_rate_gate(mut self, gate: RateGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Crawls every page from `start_page` to the last listing page
    ///
    /// # Arguments
    ///
    /// * `start_page` - First page to crawl, numbered from 1
    /// * `cancel` - Stops scheduling new pages when triggered; pages already
    ///   being fetched are finished and their articles persisted
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - The session ran, possibly with degraded pages
    /// * `Err(IngestError::InvalidStartPage)` - `start_page` is below 1
    /// * `Err(IngestError::Probe)` - The last page could not be determined
    pub async fn run_full(
        &self,
        start_page: i64,
        cancel: &CancellationToken,
    ) -> crate::Result<CrawlReport> {
        if start_page < 1 {
            return Err(IngestError::InvalidStartPage(start_page));
        }
        // Past any real listing, so it takes the nothing-to-crawl path
        let start_page = u32::try_from(start_page).unwrap_or(u32::MAX);

        let started = Instant::now();
        let mut tracker = SessionTracker::new();
        let mut report = CrawlReport::new(CrawlMode::Full);
        tracing::info!("Full crawl starting at page {}", start_page);

        let Some(total_pages) = self.probe(&mut tracker, cancel).await? else {
            report.cancelled = true;
            report.final_state = tracker.state();
            return Ok(report);
        };
        report.total_pages = total_pages;

        if start_page > total_pages {
            tracing::warn!(
                "Start page {} is past the last page {}, nothing to crawl",
                start_page,
                total_pages
            );
            tracker.transition(SessionState::Completed)?;
            report.final_state = tracker.state();
            return Ok(report);
        }

        tracker.transition(SessionState::Crawling)?;
        let batches = PageBatch::partition(start_page, total_pages, self.batch_size);
        tracing::info!(
            "Crawling pages {}..={} in {} batches",
            start_page,
            total_pages,
            batches.len()
        );

        for batch in &batches {
            if batch.index > 0
                && self.gate.macro_pause(batch.index, cancel).await == PauseOutcome::Cancelled
            {
                report.cancelled = true;
                break;
            }
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let tally = self.crawl_batch(batch, cancel).await;
            tracing::info!(
                "Batch {} (pages {}..={}) done: saved={}, degraded={}",
                batch.index + 1,
                batch.first,
                batch.last,
                tally.saved,
                tally.degraded.len()
            );

            report.pages_attempted += tally.attempted;
            report.total_saved += tally.saved;
            report.persist_failures += tally.failures;
            report.degraded_pages.extend(tally.degraded);

            if tally.cancelled || cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
        }

        self.finish(&mut tracker, &mut report)?;
        tracing::info!(
            "Full crawl finished in {:?}: saved={}, pages={}, degraded={}",
            started.elapsed(),
            report.total_saved,
            report.pages_attempted,
            report.degraded_pages.len()
        );
        Ok(report)
    }

    /// Crawls pages in order from 1 until a page holds no new articles
    ///
    /// A page whose fetch fails after retries is skipped and the walk goes on.
    /// A short pause is inserted after every N-th fetch attempt.
    pub async fn run_incremental(&self, cancel: &CancellationToken) -> crate::Result<CrawlReport> {
        let started = Instant::now();
        let mut tracker = SessionTracker::new();
        let mut report = CrawlReport::new(CrawlMode::Incremental);
        tracing::info!("Incremental crawl starting");

        let Some(total_pages) = self.probe(&mut tracker, cancel).await? else {
            report.cancelled = true;
            report.final_state = tracker.state();
            return Ok(report);
        };
        report.total_pages = total_pages;
        tracker.transition(SessionState::Crawling)?;

        let mut requests = RequestCounter::new();
        for page in 1..=total_pages {
            if self.gate.micro_pause(&requests, cancel).await
                == PauseOutcome::Cancelled
                || cancel.is_cancelled()
            {
                report.cancelled = true;
                break;
            }

            report.pages_attempted = requests.record();
            let articles = match self.fetch_with_retry(page, cancel).await {
                Ok(articles) => articles,
                Err(RetryError::Cancelled) => {
                    report.cancelled = true;
                    break;
                }
                Err(e) => {
                    tracing::error!("Skipping page {}: {}", page, e);
                    report.degraded_pages.push(page);
                    continue;
                }
            };

            let fetched = articles.len();
            let fresh = match self.store.filter_new(articles) {
                Ok(fresh) => fresh,
                Err(e) => {
                    tracing::error!("Skipping page {}: duplicate check failed: {}", page, e);
                    report.degraded_pages.push(page);
                    continue;
                }
            };

            if fresh.is_empty() {
                tracing::info!("Page {} has no new articles, stopping", page);
                report.stopped_early = true;
                break;
            }

            let new_count = fresh.len();
            let (saved, failures) = self.persist_all(page, &fresh);
            report.total_saved += saved;
            report.persist_failures += failures;
            tracing::info!(
                "Page {} done: fetched={}, new={}, saved={}",
                page,
                fetched,
                new_count,
                saved
            );
        }

        self.finish(&mut tracker, &mut report)?;
        tracing::info!(
            "Incremental crawl finished in {:?}: saved={}, pages={}",
            started.elapsed(),
            report.total_saved,
            report.pages_attempted
        );
        Ok(report)
    }

    /// Determines the last page, moving the session to `Probing` first
    ///
    /// Returns `Ok(None)` if the session was cancelled during the probe.
    async fn probe(
        &self,
        tracker: &mut SessionTracker,
        cancel: &CancellationToken,
    ) -> crate::Result<Option<u32>> {
        tracker.transition(SessionState::Probing)?;

        if cancel.is_cancelled() {
            tracker.transition(SessionState::Cancelled)?;
            return Ok(None);
        }

        let fetcher = &self.fetcher;
        match self
            .retry
            .run("page-count probe", cancel, || fetcher.probe_total_pages())
            .await
        {
            Ok(total_pages) => {
                tracing::info!("Listing has {} pages", total_pages);
                Ok(Some(total_pages))
            }
            Err(RetryError::Cancelled) => {
                tracker.transition(SessionState::Cancelled)?;
                Ok(None)
            }
            Err(e) => {
                tracing::error!("Page-count probe failed: {}", e);
                tracker.transition(SessionState::Failed)?;
                Err(IngestError::Probe(e))
            }
        }
    }

    async fn crawl_batch(&self, batch: &PageBatch, cancel: &CancellationToken) -> BatchTally {
        stream::iter(batch.pages())
            .take_until(cancel.cancelled())
            .map(|page| self.crawl_page(page, cancel))
            .buffer_unordered(self.concurrency)
            .fold(BatchTally::default(), |tally, outcome| async move {
                tally.record(outcome)
            })
            .await
    }

    async fn crawl_page(&self, page: u32, cancel: &CancellationToken) -> PageOutcome {
        match self.fetch_with_retry(page, cancel).await {
            Ok(articles) => {
                let (saved, failures) = self.persist_all(page, &articles);
                PageOutcome::Saved {
                    page,
                    fetched: articles.len(),
                    saved,
                    failures,
                }
            }
            Err(RetryError::Cancelled) => PageOutcome::Cancelled { page },
            Err(e) => {
                tracing::error!("Page {} yielded nothing: {}", page, e);
                PageOutcome::Degraded { page }
            }
        }
    }

    async fn fetch_with_retry(
        &self,
        page: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<Article>, RetryError> {
        let label = format!("page {}", page);
        let fetcher = &self.fetcher;
        self.retry
            .run(&label, cancel, || fetcher.fetch_page(page))
            .await
    }

    /// Persists each article on its own, returning (inserted, failed)
    fn persist_all(&self, page: u32, articles: &[Article]) -> (u64, u64) {
        let mut saved = 0;
        let mut failures = 0;

        for article in articles {
            match self.store.persist(article) {
                Ok(true) => saved += 1,
                Ok(false) => {
                    tracing::trace!("Already stored: {}", article.identity());
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to persist {} from page {}: {}",
                        article.identity(),
                        page,
                        e
                    );
                    failures += 1;
                }
            }
        }

        (saved, failures)
    }

    fn finish(&self, tracker: &mut SessionTracker, report: &mut CrawlReport) -> crate::Result<()> {
        report.degraded_pages.sort_unstable();

        let state = if report.cancelled {
            SessionState::Cancelled
        } else if report.degraded_pages.is_empty() {
            SessionState::Completed
        } else {
            tracing::warn!(
                "{} pages degraded: {:?}",
                report.degraded_pages.len(),
                report.degraded_pages
            );
            SessionState::CompletedWithDegradedPages
        };

        tracker.transition(state)?;
        report.final_state = tracker.state();
        Ok(())
    }
}
