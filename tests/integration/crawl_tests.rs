//! Integration tests for the crawl orchestrator
//!
//! These tests drive both crawl sessions against a scripted listing and an
//! in-memory store, with a recording sleeper in place of real pauses.

use crate::common::{article, articles, network_error, RecordingSleeper, ScriptedListing};
use article_ingest::article::Article;
use article_ingest::crawler::{CrawlOrchestrator, RateGate, RetryPolicy};
use article_ingest::output::FullCrawlResponse;
use article_ingest::source::FetchError;
use article_ingest::storage::{DedupStore, SqliteArticleStore, StorageError, StorageResult};
use article_ingest::{IdentityKey, IngestError, SessionState};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const MACRO_PAUSE: Duration = Duration::from_secs(600);
const MICRO_PAUSE: Duration = Duration::from_secs(2);

struct Harness {
    listing: Arc<ScriptedListing>,
    store: Arc<SqliteArticleStore>,
    sleeper: Arc<RecordingSleeper>,
}

impl Harness {
    fn new(listing: ScriptedListing) -> Self {
        Self {
            listing: Arc::new(listing),
            store: Arc::new(SqliteArticleStore::new_in_memory().unwrap()),
            sleeper: Arc::new(RecordingSleeper::default()),
        }
    }

    fn orchestrator(&self) -> CrawlOrchestrator {
        self.orchestrator_with_store(self.store.clone())
    }

    fn orchestrator_with_store(&self, store: Arc<dyn DedupStore>) -> CrawlOrchestrator {
        CrawlOrchestrator::new(self.listing.clone(), store)
            .with_retry_policy(RetryPolicy::new(
                3,
                Duration::from_secs(2),
                Duration::from_secs(10),
                2.0,
                self.sleeper.clone(),
            ))
            .with_rate_gate(RateGate::new(
                MACRO_PAUSE,
                MICRO_PAUSE,
                50,
                self.sleeper.clone(),
            ))
    }
}

#[tokio::test]
async fn test_full_crawl_saves_every_page_once() {
    let harness = Harness::new(ScriptedListing::uniform(3, 5));

    let report = harness
        .orchestrator()
        .run_full(1, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.total_saved, 15);
    assert_eq!(report.total_pages, 3);
    for page in 1..=3 {
        assert_eq!(harness.listing.fetch_count(page), 1, "page {}", page);
    }
    assert_eq!(harness.store.count_articles().unwrap(), 15);
    assert_eq!(report.final_state, SessionState::Completed);
    assert!(report.degraded_pages.is_empty());
}

#[tokio::test]
async fn test_incremental_stops_on_empty_page() {
    let listing = ScriptedListing::new(2)
        .page(1, vec![Ok(articles(1, 5))])
        .page(2, vec![Ok(Vec::new())]);
    let harness = Harness::new(listing);

    let report = harness
        .orchestrator()
        .run_incremental(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.total_saved, 5);
    assert_eq!(harness.listing.fetch_count(2), 1);
    assert!(report.stopped_early);
    assert_eq!(report.final_state, SessionState::Completed);
}

#[tokio::test]
async fn test_start_page_past_last_page_fetches_nothing() {
    let harness = Harness::new(ScriptedListing::uniform(3, 5));

    let report = harness
        .orchestrator()
        .run_full(10, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.total_saved, 0);
    assert_eq!(harness.listing.total_fetches(), 0);
    assert_eq!(report.final_state, SessionState::Completed);
}

#[tokio::test]
async fn test_start_page_beyond_u32_is_past_last_page() {
    let harness = Harness::new(ScriptedListing::uniform(3, 5));

    let report = harness
        .orchestrator()
        .run_full(5_000_000_000, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.total_saved, 0);
    assert_eq!(report.total_pages, 3);
    assert_eq!(harness.listing.total_fetches(), 0);
    assert_eq!(report.final_state, SessionState::Completed);
}

#[tokio::test]
async fn test_exhausted_page_degrades_without_failing() {
    let listing = ScriptedListing::uniform(3, 5).page(2, vec![Err(network_error(2))]);
    let harness = Harness::new(listing);

    let report = harness
        .orchestrator()
        .run_full(1, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.total_saved, 10);
    assert_eq!(harness.listing.fetch_count(1), 1);
    assert_eq!(harness.listing.fetch_count(2), 4);
    assert_eq!(harness.listing.fetch_count(3), 1);
    assert_eq!(report.degraded_pages, vec![2]);
    assert_eq!(report.final_state, SessionState::CompletedWithDegradedPages);

    let response = FullCrawlResponse::from_report(1, &report);
    assert!(response.success);
    assert_eq!(response.total_saved, Some(10));
    assert_eq!(response.degraded_pages, Some(vec![2]));
}

#[tokio::test]
async fn test_second_full_crawl_saves_nothing() {
    let harness = Harness::new(ScriptedListing::uniform(3, 5));
    let orchestrator = harness.orchestrator();
    let cancel = CancellationToken::new();

    let first = orchestrator.run_full(1, &cancel).await.unwrap();
    let second = orchestrator.run_full(1, &cancel).await.unwrap();

    assert_eq!(first.total_saved, 15);
    assert_eq!(second.total_saved, 0);
    assert_eq!(harness.store.count_articles().unwrap(), 15);
}

#[tokio::test]
async fn test_incremental_never_fetches_past_duplicate_page() {
    let listing = ScriptedListing::new(10)
        .page(1, vec![Ok(articles(1, 5))])
        .page(2, vec![Ok(articles(2, 3))])
        // Page 3 repeats what page 1 already delivered
        .page(3, vec![Ok(articles(1, 5))])
        .page(4, vec![Ok(articles(4, 5))]);
    let harness = Harness::new(listing);

    let report = harness
        .orchestrator()
        .run_incremental(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.total_saved, 8);
    assert_eq!(report.pages_attempted, 3);
    assert_eq!(harness.listing.fetch_count(3), 1);
    assert_eq!(harness.listing.fetch_count(4), 0);
    assert!(report.stopped_early);
}

#[tokio::test]
async fn test_incremental_saves_only_unseen_articles() {
    let mut page_one = articles(1, 2);
    page_one.push(article(9, 9));
    let harness = Harness::new(ScriptedListing::new(1).page(1, vec![Ok(page_one)]));
    harness.store.persist(&article(9, 9)).unwrap();

    let report = harness
        .orchestrator()
        .run_incremental(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.total_saved, 2);
    assert_eq!(harness.store.count_articles().unwrap(), 3);
}

#[tokio::test]
async fn test_page_recovers_after_two_failures() {
    let listing = ScriptedListing::uniform(3, 5).page(
        2,
        vec![
            Err(network_error(2)),
            Err(network_error(2)),
            Ok(articles(2, 5)),
        ],
    );
    let harness = Harness::new(listing);

    let report = harness
        .orchestrator()
        .run_full(1, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.total_saved, 15);
    assert_eq!(harness.listing.fetch_count(2), 3);
    assert!(report.degraded_pages.is_empty());
    assert_eq!(
        harness.sleeper.sleeps(),
        vec![Duration::from_secs(2), Duration::from_secs(4)]
    );
}

#[tokio::test]
async fn test_permanent_failure_is_not_retried() {
    let listing = ScriptedListing::uniform(2, 5).page(
        2,
        vec![Err(FetchError::Status {
            url: "https://www.blockmedia.co.kr/all-posts/page/2".to_string(),
            status: 404,
        })],
    );
    let harness = Harness::new(listing);

    let report = harness
        .orchestrator()
        .run_full(1, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(harness.listing.fetch_count(2), 1);
    assert_eq!(report.degraded_pages, vec![2]);
    assert!(harness.sleeper.sleeps().is_empty());
}

#[tokio::test]
async fn test_full_crawl_concurrency_is_bounded() {
    let harness = Harness::new(ScriptedListing::uniform(60, 1));

    let report = harness
        .orchestrator()
        .with_concurrency(10)
        .run_full(1, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.total_saved, 60);
    assert!(harness.listing.max_in_flight() <= 10);
    assert!(harness.listing.max_in_flight() > 1);
}

#[tokio::test]
async fn test_incremental_fetches_one_page_at_a_time() {
    let harness = Harness::new(ScriptedListing::uniform(20, 1));

    harness
        .orchestrator()
        .run_incremental(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(harness.listing.max_in_flight(), 1);
}

#[tokio::test]
async fn test_macro_pause_between_batches_only() {
    let harness = Harness::new(ScriptedListing::uniform(5, 1));

    let report = harness
        .orchestrator()
        .with_batch_size(2)
        .run_full(1, &CancellationToken::new())
        .await
        .unwrap();

    // Batches [1,2] [3,4] [5]
    assert_eq!(report.total_saved, 5);
    assert_eq!(harness.sleeper.sleeps(), vec![MACRO_PAUSE, MACRO_PAUSE]);
}

#[tokio::test]
async fn test_single_batch_has_no_macro_pause() {
    let harness = Harness::new(ScriptedListing::uniform(3, 1));

    harness
        .orchestrator()
        .run_full(1, &CancellationToken::new())
        .await
        .unwrap();

    assert!(harness.sleeper.sleeps().is_empty());
}

#[tokio::test]
async fn test_micro_pause_every_fifty_attempts() {
    // Failed attempts count towards the interval too
    let listing = ScriptedListing::uniform(120, 1).page(
        7,
        vec![Err(FetchError::Malformed {
            url: "https://www.blockmedia.co.kr/all-posts/page/7".to_string(),
            message: "truncated".to_string(),
        })],
    );
    let harness = Harness::new(listing);

    let report = harness
        .orchestrator()
        .run_incremental(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.pages_attempted, 120);
    assert_eq!(report.total_saved, 119);
    assert_eq!(report.degraded_pages, vec![7]);
    assert_eq!(harness.sleeper.count_of(MICRO_PAUSE), 2);
}

#[tokio::test]
async fn test_invalid_start_page_is_rejected_before_probe() {
    let harness = Harness::new(ScriptedListing::uniform(3, 5));
    let orchestrator = harness.orchestrator();

    for start_page in [0, -1] {
        let result = orchestrator
            .run_full(start_page, &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(IngestError::InvalidStartPage(p)) if p == start_page));
    }
    assert_eq!(harness.listing.probe_count(), 0);
    assert_eq!(harness.listing.total_fetches(), 0);
}

#[tokio::test]
async fn test_probe_failure_fails_the_session() {
    let listing = ScriptedListing::uniform(3, 5).probe_script(vec![Err(network_error(1))]);
    let harness = Harness::new(listing);

    let result = harness
        .orchestrator()
        .run_full(1, &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(IngestError::Probe(_))));
    assert_eq!(harness.listing.probe_count(), 4);
    assert_eq!(harness.listing.total_fetches(), 0);
}

#[tokio::test]
async fn test_probe_is_retried() {
    let listing = ScriptedListing::uniform(2, 5).probe_script(vec![Err(network_error(1)), Ok(2)]);
    let harness = Harness::new(listing);

    let report = harness
        .orchestrator()
        .run_incremental(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(harness.listing.probe_count(), 2);
    assert_eq!(report.total_saved, 10);
}

#[tokio::test]
async fn test_cancel_keeps_in_flight_page_and_stops_scheduling() {
    let cancel = CancellationToken::new();
    let listing = ScriptedListing::uniform(6, 5).cancel_during(3, cancel.clone());
    let harness = Harness::new(listing);

    let report = harness
        .orchestrator()
        .with_batch_size(2)
        .with_concurrency(1)
        .run_full(1, &cancel)
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.total_saved, 15);
    assert_eq!(harness.listing.fetch_count(3), 1);
    assert_eq!(harness.listing.fetch_count(4), 0);
    assert_eq!(report.final_state, SessionState::Cancelled);
}

#[tokio::test]
async fn test_cancel_stops_incremental_walk() {
    let cancel = CancellationToken::new();
    let listing = ScriptedListing::uniform(5, 2).cancel_during(2, cancel.clone());
    let harness = Harness::new(listing);

    let report = harness
        .orchestrator()
        .run_incremental(&cancel)
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.total_saved, 4);
    assert_eq!(harness.listing.fetch_count(3), 0);
    assert_eq!(report.final_state, SessionState::Cancelled);
}

/// Store that refuses to write one article and, optionally, to look up another
struct RefusingStore {
    inner: SqliteArticleStore,
    refused: IdentityKey,
    unreadable: Option<IdentityKey>,
}

impl RefusingStore {
    fn new(refused: IdentityKey) -> Self {
        Self {
            inner: SqliteArticleStore::new_in_memory().unwrap(),
            refused,
            unreadable: None,
        }
    }

    fn with_unreadable(mut self, key: IdentityKey) -> Self {
        self.unreadable = Some(key);
        self
    }
}

impl DedupStore for RefusingStore {
    fn exists(&self, key: &IdentityKey) -> StorageResult<bool> {
        if self.unreadable.as_ref() == Some(key) {
            return Err(StorageError::LockPoisoned);
        }
        self.inner.exists(key)
    }

    fn persist(&self, article: &Article) -> StorageResult<bool> {
        if article.identity() == self.refused {
            return Err(StorageError::Corrupt("disk full".to_string()));
        }
        self.inner.persist(article)
    }
}

#[tokio::test]
async fn test_persist_failure_skips_only_that_article() {
    let harness = Harness::new(ScriptedListing::uniform(2, 5));
    let store = Arc::new(RefusingStore::new(article(1, 2).identity()));

    let report = harness
        .orchestrator_with_store(store.clone())
        .run_full(1, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.total_saved, 9);
    assert_eq!(report.persist_failures, 1);
    assert!(report.degraded_pages.is_empty());
    assert!(store.exists(&article(1, 3).identity()).unwrap());
    assert!(!store.exists(&article(1, 2).identity()).unwrap());
}

#[tokio::test]
async fn test_incremental_store_errors_degrade_or_skip_and_walk_on() {
    let harness = Harness::new(ScriptedListing::uniform(4, 3));
    let store = Arc::new(
        RefusingStore::new(article(1, 1).identity()).with_unreadable(article(2, 0).identity()),
    );

    let report = harness
        .orchestrator_with_store(store.clone())
        .run_incremental(&CancellationToken::new())
        .await
        .unwrap();

    // Page 1 loses one write, page 2 cannot be checked for duplicates
    assert_eq!(report.persist_failures, 1);
    assert_eq!(report.degraded_pages, vec![2]);
    assert_eq!(report.total_saved, 2 + 3 + 3);
    assert!(!report.stopped_early);
    assert_eq!(harness.listing.fetch_count(3), 1);
    assert_eq!(harness.listing.fetch_count(4), 1);
    assert_eq!(report.final_state, SessionState::CompletedWithDegradedPages);
    assert!(!store.exists(&article(1, 1).identity()).unwrap());
    assert!(!store.exists(&article(2, 1).identity()).unwrap());
}
