//! Shared test doubles for the integration tests

use article_ingest::article::{Article, PublisherType};
use article_ingest::crawler::Sleeper;
use article_ingest::source::{FetchError, PageFetcher};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Builds the `index`-th article of `page`, unique across pages
pub fn article(page: u32, index: u32) -> Article {
    let id = (page * 1_000 + index) as i64;
    Article::new(
        PublisherType::BlockMedia,
        format!("https://www.blockmedia.co.kr/archives/{}", id),
        format!("Headline {}", id),
    )
    .with_external_id(id)
}

/// `count` fresh articles for `page`
pub fn articles(page: u32, count: u32) -> Vec<Article> {
    (0..count).map(|i| article(page, i)).collect()
}

pub fn network_error(page: u32) -> FetchError {
    FetchError::Network {
        url: format!("https://www.blockmedia.co.kr/all-posts/page/{}", page),
        message: "Connection refused".to_string(),
    }
}

/// A listing whose answers are scripted per page
///
/// The n-th fetch of a page returns the n-th scripted result; once the script
/// runs out the last entry repeats. Unscripted pages are empty.
pub struct ScriptedListing {
    probe: Mutex<Vec<Result<u32, FetchError>>>,
    probe_calls: AtomicU32,
    pages: HashMap<u32, Vec<Result<Vec<Article>, FetchError>>>,
    calls: Mutex<HashMap<u32, u32>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    cancel_on: Option<(u32, CancellationToken)>,
}

impl ScriptedListing {
    pub fn new(total_pages: u32) -> Self {
        Self {
            probe: Mutex::new(vec![Ok(total_pages)]),
            probe_calls: AtomicU32::new(0),
            pages: HashMap::new(),
            calls: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            cancel_on: None,
        }
    }

    /// Every page from 1 to `total_pages` yields `per_page` new articles
    pub fn uniform(total_pages: u32, per_page: u32) -> Self {
        let mut listing = Self::new(total_pages);
        for page in 1..=total_pages {
            listing = listing.page(page, vec![Ok(articles(page, per_page))]);
        }
        listing
    }

    pub fn page(mut self, page: u32, script: Vec<Result<Vec<Article>, FetchError>>) -> Self {
        self.pages.insert(page, script);
        self
    }

    pub fn probe_script(self, script: Vec<Result<u32, FetchError>>) -> Self {
        *self.probe.lock().unwrap() = script;
        self
    }

    /// Triggers `token` while `page` is being fetched
    pub fn cancel_during(mut self, page: u32, token: CancellationToken) -> Self {
        self.cancel_on = Some((page, token));
        self
    }

    pub fn fetch_count(&self, page: u32) -> u32 {
        self.calls.lock().unwrap().get(&page).copied().unwrap_or(0)
    }

    pub fn total_fetches(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn probe_count(&self) -> u32 {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for ScriptedListing {
    async fn probe_total_pages(&self) -> Result<u32, FetchError> {
        let call = self.probe_calls.fetch_add(1, Ordering::SeqCst) as usize;
        let script = self.probe.lock().unwrap();
        script[call.min(script.len() - 1)].clone()
    }

    async fn fetch_page(&self, page: u32) -> Result<Vec<Article>, FetchError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(page).or_insert(0);
            *count += 1;
            (*count - 1) as usize
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some((cancel_page, token)) = &self.cancel_on {
            if *cancel_page == page {
                token.cancel();
            }
        }

        // Give sibling fetches a chance to start
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.pages.get(&page) {
            Some(script) => script[call.min(script.len() - 1)].clone(),
            None => Ok(Vec::new()),
        }
    }
}

/// Sleeper that returns at once and remembers what it was asked to wait
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }

    pub fn count_of(&self, duration: Duration) -> usize {
        self.sleeps().iter().filter(|d| **d == duration).count()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}
