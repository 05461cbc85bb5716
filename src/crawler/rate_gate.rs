//! Deliberate pacing between requests
//!
//! This module handles:
//! - The long pause between full-crawl batches
//! - The short pause every N requests of an incremental crawl
//! - Counting the requests that drive it
//! - The [`Sleeper`] seam that lets tests run without waiting
//!
//! Pauses only suspend the calling task and end early when the session is
//! cancelled.

use crate::config::CrawlerConfig;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Something that can wait for a while
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// How a pause ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseOutcome {
    /// The full duration elapsed (or there was nothing to wait for)
    Elapsed,
    /// The session was cancelled while waiting
    Cancelled,
}

/// Sleeps for `duration` unless `cancel` fires first
pub(crate) async fn sleep_or_cancel(
    sleeper: &dyn Sleeper,
    duration: Duration,
    cancel: &CancellationToken,
) -> PauseOutcome {
    if cancel.is_cancelled() {
        return PauseOutcome::Cancelled;
    }
    if duration.is_zero() {
        return PauseOutcome::Elapsed;
    }

    tokio::select! {
        _ = cancel.cancelled() => PauseOutcome::Cancelled,
        _ = sleeper.sleep(duration) => PauseOutcome::Elapsed,
    }
}

/// Monotonic count of page fetch attempts in one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestCounter {
    count: u32,
}

impl RequestCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one more attempt and returns the new total
    pub fn record(&mut self) -> u32 {
        self.count = self.count.saturating_add(1);
        self.count
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

/// The two pacing primitives used by the orchestrator
#[derive(Clone)]
pub struct RateGate {
    macro_pause: Duration,
    micro_pause: Duration,
    micro_every: u32,
    sleeper: Arc<dyn Sleeper>,
}

impl RateGate {
    pub fn new(
        macro_pause: Duration,
        micro_pause: Duration,
        micro_every: u32,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            macro_pause,
            micro_pause,
            micro_every: micro_every.max(1),
            sleeper,
        }
    }

    /// Builds the gate from crawler settings
    pub fn from_config(config: &CrawlerConfig, sleeper: Arc<dyn Sleeper>) -> Self {
        Self::new(
            Duration::from_secs(config.macro_pause_secs),
            Duration::from_millis(config.micro_pause_ms),
            config.micro_pause_every,
            sleeper,
        )
    }

    /// A gate that never waits
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO, 1, Arc::new(TokioSleeper))
    }

    /// Waits at a batch boundary
    pub async fn macro_pause(&self, batch_index: usize, cancel: &CancellationToken) -> PauseOutcome {
        tracing::info!(
            "Pausing {:?} before batch {}",
            self.macro_pause,
            batch_index + 1
        );
        sleep_or_cancel(self.sleeper.as_ref(), self.macro_pause, cancel).await
    }

    /// Waits if the number of attempts so far is a non-zero multiple of the interval
    pub async fn micro_pause(
        &self,
        requests: &RequestCounter,
        cancel: &CancellationToken,
    ) -> PauseOutcome {
        let attempts = requests.count();
        if attempts == 0 || attempts % self.micro_every != 0 {
            return PauseOutcome::Elapsed;
        }

        tracing::debug!("Pausing {:?} after {} requests", self.micro_pause, attempts);
        sleep_or_cancel(self.sleeper.as_ref(), self.micro_pause, cancel).await
    }
}

impl std::fmt::Debug for RateGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateGate")
            .field("macro_pause", &self.macro_pause)
            .field("micro_pause", &self.micro_pause)
            .field("micro_every", &self.micro_every)
            .finish()
    }
}
