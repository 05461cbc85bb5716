//! Exponential backoff around a single fetch
//!
//! The n-th retry waits `base * multiplier^(n-1)`, capped at `max_delay`, with
//! optional random jitter. Only errors that [`FetchError::is_transient`] calls
//! transient are retried.

use crate::config::RetryConfig;
use crate::crawler::rate_gate::{sleep_or_cancel, PauseOutcome, Sleeper, TokioSleeper};
use crate::source::FetchError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Terminal outcome of a retried operation that never succeeded
#[derive(Debug, Clone, Error)]
pub enum RetryError {
    /// Every attempt failed with a transient error
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: FetchError },

    /// The error cannot be fixed by trying again
    #[error("not retried: {0}")]
    Rejected(FetchError),

    /// The session was cancelled while waiting to retry
    #[error("cancelled while waiting to retry")]
    Cancelled,
}

/// Attempt bookkeeping for one retried operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    attempts: u32,
    max_retries: u32,
}

impl RetryState {
    pub fn new(max_retries: u32) -> Self {
        Self {
            attempts: 0,
            max_retries,
        }
    }

    /// Marks the start of another attempt and returns its 1-based number
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Number of the retry that would follow a failed attempt, if any remain
    pub fn next_retry(&self) -> Option<u32> {
        (self.attempts <= self.max_retries).then_some(self.attempts)
    }
}

/// Backoff schedule plus the sleeper used to wait it out
#[derive(Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    jitter_factor: f64,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryPolicy {
    pub fn new(
        max_retries: u32,
        base_delay: Duration,
        max_delay: Duration,
        multiplier: f64,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
            multiplier,
            jitter_factor: 0.0,
            sleeper,
        }
    }

    /// Builds the policy from retry settings
    pub fn from_config(config: &RetryConfig, sleeper: Arc<dyn Sleeper>) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
            config.multiplier,
            sleeper,
        )
        .with_jitter(config.jitter_factor)
    }

    /// A policy that makes a single attempt
    pub fn no_retry() -> Self {
        Self::new(0, Duration::ZERO, Duration::ZERO, 1.0, Arc::new(TokioSleeper))
    }

    /// Sets the fraction of each delay that may be randomly added or removed
    pub fn with_jitter(mut self, factor: f64) -> Self {
        self.jitter_factor = factor.clamp(0.0, 1.0);
        self
    }

    /// Delay before retry number `retry` (1-based), without jitter
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(63) as i32;
        let delay_ms = self.base_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped_ms as u64)
    }

    fn jittered_delay_for(&self, retry: u32) -> Duration {
        let delay = self.delay_for(retry);
        if self.jitter_factor <= 0.0 || delay.is_zero() {
            return delay;
        }

        // Uniform in [delay * (1 - f), delay * (1 + f)], still capped
        let spread = delay.as_millis() as f64 * self.jitter_factor;
        let offset = (fastrand::f64() * 2.0 - 1.0) * spread;
        let jittered_ms = (delay.as_millis() as f64 + offset).max(0.0);
        Duration::from_millis(jittered_ms as u64).min(self.max_delay)
    }

    /// Runs `op` until it succeeds, fails permanently or runs out of retries
    ///
    /// A cancelled `cancel` does not abort an attempt already in progress but
    /// ends the wait before the next one.
    pub async fn run<T, F, Fut>(
        &self,
        label: &str,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut state = RetryState::new(self.max_retries);
        loop {
            let attempt = state.begin_attempt();
            let error = match op().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !error.is_transient() {
                tracing::warn!("{} failed permanently: {}", label, error);
                return Err(RetryError::Rejected(error));
            }

            let Some(retry) = state.next_retry() else {
                tracing::warn!("{} failed after {} attempts: {}", label, attempt, error);
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: error,
                });
            };

            let delay = self.jittered_delay_for(retry);
            tracing::warn!(
                "{} failed (attempt {}/{}), retrying in {:?}: {}",
                label,
                attempt,
                self.max_retries + 1,
                delay,
                error
            );

            if sleep_or_cancel(self.sleeper.as_ref(), delay, cancel).await
                == PauseOutcome::Cancelled
            {
                return Err(RetryError::Cancelled);
            }
        }
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("multiplier", &self.multiplier)
            .field("jitter_factor", &self.jitter_factor)
            .finish()
    }
}
