//! Session state definitions for tracking crawl progress
//!
//! Every crawl session moves through the same states regardless of mode.
use crate::IngestError;
use std::fmt;

/// Represents the current state of a crawl session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    // ===== Active States =====
    /// Session has been created but not started
    Idle,

    /// Determining the total number of listing pages
    Probing,

    /// Walking pages (batches in full mode, one by one in incremental mode)
    Crawling,

    // ===== Terminal States =====
    /// Every page that was visited contributed its articles
    Completed,

    /// At least one page yielded nothing after exhausting its retries
    CompletedWithDegradedPages,

    /// Stopped by the cancellation token; totals are partial
    Cancelled,

    /// The session could not start (probe failure)
    Failed,
}

impl SessionState {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::CompletedWithDegradedPages | Self::Cancelled | Self::Failed
        )
    }

    /// Returns true if the session ended without failing
    ///
    /// A cancelled session counts: its partial totals are still reported.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::CompletedWithDegradedPages | Self::Cancelled
        )
    }

    /// Returns true if `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Probing)
                | (Self::Probing, Self::Crawling)
                | (Self::Probing, Self::Failed)
                | (Self::Probing, Self::Cancelled)
                // Short-circuit: nothing to crawl
                | (Self::Probing, Self::Completed)
                | (Self::Crawling, Self::Completed)
                | (Self::Crawling, Self::CompletedWithDegradedPages)
                | (Self::Crawling, Self::Cancelled)
        )
    }

    /// Converts the state to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Probing => "probing",
            Self::Crawling => "crawling",
            Self::Completed => "completed",
            Self::CompletedWithDegradedPages => "completed_degraded",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }

    /// Parses a state from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(Self::Idle),
            "probing" => Some(Self::Probing),
            "crawling" => Some(Self::Crawling),
            "completed" => Some(Self::Completed),
            "completed_degraded" => Some(Self::CompletedWithDegradedPages),
            "cancelled" => Some(Self::Cancelled),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Tracks the state of one session and rejects illegal transitions
#[derive(Debug)]
pub struct SessionTracker {
    state: SessionState,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Moves to `next`, or fails with `IngestError::InvalidTransition`
    pub fn transition(&mut self, next: SessionState) -> Result<(), IngestError> {
        if !self.state.can_transition_to(next) {
            return Err(IngestError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        tracing::debug!("Session state: {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new()
    }
}
