//! State module for tracking crawl sessions
//!
//! A session is one call to a full or incremental crawl. It moves
//! `Idle -> Probing -> Crawling -> Completed` and the terminal state records
//! whether any page was degraded or the session was cancelled.

mod session_state;

// Re-export main types
pub use session_state::{SessionState, SessionTracker};
