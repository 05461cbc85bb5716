//! Storage module for persisting ingested articles
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Insert-if-absent persistence of articles keyed by identity
//! - Crawl run tracking for statistics

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteArticleStore;
pub use traits::{DedupStore, StorageError, StorageResult};

use crate::crawler::CrawlMode;
use crate::state::SessionState;

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub mode: CrawlMode,
    pub start_page: Option<u32>,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: SessionState,
    pub total_saved: u64,
    pub degraded_pages: Vec<u32>,
}

/// Encodes a page list as a comma separated column value
pub(crate) fn encode_pages(pages: &[u32]) -> String {
    pages
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Decodes a column written by [`encode_pages`]
pub(crate) fn decode_pages(raw: &str) -> StorageResult<Vec<u32>> {
    raw.split(',')
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u32>()
                .map_err(|_| StorageError::Corrupt(format!("bad page number '{}'", part)))
        })
        .collect()
}
