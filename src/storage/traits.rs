//! Storage traits and error types
//!
//! This module defines the deduplicating store the crawler writes through and
//! its error type.

use crate::article::{Article, IdentityKey};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Existence check and insert-if-absent persistence keyed by [`IdentityKey`]
///
/// The store owns the uniqueness constraint. Persisting an article that is
/// already present is a no-op reported as `Ok(false)`, never an error, so
/// callers may race on the same article freely.
pub trait DedupStore: Send + Sync {
    /// Returns true if an article with this key has been persisted
    fn exists(&self, key: &IdentityKey) -> StorageResult<bool>;

    /// Persists the article unless its key is already present
    ///
    /// Returns `Ok(true)` only when a new row was written.
    fn persist(&self, article: &Article) -> StorageResult<bool>;

    /// Returns the articles whose key is not yet in the store, in input order
    fn filter_new(&self, articles: Vec<Article>) -> StorageResult<Vec<Article>> {
        let mut fresh = Vec::with_capacity(articles.len());
        for article in articles {
            if !self.exists(&article.identity())? {
                fresh.push(article);
            }
        }
        Ok(fresh)
    }
}
