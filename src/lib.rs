//! Article-Ingest: a paginated news listing harvester
//!
//! This crate walks a paginated article listing, paces its requests, retries
//! transient failures with backoff, and persists every article exactly once.
//! It offers two crawl sessions: a full backfill over the whole page range and
//! an incremental walk that stops as soon as a page holds nothing new.

pub mod article;
pub mod config;
pub mod crawler;
pub mod output;
pub mod source;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Article-Ingest operations
///
/// Only the variants that stop a session before any page is crawled reach the
/// caller; per-page and per-item failures are absorbed by the orchestrator.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid start page {0}: pages are numbered from 1")]
    InvalidStartPage(i64),

    #[error("Failed to determine total page count: {0}")]
    Probe(#[source] crawler::RetryError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Invalid source URL: {0}")]
    SourceUrl(#[from] ::url::ParseError),

    #[error("Invalid session transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::SessionState,
        to: state::SessionState,
    },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Article-Ingest operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use article::{Article, IdentityKey, PublisherType};
pub use config::Config;
pub use crawler::{CrawlMode, CrawlOrchestrator, CrawlReport};
pub use state::SessionState;
