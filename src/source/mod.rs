//! Listing sources
//!
//! The crawler never talks HTTP directly. It sees a source through the
//! [`PageFetcher`] trait: a probe for the number of listing pages and a fetch
//! of a single page as a list of articles. Errors say whether trying again
//! could help.

mod fetcher;
mod parser;

pub use fetcher::{build_http_client, HttpListingFetcher};
pub use parser::ListingParser;

use crate::article::Article;
use async_trait::async_trait;
use thiserror::Error;

/// Failure while fetching a listing page
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Connection, timeout or body transfer failure
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    /// The server answered with an error status
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// The response arrived but cannot be used
    #[error("Malformed response for {url}: {message}")]
    Malformed { url: String, message: String },
}

impl FetchError {
    /// Returns true if the same request may succeed later
    ///
    /// | Condition | Transient |
    /// |-----------|-----------|
    /// | Network failure | yes |
    /// | HTTP 408, 429, 5xx | yes |
    /// | Other HTTP errors | no |
    /// | Malformed response | no |
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Status { status, .. } => {
                *status == 408 || *status == 429 || (500..600).contains(status)
            }
            Self::Malformed { .. } => false,
        }
    }
}

/// A paginated listing of articles
///
/// Pages are numbered from 1 and the listing is assumed to be ordered newest
/// first.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Returns the number of the last listing page
    async fn probe_total_pages(&self) -> Result<u32, FetchError>;

    /// Fetches and parses one listing page
    async fn fetch_page(&self, page: u32) -> Result<Vec<Article>, FetchError>;
}
