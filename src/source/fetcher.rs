//! HTTP fetcher for article listings
//!
//! This module handles all HTTP requests made by the crawler:
//! - Building the HTTP client with the crawler's user agent and timeouts
//! - Resolving listing page URLs from the configured template
//! - Classifying transport and status failures into [`FetchError`]

use crate::article::Article;
use crate::config::{SourceConfig, UserAgentConfig};
use crate::source::{FetchError, ListingParser, PageFetcher};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `source` - Source settings providing the timeouts
/// * `user_agent` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    source: &SourceConfig,
    user_agent: &UserAgentConfig,
) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        user_agent.crawler_name,
        user_agent.crawler_version,
        user_agent.contact_url,
        user_agent.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_millis(source.request_timeout_ms))
        .connect_timeout(Duration::from_millis(source.connect_timeout_ms))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`PageFetcher`] backed by a live HTTP listing
pub struct HttpListingFetcher {
    client: Client,
    base_url: Url,
    listing_path: String,
    parser: ListingParser,
}

impl HttpListingFetcher {
    /// Creates a fetcher for the configured source
    pub fn new(source: &SourceConfig, user_agent: &UserAgentConfig) -> crate::Result<Self> {
        let client = build_http_client(source, user_agent)?;
        Self::with_client(client, source)
    }

    /// Creates a fetcher that reuses an existing client
    pub fn with_client(client: Client, source: &SourceConfig) -> crate::Result<Self> {
        let base_url = Url::parse(&source.base_url)?;
        let parser = ListingParser::new(base_url.clone(), &source.listing_path, source.publisher)
            .map_err(|e| {
                crate::ConfigError::Validation(format!("Invalid listing-path pattern: {}", e))
            })?;

        Ok(Self {
            client,
            base_url,
            listing_path: source.listing_path.clone(),
            parser,
        })
    }

    /// Returns the absolute URL of a listing page
    pub fn page_url(&self, page: u32) -> Result<Url, url::ParseError> {
        let path = self.listing_path.replace("{page}", &page.to_string());
        self.base_url.join(&path)
    }

    /// GETs a listing page and returns its body
    ///
    /// An empty body is returned as an empty string; callers treat it as a
    /// page without content rather than an error.
    async fn get_body(&self, page: u32) -> Result<String, FetchError> {
        let url = self.page_url(page).map_err(|e| FetchError::Malformed {
            url: format!("{}{}", self.base_url, self.listing_path),
            message: e.to_string(),
        })?;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_transport_error(url.as_str(), &e))?;

        let status = response.status();
        tracing::debug!("HTTP response: page={}, status={}", page, status);

        if !status.is_success() {
            tracing::warn!("Listing fetch failed: page={}, status={}", page, status);
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| classify_transport_error(url.as_str(), &e))?;

        if body.is_empty() {
            tracing::warn!("Listing page {} returned an empty body", page);
        }

        Ok(body)
    }
}

#[async_trait]
impl PageFetcher for HttpListingFetcher {
    async fn probe_total_pages(&self) -> Result<u32, FetchError> {
        let body = self.get_body(1).await?;
        let last_page = self.parser.parse_last_page(&body);
        tracing::info!("Last listing page: {}", last_page);
        Ok(last_page)
    }

    async fn fetch_page(&self, page: u32) -> Result<Vec<Article>, FetchError> {
        let body = self.get_body(page).await?;
        let articles = self.parser.parse_articles(&body);
        tracing::debug!("Parsed page {}: {} articles", page, articles.len());
        Ok(articles)
    }
}

/// Maps a reqwest failure onto the fetch error taxonomy
fn classify_transport_error(url: &str, error: &reqwest::Error) -> FetchError {
    if let Some(status) = error.status() {
        return FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        };
    }

    let message = if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        "Connection refused".to_string()
    } else if error.is_decode() {
        return FetchError::Malformed {
            url: url.to_string(),
            message: error.to_string(),
        };
    } else {
        error.to_string()
    };

    FetchError::Network {
        url: url.to_string(),
        message,
    }
}
