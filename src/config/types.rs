use crate::article::PublisherType;
use serde::Deserialize;

/// Main configuration structure for Article-Ingest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    pub output: OutputConfig,
}

/// The paginated listing to crawl
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Site root; relative article links are resolved against it
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Listing path template, `{page}` is replaced by the page number
    #[serde(rename = "listing-path")]
    pub listing_path: String,

    /// Publisher stamped on every scraped article
    pub publisher: PublisherType,

    /// TCP connect timeout (milliseconds)
    #[serde(rename = "connect-timeout-ms", default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Whole-request timeout (milliseconds)
    #[serde(rename = "request-timeout-ms", default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Pacing and concurrency of a crawl session
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Pages per batch in a full crawl
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: u32,

    /// Simultaneous page fetches within a full-crawl batch
    #[serde(rename = "max-concurrent-fetches", default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: u32,

    /// Pause before every batch after the first (seconds)
    #[serde(rename = "macro-pause-secs", default = "default_macro_pause_secs")]
    pub macro_pause_secs: u64,

    /// Incremental crawls pause after this many fetch attempts
    #[serde(rename = "micro-pause-every", default = "default_micro_pause_every")]
    pub micro_pause_every: u32,

    /// Length of the incremental pause (milliseconds)
    #[serde(rename = "micro-pause-ms", default = "default_micro_pause_ms")]
    pub micro_pause_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            macro_pause_secs: default_macro_pause_secs(),
            micro_pause_every: default_micro_pause_every(),
            micro_pause_ms: default_micro_pause_ms(),
        }
    }
}

/// Backoff applied around every page fetch and the page-count probe
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry (milliseconds)
    #[serde(rename = "base-delay-ms", default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound for any single delay (milliseconds)
    #[serde(rename = "max-delay-ms", default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Growth factor between consecutive delays
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Fraction of each delay that may be randomly added or removed
    #[serde(rename = "jitter-factor", default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
            jitter_factor: default_jitter_factor(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

fn default_connect_timeout_ms() -> u64 {
    3_000
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_batch_size() -> u32 {
    500
}

fn default_max_concurrent_fetches() -> u32 {
    10
}

fn default_macro_pause_secs() -> u64 {
    600
}

fn default_micro_pause_every() -> u32 {
    50
}

fn default_micro_pause_ms() -> u64 {
    2_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    2_000
}

fn default_max_delay_ms() -> u64 {
    10_000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_jitter_factor() -> f64 {
    0.5
}
