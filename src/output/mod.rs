//! Output module for crawl responses and statistics
//!
//! This module handles:
//! - The JSON envelopes returned by full and incremental crawls
//! - Reading and printing ingestion statistics

mod response;
pub mod stats;

pub use response::{FullCrawlResponse, IncrementalCrawlResponse};
pub use stats::{load_statistics, print_statistics, IngestStatistics};
