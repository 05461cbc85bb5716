//! Statistics generation from the article database
//!
//! This module provides functionality for extracting and displaying
//! ingestion statistics from the storage layer.

use crate::article::PublisherType;
use crate::storage::{RunRecord, SqliteArticleStore, StorageResult};

/// Runs shown by [`print_statistics`]
const RECENT_RUNS: usize = 5;

/// Ingestion statistics summary
#[derive(Debug, Clone)]
pub struct IngestStatistics {
    /// Total number of stored articles
    pub total_articles: u64,

    /// Stored articles per publisher
    pub articles_by_publisher: Vec<(PublisherType, u64)>,

    /// Most recent crawl runs, newest first
    pub recent_runs: Vec<RunRecord>,
}

/// Loads statistics from storage
pub fn load_statistics(store: &SqliteArticleStore) -> StorageResult<IngestStatistics> {
    Ok(IngestStatistics {
        total_articles: store.count_articles()?,
        articles_by_publisher: store.count_articles_by_publisher()?,
        recent_runs: store.recent_runs(RECENT_RUNS)?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &IngestStatistics) {
    println!("=== Ingest Statistics ===\n");

    println!("Articles: {}", stats.total_articles);
    for (publisher, count) in &stats.articles_by_publisher {
        let percentage = if stats.total_articles > 0 {
            (*count as f64 / stats.total_articles as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", publisher.display_name(), count, percentage);
    }
    println!();

    if stats.recent_runs.is_empty() {
        println!("No crawl runs recorded");
        return;
    }

    println!("Recent Runs:");
    for run in &stats.recent_runs {
        let start = run
            .start_page
            .map(|page| format!(" from page {}", page))
            .unwrap_or_default();
        println!(
            "  #{} {}{}: {} saved, {} ({})",
            run.id,
            run.mode,
            start,
            run.total_saved,
            run.status,
            run.finished_at.as_deref().unwrap_or("unfinished")
        );
        if !run.degraded_pages.is_empty() {
            println!("      degraded pages: {:?}", run.degraded_pages);
        }
    }
}
