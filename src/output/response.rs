//! Response envelopes returned by the two crawl sessions
//!
//! Envelopes serialize to camelCase JSON. A failure envelope carries the error
//! message and no total; a successful one always carries `totalSaved`, even
//! when the session was cancelled part way.

use crate::crawler::CrawlReport;
use serde::Serialize;

/// Outcome of a full crawl
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FullCrawlResponse {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_saved: Option<u64>,

    pub start_page: i64,

    pub message: String,

    /// Pages that yielded nothing after exhausting retries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded_pages: Option<Vec<u32>>,

    pub cancelled: bool,
}

impl FullCrawlResponse {
    pub fn from_report(start_page: i64, report: &CrawlReport) -> Self {
        Self {
            success: report.final_state.is_success(),
            total_saved: Some(report.total_saved),
            start_page,
            message: session_message("Full crawl", report),
            degraded_pages: Some(report.degraded_pages.clone()),
            cancelled: report.cancelled,
        }
    }

    pub fn failure(start_page: i64, error: &dyn std::fmt::Display) -> Self {
        Self {
            success: false,
            total_saved: None,
            start_page,
            message: format!("Full crawl failed: {}", error),
            degraded_pages: None,
            cancelled: false,
        }
    }
}

/// Outcome of an incremental crawl
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncrementalCrawlResponse {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_saved: Option<u64>,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded_pages: Option<Vec<u32>>,

    pub cancelled: bool,
}

impl IncrementalCrawlResponse {
    pub fn from_report(report: &CrawlReport) -> Self {
        Self {
            success: report.final_state.is_success(),
            total_saved: Some(report.total_saved),
            message: session_message("Incremental crawl", report),
            degraded_pages: Some(report.degraded_pages.clone()),
            cancelled: report.cancelled,
        }
    }

    pub fn failure(error: &dyn std::fmt::Display) -> Self {
        Self {
            success: false,
            total_saved: None,
            message: format!("Incremental crawl failed: {}", error),
            degraded_pages: None,
            cancelled: false,
        }
    }
}

fn session_message(session: &str, report: &CrawlReport) -> String {
    if report.cancelled {
        format!("{} cancelled", session)
    } else if report.degraded_pages.is_empty() {
        format!("{} completed", session)
    } else {
        format!(
            "{} completed with {} degraded pages",
            session,
            report.degraded_pages.len()
        )
    }
}
