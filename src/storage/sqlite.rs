//! SQLite storage implementation
//!
//! This module provides a SQLite-backed [`DedupStore`] plus run bookkeeping.
//! The connection sits behind a mutex so full-crawl workers can share one
//! store; every statement is short, so the lock is never held across an await.

use crate::article::{Article, IdentityKey, PublisherType};
use crate::crawler::CrawlMode;
use crate::state::SessionState;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{DedupStore, StorageError, StorageResult};
use crate::storage::{decode_pages, encode_pages, RunRecord};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const PUBLISHED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// SQLite storage backend
pub struct SqliteArticleStore {
    conn: Mutex<Connection>,
}

impl SqliteArticleStore {
    /// Opens or creates the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteArticleStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    // ===== Articles =====

    /// Counts all stored articles
    pub fn count_articles(&self) -> StorageResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Counts stored articles per publisher
    pub fn count_articles_by_publisher(&self) -> StorageResult<Vec<(PublisherType, u64)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT publisher_type, COUNT(*) FROM articles GROUP BY publisher_type ORDER BY publisher_type",
        )?;

        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(code, count)| {
                PublisherType::from_code(code)
                    .map(|publisher| (publisher, count as u64))
                    .ok_or_else(|| StorageError::Corrupt(format!("unknown publisher code {}", code)))
            })
            .collect()
    }

    // ===== Run Management =====

    /// Creates a new crawl run record
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    pub fn create_run(
        &self,
        mode: CrawlMode,
        start_page: Option<u32>,
        config_hash: &str,
    ) -> StorageResult<i64> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO runs (mode, start_page, started_at, config_hash, status) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                mode.to_db_string(),
                start_page,
                now,
                config_hash,
                SessionState::Probing.to_db_string()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Closes a run with its terminal state and totals
    pub fn finish_run(
        &self,
        run_id: i64,
        status: SessionState,
        total_saved: u64,
        degraded_pages: &[u32],
    ) -> StorageResult<()> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();
        let updated = conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, total_saved = ?3, degraded_pages = ?4 WHERE id = ?5",
            params![
                status.to_db_string(),
                now,
                total_saved as i64,
                encode_pages(degraded_pages),
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    /// Gets a run by ID
    pub fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, mode, start_page, started_at, finished_at, config_hash, status, total_saved, degraded_pages
             FROM runs WHERE id = ?1",
            params![run_id],
            run_from_row,
        )
        .optional()?
        .ok_or(StorageError::RunNotFound(run_id))?
    }

    /// Gets the most recent runs, newest first
    pub fn recent_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, mode, start_page, started_at, finished_at, config_hash, status, total_saved, degraded_pages
             FROM runs ORDER BY id DESC LIMIT ?1",
        )?;

        let runs = stmt
            .query_map(params![limit as i64], run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        runs.into_iter().collect()
    }
}

impl DedupStore for SqliteArticleStore {
    fn exists(&self, key: &IdentityKey) -> StorageResult<bool> {
        let conn = self.lock()?;
        let found = match key {
            IdentityKey::External {
                publisher,
                external_id,
            } => conn
                .query_row(
                    "SELECT 1 FROM articles WHERE publisher_type = ?1 AND article_id = ?2",
                    params![publisher.code(), external_id],
                    |_| Ok(()),
                )
                .optional()?,
            IdentityKey::Url(url) => conn
                .query_row(
                    "SELECT 1 FROM articles WHERE original_url = ?1",
                    params![url],
                    |_| Ok(()),
                )
                .optional()?,
        };
        Ok(found.is_some())
    }

    fn persist(&self, article: &Article) -> StorageResult<bool> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();
        let published_at = article
            .published_at
            .map(|at| at.format(PUBLISHED_AT_FORMAT).to_string());

        // Both unique constraints turn a duplicate into a zero-row insert
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO articles
             (article_id, headline, summary, original_url, reporter_name, publisher_name,
              publisher_type, published_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            params![
                article.external_id,
                article.headline,
                article.summary,
                article.url,
                article.reporter_name,
                article.publisher_name,
                article.publisher.code(),
                published_at,
                now,
            ],
        )?;

        Ok(inserted == 1)
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<StorageResult<RunRecord>> {
    let mode: String = row.get(1)?;
    let status: String = row.get(6)?;
    let degraded: String = row.get(8)?;

    let Some(mode) = CrawlMode::from_db_string(&mode) else {
        return Ok(Err(StorageError::Corrupt(format!("unknown run mode '{}'", mode))));
    };
    let Some(status) = SessionState::from_db_string(&status) else {
        return Ok(Err(StorageError::Corrupt(format!(
            "unknown run status '{}'",
            status
        ))));
    };
    let degraded_pages = match decode_pages(&degraded) {
        Ok(pages) => pages,
        Err(e) => return Ok(Err(e)),
    };

    Ok(Ok(RunRecord {
        id: row.get(0)?,
        mode,
        start_page: row.get(2)?,
        started_at: row.get(3)?,
        finished_at: row.get(4)?,
        config_hash: row.get(5)?,
        status,
        total_saved: row.get::<_, i64>(7)? as u64,
        degraded_pages,
    }))
}
