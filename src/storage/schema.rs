//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Article-Ingest database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Ingested articles
CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    article_id INTEGER,
    headline TEXT NOT NULL,
    summary TEXT,
    original_url TEXT NOT NULL UNIQUE,
    reporter_name TEXT,
    publisher_name TEXT,
    publisher_type INTEGER NOT NULL,
    published_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Publisher-assigned ids are unique per publisher
CREATE UNIQUE INDEX IF NOT EXISTS idx_articles_publisher_article
    ON articles(publisher_type, article_id)
    WHERE article_id IS NOT NULL;

CREATE INDEX IF NOT EXISTS idx_articles_created_at ON articles(created_at);
CREATE INDEX IF NOT EXISTS idx_articles_published_at ON articles(published_at);
CREATE INDEX IF NOT EXISTS idx_articles_publisher_type ON articles(publisher_type);
CREATE INDEX IF NOT EXISTS idx_articles_publisher_published
    ON articles(publisher_type, published_at);

-- Track crawl sessions
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    mode TEXT NOT NULL,
    start_page INTEGER,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    total_saved INTEGER NOT NULL DEFAULT 0,
    degraded_pages TEXT NOT NULL DEFAULT ''
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
