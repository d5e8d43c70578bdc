//! Storage module for persisting crawled documents
//!
//! This module handles all database operations for the crawler:
//! - SQLite database initialization and schema management
//! - Document upsert and timestamp refresh
//! - Visited-URL lookup for dedup and revisit decisions
//! - Streaming stored documents for frontier recovery

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{DocumentStore, StorageError, StorageResult};

use chrono::{DateTime, Utc};

/// A stored document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRecord {
    pub url: String,
    pub html: String,
    pub source_name: String,
    pub crawl_date: DateTime<Utc>,
    pub content_hash: String,
}

/// What the crawler needs to know about a previously stored URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitedRecord {
    pub last_crawl_time: DateTime<Utc>,
    pub content_hash: String,
}
