//! Storage traits and error types
//!
//! This module defines the trait interface for document store backends and
//! associated error types.

use crate::storage::{DocumentRecord, VisitedRecord};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Corrupt record for {url}: {message}")]
    Corrupt { url: String, message: String },

    #[error("Document not found: {0}")]
    NotFound(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistent document store keyed by canonical URL
///
/// Every write is committed on its own, so documents saved before an
/// interrupt or crash are durable.
pub trait DocumentStore {
    /// Gets a full document by URL
    fn find_by_url(&self, url: &str) -> StorageResult<Option<DocumentRecord>>;

    /// Gets the crawl date and content hash of a stored URL
    fn visited_record(&self, url: &str) -> StorageResult<Option<VisitedRecord>>;

    /// Inserts a document or replaces every field of the existing one
    fn upsert(
        &mut self,
        url: &str,
        html: &str,
        source_name: &str,
        crawl_date: DateTime<Utc>,
        content_hash: &str,
    ) -> StorageResult<()>;

    /// Updates only the crawl date of an existing document
    ///
    /// Returns `StorageError::NotFound` if the URL is not stored.
    fn touch(&mut self, url: &str, crawl_date: DateTime<Utc>) -> StorageResult<()>;

    /// Every stored URL
    fn list_urls(&self) -> StorageResult<HashSet<String>>;

    /// Streams stored documents to `visitor`, optionally for one source only
    ///
    /// Rows that cannot be decoded are logged and skipped. Returns the number
    /// of documents visited.
    fn list_documents(
        &self,
        source_filter: Option<&str>,
        visitor: &mut dyn FnMut(DocumentRecord),
    ) -> StorageResult<u64>;

    /// Total number of stored documents
    fn count_documents(&self) -> StorageResult<u64>;

    /// Document count per source name, sorted by name
    fn count_by_source(&self) -> StorageResult<Vec<(String, u64)>>;
}
