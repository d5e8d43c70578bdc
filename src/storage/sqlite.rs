//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the DocumentStore trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{DocumentStore, StorageError, StorageResult};
use crate::storage::{DocumentRecord, VisitedRecord};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (or creates) the database at `path` and ensures the schema exists
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // journal_mode answers with the resulting mode, so it needs the
        // row-returning form
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!("SQLite journal mode: {}", mode);

        conn.execute_batch(
            "
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn parse_crawl_date(url: &str, raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Corrupt {
            url: url.to_string(),
            message: format!("bad crawl_date '{}': {}", raw, e),
        })
}

/// Row shape shared by document queries, before the date is parsed
struct RawDocument {
    url: String,
    html: String,
    source_name: String,
    crawl_date: String,
    content_hash: String,
}

impl RawDocument {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            url: row.get(0)?,
            html: row.get(1)?,
            source_name: row.get(2)?,
            crawl_date: row.get(3)?,
            content_hash: row.get(4)?,
        })
    }

    fn into_record(self) -> StorageResult<DocumentRecord> {
        let crawl_date = parse_crawl_date(&self.url, &self.crawl_date)?;
        Ok(DocumentRecord {
            url: self.url,
            html: self.html,
            source_name: self.source_name,
            crawl_date,
            content_hash: self.content_hash,
        })
    }
}

impl DocumentStore for SqliteStorage {
    fn find_by_url(&self, url: &str) -> StorageResult<Option<DocumentRecord>> {
        let raw = self
            .conn
            .query_row(
                "SELECT url, html, source_name, crawl_date, content_hash
                 FROM documents WHERE url = ?1",
                params![url],
                RawDocument::from_row,
            )
            .optional()?;

        raw.map(RawDocument::into_record).transpose()
    }

    fn visited_record(&self, url: &str) -> StorageResult<Option<VisitedRecord>> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT crawl_date, content_hash FROM documents WHERE url = ?1",
                params![url],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((crawl_date, content_hash)) => Ok(Some(VisitedRecord {
                last_crawl_time: parse_crawl_date(url, &crawl_date)?,
                content_hash,
            })),
            None => Ok(None),
        }
    }

    fn upsert(
        &mut self,
        url: &str,
        html: &str,
        source_name: &str,
        crawl_date: DateTime<Utc>,
        content_hash: &str,
    ) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO documents (url, html, source_name, crawl_date, content_hash)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(url) DO UPDATE SET
                html = excluded.html,
                source_name = excluded.source_name,
                crawl_date = excluded.crawl_date,
                content_hash = excluded.content_hash",
            params![url, html, source_name, crawl_date.to_rfc3339(), content_hash],
        )?;
        Ok(())
    }

    fn touch(&mut self, url: &str, crawl_date: DateTime<Utc>) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE documents SET crawl_date = ?1 WHERE url = ?2",
            params![crawl_date.to_rfc3339(), url],
        )?;

        if updated == 0 {
            return Err(StorageError::NotFound(url.to_string()));
        }
        Ok(())
    }

    fn list_urls(&self) -> StorageResult<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT url FROM documents")?;
        let urls = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<HashSet<String>, _>>()?;
        Ok(urls)
    }

    fn list_documents(
        &self,
        source_filter: Option<&str>,
        visitor: &mut dyn FnMut(DocumentRecord),
    ) -> StorageResult<u64> {
        let mut stmt = self.conn.prepare(
            "SELECT url, html, source_name, crawl_date, content_hash
             FROM documents
             WHERE ?1 IS NULL OR source_name = ?1
             ORDER BY rowid",
        )?;

        let mut visited = 0;
        let rows = stmt.query_map(params![source_filter], RawDocument::from_row)?;
        for raw in rows {
            match raw?.into_record() {
                Ok(record) => {
                    visitor(record);
                    visited += 1;
                }
                Err(e) => tracing::warn!("Skipping stored document: {}", e),
            }
        }

        Ok(visited)
    }

    fn count_documents(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_by_source(&self) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT source_name, COUNT(*) FROM documents
             GROUP BY source_name ORDER BY source_name",
        )?;

        let counts = stmt
            .query_map([], |row| {
                let count: i64 = row.get(1)?;
                Ok((row.get(0)?, count as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn store() -> SqliteStorage {
        SqliteStorage::open_in_memory().unwrap()
    }

    #[test]
    fn test_upsert_and_find() {
        let mut storage = store();
        let now = Utc::now();

        storage
            .upsert("https://example.com/a", "<html>a</html>", "Example", now, "h1")
            .unwrap();

        let doc = storage.find_by_url("https://example.com/a").unwrap().unwrap();
        assert_eq!(doc.html, "<html>a</html>");
        assert_eq!(doc.source_name, "Example");
        assert_eq!(doc.content_hash, "h1");
        assert_eq!(doc.crawl_date, now);

        assert!(storage.find_by_url("https://example.com/b").unwrap().is_none());
    }

    #[test]
    fn test_upsert_replaces_existing() {
        let mut storage = store();
        let first = Utc::now() - Duration::days(10);
        let second = Utc::now();

        storage
            .upsert("https://example.com/a", "old", "Example", first, "h1")
            .unwrap();
        storage
            .upsert("https://example.com/a", "new", "Example", second, "h2")
            .unwrap();

        assert_eq!(storage.count_documents().unwrap(), 1);
        let doc = storage.find_by_url("https://example.com/a").unwrap().unwrap();
        assert_eq!(doc.html, "new");
        assert_eq!(doc.content_hash, "h2");
        assert_eq!(doc.crawl_date, second);
    }

    #[test]
    fn test_touch_updates_only_date() {
        let mut storage = store();
        let first = Utc::now() - Duration::days(10);
        let second = Utc::now();

        storage
            .upsert("https://example.com/a", "body", "Example", first, "h1")
            .unwrap();
        storage.touch("https://example.com/a", second).unwrap();

        let doc = storage.find_by_url("https://example.com/a").unwrap().unwrap();
        assert_eq!(doc.html, "body");
        assert_eq!(doc.content_hash, "h1");
        assert_eq!(doc.crawl_date, second);
    }

    #[test]
    fn test_touch_missing_url() {
        let mut storage = store();
        let result = storage.touch("https://example.com/missing", Utc::now());
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_visited_record() {
        let mut storage = store();
        let now = Utc::now();

        assert!(storage.visited_record("https://example.com/a").unwrap().is_none());

        storage
            .upsert("https://example.com/a", "body", "Example", now, "h1")
            .unwrap();

        let record = storage.visited_record("https://example.com/a").unwrap().unwrap();
        assert_eq!(record.last_crawl_time, now);
        assert_eq!(record.content_hash, "h1");
    }

    #[test]
    fn test_list_urls() {
        let mut storage = store();
        let now = Utc::now();

        storage.upsert("https://example.com/a", "", "A", now, "h").unwrap();
        storage.upsert("https://example.com/b", "", "B", now, "h").unwrap();

        let urls = storage.list_urls().unwrap();
        assert_eq!(urls.len(), 2);
        assert!(urls.contains("https://example.com/a"));
        assert!(urls.contains("https://example.com/b"));
    }

    #[test]
    fn test_list_documents_with_filter() {
        let mut storage = store();
        let now = Utc::now();

        storage.upsert("https://a.com/1", "", "A", now, "h").unwrap();
        storage.upsert("https://b.com/1", "", "B", now, "h").unwrap();
        storage.upsert("https://a.com/2", "", "A", now, "h").unwrap();

        let mut seen = Vec::new();
        let count = storage
            .list_documents(Some("A"), &mut |doc| seen.push(doc.url))
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(seen, vec!["https://a.com/1", "https://a.com/2"]);

        let count = storage.list_documents(None, &mut |_| {}).unwrap();
        assert_eq!(count, 3);
    }

    #[test]
    fn test_count_by_source() {
        let mut storage = store();
        let now = Utc::now();

        storage.upsert("https://a.com/1", "", "A", now, "h").unwrap();
        storage.upsert("https://b.com/1", "", "B", now, "h").unwrap();
        storage.upsert("https://a.com/2", "", "A", now, "h").unwrap();

        assert_eq!(
            storage.count_by_source().unwrap(),
            vec![("A".to_string(), 2), ("B".to_string(), 1)]
        );
    }

    #[test]
    fn test_corrupt_date_reported() {
        let storage = store();
        storage
            .conn
            .execute(
                "INSERT INTO documents VALUES ('https://x.com/', '', 'X', 'yesterday', 'h')",
                [],
            )
            .unwrap();

        let result = storage.visited_record("https://x.com/");
        assert!(matches!(result, Err(StorageError::Corrupt { .. })));
    }

    #[test]
    fn test_list_documents_skips_corrupt_rows() {
        let mut storage = store();
        let now = Utc::now();

        storage.upsert("https://x.com/1", "", "X", now, "h").unwrap();
        storage
            .conn
            .execute(
                "INSERT INTO documents VALUES ('https://x.com/2', '', 'X', 'yesterday', 'h')",
                [],
            )
            .unwrap();
        storage.upsert("https://x.com/3", "", "X", now, "h").unwrap();

        let mut seen = Vec::new();
        let count = storage
            .list_documents(Some("X"), &mut |doc| seen.push(doc.url))
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(seen, vec!["https://x.com/1", "https://x.com/3"]);
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs.db");
        let now = Utc::now();

        {
            let mut storage = SqliteStorage::new(&path).unwrap();
            storage.upsert("https://example.com/", "x", "E", now, "h").unwrap();
        }

        let storage = SqliteStorage::new(&path).unwrap();
        assert!(storage.list_urls().unwrap().contains("https://example.com/"));
    }
}
