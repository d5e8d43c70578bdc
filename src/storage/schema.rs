//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Doc-Harvester database.

/// Current schema version, stored in `PRAGMA user_version`
pub const SCHEMA_VERSION: i32 = 1;

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per canonical URL
CREATE TABLE IF NOT EXISTS documents (
    url TEXT PRIMARY KEY,
    html TEXT NOT NULL,
    source_name TEXT NOT NULL,
    crawl_date TEXT NOT NULL,
    content_hash TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_documents_source ON documents(source_name);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}

/// Reads the schema version recorded in the database
pub fn get_schema_version(conn: &rusqlite::Connection) -> Result<i32, rusqlite::Error> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
}
