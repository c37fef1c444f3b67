//! SQL DDL for all Tome tables.
//!
//! Defines the `documents`, `links`, `access_log`, and `kb_meta` tables.
//! All DDL uses `IF NOT EXISTS` for idempotent initialization.

use rusqlite::Connection;

/// All schema DDL statements for Tome's core tables.
const SCHEMA_SQL: &str = r#"
-- Core document storage. Tags and metadata are stored as JSON text;
-- embeddings are raw little-endian f32 blobs scored via sqlite-vec.
CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    category TEXT NOT NULL,
    title TEXT NOT NULL,
    tags TEXT NOT NULL DEFAULT '[]',
    content TEXT NOT NULL,
    metadata TEXT NOT NULL DEFAULT '{}',
    embedding BLOB,
    created TEXT NOT NULL,
    updated TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_documents_category ON documents(category);
CREATE INDEX IF NOT EXISTS idx_documents_updated ON documents(updated);

-- Directed link graph between documents. No foreign keys: links may
-- dangle after external edits and readers tolerate that.
CREATE TABLE IF NOT EXISTS links (
    from_id TEXT NOT NULL,
    to_id TEXT NOT NULL,
    link_type TEXT NOT NULL DEFAULT 'related',
    created TEXT NOT NULL,
    PRIMARY KEY (from_id, to_id, link_type)
);

CREATE INDEX IF NOT EXISTS idx_links_from ON links(from_id);
CREATE INDEX IF NOT EXISTS idx_links_to ON links(to_id);

-- Append-only access ledger, written only when a session is active.
CREATE TABLE IF NOT EXISTS access_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    session INTEGER NOT NULL,
    op TEXT NOT NULL,
    doc_id TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_access_log_session ON access_log(session);

-- Schema metadata
CREATE TABLE IF NOT EXISTS kb_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO kb_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
