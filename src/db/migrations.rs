//! Forward-only schema migrations, versioned through `kb_meta`.
//!
//! Also home to the small `kb_meta` accessors the rest of the crate uses
//! for the embedding model name and the locked vector dimension.

use rusqlite::Connection;

/// Schema version this binary was built against.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    let stored = get_meta(conn, "schema_version")?;
    Ok(stored.and_then(|v| v.parse().ok()).unwrap_or(0))
}

pub fn get_embedding_model(conn: &Connection) -> rusqlite::Result<Option<String>> {
    get_meta(conn, "embedding_model")
}

pub fn set_embedding_model(conn: &Connection, model: &str) -> rusqlite::Result<()> {
    set_meta(conn, "embedding_model", model)
}

/// The dimension recorded when the first vector was written, if any.
pub fn get_embedding_dim(conn: &Connection) -> rusqlite::Result<Option<usize>> {
    Ok(get_meta(conn, "embedding_dim")?.and_then(|v| v.parse().ok()))
}

pub fn set_embedding_dim(conn: &Connection, dim: usize) -> rusqlite::Result<()> {
    set_meta(conn, "embedding_dim", &dim.to_string())
}

fn get_meta(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    use rusqlite::OptionalExtension;
    conn.query_row("SELECT value FROM kb_meta WHERE key = ?1", [key], |row| {
        row.get(0)
    })
    .optional()
}

fn set_meta(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO kb_meta (key, value) VALUES (?1, ?2)",
        [key, value],
    )?;
    Ok(())
}

/// Bring the database up to [`CURRENT_SCHEMA_VERSION`], one step at a time.
pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    let version = get_schema_version(conn)?;
    for target in (version + 1)..=CURRENT_SCHEMA_VERSION {
        tracing::info!(from = target - 1, to = target, "running migration");
        if !apply_migration(conn, target)? {
            tracing::error!(version = target, "unknown migration target");
            break;
        }
        set_meta(conn, "schema_version", &target.to_string())?;
    }
    Ok(())
}

/// Returns false for unknown targets. New steps register here as the
/// schema evolves past v1.
fn apply_migration(_conn: &Connection, _target: u32) -> rusqlite::Result<bool> {
    Ok(false)
}
