//! SQLite connection management.
//!
//! Every connection is opened through this module so the sqlite-vec
//! extension is registered before anything touches the schema.

pub mod migrations;
pub mod schema;

use std::path::Path;
use std::sync::Once;

use anyhow::{Context, Result};
use rusqlite::Connection;
use sqlite_vec::sqlite3_vec_init;

static VEC_EXTENSION: Once = Once::new();

/// Register sqlite-vec as an auto extension. Idempotent.
pub fn load_sqlite_vec() {
    VEC_EXTENSION.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite3_vec_init as *const (),
        )));
    });
}

fn prepare(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    schema::init_schema(conn).context("failed to initialize schema")?;
    migrations::run_migrations(conn).context("failed to run migrations")?;
    Ok(())
}

/// Open the store at `path`, creating the file, its parent directory, and
/// the schema as needed.
pub fn open_database(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    load_sqlite_vec();
    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    // WAL keeps readers unblocked while the single writer commits.
    conn.pragma_update(None, "journal_mode", "WAL")?;
    prepare(&conn)?;

    tracing::info!(path = %path.display(), "database ready");
    Ok(conn)
}

/// In-memory store for unit tests.
#[cfg(test)]
pub fn open_memory_database() -> Result<Connection> {
    load_sqlite_vec();
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    prepare(&conn)?;
    Ok(conn)
}
