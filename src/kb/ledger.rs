//! Access ledger — append-only usage log gated on an active session.
//!
//! A session number is process-global state set by the `set_session` tool.
//! While no session is active every log call is a silent no-op, so casual
//! reads leave no trace; once a session is set, every operation records the
//! document ids it touched.

use rusqlite::{params, Connection};
use std::sync::Mutex;

static CURRENT_SESSION: Mutex<Option<i64>> = Mutex::new(None);

/// Activate ledger writes for the given session number.
pub fn set_session(session: i64) {
    *lock_session() = Some(session);
}

/// Deactivate ledger writes.
pub fn clear_session() {
    *lock_session() = None;
}

/// The currently active session, if any.
pub fn current_session() -> Option<i64> {
    *lock_session()
}

fn lock_session() -> std::sync::MutexGuard<'static, Option<i64>> {
    match CURRENT_SESSION.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Record one ledger row per touched document id. No-op when no session
/// is active. Ledger failures are logged and swallowed so they can never
/// fail the operation they annotate.
pub fn log_access(conn: &Connection, op: &str, ids: &[&str]) {
    let Some(session) = current_session() else {
        return;
    };

    let now = super::now_rfc3339();
    for id in ids {
        if let Err(e) = conn.execute(
            "INSERT INTO access_log (timestamp, session, op, doc_id) VALUES (?1, ?2, ?3, ?4)",
            params![now, session, op, id],
        ) {
            tracing::warn!(op, doc_id = id, error = %e, "failed to write access log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    // Session state is process-global; serialize tests that touch it.
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn no_session_means_no_rows() {
        let _guard = TEST_LOCK.lock().unwrap();
        let conn = db::open_memory_database().unwrap();
        clear_session();

        log_access(&conn, "get", &["doc-a"]);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM access_log", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn active_session_records_each_id() {
        let _guard = TEST_LOCK.lock().unwrap();
        let conn = db::open_memory_database().unwrap();
        set_session(7);

        log_access(&conn, "search", &["doc-a", "doc-b"]);

        let rows: Vec<(i64, String, String)> = conn
            .prepare("SELECT session, op, doc_id FROM access_log ORDER BY id")
            .unwrap()
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        clear_session();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], (7, "search".to_string(), "doc-a".to_string()));
        assert_eq!(rows[1], (7, "search".to_string(), "doc-b".to_string()));
    }
}
