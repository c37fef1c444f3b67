//! Directed link graph between documents.
//!
//! Links are (from, to, type) triples with no foreign keys. Creation
//! validates both endpoints, but links can dangle afterwards (external
//! edits, partial imports) and every reader tolerates that.

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::kb::error::{KbError, Result};
use crate::kb::{ledger, now_rfc3339};

/// Result returned from an add_link operation.
#[derive(Debug, Serialize)]
pub struct AddLinkResult {
    pub from_id: String,
    pub to_id: String,
    pub link_type: String,
    /// `false` if this exact triple already existed (idempotent no-op).
    pub created: bool,
}

/// A neighbor of a document in the link graph.
#[derive(Debug, Serialize)]
pub struct RelatedDoc {
    pub id: String,
    pub link_type: String,
    pub direction: LinkDirection,
    /// None when the endpoint no longer resolves to a document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkDirection {
    Outgoing,
    Incoming,
}

/// Create a directed link between two existing documents.
///
/// Self-links are rejected. Storing the same (from, to, type) triple twice
/// is idempotent.
pub fn add_link(
    conn: &Connection,
    from_id: &str,
    to_id: &str,
    link_type: &str,
) -> Result<AddLinkResult> {
    if from_id == to_id {
        return Err(KbError::Validation(format!(
            "cannot link document to itself: {from_id}"
        )));
    }
    let link_type = if link_type.trim().is_empty() {
        "related"
    } else {
        link_type.trim()
    };

    validate_exists(conn, from_id)?;
    validate_exists(conn, to_id)?;

    let existing: Option<String> = conn
        .query_row(
            "SELECT from_id FROM links \
             WHERE from_id = ?1 AND to_id = ?2 AND link_type = ?3",
            params![from_id, to_id, link_type],
            |row| row.get(0),
        )
        .optional()?;

    if existing.is_some() {
        return Ok(AddLinkResult {
            from_id: from_id.to_string(),
            to_id: to_id.to_string(),
            link_type: link_type.to_string(),
            created: false,
        });
    }

    conn.execute(
        "INSERT INTO links (from_id, to_id, link_type, created) VALUES (?1, ?2, ?3, ?4)",
        params![from_id, to_id, link_type, now_rfc3339()],
    )?;

    ledger::log_access(conn, "link", &[from_id, to_id]);

    Ok(AddLinkResult {
        from_id: from_id.to_string(),
        to_id: to_id.to_string(),
        link_type: link_type.to_string(),
        created: true,
    })
}

/// All neighbors of a document, both directions. Dangling endpoints come
/// back with `title: None` rather than being dropped.
pub fn get_related(conn: &Connection, id: &str) -> Result<Vec<RelatedDoc>> {
    let mut related = Vec::new();

    let mut stmt = conn.prepare(
        "SELECT l.to_id, l.link_type, d.title, d.category \
         FROM links l LEFT JOIN documents d ON d.id = l.to_id \
         WHERE l.from_id = ?1 ORDER BY l.created",
    )?;
    let outgoing = stmt.query_map(params![id], |row| {
        Ok(RelatedDoc {
            id: row.get(0)?,
            link_type: row.get(1)?,
            direction: LinkDirection::Outgoing,
            title: row.get(2)?,
            category: row.get(3)?,
        })
    })?;
    for r in outgoing {
        related.push(r?);
    }

    let mut stmt = conn.prepare(
        "SELECT l.from_id, l.link_type, d.title, d.category \
         FROM links l LEFT JOIN documents d ON d.id = l.from_id \
         WHERE l.to_id = ?1 ORDER BY l.created",
    )?;
    let incoming = stmt.query_map(params![id], |row| {
        Ok(RelatedDoc {
            id: row.get(0)?,
            link_type: row.get(1)?,
            direction: LinkDirection::Incoming,
            title: row.get(2)?,
            category: row.get(3)?,
        })
    })?;
    for r in incoming {
        related.push(r?);
    }

    ledger::log_access(conn, "related", &[id]);
    Ok(related)
}

/// Remove every link touching `id`, both directions. Returns the count.
/// Runs inside the caller's transaction during cascade delete.
pub fn remove_links_for(conn: &Connection, id: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM links WHERE from_id = ?1 OR to_id = ?1",
        params![id],
    )
}

fn validate_exists(conn: &Connection, id: &str) -> Result<()> {
    let found: Option<String> = conn
        .query_row(
            "SELECT id FROM documents WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    match found {
        Some(_) => Ok(()),
        None => Err(KbError::NotFound(id.to_string())),
    }
}
