//! Read path — structured filtering, vector similarity, hybrid search,
//! and the read-only raw query escape hatch.
//!
//! All query builders are parameterized; user values never interpolate
//! into SQL text. Similarity uses the sqlite-vec cosine distance over the
//! stored f32 blobs, reported as `score = 1.0 - distance` so higher is
//! more similar. The threshold cutoff is strict: a hit must score
//! strictly above it.

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use serde::Serialize;

use crate::db::migrations;
use crate::kb::error::{KbError, Result};
use crate::kb::types::Document;
use crate::kb::{embedding_to_bytes, ledger, store};

/// Characters of content carried in a search hit preview.
const PREVIEW_CHARS: usize = 300;

/// Structured predicates, combined conjunctively. All fields optional;
/// an empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct FilterQuery {
    pub category: Option<String>,
    /// Match documents carrying any of these tags.
    pub tags: Vec<String>,
    /// Strictly-after cutoff on `updated` (RFC 3339).
    pub updated_after: Option<String>,
    /// Case-insensitive substring over title and content.
    pub text: Option<String>,
}

/// A single similarity or hybrid search hit.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub category: String,
    pub title: String,
    pub tags: Vec<String>,
    pub score: f64,
    pub preview: String,
    pub updated: String,
}

/// List documents matching the filter, newest first.
pub fn filter_documents(
    conn: &Connection,
    filter: &FilterQuery,
    limit: usize,
    offset: usize,
) -> Result<Vec<Document>> {
    let mut clauses: Vec<String> = Vec::new();
    let mut params: Vec<Value> = Vec::new();
    push_filter_clauses(filter, &mut clauses, &mut params);

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    params.push(Value::Integer(limit as i64));
    let limit_idx = params.len();
    params.push(Value::Integer(offset as i64));
    let offset_idx = params.len();

    let sql = format!(
        "SELECT id, category, title, tags, content, metadata, \
         embedding IS NOT NULL, created, updated \
         FROM documents {where_sql} \
         ORDER BY updated DESC LIMIT ?{limit_idx} OFFSET ?{offset_idx}"
    );

    let mut stmt = conn.prepare(&sql)?;
    let docs = stmt
        .query_map(params_from_iter(params), store::row_to_document)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
    ledger::log_access(conn, "list", &ids);

    Ok(docs)
}

/// Pure vector similarity over embedded documents, best first.
///
/// Only documents with stored embeddings participate; hits must score
/// strictly above `threshold`.
pub fn similar(
    conn: &Connection,
    query: &[f32],
    category: Option<&str>,
    threshold: f64,
    limit: usize,
) -> Result<Vec<SearchHit>> {
    check_query_dim(conn, query)?;

    let mut clauses = vec![
        "embedding IS NOT NULL".to_string(),
        "(1.0 - vec_distance_cosine(embedding, ?1)) > ?2".to_string(),
    ];
    let mut params: Vec<Value> = vec![
        Value::Blob(embedding_to_bytes(query).to_vec()),
        Value::Real(threshold),
    ];

    if let Some(cat) = category {
        params.push(Value::Text(cat.to_string()));
        clauses.push(format!("category = ?{}", params.len()));
    }

    params.push(Value::Integer(limit as i64));
    let limit_idx = params.len();

    let sql = format!(
        "SELECT id, category, title, tags, content, updated, \
         (1.0 - vec_distance_cosine(embedding, ?1)) AS score \
         FROM documents WHERE {} \
         ORDER BY score DESC LIMIT ?{limit_idx}",
        clauses.join(" AND ")
    );

    run_hit_query(conn, &sql, params)
}

/// Hybrid search: structured predicates AND the similarity cutoff, ordered
/// by score with recency as tiebreaker.
pub fn hybrid_search(
    conn: &Connection,
    query: &[f32],
    filter: &FilterQuery,
    threshold: f64,
    limit: usize,
) -> Result<Vec<SearchHit>> {
    check_query_dim(conn, query)?;

    let mut clauses = vec![
        "embedding IS NOT NULL".to_string(),
        "(1.0 - vec_distance_cosine(embedding, ?1)) > ?2".to_string(),
    ];
    let mut params: Vec<Value> = vec![
        Value::Blob(embedding_to_bytes(query).to_vec()),
        Value::Real(threshold),
    ];
    push_filter_clauses(filter, &mut clauses, &mut params);

    params.push(Value::Integer(limit as i64));
    let limit_idx = params.len();

    let sql = format!(
        "SELECT id, category, title, tags, content, updated, \
         (1.0 - vec_distance_cosine(embedding, ?1)) AS score \
         FROM documents WHERE {} \
         ORDER BY score DESC, updated DESC LIMIT ?{limit_idx}",
        clauses.join(" AND ")
    );

    run_hit_query(conn, &sql, params)
}

/// Run a caller-supplied read-only query. Rows come back as JSON objects
/// keyed by column name. Anything that is not a single SELECT (or WITH)
/// statement is rejected before touching the database.
pub fn raw_query(conn: &Connection, sql: &str) -> Result<Vec<serde_json::Value>> {
    let trimmed = sql.trim().trim_end_matches(';').trim();
    if trimmed.is_empty() {
        return Err(KbError::Validation("query must not be empty".into()));
    }
    if trimmed.contains(';') {
        return Err(KbError::Validation(
            "only a single statement is allowed".into(),
        ));
    }
    let first_word = trimmed
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_lowercase();
    if first_word != "select" && first_word != "with" {
        return Err(KbError::Validation(
            "only read-only SELECT queries are allowed".into(),
        ));
    }

    let mut stmt = conn.prepare(trimmed)?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut obj = serde_json::Map::new();
        for (i, name) in columns.iter().enumerate() {
            let value = match row.get_ref(i)? {
                rusqlite::types::ValueRef::Null => serde_json::Value::Null,
                rusqlite::types::ValueRef::Integer(n) => serde_json::Value::from(n),
                rusqlite::types::ValueRef::Real(f) => serde_json::Value::from(f),
                rusqlite::types::ValueRef::Text(t) => {
                    serde_json::Value::String(String::from_utf8_lossy(t).into_owned())
                }
                rusqlite::types::ValueRef::Blob(b) => {
                    serde_json::Value::String(format!("<blob {} bytes>", b.len()))
                }
            };
            obj.insert(name.clone(), value);
        }
        out.push(serde_json::Value::Object(obj));
    }

    Ok(out)
}

/// Truncate content to a character-boundary-safe preview.
pub fn truncate_preview(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        content.to_string()
    } else {
        let truncated: String = content.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Append WHERE clauses for the structured predicates, numbering
/// placeholders after whatever is already in `params`.
fn push_filter_clauses(filter: &FilterQuery, clauses: &mut Vec<String>, params: &mut Vec<Value>) {
    if let Some(ref cat) = filter.category {
        params.push(Value::Text(cat.clone()));
        clauses.push(format!("category = ?{}", params.len()));
    }

    if !filter.tags.is_empty() {
        let mut placeholders = Vec::new();
        for tag in &filter.tags {
            params.push(Value::Text(tag.trim().to_lowercase()));
            placeholders.push(format!("?{}", params.len()));
        }
        clauses.push(format!(
            "EXISTS (SELECT 1 FROM json_each(documents.tags) \
             WHERE json_each.value IN ({}))",
            placeholders.join(", ")
        ));
    }

    if let Some(ref after) = filter.updated_after {
        params.push(Value::Text(after.clone()));
        clauses.push(format!("updated > ?{}", params.len()));
    }

    if let Some(ref text) = filter.text {
        let needle = text.to_lowercase();
        params.push(Value::Text(needle.clone()));
        let title_idx = params.len();
        params.push(Value::Text(needle));
        let content_idx = params.len();
        clauses.push(format!(
            "(INSTR(LOWER(title), ?{title_idx}) > 0 OR INSTR(LOWER(content), ?{content_idx}) > 0)"
        ));
    }
}

/// Reject query vectors whose length differs from the stored dimension.
fn check_query_dim(conn: &Connection, query: &[f32]) -> Result<()> {
    if query.is_empty() {
        return Err(KbError::Validation("query embedding must not be empty".into()));
    }
    if let Some(dim) = migrations::get_embedding_dim(conn)? {
        if dim != query.len() {
            return Err(KbError::Validation(format!(
                "query embedding dimension mismatch: database uses {dim}, got {}",
                query.len()
            )));
        }
    }
    Ok(())
}

fn run_hit_query(conn: &Connection, sql: &str, params: Vec<Value>) -> Result<Vec<SearchHit>> {
    let mut stmt = conn.prepare(sql)?;
    let hits = stmt
        .query_map(params_from_iter(params), |row| {
            let tags_json: String = row.get(3)?;
            let content: String = row.get(4)?;
            Ok(SearchHit {
                id: row.get(0)?,
                category: row.get(1)?,
                title: row.get(2)?,
                tags: serde_json::from_str(&tags_json).unwrap_or_default(),
                preview: truncate_preview(&content, PREVIEW_CHARS),
                updated: row.get(5)?,
                score: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
    ledger::log_access(conn, "search", &ids);

    Ok(hits)
}
