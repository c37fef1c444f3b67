//! Batch embedding generation and backfill.
//!
//! Walks documents missing a vector (or all of them with `regenerate`),
//! embeds their composed text in batches, and attaches vectors one by one.
//! A failed batch is counted and skipped; it never aborts the run.

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use serde::Serialize;

use crate::embedding::{document_embedding_text, EmbeddingProvider};
use crate::kb::error::Result;
use crate::kb::store;

/// Default number of documents embedded per provider call.
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Summary of a batch embedding run.
#[derive(Debug, Serialize)]
pub struct EmbedBatchSummary {
    /// Documents considered for embedding.
    pub scanned: usize,
    /// Documents that received a new vector.
    pub updated: usize,
    /// Documents whose batch failed at the provider.
    pub failed: usize,
}

struct PendingDoc {
    id: String,
    text: String,
}

/// Generate embeddings for documents that need them.
///
/// `ids` restricts the run to specific documents; `regenerate` includes
/// documents that already have a vector. `progress` is invoked with the
/// size of each completed batch.
pub fn generate_embeddings(
    conn: &mut Connection,
    provider: &dyn EmbeddingProvider,
    ids: Option<&[String]>,
    regenerate: bool,
    batch_size: usize,
    mut progress: impl FnMut(usize),
) -> Result<EmbedBatchSummary> {
    let pending = select_pending(conn, ids, regenerate)?;
    let batch_size = batch_size.max(1);

    let mut summary = EmbedBatchSummary {
        scanned: pending.len(),
        updated: 0,
        failed: 0,
    };

    for chunk in pending.chunks(batch_size) {
        let texts: Vec<&str> = chunk.iter().map(|d| d.text.as_str()).collect();
        match provider.embed_batch(&texts) {
            Ok(vectors) => {
                for (doc, vector) in chunk.iter().zip(vectors.iter()) {
                    store::set_embedding(conn, &doc.id, vector)?;
                    summary.updated += 1;
                }
            }
            Err(e) => {
                tracing::warn!(batch_len = chunk.len(), error = %e, "embedding batch failed, skipping");
                summary.failed += chunk.len();
            }
        }
        progress(chunk.len());
    }

    Ok(summary)
}

fn select_pending(
    conn: &Connection,
    ids: Option<&[String]>,
    regenerate: bool,
) -> Result<Vec<PendingDoc>> {
    let mut clauses: Vec<String> = Vec::new();
    let mut params: Vec<Value> = Vec::new();

    if !regenerate {
        clauses.push("embedding IS NULL".to_string());
    }
    if let Some(ids) = ids {
        let mut placeholders = Vec::new();
        for id in ids {
            params.push(Value::Text(id.clone()));
            placeholders.push(format!("?{}", params.len()));
        }
        clauses.push(format!("id IN ({})", placeholders.join(", ")));
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    let sql = format!(
        "SELECT id, title, tags, content FROM documents {where_sql} ORDER BY id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let docs = stmt
        .query_map(params_from_iter(params), |row| {
            let id: String = row.get(0)?;
            let title: String = row.get(1)?;
            let tags_json: String = row.get(2)?;
            let content: String = row.get(3)?;
            Ok((id, title, tags_json, content))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(docs
        .into_iter()
        .map(|(id, title, tags_json, content)| {
            let tags: Vec<String> = serde_json::from_str(&tags_json).unwrap_or_default();
            PendingDoc {
                id,
                text: document_embedding_text(&title, &tags, &content),
            }
        })
        .collect())
}
