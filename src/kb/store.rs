//! Document write path — upsert, embedding attachment, delete.
//!
//! [`upsert`] is the single entry point for writes. The structured fields
//! commit in one transaction; embedding generation runs afterwards so a
//! provider failure can never roll back the document (partial success).

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::migrations;
use crate::embedding::{document_embedding_text, EmbeddingProvider};
use crate::kb::error::{KbError, Result};
use crate::kb::types::{normalize_tags, Document, UpsertInput, UpsertOutcome, UpsertResult};
use crate::kb::{embedding_to_bytes, ledger, now_rfc3339};

/// Result returned from a delete operation.
#[derive(Debug, serde::Serialize)]
pub struct DeleteResult {
    pub id: String,
    /// Links removed by the cascade, counting both directions.
    pub links_removed: usize,
}

/// Fetch a document by id. Records a ledger entry when found.
pub fn get(conn: &Connection, id: &str) -> Result<Option<Document>> {
    let doc = fetch(conn, id)?;
    if doc.is_some() {
        ledger::log_access(conn, "get", &[id]);
    }
    Ok(doc)
}

/// Fetch without touching the ledger. Internal read used by writes.
pub(crate) fn fetch(conn: &Connection, id: &str) -> Result<Option<Document>> {
    let doc = conn
        .query_row(
            "SELECT id, category, title, tags, content, metadata, \
             embedding IS NOT NULL, created, updated \
             FROM documents WHERE id = ?1",
            params![id],
            row_to_document,
        )
        .optional()?;
    Ok(doc)
}

/// Fetch a document's raw embedding vector, if one is stored.
pub fn get_embedding(conn: &Connection, id: &str) -> Result<Option<Vec<f32>>> {
    let blob: Option<Option<Vec<u8>>> = conn
        .query_row(
            "SELECT embedding FROM documents WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    match blob {
        None => Err(KbError::NotFound(id.to_string())),
        Some(None) => Ok(None),
        Some(Some(bytes)) => Ok(Some(crate::kb::embedding_from_bytes(&bytes))),
    }
}

pub(crate) fn row_to_document(row: &Row) -> rusqlite::Result<Document> {
    let tags_json: String = row.get(3)?;
    let metadata_json: String = row.get(5)?;
    Ok(Document {
        id: row.get(0)?,
        category: row.get(1)?,
        title: row.get(2)?,
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
        content: row.get(4)?,
        metadata: serde_json::from_str(&metadata_json)
            .unwrap_or(serde_json::Value::Object(Default::default())),
        has_embedding: row.get(6)?,
        created: row.get(7)?,
        updated: row.get(8)?,
    })
}

/// Full write path: validate → transactional structured write → commit →
/// embedding generation via the provider, when one is given.
///
/// `created` is set exactly once; `updated` never moves backwards even if
/// the wall clock does.
pub fn upsert(
    conn: &mut Connection,
    input: &UpsertInput,
    embedder: Option<&dyn EmbeddingProvider>,
) -> Result<UpsertResult> {
    let id = input.id.trim().to_string();
    if id.is_empty() {
        return Err(KbError::Validation("id must not be empty".into()));
    }
    if input.category.trim().is_empty() {
        return Err(KbError::Validation("category must not be empty".into()));
    }
    if input.title.trim().is_empty() {
        return Err(KbError::Validation("title must not be empty".into()));
    }
    if !input.metadata.is_object() {
        return Err(KbError::Validation("metadata must be a JSON object".into()));
    }

    let tags = normalize_tags(&input.tags);
    let tags_json = serde_json::to_string(&tags)?;
    let metadata_json = serde_json::to_string(&input.metadata)?;

    let tx = conn.transaction()?;

    let existing_updated: Option<String> = tx
        .query_row(
            "SELECT updated FROM documents WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;

    let now = now_rfc3339();
    let updated = match &existing_updated {
        Some(prev) if prev.as_str() > now.as_str() => prev.clone(),
        _ => now.clone(),
    };
    let outcome = if existing_updated.is_some() {
        UpsertOutcome::Updated
    } else {
        UpsertOutcome::Created
    };

    tx.execute(
        "INSERT INTO documents (id, category, title, tags, content, metadata, created, updated) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
         ON CONFLICT(id) DO UPDATE SET \
             category = excluded.category, \
             title = excluded.title, \
             tags = excluded.tags, \
             content = excluded.content, \
             metadata = excluded.metadata, \
             updated = excluded.updated",
        params![
            id,
            input.category,
            input.title,
            tags_json,
            input.content,
            metadata_json,
            now,
            updated,
        ],
    )?;

    let op = match outcome {
        UpsertOutcome::Created => "create",
        UpsertOutcome::Updated => "update",
    };
    ledger::log_access(&tx, op, &[&id]);

    tx.commit()?;

    // Embedding runs after the commit. Failure here degrades the result;
    // it never undoes the structured write.
    let mut embedding_generated = false;
    let mut embedding_error = None;
    if let Some(provider) = embedder {
        let text = document_embedding_text(&input.title, &tags, &input.content);
        match provider.embed(&text) {
            Ok(vector) => {
                set_embedding(conn, &id, &vector)?;
                embedding_generated = true;
            }
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "embedding failed; document stored without vector");
                embedding_error = Some(e.to_string());
            }
        }
    }

    let document = fetch(conn, &id)?.ok_or_else(|| KbError::NotFound(id.clone()))?;

    Ok(UpsertResult {
        outcome,
        document,
        embedding_generated,
        embedding_error,
    })
}

/// Attach (or replace) a document's embedding vector. Bumps `updated`,
/// leaves `created` alone. The vector length must match the dimension the
/// database was first written with.
pub fn set_embedding(conn: &mut Connection, id: &str, vector: &[f32]) -> Result<()> {
    if vector.is_empty() {
        return Err(KbError::Validation("embedding must not be empty".into()));
    }

    let tx = conn.transaction()?;

    match migrations::get_embedding_dim(&tx)? {
        Some(dim) if dim != vector.len() => {
            return Err(KbError::Validation(format!(
                "embedding dimension mismatch: database uses {dim}, got {}",
                vector.len()
            )));
        }
        Some(_) => {}
        None => migrations::set_embedding_dim(&tx, vector.len())?,
    }

    let prev: Option<String> = tx
        .query_row(
            "SELECT updated FROM documents WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    let Some(prev) = prev else {
        return Err(KbError::NotFound(id.to_string()));
    };

    let now = now_rfc3339();
    let updated = if prev.as_str() > now.as_str() { prev } else { now };

    tx.execute(
        "UPDATE documents SET embedding = ?1, updated = ?2 WHERE id = ?3",
        params![embedding_to_bytes(vector), updated, id],
    )?;

    tx.commit()?;
    Ok(())
}

/// Delete a document and cascade away its links in both directions.
pub fn delete(conn: &mut Connection, id: &str) -> Result<DeleteResult> {
    let tx = conn.transaction()?;

    let exists: Option<String> = tx
        .query_row(
            "SELECT id FROM documents WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    if exists.is_none() {
        return Err(KbError::NotFound(id.to_string()));
    }

    tx.execute("DELETE FROM documents WHERE id = ?1", params![id])?;
    let links_removed = crate::kb::links::remove_links_for(&tx, id)?;
    ledger::log_access(&tx, "delete", &[id]);

    tx.commit()?;

    Ok(DeleteResult {
        id: id.to_string(),
        links_removed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn test_db() -> Connection {
        db::open_memory_database().unwrap()
    }

    fn input(id: &str) -> UpsertInput {
        UpsertInput {
            id: id.to_string(),
            category: "howto".to_string(),
            title: "Deploy the staging stack".to_string(),
            tags: vec!["Deploy".to_string(), "staging".to_string()],
            content: "Run the pipeline, then verify health checks.".to_string(),
            metadata: serde_json::json!({}),
        }
    }

    struct StubEmbedder {
        dim: usize,
        fail: bool,
    }

    impl EmbeddingProvider for StubEmbedder {
        fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
            if self.fail {
                anyhow::bail!("provider offline");
            }
            let mut v = vec![0.0f32; self.dim];
            v[0] = 1.0;
            Ok(v)
        }

        fn dimensions(&self) -> usize {
            self.dim
        }
    }

    #[test]
    fn upsert_creates_then_updates() {
        let mut conn = test_db();

        let r1 = upsert(&mut conn, &input("deploy-staging"), None).unwrap();
        assert_eq!(r1.outcome, UpsertOutcome::Created);
        assert_eq!(r1.document.tags, vec!["deploy", "staging"]);
        assert!(!r1.document.has_embedding);

        let mut changed = input("deploy-staging");
        changed.content = "Updated runbook.".to_string();
        let r2 = upsert(&mut conn, &changed, None).unwrap();
        assert_eq!(r2.outcome, UpsertOutcome::Updated);
        assert_eq!(r2.document.content, "Updated runbook.");
        // created is immutable, updated moves forward
        assert_eq!(r2.document.created, r1.document.created);
        assert!(r2.document.updated >= r1.document.updated);
    }

    #[test]
    fn upsert_stores_duplicate_tags_verbatim() {
        let mut conn = test_db();
        let mut doc = input("doc-a");
        doc.tags = vec!["rust".to_string(), "rust".to_string()];

        let r = upsert(&mut conn, &doc, None).unwrap();
        assert_eq!(r.document.tags, vec!["rust", "rust"]);

        let stored = get(&conn, "doc-a").unwrap().unwrap();
        assert_eq!(stored.tags, vec!["rust", "rust"]);
    }

    #[test]
    fn upsert_rejects_blank_id() {
        let mut conn = test_db();
        let mut bad = input("  ");
        bad.id = "   ".to_string();
        let err = upsert(&mut conn, &bad, None).unwrap_err();
        assert!(matches!(err, KbError::Validation(_)));
    }

    #[test]
    fn upsert_with_embedder_stores_vector() {
        let mut conn = test_db();
        let embedder = StubEmbedder { dim: 8, fail: false };

        let r = upsert(&mut conn, &input("doc-a"), Some(&embedder)).unwrap();
        assert!(r.embedding_generated);
        assert!(r.embedding_error.is_none());
        assert!(r.document.has_embedding);

        let vector = get_embedding(&conn, "doc-a").unwrap().unwrap();
        assert_eq!(vector.len(), 8);
    }

    #[test]
    fn embedding_failure_is_partial_success() {
        let mut conn = test_db();
        let embedder = StubEmbedder { dim: 8, fail: true };

        let r = upsert(&mut conn, &input("doc-a"), Some(&embedder)).unwrap();
        assert!(!r.embedding_generated);
        assert!(r.embedding_error.is_some());
        // The structured write committed anyway
        let doc = get(&conn, "doc-a").unwrap().unwrap();
        assert!(!doc.has_embedding);
    }

    #[test]
    fn upsert_preserves_existing_embedding() {
        let mut conn = test_db();
        let embedder = StubEmbedder { dim: 8, fail: false };
        upsert(&mut conn, &input("doc-a"), Some(&embedder)).unwrap();

        // Re-upsert without an embedder: the stored vector must survive
        let mut changed = input("doc-a");
        changed.title = "New title".to_string();
        let r = upsert(&mut conn, &changed, None).unwrap();
        assert!(r.document.has_embedding);
    }

    #[test]
    fn set_embedding_rejects_dimension_mismatch() {
        let mut conn = test_db();
        upsert(&mut conn, &input("doc-a"), None).unwrap();
        upsert(&mut conn, &input("doc-b"), None).unwrap();

        set_embedding(&mut conn, "doc-a", &[1.0, 0.0, 0.0]).unwrap();
        let err = set_embedding(&mut conn, "doc-b", &[1.0, 0.0]).unwrap_err();
        assert!(matches!(err, KbError::Validation(_)));
    }

    #[test]
    fn set_embedding_unknown_id_is_not_found() {
        let mut conn = test_db();
        let err = set_embedding(&mut conn, "ghost", &[1.0]).unwrap_err();
        assert!(matches!(err, KbError::NotFound(_)));
    }

    #[test]
    fn delete_cascades_links() {
        let mut conn = test_db();
        upsert(&mut conn, &input("doc-a"), None).unwrap();
        upsert(&mut conn, &input("doc-b"), None).unwrap();
        upsert(&mut conn, &input("doc-c"), None).unwrap();
        crate::kb::links::add_link(&conn, "doc-a", "doc-b", "related").unwrap();
        crate::kb::links::add_link(&conn, "doc-c", "doc-a", "references").unwrap();

        let r = delete(&mut conn, "doc-a").unwrap();
        assert_eq!(r.links_removed, 2);

        assert!(get(&conn, "doc-a").unwrap().is_none());
        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM links", [], |r| r.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[test]
    fn delete_unknown_id_is_not_found() {
        let mut conn = test_db();
        let err = delete(&mut conn, "ghost").unwrap_err();
        assert!(matches!(err, KbError::NotFound(_)));
    }

    #[test]
    fn get_returns_none_for_missing() {
        let conn = test_db();
        assert!(get(&conn, "missing").unwrap().is_none());
    }
}
