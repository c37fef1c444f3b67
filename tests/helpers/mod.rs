#![allow(dead_code)]

use rusqlite::Connection;
use tome::db;
use tome::embedding::EmbeddingProvider;
use tome::kb::store;
use tome::kb::types::UpsertInput;

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    db::load_sqlite_vec();
    let conn = Connection::open_in_memory().unwrap();
    conn.pragma_update(None, "foreign_keys", "ON").unwrap();
    db::schema::init_schema(&conn).unwrap();
    db::migrations::run_migrations(&conn).unwrap();
    conn
}

/// Deterministic 8-dim embedding with a spike at position `seed`.
/// Distinct seeds produce orthogonal vectors (cosine similarity 0).
pub fn test_embedding(seed: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; 8];
    v[seed % 8] = 1.0;
    v
}

/// An embedding pointing mostly at `seed` with a small component elsewhere.
/// High but not perfect cosine similarity to `test_embedding(seed)`.
pub fn near_embedding(seed: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; 8];
    v[seed % 8] = 1.0;
    v[(seed + 1) % 8] = 0.2;
    v
}

/// Insert a document through the full write path, without an embedder.
pub fn insert_doc(conn: &mut Connection, id: &str, category: &str, tags: &[&str], content: &str) {
    store::upsert(
        conn,
        &UpsertInput {
            id: id.to_string(),
            category: category.to_string(),
            title: format!("Title for {id}"),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            content: content.to_string(),
            metadata: serde_json::json!({}),
        },
        None,
    )
    .unwrap();
}

/// Insert a document and attach a spike embedding in one step.
pub fn insert_doc_with_embedding(
    conn: &mut Connection,
    id: &str,
    category: &str,
    content: &str,
    seed: usize,
) {
    insert_doc(conn, id, category, &[], content);
    store::set_embedding(conn, id, &test_embedding(seed)).unwrap();
}

/// Embedding provider stub producing spike vectors from text length.
pub struct StubProvider {
    pub dim: usize,
}

impl EmbeddingProvider for StubProvider {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let mut v = vec![0.0f32; self.dim];
        v[text.len() % self.dim] = 1.0;
        Ok(v)
    }

    fn dimensions(&self) -> usize {
        self.dim
    }
}
