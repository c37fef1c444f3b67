//! Core document types shared across the engine.

use serde::{Deserialize, Serialize};

/// A knowledge document as stored. The embedding vector itself is never
/// carried here; `has_embedding` reports its presence.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub id: String,
    pub category: String,
    pub title: String,
    pub tags: Vec<String>,
    pub content: String,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
    pub has_embedding: bool,
    pub created: String,
    pub updated: String,
}

/// Caller-supplied fields for an upsert. The id is caller-assigned and
/// stable; everything else is the full replacement value for that field.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertInput {
    pub id: String,
    pub category: String,
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub content: String,
    #[serde(default = "empty_object")]
    pub metadata: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::json!({})
}

/// Whether an upsert created a new document or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// Result of an upsert, including the embedding side-effect status.
/// `embedding_error` is populated when embedding was requested but failed;
/// the structured write has still committed.
#[derive(Debug, Serialize)]
pub struct UpsertResult {
    pub outcome: UpsertOutcome,
    pub document: Document,
    pub embedding_generated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_error: Option<String>,
}

/// Normalize a tag list: trim, lowercase, drop empties, preserve order.
/// Duplicates are kept; tag hygiene is the caller's convention, not an
/// engine rule.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_tags_trims_lowercases_and_drops_empties() {
        let tags = vec![
            "Rust".to_string(),
            " SQLite ".to_string(),
            "".to_string(),
            "  ".to_string(),
        ];
        assert_eq!(normalize_tags(&tags), vec!["rust", "sqlite"]);
    }

    #[test]
    fn normalize_tags_keeps_duplicates() {
        let tags = vec!["Rust".to_string(), " rust ".to_string()];
        assert_eq!(normalize_tags(&tags), vec!["rust", "rust"]);
    }

    #[test]
    fn normalize_tags_preserves_order() {
        let tags = vec!["zebra".to_string(), "apple".to_string()];
        assert_eq!(normalize_tags(&tags), vec!["zebra", "apple"]);
    }
}
