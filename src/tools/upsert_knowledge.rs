use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct UpsertKnowledgeParams {
    #[schemars(description = "Stable kebab-case identifier, e.g. 'deploy-staging-runbook'. Reusing an id replaces that document's fields.")]
    pub id: String,

    #[schemars(description = "Category the document belongs to, e.g. 'howto', 'design', 'reference'")]
    pub category: String,

    #[schemars(description = "Human-readable title")]
    pub title: String,

    #[schemars(description = "Tags for filtering. Normalized to lowercase.")]
    pub tags: Option<Vec<String>>,

    #[schemars(description = "Markdown content of the document")]
    pub content: String,

    #[schemars(description = "Optional JSON object with arbitrary extra fields")]
    pub metadata: Option<serde_json::Value>,

    #[schemars(description = "Generate an embedding for semantic search. Defaults to true. If generation fails the document is still stored.")]
    pub generate_embedding: Option<bool>,
}
