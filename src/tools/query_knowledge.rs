use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct QueryKnowledgeParams {
    #[schemars(description = "A single read-only SELECT (or WITH) statement over the documents, links, and access_log tables")]
    pub sql: String,
}
