use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DeleteKnowledgeParams {
    #[schemars(description = "Document id to delete. Links touching it are removed as well.")]
    pub id: String,
}
