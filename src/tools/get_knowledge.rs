use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GetKnowledgeParams {
    #[schemars(description = "Document id to fetch")]
    pub id: String,

    #[schemars(description = "Include linked documents (both directions). Defaults to false.")]
    pub include_related: Option<bool>,
}
