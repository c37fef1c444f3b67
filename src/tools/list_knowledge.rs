use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListKnowledgeParams {
    #[schemars(description = "Only documents in this category")]
    pub category: Option<String>,

    #[schemars(description = "Only documents carrying any of these tags")]
    pub tags: Option<Vec<String>>,

    #[schemars(description = "Only documents updated strictly after this RFC 3339 timestamp")]
    pub updated_after: Option<String>,

    #[schemars(description = "Case-insensitive substring match over title and content")]
    pub text: Option<String>,

    #[schemars(description = "Maximum documents to return. Defaults to 50.")]
    pub limit: Option<usize>,

    #[schemars(description = "Documents to skip, for paging. Defaults to 0.")]
    pub offset: Option<usize>,
}
