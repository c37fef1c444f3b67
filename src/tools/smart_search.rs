use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SmartSearchParams {
    #[schemars(description = "Natural language query")]
    pub query: String,

    #[schemars(description = "Only documents in this category")]
    pub category: Option<String>,

    #[schemars(description = "Only documents carrying any of these tags")]
    pub tags: Option<Vec<String>>,

    #[schemars(description = "Only documents updated strictly after this RFC 3339 timestamp")]
    pub updated_after: Option<String>,

    #[schemars(description = "Minimum similarity score, exclusive. Defaults to the configured threshold (0.6).")]
    pub threshold: Option<f64>,

    #[schemars(description = "Maximum results. Defaults to 10.")]
    pub limit: Option<usize>,
}
