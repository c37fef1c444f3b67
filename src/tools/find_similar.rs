use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct FindSimilarParams {
    #[schemars(description = "Natural language query to match against document embeddings")]
    pub query: String,

    #[schemars(description = "Restrict results to this category")]
    pub category: Option<String>,

    #[schemars(description = "Minimum similarity score, exclusive. Defaults to the configured threshold (0.6).")]
    pub threshold: Option<f64>,

    #[schemars(description = "Maximum results. Defaults to 10.")]
    pub limit: Option<usize>,
}
