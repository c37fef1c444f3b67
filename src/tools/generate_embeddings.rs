use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GenerateEmbeddingsParams {
    #[schemars(description = "Restrict the run to these document ids")]
    pub ids: Option<Vec<String>>,

    #[schemars(description = "Re-embed documents that already have a vector. Defaults to false.")]
    pub regenerate: Option<bool>,

    #[schemars(description = "Documents per provider call. Defaults to 32.")]
    pub batch_size: Option<usize>,
}
