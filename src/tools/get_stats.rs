use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GetStatsParams {
    #[schemars(description = "Include the per-category breakdown and tag leaderboard. Defaults to false.")]
    pub detailed: Option<bool>,
}
