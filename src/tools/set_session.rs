use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SetSessionParams {
    #[schemars(description = "Session number to tag access-ledger rows with. Omit to stop ledger recording.")]
    pub session: Option<i64>,
}
