use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AddLinkParams {
    #[schemars(description = "Source document id")]
    pub from_id: String,

    #[schemars(description = "Target document id")]
    pub to_id: String,

    #[schemars(description = "Relationship label, e.g. 'related', 'supersedes', 'references'. Defaults to 'related'.")]
    pub link_type: Option<String>,
}
