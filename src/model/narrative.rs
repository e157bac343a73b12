use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Success response of `/api/counter-narrative`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CounterNarrativeResponse {
    pub narrative: String,
    pub raw_prompt: String,
    pub raw_response: String,
}
