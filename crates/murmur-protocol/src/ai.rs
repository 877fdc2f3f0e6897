use serde::{Deserialize, Serialize};

/// Operation kind shared by jobs and results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiOp {
    Ask,
    Summarize,
    Translate,
}

/// Enrichment request published to `ai.jobs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiJob {
    pub op: AiOp,
    pub room_id: i64,
    pub from_user_id: i64,
    pub from_user_name: String,
    /// The question for `ask`, the text for `translate`, a pre-formatted
    /// transcript (possibly empty) for `summarize`.
    #[serde(default)]
    pub prompt: String,
    /// Target language for `translate`.
    #[serde(default)]
    pub lang: String,
}

/// Worker output published to `ai.results`, keyed `room:<id>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiResult {
    pub room_id: i64,
    pub text: String,
    pub op: AiOp,
    /// Model that actually served the request.
    #[serde(default)]
    pub model: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub err: String,
    /// Optional; Task generates one when absent so history stays idempotent.
    #[serde(default, skip_serializing_if = "id_is_zero")]
    pub client_msg_id: i64,
}

fn id_is_zero(id: &i64) -> bool {
    *id == 0
}
