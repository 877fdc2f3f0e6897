use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Deserialize;

use murmur_protocol::RPC_CODE_SUCCESS;

use crate::handlers::{require_auth, AppState};
use crate::response::{fail, ok, ApiResponse};

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FormHistory {
    pub auth_token: String,
    pub room_id: i64,
    /// Default 100, clamped server-side to 500.
    pub limit: i64,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Json(form): Json<FormHistory>,
) -> Json<ApiResponse> {
    if form.room_id <= 0 {
        return fail("roomId is required");
    }
    if let Err(resp) = require_auth(&state, &form.auth_token).await {
        return resp;
    }
    match state.logic.list_room_messages(form.room_id, form.limit).await {
        Ok(reply) if reply.code == RPC_CODE_SUCCESS => ok("ok", reply.data),
        _ => fail("list history fail"),
    }
}
