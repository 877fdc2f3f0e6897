pub mod ai;
pub mod history;
pub mod push;
pub mod user;

use std::sync::Arc;

use axum::Json;
use murmur_broker::Broker;
use murmur_protocol::RPC_CODE_SUCCESS;

use crate::logic_client::LogicClient;
use crate::response::{fail, ApiResponse};

pub struct AppState {
    pub logic: LogicClient,
    pub broker: Arc<dyn Broker>,
    pub ai_jobs_topic: String,
}

/// Resolve the token or produce the fixed failure reply. The message never
/// distinguishes unknown from expired tokens.
pub(crate) async fn require_auth(
    state: &AppState,
    auth_token: &str,
) -> Result<(i64, String), Json<ApiResponse>> {
    if auth_token.is_empty() {
        return Err(fail("auth fail"));
    }
    match state.logic.check_auth(auth_token).await {
        Ok(reply) if reply.code == RPC_CODE_SUCCESS && reply.user_id > 0 => {
            Ok((reply.user_id, reply.user_name))
        }
        _ => Err(fail("auth fail")),
    }
}
