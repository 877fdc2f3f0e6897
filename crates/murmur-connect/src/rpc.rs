//! Push surface consumed by the Task tier.

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use murmur_protocol::rpc::{PushRoomRequest, PushSingleRequest, SuccessReply};
use tracing::debug;

use crate::server::Server;

pub fn router(server: Arc<Server>) -> Router {
    Router::new()
        .route("/rpc/pushSingle", post(push_single))
        .route("/rpc/pushRoom", post(push_room))
        .route("/rpc/pushRoomCount", post(push_room))
        .route("/rpc/pushRoomInfo", post(push_room))
        .with_state(server)
}

async fn push_single(
    State(server): State<Arc<Server>>,
    Json(req): Json<PushSingleRequest>,
) -> Json<SuccessReply> {
    let frame = req.msg.to_string();
    if !server.push_single(req.user_id, &frame) {
        // recipient not on this edge or queue full - both are fine here
        debug!(user_id = req.user_id, "single push not delivered");
    }
    Json(SuccessReply::ok())
}

/// Shared by pushRoom / pushRoomCount / pushRoomInfo - the bodies are
/// identical and the op travels inside `msg`.
async fn push_room(
    State(server): State<Arc<Server>>,
    Json(req): Json<PushRoomRequest>,
) -> Json<SuccessReply> {
    server.broadcast_room(req.room_id, req.msg.to_string()).await;
    Json(SuccessReply::ok())
}
