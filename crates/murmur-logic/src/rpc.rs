//! JSON-over-HTTP surface consumed by the front-end and the edges.

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use murmur_protocol::rpc::{
    CheckAuthReply, CheckAuthRequest, ConnectReply, ConnectRequest, DisconnectRequest,
    GetUserInfoReply, GetUserInfoRequest, ListMessagesReply, ListMessagesRequest, LoginRequest,
    LogoutRequest, RegisterRequest, RoomRequest, SendRequest, SuccessReply, TokenReply,
};

use crate::logic::Logic;

pub fn router(logic: Arc<Logic>) -> Router {
    Router::new()
        .route("/rpc/register", post(register))
        .route("/rpc/login", post(login))
        .route("/rpc/checkAuth", post(check_auth))
        .route("/rpc/logout", post(logout))
        .route("/rpc/getUserInfo", post(get_user_info))
        .route("/rpc/connect", post(connect))
        .route("/rpc/disconnect", post(disconnect))
        .route("/rpc/push", post(push))
        .route("/rpc/pushRoom", post(push_room))
        .route("/rpc/count", post(count))
        .route("/rpc/getRoomInfo", post(get_room_info))
        .route("/rpc/listRoomMessages", post(list_room_messages))
        .with_state(logic)
}

async fn register(
    State(logic): State<Arc<Logic>>,
    Json(req): Json<RegisterRequest>,
) -> Json<TokenReply> {
    Json(logic.register(&req.name, &req.password).await)
}

async fn login(
    State(logic): State<Arc<Logic>>,
    Json(req): Json<LoginRequest>,
) -> Json<TokenReply> {
    Json(logic.login(&req.name, &req.password).await)
}

async fn check_auth(
    State(logic): State<Arc<Logic>>,
    Json(req): Json<CheckAuthRequest>,
) -> Json<CheckAuthReply> {
    Json(logic.check_auth(&req.auth_token).await)
}

async fn logout(
    State(logic): State<Arc<Logic>>,
    Json(req): Json<LogoutRequest>,
) -> Json<SuccessReply> {
    Json(logic.logout(&req.auth_token).await)
}

async fn get_user_info(
    State(logic): State<Arc<Logic>>,
    Json(req): Json<GetUserInfoRequest>,
) -> Json<GetUserInfoReply> {
    Json(logic.get_user_info(req.user_id).await)
}

async fn connect(
    State(logic): State<Arc<Logic>>,
    Json(req): Json<ConnectRequest>,
) -> Json<ConnectReply> {
    Json(
        logic
            .connect(&req.auth_token, req.room_id, &req.server_id)
            .await,
    )
}

async fn disconnect(
    State(logic): State<Arc<Logic>>,
    Json(req): Json<DisconnectRequest>,
) -> Json<SuccessReply> {
    Json(logic.disconnect(req.user_id, req.room_id).await)
}

async fn push(
    State(logic): State<Arc<Logic>>,
    Json(req): Json<SendRequest>,
) -> Json<SuccessReply> {
    Json(logic.push(&req).await)
}

async fn push_room(
    State(logic): State<Arc<Logic>>,
    Json(req): Json<SendRequest>,
) -> Json<SuccessReply> {
    Json(logic.push_room(&req).await)
}

async fn count(
    State(logic): State<Arc<Logic>>,
    Json(req): Json<RoomRequest>,
) -> Json<SuccessReply> {
    Json(logic.count(req.room_id).await)
}

async fn get_room_info(
    State(logic): State<Arc<Logic>>,
    Json(req): Json<RoomRequest>,
) -> Json<SuccessReply> {
    Json(logic.get_room_info(req.room_id).await)
}

async fn list_room_messages(
    State(logic): State<Arc<Logic>>,
    Json(req): Json<ListMessagesRequest>,
) -> Json<ListMessagesReply> {
    Json(logic.list_room_messages(req.room_id, req.limit).await)
}
