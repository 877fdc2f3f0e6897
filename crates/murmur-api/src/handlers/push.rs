use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Deserialize;

use murmur_protocol::rpc::SendRequest;
use murmur_protocol::RPC_CODE_SUCCESS;

use crate::handlers::{require_auth, AppState};
use crate::response::{fail, ok, ApiResponse};

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FormPush {
    pub auth_token: String,
    pub msg: String,
    pub to_user_id: i64,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FormRoom {
    pub auth_token: String,
    pub msg: String,
    pub room_id: i64,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FormCountRoom {
    pub auth_token: String,
    pub room_id: i64,
}

pub async fn push(
    State(state): State<Arc<AppState>>,
    Json(form): Json<FormPush>,
) -> Json<ApiResponse> {
    if form.msg.is_empty() || form.to_user_id <= 0 {
        return fail("msg and toUserId are required");
    }
    let (from_user_id, from_user_name) = match require_auth(&state, &form.auth_token).await {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    let to_user_name = match state.logic.get_user_info(form.to_user_id).await {
        Ok(reply) if reply.code == RPC_CODE_SUCCESS => reply.user_name,
        _ => return fail("no such user"),
    };
    let req = SendRequest {
        msg: form.msg,
        from_user_id,
        from_user_name,
        to_user_id: form.to_user_id,
        to_user_name,
        room_id: 0,
    };
    match state.logic.push(&req).await {
        Ok(reply) if reply.code == RPC_CODE_SUCCESS => ok("ok", serde_json::Value::Null),
        Ok(reply) => fail(&reply.msg),
        Err(_) => fail("push fail"),
    }
}

pub async fn push_room(
    State(state): State<Arc<AppState>>,
    Json(form): Json<FormRoom>,
) -> Json<ApiResponse> {
    if form.msg.is_empty() || form.room_id <= 0 {
        return fail("msg and roomId are required");
    }
    let (from_user_id, from_user_name) = match require_auth(&state, &form.auth_token).await {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    let req = SendRequest {
        msg: form.msg,
        from_user_id,
        from_user_name,
        to_user_id: 0,
        to_user_name: String::new(),
        room_id: form.room_id,
    };
    match state.logic.push_room(&req).await {
        Ok(reply) if reply.code == RPC_CODE_SUCCESS => ok("ok", serde_json::Value::Null),
        Ok(reply) => fail(&reply.msg),
        Err(_) => fail("pushRoom fail"),
    }
}

pub async fn count(
    State(state): State<Arc<AppState>>,
    Json(form): Json<FormCountRoom>,
) -> Json<ApiResponse> {
    if form.room_id <= 0 {
        return fail("roomId is required");
    }
    if let Err(resp) = require_auth(&state, &form.auth_token).await {
        return resp;
    }
    match state.logic.count(form.room_id).await {
        Ok(reply) if reply.code == RPC_CODE_SUCCESS => ok("ok", serde_json::Value::Null),
        _ => fail("count fail"),
    }
}

pub async fn get_room_info(
    State(state): State<Arc<AppState>>,
    Json(form): Json<FormCountRoom>,
) -> Json<ApiResponse> {
    if form.room_id <= 0 {
        return fail("roomId is required");
    }
    if let Err(resp) = require_auth(&state, &form.auth_token).await {
        return resp;
    }
    match state.logic.get_room_info(form.room_id).await {
        Ok(reply) if reply.code == RPC_CODE_SUCCESS => ok("ok", serde_json::Value::Null),
        Ok(reply) => fail(&reply.msg),
        Err(_) => fail("getRoomInfo fail"),
    }
}
