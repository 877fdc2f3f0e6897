use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use murmur_protocol::RPC_CODE_SUCCESS;

use crate::handlers::{require_auth, AppState};
use crate::response::{fail, ok, ApiResponse};

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FormCredentials {
    pub user_name: String,
    pub pass_word: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FormToken {
    pub auth_token: String,
}

/// Passwords never cross the RPC boundary in the clear.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(form): Json<FormCredentials>,
) -> Json<ApiResponse> {
    if form.user_name.is_empty() || form.pass_word.is_empty() {
        return fail("userName and passWord are required");
    }
    match state
        .logic
        .register(&form.user_name, &hash_password(&form.pass_word))
        .await
    {
        Ok(reply) if reply.code == RPC_CODE_SUCCESS && !reply.auth_token.is_empty() => {
            ok("register success", reply.auth_token)
        }
        Ok(reply) => fail(&reply.msg),
        Err(_) => fail("register fail"),
    }
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(form): Json<FormCredentials>,
) -> Json<ApiResponse> {
    if form.user_name.is_empty() || form.pass_word.is_empty() {
        return fail("userName and passWord are required");
    }
    match state
        .logic
        .login(&form.user_name, &hash_password(&form.pass_word))
        .await
    {
        Ok(reply) if reply.code == RPC_CODE_SUCCESS && !reply.auth_token.is_empty() => {
            ok("login success", reply.auth_token)
        }
        Ok(reply) => fail(&reply.msg),
        Err(_) => fail("login fail"),
    }
}

pub async fn check_auth(
    State(state): State<Arc<AppState>>,
    Json(form): Json<FormToken>,
) -> Json<ApiResponse> {
    match require_auth(&state, &form.auth_token).await {
        Ok((user_id, user_name)) => ok(
            "auth success",
            serde_json::json!({ "userId": user_id, "userName": user_name }),
        ),
        Err(resp) => resp,
    }
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    Json(form): Json<FormToken>,
) -> Json<ApiResponse> {
    if form.auth_token.is_empty() {
        return fail("authToken is required");
    }
    match state.logic.logout(&form.auth_token).await {
        Ok(reply) if reply.code == RPC_CODE_SUCCESS => ok("logout ok", serde_json::Value::Null),
        _ => fail("logout fail"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hashing_is_stable_hex() {
        let h = hash_password("hunter2");
        assert_eq!(h.len(), 64);
        assert_eq!(h, hash_password("hunter2"));
        assert_ne!(h, hash_password("hunter3"));
    }
}
