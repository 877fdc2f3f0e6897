//! Request/reply bodies for the JSON-over-HTTP calls between tiers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// Tier RPC reply codes. Distinct from the HTTP front-end codes, where 0 is
// success - here 1 is success, matching every `code` field below.
pub const RPC_CODE_SUCCESS: i32 = 1;
pub const RPC_CODE_FAIL: i32 = 0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    /// Already hashed by the front-end.
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub name: String,
    pub password: String,
}

/// Reply for Register and Login.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenReply {
    pub code: i32,
    #[serde(default)]
    pub auth_token: String,
    #[serde(default)]
    pub msg: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckAuthRequest {
    pub auth_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckAuthReply {
    pub code: i32,
    #[serde(default)]
    pub user_id: i64,
    #[serde(default)]
    pub user_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub auth_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetUserInfoRequest {
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetUserInfoReply {
    pub code: i32,
    #[serde(default)]
    pub user_id: i64,
    #[serde(default)]
    pub user_name: String,
}

/// Sent by an edge when a client's first frame arrives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    pub auth_token: String,
    pub room_id: i64,
    #[serde(default)]
    pub server_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectReply {
    pub code: i32,
    /// Zero when the token did not resolve.
    #[serde(default)]
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectRequest {
    pub room_id: i64,
    pub user_id: i64,
}

/// Generic code-plus-message reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessReply {
    pub code: i32,
    #[serde(default)]
    pub msg: String,
}

impl SuccessReply {
    pub fn ok() -> Self {
        Self {
            code: RPC_CODE_SUCCESS,
            msg: "success".to_string(),
        }
    }

    pub fn fail(msg: impl Into<String>) -> Self {
        Self {
            code: RPC_CODE_FAIL,
            msg: msg.into(),
        }
    }
}

/// Outgoing message submission (single and room sends share the shape).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SendRequest {
    pub msg: String,
    pub from_user_id: i64,
    pub from_user_name: String,
    pub to_user_id: i64,
    pub to_user_name: String,
    pub room_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRequest {
    pub room_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMessagesRequest {
    pub room_id: i64,
    #[serde(default)]
    pub limit: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub id: i64,
    pub room_id: i64,
    pub from_user_id: i64,
    pub from_user_name: String,
    pub content: String,
    pub create_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMessagesReply {
    pub code: i32,
    #[serde(default)]
    pub data: Vec<MessageDto>,
}

// Task → Connect push bodies. The three room pushes share one body and
// differ only in the op already encoded inside `msg`.

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSingleRequest {
    pub user_id: i64,
    pub msg: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushRoomRequest {
    pub room_id: i64,
    pub msg: Value,
}
