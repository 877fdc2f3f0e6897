use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Chat-level message carried inside an envelope's `msg` field. This is
/// also the exact text frame a WebSocket client receives for `op = 3`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatBody {
    pub code: i32,
    pub msg: String,
    pub from_user_id: i64,
    pub from_user_name: String,
    pub to_user_id: i64,
    pub to_user_name: String,
    pub room_id: i64,
    pub op: i32,
    /// `YYYY-MM-DD HH:MM:SS`, UTC. Stamped by Logic.
    pub create_time: String,
    #[serde(skip_serializing_if = "id_is_zero")]
    pub client_msg_id: i64,
}

fn id_is_zero(id: &i64) -> bool {
    *id == 0
}

/// Online-count frame pushed to clients (`op = 4`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCountMsg {
    pub count: i64,
    pub op: i32,
}

/// Member-snapshot frame pushed to clients (`op = 5`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfoMsg {
    pub room_id: i64,
    pub count: i64,
    pub room_user_info: HashMap<String, String>,
    pub op: i32,
}
