use std::collections::HashMap;

use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// Delivery fabric op codes. Stable across every tier - the Task dispatcher,
// the Connect edges and the terminal clients all switch on these.
pub const OP_SINGLE_SEND: i32 = 2;
pub const OP_ROOM_SEND: i32 = 3;
pub const OP_ROOM_COUNT_SEND: i32 = 4;
pub const OP_ROOM_INFO_SEND: i32 = 5;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("envelope has no inner message")]
    EmptyInner,

    #[error("inner message is neither raw JSON nor base64 JSON: {0}")]
    BadInner(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Outer wrapper carried on the delivery fabric between Logic, Task and
/// the Connect edges.
///
/// Wire: `{ "op": 3, "roomId": 7, "count": 2, "roomUserInfo": {...}, "msg": {...} }`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub op: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_user_info: Option<HashMap<String, String>>,
    /// Inner payload. Emitted as raw JSON; a base64-encoded JSON string is
    /// also accepted on ingress (legacy producers marshal bytes that way).
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub msg: Value,
}

impl Envelope {
    pub fn single_send(server_id: &str, user_id: i64, msg: Value) -> Self {
        Self {
            op: OP_SINGLE_SEND,
            server_id: Some(server_id.to_string()),
            user_id: Some(user_id),
            room_id: None,
            count: None,
            room_user_info: None,
            msg,
        }
    }

    pub fn room_send(
        room_id: i64,
        count: i64,
        room_user_info: HashMap<String, String>,
        msg: Value,
    ) -> Self {
        Self {
            op: OP_ROOM_SEND,
            server_id: None,
            user_id: None,
            room_id: Some(room_id),
            count: Some(count),
            room_user_info: Some(room_user_info),
            msg,
        }
    }

    pub fn room_count(room_id: i64, count: i64) -> Self {
        Self {
            op: OP_ROOM_COUNT_SEND,
            server_id: None,
            user_id: None,
            room_id: Some(room_id),
            count: Some(count),
            room_user_info: None,
            msg: Value::Null,
        }
    }

    pub fn room_info(room_id: i64, count: i64, room_user_info: HashMap<String, String>) -> Self {
        Self {
            op: OP_ROOM_INFO_SEND,
            server_id: None,
            user_id: None,
            room_id: Some(room_id),
            count: Some(count),
            room_user_info: Some(room_user_info),
            msg: Value::Null,
        }
    }

    /// Partition key: identical keys are consumed in production order.
    pub fn partition_key(&self) -> String {
        match self.op {
            OP_SINGLE_SEND => format!("user:{}", self.user_id.unwrap_or(0)),
            OP_ROOM_COUNT_SEND => format!("room-count:{}", self.room_id.unwrap_or(0)),
            OP_ROOM_INFO_SEND => format!("room-info:{}", self.room_id.unwrap_or(0)),
            _ => format!("room:{}", self.room_id.unwrap_or(0)),
        }
    }

    /// Decode the inner payload, tolerating both raw JSON and a
    /// base64-encoded JSON string.
    pub fn inner<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        match &self.msg {
            Value::Null => Err(ProtocolError::EmptyInner),
            Value::String(s) => {
                if let Ok(raw) = base64::engine::general_purpose::STANDARD.decode(s) {
                    if let Ok(v) = serde_json::from_slice(&raw) {
                        return Ok(v);
                    }
                }
                serde_json::from_str(s)
                    .map_err(|e| ProtocolError::BadInner(e.to_string()))
            }
            other => Ok(serde_json::from_value(other.clone())?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_keys_follow_op() {
        let mut info = HashMap::new();
        info.insert("42".to_string(), "alice".to_string());
        assert_eq!(
            Envelope::single_send("ws-1", 42, Value::Null).partition_key(),
            "user:42"
        );
        assert_eq!(
            Envelope::room_send(7, 1, info.clone(), Value::Null).partition_key(),
            "room:7"
        );
        assert_eq!(Envelope::room_count(7, 1).partition_key(), "room-count:7");
        assert_eq!(
            Envelope::room_info(7, 1, info).partition_key(),
            "room-info:7"
        );
    }
}
