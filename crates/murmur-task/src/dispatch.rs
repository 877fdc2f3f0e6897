use std::sync::Arc;

use murmur_core::clock::now_date_time;
use murmur_core::ids::Snowflake;
use murmur_history::ChatStore;
use murmur_protocol::{
    AiResult, ChatBody, Envelope, RoomCountMsg, RoomInfoMsg, OP_ROOM_COUNT_SEND,
    OP_ROOM_INFO_SEND, OP_ROOM_SEND, OP_SINGLE_SEND,
};
use tracing::{info, warn};

use crate::edge_client::{EdgeClient, RoomPushKind};

pub const AI_SENDER_NAME: &str = "🤖 AI";

/// Turns consumed records into edge pushes and history rows. History is
/// written first and never fails the delivery: a duplicate id is a no-op
/// and a store error is logged and swallowed.
pub struct Dispatcher {
    edges: Arc<dyn EdgeClient>,
    history: Arc<ChatStore>,
    ids: Snowflake,
}

impl Dispatcher {
    pub fn new(edges: Arc<dyn EdgeClient>, history: Arc<ChatStore>, ids: Snowflake) -> Self {
        Self {
            edges,
            history,
            ids,
        }
    }

    fn mirror_to_history(&self, inner: &serde_json::Value) {
        let bytes = match serde_json::to_vec(inner) {
            Ok(b) => b,
            Err(e) => {
                warn!(error = %e, "unserializable chat body");
                return;
            }
        };
        if let Err(e) = self.history.save_room_msg_bytes(&bytes) {
            warn!(error = %e, "history mirror failed");
        }
    }

    /// One record from a delivery topic.
    pub async fn handle_delivery(&self, payload: &[u8]) {
        let env: Envelope = match serde_json::from_slice(payload) {
            Ok(env) => env,
            Err(e) => {
                warn!(error = %e, "undecodable envelope, skipped");
                return;
            }
        };
        match env.op {
            OP_SINGLE_SEND => {
                let Some(server_id) = env.server_id.as_deref() else {
                    warn!("single send without a server id, skipped");
                    return;
                };
                let user_id = env.user_id.unwrap_or(0);
                if let Err(e) = self.edges.push_single(server_id, user_id, &env.msg).await {
                    warn!(server_id, user_id, error = %e, "single push dropped");
                }
            }
            OP_ROOM_SEND => {
                let room_id = env.room_id.unwrap_or(0);
                self.mirror_to_history(&env.msg);
                if let Err(e) = self
                    .edges
                    .broadcast_room(RoomPushKind::Msg, room_id, &env.msg)
                    .await
                {
                    warn!(room_id, error = %e, "room push dropped");
                }
            }
            OP_ROOM_COUNT_SEND => {
                let room_id = env.room_id.unwrap_or(0);
                let frame = RoomCountMsg {
                    count: env.count.unwrap_or(0),
                    op: OP_ROOM_COUNT_SEND,
                };
                let msg = serde_json::to_value(frame).unwrap_or_default();
                if let Err(e) = self
                    .edges
                    .broadcast_room(RoomPushKind::Count, room_id, &msg)
                    .await
                {
                    warn!(room_id, error = %e, "count push dropped");
                }
            }
            OP_ROOM_INFO_SEND => {
                let room_id = env.room_id.unwrap_or(0);
                let frame = RoomInfoMsg {
                    room_id,
                    count: env.count.unwrap_or(0),
                    room_user_info: env.room_user_info.clone().unwrap_or_default(),
                    op: OP_ROOM_INFO_SEND,
                };
                let msg = serde_json::to_value(frame).unwrap_or_default();
                if let Err(e) = self
                    .edges
                    .broadcast_room(RoomPushKind::Info, room_id, &msg)
                    .await
                {
                    warn!(room_id, error = %e, "room info push dropped");
                }
            }
            other => warn!(op = other, "unknown op, skipped"),
        }
    }

    /// One record from `ai.results`. The reply is synthesized into an
    /// ordinary room message so downstream cannot tell it apart from a
    /// human one.
    pub async fn handle_ai_result(&self, payload: &[u8]) {
        let res: AiResult = match serde_json::from_slice(payload) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "undecodable ai result, skipped");
                return;
            }
        };
        let text = if !res.err.is_empty() {
            format!("（AI处理失败）{}", res.err)
        } else if !res.model.is_empty() {
            format!("{}\n-- {}", res.text, res.model)
        } else {
            res.text.clone()
        };
        let client_msg_id = if res.client_msg_id != 0 {
            res.client_msg_id
        } else {
            self.ids.next_id()
        };
        let body = ChatBody {
            code: 0,
            msg: text,
            from_user_id: 0,
            from_user_name: AI_SENDER_NAME.to_string(),
            to_user_id: 0,
            to_user_name: String::new(),
            room_id: res.room_id,
            op: OP_ROOM_SEND,
            create_time: now_date_time(),
            client_msg_id,
        };
        let msg = match serde_json::to_value(&body) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "unserializable ai reply");
                return;
            }
        };
        self.mirror_to_history(&msg);
        if let Err(e) = self
            .edges
            .broadcast_room(RoomPushKind::Msg, res.room_id, &msg)
            .await
        {
            warn!(room_id = res.room_id, error = %e, "ai reply push dropped");
        }
        info!(room_id = res.room_id, op = ?res.op, "ai reply delivered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use murmur_core::Result;
    use murmur_protocol::AiOp;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Single(String, i64, Value),
        Room(RoomPushKind, i64, Value),
    }

    #[derive(Default)]
    struct RecordingEdge {
        calls: Mutex<Vec<Call>>,
    }

    #[async_trait]
    impl EdgeClient for RecordingEdge {
        async fn push_single(&self, server_id: &str, user_id: i64, msg: &Value) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Single(server_id.to_string(), user_id, msg.clone()));
            Ok(())
        }

        async fn broadcast_room(
            &self,
            kind: RoomPushKind,
            room_id: i64,
            msg: &Value,
        ) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Room(kind, room_id, msg.clone()));
            Ok(())
        }
    }

    fn dispatcher() -> (Dispatcher, Arc<RecordingEdge>, Arc<ChatStore>) {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        murmur_history::db::init_db(&conn).unwrap();
        let history = Arc::new(ChatStore::new(conn));
        let edges = Arc::new(RecordingEdge::default());
        (
            Dispatcher::new(edges.clone(), history.clone(), Snowflake::new(2)),
            edges,
            history,
        )
    }

    fn chat_value(room_id: i64, id: i64, msg: &str) -> Value {
        serde_json::json!({
            "code": 0,
            "msg": msg,
            "fromUserId": 42,
            "fromUserName": "alice",
            "roomId": room_id,
            "op": OP_ROOM_SEND,
            "createTime": "2026-03-01 10:00:00",
            "clientMsgId": id,
        })
    }

    #[tokio::test]
    async fn room_send_mirrors_history_and_broadcasts() {
        let (d, edges, history) = dispatcher();
        let inner = chat_value(7, 555, "hello");
        let env = Envelope::room_send(7, 1, HashMap::new(), inner.clone());

        d.handle_delivery(&serde_json::to_vec(&env).unwrap()).await;

        assert_eq!(
            edges.calls.lock().unwrap().as_slice(),
            &[Call::Room(RoomPushKind::Msg, 7, inner)]
        );
        let rows = history.list_room_messages(7, 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, 555);
    }

    #[tokio::test]
    async fn replayed_room_send_does_not_duplicate_history() {
        let (d, _edges, history) = dispatcher();
        let env = Envelope::room_send(7, 1, HashMap::new(), chat_value(7, 556, "again"));
        let payload = serde_json::to_vec(&env).unwrap();

        d.handle_delivery(&payload).await;
        d.handle_delivery(&payload).await;

        assert_eq!(history.list_room_messages(7, 10).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn single_send_targets_the_envelope_edge() {
        let (d, edges, _history) = dispatcher();
        let env = Envelope::single_send("ws-3", 42, serde_json::json!({"msg": "hi"}));

        d.handle_delivery(&serde_json::to_vec(&env).unwrap()).await;

        let calls = edges.calls.lock().unwrap();
        match &calls[0] {
            Call::Single(server, user, _) => {
                assert_eq!(server, "ws-3");
                assert_eq!(*user, 42);
            }
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[tokio::test]
    async fn count_and_info_become_client_frames() {
        let (d, edges, _history) = dispatcher();
        let env = Envelope::room_count(9, 3);
        d.handle_delivery(&serde_json::to_vec(&env).unwrap()).await;

        let calls = edges.calls.lock().unwrap();
        match &calls[0] {
            Call::Room(RoomPushKind::Count, 9, msg) => {
                assert_eq!(msg["count"], 3);
                assert_eq!(msg["op"], OP_ROOM_COUNT_SEND);
            }
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[tokio::test]
    async fn ai_result_is_indistinguishable_from_chat() {
        let (d, edges, history) = dispatcher();
        let res = AiResult {
            room_id: 7,
            text: "点1\n点2".to_string(),
            op: AiOp::Summarize,
            model: "llama3.1".to_string(),
            err: String::new(),
            client_msg_id: 0,
        };
        d.handle_ai_result(&serde_json::to_vec(&res).unwrap()).await;

        let calls = edges.calls.lock().unwrap();
        match &calls[0] {
            Call::Room(RoomPushKind::Msg, 7, msg) => {
                assert_eq!(msg["fromUserName"], AI_SENDER_NAME);
                assert_eq!(msg["op"], OP_ROOM_SEND);
                assert!(msg["clientMsgId"].as_i64().unwrap() > 0);
            }
            other => panic!("unexpected call {:?}", other),
        }
        // a fresh history row exists for the reply
        let rows = history.list_room_messages(7, 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].from_user_name, AI_SENDER_NAME);
    }

    #[tokio::test]
    async fn failed_ai_result_renders_the_error() {
        let (d, edges, _history) = dispatcher();
        let res = AiResult {
            room_id: 7,
            text: String::new(),
            op: AiOp::Ask,
            model: String::new(),
            err: "model offline".to_string(),
            client_msg_id: 0,
        };
        d.handle_ai_result(&serde_json::to_vec(&res).unwrap()).await;

        let calls = edges.calls.lock().unwrap();
        match &calls[0] {
            Call::Room(_, _, msg) => {
                assert!(msg["msg"].as_str().unwrap().contains("model offline"));
            }
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[tokio::test]
    async fn garbage_payloads_are_skipped() {
        let (d, edges, _history) = dispatcher();
        d.handle_delivery(b"not json").await;
        d.handle_ai_result(b"not json either").await;
        assert!(edges.calls.lock().unwrap().is_empty());
    }
}
