use std::sync::Mutex;

use murmur_protocol::ChatBody;
use rusqlite::Connection;
use tracing::debug;

use crate::error::Result;

pub const DEFAULT_LIST_LIMIT: i64 = 100;
pub const MAX_LIST_LIMIT: i64 = 500;

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: i64,
    pub room_id: i64,
    pub from_user_id: i64,
    pub from_user_name: String,
    pub content: String,
    pub op: i32,
    /// `YYYY-MM-DD HH:MM:SS`, UTC.
    pub created_at: String,
}

/// Append-only room message log. Writes are idempotent on the snowflake
/// id, so replaying an at-least-once broker stream cannot duplicate rows.
pub struct ChatStore {
    db: Mutex<Connection>,
}

impl ChatStore {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    /// Persist one message. Re-saving the same id is a no-op.
    pub fn save(&self, msg: &ChatMessage) -> Result<()> {
        let db = self.db.lock().unwrap();
        let changed = db.execute(
            "INSERT OR IGNORE INTO chat_message
             (id, room_id, from_user_id, from_user_name, content, op, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                msg.id,
                msg.room_id,
                msg.from_user_id,
                msg.from_user_name,
                msg.content,
                msg.op,
                msg.created_at,
            ],
        )?;
        if changed == 0 {
            debug!(id = msg.id, "duplicate message id, ignored");
        }
        Ok(())
    }

    /// Parse an inner chat body (as carried on the delivery fabric) and
    /// persist it.
    pub fn save_room_msg_bytes(&self, body: &[u8]) -> Result<()> {
        let chat: ChatBody = serde_json::from_slice(body)?;
        self.save(&ChatMessage {
            id: chat.client_msg_id,
            room_id: chat.room_id,
            from_user_id: chat.from_user_id,
            from_user_name: chat.from_user_name,
            content: chat.msg,
            op: chat.op,
            created_at: chat.create_time,
        })
    }

    /// The most recent `limit` messages for a room, oldest first. Limit is
    /// clamped to [1, 500]: zero or negative means the default 100, larger
    /// requests are capped at 500.
    pub fn list_room_messages(&self, room_id: i64, limit: i64) -> Result<Vec<ChatMessage>> {
        let limit = if limit <= 0 {
            DEFAULT_LIST_LIMIT
        } else {
            limit.min(MAX_LIST_LIMIT)
        };
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT id, room_id, from_user_id, from_user_name, content, op, created_at
             FROM chat_message
             WHERE room_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(rusqlite::params![room_id, limit], |row| {
            Ok(ChatMessage {
                id: row.get(0)?,
                room_id: row.get(1)?,
                from_user_id: row.get(2)?,
                from_user_name: row.get(3)?,
                content: row.get(4)?,
                op: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?;
        let mut out: Vec<ChatMessage> = rows.filter_map(|r| r.ok()).collect();
        out.reverse(); // newest-N, presented in ascending chronological order
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ChatStore {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_db(&conn).unwrap();
        ChatStore::new(conn)
    }

    fn msg(id: i64, room: i64, at: &str) -> ChatMessage {
        ChatMessage {
            id,
            room_id: room,
            from_user_id: 1,
            from_user_name: "alice".to_string(),
            content: format!("m{}", id),
            op: 3,
            created_at: at.to_string(),
        }
    }

    #[test]
    fn save_is_idempotent() {
        let s = store();
        let m = msg(10, 9, "2026-03-01 10:00:00");
        s.save(&m).unwrap();
        s.save(&m).unwrap();
        assert_eq!(s.list_room_messages(9, 50).unwrap().len(), 1);
    }

    #[test]
    fn list_returns_ascending_window() {
        let s = store();
        for i in 0..300 {
            s.save(&msg(i + 1, 9, &format!("2026-03-01 10:{:02}:{:02}", i / 60, i % 60)))
                .unwrap();
        }
        let rows = s.list_room_messages(9, 100).unwrap();
        assert_eq!(rows.len(), 100);
        // the 100 most recent, oldest first
        assert_eq!(rows.first().unwrap().id, 201);
        assert_eq!(rows.last().unwrap().id, 300);
        assert!(rows.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }

    #[test]
    fn limit_is_clamped() {
        let s = store();
        for i in 0..520 {
            s.save(&msg(
                i + 1,
                9,
                &format!("2026-03-01 11:{:02}:{:02}", i / 60, i % 60),
            ))
            .unwrap();
        }
        // above the cap clamps to 500, zero means the default window
        assert_eq!(s.list_room_messages(9, 600).unwrap().len(), 500);
        assert_eq!(s.list_room_messages(9, 0).unwrap().len(), 100);
        assert_eq!(s.list_room_messages(9, 7).unwrap().len(), 7);
    }

    #[test]
    fn room_msg_bytes_round_trip() {
        let s = store();
        let body = serde_json::json!({
            "code": 0,
            "msg": "hello",
            "fromUserId": 42,
            "fromUserName": "alice",
            "roomId": 9,
            "op": 3,
            "createTime": "2026-03-01 12:00:00",
            "clientMsgId": 777,
        });
        s.save_room_msg_bytes(&serde_json::to_vec(&body).unwrap())
            .unwrap();
        let rows = s.list_room_messages(9, 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, 777);
        assert_eq!(rows[0].content, "hello");
    }
}
