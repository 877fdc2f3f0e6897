use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::backend::{SessionBackend, SessionUser};
use crate::error::Result;

/// In-process backend for tests and single-node development. TTLs are not
/// simulated; expiry-dependent behavior is exercised against Redis.
#[derive(Default)]
pub struct MemorySessions {
    sessions: DashMap<String, SessionUser>,
    token_index: DashMap<i64, String>,
    user_server: DashMap<i64, String>,
    rooms: DashMap<i64, HashMap<i64, String>>,
    counts: DashMap<i64, i64>,
}

impl MemorySessions {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionBackend for MemorySessions {
    async fn store_session(&self, token: &str, user: &SessionUser) -> Result<()> {
        self.sessions.insert(token.to_string(), user.clone());
        Ok(())
    }

    async fn load_session(&self, token: &str) -> Result<Option<SessionUser>> {
        Ok(self.sessions.get(token).map(|v| v.clone()))
    }

    async fn delete_session(&self, token: &str) -> Result<()> {
        self.sessions.remove(token);
        Ok(())
    }

    async fn index_token(&self, user_id: i64, token: &str) -> Result<()> {
        self.token_index.insert(user_id, token.to_string());
        Ok(())
    }

    async fn token_for_user(&self, user_id: i64) -> Result<Option<String>> {
        Ok(self.token_index.get(&user_id).map(|v| v.clone()))
    }

    async fn delete_token_index(&self, user_id: i64) -> Result<()> {
        self.token_index.remove(&user_id);
        Ok(())
    }

    async fn bind_user_server(&self, user_id: i64, server_id: &str) -> Result<()> {
        self.user_server.insert(user_id, server_id.to_string());
        Ok(())
    }

    async fn server_for_user(&self, user_id: i64) -> Result<Option<String>> {
        Ok(self.user_server.get(&user_id).map(|v| v.clone()))
    }

    async fn unbind_user_server(&self, user_id: i64) -> Result<()> {
        self.user_server.remove(&user_id);
        Ok(())
    }

    async fn join_room(&self, room_id: i64, user_id: i64, user_name: &str) -> Result<bool> {
        let mut members = self.rooms.entry(room_id).or_default();
        if members.contains_key(&user_id) {
            return Ok(false);
        }
        members.insert(user_id, user_name.to_string());
        Ok(true)
    }

    async fn leave_room(&self, room_id: i64, user_id: i64) -> Result<()> {
        if let Some(mut members) = self.rooms.get_mut(&room_id) {
            members.remove(&user_id);
        }
        Ok(())
    }

    async fn room_members(&self, room_id: i64) -> Result<HashMap<String, String>> {
        Ok(self
            .rooms
            .get(&room_id)
            .map(|m| {
                m.iter()
                    .map(|(id, name)| (id.to_string(), name.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn incr_room_online(&self, room_id: i64) -> Result<i64> {
        let mut count = self.counts.entry(room_id).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    async fn decr_room_online(&self, room_id: i64) -> Result<i64> {
        let mut count = self.counts.entry(room_id).or_insert(0);
        if *count > 0 {
            *count -= 1;
        }
        Ok(*count)
    }

    async fn room_online_count(&self, room_id: i64) -> Result<i64> {
        Ok(self.counts.get(&room_id).map(|v| *v).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn join_is_first_time_only() {
        let s = MemorySessions::new();
        assert!(s.join_room(1, 42, "alice").await.unwrap());
        assert!(!s.join_room(1, 42, "alice").await.unwrap());
        assert_eq!(s.room_members(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn online_count_floors_at_zero() {
        let s = MemorySessions::new();
        assert_eq!(s.incr_room_online(5).await.unwrap(), 1);
        assert_eq!(s.decr_room_online(5).await.unwrap(), 0);
        assert_eq!(s.decr_room_online(5).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn session_store_round_trip() {
        let s = MemorySessions::new();
        let user = SessionUser {
            user_id: 7,
            user_name: "bob".to_string(),
        };
        s.store_session("t1", &user).await.unwrap();
        s.index_token(7, "t1").await.unwrap();

        assert_eq!(s.load_session("t1").await.unwrap(), Some(user));
        assert_eq!(s.token_for_user(7).await.unwrap().as_deref(), Some("t1"));

        s.delete_session("t1").await.unwrap();
        assert!(s.load_session("t1").await.unwrap().is_none());
    }
}
