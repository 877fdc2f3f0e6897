use std::collections::HashMap;

use async_trait::async_trait;
use murmur_core::config::{ROUTE_TTL_SECS, SESSION_TTL_SECS};
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::backend::{SessionBackend, SessionUser};
use crate::error::{Result, SessionError};
use crate::keys;

/// Redis-backed store. The connection is multiplexed and cloned per call.
pub struct RedisSessions {
    conn: MultiplexedConnection,
}

impl RedisSessions {
    /// `address` is `host:port` or a full `redis://` URL; password and db
    /// index come from the session-store config section.
    pub async fn connect(address: &str, password: &str, db: i64) -> Result<Self> {
        let url = build_url(address, password, db);
        let client = redis::Client::open(url)
            .map_err(|e| SessionError::Connection(e.to_string()))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| SessionError::Connection(e.to_string()))?;
        Ok(Self { conn })
    }

    fn conn(&self) -> MultiplexedConnection {
        self.conn.clone()
    }
}

pub(crate) fn build_url(address: &str, password: &str, db: i64) -> String {
    let host = address
        .trim_start_matches("redis://")
        .trim_end_matches('/');
    if password.is_empty() {
        format!("redis://{}/{}", host, db)
    } else {
        format!("redis://:{}@{}/{}", password, host, db)
    }
}

#[async_trait]
impl SessionBackend for RedisSessions {
    async fn store_session(&self, token: &str, user: &SessionUser) -> Result<()> {
        let key = keys::session(token);
        let mut conn = self.conn();
        conn.hset_multiple::<_, _, _, ()>(
            &key,
            &[
                ("userId", user.user_id.to_string()),
                ("userName", user.user_name.clone()),
            ],
        )
        .await?;
        conn.expire::<_, ()>(&key, SESSION_TTL_SECS as i64).await?;
        Ok(())
    }

    async fn load_session(&self, token: &str) -> Result<Option<SessionUser>> {
        let map: HashMap<String, String> =
            self.conn().hgetall(keys::session(token)).await?;
        if map.is_empty() {
            return Ok(None);
        }
        let user_id = map
            .get("userId")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let user_name = map.get("userName").cloned().unwrap_or_default();
        Ok(Some(SessionUser { user_id, user_name }))
    }

    async fn delete_session(&self, token: &str) -> Result<()> {
        self.conn().del::<_, ()>(keys::session(token)).await?;
        Ok(())
    }

    async fn index_token(&self, user_id: i64, token: &str) -> Result<()> {
        self.conn()
            .set_ex::<_, _, ()>(keys::user_token_index(user_id), token, SESSION_TTL_SECS)
            .await?;
        Ok(())
    }

    async fn token_for_user(&self, user_id: i64) -> Result<Option<String>> {
        Ok(self.conn().get(keys::user_token_index(user_id)).await?)
    }

    async fn delete_token_index(&self, user_id: i64) -> Result<()> {
        self.conn()
            .del::<_, ()>(keys::user_token_index(user_id))
            .await?;
        Ok(())
    }

    async fn bind_user_server(&self, user_id: i64, server_id: &str) -> Result<()> {
        self.conn()
            .set_ex::<_, _, ()>(keys::user_server(user_id), server_id, ROUTE_TTL_SECS)
            .await?;
        Ok(())
    }

    async fn server_for_user(&self, user_id: i64) -> Result<Option<String>> {
        Ok(self.conn().get(keys::user_server(user_id)).await?)
    }

    async fn unbind_user_server(&self, user_id: i64) -> Result<()> {
        self.conn().del::<_, ()>(keys::user_server(user_id)).await?;
        Ok(())
    }

    async fn join_room(&self, room_id: i64, user_id: i64, user_name: &str) -> Result<bool> {
        let added: bool = self
            .conn()
            .hset_nx(keys::room_members(room_id), user_id.to_string(), user_name)
            .await?;
        Ok(added)
    }

    async fn leave_room(&self, room_id: i64, user_id: i64) -> Result<()> {
        self.conn()
            .hdel::<_, _, ()>(keys::room_members(room_id), user_id.to_string())
            .await?;
        Ok(())
    }

    async fn room_members(&self, room_id: i64) -> Result<HashMap<String, String>> {
        Ok(self.conn().hgetall(keys::room_members(room_id)).await?)
    }

    async fn incr_room_online(&self, room_id: i64) -> Result<i64> {
        Ok(self
            .conn()
            .incr(keys::room_online_count(room_id), 1)
            .await?)
    }

    async fn decr_room_online(&self, room_id: i64) -> Result<i64> {
        let key = keys::room_online_count(room_id);
        let mut conn = self.conn();
        let count: Option<i64> = conn.get(&key).await?;
        match count {
            Some(n) if n > 0 => Ok(conn.decr(&key, 1).await?),
            _ => Ok(0),
        }
    }

    async fn room_online_count(&self, room_id: i64) -> Result<i64> {
        let count: Option<i64> = self.conn().get(keys::room_online_count(room_id)).await?;
        Ok(count.unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_variants() {
        assert_eq!(
            build_url("127.0.0.1:6379", "", 0),
            "redis://127.0.0.1:6379/0"
        );
        assert_eq!(
            build_url("redis://127.0.0.1:6379/", "hunter2", 3),
            "redis://:hunter2@127.0.0.1:6379/3"
        );
    }
}
