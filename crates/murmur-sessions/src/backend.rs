use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub user_id: i64,
    pub user_name: String,
}

/// Process-external session and routing truth. Logic is the only writer of
/// sessions and bindings; Connect and Task read through Logic.
///
/// Single-session-per-user is enforced by the Logic login path via
/// `token_for_user` + `delete_session`; the backend only provides the
/// primitives.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Write the auth session hash under the token, with the 24h TTL.
    async fn store_session(&self, token: &str, user: &SessionUser) -> Result<()>;

    /// Resolve a token. `None` when unknown or expired. Never extends TTL.
    async fn load_session(&self, token: &str) -> Result<Option<SessionUser>>;

    async fn delete_session(&self, token: &str) -> Result<()>;

    /// Remember the live token for a user (re-login invalidation path).
    async fn index_token(&self, user_id: i64, token: &str) -> Result<()>;

    async fn token_for_user(&self, user_id: i64) -> Result<Option<String>>;

    async fn delete_token_index(&self, user_id: i64) -> Result<()>;

    /// Bind a user to the edge that owns their socket, with a lease.
    async fn bind_user_server(&self, user_id: i64, server_id: &str) -> Result<()>;

    async fn server_for_user(&self, user_id: i64) -> Result<Option<String>>;

    async fn unbind_user_server(&self, user_id: i64) -> Result<()>;

    /// Add a member to the room hash. Returns false if already present.
    async fn join_room(&self, room_id: i64, user_id: i64, user_name: &str) -> Result<bool>;

    async fn leave_room(&self, room_id: i64, user_id: i64) -> Result<()>;

    async fn room_members(&self, room_id: i64) -> Result<HashMap<String, String>>;

    async fn incr_room_online(&self, room_id: i64) -> Result<i64>;

    /// Decrement the online counter, never going below zero.
    async fn decr_room_online(&self, room_id: i64) -> Result<i64>;

    async fn room_online_count(&self, room_id: i64) -> Result<i64>;
}
