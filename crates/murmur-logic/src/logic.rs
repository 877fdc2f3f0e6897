use std::sync::Arc;

use murmur_core::clock::now_date_time;
use murmur_core::ids::Snowflake;
use murmur_history::ChatStore;
use murmur_protocol::rpc::{
    CheckAuthReply, ConnectReply, GetUserInfoReply, ListMessagesReply, MessageDto, SendRequest,
    SuccessReply, TokenReply, RPC_CODE_FAIL, RPC_CODE_SUCCESS,
};
use murmur_protocol::{ChatBody, OP_ROOM_SEND, OP_SINGLE_SEND};
use murmur_sessions::{SessionBackend, SessionUser};
use murmur_users::{UserError, UserStore};
use tracing::{info, warn};

use crate::commands::parse_command;
use crate::producer::Producer;

/// The stateless authority: session truth, room membership, message
/// normalization and publication. Every operation returns a reply with a
/// numeric code; store and broker outages become failure codes, never
/// panics.
pub struct Logic {
    sessions: Arc<dyn SessionBackend>,
    users: Arc<UserStore>,
    history: Arc<ChatStore>,
    producer: Producer,
    ids: Snowflake,
    /// Topic suffix for room-keyed publishes.
    server_id: String,
}

impl Logic {
    pub fn new(
        sessions: Arc<dyn SessionBackend>,
        users: Arc<UserStore>,
        history: Arc<ChatStore>,
        producer: Producer,
        ids: Snowflake,
        server_id: String,
    ) -> Self {
        Self {
            sessions,
            users,
            history,
            producer,
            ids,
            server_id,
        }
    }

    fn new_token() -> String {
        // two v4 uuids - 64 hex chars, 32 bytes of entropy
        format!(
            "{}{}",
            uuid::Uuid::new_v4().simple(),
            uuid::Uuid::new_v4().simple()
        )
    }

    /// Create the user and issue a fresh session, as if logged in.
    pub async fn register(&self, name: &str, password_hash: &str) -> TokenReply {
        let user_id = match self.users.register(name, password_hash) {
            Ok(id) => id,
            Err(UserError::NameTaken(_)) => {
                return TokenReply {
                    code: RPC_CODE_FAIL,
                    auth_token: String::new(),
                    msg: "this user name already exists, please login".to_string(),
                };
            }
            Err(e) => {
                warn!(error = %e, "register failed");
                return TokenReply {
                    code: RPC_CODE_FAIL,
                    auth_token: String::new(),
                    msg: "register failed".to_string(),
                };
            }
        };
        self.issue_session(user_id, name).await
    }

    /// Verify credentials. A prior session for the user is destroyed first
    /// - one live session per user, always.
    pub async fn login(&self, name: &str, password_hash: &str) -> TokenReply {
        let user = match self.users.verify(name, password_hash) {
            Ok(u) => u,
            Err(_) => {
                return TokenReply {
                    code: RPC_CODE_FAIL,
                    auth_token: String::new(),
                    msg: "no such user or wrong password".to_string(),
                };
            }
        };
        if let Ok(Some(old_token)) = self.sessions.token_for_user(user.id).await {
            if let Err(e) = self.sessions.delete_session(&old_token).await {
                warn!(user_id = user.id, error = %e, "failed to drop prior session");
            }
        }
        self.issue_session(user.id, &user.user_name).await
    }

    async fn issue_session(&self, user_id: i64, user_name: &str) -> TokenReply {
        let token = Self::new_token();
        let user = SessionUser {
            user_id,
            user_name: user_name.to_string(),
        };
        let stored = self.sessions.store_session(&token, &user).await;
        let indexed = self.sessions.index_token(user_id, &token).await;
        if let Err(e) = stored.and(indexed) {
            warn!(user_id, error = %e, "session write failed");
            return TokenReply {
                code: RPC_CODE_FAIL,
                auth_token: String::new(),
                msg: "session store unavailable".to_string(),
            };
        }
        TokenReply {
            code: RPC_CODE_SUCCESS,
            auth_token: token,
            msg: String::new(),
        }
    }

    /// Resolve a token without extending its TTL.
    pub async fn check_auth(&self, auth_token: &str) -> CheckAuthReply {
        match self.sessions.load_session(auth_token).await {
            Ok(Some(user)) => CheckAuthReply {
                code: RPC_CODE_SUCCESS,
                user_id: user.user_id,
                user_name: user.user_name,
            },
            _ => CheckAuthReply {
                code: RPC_CODE_FAIL,
                user_id: 0,
                user_name: String::new(),
            },
        }
    }

    pub async fn logout(&self, auth_token: &str) -> SuccessReply {
        let user = match self.sessions.load_session(auth_token).await {
            Ok(Some(user)) => user,
            _ => return SuccessReply::fail("no such session"),
        };
        let a = self.sessions.delete_token_index(user.user_id).await;
        let b = self.sessions.unbind_user_server(user.user_id).await;
        let c = self.sessions.delete_session(auth_token).await;
        if let Err(e) = a.and(b).and(c) {
            warn!(user_id = user.user_id, error = %e, "logout cleanup failed");
            return SuccessReply::fail("logout failed");
        }
        info!(user_id = user.user_id, "logged out");
        SuccessReply::ok()
    }

    pub async fn get_user_info(&self, user_id: i64) -> GetUserInfoReply {
        match self.users.name_by_id(user_id) {
            Ok(Some(user_name)) => GetUserInfoReply {
                code: RPC_CODE_SUCCESS,
                user_id,
                user_name,
            },
            _ => GetUserInfoReply {
                code: RPC_CODE_FAIL,
                user_id,
                user_name: String::new(),
            },
        }
    }

    /// An edge reports a freshly authenticated socket: bind the user to
    /// that edge and enter them into the room. Returns user id 0 when the
    /// token does not resolve.
    pub async fn connect(&self, auth_token: &str, room_id: i64, server_id: &str) -> ConnectReply {
        let user = match self.sessions.load_session(auth_token).await {
            Ok(Some(user)) => user,
            _ => {
                return ConnectReply {
                    code: RPC_CODE_SUCCESS,
                    user_id: 0,
                }
            }
        };
        if let Err(e) = self
            .sessions
            .bind_user_server(user.user_id, server_id)
            .await
        {
            warn!(user_id = user.user_id, error = %e, "bind to edge failed");
        }
        match self
            .sessions
            .join_room(room_id, user.user_id, &user.user_name)
            .await
        {
            Ok(true) => {
                if let Err(e) = self.sessions.incr_room_online(room_id).await {
                    warn!(room_id, error = %e, "online incr failed");
                }
            }
            Ok(false) => {} // rejoining, already counted
            Err(e) => warn!(room_id, error = %e, "room join failed"),
        }
        info!(user_id = user.user_id, room_id, server_id, "connected");
        ConnectReply {
            code: RPC_CODE_SUCCESS,
            user_id: user.user_id,
        }
    }

    /// An edge reports a closed socket: leave the room, drop the count
    /// (never below zero) and broadcast the fresh member snapshot.
    pub async fn disconnect(&self, user_id: i64, room_id: i64) -> SuccessReply {
        if room_id > 0 {
            if let Err(e) = self.sessions.decr_room_online(room_id).await {
                warn!(room_id, error = %e, "online decr failed");
            }
        }
        if user_id != 0 {
            if let Err(e) = self.sessions.leave_room(room_id, user_id).await {
                warn!(room_id, user_id, error = %e, "room leave failed");
            }
        }
        let members = self.sessions.room_members(room_id).await.unwrap_or_default();
        if let Err(e) = self
            .producer
            .publish_room_info(&self.server_id, room_id, members.len() as i64, members)
            .await
        {
            warn!(room_id, error = %e, "room info publish failed");
            return SuccessReply::fail("publish failed");
        }
        SuccessReply::ok()
    }

    /// Single-recipient send. An unbound recipient is offline - the
    /// message is dropped without an error.
    pub async fn push(&self, req: &SendRequest) -> SuccessReply {
        let server_id = match self.sessions.server_for_user(req.to_user_id).await {
            Ok(Some(sid)) => sid,
            Ok(None) => {
                info!(to_user_id = req.to_user_id, "recipient offline, dropped");
                return SuccessReply::ok();
            }
            Err(e) => {
                warn!(error = %e, "edge lookup failed");
                return SuccessReply::fail("session store unavailable");
            }
        };
        let body = ChatBody {
            code: 0,
            msg: req.msg.clone(),
            from_user_id: req.from_user_id,
            from_user_name: req.from_user_name.clone(),
            to_user_id: req.to_user_id,
            to_user_name: req.to_user_name.clone(),
            room_id: req.room_id,
            op: OP_SINGLE_SEND,
            create_time: now_date_time(),
            client_msg_id: 0,
        };
        let inner = match serde_json::to_value(&body) {
            Ok(v) => v,
            Err(e) => return SuccessReply::fail(e.to_string()),
        };
        match self
            .producer
            .publish_single(&server_id, req.to_user_id, inner)
            .await
        {
            Ok(()) => SuccessReply::ok(),
            Err(e) => {
                warn!(error = %e, "single publish failed");
                SuccessReply::fail("publish failed")
            }
        }
    }

    /// Room send. `/ai`-family bodies become AI jobs and never produce a
    /// chat broadcast; everything else is stamped, given a snowflake id,
    /// and published keyed by room.
    pub async fn push_room(&self, req: &SendRequest) -> SuccessReply {
        if let Some(cmd) = parse_command(&req.msg) {
            let job = cmd.into_job(req.room_id, req.from_user_id, &req.from_user_name);
            return match self.producer.publish_ai_job(&job).await {
                Ok(()) => SuccessReply::ok(),
                Err(e) => {
                    warn!(room_id = req.room_id, error = %e, "ai job publish failed");
                    SuccessReply::fail("ai job publish failed")
                }
            };
        }

        let members = match self.sessions.room_members(req.room_id).await {
            Ok(m) => m,
            Err(e) => {
                warn!(room_id = req.room_id, error = %e, "member lookup failed");
                return SuccessReply::fail("session store unavailable");
            }
        };
        let body = ChatBody {
            code: 0,
            msg: req.msg.clone(),
            from_user_id: req.from_user_id,
            from_user_name: req.from_user_name.clone(),
            to_user_id: 0,
            to_user_name: String::new(),
            room_id: req.room_id,
            op: OP_ROOM_SEND,
            create_time: now_date_time(),
            client_msg_id: self.ids.next_id(),
        };
        let inner = match serde_json::to_value(&body) {
            Ok(v) => v,
            Err(e) => return SuccessReply::fail(e.to_string()),
        };
        match self
            .producer
            .publish_room_msg(
                &self.server_id,
                req.room_id,
                members.len() as i64,
                members,
                inner,
            )
            .await
        {
            Ok(()) => SuccessReply::ok(),
            Err(e) => {
                warn!(room_id = req.room_id, error = %e, "room publish failed");
                SuccessReply::fail("publish failed")
            }
        }
    }

    /// Publish the room's online count. An unknown room counts as zero.
    pub async fn count(&self, room_id: i64) -> SuccessReply {
        let count = self.sessions.room_online_count(room_id).await.unwrap_or(0);
        match self
            .producer
            .publish_room_count(&self.server_id, room_id, count)
            .await
        {
            Ok(()) => SuccessReply::ok(),
            Err(e) => {
                warn!(room_id, error = %e, "count publish failed");
                SuccessReply::fail("publish failed")
            }
        }
    }

    /// Publish the room's member snapshot. An empty room is a failure
    /// here, unlike `count`.
    pub async fn get_room_info(&self, room_id: i64) -> SuccessReply {
        let members = self.sessions.room_members(room_id).await.unwrap_or_default();
        if members.is_empty() {
            return SuccessReply::fail("room has no members");
        }
        match self
            .producer
            .publish_room_info(&self.server_id, room_id, members.len() as i64, members)
            .await
        {
            Ok(()) => SuccessReply::ok(),
            Err(e) => {
                warn!(room_id, error = %e, "room info publish failed");
                SuccessReply::fail("publish failed")
            }
        }
    }

    /// Read-through to history, ascending chronological order.
    pub async fn list_room_messages(&self, room_id: i64, limit: i64) -> ListMessagesReply {
        if room_id <= 0 {
            return ListMessagesReply {
                code: RPC_CODE_FAIL,
                data: Vec::new(),
            };
        }
        match self.history.list_room_messages(room_id, limit) {
            Ok(rows) => ListMessagesReply {
                code: RPC_CODE_SUCCESS,
                data: rows
                    .into_iter()
                    .map(|r| MessageDto {
                        id: r.id,
                        room_id: r.room_id,
                        from_user_id: r.from_user_id,
                        from_user_name: r.from_user_name,
                        content: r.content,
                        create_time: r.created_at,
                    })
                    .collect(),
            },
            Err(e) => {
                warn!(room_id, error = %e, "history read failed");
                ListMessagesReply {
                    code: RPC_CODE_FAIL,
                    data: Vec::new(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_broker::{Broker, MemoryBroker};
    use murmur_protocol::{AiJob, Envelope, OP_ROOM_INFO_SEND};
    use murmur_sessions::MemorySessions;

    const TOPIC: &str = "murmur-queue-logic-1";

    struct Harness {
        logic: Logic,
        broker: Arc<MemoryBroker>,
        sessions: Arc<MemorySessions>,
    }

    fn harness() -> Harness {
        let sessions = Arc::new(MemorySessions::new());
        let broker = Arc::new(MemoryBroker::new());

        let users_conn = rusqlite::Connection::open_in_memory().unwrap();
        murmur_users::db::init_db(&users_conn).unwrap();
        let history_conn = rusqlite::Connection::open_in_memory().unwrap();
        murmur_history::db::init_db(&history_conn).unwrap();

        let producer = Producer::new(broker.clone(), "murmur-queue", "ai.jobs");
        let logic = Logic::new(
            sessions.clone(),
            Arc::new(UserStore::new(users_conn)),
            Arc::new(ChatStore::new(history_conn)),
            producer,
            Snowflake::new(1),
            "logic-1".to_string(),
        );
        Harness {
            logic,
            broker,
            sessions,
        }
    }

    fn send(room_id: i64, msg: &str) -> SendRequest {
        SendRequest {
            msg: msg.to_string(),
            from_user_id: 42,
            from_user_name: "alice".to_string(),
            to_user_id: 0,
            to_user_name: String::new(),
            room_id,
        }
    }

    #[tokio::test]
    async fn relogin_invalidates_prior_token() {
        let h = harness();
        let first = h.logic.register("bob", "h4sh").await;
        assert_eq!(first.code, RPC_CODE_SUCCESS);

        let second = h.logic.login("bob", "h4sh").await;
        assert_eq!(second.code, RPC_CODE_SUCCESS);
        assert_ne!(first.auth_token, second.auth_token);

        // one live session per user: the register-era token is dead
        assert_eq!(h.logic.check_auth(&first.auth_token).await.code, RPC_CODE_FAIL);
        let live = h.logic.check_auth(&second.auth_token).await;
        assert_eq!(live.code, RPC_CODE_SUCCESS);
        assert_eq!(live.user_name, "bob");
    }

    #[tokio::test]
    async fn duplicate_register_is_rejected() {
        let h = harness();
        assert_eq!(h.logic.register("carol", "x").await.code, RPC_CODE_SUCCESS);
        assert_eq!(h.logic.register("carol", "y").await.code, RPC_CODE_FAIL);
    }

    #[tokio::test]
    async fn connect_then_disconnect_updates_room_state() {
        let h = harness();
        let mut rx = h.broker.subscribe(TOPIC, "task").await.unwrap();

        let t1 = h.logic.register("alice", "a").await.auth_token;
        let t2 = h.logic.register("bob", "b").await.auth_token;
        let alice = h.logic.connect(&t1, 5, "ws-1").await.user_id;
        let bob = h.logic.connect(&t2, 5, "ws-1").await.user_id;
        assert!(alice > 0 && bob > 0);
        assert_eq!(h.sessions.room_online_count(5).await.unwrap(), 2);

        let reply = h.logic.disconnect(bob, 5).await;
        assert_eq!(reply.code, RPC_CODE_SUCCESS);
        assert_eq!(h.sessions.room_online_count(5).await.unwrap(), 1);

        // the broadcast member snapshot omits the leaver
        let delivery = rx.recv().await.unwrap();
        let env: Envelope = serde_json::from_slice(&delivery.payload).unwrap();
        assert_eq!(env.op, OP_ROOM_INFO_SEND);
        let info = env.room_user_info.unwrap();
        assert!(info.contains_key(&alice.to_string()));
        assert!(!info.contains_key(&bob.to_string()));
    }

    #[tokio::test]
    async fn unknown_token_connects_as_user_zero() {
        let h = harness();
        assert_eq!(h.logic.connect("bogus", 5, "ws-1").await.user_id, 0);
    }

    #[tokio::test]
    async fn room_pushes_keep_production_order() {
        let h = harness();
        let mut rx = h.broker.subscribe(TOPIC, "task").await.unwrap();

        let token = h.logic.register("alice", "a").await.auth_token;
        h.logic.connect(&token, 7, "ws-1").await;

        assert_eq!(h.logic.push_room(&send(7, "one")).await.code, RPC_CODE_SUCCESS);
        assert_eq!(h.logic.push_room(&send(7, "two")).await.code, RPC_CODE_SUCCESS);

        let mut inner_msgs = Vec::new();
        for _ in 0..2 {
            let d = rx.recv().await.unwrap();
            assert_eq!(d.key, "room:7");
            let env: Envelope = serde_json::from_slice(&d.payload).unwrap();
            let chat: ChatBody = env.inner().unwrap();
            assert!(chat.client_msg_id > 0);
            inner_msgs.push(chat.msg);
        }
        assert_eq!(inner_msgs, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn commands_go_to_the_ai_fabric_not_the_room() {
        let h = harness();
        let mut delivery = h.broker.subscribe(TOPIC, "task").await.unwrap();
        let mut jobs = h.broker.subscribe("ai.jobs", "ai-worker").await.unwrap();

        let reply = h.logic.push_room(&send(7, "/ai explain snowflakes")).await;
        assert_eq!(reply.code, RPC_CODE_SUCCESS);

        let job: AiJob =
            serde_json::from_slice(&jobs.recv().await.unwrap().payload).unwrap();
        assert_eq!(job.room_id, 7);
        assert_eq!(job.prompt, "explain snowflakes");

        // no chat broadcast was produced for the command
        assert!(delivery.try_recv().is_err());
    }

    #[tokio::test]
    async fn push_to_offline_recipient_is_silently_dropped() {
        let h = harness();
        let mut rx = h.broker.subscribe("murmur-queue-ws-1", "task").await.unwrap();

        let mut req = send(0, "psst");
        req.to_user_id = 999; // nobody bound
        assert_eq!(h.logic.push(&req).await.code, RPC_CODE_SUCCESS);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn single_push_targets_the_bound_edge() {
        let h = harness();
        let mut rx = h.broker.subscribe("murmur-queue-ws-9", "task").await.unwrap();

        let token = h.logic.register("dave", "d").await.auth_token;
        let dave = h.logic.connect(&token, 3, "ws-9").await.user_id;

        let mut req = send(3, "hello dave");
        req.to_user_id = dave;
        h.logic.push(&req).await;

        let d = rx.recv().await.unwrap();
        assert_eq!(d.key, format!("user:{}", dave));
        let env: Envelope = serde_json::from_slice(&d.payload).unwrap();
        assert_eq!(env.server_id.as_deref(), Some("ws-9"));
    }

    #[tokio::test]
    async fn count_of_empty_room_publishes_zero() {
        let h = harness();
        let mut rx = h.broker.subscribe(TOPIC, "task").await.unwrap();

        assert_eq!(h.logic.count(99).await.code, RPC_CODE_SUCCESS);
        let env: Envelope =
            serde_json::from_slice(&rx.recv().await.unwrap().payload).unwrap();
        assert_eq!(env.count, Some(0));
    }
}
