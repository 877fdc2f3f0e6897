use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use murmur_core::config::RPC_TIMEOUT_MS;
use murmur_core::{MurmurError, Result};
use murmur_protocol::rpc::{
    CheckAuthReply, CheckAuthRequest, GetUserInfoReply, GetUserInfoRequest, ListMessagesReply,
    ListMessagesRequest, LoginRequest, LogoutRequest, RegisterRequest, RoomRequest, SendRequest,
    SuccessReply, TokenReply,
};
use murmur_registry::{Registry, SERVICE_LOGIC};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Front-end side of the Logic RPC surface, discovered through the
/// registry, rotating across live instances.
pub struct LogicClient {
    http: reqwest::Client,
    registry: Registry,
    cursor: AtomicUsize,
}

impl LogicClient {
    pub fn new(registry: Registry) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(RPC_TIMEOUT_MS))
            .build()
            .map_err(|e| MurmurError::Internal(e.to_string()))?;
        Ok(Self {
            http,
            registry,
            cursor: AtomicUsize::new(0),
        })
    }

    async fn call<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        let entries = self
            .registry
            .discover(SERVICE_LOGIC)
            .await
            .map_err(|e| MurmurError::Registry(e.to_string()))?;
        if entries.is_empty() {
            return Err(MurmurError::Rpc {
                tier: "logic".to_string(),
                reason: "no logic instance registered".to_string(),
            });
        }
        let n = self.cursor.fetch_add(1, Ordering::Relaxed) % entries.len();
        let url = format!("{}{}", entries[n].address, path);
        self.http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(rpc_err)?
            .json()
            .await
            .map_err(rpc_err)
    }

    pub async fn register(&self, name: &str, password: &str) -> Result<TokenReply> {
        self.call(
            "/rpc/register",
            &RegisterRequest {
                name: name.to_string(),
                password: password.to_string(),
            },
        )
        .await
    }

    pub async fn login(&self, name: &str, password: &str) -> Result<TokenReply> {
        self.call(
            "/rpc/login",
            &LoginRequest {
                name: name.to_string(),
                password: password.to_string(),
            },
        )
        .await
    }

    pub async fn check_auth(&self, auth_token: &str) -> Result<CheckAuthReply> {
        self.call(
            "/rpc/checkAuth",
            &CheckAuthRequest {
                auth_token: auth_token.to_string(),
            },
        )
        .await
    }

    pub async fn logout(&self, auth_token: &str) -> Result<SuccessReply> {
        self.call(
            "/rpc/logout",
            &LogoutRequest {
                auth_token: auth_token.to_string(),
            },
        )
        .await
    }

    pub async fn get_user_info(&self, user_id: i64) -> Result<GetUserInfoReply> {
        self.call("/rpc/getUserInfo", &GetUserInfoRequest { user_id })
            .await
    }

    pub async fn push(&self, req: &SendRequest) -> Result<SuccessReply> {
        self.call("/rpc/push", req).await
    }

    pub async fn push_room(&self, req: &SendRequest) -> Result<SuccessReply> {
        self.call("/rpc/pushRoom", req).await
    }

    pub async fn count(&self, room_id: i64) -> Result<SuccessReply> {
        self.call("/rpc/count", &RoomRequest { room_id }).await
    }

    pub async fn get_room_info(&self, room_id: i64) -> Result<SuccessReply> {
        self.call("/rpc/getRoomInfo", &RoomRequest { room_id }).await
    }

    pub async fn list_room_messages(&self, room_id: i64, limit: i64) -> Result<ListMessagesReply> {
        self.call(
            "/rpc/listRoomMessages",
            &ListMessagesRequest { room_id, limit },
        )
        .await
    }
}

fn rpc_err(e: reqwest::Error) -> MurmurError {
    MurmurError::Rpc {
        tier: "logic".to_string(),
        reason: e.to_string(),
    }
}
