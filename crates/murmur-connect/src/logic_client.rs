use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use murmur_core::config::RPC_TIMEOUT_MS;
use murmur_core::{MurmurError, Result};
use murmur_protocol::rpc::{
    ConnectReply, ConnectRequest, DisconnectRequest, SuccessReply, RPC_CODE_SUCCESS,
};
use murmur_registry::{Registry, SERVICE_LOGIC};
use tracing::warn;

/// Client side of the Logic RPC surface, discovered through the registry.
/// Calls rotate across live Logic instances.
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

    async fn base_url(&self) -> Result<String> {
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
        Ok(entries[n].address.clone())
    }

    /// Resolve the first client frame into a user id. Zero means the token
    /// did not resolve.
    pub async fn connect(&self, auth_token: &str, room_id: i64, server_id: &str) -> Result<i64> {
        let base = self.base_url().await?;
        let reply: ConnectReply = self
            .http
            .post(format!("{}/rpc/connect", base))
            .json(&ConnectRequest {
                auth_token: auth_token.to_string(),
                room_id,
                server_id: server_id.to_string(),
            })
            .send()
            .await
            .map_err(rpc_err)?
            .json()
            .await
            .map_err(rpc_err)?;
        Ok(reply.user_id)
    }

    pub async fn disconnect(&self, user_id: i64, room_id: i64) -> Result<()> {
        let base = self.base_url().await?;
        let reply: SuccessReply = self
            .http
            .post(format!("{}/rpc/disconnect", base))
            .json(&DisconnectRequest { user_id, room_id })
            .send()
            .await
            .map_err(rpc_err)?
            .json()
            .await
            .map_err(rpc_err)?;
        if reply.code != RPC_CODE_SUCCESS {
            warn!(user_id, room_id, msg = %reply.msg, "disconnect rejected");
        }
        Ok(())
    }
}

fn rpc_err(e: reqwest::Error) -> MurmurError {
    MurmurError::Rpc {
        tier: "logic".to_string(),
        reason: e.to_string(),
    }
}
