use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use murmur_core::config::RPC_TIMEOUT_MS;
use murmur_core::{MurmurError, Result};
use murmur_protocol::rpc::{PushRoomRequest, PushSingleRequest};
use murmur_registry::{Registry, ServiceEntry, SERVICE_CONNECT};
use serde_json::Value;
use tracing::warn;

const DISCOVERY_CACHE_TTL: Duration = Duration::from_secs(10);

/// Which edge push endpoint a room fan-out hits. The bodies are identical;
/// only the route differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPushKind {
    Msg,
    Count,
    Info,
}

impl RoomPushKind {
    fn path(self) -> &'static str {
        match self {
            RoomPushKind::Msg => "/rpc/pushRoom",
            RoomPushKind::Count => "/rpc/pushRoomCount",
            RoomPushKind::Info => "/rpc/pushRoomInfo",
        }
    }
}

/// Seam between the dispatcher and the Connect edges.
#[async_trait]
pub trait EdgeClient: Send + Sync {
    /// Deliver to the one edge holding the recipient. An unknown edge id
    /// drops the message.
    async fn push_single(&self, server_id: &str, user_id: i64, msg: &Value) -> Result<()>;

    /// Deliver a room push to every registered edge.
    async fn broadcast_room(&self, kind: RoomPushKind, room_id: i64, msg: &Value) -> Result<()>;
}

/// HTTP implementation over registry discovery. Discovery results are
/// cached briefly; calls retry once before the message is dropped.
pub struct HttpEdgeClient {
    http: reqwest::Client,
    registry: Registry,
    cache: Mutex<Option<(Instant, Vec<ServiceEntry>)>>,
}

impl HttpEdgeClient {
    pub fn new(registry: Registry) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(RPC_TIMEOUT_MS))
            .build()
            .map_err(|e| MurmurError::Internal(e.to_string()))?;
        Ok(Self {
            http,
            registry,
            cache: Mutex::new(None),
        })
    }

    async fn edges(&self) -> Result<Vec<ServiceEntry>> {
        if let Some((at, entries)) = self.cache.lock().unwrap().clone() {
            if at.elapsed() < DISCOVERY_CACHE_TTL {
                return Ok(entries);
            }
        }
        let entries = self
            .registry
            .discover(SERVICE_CONNECT)
            .await
            .map_err(|e| MurmurError::Registry(e.to_string()))?;
        *self.cache.lock().unwrap() = Some((Instant::now(), entries.clone()));
        Ok(entries)
    }

    /// One retry, then the caller drops the message.
    async fn post_json<B: serde::Serialize>(&self, url: &str, body: &B) -> Result<()> {
        for attempt in 0..2 {
            match self.http.post(url).json(body).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(resp) => {
                    warn!(url, status = %resp.status(), attempt, "edge push rejected");
                }
                Err(e) => {
                    warn!(url, error = %e, attempt, "edge push failed");
                }
            }
        }
        Err(MurmurError::Rpc {
            tier: "connect".to_string(),
            reason: format!("push to {} failed after retry", url),
        })
    }
}

#[async_trait]
impl EdgeClient for HttpEdgeClient {
    async fn push_single(&self, server_id: &str, user_id: i64, msg: &Value) -> Result<()> {
        let edges = self.edges().await?;
        let Some(edge) = edges.iter().find(|e| e.server_id == server_id) else {
            warn!(server_id, user_id, "target edge not registered, dropped");
            return Ok(());
        };
        let body = PushSingleRequest {
            user_id,
            msg: msg.clone(),
        };
        self.post_json(&format!("{}/rpc/pushSingle", edge.address), &body)
            .await
    }

    async fn broadcast_room(&self, kind: RoomPushKind, room_id: i64, msg: &Value) -> Result<()> {
        let body = PushRoomRequest {
            room_id,
            msg: msg.clone(),
        };
        for edge in self.edges().await? {
            if let Err(e) = self
                .post_json(&format!("{}{}", edge.address, kind.path()), &body)
                .await
            {
                // one slow edge must not stop the others
                warn!(server_id = %edge.server_id, room_id, error = %e, "edge dropped a room push");
            }
        }
        Ok(())
    }
}
