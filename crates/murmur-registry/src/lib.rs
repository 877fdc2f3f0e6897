//! TTL-leased service registry. Edges and the Logic tier register under
//! `<basePath>/<service>/<serverId>`; a keepalive task refreshes the lease
//! so crashed processes age out on their own.

use std::time::Duration;

use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use murmur_core::config::REGISTRY_LEASE_SECS;

pub const SERVICE_LOGIC: &str = "Logic";
pub const SERVICE_CONNECT: &str = "Connect";

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry unreachable: {0}")]
    Connection(String),

    #[error("registry command failed: {0}")]
    Command(#[from] redis::RedisError),

    #[error("bad entry: {0}")]
    BadEntry(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RegistryError>;

/// One registered process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceEntry {
    pub server_id: String,
    /// Base URL of the RPC surface, e.g. `http://10.0.0.3:6912`.
    pub address: String,
    /// `serverId=<id>&serverType=<ws|tcp>` style metadata.
    pub metadata: String,
}

impl ServiceEntry {
    pub fn new(server_id: &str, address: &str, server_type: &str) -> Self {
        Self {
            server_id: server_id.to_string(),
            address: address.to_string(),
            metadata: format!("serverId={}&serverType={}", server_id, server_type),
        }
    }
}

#[derive(Clone)]
pub struct Registry {
    conn: MultiplexedConnection,
    base_path: String,
}

impl Registry {
    /// Registry being unreachable at init is fatal for every tier, so this
    /// fails hard after `connection_timeout` seconds.
    pub async fn connect(
        host: &str,
        base_path: &str,
        username: &str,
        password: &str,
        connection_timeout: u64,
    ) -> Result<Self> {
        let url = build_url(host, username, password);
        let client =
            redis::Client::open(url).map_err(|e| RegistryError::Connection(e.to_string()))?;
        let conn = tokio::time::timeout(
            Duration::from_secs(connection_timeout.max(1)),
            client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| RegistryError::Connection("connect timeout".to_string()))?
        .map_err(|e| RegistryError::Connection(e.to_string()))?;
        Ok(Self {
            conn,
            base_path: base_path.trim_end_matches('/').to_string(),
        })
    }

    fn entry_key(&self, service: &str, server_id: &str) -> String {
        format!("{}/{}/{}", self.base_path, service, server_id)
    }

    /// Write (or refresh) the entry with the standard lease.
    pub async fn register(&self, service: &str, entry: &ServiceEntry) -> Result<()> {
        let key = self.entry_key(service, &entry.server_id);
        let value = serde_json::to_string(entry)?;
        self.conn
            .clone()
            .set_ex::<_, _, ()>(key, value, REGISTRY_LEASE_SECS)
            .await?;
        Ok(())
    }

    pub async fn deregister(&self, service: &str, server_id: &str) -> Result<()> {
        self.conn
            .clone()
            .del::<_, ()>(self.entry_key(service, server_id))
            .await?;
        Ok(())
    }

    /// Every live entry for a service.
    pub async fn discover(&self, service: &str) -> Result<Vec<ServiceEntry>> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}/{}/*", self.base_path, service);
        let keys: Vec<String> = conn.keys(pattern).await?;
        let mut entries = Vec::with_capacity(keys.len());
        for key in keys {
            let value: Option<String> = conn.get(&key).await?;
            if let Some(value) = value {
                match serde_json::from_str(&value) {
                    Ok(entry) => entries.push(entry),
                    Err(e) => warn!(key, error = %e, "skipping malformed registry entry"),
                }
            }
        }
        Ok(entries)
    }

    /// Register now and keep the lease fresh until the handle is dropped
    /// or aborted.
    pub async fn register_with_keepalive(
        &self,
        service: &str,
        entry: ServiceEntry,
    ) -> Result<tokio::task::JoinHandle<()>> {
        self.register(service, &entry).await?;
        info!(service, server_id = %entry.server_id, address = %entry.address, "registered");

        let registry = self.clone();
        let service = service.to_string();
        Ok(tokio::spawn(async move {
            let period = Duration::from_secs(REGISTRY_LEASE_SECS / 3);
            loop {
                tokio::time::sleep(period).await;
                if let Err(e) = registry.register(&service, &entry).await {
                    warn!(service, error = %e, "lease refresh failed");
                }
            }
        }))
    }
}

fn build_url(host: &str, username: &str, password: &str) -> String {
    let bare = host.trim_start_matches("redis://").trim_end_matches('/');
    if password.is_empty() {
        format!("redis://{}/", bare)
    } else {
        format!("redis://{}:{}@{}/", username, password, bare)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_metadata_encoding() {
        let entry = ServiceEntry::new("ws-1", "http://127.0.0.1:6912", "ws");
        assert_eq!(entry.metadata, "serverId=ws-1&serverType=ws");
    }

    #[test]
    fn url_with_credentials() {
        assert_eq!(build_url("127.0.0.1:6379", "", ""), "redis://127.0.0.1:6379/");
        assert_eq!(
            build_url("redis://10.0.0.2:6379", "svc", "pw"),
            "redis://svc:pw@10.0.0.2:6379/"
        );
    }
}
