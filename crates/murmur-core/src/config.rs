use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

// Cross-tier constants - every tier must agree on these.
pub const SESSION_TTL_SECS: u64 = 86_400; // auth session lifetime (24h)
pub const ROUTE_TTL_SECS: u64 = 86_400; // user → edge binding lease
pub const PUBLISH_TIMEOUT_MS: u64 = 5_000; // broker write deadline
pub const RPC_TIMEOUT_MS: u64 = 5_000; // tier-to-tier call deadline
pub const REGISTRY_LEASE_SECS: u64 = 60; // service entry TTL, refreshed at a third

/// Top-level config (murmur.toml + MURMUR_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MurmurConfig {
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub session_store: SessionStoreConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logic: LogicConfig,
    #[serde(default)]
    pub connect: ConnectConfig,
    #[serde(default)]
    pub task: TaskConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub ai: AiConfig,
}

/// Message fabric settings. `brokers` is a csv of redis stream endpoints;
/// the first entry is used. Delivery topics are `<queue_prefix>-<serverId>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    #[serde(default = "default_brokers")]
    pub brokers: String,
    #[serde(default = "default_queue_prefix")]
    pub queue_prefix: String,
    #[serde(default = "default_ai_jobs_topic")]
    pub ai_jobs_topic: String,
    #[serde(default = "default_ai_results_topic")]
    pub ai_results_topic: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            brokers: default_brokers(),
            queue_prefix: default_queue_prefix(),
            ai_jobs_topic: default_ai_jobs_topic(),
            ai_results_topic: default_ai_results_topic(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_registry_host")]
    pub host: String,
    #[serde(default = "default_base_path")]
    pub base_path: String,
    /// Seconds to wait for the registry on startup before failing fatally.
    #[serde(default = "default_conn_timeout")]
    pub connection_timeout: u64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            host: default_registry_host(),
            base_path: default_base_path(),
            connection_timeout: default_conn_timeout(),
            username: String::new(),
            password: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStoreConfig {
    #[serde(default = "default_session_addr")]
    pub address: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub db: i64,
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            address: default_session_addr(),
            password: String::new(),
            db: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogicConfig {
    #[serde(default = "default_logic_server_id")]
    pub server_id: String,
    /// Bind addresses for the RPC surface, csv of `host:port`.
    #[serde(default = "default_logic_rpc_bind")]
    pub rpc_bind: String,
}

impl Default for LogicConfig {
    fn default() -> Self {
        Self {
            server_id: default_logic_server_id(),
            rpc_bind: default_logic_rpc_bind(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectConfig {
    #[serde(default = "default_connect_server_id")]
    pub server_id: String,
    #[serde(default = "default_connect_rpc_bind")]
    pub rpc_bind: String,
    #[serde(default = "default_ws_bind")]
    pub ws_bind: String,
    #[serde(default)]
    pub bucket: BucketConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            server_id: default_connect_server_id(),
            rpc_bind: default_connect_rpc_bind(),
            ws_bind: default_ws_bind(),
            bucket: BucketConfig::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

/// Shard layout of one edge. The bucket set is fixed at process start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketConfig {
    #[serde(default = "default_bucket_count")]
    pub bucket_count: u32,
    /// Initial capacity of the user → channel map.
    #[serde(default = "default_channel_size")]
    pub channel_size: usize,
    /// Initial capacity of the room map.
    #[serde(default = "default_room_size")]
    pub room_size: usize,
    /// Broadcast lanes per bucket.
    #[serde(default = "default_lane_count")]
    pub broadcast_lane_count: u64,
    /// Depth of each lane queue.
    #[serde(default = "default_lane_queue_size")]
    pub lane_queue_size: usize,
    /// Depth of each session's outbound queue.
    #[serde(default = "default_outbound_queue_size")]
    pub outbound_queue_size: usize,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            bucket_count: default_bucket_count(),
            channel_size: default_channel_size(),
            room_size: default_room_size(),
            broadcast_lane_count: default_lane_count(),
            lane_queue_size: default_lane_queue_size(),
            outbound_queue_size: default_outbound_queue_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Per-frame write deadline, seconds.
    #[serde(default = "default_write_wait")]
    pub write_wait: u64,
    /// Read deadline; a pong must arrive within this window, seconds.
    #[serde(default = "default_pong_wait")]
    pub pong_wait: u64,
    /// Ping cadence, seconds. Must be below `pong_wait`.
    #[serde(default = "default_ping_period")]
    pub ping_period: u64,
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            write_wait: default_write_wait(),
            pong_wait: default_pong_wait(),
            ping_period: default_ping_period(),
            max_message_size: default_max_message_size(),
        }
    }
}

/// The dispatcher consumes one delivery topic per listed server id: the
/// edges it serves plus the Logic id whose topic carries room broadcasts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    #[serde(default = "default_task_server_ids")]
    pub server_ids: String,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            server_ids: default_task_server_ids(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_bind")]
    pub bind: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: default_api_bind(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AiProvider {
    Ollama,
    Kimi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_ai_provider")]
    pub provider: AiProvider,
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,
    #[serde(default = "default_ai_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: default_ai_provider(),
            base_url: default_ai_base_url(),
            model: default_ai_model(),
            api_key: String::new(),
        }
    }
}

fn default_brokers() -> String {
    "redis://127.0.0.1:6379/".to_string()
}
fn default_queue_prefix() -> String {
    "murmur-queue".to_string()
}
fn default_ai_jobs_topic() -> String {
    "ai.jobs".to_string()
}
fn default_ai_results_topic() -> String {
    "ai.results".to_string()
}
fn default_registry_host() -> String {
    "redis://127.0.0.1:6379/".to_string()
}
fn default_base_path() -> String {
    "/murmur".to_string()
}
fn default_conn_timeout() -> u64 {
    5
}
fn default_session_addr() -> String {
    "redis://127.0.0.1:6379/".to_string()
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.murmur/murmur.db", home)
}
fn default_logic_server_id() -> String {
    "logic-1".to_string()
}
fn default_logic_rpc_bind() -> String {
    "127.0.0.1:6900".to_string()
}
fn default_connect_server_id() -> String {
    "ws-1".to_string()
}
fn default_connect_rpc_bind() -> String {
    "127.0.0.1:6912".to_string()
}
fn default_ws_bind() -> String {
    "0.0.0.0:7000".to_string()
}
fn default_api_bind() -> String {
    "0.0.0.0:7070".to_string()
}
fn default_task_server_ids() -> String {
    "logic-1,ws-1".to_string()
}
fn default_bucket_count() -> u32 {
    32
}
fn default_channel_size() -> usize {
    1024
}
fn default_room_size() -> usize {
    128
}
fn default_lane_count() -> u64 {
    6
}
fn default_lane_queue_size() -> usize {
    256
}
fn default_outbound_queue_size() -> usize {
    512
}
fn default_write_wait() -> u64 {
    10
}
fn default_pong_wait() -> u64 {
    60
}
fn default_ping_period() -> u64 {
    54
}
fn default_max_message_size() -> usize {
    512
}
fn default_ai_provider() -> AiProvider {
    AiProvider::Ollama
}
fn default_ai_base_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_ai_model() -> String {
    "llama3.1".to_string()
}

impl MurmurConfig {
    /// Load config from a TOML file with MURMUR_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. MURMUR_CONFIG env var
    ///   3. ~/.murmur/murmur.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .or_else(|| std::env::var("MURMUR_CONFIG").ok())
            .unwrap_or_else(default_config_path);

        let config: MurmurConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("MURMUR_").split("_"))
            .extract()
            .map_err(|e| crate::error::MurmurError::Config(e.to_string()))?;

        Ok(config)
    }

    /// Delivery fabric topic for one edge.
    pub fn topic_for_server(&self, server_id: &str) -> String {
        format!("{}-{}", self.broker.queue_prefix, server_id)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.murmur/murmur.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_complete() {
        let cfg = MurmurConfig::default();
        assert_eq!(cfg.broker.ai_jobs_topic, "ai.jobs");
        assert_eq!(cfg.broker.ai_results_topic, "ai.results");
        assert_eq!(cfg.connect.bucket.bucket_count, 32);
        assert!(cfg.connect.timeouts.ping_period < cfg.connect.timeouts.pong_wait);
    }

    #[test]
    fn topic_name_carries_server_id() {
        let cfg = MurmurConfig::default();
        assert_eq!(cfg.topic_for_server("ws-7"), "murmur-queue-ws-7");
    }
}
