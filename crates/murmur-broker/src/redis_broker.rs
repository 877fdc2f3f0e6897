use std::time::Duration;

use async_trait::async_trait;
use murmur_core::config::PUBLISH_TIMEOUT_MS;
use redis::aio::MultiplexedConnection;
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::broker::{Broker, Delivery};
use crate::error::{BrokerError, Result};

const SUBSCRIBE_CHANNEL_DEPTH: usize = 1024;
const READ_BLOCK_MS: usize = 5_000;
const READ_BATCH: usize = 32;

/// Stream-backed fabric. Each topic is one stream, so consumption order
/// equals production order - the per-key ordering promise holds for every
/// key on the topic. Consumer groups give Kafka-style work sharing with
/// explicit acks.
pub struct RedisBroker {
    client: redis::Client,
    conn: MultiplexedConnection,
}

impl RedisBroker {
    /// `brokers` is the csv from config; the first endpoint is used.
    pub async fn connect(brokers: &str) -> Result<Self> {
        let url = brokers
            .split(',')
            .map(str::trim)
            .find(|s| !s.is_empty())
            .ok_or_else(|| BrokerError::Connection("no broker address".to_string()))?;
        let url = if url.starts_with("redis://") {
            url.to_string()
        } else {
            format!("redis://{}/", url)
        };
        let client =
            redis::Client::open(url).map_err(|e| BrokerError::Connection(e.to_string()))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| BrokerError::Connection(e.to_string()))?;
        Ok(Self { client, conn })
    }

    /// Create the group at the stream tail, creating the stream if absent
    /// (dev-style auto topic creation). An existing group is fine.
    async fn ensure_group(&self, topic: &str, group: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        match conn
            .xgroup_create_mkstream::<_, _, _, ()>(topic, group, "$")
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if e.to_string().contains("BUSYGROUP") => Ok(()),
            Err(e) => Err(BrokerError::Command(e)),
        }
    }
}

#[async_trait]
impl Broker for RedisBroker {
    async fn publish(&self, topic: &str, key: &str, payload: Vec<u8>) -> Result<()> {
        let mut conn = self.conn.clone();
        let fields = [("key", key.as_bytes()), ("payload", payload.as_slice())];
        let write = conn.xadd::<_, _, _, _, String>(topic, "*", &fields);
        match tokio::time::timeout(Duration::from_millis(PUBLISH_TIMEOUT_MS), write).await {
            Ok(res) => {
                res?;
                Ok(())
            }
            Err(_) => Err(BrokerError::Timeout {
                ms: PUBLISH_TIMEOUT_MS,
            }),
        }
    }

    async fn subscribe(&self, topic: &str, group: &str) -> Result<mpsc::Receiver<Delivery>> {
        self.ensure_group(topic, group).await?;

        // Dedicated connection per subscription - XREADGROUP blocks and
        // must not stall publishers sharing the multiplexed connection.
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| BrokerError::Connection(e.to_string()))?;

        let (tx, rx) = mpsc::channel(SUBSCRIBE_CHANNEL_DEPTH);
        let topic = topic.to_string();
        let group = group.to_string();
        let consumer = format!("{}-{}", group, uuid::Uuid::new_v4().simple());
        info!(topic, group, consumer, "subscribing");

        tokio::spawn(async move {
            let opts = StreamReadOptions::default()
                .group(&group, &consumer)
                .block(READ_BLOCK_MS)
                .count(READ_BATCH);
            loop {
                let reply: StreamReadReply =
                    match conn.xread_options(&[&topic], &[">"], &opts).await {
                        Ok(r) => r,
                        Err(e) => {
                            warn!(topic, error = %e, "stream read failed, retrying");
                            tokio::time::sleep(Duration::from_secs(1)).await;
                            continue;
                        }
                    };
                for stream_key in reply.keys {
                    for entry in stream_key.ids {
                        let key: String = entry
                            .map
                            .get("key")
                            .and_then(|v| redis::from_redis_value(v).ok())
                            .unwrap_or_default();
                        let payload: Vec<u8> = entry
                            .map
                            .get("payload")
                            .and_then(|v| redis::from_redis_value(v).ok())
                            .unwrap_or_default();
                        if tx.send(Delivery { key, payload }).await.is_err() {
                            info!(topic, "subscriber dropped, stopping consumer");
                            return;
                        }
                        if let Err(e) = conn
                            .xack::<_, _, _, i64>(&topic, &group, &[entry.id.as_str()])
                            .await
                        {
                            warn!(topic, error = %e, "ack failed");
                        }
                    }
                }
            }
        });

        Ok(rx)
    }
}
