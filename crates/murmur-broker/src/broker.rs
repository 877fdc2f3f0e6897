use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;

/// One consumed record. `key` is the partition key the producer attached
/// (`user:<id>`, `room:<id>`, ...); identical keys arrive in production
/// order.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub key: String,
    pub payload: Vec<u8>,
}

/// Partitioned-log fabric between tiers. At-least-once: a delivery is
/// acknowledged once it has been handed to the subscriber's channel, so a
/// crashed consumer replays unhandled records.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Append one record. Carries a deadline; a slow broker surfaces as an
    /// error to the caller rather than wedging the producer.
    async fn publish(&self, topic: &str, key: &str, payload: Vec<u8>) -> Result<()>;

    /// Join `group` on `topic` and stream records. Within a group each
    /// record is handed to one subscriber; separate groups each see the
    /// full stream.
    async fn subscribe(&self, topic: &str, group: &str) -> Result<mpsc::Receiver<Delivery>>;
}
