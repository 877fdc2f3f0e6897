use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::broker::{Broker, Delivery};
use crate::error::Result;

const CHANNEL_DEPTH: usize = 4096;

/// In-process fabric for tests and single-node development. Preserves the
/// contract that matters: production order per topic, one delivery per
/// group, full stream per distinct group.
#[derive(Default)]
pub struct MemoryBroker {
    // topic -> group -> sender
    topics: Mutex<HashMap<String, HashMap<String, mpsc::Sender<Delivery>>>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn publish(&self, topic: &str, key: &str, payload: Vec<u8>) -> Result<()> {
        let senders: Vec<mpsc::Sender<Delivery>> = {
            let topics = self.topics.lock().unwrap();
            topics
                .get(topic)
                .map(|groups| groups.values().cloned().collect())
                .unwrap_or_default()
        };
        // No subscribers yet: records published before the first subscribe
        // are dropped, like a group created at the stream tail. A dropped
        // receiver likewise just misses out.
        for tx in senders {
            let _ = tx
                .send(Delivery {
                    key: key.to_string(),
                    payload: payload.clone(),
                })
                .await;
        }
        Ok(())
    }

    async fn subscribe(&self, topic: &str, group: &str) -> Result<mpsc::Receiver<Delivery>> {
        let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
        let mut topics = self.topics.lock().unwrap();
        topics
            .entry(topic.to_string())
            .or_default()
            .insert(group.to_string(), tx);
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn per_key_ordering_is_production_order() {
        let broker = MemoryBroker::new();
        let mut rx = broker.subscribe("murmur-queue-ws-1", "g").await.unwrap();

        for i in 0..50u8 {
            let key = if i % 2 == 0 { "room:7" } else { "user:42" };
            broker
                .publish("murmur-queue-ws-1", key, vec![i])
                .await
                .unwrap();
        }

        let mut room_seen = Vec::new();
        let mut user_seen = Vec::new();
        for _ in 0..50 {
            let d = rx.recv().await.unwrap();
            match d.key.as_str() {
                "room:7" => room_seen.push(d.payload[0]),
                _ => user_seen.push(d.payload[0]),
            }
        }
        assert!(room_seen.windows(2).all(|w| w[0] < w[1]));
        assert!(user_seen.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn each_group_sees_the_full_stream() {
        let broker = MemoryBroker::new();
        let mut a = broker.subscribe("t", "task").await.unwrap();
        let mut b = broker.subscribe("t", "audit").await.unwrap();

        broker.publish("t", "room:1", b"x".to_vec()).await.unwrap();

        assert_eq!(a.recv().await.unwrap().payload, b"x");
        assert_eq!(b.recv().await.unwrap().payload, b"x");
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_dropped() {
        let broker = MemoryBroker::new();
        broker.publish("t", "k", b"lost".to_vec()).await.unwrap();

        let mut rx = broker.subscribe("t", "g").await.unwrap();
        broker.publish("t", "k", b"kept".to_vec()).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().payload, b"kept");
    }
}
