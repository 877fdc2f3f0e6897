use std::collections::HashMap;
use std::sync::Arc;

use murmur_broker::Broker;
use murmur_core::{MurmurError, Result};
use murmur_protocol::{AiJob, Envelope};
use serde_json::Value;
use tracing::debug;

/// Marshals envelopes onto the delivery fabric and AI jobs onto the AI
/// fabric. The topic choice encodes routing: single sends go to the
/// recipient's edge topic, room traffic to this authority's own topic.
pub struct Producer {
    broker: Arc<dyn Broker>,
    queue_prefix: String,
    ai_jobs_topic: String,
}

impl Producer {
    pub fn new(broker: Arc<dyn Broker>, queue_prefix: &str, ai_jobs_topic: &str) -> Self {
        Self {
            broker,
            queue_prefix: queue_prefix.to_string(),
            ai_jobs_topic: ai_jobs_topic.to_string(),
        }
    }

    fn topic_for_server(&self, server_id: &str) -> String {
        format!("{}-{}", self.queue_prefix, server_id)
    }

    async fn publish(&self, topic: &str, env: &Envelope) -> Result<()> {
        let payload = serde_json::to_vec(env)?;
        self.broker
            .publish(topic, &env.partition_key(), payload)
            .await
            .map_err(|e| MurmurError::Broker(e.to_string()))?;
        debug!(topic, key = %env.partition_key(), "published envelope");
        Ok(())
    }

    pub async fn publish_single(
        &self,
        edge_server_id: &str,
        to_user_id: i64,
        inner: Value,
    ) -> Result<()> {
        let env = Envelope::single_send(edge_server_id, to_user_id, inner);
        self.publish(&self.topic_for_server(edge_server_id), &env)
            .await
    }

    pub async fn publish_room_msg(
        &self,
        topic_server_id: &str,
        room_id: i64,
        count: i64,
        room_user_info: HashMap<String, String>,
        inner: Value,
    ) -> Result<()> {
        let env = Envelope::room_send(room_id, count, room_user_info, inner);
        self.publish(&self.topic_for_server(topic_server_id), &env)
            .await
    }

    pub async fn publish_room_count(
        &self,
        topic_server_id: &str,
        room_id: i64,
        count: i64,
    ) -> Result<()> {
        let env = Envelope::room_count(room_id, count);
        self.publish(&self.topic_for_server(topic_server_id), &env)
            .await
    }

    pub async fn publish_room_info(
        &self,
        topic_server_id: &str,
        room_id: i64,
        count: i64,
        room_user_info: HashMap<String, String>,
    ) -> Result<()> {
        let env = Envelope::room_info(room_id, count, room_user_info);
        self.publish(&self.topic_for_server(topic_server_id), &env)
            .await
    }

    pub async fn publish_ai_job(&self, job: &AiJob) -> Result<()> {
        let payload = serde_json::to_vec(job)?;
        self.broker
            .publish(
                &self.ai_jobs_topic,
                &format!("room:{}", job.room_id),
                payload,
            )
            .await
            .map_err(|e| MurmurError::Broker(e.to_string()))
    }
}
