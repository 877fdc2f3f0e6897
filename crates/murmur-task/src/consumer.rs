use std::sync::Arc;
use std::time::Duration;

use murmur_broker::Broker;
use tracing::{info, warn};

use crate::dispatch::Dispatcher;

/// Drain one delivery topic. The consumer group carries the edge's server
/// id, so extra task processes for the same edge split partitions instead
/// of duplicating work. Reconnects forever; consumption order within the
/// topic is the broker's order.
pub async fn run_delivery_consumer(
    broker: Arc<dyn Broker>,
    topic: String,
    group: String,
    dispatcher: Arc<Dispatcher>,
) {
    loop {
        let mut rx = match broker.subscribe(&topic, &group).await {
            Ok(rx) => rx,
            Err(e) => {
                warn!(topic, error = %e, "subscribe failed, retrying");
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }
        };
        info!(topic, group, "delivery consumer running");
        while let Some(delivery) = rx.recv().await {
            dispatcher.handle_delivery(&delivery.payload).await;
        }
        warn!(topic, "delivery stream ended, resubscribing");
    }
}

/// Drain `ai.results` with its own group and feed replies back through the
/// same broadcast path as ordinary room messages.
pub async fn run_ai_results_consumer(
    broker: Arc<dyn Broker>,
    topic: String,
    dispatcher: Arc<Dispatcher>,
) {
    loop {
        let mut rx = match broker.subscribe(&topic, "murmur-task-ai").await {
            Ok(rx) => rx,
            Err(e) => {
                warn!(topic, error = %e, "subscribe failed, retrying");
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }
        };
        info!(topic, "ai results consumer running");
        while let Some(delivery) = rx.recv().await {
            dispatcher.handle_ai_result(&delivery.payload).await;
        }
        warn!(topic, "ai results stream ended, resubscribing");
    }
}
