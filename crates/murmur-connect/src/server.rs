use std::hash::Hasher;
use std::sync::Arc;
use std::time::Duration;

use murmur_core::config::{BucketConfig, TimeoutConfig};
use twox_hash::XxHash32;

use crate::bucket::Bucket;
use crate::logic_client::LogicClient;

#[derive(Clone)]
pub struct ServerOptions {
    pub write_wait: Duration,
    pub pong_wait: Duration,
    pub ping_period: Duration,
    pub max_message_size: usize,
    pub outbound_queue_size: usize,
}

impl ServerOptions {
    pub fn from_config(t: &TimeoutConfig, b: &BucketConfig) -> Self {
        Self {
            write_wait: Duration::from_secs(t.write_wait),
            pong_wait: Duration::from_secs(t.pong_wait),
            ping_period: Duration::from_secs(t.ping_period),
            max_message_size: t.max_message_size,
            outbound_queue_size: b.outbound_queue_size,
        }
    }
}

/// Edge-wide state: the fixed bucket array plus the Logic operator used by
/// the session lifecycle.
pub struct Server {
    buckets: Vec<Arc<Bucket>>,
    pub options: ServerOptions,
    pub operator: Arc<LogicClient>,
    pub server_id: String,
}

impl Server {
    pub fn new(
        bucket_opts: &BucketConfig,
        options: ServerOptions,
        operator: Arc<LogicClient>,
        server_id: String,
    ) -> Arc<Self> {
        let buckets = (0..bucket_opts.bucket_count.max(1))
            .map(|_| Bucket::new(bucket_opts))
            .collect();
        Arc::new(Self {
            buckets,
            options,
            operator,
            server_id,
        })
    }

    /// Shard selection: stable for the process lifetime, uniform across
    /// buckets.
    pub fn bucket(&self, user_id: i64) -> &Arc<Bucket> {
        let idx = bucket_index(user_id, self.buckets.len() as u32);
        &self.buckets[idx as usize]
    }

    /// Single-recipient push. Missing channel means the recipient is not
    /// on this edge (or already gone) - the frame is dropped quietly.
    pub fn push_single(&self, user_id: i64, frame: &str) -> bool {
        match self.bucket(user_id).channel(user_id) {
            Some(ch) => ch.push_frame(frame),
            None => false,
        }
    }

    /// Room fan-out: every bucket gets the frame, and only buckets holding
    /// the room do any work.
    pub async fn broadcast_room(&self, room_id: i64, frame: String) {
        for bucket in &self.buckets {
            bucket.broadcast_room(room_id, frame.clone()).await;
        }
    }
}

/// 32-bit non-cryptographic hash of the decimal user id, modulo the bucket
/// count.
pub fn bucket_index(user_id: i64, bucket_count: u32) -> u32 {
    let s = user_id.to_string();
    let mut h = XxHash32::with_seed(0);
    h.write(s.as_bytes());
    (h.finish() as u32) % bucket_count.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_index_is_deterministic() {
        for uid in [1i64, 42, 999_999, 1_234_567_890] {
            assert_eq!(bucket_index(uid, 32), bucket_index(uid, 32));
        }
    }

    #[test]
    fn bucket_index_is_equidistributed() {
        const IDS: i64 = 100_000;
        const BUCKETS: u32 = 32;
        let mut counts = vec![0u32; BUCKETS as usize];
        for uid in 1..=IDS {
            counts[bucket_index(uid, BUCKETS) as usize] += 1;
        }
        let expected = IDS as f64 / BUCKETS as f64;
        for (i, &c) in counts.iter().enumerate() {
            let deviation = (c as f64 - expected).abs() / expected;
            assert!(
                deviation < 0.05,
                "bucket {} holds {} ids, {:.1}% off uniform",
                i,
                c,
                deviation * 100.0
            );
        }
    }
}
