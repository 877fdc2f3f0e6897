use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use murmur_core::config::BucketConfig;
use tokio::sync::mpsc;

use crate::channel::Channel;
use crate::room::Room;

/// Work item for a broadcast lane.
pub struct RoomPush {
    pub room_id: i64,
    pub frame: String,
}

struct BucketInner {
    chs: HashMap<i64, Arc<Channel>>,
    rooms: HashMap<i64, Arc<Room>>,
}

/// One shard of an edge: the channels and room handles of the users that
/// hash here, one lock, and a fixed pool of broadcast lanes so room
/// fan-out for different rooms proceeds in parallel.
///
/// The lock is only ever held for map operations - never across I/O or an
/// await point. Frames travel through lane queues and per-session queues.
pub struct Bucket {
    inner: RwLock<BucketInner>,
    lanes: Vec<mpsc::Sender<RoomPush>>,
    lane_cursor: AtomicU64,
}

impl Bucket {
    /// Build the shard and start its lane workers. Lanes run for the
    /// process lifetime, like the bucket itself.
    pub fn new(opts: &BucketConfig) -> Arc<Self> {
        let mut lanes = Vec::with_capacity(opts.broadcast_lane_count as usize);
        let mut receivers = Vec::with_capacity(opts.broadcast_lane_count as usize);
        for _ in 0..opts.broadcast_lane_count.max(1) {
            let (tx, rx) = mpsc::channel(opts.lane_queue_size.max(1));
            lanes.push(tx);
            receivers.push(rx);
        }

        let bucket = Arc::new(Self {
            inner: RwLock::new(BucketInner {
                chs: HashMap::with_capacity(opts.channel_size),
                rooms: HashMap::with_capacity(opts.room_size),
            }),
            lanes,
            lane_cursor: AtomicU64::new(0),
        });

        for rx in receivers {
            tokio::spawn(run_lane(bucket.clone(), rx));
        }
        bucket
    }

    /// Insert a joined session, creating the room handle lazily.
    pub fn put(&self, user_id: i64, room_id: i64, ch: Arc<Channel>) {
        ch.set_identity(user_id, room_id);
        let room = {
            let mut inner = self.inner.write().unwrap();
            inner.chs.insert(user_id, ch.clone());
            inner
                .rooms
                .entry(room_id)
                .or_insert_with(|| Arc::new(Room::new(room_id)))
                .clone()
        };
        room.put(user_id, ch);
    }

    pub fn channel(&self, user_id: i64) -> Option<Arc<Channel>> {
        self.inner.read().unwrap().chs.get(&user_id).cloned()
    }

    pub fn room(&self, room_id: i64) -> Option<Arc<Room>> {
        self.inner.read().unwrap().rooms.get(&room_id).cloned()
    }

    /// Remove a session and, when its room empties, the room handle too.
    /// Mutates both maps, so this takes the write lock.
    pub fn delete_channel(&self, user_id: i64) {
        let mut inner = self.inner.write().unwrap();
        if let Some(ch) = inner.chs.remove(&user_id) {
            let room_id = ch.room_id();
            if let Some(room) = inner.rooms.get(&room_id).cloned() {
                if room.delete(user_id) {
                    inner.rooms.remove(&room_id);
                }
            }
        }
    }

    /// Hand a room frame to the next lane, round-robin. Lane order is FIFO
    /// per lane; cross-lane order is not promised.
    pub async fn broadcast_room(&self, room_id: i64, frame: String) {
        let n = self.lane_cursor.fetch_add(1, Ordering::Relaxed) % self.lanes.len() as u64;
        let _ = self.lanes[n as usize]
            .send(RoomPush { room_id, frame })
            .await;
    }
}

async fn run_lane(bucket: Arc<Bucket>, mut rx: mpsc::Receiver<RoomPush>) {
    while let Some(push) = rx.recv().await {
        if let Some(room) = bucket.room(push.room_id) {
            room.push(&push.frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> BucketConfig {
        BucketConfig {
            bucket_count: 1,
            channel_size: 8,
            room_size: 8,
            broadcast_lane_count: 2,
            lane_queue_size: 16,
            outbound_queue_size: 8,
        }
    }

    #[tokio::test]
    async fn put_creates_room_lazily_and_delete_drops_it() {
        let bucket = Bucket::new(&opts());
        let (ch, _rx) = Channel::new(4);
        bucket.put(42, 7, ch);

        assert!(bucket.channel(42).is_some());
        assert_eq!(bucket.room(7).unwrap().len(), 1);

        bucket.delete_channel(42);
        assert!(bucket.channel(42).is_none());
        assert!(bucket.room(7).is_none());
    }

    #[tokio::test]
    async fn room_survives_while_members_remain() {
        let bucket = Bucket::new(&opts());
        let (a, _ra) = Channel::new(4);
        let (b, _rb) = Channel::new(4);
        bucket.put(1, 5, a);
        bucket.put(2, 5, b);

        bucket.delete_channel(1);
        assert!(bucket.room(5).is_some());
        assert_eq!(bucket.room(5).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn broadcast_reaches_members_via_lanes() {
        let bucket = Bucket::new(&opts());
        let (ch, mut rx) = Channel::new(4);
        bucket.put(1, 9, ch);

        bucket.broadcast_room(9, "hello".to_string()).await;
        let msg = tokio::time::timeout(std::time::Duration::from_secs(1), rx.recv())
            .await
            .expect("lane delivered")
            .unwrap();
        match msg {
            axum::extract::ws::Message::Text(t) => assert_eq!(t.as_str(), "hello"),
            other => panic!("unexpected frame {:?}", other),
        }
    }
}
