use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::channel::Channel;

/// In-memory handle for the members of one room on this edge. Channels are
/// keyed by user id; no back-reference to the channel's room object exists
/// (channels carry only the room id), so teardown is acyclic.
pub struct Room {
    pub id: i64,
    channels: RwLock<HashMap<i64, Arc<Channel>>>,
}

impl Room {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            channels: RwLock::new(HashMap::new()),
        }
    }

    pub fn put(&self, user_id: i64, ch: Arc<Channel>) {
        self.channels.write().unwrap().insert(user_id, ch);
    }

    /// Remove a member. Returns true when the room is now empty and should
    /// be dropped by its bucket.
    pub fn delete(&self, user_id: i64) -> bool {
        let mut channels = self.channels.write().unwrap();
        channels.remove(&user_id);
        channels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.channels.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fan a frame out to every member. Sessions with a full outbound
    /// queue lose the frame; nobody else waits for them.
    pub fn push(&self, frame: &str) {
        let channels = self.channels.read().unwrap();
        let mut dropped = 0usize;
        for ch in channels.values() {
            if !ch.push_frame(frame) {
                dropped += 1;
            }
        }
        if dropped > 0 {
            debug!(room_id = self.id, dropped, "slow consumers missed a frame");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slow_member_does_not_starve_the_room() {
        let room = Room::new(7);
        let (fast, mut fast_rx) = Channel::new(8);
        let (slow, _slow_rx) = Channel::new(1);
        room.put(1, fast);
        room.put(2, slow);

        // fill the slow member's queue
        room.push("one");
        room.push("two");
        room.push("three");

        // the fast member saw everything
        let mut seen = Vec::new();
        while let Ok(msg) = fast_rx.try_recv() {
            seen.push(msg);
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn delete_reports_empty() {
        let room = Room::new(7);
        let (a, _ra) = Channel::new(1);
        let (b, _rb) = Channel::new(1);
        room.put(1, a);
        room.put(2, b);

        assert!(!room.delete(1));
        assert!(room.delete(2));
        assert!(room.is_empty());
    }
}
