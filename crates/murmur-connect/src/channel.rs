use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use axum::extract::ws::Message;
use tokio::sync::mpsc;

/// One live client session: the socket's outbound queue plus the identity
/// it acquired at join time. The writer pump owns the receiving half.
pub struct Channel {
    user_id: AtomicI64,
    room_id: AtomicI64,
    outbound: mpsc::Sender<Message>,
}

impl Channel {
    pub fn new(queue_size: usize) -> (Arc<Self>, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(queue_size);
        (
            Arc::new(Self {
                user_id: AtomicI64::new(0),
                room_id: AtomicI64::new(0),
                outbound: tx,
            }),
            rx,
        )
    }

    pub fn user_id(&self) -> i64 {
        self.user_id.load(Ordering::Acquire)
    }

    pub fn room_id(&self) -> i64 {
        self.room_id.load(Ordering::Acquire)
    }

    pub fn set_identity(&self, user_id: i64, room_id: i64) {
        self.user_id.store(user_id, Ordering::Release);
        self.room_id.store(room_id, Ordering::Release);
    }

    /// Enqueue a text frame. A full queue drops the frame for this session
    /// only - the slow-consumer policy; the sender is never blocked.
    pub fn push_frame(&self, text: &str) -> bool {
        self.push_raw(Message::Text(text.to_string().into()))
    }

    pub fn push_raw(&self, msg: Message) -> bool {
        self.outbound.try_send(msg).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_queue_drops_without_blocking() {
        let (ch, _rx) = Channel::new(2);
        assert!(ch.push_frame("a"));
        assert!(ch.push_frame("b"));
        assert!(!ch.push_frame("c"));
    }

    #[test]
    fn identity_is_set_once_joined() {
        let (ch, _rx) = Channel::new(1);
        assert_eq!(ch.user_id(), 0);
        ch.set_identity(42, 7);
        assert_eq!(ch.user_id(), 42);
        assert_eq!(ch.room_id(), 7);
    }
}
