use std::sync::Mutex;

// Snowflake layout: 41-bit ms timestamp | 10-bit worker | 12-bit sequence.
const WORKER_BITS: u8 = 10;
const SEQ_BITS: u8 = 12;
const MAX_WORKER: u16 = (1 << WORKER_BITS) - 1;
const SEQ_MASK: u16 = (1 << SEQ_BITS) - 1;

// 2020-01-01T00:00:00Z - keeps the 41-bit field good for ~69 years.
const EPOCH_MS: i64 = 1_577_836_800_000;

/// Monotonic 64-bit id source. One instance per process; ids from a single
/// instance never repeat and never decrease.
pub struct Snowflake {
    worker_id: u16,
    state: Mutex<State>,
}

struct State {
    last_ms: i64,
    seq: u16,
}

impl Snowflake {
    pub fn new(worker_id: u16) -> Self {
        Self {
            worker_id: worker_id & MAX_WORKER,
            state: Mutex::new(State { last_ms: 0, seq: 0 }),
        }
    }

    pub fn next_id(&self) -> i64 {
        let mut st = self.state.lock().unwrap();
        let mut now = now_ms();
        // Clock went backwards: keep issuing against the last stamp.
        if now < st.last_ms {
            now = st.last_ms;
        }
        if now == st.last_ms {
            st.seq = (st.seq + 1) & SEQ_MASK;
            if st.seq == 0 {
                // Sequence exhausted within this millisecond.
                while now <= st.last_ms {
                    now = now_ms();
                }
            }
        } else {
            st.seq = 0;
        }
        st.last_ms = now;

        ((now - EPOCH_MS) << (WORKER_BITS + SEQ_BITS))
            | ((self.worker_id as i64) << SEQ_BITS)
            | st.seq as i64
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Derive a small numeric worker id from a server id string, for processes
/// configured with names like "ws-1".
pub fn worker_id_from_server_id(server_id: &str) -> u16 {
    let mut acc: u32 = 0;
    for b in server_id.bytes() {
        acc = acc.wrapping_mul(31).wrapping_add(b as u32);
    }
    (acc as u16) & MAX_WORKER
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique_and_increasing() {
        let gen = Snowflake::new(3);
        let mut last = 0;
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let id = gen.next_id();
            assert!(id > 0);
            assert!(id >= last, "ids must not decrease");
            assert!(seen.insert(id), "ids must be unique");
            last = id;
        }
    }

    #[test]
    fn worker_id_is_stable() {
        assert_eq!(
            worker_id_from_server_id("ws-1"),
            worker_id_from_server_id("ws-1")
        );
        assert_ne!(
            worker_id_from_server_id("ws-1"),
            worker_id_from_server_id("ws-2")
        );
    }
}
