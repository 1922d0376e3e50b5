//! Bounded seen-event set with TTL and max-size eviction.
//!
//! `(tx_hash, log_index)` uniquely identifies a bridge event; the set
//! guarantees a pair is processed at most once per process lifetime. The
//! bounds prevent unbounded memory growth in watch mode. State is
//! process-memory only: a restart forgets seen events, which is the
//! documented double-relay hazard under reorgs.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::types::EventId;

const DEFAULT_MAX_SIZE: usize = 100_000;
const DEFAULT_TTL_SECS: u64 = 86_400; // 24 hours

/// Shared dedup set with insert-if-absent semantics, safe for concurrent
/// use by the two direction tasks.
pub struct SeenSet {
    inner: Mutex<Inner>,
}

struct Inner {
    map: HashMap<EventId, Instant>,
    max_size: usize,
    ttl: Duration,
}

impl SeenSet {
    pub fn new(max_size: usize, ttl_secs: u64) -> Self {
        Self {
            inner: Mutex::new(Inner {
                map: HashMap::new(),
                max_size,
                ttl: Duration::from_secs(ttl_secs),
            }),
        }
    }

    /// Record an event id. Returns true if it was absent (first sighting),
    /// false if already seen.
    pub fn insert_if_absent(&self, id: EventId) -> bool {
        let mut inner = self.inner.lock().expect("dedup lock poisoned");
        let now = Instant::now();

        if inner
            .map
            .get(&id)
            .is_some_and(|&t| now.duration_since(t) < inner.ttl)
        {
            return false;
        }

        let ttl = inner.ttl;
        inner.map.retain(|_, &mut t| now.duration_since(t) < ttl);
        while inner.map.len() >= inner.max_size && !inner.map.is_empty() {
            let oldest = inner
                .map
                .iter()
                .min_by_key(|(_, t)| *t)
                .map(|(id, _)| *id);
            match oldest {
                Some(id) => {
                    inner.map.remove(&id);
                }
                None => break,
            }
        }

        inner.map.insert(id, now);
        true
    }

    pub fn contains(&self, id: &EventId) -> bool {
        let inner = self.inner.lock().expect("dedup lock poisoned");
        inner
            .map
            .get(id)
            .is_some_and(|&t| t.elapsed() < inner.ttl)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("dedup lock poisoned").map.len()
    }
}

impl Default for SeenSet {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIZE, DEFAULT_TTL_SECS)
    }
}
