//! Per-(chain, warden account) nonce sequencing.
//!
//! The counter is resynced from the chain's pending transaction count once
//! per scan cycle, then incremented locally between submissions. Reading a
//! fresh nonce per transaction races within a cycle: rapid submissions see
//! the same "pending" count and silently replace each other.

use std::sync::Mutex;

/// Strictly increasing nonce counter for one signing account on one chain.
pub struct NonceSequencer {
    next: Mutex<Option<u64>>,
}

impl NonceSequencer {
    pub fn new() -> Self {
        Self {
            next: Mutex::new(None),
        }
    }

    /// Reset the counter to the chain's current pending transaction count.
    /// Called once at the start of each cycle, never per transaction.
    pub fn resync(&self, pending_count: u64) {
        let mut guard = self.next.lock().expect("nonce lock poisoned");
        *guard = Some(pending_count);
    }

    /// Return the current nonce and advance. `None` means the sequencer was
    /// never resynced this lifetime; callers must treat that as a cycle
    /// abort, partial nonce state must never be used.
    pub fn next(&self) -> Option<u64> {
        let mut guard = self.next.lock().expect("nonce lock poisoned");
        let current = (*guard)?;
        *guard = Some(current + 1);
        Some(current)
    }
}

impl Default for NonceSequencer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_before_resync_is_none() {
        let seq = NonceSequencer::new();
        assert_eq!(seq.next(), None);
    }

    #[test]
    fn test_monotonic_without_gaps() {
        let seq = NonceSequencer::new();
        seq.resync(7);
        let nonces: Vec<_> = (0..5).filter_map(|_| seq.next()).collect();
        assert_eq!(nonces, vec![7, 8, 9, 10, 11]);
    }

    #[test]
    fn test_resync_resets_counter() {
        let seq = NonceSequencer::new();
        seq.resync(3);
        assert_eq!(seq.next(), Some(3));
        assert_eq!(seq.next(), Some(4));
        // Next cycle observed two confirmed, one still pending.
        seq.resync(5);
        assert_eq!(seq.next(), Some(5));
    }
}
