//! Request id issuance for outbound envelopes
//!
//! Ids start at 1 and strictly increase for the lifetime of the counter.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic request id source, safe to share between concurrent callers
#[derive(Debug)]
pub struct RequestIdCounter {
    next: AtomicU64,
}

impl RequestIdCounter {
    /// Create a counter whose first id is 1
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Claim the next id
    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    /// The id the next call to `next()` will return
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }
}

impl Default for RequestIdCounter {
    fn default() -> Self {
        Self::new()
    }
}
