//! Cache statistics registry
//!
//! Lock-free atomic counters shared by every path through the cache. An
//! increment is not transactionally tied to the operation it measures; the
//! counters are eventually consistent with the data operations.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Atomic counter registry.
#[derive(Debug, Default)]
pub struct CacheStats {
    local_gets: AtomicU64,
    local_hits: AtomicU64,
    remote_gets: AtomicU64,
    remote_hits: AtomicU64,
    bytes_stored: AtomicU64,
}

impl CacheStats {
    /// Create a new registry with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_local_get(&self) {
        self.local_gets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_local_hit(&self) {
        self.local_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_remote_get(&self) {
        self.remote_gets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_remote_hit(&self) {
        self.remote_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Add stored payload bytes after a successful local write.
    pub fn add_bytes(&self, n: u64) {
        self.bytes_stored.fetch_add(n, Ordering::Relaxed);
    }

    /// Subtract bytes after a confirmed removal. Saturating: a delete racing
    /// a restart (where the counter was not rebuilt) must not wrap.
    pub fn sub_bytes(&self, n: u64) {
        let mut current = self.bytes_stored.load(Ordering::Relaxed);
        loop {
            let next = current.saturating_sub(n);
            match self.bytes_stored.compare_exchange_weak(
                current,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
    }

    pub fn local_gets(&self) -> u64 {
        self.local_gets.load(Ordering::Relaxed)
    }

    pub fn local_hits(&self) -> u64 {
        self.local_hits.load(Ordering::Relaxed)
    }

    pub fn remote_gets(&self) -> u64 {
        self.remote_gets.load(Ordering::Relaxed)
    }

    pub fn remote_hits(&self) -> u64 {
        self.remote_hits.load(Ordering::Relaxed)
    }

    pub fn bytes_stored(&self) -> u64 {
        self.bytes_stored.load(Ordering::Relaxed)
    }

    /// Take an immutable snapshot of every counter.
    ///
    /// Evictions happen inside the local store, not through this registry;
    /// the caller passes the store's count and the snapshot carries it.
    pub fn snapshot(&self, evictions: u64) -> StatsSnapshot {
        StatsSnapshot {
            local_gets: self.local_gets(),
            local_hits: self.local_hits(),
            remote_gets: self.remote_gets(),
            remote_hits: self.remote_hits(),
            bytes_stored: self.bytes_stored(),
            evictions,
        }
    }
}

/// Immutable view of the counters at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Local-tier lookups
    pub local_gets: u64,
    /// Local-tier lookups that returned data
    pub local_hits: u64,
    /// Remote-tier lookups
    pub remote_gets: u64,
    /// Remote-tier lookups that returned data
    pub remote_hits: u64,
    /// Payload bytes currently accounted to the local tier
    pub bytes_stored: u64,
    /// Entries evicted from the local tier
    pub evictions: u64,
}

impl StatsSnapshot {
    /// Local hit ratio (0.0 - 1.0).
    pub fn local_hit_ratio(&self) -> f64 {
        if self.local_gets == 0 {
            0.0
        } else {
            self.local_hits as f64 / self.local_gets as f64
        }
    }

    /// Remote hit ratio (0.0 - 1.0).
    pub fn remote_hit_ratio(&self) -> f64 {
        if self.remote_gets == 0 {
            0.0
        } else {
            self.remote_hits as f64 / self.remote_gets as f64
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
