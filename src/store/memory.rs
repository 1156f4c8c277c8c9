//! Memory-backed local store
//!
//! A bounded adaptive cache: sharded `RwLock<HashMap>` storage, per-entry
//! TTL, and recency+frequency scored eviction triggered by insertion
//! pressure once the configured entry cap is exceeded. Eviction is implicit;
//! nothing schedules it.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use super::LocalStore;
use crate::error::{Error, Result};

/// Shard count; power of two for fast modulo via bitwise AND.
const SHARD_COUNT: usize = 16;

/// Memory store configuration.
#[derive(Debug, Clone)]
pub struct MemoryStoreConfig {
    /// Maximum number of entries before eviction kicks in
    pub max_entries: usize,
    /// Per-entry expiry; `None` disables expiry
    pub ttl: Option<Duration>,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            max_entries: 64 * 1024,
            ttl: None,
        }
    }
}

struct MemEntry {
    data: Bytes,
    expires_at: Option<Instant>,
    /// Milliseconds since the store's epoch, for eviction scoring
    last_access_ms: AtomicU64,
    access_count: AtomicU32,
}

impl MemEntry {
    fn new(data: Bytes, ttl: Option<Duration>, now_ms: u64) -> Self {
        Self {
            data,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
            last_access_ms: AtomicU64::new(now_ms),
            access_count: AtomicU32::new(1),
        }
    }

    fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(deadline) => Instant::now() > deadline,
            None => false,
        }
    }

    fn record_access(&self, now_ms: u64) {
        self.last_access_ms.store(now_ms, Ordering::Relaxed);
        self.access_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Higher score = more evictable. Age divided by frequency keeps hot
    /// entries resident even when old (ARC-class behavior without the full
    /// ghost-list bookkeeping).
    fn eviction_score(&self, now_ms: u64) -> f64 {
        if self.is_expired() {
            return f64::MAX;
        }
        let age = now_ms.saturating_sub(self.last_access_ms.load(Ordering::Relaxed)) as f64;
        let frequency = self.access_count.load(Ordering::Relaxed) as f64;
        age / (frequency + 1.0)
    }
}

/// Bounded in-memory store with per-entry expiry.
pub struct MemoryStore {
    shards: Vec<RwLock<HashMap<String, Arc<MemEntry>>>>,
    config: MemoryStoreConfig,
    epoch: Instant,
    count: AtomicU64,
    evictions: AtomicU64,
}

impl MemoryStore {
    pub fn new(config: MemoryStoreConfig) -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| RwLock::new(HashMap::new())).collect(),
            config,
            epoch: Instant::now(),
            count: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn shard_for(&self, key: &str) -> &RwLock<HashMap<String, Arc<MemEntry>>> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) & (SHARD_COUNT - 1)]
    }

    /// Number of resident entries (expired-but-unevicted included).
    pub fn len(&self) -> usize {
        self.count.load(Ordering::Relaxed) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove_entry(&self, key: &str) -> Option<Arc<MemEntry>> {
        let removed = self.shard_for(key).write().remove(key);
        if removed.is_some() {
            self.count.fetch_sub(1, Ordering::Relaxed);
        }
        removed
    }

    /// Evict highest-scoring entries until back under the cap.
    fn evict(&self) {
        let now_ms = self.now_ms();

        let mut candidates: Vec<(String, f64)> = Vec::new();
        for shard in &self.shards {
            let guard = shard.read();
            for (key, entry) in guard.iter() {
                candidates.push((key.clone(), entry.eviction_score(now_ms)));
            }
        }
        candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        for (key, _) in candidates {
            if self.len() <= self.config.max_entries {
                break;
            }
            if self.remove_entry(&key).is_some() {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Bytes> {
        let entry = self.shard_for(key).read().get(key).cloned();

        match entry {
            Some(entry) if entry.is_expired() => {
                self.remove_entry(key);
                Err(Error::NotFound(key.to_string()))
            }
            Some(entry) => {
                entry.record_access(self.now_ms());
                Ok(entry.data.clone())
            }
            None => Err(Error::NotFound(key.to_string())),
        }
    }

    async fn set(&self, key: &str, data: Bytes) -> Result<()> {
        let entry = Arc::new(MemEntry::new(data, self.config.ttl, self.now_ms()));

        let old = self.shard_for(key).write().insert(key.to_string(), entry);
        if old.is_none() {
            self.count.fetch_add(1, Ordering::Relaxed);
        }

        if self.len() > self.config.max_entries {
            self.evict();
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<u64> {
        match self.remove_entry(key) {
            Some(entry) => Ok(entry.data.len() as u64),
            None => Err(Error::NotFound(key.to_string())),
        }
    }

    async fn contains(&self, key: &str) -> bool {
        match self.shard_for(key).read().get(key) {
            Some(entry) => !entry.is_expired(),
            None => false,
        }
    }

    fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }
}

// =============================================================================
// Tests
// =============================================================================
