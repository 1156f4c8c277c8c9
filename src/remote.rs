//! Remote store adapter
//!
//! The shared key-value backend is an external collaborator: its wire
//! protocol and client library arrive as a [`RemoteStore`] trait object. The
//! adapter unifies the two supported topologies (cluster-mode, ring-mode)
//! behind one get/set capability; exactly one handle is active per instance,
//! chosen at construction.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use crate::error::{Error, Result};
use crate::stats::CacheStats;

/// The given backend capability: `get` returns `None` as the distinguished
/// not-found sentinel, never an error, when a key simply does not exist.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch a value.
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Store a value with a TTL. `Duration::ZERO` means no expiry.
    async fn set(&self, key: &str, data: Bytes, ttl: Duration) -> Result<()>;
}

/// Adapter over the configured backend topology.
pub struct RemoteTier {
    cluster: Option<Arc<dyn RemoteStore>>,
    ring: Option<Arc<dyn RemoteStore>>,
    ttl: Duration,
    stats: Arc<CacheStats>,
}

impl RemoteTier {
    /// Build the adapter. When both handles are present the cluster wins;
    /// when neither is, every call reports `Error::NoBackend`.
    pub fn new(
        cluster: Option<Arc<dyn RemoteStore>>,
        ring: Option<Arc<dyn RemoteStore>>,
        ttl: Duration,
        stats: Arc<CacheStats>,
    ) -> Self {
        Self {
            cluster,
            ring,
            ttl,
            stats,
        }
    }

    fn backend(&self) -> Result<&dyn RemoteStore> {
        if let Some(cluster) = &self.cluster {
            Ok(cluster.as_ref())
        } else if let Some(ring) = &self.ring {
            Ok(ring.as_ref())
        } else {
            Err(Error::NoBackend)
        }
    }

    /// Fetch from the active backend, counting the attempt and any hit.
    pub async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let backend = self.backend()?;
        let result = backend.get(key).await;

        self.stats.record_remote_get();
        if let Ok(Some(_)) = &result {
            self.stats.record_remote_hit();
        }
        result
    }

    /// Write through to the active backend with the configured TTL.
    pub async fn set(&self, key: &str, data: Bytes) -> Result<()> {
        self.backend()?.set(key, data, self.ttl).await
    }
}

/// In-memory backend for tests and examples, with TTL support and a fetch
/// counter so coalescing behavior can be asserted.
#[derive(Debug, Default)]
pub struct InMemoryRemote {
    entries: DashMap<String, (Bytes, Option<Instant>)>,
    gets: AtomicU64,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `get` calls this backend has observed.
    pub fn get_count(&self) -> u64 {
        self.gets.load(Ordering::Relaxed)
    }

    /// Number of stored (possibly expired) entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemote {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        self.gets.fetch_add(1, Ordering::Relaxed);

        match self.entries.get(key) {
            Some(entry) => {
                let (data, deadline) = entry.value();
                if let Some(deadline) = deadline {
                    if Instant::now() > *deadline {
                        drop(entry);
                        self.entries.remove(key);
                        return Ok(None);
                    }
                }
                Ok(Some(data.clone()))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, data: Bytes, ttl: Duration) -> Result<()> {
        let deadline = if ttl.is_zero() {
            None
        } else {
            Some(Instant::now() + ttl)
        };
        self.entries.insert(key.to_string(), (data, deadline));
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
