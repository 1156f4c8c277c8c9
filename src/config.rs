//! Cache configuration
//!
//! A single immutable [`Options`] structure is consumed at construction and
//! never mutated afterward. Backend clients arrive as already-constructed
//! [`RemoteStore`](crate::remote::RemoteStore) handles; their connection
//! parameters live with the external client library.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::remote::RemoteStore;

/// Which local store variant to run, with its sub-options.
#[derive(Debug, Clone)]
pub enum LocalStoreOptions {
    /// Content-addressed on-disk store rooted at `dir`
    File { dir: PathBuf },
    /// Bounded in-memory adaptive cache
    Memory {
        max_entries: usize,
        ttl: Option<Duration>,
    },
}

/// Cache construction options.
#[derive(Clone)]
pub struct Options {
    /// Staleness window: local entries older than this are expired and must
    /// revalidate against the remote tier.
    pub expire: Duration,
    /// Lock-wait attempt count for staleness tuning. Reserved: accepted and
    /// carried but not consulted by the current revalidation path.
    pub lock_attempts: u32,
    /// Local store selection
    pub local: LocalStoreOptions,
    /// Cluster-topology backend handle
    pub remote_cluster: Option<Arc<dyn RemoteStore>>,
    /// Ring-topology backend handle
    pub remote_ring: Option<Arc<dyn RemoteStore>>,
    /// TTL applied to every remote write; `Duration::ZERO` disables expiry
    pub remote_ttl: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            expire: Duration::from_secs(60),
            lock_attempts: 3,
            local: LocalStoreOptions::File { dir: "data".into() },
            remote_cluster: None,
            remote_ring: None,
            remote_ttl: Duration::from_secs(600),
        }
    }
}

impl Options {
    /// Defaults with a file-backed local store rooted at `dir`.
    pub fn file_backed(dir: impl Into<PathBuf>) -> Self {
        Self {
            local: LocalStoreOptions::File { dir: dir.into() },
            ..Self::default()
        }
    }

    /// Defaults with a memory-backed local store.
    pub fn memory_backed(max_entries: usize, ttl: Option<Duration>) -> Self {
        Self {
            local: LocalStoreOptions::Memory { max_entries, ttl },
            ..Self::default()
        }
    }

    /// Use a cluster-topology backend.
    pub fn with_cluster(mut self, backend: Arc<dyn RemoteStore>) -> Self {
        self.remote_cluster = Some(backend);
        self
    }

    /// Use a ring-topology backend.
    pub fn with_ring(mut self, backend: Arc<dyn RemoteStore>) -> Self {
        self.remote_ring = Some(backend);
        self
    }
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("expire", &self.expire)
            .field("lock_attempts", &self.lock_attempts)
            .field("local", &self.local)
            .field("remote_cluster", &self.remote_cluster.is_some())
            .field("remote_ring", &self.remote_ring.is_some())
            .field("remote_ttl", &self.remote_ttl)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
