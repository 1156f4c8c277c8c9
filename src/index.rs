//! In-memory key metadata index
//!
//! One entry per locally cached object, keyed by the object's content digest
//! so that entries rebuilt by index recovery (which only sees digest-named
//! files) are addressable by the runtime lookup path.
//!
//! All map access goes through a single reader/writer lock scoped to the map
//! operation only; no I/O ever happens while the lock is held.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::error::{Error, Result};

/// Per-key metadata tracked by the orchestrator.
#[derive(Debug, Clone)]
pub struct EntryMeta {
    /// When the entry was last written or revalidated
    pub last_refreshed: Instant,
    /// Successful refresh count
    pub use_count: u64,
    /// In-flight coalesced refreshes touching this entry
    pub lock_count: u32,
}

impl EntryMeta {
    fn new() -> Self {
        Self {
            last_refreshed: Instant::now(),
            use_count: 1,
            lock_count: 0,
        }
    }
}

/// Shared metadata index.
#[derive(Debug, Default)]
pub struct Index {
    entries: RwLock<HashMap<String, EntryMeta>>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether metadata exists for the digest.
    pub fn contains(&self, digest: &str) -> bool {
        self.entries.read().contains_key(digest)
    }

    /// Insert or refresh an entry: timestamp reset, use count incremented.
    pub fn touch(&self, digest: &str) {
        let mut entries = self.entries.write();
        match entries.get_mut(digest) {
            Some(meta) => {
                meta.last_refreshed = Instant::now();
                meta.use_count += 1;
            }
            None => {
                entries.insert(digest.to_string(), EntryMeta::new());
            }
        }
    }

    /// Remove an entry, returning whether it existed.
    pub fn remove(&self, digest: &str) -> bool {
        self.entries.write().remove(digest).is_some()
    }

    /// Whether the entry is older than the expiration window.
    ///
    /// Unlike the map-dereference this replaces, asking about an absent key
    /// is a reportable error, not undefined behavior.
    pub fn expired(&self, digest: &str, window: Duration) -> Result<bool> {
        let entries = self.entries.read();
        let meta = entries
            .get(digest)
            .ok_or_else(|| Error::NoMetadata(digest.to_string()))?;
        Ok(meta.last_refreshed.elapsed() > window)
    }

    /// Raise the lock count while a coalesced refresh is in flight.
    pub fn begin_refresh(&self, digest: &str) {
        if let Some(meta) = self.entries.write().get_mut(digest) {
            meta.lock_count += 1;
        }
    }

    /// Lower the lock count once the refresh completes.
    pub fn end_refresh(&self, digest: &str) {
        if let Some(meta) = self.entries.write().get_mut(digest) {
            meta.lock_count = meta.lock_count.saturating_sub(1);
        }
    }

    /// Snapshot of one entry's metadata.
    pub fn get(&self, digest: &str) -> Option<EntryMeta> {
        self.entries.read().get(digest).cloned()
    }

    /// Number of indexed entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// Tests
// =============================================================================
