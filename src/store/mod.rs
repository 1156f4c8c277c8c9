//! Local store tier
//!
//! Two interchangeable implementations behind one capability set:
//!
//! - [`FileStore`]: content-addressed, crash-safe, disk-resident
//! - [`MemoryStore`]: bounded in-process cache with per-entry expiry
//!
//! The variant is chosen once at construction from configuration and never
//! switched at runtime.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::{MemoryStore, MemoryStoreConfig};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Capability set shared by both local store variants.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Read the payload for a key. `Error::NotFound` when absent; any other
    /// failure is surfaced unchanged, never retried.
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Write the payload for a key, replacing any previous value.
    async fn set(&self, key: &str, data: Bytes) -> Result<()>;

    /// Remove the payload for a key, returning the number of bytes freed.
    async fn delete(&self, key: &str) -> Result<u64>;

    /// Whether a (non-expired) payload exists for the key.
    async fn contains(&self, key: &str) -> bool;

    /// Entries this store has evicted on its own initiative. Only the
    /// memory variant evicts; the file variant reports zero.
    fn evictions(&self) -> u64 {
        0
    }
}
