//! Cache orchestrator
//!
//! Composes the local store, remote tier, metadata index, request coalescer
//! and stats registry into the public Get/Set/Delete/Expired contract.
//!
//! Read path: presence metadata decides between a fresh local hit, an
//! expired-entry revalidation against the remote tier, and a cold miss that
//! reads through and populates the local store. Write path is write-through,
//! local-first. All remote fetches for one key are coalesced so the backend
//! sees at most one concurrent request per key.

use std::sync::Arc;

use bytes::Bytes;

use crate::address::Address;
use crate::config::{LocalStoreOptions, Options};
use crate::error::{Error, Result};
use crate::flight::FlightGroup;
use crate::index::Index;
use crate::recovery;
use crate::remote::RemoteTier;
use crate::stats::{CacheStats, StatsSnapshot};
use crate::store::{FileStore, LocalStore, MemoryStore, MemoryStoreConfig};

/// Result-kind vocabulary for a lookup.
///
/// The read path currently produces `Hit`, `Miss` and `Revalidated`;
/// `Bypass`, `Expired`, `Stale` and `Updating` are declared extension points
/// for a richer serving policy and are not emitted yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// No local entry existed; served via remote read-through
    Miss,
    /// Fresh local entry served without remote traffic
    Hit,
    /// Local store skipped by policy
    Bypass,
    /// Local entry past the staleness window
    Expired,
    /// Stale entry served while a refresh happens
    Stale,
    /// A refresh is already in flight
    Updating,
    /// An expired entry was refreshed from the remote tier and replaced
    Revalidated,
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CacheStatus::Miss => "MISS",
            CacheStatus::Hit => "HIT",
            CacheStatus::Bypass => "BYPASS",
            CacheStatus::Expired => "EXPIRED",
            CacheStatus::Stale => "STALE",
            CacheStatus::Updating => "UPDATING",
            CacheStatus::Revalidated => "REVALIDATED",
        };
        write!(f, "{}", s)
    }
}

/// A lookup result: the payload plus how it was served.
#[derive(Debug, Clone)]
pub struct Lookup {
    pub data: Bytes,
    pub status: CacheStatus,
}

/// Two-tier read-through/write-through cache.
pub struct Cache {
    options: Options,
    local: Arc<dyn LocalStore>,
    remote: RemoteTier,
    index: Arc<Index>,
    flight: FlightGroup,
    stats: Arc<CacheStats>,
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache").finish_non_exhaustive()
    }
}

impl Cache {
    /// Construct the cache and wire both tiers per `options`. Option
    /// combinations that cannot work report `Error::Config`.
    ///
    /// When the file-backed local store is configured, a background index
    /// recovery pass is spawned; must be called within a tokio runtime.
    pub fn new(options: Options) -> Result<Self> {
        let stats = Arc::new(CacheStats::new());
        let index = Arc::new(Index::new());

        let local: Arc<dyn LocalStore> = match &options.local {
            LocalStoreOptions::File { dir } => {
                let store = Arc::new(FileStore::new(dir.clone()));

                let root = store.root().to_path_buf();
                let recovery_index = Arc::clone(&index);
                tokio::spawn(async move {
                    recovery::rebuild_index(&root, &recovery_index).await;
                });

                store
            }
            LocalStoreOptions::Memory { max_entries: 0, .. } => {
                return Err(Error::Config(
                    "memory store capacity must be at least one entry".to_string(),
                ));
            }
            LocalStoreOptions::Memory { max_entries, ttl } => Arc::new(MemoryStore::new(
                MemoryStoreConfig {
                    max_entries: *max_entries,
                    ttl: *ttl,
                },
            )),
        };

        let remote = RemoteTier::new(
            options.remote_cluster.clone(),
            options.remote_ring.clone(),
            options.remote_ttl,
            Arc::clone(&stats),
        );

        Ok(Self {
            options,
            local,
            remote,
            index,
            flight: FlightGroup::new(),
            stats,
        })
    }

    /// Fetch the value for `key`.
    pub async fn get(&self, key: &str) -> Result<Bytes> {
        Ok(self.lookup(key).await?.data)
    }

    /// Fetch the value for `key` along with how it was served.
    pub async fn lookup(&self, key: &str) -> Result<Lookup> {
        let addr = Address::for_key(key);
        let digest = addr.digest();

        if !self.index.contains(digest) {
            let data = self.read_through(key, digest).await?;
            return Ok(Lookup {
                data,
                status: CacheStatus::Miss,
            });
        }

        // A racing delete can drop the metadata between the checks; treat
        // that as expired and fall through to the remote tier.
        let expired = self
            .index
            .expired(digest, self.options.expire)
            .unwrap_or(true);

        if expired {
            self.index.begin_refresh(digest);
            let result = self.read_through(key, digest).await;
            self.index.end_refresh(digest);

            let data = result?;
            return Ok(Lookup {
                data,
                status: CacheStatus::Revalidated,
            });
        }

        // The local store can drop an entry on its own initiative (memory
        // eviction under pressure, TTL lapse) after the index vouched for
        // it. That is a miss, not a failure: prune the stale metadata and
        // fall through to the remote tier.
        match self.local_get(key).await {
            Ok(data) => Ok(Lookup {
                data,
                status: CacheStatus::Hit,
            }),
            Err(Error::NotFound(_)) => {
                self.index.remove(digest);
                let data = self.read_through(key, digest).await?;
                Ok(Lookup {
                    data,
                    status: CacheStatus::Miss,
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Write through both tiers, local first.
    ///
    /// A local failure aborts before any remote traffic. A remote failure is
    /// surfaced even though the local copy stays: the cache is then ahead of
    /// the remote tier until the next successful set, which the bounded
    /// staleness contract allows, but the caller is told so it may retry.
    pub async fn set(&self, key: &str, data: Bytes) -> Result<()> {
        let addr = Address::for_key(key);

        if let Err(err) = self.local_set(key, addr.digest(), data.clone()).await {
            tracing::error!(key, %err, "local store write failed");
            return Err(err);
        }

        if let Err(err) = self.remote.set(key, data).await {
            tracing::error!(key, %err, "remote store write failed");
            return Err(err);
        }

        Ok(())
    }

    /// Remove `key` from the local tier: backing object, metadata entry and
    /// byte accounting. The remote copy is not touched; delete is a
    /// local-tier operation.
    pub async fn delete(&self, key: &str) -> Result<()> {
        let addr = Address::for_key(key);

        let freed = self.local.delete(key).await?;
        self.stats.sub_bytes(freed);
        self.index.remove(addr.digest());
        Ok(())
    }

    /// Whether the local entry for `key` is older than the staleness window.
    /// Asking about a key with no metadata reports `Error::NoMetadata`.
    pub fn expired(&self, key: &str) -> Result<bool> {
        self.index
            .expired(Address::for_key(key).digest(), self.options.expire)
    }

    /// Immutable snapshot of the counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot(self.local.evictions())
    }

    /// Coalesced remote fetch that populates the local tier on success.
    ///
    /// Remote "not found" surfaces as `Error::NotFound`; the read path never
    /// substitutes a stale local copy for it. A failure to populate the
    /// local store is logged but does not fail the read: the caller still
    /// gets the remote bytes.
    async fn read_through(&self, key: &str, digest: &str) -> Result<Bytes> {
        self.flight
            .run(digest, || async {
                let data = self
                    .remote
                    .get(key)
                    .await?
                    .ok_or_else(|| Error::NotFound(key.to_string()))?;

                if let Err(err) = self.local_set(key, digest, data.clone()).await {
                    tracing::error!(key, %err, "failed to populate local store after remote fetch");
                }

                Ok(data)
            })
            .await
    }

    async fn local_get(&self, key: &str) -> Result<Bytes> {
        let result = self.local.get(key).await;

        self.stats.record_local_get();
        if result.is_ok() {
            self.stats.record_local_hit();
        }
        result
    }

    async fn local_set(&self, key: &str, digest: &str, data: Bytes) -> Result<()> {
        let len = data.len() as u64;
        self.local.set(key, data).await?;

        self.stats.add_bytes(len);
        self.index.touch(digest);
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
