//! End-to-end tests driving the public cache contract across both local
//! store variants, including restart recovery and herd protection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use bytes::Bytes;
use tempfile::TempDir;

use herdcache::{
    Cache, CacheStatus, Error, InMemoryRemote, Options, RemoteStore, Result,
};

fn file_cache(dir: &TempDir, remote: Arc<InMemoryRemote>) -> Cache {
    Cache::new(Options::file_backed(dir.path().join("data")).with_ring(remote)).unwrap()
}

/// Wait until the recovery pass has indexed `key`, or panic after ~2s.
async fn await_recovered(cache: &Cache, key: &str) {
    for _ in 0..200 {
        if cache.expired(key).is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("recovery never indexed key {key:?}");
}

#[tokio::test]
async fn test_file_backed_roundtrip() {
    let dir = TempDir::new().unwrap();
    let remote = Arc::new(InMemoryRemote::new());
    let cache = file_cache(&dir, remote);

    cache.set("test", Bytes::from_static(b"we are here")).await.unwrap();
    let data = cache.get("test").await.unwrap();
    assert_eq!(data.as_ref(), b"we are here");
}

#[tokio::test]
async fn test_file_backed_layout_on_disk() {
    let dir = TempDir::new().unwrap();
    let remote = Arc::new(InMemoryRemote::new());
    let cache = file_cache(&dir, remote);

    cache.set("test", Bytes::from_static(b"payload")).await.unwrap();

    let object = dir
        .path()
        .join("data/6/4f/098f6bcd4621d373cade4e832627b4f6");
    assert!(object.is_file());
    assert_eq!(std::fs::read(object).unwrap(), b"payload");
}

#[tokio::test]
async fn test_thundering_herd_protection() {
    /// Remote that answers slowly so concurrent misses overlap.
    struct SlowRemote {
        inner: InMemoryRemote,
        gets: AtomicU64,
    }

    #[async_trait::async_trait]
    impl RemoteStore for SlowRemote {
        async fn get(&self, key: &str) -> Result<Option<Bytes>> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.inner.get(key).await
        }
        async fn set(&self, key: &str, data: Bytes, ttl: Duration) -> Result<()> {
            self.inner.set(key, data, ttl).await
        }
    }

    let remote = Arc::new(SlowRemote {
        inner: InMemoryRemote::new(),
        gets: AtomicU64::new(0),
    });
    remote
        .inner
        .set("hot", Bytes::from_static(b"shared value"), Duration::ZERO)
        .await
        .unwrap();

    let cache = Arc::new(
        Cache::new(Options::memory_backed(1024, None).with_cluster(remote.clone())).unwrap(),
    );

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..32 {
        let cache = Arc::clone(&cache);
        tasks.spawn(async move { cache.get("hot").await });
    }

    let mut served = 0;
    while let Some(res) = tasks.join_next().await {
        let data = res.unwrap().unwrap();
        assert_eq!(data.as_ref(), b"shared value");
        served += 1;
    }

    assert_eq!(served, 32);
    assert_eq!(
        remote.gets.load(Ordering::SeqCst),
        1,
        "the backend saw more than one fetch for a coalesced key"
    );
}

#[tokio::test]
async fn test_followers_observe_the_leaders_error() {
    struct FailingRemote;

    #[async_trait::async_trait]
    impl RemoteStore for FailingRemote {
        async fn get(&self, _key: &str) -> Result<Option<Bytes>> {
            tokio::time::sleep(Duration::from_millis(40)).await;
            Err(Error::Remote("timeout talking to backend".into()))
        }
        async fn set(&self, _key: &str, _data: Bytes, _ttl: Duration) -> Result<()> {
            Ok(())
        }
    }

    let cache = Arc::new(
        Cache::new(Options::memory_backed(1024, None).with_cluster(Arc::new(FailingRemote)))
            .unwrap(),
    );

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..8 {
        let cache = Arc::clone(&cache);
        tasks.spawn(async move { cache.get("doomed").await });
    }

    while let Some(res) = tasks.join_next().await {
        let err = res.unwrap().unwrap_err();
        assert_matches!(err, Error::Remote(ref msg) if msg == "timeout talking to backend");
    }
}

#[tokio::test]
async fn test_restart_recovery_restores_local_serving() {
    let dir = TempDir::new().unwrap();
    let remote = Arc::new(InMemoryRemote::new());

    // First process lifetime: populate the cache
    {
        let cache = file_cache(&dir, remote.clone());
        cache.set("persisted", Bytes::from_static(b"survives restarts")).await.unwrap();
    }

    let fetches_before = remote.get_count();

    // Second process lifetime over the same directory
    let cache = file_cache(&dir, remote.clone());
    await_recovered(&cache, "persisted").await;

    let lookup = cache.lookup("persisted").await.unwrap();
    assert_eq!(lookup.status, CacheStatus::Hit);
    assert_eq!(lookup.data.as_ref(), b"survives restarts");
    assert_eq!(
        remote.get_count(),
        fetches_before,
        "recovered entry should be served without remote traffic"
    );
}

#[tokio::test]
async fn test_restart_recovery_sweeps_interrupted_writes() {
    let dir = TempDir::new().unwrap();
    let remote = Arc::new(InMemoryRemote::new());

    {
        let cache = file_cache(&dir, remote.clone());
        cache.set("good", Bytes::from_static(b"complete")).await.unwrap();
    }

    // Simulate a crash mid-write: a temp file that never got renamed
    let shard = dir.path().join("data/6/4f");
    std::fs::create_dir_all(&shard).unwrap();
    let stray = shard.join("098f6bcd4621d373cade4e832627b4f6.tmp.999.0");
    std::fs::write(&stray, b"torn write").unwrap();

    let cache = file_cache(&dir, remote.clone());
    await_recovered(&cache, "good").await;

    // Give the walker a moment to finish sweeping beyond the awaited key
    for _ in 0..200 {
        if !stray.exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!stray.exists(), "orphaned temp file survived recovery");
    assert_eq!(cache.get("good").await.unwrap().as_ref(), b"complete");
}

#[tokio::test]
async fn test_cold_cache_before_recovery_falls_through_to_remote() {
    let dir = TempDir::new().unwrap();
    let remote = Arc::new(InMemoryRemote::new());
    remote
        .set("key", Bytes::from_static(b"authoritative"), Duration::ZERO)
        .await
        .unwrap();

    // A brand-new cache with an empty directory: nothing local, index cold
    let cache = file_cache(&dir, remote.clone());

    let lookup = cache.lookup("key").await.unwrap();
    assert_eq!(lookup.status, CacheStatus::Miss);
    assert_eq!(lookup.data.as_ref(), b"authoritative");
    assert!(remote.get_count() >= 1);
}

#[tokio::test]
async fn test_stats_are_monotonic_across_a_workload() {
    let dir = TempDir::new().unwrap();
    let remote = Arc::new(InMemoryRemote::new());
    let cache = file_cache(&dir, remote.clone());

    let mut last = cache.stats();
    for i in 0..10 {
        let key = format!("key-{}", i);
        cache.set(&key, Bytes::from(vec![i as u8; 10])).await.unwrap();
        cache.get(&key).await.unwrap();
        let _ = cache.get("never-set").await;

        let now = cache.stats();
        assert!(now.local_gets >= last.local_gets);
        assert!(now.local_hits >= last.local_hits);
        assert!(now.remote_gets >= last.remote_gets);
        assert!(now.remote_hits >= last.remote_hits);
        assert!(now.evictions >= last.evictions);
        last = now;
    }

    assert_eq!(last.local_gets, 10);
    assert_eq!(last.local_hits, 10);
    assert_eq!(last.bytes_stored, 100);
}

#[tokio::test]
async fn test_memory_backed_eviction_feeds_the_stats() {
    let remote = Arc::new(InMemoryRemote::new());
    let cache = Cache::new(Options::memory_backed(4, None).with_ring(remote)).unwrap();

    for i in 0..16 {
        cache
            .set(&format!("key-{}", i), Bytes::from(vec![i as u8; 8]))
            .await
            .unwrap();
    }

    let stats = cache.stats();
    assert!(stats.evictions >= 12, "expected evictions, saw {}", stats.evictions);
}

#[tokio::test]
async fn test_delete_then_get_reads_through_again() {
    let dir = TempDir::new().unwrap();
    let remote = Arc::new(InMemoryRemote::new());
    let cache = file_cache(&dir, remote.clone());

    cache.set("key", Bytes::from_static(b"value")).await.unwrap();
    cache.delete("key").await.unwrap();

    let lookup = cache.lookup("key").await.unwrap();
    assert_eq!(lookup.status, CacheStatus::Miss);
    assert_eq!(lookup.data.as_ref(), b"value");
}
