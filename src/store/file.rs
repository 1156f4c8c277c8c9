//! File-backed local store
//!
//! Objects live at `{root}/{level1}/{level2}/{digest}` as raw payload bytes
//! with no header; all metadata (timestamps, use counts) lives in the
//! in-memory index and is rebuilt by recovery after a restart.
//!
//! Writes go to a uniquely-named temporary file in the destination shard
//! directory, are flushed, and are then renamed over the final path. The
//! rename is the single atomic state transition: a reader only ever sees
//! the old version or the new version, never a partial write.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;

use super::LocalStore;
use crate::address::Address;
use crate::error::{Error, Result};

/// Content-addressed file store rooted at a directory.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    tmp_seq: AtomicU64,
}

impl FileStore {
    /// Create a store rooted at `root`. The directory is created lazily on
    /// first write; a missing root on read is just a miss-shaped I/O error.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            tmp_seq: AtomicU64::new(0),
        }
    }

    /// The store's root directory (the recovery walker starts here).
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.root.join(Address::for_key(key).relative_path())
    }

    /// Temporary file path in the same directory as `path`, unique within
    /// this process so concurrent writers never collide.
    fn tmp_path(&self, path: &Path) -> PathBuf {
        let seq = self.tmp_seq.fetch_add(1, Ordering::Relaxed);
        let mut name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".tmp.{}.{}", std::process::id(), seq));
        path.with_file_name(name)
    }
}

#[async_trait]
impl LocalStore for FileStore {
    async fn get(&self, key: &str) -> Result<Bytes> {
        let path = self.object_path(key);

        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(key.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn set(&self, key: &str, data: Bytes) -> Result<()> {
        let path = self.object_path(key);

        let parent = path
            .parent()
            .ok_or_else(|| Error::Config(format!("object path has no parent: {}", path.display())))?;
        tokio::fs::create_dir_all(parent).await?;

        // Temp file in the same directory so the rename stays on one
        // filesystem and remains atomic.
        let tmp = self.tmp_path(&path);
        let mut file = tokio::fs::File::create(&tmp).await?;
        let written: std::io::Result<()> = async {
            file.write_all(&data).await?;
            file.sync_all().await
        }
        .await;
        drop(file);

        if let Err(err) = written {
            // Leave nothing half-written behind
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(err.into());
        }

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<u64> {
        let path = self.object_path(key);

        let freed = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta.len(),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(key.to_string()))
            }
            Err(err) => return Err(err.into()),
        };

        // Only the caller whose unlink succeeds reports freed bytes; a
        // racing delete that loses the unlink observes NotFound, so the
        // byte accounting is decremented once per object.
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(freed),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(key.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn contains(&self, key: &str) -> bool {
        tokio::fs::metadata(self.object_path(key)).await.is_ok()
    }
}

// =============================================================================
// Tests
// =============================================================================
