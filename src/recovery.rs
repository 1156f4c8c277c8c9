//! Background index recovery
//!
//! After a restart the on-disk object tree is the only surviving state; the
//! metadata index starts empty. A single background pass walks the store
//! root once, re-indexing every well-formed digest-named file and deleting
//! anything else as an orphan (interrupted temp files, stray data).
//!
//! There is no startup barrier: requests racing the walk see a cold index
//! and fall through to the remote path, which is a conservative miss, never
//! wrong data.

use std::path::{Path, PathBuf};

use crate::address::Address;
use crate::index::Index;

/// Outcome of one recovery pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Well-formed objects re-indexed
    pub recovered: u64,
    /// Malformed files removed
    pub orphans_removed: u64,
}

/// Walk the store tree once, rebuilding `index` from persisted objects.
///
/// A missing root is not an error; it just means nothing has been written
/// yet. Individual filesystem failures are logged and skipped, so one bad
/// entry never aborts the pass.
pub async fn rebuild_index(root: &Path, index: &Index) -> RecoveryReport {
    let mut report = RecoveryReport::default();
    let mut stack: Vec<PathBuf> = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) => {
                if dir == root {
                    tracing::debug!(root = %root.display(), %err, "store root not readable, skipping recovery");
                } else {
                    tracing::warn!(dir = %dir.display(), %err, "failed to read directory during recovery");
                }
                continue;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(err) => {
                    tracing::warn!(dir = %dir.display(), %err, "failed to read entry during recovery");
                    break;
                }
            };

            let file_type = match entry.file_type().await {
                Ok(file_type) => file_type,
                Err(err) => {
                    tracing::warn!(path = %entry.path().display(), %err, "failed to stat during recovery");
                    continue;
                }
            };

            if file_type.is_dir() {
                stack.push(entry.path());
                continue;
            }
            if !file_type.is_file() {
                continue;
            }

            let name = entry.file_name();
            match name.to_str().and_then(Address::from_digest) {
                Some(addr) => {
                    index.touch(addr.digest());
                    report.recovered += 1;
                }
                None => {
                    // Not a content digest: leftover temp file or stray data
                    let path = entry.path();
                    match tokio::fs::remove_file(&path).await {
                        Ok(()) => {
                            tracing::warn!(path = %path.display(), "removed orphaned file during recovery");
                            report.orphans_removed += 1;
                        }
                        Err(err) => {
                            tracing::warn!(path = %path.display(), %err, "failed to remove orphaned file");
                        }
                    }
                }
            }
        }
    }

    tracing::info!(
        recovered = report.recovered,
        orphans_removed = report.orphans_removed,
        "index recovery complete"
    );
    report
}

// =============================================================================
// Tests
// =============================================================================
