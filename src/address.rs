//! Content-addressable storage addressing
//!
//! Maps a cache key to a deterministic on-disk location: the MD5 digest of
//! the key, hex-encoded, becomes the filename, and two short substrings
//! sliced from fixed offsets near the end of the digest become a two-level
//! shard directory. The slicing bounds per-directory fan-out (at most 16
//! top-level and 256 second-level directories), which is the on-disk
//! equivalent of a hash-bucket index.

use std::path::PathBuf;

use md5::{Digest, Md5};

/// Length of the hex-encoded digest. Also the well-formedness check used by
/// index recovery: any regular file whose name is not this long is an orphan.
pub const DIGEST_HEX_LEN: usize = 32;

/// Resolved storage address for a cache key.
///
/// `Address::for_key` is a pure function: identical keys always produce
/// identical addresses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    digest: String,
}

impl Address {
    /// Resolve the address for a key.
    pub fn for_key(key: &str) -> Self {
        let digest = hex::encode(Md5::digest(key.as_bytes()));
        Self { digest }
    }

    /// Rebuild an address from an already-hex-encoded digest (as found on
    /// disk by index recovery). Returns `None` unless the name is a
    /// well-formed digest.
    pub fn from_digest(digest: &str) -> Option<Self> {
        if digest.len() != DIGEST_HEX_LEN || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self {
            digest: digest.to_ascii_lowercase(),
        })
    }

    /// The full 32-character hex digest. This is the index key for the
    /// in-memory metadata map.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// First shard component: the final hex character of the digest.
    pub fn level1(&self) -> &str {
        &self.digest[31..32]
    }

    /// Second shard component: the two characters before it.
    pub fn level2(&self) -> &str {
        &self.digest[29..31]
    }

    /// Path of the object relative to the store root:
    /// `level1/level2/<digest>`.
    pub fn relative_path(&self) -> PathBuf {
        let mut path = PathBuf::with_capacity(DIGEST_HEX_LEN + 6);
        path.push(self.level1());
        path.push(self.level2());
        path.push(&self.digest);
        path
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::path::Path;

    #[test]
    fn test_known_fixture() {
        // Must match the historical layout byte-for-byte so existing data
        // directories remain readable.
        let addr = Address::for_key("test");
        assert_eq!(addr.digest(), "098f6bcd4621d373cade4e832627b4f6");
        assert_eq!(addr.level1(), "6");
        assert_eq!(addr.level2(), "4f");
        assert_eq!(
            addr.relative_path(),
            Path::new("6/4f/098f6bcd4621d373cade4e832627b4f6")
        );
    }

    #[test]
    fn test_addressing_is_deterministic() {
        let a = Address::for_key("some-key");
        let b = Address::for_key("some-key");
        assert_eq!(a, b);
        assert_eq!(a.relative_path(), b.relative_path());
    }

    #[test]
    fn test_distinct_keys_distinct_digests() {
        let a = Address::for_key("key-1");
        let b = Address::for_key("key-2");
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn test_from_digest_roundtrip() {
        let addr = Address::for_key("roundtrip");
        let rebuilt = Address::from_digest(addr.digest()).unwrap();
        assert_eq!(addr, rebuilt);
    }

    #[test]
    fn test_from_digest_rejects_malformed_names() {
        assert!(Address::from_digest("short").is_none());
        assert!(Address::from_digest(&"0".repeat(33)).is_none());
        // Right length, not hex
        assert!(Address::from_digest(&"z".repeat(32)).is_none());
    }

    proptest! {
        #[test]
        fn prop_digest_always_well_formed(key in ".*") {
            let addr = Address::for_key(&key);
            prop_assert_eq!(addr.digest().len(), DIGEST_HEX_LEN);
            prop_assert!(addr.digest().bytes().all(|b| b.is_ascii_hexdigit()));
            // Shard components are slices of the digest
            prop_assert!(addr.digest().ends_with(addr.level1()));
            prop_assert_eq!(&addr.digest()[29..31], addr.level2());
        }

        #[test]
        fn prop_addressing_is_pure(key in ".*") {
            prop_assert_eq!(Address::for_key(&key), Address::for_key(&key));
        }
    }
}
