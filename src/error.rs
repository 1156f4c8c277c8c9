//! Error types for the two-tier cache

use std::sync::Arc;

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the cache.
///
/// All variants are `Clone` so the request coalescer can hand the leader's
/// exact failure to every follower; I/O errors are wrapped in `Arc` for that
/// reason.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Key absent from the tier that was asked. Remote "not found" is this
    /// variant, not a generic failure.
    #[error("key not found: {0}")]
    NotFound(String),

    /// I/O error from the file store
    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),

    /// Remote backend error (network, protocol)
    #[error("remote store error: {0}")]
    Remote(String),

    /// Neither a cluster nor a ring backend was configured
    #[error("no remote backend configured")]
    NoBackend,

    /// Invalid option combination
    #[error("configuration error: {0}")]
    Config(String),

    /// Expiry was checked for a key with no metadata entry
    #[error("no metadata for key: {0}")]
    NoMetadata(String),

    /// The coalescer leader went away without publishing a result
    #[error("in-flight fetch abandoned for key: {0}")]
    FlightAbandoned(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(Arc::new(err))
    }
}

impl Error {
    /// True when the error is the distinguished not-found sentinel.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

// =============================================================================
// Tests
// =============================================================================
