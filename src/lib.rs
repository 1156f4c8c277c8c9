//! herdcache - Two-Tier Read-Through/Write-Through Cache
//!
//! A fast local store (content-addressable on disk, or a bounded in-memory
//! adaptive cache) fronting a shared remote key-value backend, with per-key
//! request coalescing so concurrent misses for one key produce exactly one
//! remote fetch.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Cache Orchestrator                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Metadata Index │ Request Coalescer │ Stats Registry         │
//! │ (RwLock map)   │ (per-key flights) │ (atomic counters)      │
//! ├────────────────┴───────────┬───────┴────────────────────────┤
//! │        Local Store         │        Remote Tier             │
//! │ ┌────────────┐ ┌─────────┐ │ ┌──────────────────────────┐   │
//! │ │ FileStore  │ │ Memory  │ │ │ cluster / ring backend   │   │
//! │ │ (sharded,  │ │ Store   │ │ │ (RemoteStore handle)     │   │
//! │ │  atomic    │ │ (bounded│ │ └──────────────────────────┘   │
//! │ │  renames)  │ │  + TTL) │ │                                │
//! │ └────────────┘ └─────────┘ │                                │
//! └────────────────────────────┴────────────────────────────────┘
//! ```
//!
//! # Contract
//!
//! - `get`: fresh local entries are served without remote traffic; entries
//!   older than the staleness window revalidate against the remote tier;
//!   cold keys read through and populate the local store.
//! - `set`: write-through, local first; a local failure aborts before any
//!   remote traffic.
//! - Concurrent gets of one missing key are coalesced into a single remote
//!   fetch whose result (or error) every caller observes.
//! - After a restart, a background pass rebuilds the metadata index from the
//!   persisted object tree; requests racing it see conservative misses.
//!
//! # Modules
//!
//! - [`address`] - Content-addressable key → path mapping
//! - [`cache`] - The orchestrator and public contract
//! - [`config`] - Construction options
//! - [`error`] - Error types
//! - [`flight`] - Per-key request coalescing
//! - [`index`] - In-memory key metadata
//! - [`recovery`] - Startup index rebuild
//! - [`remote`] - Remote backend adapter
//! - [`stats`] - Atomic statistics registry
//! - [`store`] - Local store variants (file, memory)

pub mod address;
pub mod cache;
pub mod config;
pub mod error;
pub mod flight;
pub mod index;
pub mod recovery;
pub mod remote;
pub mod stats;
pub mod store;

// Re-export commonly used types
pub use address::Address;
pub use cache::{Cache, CacheStatus, Lookup};
pub use config::{LocalStoreOptions, Options};
pub use error::{Error, Result};
pub use remote::{InMemoryRemote, RemoteStore, RemoteTier};
pub use stats::{CacheStats, StatsSnapshot};
pub use store::{FileStore, LocalStore, MemoryStore, MemoryStoreConfig};
