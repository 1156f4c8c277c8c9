//! Per-key request coalescing
//!
//! At most one in-flight fetch exists per key at any time. The first caller
//! becomes the leader: it registers an in-flight channel, runs the loader,
//! unregisters, and broadcasts the outcome. Callers arriving while the
//! leader runs become followers: they subscribe to the channel and receive
//! the identical result (same bytes, same error) without issuing their own
//! fetch.
//!
//! This is keyed deduplication, not memoization: the registration is removed
//! before the result is published, so the next call for the same key starts
//! a fresh fetch.

use std::collections::HashMap;
use std::future::Future;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::error::{Error, Result};

type FlightResult = Result<Bytes>;

enum Role {
    Leader(broadcast::Sender<FlightResult>),
    Follower(broadcast::Receiver<FlightResult>),
}

/// Registry of in-flight fetches.
#[derive(Default)]
pub struct FlightGroup {
    inflight: Mutex<HashMap<String, broadcast::Sender<FlightResult>>>,
}

/// Removes the in-flight registration when the leader finishes or is
/// cancelled mid-loader. A cancelled leader drops its sender, so followers
/// observe a closed channel rather than waiting forever.
struct Unregister<'a> {
    group: &'a FlightGroup,
    key: &'a str,
}

impl Drop for Unregister<'_> {
    fn drop(&mut self) {
        self.group.inflight.lock().remove(self.key);
    }
}

impl FlightGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute `loader` for `key`, deduplicating against concurrent calls.
    ///
    /// For N concurrent callers of one key, the loader runs exactly once and
    /// every caller observes its result.
    pub async fn run<F, Fut>(&self, key: &str, loader: F) -> FlightResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FlightResult>,
    {
        let role = {
            let mut inflight = self.inflight.lock();
            match inflight.get(key) {
                Some(tx) => Role::Follower(tx.subscribe()),
                None => {
                    let (tx, _) = broadcast::channel(1);
                    inflight.insert(key.to_string(), tx.clone());
                    Role::Leader(tx)
                }
            }
        };

        match role {
            Role::Leader(tx) => {
                let unregister = Unregister { group: self, key };
                let result = loader().await;

                // Unregister before publishing so a caller racing the
                // broadcast starts a fresh fetch instead of attaching to a
                // finished one.
                drop(unregister);
                let _ = tx.send(result.clone());
                result
            }
            Role::Follower(mut rx) => match rx.recv().await {
                Ok(result) => result,
                Err(_) => Err(Error::FlightAbandoned(key.to_string())),
            },
        }
    }

    /// Number of fetches currently in flight.
    pub fn len(&self) -> usize {
        self.inflight.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// Tests
// =============================================================================
