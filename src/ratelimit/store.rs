//! Window store boundary for the shared limiter.
//!
//! The shared limiter delegates all state to an external atomic key-value
//! store (one instance shared by every process). The store itself is a
//! collaborator; this module defines the contract it must satisfy plus an
//! in-process implementation with the same observable semantics, used by
//! tests and single-process deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;

/// Errors surfaced by a window store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("window store unreachable: {0}")]
    Unreachable(String),

    #[error("window store operation timed out after {0}ms")]
    Timeout(u64),
}

/// An external atomic key-value store holding per-key attempt windows.
///
/// Correctness of the shared limiter rests entirely on `record_and_count`
/// executing as one atomic unit relative to every other client of the store:
/// prune members older than the window, add a member for `now`, count the
/// members, and refresh a TTL of `window_secs`. A store that cannot provide
/// this atomicity would let concurrent instances double-admit and must not
/// back the shared limiter.
#[async_trait]
pub trait WindowStore: Send + Sync {
    /// Atomically record an attempt at `now` and return the number of
    /// attempts in the trailing window, including the one just recorded.
    async fn record_and_count(
        &self,
        key: &str,
        now: f64,
        window_secs: u64,
    ) -> Result<u64, StoreError>;

    /// Health probe used by backend selection at startup.
    async fn ping(&self) -> Result<(), StoreError>;
}

struct StoredWindow {
    members: Vec<f64>,
    expires_at: f64,
}

/// In-process window store executing the prune/record/count/expire sequence
/// under a single lock, giving the atomicity the trait demands within one
/// process.
#[derive(Default)]
pub struct MemoryWindowStore {
    windows: Mutex<HashMap<String, StoredWindow>>,
}

impl MemoryWindowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held (expired or not).
    pub fn key_count(&self) -> usize {
        self.windows.lock().len()
    }
}

#[async_trait]
impl WindowStore for MemoryWindowStore {
    async fn record_and_count(
        &self,
        key: &str,
        now: f64,
        window_secs: u64,
    ) -> Result<u64, StoreError> {
        let mut windows = self.windows.lock();

        // TTL expiry stands in for the real store reclaiming idle keys.
        if windows
            .get(key)
            .is_some_and(|window| window.expires_at <= now)
        {
            windows.remove(key);
        }

        let window = windows.entry(key.to_string()).or_insert(StoredWindow {
            members: Vec::new(),
            expires_at: 0.0,
        });

        let cutoff = now - window_secs as f64;
        window.members.retain(|ts| *ts > cutoff);
        window.members.push(now);
        window.expires_at = now + window_secs as f64;

        Ok(window.members.len() as u64)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
