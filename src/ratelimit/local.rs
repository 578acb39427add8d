//! In-process sliding window limiter.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, trace};

use super::backend::{RateLimiterBackend, WindowCheck};
use super::clock::Clock;
use super::policy::{RateLimitKey, RateLimitPolicy};

/// Default minimum interval between full prunes of the window table.
const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 60;

/// One key's attempt log plus the window length its policy prunes by.
///
/// Policies differ across keys (the login window is longer than a short
/// configured default), so the sweep must prune each key by its own window
/// rather than whichever policy happens to trigger it.
struct KeyWindow {
    window_secs: f64,
    entries: Vec<(f64, u32)>,
}

/// Per-key attempt logs plus the timestamp of the last full prune.
///
/// Kept in one structure behind one mutex so every caller sees a single
/// coherent view of the table and no update is lost under concurrency.
struct WindowTable {
    windows: HashMap<String, KeyWindow>,
    last_cleanup: f64,
}

/// Sliding window rate limiter holding all state in process memory.
///
/// Suitable for single-instance deployments; multiple instances each enforce
/// their own budget. Per-key state is an append-only log of
/// `(timestamp, count)` entries, pruned opportunistically: a full sweep of
/// the table runs at most once per cleanup interval so the typical check
/// stays cheap.
pub struct LocalWindowLimiter {
    state: Mutex<WindowTable>,
    clock: Arc<dyn Clock>,
    cleanup_interval_secs: f64,
}

impl LocalWindowLimiter {
    /// Create a limiter with the default cleanup interval.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_cleanup_interval(clock, DEFAULT_CLEANUP_INTERVAL_SECS)
    }

    pub fn with_cleanup_interval(clock: Arc<dyn Clock>, cleanup_interval_secs: u64) -> Self {
        let last_cleanup = clock.now();
        Self {
            state: Mutex::new(WindowTable {
                windows: HashMap::new(),
                last_cleanup,
            }),
            clock,
            cleanup_interval_secs: cleanup_interval_secs as f64,
        }
    }

    /// Record the attempt at `now` and evaluate it. Synchronous core shared
    /// by the trait impl and the unit tests.
    fn check_at(&self, key: &RateLimitKey, policy: &RateLimitPolicy, now: f64) -> WindowCheck {
        let window = policy.window_secs as f64;
        let cutoff = now - window;

        let mut table = self.state.lock();

        // Amortized maintenance: sweep the whole table, pruning each key by
        // its own window and evicting empty keys.
        if now - table.last_cleanup >= self.cleanup_interval_secs {
            table.windows.retain(|_, kw| {
                let key_cutoff = now - kw.window_secs;
                kw.entries.retain(|(ts, _)| *ts > key_cutoff);
                !kw.entries.is_empty()
            });
            table.last_cleanup = now;
        }

        let key_window = table.windows.entry(key.to_string()).or_insert(KeyWindow {
            window_secs: window,
            entries: Vec::new(),
        });
        key_window.window_secs = window;
        key_window.entries.push((now, 1));

        let in_window: u32 = key_window
            .entries
            .iter()
            .filter(|(ts, _)| *ts > cutoff)
            .map(|(_, count)| count)
            .sum();

        trace!(key = %key, attempts = in_window, limit = policy.max_requests, "Checking rate limit");

        if in_window > policy.max_requests {
            let oldest = key_window
                .entries
                .iter()
                .filter(|(ts, _)| *ts > cutoff)
                .map(|(ts, _)| *ts)
                .fold(f64::INFINITY, f64::min);
            let reset_seconds = (oldest + window - now).max(0.0).ceil() as u64;

            debug!(key = %key, attempts = in_window, "Rate limit exceeded");

            WindowCheck {
                limited: true,
                remaining: 0,
                reset_seconds,
            }
        } else {
            WindowCheck {
                limited: false,
                remaining: policy.max_requests - in_window,
                reset_seconds: policy.window_secs,
            }
        }
    }

    /// Number of keys currently tracked.
    pub fn key_count(&self) -> usize {
        self.state.lock().windows.len()
    }
}

#[async_trait]
impl RateLimiterBackend for LocalWindowLimiter {
    async fn check(&self, key: &RateLimitKey, policy: &RateLimitPolicy) -> WindowCheck {
        self.check_at(key, policy, self.clock.now())
    }
}
