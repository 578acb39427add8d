//! Sliding window limiter backed by a shared window store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, trace, warn};

use super::backend::{RateLimiterBackend, WindowCheck};
use super::clock::Clock;
use super::policy::{RateLimitKey, RateLimitPolicy};
use super::store::WindowStore;

/// Namespace prefixed to every key handed to the store.
const KEY_NAMESPACE: &str = "rate_limit";

/// Sliding window rate limiter whose state lives in a shared store, giving
/// every process instance the same view of each client's window.
///
/// A single `record_and_count` call per check keeps the semantics identical
/// to the local limiter: the attempt is recorded first, then evaluated. Store
/// calls are bounded by `store_timeout`; a timeout or store error is logged
/// and the request admitted rather than hung or refused.
pub struct SharedWindowLimiter {
    store: Arc<dyn WindowStore>,
    clock: Arc<dyn Clock>,
    store_timeout: Duration,
}

impl SharedWindowLimiter {
    pub fn new(store: Arc<dyn WindowStore>, clock: Arc<dyn Clock>, store_timeout: Duration) -> Self {
        Self {
            store,
            clock,
            store_timeout,
        }
    }
}

#[async_trait]
impl RateLimiterBackend for SharedWindowLimiter {
    async fn check(&self, key: &RateLimitKey, policy: &RateLimitPolicy) -> WindowCheck {
        let now = self.clock.now();
        let store_key = format!("{}:{}", KEY_NAMESPACE, key);

        trace!(key = %key, limit = policy.max_requests, "Checking shared rate limit");

        let outcome = tokio::time::timeout(
            self.store_timeout,
            self.store
                .record_and_count(&store_key, now, policy.window_secs),
        )
        .await;

        let count = match outcome {
            Ok(Ok(count)) => count,
            Ok(Err(e)) => {
                warn!(key = %key, error = %e, "Window store error, admitting request");
                return WindowCheck {
                    limited: false,
                    remaining: policy.max_requests.saturating_sub(1),
                    reset_seconds: policy.window_secs,
                };
            }
            Err(_) => {
                warn!(
                    key = %key,
                    timeout_ms = self.store_timeout.as_millis() as u64,
                    "Window store timed out, admitting request"
                );
                return WindowCheck {
                    limited: false,
                    remaining: policy.max_requests.saturating_sub(1),
                    reset_seconds: policy.window_secs,
                };
            }
        };

        if count > policy.max_requests as u64 {
            debug!(key = %key, count = count, limit = policy.max_requests, "Shared rate limit exceeded");
            WindowCheck {
                limited: true,
                remaining: 0,
                reset_seconds: policy.window_secs,
            }
        } else {
            WindowCheck {
                limited: false,
                remaining: policy.max_requests - count as u32,
                reset_seconds: policy.window_secs,
            }
        }
    }
}
