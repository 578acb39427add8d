//! Rate limiter trait for abstracting local and shared implementations.

use async_trait::async_trait;

use super::policy::{RateLimitKey, RateLimitPolicy};

/// Outcome of a single rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCheck {
    /// Whether the current attempt is denied
    pub limited: bool,
    /// Attempts left in the window after this one (0 when limited)
    pub remaining: u32,
    /// Seconds until the window frees a slot
    pub reset_seconds: u64,
}

/// Trait for rate limiter implementations.
///
/// This trait abstracts over the `LocalWindowLimiter` and the
/// `SharedWindowLimiter` so the admission layer can work with either.
///
/// Both implementations record the current attempt *before* evaluating it:
/// every call, allowed or denied, spends one window entry, and the attempt is
/// limited when the attempts within the trailing window - including this
/// one - exceed `policy.max_requests`. Identical timing sequences therefore
/// produce identical allow/deny sequences regardless of backend.
#[async_trait]
pub trait RateLimiterBackend: Send + Sync {
    /// Record the current attempt for `key` and evaluate it against `policy`.
    async fn check(&self, key: &RateLimitKey, policy: &RateLimitPolicy) -> WindowCheck;
}
