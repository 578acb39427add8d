//! Sliding-window rate limiting: policies, classification, and the two
//! limiter backends.

mod backend;
mod classifier;
mod clock;
mod local;
mod policy;
mod shared;
mod store;

pub use backend::{RateLimiterBackend, WindowCheck};
pub use classifier::{Classification, RequestClassifier, RequestMeta};
pub use clock::{Clock, ManualClock, SystemClock};
pub use local::LocalWindowLimiter;
pub use policy::{PolicyClass, RateLimitKey, RateLimitPolicy};
pub use shared::SharedWindowLimiter;
pub use store::{MemoryWindowStore, StoreError, WindowStore};

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::RateLimitSettings;

/// Select the limiter backend once at process start.
///
/// With a store supplied, probe it under the configured store timeout; on
/// any failure fall back permanently to the local backend for the process
/// lifetime. Fallback degrades to local-only enforcement, never to
/// unlimited traffic.
pub async fn select_backend(
    settings: &RateLimitSettings,
    store: Option<Arc<dyn WindowStore>>,
    clock: Arc<dyn Clock>,
) -> Arc<dyn RateLimiterBackend> {
    if let Some(store) = store {
        let probe = tokio::time::timeout(settings.store_timeout(), store.ping()).await;
        match probe {
            Ok(Ok(())) => {
                info!("Rate limiter: shared window store backend");
                return Arc::new(SharedWindowLimiter::new(
                    store,
                    clock,
                    settings.store_timeout(),
                ));
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Window store unavailable, falling back to local rate limiting");
            }
            Err(_) => {
                warn!(
                    timeout_ms = settings.store_timeout_ms,
                    "Window store probe timed out, falling back to local rate limiting"
                );
            }
        }
    } else {
        info!("Rate limiter: local in-process backend");
    }

    Arc::new(LocalWindowLimiter::with_cleanup_interval(
        clock,
        settings.cleanup_interval_secs,
    ))
}
