//! Configuration management for Waypost.
//!
//! Configuration is consumed once at startup from an optional file plus
//! `WAYPOST__*` environment overrides. Absence of a window-store URL forces
//! local-only rate limiting.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Result, WaypostError};

/// Main configuration for the Waypost core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WaypostConfig {
    /// Rate limiting configuration
    pub rate_limiting: RateLimitSettings,

    /// Proximity search configuration
    pub search: SearchSettings,
}

/// Rate limiting configuration.
///
/// The per-class request limits mirror the admission policy table: login
/// attempts, anonymous reads, and unauthenticated writes each get their own
/// budget, everything else falls back to the default limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Enable admission control. When false every request bypasses the limiter.
    pub enabled: bool,

    /// Requests per window for authenticated traffic (the default policy).
    pub default_limit: u32,

    /// Window length in seconds shared by all policy classes.
    pub window_secs: u64,

    /// Requests per window for login attempts (brute-force protection).
    pub login_limit: u32,

    /// Requests per window for anonymous, non-write traffic.
    pub anonymous_limit: u32,

    /// Requests per window for unauthenticated write verbs.
    pub write_limit: u32,

    /// Connection string for the shared window store. When set, the backend
    /// factory probes the store at startup and uses the shared limiter;
    /// when unset the process runs local-only.
    pub store_url: Option<String>,

    /// Upper bound on any single window-store call, in milliseconds.
    pub store_timeout_ms: u64,

    /// Minimum interval between full prunes of the local limiter table.
    pub cleanup_interval_secs: u64,

    /// Paths that bypass admission control entirely.
    pub exempt_paths: Vec<String>,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            default_limit: default_limit(),
            window_secs: default_window_secs(),
            login_limit: default_login_limit(),
            anonymous_limit: default_anonymous_limit(),
            write_limit: default_write_limit(),
            store_url: None,
            store_timeout_ms: default_store_timeout_ms(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            exempt_paths: default_exempt_paths(),
        }
    }
}

fn default_limit() -> u32 {
    100
}

fn default_window_secs() -> u64 {
    60
}

fn default_login_limit() -> u32 {
    5
}

fn default_anonymous_limit() -> u32 {
    20
}

fn default_write_limit() -> u32 {
    10
}

fn default_store_timeout_ms() -> u64 {
    250
}

fn default_cleanup_interval_secs() -> u64 {
    60
}

fn default_exempt_paths() -> Vec<String> {
    ["/health", "/docs", "/openapi.json", "/redoc"]
        .iter()
        .map(|p| p.to_string())
        .collect()
}

impl RateLimitSettings {
    /// Upper bound on any single window-store call.
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

/// Proximity search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Largest radius a search may request, in kilometers.
    pub max_radius_km: f64,

    /// Result page size when the caller does not specify one.
    pub default_limit: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_radius_km: 500.0,
            default_limit: 50,
        }
    }
}

impl WaypostConfig {
    /// Load configuration from an optional file, then apply `WAYPOST__*`
    /// environment overrides (e.g. `WAYPOST__RATE_LIMITING__LOGIN_LIMIT=3`).
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix("WAYPOST")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .map_err(|e| WaypostError::Config(e.to_string()))?;

        settings
            .try_deserialize()
            .map_err(|e| WaypostError::Config(e.to_string()))
    }
}
