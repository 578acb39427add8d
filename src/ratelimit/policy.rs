//! Rate limit policies and the keys they apply to.

use std::fmt;

use crate::config::RateLimitSettings;

/// Window length applied to login attempts regardless of the configured
/// default window, matching the brute-force budget of 5 per minute.
pub(crate) const LOGIN_WINDOW_SECS: u64 = 60;

/// A request budget: at most `max_requests` attempts within any trailing
/// window of `window_secs` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Maximum attempts allowed in the window
    pub max_requests: u32,
    /// Window length in seconds
    pub window_secs: u64,
}

impl RateLimitPolicy {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window_secs,
        }
    }
}

/// Closed set of policy classes a request can fall into.
///
/// Computed once per request by the classifier; the variant determines both
/// the key prefix and which configured limit applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyClass {
    /// Login attempts, keyed separately for brute-force protection
    Login,
    /// Write verbs (POST/PUT/PATCH/DELETE)
    Write,
    /// Authenticated, non-write traffic
    Authenticated,
    /// Anonymous, non-write traffic
    Anonymous,
}

impl PolicyClass {
    /// Key prefix identifying this class in window state.
    pub fn prefix(&self) -> &'static str {
        match self {
            PolicyClass::Login => "login",
            PolicyClass::Write => "write",
            PolicyClass::Authenticated => "auth",
            PolicyClass::Anonymous => "anon",
        }
    }

    /// The configured policy for this class.
    ///
    /// Authenticated writers get the default budget; only unauthenticated
    /// writes are held to the tighter write limit, which the classifier
    /// signals via `authenticated`.
    pub fn policy(&self, settings: &RateLimitSettings, authenticated: bool) -> RateLimitPolicy {
        match self {
            PolicyClass::Login => RateLimitPolicy::new(settings.login_limit, LOGIN_WINDOW_SECS),
            PolicyClass::Write => {
                let limit = if authenticated {
                    settings.default_limit
                } else {
                    settings.write_limit
                };
                RateLimitPolicy::new(limit, settings.window_secs)
            }
            PolicyClass::Authenticated => {
                RateLimitPolicy::new(settings.default_limit, settings.window_secs)
            }
            PolicyClass::Anonymous => {
                RateLimitPolicy::new(settings.anonymous_limit, settings.window_secs)
            }
        }
    }
}

/// A key that uniquely identifies one client within one policy class.
///
/// Rendered as `"login:203.0.113.4"` and used verbatim as the window-state
/// key in both backends.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey {
    pub class: PolicyClass,
    pub client: String,
}

impl RateLimitKey {
    pub fn new(class: PolicyClass, client: impl Into<String>) -> Self {
        Self {
            class,
            client: client.into(),
        }
    }
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.class.prefix(), self.client)
    }
}
