//! Request classification into policy classes.

use std::collections::HashSet;
use std::net::IpAddr;

use axum::http::Method;

use crate::config::RateLimitSettings;

use super::policy::{PolicyClass, RateLimitKey, RateLimitPolicy};

/// Identity assigned when neither a forwarded-for header nor a peer address
/// is available.
const UNKNOWN_CLIENT: &str = "unknown";

/// Transport-independent view of an inbound request, carrying just the
/// metadata classification needs.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub method: Method,
    pub path: String,
    /// Raw `X-Forwarded-For` header value, if present.
    pub forwarded_for: Option<String>,
    /// Raw `Authorization` header value, if present.
    pub authorization: Option<String>,
    /// Transport-level peer address.
    pub peer_ip: Option<IpAddr>,
}

/// How a request should be admitted.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Health/docs paths that bypass admission control entirely.
    Exempt,
    /// Subject to the given policy under the given key.
    Limit {
        key: RateLimitKey,
        policy: RateLimitPolicy,
    },
}

/// Maps a request to its rate limit key and policy.
///
/// Classification needs only the *presence* of a bearer credential, not its
/// validity; full verification happens downstream.
pub struct RequestClassifier {
    settings: RateLimitSettings,
    exempt_paths: HashSet<String>,
}

impl RequestClassifier {
    pub fn new(settings: RateLimitSettings) -> Self {
        let exempt_paths = settings.exempt_paths.iter().cloned().collect();
        Self {
            settings,
            exempt_paths,
        }
    }

    pub fn classify(&self, request: &RequestMeta) -> Classification {
        if self.exempt_paths.contains(&request.path) {
            return Classification::Exempt;
        }

        let client = self.client_identity(request);
        let path = request.path.to_ascii_lowercase();

        if path.contains("/auth/login") {
            return self.limit(PolicyClass::Login, client, false);
        }

        let authenticated = request
            .authorization
            .as_deref()
            .is_some_and(|value| value.starts_with("Bearer "));

        let is_write = matches!(
            request.method.as_str(),
            "POST" | "PUT" | "PATCH" | "DELETE"
        );

        let class = match (is_write, authenticated) {
            (true, _) => PolicyClass::Write,
            (false, true) => PolicyClass::Authenticated,
            (false, false) => PolicyClass::Anonymous,
        };
        self.limit(class, client, authenticated)
    }

    fn limit(&self, class: PolicyClass, client: String, authenticated: bool) -> Classification {
        Classification::Limit {
            key: RateLimitKey::new(class, client),
            policy: class.policy(&self.settings, authenticated),
        }
    }

    /// Client identity: first entry of the forwarded-for chain when present,
    /// else the transport peer address.
    fn client_identity(&self, request: &RequestMeta) -> String {
        if let Some(forwarded) = request.forwarded_for.as_deref() {
            if let Some(first) = forwarded.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return first.to_string();
                }
            }
        }

        request
            .peer_ip
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> RequestClassifier {
        RequestClassifier::new(RateLimitSettings::default())
    }

    fn request(method: Method, path: &str) -> RequestMeta {
        RequestMeta {
            method,
            path: path.to_string(),
            forwarded_for: None,
            authorization: None,
            peer_ip: Some("203.0.113.4".parse().unwrap()),
        }
    }

    fn expect_limit(classification: Classification) -> (RateLimitKey, RateLimitPolicy) {
        match classification {
            Classification::Limit { key, policy } => (key, policy),
            Classification::Exempt => panic!("expected a limited classification"),
        }
    }

    #[test]
    fn test_exempt_paths_bypass() {
        let classifier = classifier();
        for path in ["/health", "/docs", "/openapi.json", "/redoc"] {
            assert_eq!(
                classifier.classify(&request(Method::GET, path)),
                Classification::Exempt,
                "{path} should be exempt"
            );
        }
    }

    #[test]
    fn test_login_gets_its_own_budget() {
        let classifier = classifier();
        let (key, policy) = expect_limit(
            classifier.classify(&request(Method::POST, "/api/v1/auth/login")),
        );

        assert_eq!(key.to_string(), "login:203.0.113.4");
        assert_eq!(policy, RateLimitPolicy::new(5, 60));
    }

    #[test]
    fn test_unauthenticated_write_uses_write_limit() {
        let classifier = classifier();
        let (key, policy) =
            expect_limit(classifier.classify(&request(Method::POST, "/api/v1/places")));

        assert_eq!(key.class, PolicyClass::Write);
        assert_eq!(policy, RateLimitPolicy::new(10, 60));
    }

    #[test]
    fn test_authenticated_write_uses_default_limit() {
        let classifier = classifier();
        let mut req = request(Method::DELETE, "/api/v1/places/42");
        req.authorization = Some("Bearer abc123".to_string());

        let (key, policy) = expect_limit(classifier.classify(&req));
        assert_eq!(key.class, PolicyClass::Write);
        assert_eq!(policy, RateLimitPolicy::new(100, 60));
    }

    #[test]
    fn test_authenticated_read() {
        let classifier = classifier();
        let mut req = request(Method::GET, "/api/v1/places");
        req.authorization = Some("Bearer abc123".to_string());

        let (key, policy) = expect_limit(classifier.classify(&req));
        assert_eq!(key.to_string(), "auth:203.0.113.4");
        assert_eq!(policy, RateLimitPolicy::new(100, 60));
    }

    #[test]
    fn test_anonymous_read() {
        let classifier = classifier();
        let (key, policy) =
            expect_limit(classifier.classify(&request(Method::GET, "/api/v1/places")));

        assert_eq!(key.to_string(), "anon:203.0.113.4");
        assert_eq!(policy, RateLimitPolicy::new(20, 60));
    }

    #[test]
    fn test_non_bearer_credential_is_anonymous() {
        let classifier = classifier();
        let mut req = request(Method::GET, "/api/v1/places");
        req.authorization = Some("Basic dXNlcjpwYXNz".to_string());

        let (key, _) = expect_limit(classifier.classify(&req));
        assert_eq!(key.class, PolicyClass::Anonymous);
    }

    #[test]
    fn test_forwarded_for_takes_precedence() {
        let classifier = classifier();
        let mut req = request(Method::GET, "/api/v1/places");
        req.forwarded_for = Some("198.51.100.7, 10.0.0.1".to_string());

        let (key, _) = expect_limit(classifier.classify(&req));
        assert_eq!(key.client, "198.51.100.7");
    }

    #[test]
    fn test_missing_identity_falls_back_to_unknown() {
        let classifier = classifier();
        let mut req = request(Method::GET, "/api/v1/places");
        req.peer_ip = None;

        let (key, _) = expect_limit(classifier.classify(&req));
        assert_eq!(key.client, "unknown");
    }
}
