//! Admission control: classify, check, and decorate every inbound request.
//!
//! `AdmissionControl` is transport-independent; `admission_middleware` is the
//! axum adapter that the embedding application layers in front of its router.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::debug;

use crate::config::RateLimitSettings;
use crate::ratelimit::{
    Classification, Clock, RateLimiterBackend, RequestClassifier, RequestMeta,
};

const LIMIT_HEADER: &str = "x-ratelimit-limit";
const REMAINING_HEADER: &str = "x-ratelimit-remaining";
const RESET_HEADER: &str = "x-ratelimit-reset";

/// Rate limit metadata attached to every non-exempt response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub limit: u32,
    pub remaining: u32,
    pub reset_seconds: u64,
}

/// Outcome of admitting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionDecision {
    /// Exempt path, or the limiter is disabled
    Bypass,
    Allowed(RateLimitStatus),
    Denied(RateLimitStatus),
}

/// Orchestrates classification and limiting for every inbound request.
///
/// Constructed once at startup with the backend chosen by
/// [`crate::ratelimit::select_backend`] and injected wherever requests enter
/// the process. Every non-exempt request spends exactly one window entry,
/// whether it is ultimately allowed or denied.
pub struct AdmissionControl {
    classifier: RequestClassifier,
    limiter: Arc<dyn RateLimiterBackend>,
    clock: Arc<dyn Clock>,
    enabled: bool,
}

impl AdmissionControl {
    pub fn new(
        settings: RateLimitSettings,
        limiter: Arc<dyn RateLimiterBackend>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let enabled = settings.enabled;
        Self {
            classifier: RequestClassifier::new(settings),
            limiter,
            clock,
            enabled,
        }
    }

    pub async fn admit(&self, request: &RequestMeta) -> AdmissionDecision {
        if !self.enabled {
            return AdmissionDecision::Bypass;
        }

        match self.classifier.classify(request) {
            Classification::Exempt => AdmissionDecision::Bypass,
            Classification::Limit { key, policy } => {
                let check = self.limiter.check(&key, &policy).await;
                let status = RateLimitStatus {
                    limit: policy.max_requests,
                    remaining: check.remaining,
                    reset_seconds: check.reset_seconds,
                };

                if check.limited {
                    debug!(key = %key, retry_after = check.reset_seconds, "Request denied by rate limit");
                    AdmissionDecision::Denied(status)
                } else {
                    AdmissionDecision::Allowed(status)
                }
            }
        }
    }

    /// Epoch second at which the reported window resets.
    fn reset_epoch(&self, status: &RateLimitStatus) -> u64 {
        self.clock.now() as u64 + status.reset_seconds
    }
}

/// Axum middleware enforcing admission control.
///
/// Denied requests get a 429 with a `Retry-After` header and a JSON body;
/// allowed ones proceed downstream and have their response decorated with
/// the rate limit headers regardless of downstream outcome.
pub async fn admission_middleware(
    State(control): State<Arc<AdmissionControl>>,
    request: Request,
    next: Next,
) -> Response {
    let peer_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let meta = request_meta(&request, peer_ip);

    match control.admit(&meta).await {
        AdmissionDecision::Bypass => next.run(request).await,
        AdmissionDecision::Denied(status) => {
            let body = Json(json!({
                "detail": "Too many requests. Please try again later.",
                "retry_after": status.reset_seconds,
            }));
            let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
            let reset_epoch = control.reset_epoch(&status);
            let headers = response.headers_mut();
            headers.insert(header::RETRY_AFTER, HeaderValue::from(status.reset_seconds));
            apply_rate_limit_headers(headers, &status, reset_epoch);
            response
        }
        AdmissionDecision::Allowed(status) => {
            let mut response = next.run(request).await;
            let reset_epoch = control.reset_epoch(&status);
            apply_rate_limit_headers(response.headers_mut(), &status, reset_epoch);
            response
        }
    }
}

fn apply_rate_limit_headers(headers: &mut HeaderMap, status: &RateLimitStatus, reset_epoch: u64) {
    headers.insert(LIMIT_HEADER, HeaderValue::from(status.limit));
    headers.insert(REMAINING_HEADER, HeaderValue::from(status.remaining));
    headers.insert(RESET_HEADER, HeaderValue::from(reset_epoch));
}

fn request_meta(request: &Request<Body>, peer_ip: Option<IpAddr>) -> RequestMeta {
    let headers = request.headers();
    RequestMeta {
        method: request.method().clone(),
        path: request.uri().path().to_string(),
        forwarded_for: header_string(headers, "x-forwarded-for"),
        authorization: header_string(headers, header::AUTHORIZATION.as_str()),
        peer_ip,
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
