//! Request Guard
//!
//! Boundary checks every auth route goes through before its handler runs:
//! method allow-list, body-size cap and client context extraction. The
//! fixed security-header set is attached to every response separately.

use super::handlers::AppState;
use crate::error::{AuthError, AuthResult};
use crate::metrics::Metrics;
use crate::security::{log_security_event, AuditValue, SecurityEvent};
use crate::session::RequestContext;
use axum::{
    async_trait,
    body::Body,
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{
        header::{self, HeaderName, HeaderValue},
        request::Parts,
        HeaderMap, Method,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

/// Defensive headers set on every response
pub const SECURITY_HEADERS: [(&str, &str); 8] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("x-xss-protection", "1; mode=block"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    (
        "content-security-policy",
        "default-src 'none'; frame-ancestors 'none'",
    ),
    (
        "strict-transport-security",
        "max-age=31536000; includeSubDomains",
    ),
    ("cache-control", "no-store"),
    (
        "permissions-policy",
        "camera=(), microphone=(), geolocation=()",
    ),
];

/// Reject any method outside `allowed`
pub fn validate_method(method: &Method, allowed: &[Method]) -> AuthResult<()> {
    if allowed.contains(method) {
        Ok(())
    } else {
        Err(AuthError::MethodNotAllowed {
            method: method.to_string(),
        })
    }
}

/// Reject a declared `Content-Length` above `max_bytes`
pub fn validate_content_length(headers: &HeaderMap, max_bytes: usize) -> AuthResult<()> {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<usize>().ok());

    match declared {
        Some(length) if length > max_bytes => Err(AuthError::PayloadTooLarge { limit: max_bytes }),
        _ => Ok(()),
    }
}

/// Set the fixed security-header set, replacing any existing values
pub fn add_security_headers(headers: &mut HeaderMap) {
    for (name, value) in SECURITY_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
}

/// Response layer applying [`add_security_headers`]
pub async fn security_headers(mut response: Response) -> Response {
    add_security_headers(response.headers_mut());
    response
}

/// Resolve the client IP.
///
/// Proxy headers are client-controlled, so they are consulted only when
/// `trust_proxy_headers` is set; otherwise the socket peer is the answer.
pub fn client_ip(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_proxy_headers: bool,
) -> Option<IpAddr> {
    let peer_ip = peer.map(|addr| addr.ip());
    if !trust_proxy_headers {
        return peer_ip;
    }

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<IpAddr>().ok())
    };

    forwarded.or_else(real_ip).or(peer_ip)
}

fn context_from_parts(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_proxy_headers: bool,
) -> RequestContext {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    RequestContext::new(client_ip(headers, peer, trust_proxy_headers), user_agent)
}

fn peer_addr(extensions: &axum::http::Extensions) -> Option<SocketAddr> {
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}

#[async_trait]
impl FromRequestParts<AppState> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(context_from_parts(
            &parts.headers,
            peer_addr(&parts.extensions),
            state.trust_proxy_headers,
        ))
    }
}

/// Policy enforced by [`request_guard`]
pub struct RequestGuard {
    allowed_methods: Vec<Method>,
    max_body_bytes: usize,
    trust_proxy_headers: bool,
    metrics: Arc<Metrics>,
}

impl RequestGuard {
    pub fn new(
        allowed_methods: Vec<Method>,
        max_body_bytes: usize,
        trust_proxy_headers: bool,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            allowed_methods,
            max_body_bytes,
            trust_proxy_headers,
            metrics,
        }
    }

    fn reject(&self, ctx: &RequestContext, event: SecurityEvent, path: &str, err: AuthError) -> Response {
        self.metrics.record_rejection(event);
        log_security_event(
            ctx,
            event,
            &[
                ("path", AuditValue::text(path)),
                ("reason", AuditValue::text(&err)),
            ],
        );

        let mut response = err.into_response();
        if event == SecurityEvent::MethodRejected {
            let allow = self
                .allowed_methods
                .iter()
                .map(Method::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            if let Ok(value) = HeaderValue::from_str(&allow) {
                response.headers_mut().insert(header::ALLOW, value);
            }
        }
        response
    }
}

/// Middleware enforcing the method allow-list and the body cap.
///
/// The body is buffered with the cap applied, so requests without a
/// `Content-Length` are measured too.
pub async fn request_guard(
    State(guard): State<Arc<RequestGuard>>,
    request: Request,
    next: Next,
) -> Response {
    let ctx = context_from_parts(
        request.headers(),
        peer_addr(request.extensions()),
        guard.trust_proxy_headers,
    );
    let path = request.uri().path().to_string();

    if let Err(err) = validate_method(request.method(), &guard.allowed_methods) {
        return guard.reject(&ctx, SecurityEvent::MethodRejected, &path, err);
    }

    if let Err(err) = validate_content_length(request.headers(), guard.max_body_bytes) {
        return guard.reject(&ctx, SecurityEvent::PayloadRejected, &path, err);
    }

    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, guard.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(_) => {
            let err = AuthError::PayloadTooLarge {
                limit: guard.max_body_bytes,
            };
            return guard.reject(&ctx, SecurityEvent::PayloadRejected, &path, err);
        }
    };

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}
