//! Auth API Handlers

use super::types::*;
use crate::clock::Clock;
use crate::config::Config;
use crate::error::{AuthError, AuthResult};
use crate::metrics::Metrics;
use crate::security::{
    log_security_event, rate_limit_key, AuditValue, AuthRateLimiter, CsrfIssuer, PasswordReport,
    PasswordValidator, RateLimitDecision, SecurityEvent,
};
use crate::session::{RequestContext, SessionStore};
use crate::Result;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::SystemTime;

/// Rate-limit bucket used when the caller does not name one
pub const DEFAULT_RATE_LIMIT_KIND: &str = "login";

/// Shared application state for handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub rate_limiter: Arc<AuthRateLimiter>,
    pub csrf: Arc<CsrfIssuer>,
    pub passwords: Arc<PasswordValidator>,
    pub metrics: Arc<Metrics>,
    pub max_body_bytes: usize,
    /// Whether client IPs may come from proxy headers
    pub trust_proxy_headers: bool,
    pub start_time: SystemTime,
}

impl AppState {
    /// Build every store and service from configuration
    pub fn from_config(config: &Config, clock: Arc<dyn Clock>) -> Result<Self> {
        let sessions = Arc::new(SessionStore::new(config.session.clone(), clock.clone()));
        let csrf = CsrfIssuer::from_config(&config.csrf, sessions.clone())?;

        Ok(Self {
            rate_limiter: Arc::new(AuthRateLimiter::new(config.rate_limit.clone(), clock)),
            csrf: Arc::new(csrf),
            passwords: Arc::new(PasswordValidator::new(config.password.clone())?),
            metrics: Arc::new(Metrics::new()?),
            max_body_bytes: config.server.max_body_bytes,
            trust_proxy_headers: config.server.trust_proxy_headers,
            start_time: SystemTime::now(),
            sessions,
        })
    }
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> AuthResult<T> {
    serde_json::from_slice(body).map_err(|_| AuthError::invalid_input("Invalid JSON body"))
}

/// Trimmed, non-empty value of a required field
fn required(value: Option<String>, field: &str) -> AuthResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AuthError::invalid_input(format!("{field} is required")))
}

/// Session ID from a body, or `None` for anything malformed
fn session_id_from(body: &[u8]) -> Option<String> {
    parse_body::<SessionIdRequest>(body)
        .and_then(|req| required(req.session_id, "sessionId"))
        .ok()
}

fn reject_input(ctx: &RequestContext, endpoint: &str, err: AuthError) -> AuthError {
    log_security_event(
        ctx,
        SecurityEvent::InvalidRequest,
        &[
            ("endpoint", AuditValue::text(endpoint)),
            ("reason", AuditValue::text(&err)),
        ],
    );
    err
}

/// Create a session and its CSRF token
pub async fn create_session(
    State(state): State<AppState>,
    ctx: RequestContext,
    body: Bytes,
) -> AuthResult<Json<CreateSessionResponse>> {
    let user_id = parse_body::<CreateSessionRequest>(&body)
        .and_then(|req| required(req.user_id, "userId"))
        .map_err(|err| reject_input(&ctx, "create-session", err))?;

    let session_id = state.sessions.create_session(&user_id, &ctx)?;
    let csrf_token = match state.csrf.generate_csrf_token(&session_id) {
        Ok(token) => token,
        Err(err) => {
            state.sessions.invalidate_session(&session_id);
            return Err(AuthError::internal(format!(
                "CSRF token generation failed: {err}"
            )));
        }
    };

    state.metrics.record_session_created();
    log_security_event(
        &ctx,
        SecurityEvent::SessionCreated,
        &[
            ("session", AuditValue::session(&session_id)),
            ("user_id", AuditValue::text(&user_id)),
        ],
    );

    Ok(Json(CreateSessionResponse {
        session_id,
        csrf_token,
    }))
}

/// Report whether a session is valid; malformed input is simply invalid
pub async fn validate_session(
    State(state): State<AppState>,
    ctx: RequestContext,
    body: Bytes,
) -> Json<ValidResponse> {
    let valid = match session_id_from(&body) {
        Some(session_id) => {
            let valid = state.sessions.is_session_valid(&session_id);
            log_security_event(
                &ctx,
                SecurityEvent::SessionValidated,
                &[
                    ("session", AuditValue::session(&session_id)),
                    ("valid", AuditValue::text(valid)),
                ],
            );
            valid
        }
        None => false,
    };

    state.metrics.record_session_check(valid);
    Json(ValidResponse { valid })
}

/// Refresh activity on a session; failures collapse to `success: false`
pub async fn update_activity(
    State(state): State<AppState>,
    ctx: RequestContext,
    body: Bytes,
) -> Json<SuccessResponse> {
    let success = match session_id_from(&body) {
        Some(session_id) => {
            let success = state.sessions.update_session_activity(&session_id, &ctx);
            log_security_event(
                &ctx,
                SecurityEvent::ActivityUpdated,
                &[
                    ("session", AuditValue::session(&session_id)),
                    ("success", AuditValue::text(success)),
                ],
            );
            success
        }
        None => false,
    };

    Json(SuccessResponse { success })
}

/// Remove a session; always succeeds for a well-formed ID
pub async fn invalidate_session(
    State(state): State<AppState>,
    ctx: RequestContext,
    body: Bytes,
) -> AuthResult<Json<SuccessResponse>> {
    let session_id = parse_body::<SessionIdRequest>(&body)
        .and_then(|req| required(req.session_id, "sessionId"))
        .map_err(|err| reject_input(&ctx, "invalidate-session", err))?;

    state.sessions.invalidate_session(&session_id);
    state.metrics.record_session_invalidated();
    log_security_event(
        &ctx,
        SecurityEvent::SessionInvalidated,
        &[("session", AuditValue::session(&session_id))],
    );

    Ok(Json(SuccessResponse { success: true }))
}

/// Count one attempt against `type_ip_identifier`
pub async fn check_rate_limit(
    State(state): State<AppState>,
    ctx: RequestContext,
    body: Bytes,
) -> AuthResult<Json<RateLimitDecision>> {
    let request = parse_body::<RateLimitRequest>(&body)
        .map_err(|err| reject_input(&ctx, "check-rate-limit", err))?;
    let identifier = required(request.identifier, "identifier")
        .map_err(|err| reject_input(&ctx, "check-rate-limit", err))?;
    let kind = request
        .kind
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .unwrap_or_else(|| DEFAULT_RATE_LIMIT_KIND.to_string());

    let key = rate_limit_key(&kind, &ctx.ip_label(), &identifier);
    let decision = state.rate_limiter.check_auth_rate_limit(&key);

    state.metrics.record_rate_limit_check(decision.allowed);
    let event = if decision.allowed {
        SecurityEvent::RateLimitChecked
    } else {
        SecurityEvent::RateLimitExceeded
    };
    log_security_event(
        &ctx,
        event,
        &[
            ("kind", AuditValue::text(&kind)),
            ("remaining", AuditValue::text(decision.remaining_attempts)),
        ],
    );

    Ok(Json(decision))
}

/// Score a candidate password. The password itself is never logged.
pub async fn validate_password(
    State(state): State<AppState>,
    ctx: RequestContext,
    body: Bytes,
) -> AuthResult<Json<PasswordReport>> {
    let request = parse_body::<PasswordRequest>(&body)
        .map_err(|err| reject_input(&ctx, "validate-password", err))?;
    let password = request.password.ok_or_else(|| {
        reject_input(
            &ctx,
            "validate-password",
            AuthError::invalid_input("password is required"),
        )
    })?;

    let report = state.passwords.validate_password(&password);
    state.metrics.record_password_check();
    log_security_event(
        &ctx,
        SecurityEvent::PasswordChecked,
        &[
            ("valid", AuditValue::text(report.is_valid)),
            ("score", AuditValue::text(report.score)),
        ],
    );

    Ok(Json(report))
}

/// Check a CSRF token against its session; malformed input is invalid
pub async fn validate_csrf(
    State(state): State<AppState>,
    ctx: RequestContext,
    body: Bytes,
) -> Json<ValidResponse> {
    let pair = parse_body::<CsrfRequest>(&body).ok().and_then(|req| {
        let session_id = required(req.session_id, "sessionId").ok()?;
        let token = required(req.csrf_token, "csrfToken").ok()?;
        Some((session_id, token))
    });

    let valid = match pair {
        Some((session_id, token)) => {
            let valid = state.csrf.validate_csrf_token(&session_id, &token);
            log_security_event(
                &ctx,
                SecurityEvent::CsrfValidated,
                &[
                    ("session", AuditValue::session(&session_id)),
                    ("valid", AuditValue::text(valid)),
                ],
            );
            valid
        }
        None => false,
    };

    state.metrics.record_csrf_check(valid);
    Json(ValidResponse { valid })
}

/// Health check handler
pub async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    let uptime = SystemTime::now()
        .duration_since(state.start_time)
        .unwrap_or_default()
        .as_secs();

    Json(HealthStatus {
        status: "healthy".to_string(),
        active_sessions: state.sessions.active_session_count(),
        uptime_seconds: uptime,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Prometheus scrape endpoint
pub async fn export_metrics(State(state): State<AppState>) -> impl IntoResponse {
    state
        .metrics
        .set_active_sessions(state.sessions.active_session_count());

    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.metrics.export_prometheus(),
    )
}
