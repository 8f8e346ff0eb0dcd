//! Security Audit Logging
//!
//! Audit events go to the `security_audit` tracing target. Session
//! identifiers are always reduced to a short prefix before they reach a log.

use crate::session::RequestContext;
use std::fmt;
use tracing::{info, warn};

/// Characters of a session ID that may appear in logs
pub const SESSION_ID_LOG_PREFIX: usize = 8;

/// Reduce a session ID to its 8-character prefix followed by `...`
pub fn redact_session_id(session_id: &str) -> String {
    let prefix: String = session_id.chars().take(SESSION_ID_LOG_PREFIX).collect();
    format!("{prefix}...")
}

/// Security event types for logging and monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEvent {
    SessionCreated,
    SessionValidated,
    SessionInvalidated,
    ActivityUpdated,
    CsrfValidated,
    RateLimitChecked,
    RateLimitExceeded,
    PasswordChecked,
    MethodRejected,
    PayloadRejected,
    InvalidRequest,
}

impl SecurityEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityEvent::SessionCreated => "session_created",
            SecurityEvent::SessionValidated => "session_validated",
            SecurityEvent::SessionInvalidated => "session_invalidated",
            SecurityEvent::ActivityUpdated => "activity_updated",
            SecurityEvent::CsrfValidated => "csrf_validated",
            SecurityEvent::RateLimitChecked => "rate_limit_checked",
            SecurityEvent::RateLimitExceeded => "rate_limit_exceeded",
            SecurityEvent::PasswordChecked => "password_checked",
            SecurityEvent::MethodRejected => "method_rejected",
            SecurityEvent::PayloadRejected => "payload_rejected",
            SecurityEvent::InvalidRequest => "invalid_request",
        }
    }

    /// Events that indicate a rejected or suspicious request
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            SecurityEvent::RateLimitExceeded
                | SecurityEvent::MethodRejected
                | SecurityEvent::PayloadRejected
                | SecurityEvent::InvalidRequest
        )
    }
}

impl fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One metadata value attached to an audit event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditValue {
    /// Logged only as its redacted prefix
    SessionId(String),
    Text(String),
}

impl AuditValue {
    pub fn session(session_id: &str) -> Self {
        Self::SessionId(session_id.to_string())
    }

    pub fn text(value: impl ToString) -> Self {
        Self::Text(value.to_string())
    }

    fn render(&self) -> String {
        match self {
            AuditValue::SessionId(id) => redact_session_id(id),
            AuditValue::Text(text) => text.clone(),
        }
    }
}

/// Render metadata as `key=value` pairs with session IDs redacted
pub fn render_metadata(metadata: &[(&str, AuditValue)]) -> String {
    metadata
        .iter()
        .map(|(key, value)| format!("{key}={}", value.render()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Write an audit record for `event`
pub fn log_security_event(ctx: &RequestContext, event: SecurityEvent, metadata: &[(&str, AuditValue)]) {
    let details = render_metadata(metadata);
    let client_ip = ctx.ip_label();

    if event.is_warning() {
        warn!(
            target: "security_audit",
            event = %event,
            client_ip = %client_ip,
            details = %details,
            "Security event"
        );
    } else {
        info!(
            target: "security_audit",
            event = %event,
            client_ip = %client_ip,
            details = %details,
            "Security event"
        );
    }
}
