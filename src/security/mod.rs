//! Security Module
//!
//! Rate limiting, CSRF tokens, password policy and audit logging for the
//! auth endpoints.

pub mod audit;
pub mod csrf;
pub mod password;
pub mod rate_limiter;

pub use audit::{log_security_event, redact_session_id, AuditValue, SecurityEvent};
pub use csrf::{CsrfConfig, CsrfIssuer};
pub use password::{PasswordPolicy, PasswordReport, PasswordStrength, PasswordValidator};
pub use rate_limiter::{rate_limit_key, AuthRateLimiter, RateLimitConfig, RateLimitDecision, RateLimiterStats};
