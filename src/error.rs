//! Error Types
//!
//! [`AuthError`] is the error every core operation and request guard
//! returns. Handlers turn it into an HTTP response through [`ErrorClass`],
//! which separates client mistakes (rendered verbatim) from server failures
//! (logged, then rendered as a generic message).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Errors raised by the auth security layer
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Missing or malformed required field
    #[error("{0}")]
    InvalidInput(String),

    #[error("Method {method} not allowed")]
    MethodNotAllowed { method: String },

    #[error("Request body exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: usize },

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Unauthorized(String),

    /// Unexpected failure; the message is logged but never sent to clients
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience alias for operations that fail with [`AuthError`]
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// How an error should be surfaced to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorClass {
    Client {
        status: StatusCode,
        code: &'static str,
        message: String,
    },
    Server {
        message: String,
    },
}

impl AuthError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Classify this error for the HTTP boundary
    pub fn class(&self) -> ErrorClass {
        let client = |status, code| ErrorClass::Client {
            status,
            code,
            message: self.to_string(),
        };

        match self {
            AuthError::InvalidInput(_) => client(StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            AuthError::MethodNotAllowed { .. } => {
                client(StatusCode::METHOD_NOT_ALLOWED, "METHOD_NOT_ALLOWED")
            }
            AuthError::PayloadTooLarge { .. } => {
                client(StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE")
            }
            AuthError::Unauthenticated(_) => client(StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
            AuthError::Unauthorized(_) => client(StatusCode::FORBIDDEN, "UNAUTHORIZED"),
            AuthError::Internal(msg) => ErrorClass::Server {
                message: msg.clone(),
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.class() {
            ErrorClass::Client { status, .. } => status,
            ErrorClass::Server { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self.class() {
            ErrorClass::Client {
                status,
                code,
                message,
            } => (status, code, message),
            ErrorClass::Server { message } => {
                tracing::error!(error = %message, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}
