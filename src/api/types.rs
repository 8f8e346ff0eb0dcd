//! Auth API Types

use serde::{Deserialize, Serialize};

/// `POST /api/auth/create-session`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub csrf_token: String,
}

/// Body shared by the endpoints that only take a session ID
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIdRequest {
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidResponse {
    pub valid: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// `POST /api/auth/check-rate-limit`
#[derive(Debug, Deserialize)]
pub struct RateLimitRequest {
    pub identifier: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// `POST /api/auth/validate-password`
#[derive(Deserialize)]
pub struct PasswordRequest {
    pub password: Option<String>,
}

/// `POST /api/auth/validate-csrf`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsrfRequest {
    pub session_id: Option<String>,
    pub csrf_token: Option<String>,
}

/// `GET /health`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: String,
    pub active_sessions: usize,
    pub uptime_seconds: u64,
    pub version: String,
}
