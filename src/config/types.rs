//! Configuration Types

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use crate::security::{CsrfConfig, PasswordPolicy, RateLimitConfig};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub rate_limit: RateLimitConfig,
    pub csrf: CsrfConfig,
    pub password: PasswordPolicy,
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Body cap applied to every `/api/auth/*` request
    pub max_body_bytes: usize,
    /// Take the client IP from `X-Forwarded-For` / `X-Real-IP`. Enable only
    /// behind a reverse proxy that overwrites those headers.
    pub trust_proxy_headers: bool,
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

/// Session lifetime configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum inactivity before a session expires
    #[serde(with = "humantime_serde")]
    pub idle_timeout: Duration,
    /// Maximum total age regardless of activity
    #[serde(with = "humantime_serde")]
    pub absolute_lifetime: Duration,
    pub sweep_enabled: bool,
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
            max_body_bytes: 1024,
            trust_proxy_headers: false,
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(30 * 60),
            absolute_lifetime: Duration::from_secs(24 * 60 * 60),
            sweep_enabled: true,
            sweep_interval: Duration::from_secs(5 * 60),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
