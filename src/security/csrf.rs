//! CSRF Token Issuer
//!
//! Tokens are stateless: `base64url(nonce || HMAC-SHA256(secret, session_id, nonce))`.
//! A token verifies only for the session it was issued to, and only while
//! that session is still valid. Tokens may be reused until the session ends.

use crate::error::{AuthError, AuthResult};
use crate::session::SessionStore;
use crate::Result;
use anyhow::bail;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use tracing::{debug, info, warn};

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 16;
const TAG_LEN: usize = 32;

/// Minimum accepted secret length in bytes
pub const MIN_SECRET_LEN: usize = 32;

/// CSRF configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CsrfConfig {
    /// Environment variable holding the signing secret
    pub secret_env: String,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            secret_env: "ANIMEHUB_CSRF_SECRET".to_string(),
        }
    }
}

/// Issues and verifies session-bound CSRF tokens
pub struct CsrfIssuer {
    secret: Vec<u8>,
    sessions: Arc<SessionStore>,
}

impl CsrfIssuer {
    /// Create an issuer with an explicit signing secret
    pub fn new(secret: Vec<u8>, sessions: Arc<SessionStore>) -> Result<Self> {
        if secret.len() < MIN_SECRET_LEN {
            bail!("CSRF secret must be at least {MIN_SECRET_LEN} bytes");
        }
        Ok(Self { secret, sessions })
    }

    /// Read the secret from the configured environment variable, or
    /// generate a random one for this process
    pub fn from_config(config: &CsrfConfig, sessions: Arc<SessionStore>) -> Result<Self> {
        match std::env::var(&config.secret_env) {
            Ok(secret) => {
                info!("Using CSRF secret from {}", config.secret_env);
                Self::new(secret.into_bytes(), sessions)
            }
            Err(_) => {
                warn!(
                    "{} not set, generating an ephemeral CSRF secret",
                    config.secret_env
                );
                Self::new(random_secret(), sessions)
            }
        }
    }

    fn mac(&self, session_id: &str, nonce: &[u8]) -> AuthResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AuthError::internal(format!("CSRF key rejected: {e}")))?;
        mac.update(b"csrf:");
        mac.update(session_id.as_bytes());
        mac.update(b":");
        mac.update(nonce);
        Ok(mac)
    }

    /// Issue a token bound to `session_id`; the session must be valid
    pub fn generate_csrf_token(&self, session_id: &str) -> AuthResult<String> {
        if !self.sessions.is_session_valid(session_id) {
            return Err(AuthError::invalid_input("Invalid or expired session"));
        }

        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let tag = self.mac(session_id, &nonce)?.finalize().into_bytes();

        let mut raw = Vec::with_capacity(NONCE_LEN + TAG_LEN);
        raw.extend_from_slice(&nonce);
        raw.extend_from_slice(&tag);
        Ok(URL_SAFE_NO_PAD.encode(raw))
    }

    /// Whether `token` was issued for `session_id` and the session is valid
    pub fn validate_csrf_token(&self, session_id: &str, token: &str) -> bool {
        if !self.sessions.is_session_valid(session_id) {
            return false;
        }

        let raw = match URL_SAFE_NO_PAD.decode(token.trim()) {
            Ok(raw) if raw.len() == NONCE_LEN + TAG_LEN => raw,
            _ => {
                debug!("Malformed CSRF token");
                return false;
            }
        };

        let (nonce, tag) = raw.split_at(NONCE_LEN);
        match self.mac(session_id, nonce) {
            Ok(mac) => mac.verify_slice(tag).is_ok(),
            Err(_) => false,
        }
    }
}

fn random_secret() -> Vec<u8> {
    let mut secret = vec![0u8; MIN_SECRET_LEN];
    rand::thread_rng().fill_bytes(&mut secret);
    secret
}
