//! Session Types

use std::net::IpAddr;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Client attributes captured when a session is created or touched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub client_ip: Option<IpAddr>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    pub fn new(client_ip: Option<IpAddr>, user_agent: Option<String>) -> Self {
        Self {
            client_ip,
            user_agent,
        }
    }

    /// Client IP rendered for keys and logs, `unknown` when absent
    pub fn ip_label(&self) -> String {
        self.client_ip
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Server-side record of an authenticated user session
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub session_id: String,
    pub user_id: String,
    pub created_at: Instant,
    pub last_activity: Instant,
    pub metadata: RequestContext,
}

impl SessionRecord {
    /// Create a new session with a fresh unpredictable identifier
    pub fn new(user_id: String, metadata: RequestContext, now: Instant) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            user_id,
            created_at: now,
            last_activity: now,
            metadata,
        }
    }

    /// Refresh activity; never moves `last_activity` backwards
    pub fn touch(&mut self, now: Instant, metadata: RequestContext) {
        self.last_activity = self.last_activity.max(now);
        self.metadata = metadata;
    }

    /// Whether either the idle timeout or the absolute lifetime has elapsed
    pub fn is_expired(&self, now: Instant, idle_timeout: Duration, absolute_lifetime: Duration) -> bool {
        now.saturating_duration_since(self.last_activity) > idle_timeout
            || now.saturating_duration_since(self.created_at) > absolute_lifetime
    }
}
