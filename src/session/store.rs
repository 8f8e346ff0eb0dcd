//! Session Store

use super::{RequestContext, SessionRecord};
use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::error::{AuthError, AuthResult};
use crate::security::audit::redact_session_id;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// Session map plus the per-user index, always mutated together
#[derive(Debug, Default)]
struct SessionTracker {
    sessions: HashMap<String, SessionRecord>,
    user_sessions: HashMap<String, Vec<String>>, // user_id -> session_ids
}

impl SessionTracker {
    fn insert(&mut self, session: SessionRecord) {
        self.user_sessions
            .entry(session.user_id.clone())
            .or_default()
            .push(session.session_id.clone());
        self.sessions.insert(session.session_id.clone(), session);
    }

    fn remove(&mut self, session_id: &str) -> Option<SessionRecord> {
        let session = self.sessions.remove(session_id)?;
        if let Some(ids) = self.user_sessions.get_mut(&session.user_id) {
            ids.retain(|id| id != session_id);
            if ids.is_empty() {
                self.user_sessions.remove(&session.user_id);
            }
        }
        Some(session)
    }
}

/// In-memory, process-local session store.
///
/// Expiry is evaluated lazily on lookup; [`SessionStore::sweep_expired`]
/// reclaims records nobody looks up again. Nothing survives a restart.
pub struct SessionStore {
    config: SessionConfig,
    clock: Arc<dyn Clock>,
    tracker: Mutex<SessionTracker>,
}

impl SessionStore {
    /// Create an empty store
    pub fn new(config: SessionConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            tracker: Mutex::new(SessionTracker::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionTracker> {
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_expired(&self, session: &SessionRecord) -> bool {
        session.is_expired(
            self.clock.now(),
            self.config.idle_timeout,
            self.config.absolute_lifetime,
        )
    }

    /// Create a session for `user_id` and return its identifier
    pub fn create_session(&self, user_id: &str, ctx: &RequestContext) -> AuthResult<String> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(AuthError::invalid_input("userId is required"));
        }

        let mut tracker = self.lock();
        let session = SessionRecord::new(user_id.to_string(), ctx.clone(), self.clock.now());
        let session_id = session.session_id.clone();
        tracker.insert(session);

        info!(
            session = %redact_session_id(&session_id),
            user_id = %user_id,
            client_ip = %ctx.ip_label(),
            "Session created"
        );
        Ok(session_id)
    }

    /// Whether the session exists and has not expired. Never mutates.
    pub fn is_session_valid(&self, session_id: &str) -> bool {
        let tracker = self.lock();
        tracker
            .sessions
            .get(session_id)
            .is_some_and(|session| !self.is_expired(session))
    }

    /// Refresh `last_activity` for a valid session.
    ///
    /// Returns false, without creating anything, for unknown or expired
    /// sessions. Expired records found here are dropped.
    pub fn update_session_activity(&self, session_id: &str, ctx: &RequestContext) -> bool {
        let mut tracker = self.lock();
        let now = self.clock.now();

        let expired = match tracker.sessions.get_mut(session_id) {
            None => return false,
            Some(session) => {
                if session.is_expired(now, self.config.idle_timeout, self.config.absolute_lifetime)
                {
                    true
                } else {
                    session.touch(now, ctx.clone());
                    false
                }
            }
        };

        if expired {
            tracker.remove(session_id);
            debug!(session = %redact_session_id(session_id), "Dropped expired session on update");
            return false;
        }

        true
    }

    /// Remove a session. Unknown IDs are ignored.
    pub fn invalidate_session(&self, session_id: &str) {
        if self.lock().remove(session_id).is_some() {
            info!(session = %redact_session_id(session_id), "Session invalidated");
        }
    }

    /// Snapshot of a valid session
    pub fn get_session(&self, session_id: &str) -> Option<SessionRecord> {
        let tracker = self.lock();
        tracker
            .sessions
            .get(session_id)
            .filter(|session| !self.is_expired(session))
            .cloned()
    }

    /// Remove every session belonging to `user_id`, returning how many went
    pub fn invalidate_user_sessions(&self, user_id: &str) -> usize {
        let mut tracker = self.lock();
        let ids = tracker.user_sessions.remove(user_id).unwrap_or_default();
        let removed = ids
            .iter()
            .filter(|id| tracker.sessions.remove(id.as_str()).is_some())
            .count();

        if removed > 0 {
            info!(user_id = %user_id, removed, "Invalidated all sessions for user");
        }
        removed
    }

    /// Number of sessions that have not expired
    pub fn active_session_count(&self) -> usize {
        let tracker = self.lock();
        tracker
            .sessions
            .values()
            .filter(|session| !self.is_expired(session))
            .count()
    }

    /// Number of stored records, including expired ones not yet swept
    pub fn stored_session_count(&self) -> usize {
        self.lock().sessions.len()
    }

    /// Drop every expired record and return how many were removed
    pub fn sweep_expired(&self) -> usize {
        let mut tracker = self.lock();
        let now = self.clock.now();

        let expired: Vec<String> = tracker
            .sessions
            .values()
            .filter(|s| s.is_expired(now, self.config.idle_timeout, self.config.absolute_lifetime))
            .map(|s| s.session_id.clone())
            .collect();

        for session_id in &expired {
            tracker.remove(session_id);
        }

        if !expired.is_empty() {
            debug!("Cleaned up {} expired sessions", expired.len());
        }
        expired.len()
    }
}
