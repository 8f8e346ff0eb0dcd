//! Rate Limiting Implementation
//!
//! Fixed-window attempt counters keyed by an opaque string, used to slow
//! down credential stuffing against the auth endpoints.

use crate::clock::Clock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Rate limiting configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub max_attempts: u32,
    #[serde(with = "humantime_serde")]
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 5,
            window: Duration::from_secs(15 * 60),
        }
    }
}

/// Outcome of a single rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining_attempts: u32,
}

/// Attempt counter for one key
#[derive(Debug, Clone)]
struct WindowCounter {
    attempt_count: u32,
    window_start: Instant,
}

impl WindowCounter {
    fn new(now: Instant) -> Self {
        Self {
            attempt_count: 0,
            window_start: now,
        }
    }

    fn window_elapsed(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.window_start) > window
    }
}

#[derive(Debug, Default)]
struct InternalRateLimiterStats {
    total_checked: u64,
    total_blocked: u64,
}

/// Build the composite `type_clientIP_identifier` key
pub fn rate_limit_key(kind: &str, client_ip: &str, identifier: &str) -> String {
    format!("{kind}_{client_ip}_{identifier}")
}

/// Fixed-window limiter for authentication attempts
pub struct AuthRateLimiter {
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
    counters: Mutex<HashMap<String, WindowCounter>>,
    stats: Mutex<InternalRateLimiterStats>,
}

impl AuthRateLimiter {
    /// Create a new rate limiter
    pub fn new(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            counters: Mutex::new(HashMap::new()),
            stats: Mutex::new(InternalRateLimiterStats::default()),
        }
    }

    fn counters(&self) -> MutexGuard<'_, HashMap<String, WindowCounter>> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stats_guard(&self) -> MutexGuard<'_, InternalRateLimiterStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    /// Record one attempt against `key` and decide whether it may proceed
    pub fn check_auth_rate_limit(&self, key: &str) -> RateLimitDecision {
        let max = self.config.max_attempts;
        if !self.config.enabled {
            return RateLimitDecision {
                allowed: true,
                remaining_attempts: max,
            };
        }

        let decision = {
            let mut counters = self.counters();
            let now = self.clock.now();

            let counter = counters
                .entry(key.to_string())
                .or_insert_with(|| WindowCounter::new(now));
            if counter.window_elapsed(now, self.config.window) {
                *counter = WindowCounter::new(now);
            }
            counter.attempt_count = counter.attempt_count.saturating_add(1);

            if counter.attempt_count > max {
                RateLimitDecision {
                    allowed: false,
                    remaining_attempts: 0,
                }
            } else {
                RateLimitDecision {
                    allowed: true,
                    remaining_attempts: max - counter.attempt_count,
                }
            }
        };

        let mut stats = self.stats_guard();
        stats.total_checked += 1;
        if decision.allowed {
            debug!(key = %key, remaining = decision.remaining_attempts, "Auth attempt allowed");
        } else {
            stats.total_blocked += 1;
            warn!(key = %key, "Authentication rate limit exceeded");
        }

        decision
    }

    /// Forget the counter for `key`, e.g. after a successful login
    pub fn reset(&self, key: &str) -> bool {
        self.counters().remove(key).is_some()
    }

    /// Drop counters whose window has elapsed and return how many went
    pub fn cleanup_old_entries(&self) -> usize {
        let now = self.clock.now();
        let window = self.config.window;

        let mut counters = self.counters();
        let initial_count = counters.len();
        counters.retain(|_, counter| !counter.window_elapsed(now, window));

        let removed_count = initial_count - counters.len();
        if removed_count > 0 {
            debug!("Cleaned up {} old rate limit entries", removed_count);
        }
        removed_count
    }

    /// Get rate limiter statistics
    pub fn stats(&self) -> RateLimiterStats {
        let tracked_keys = self.counters().len();
        let stats = self.stats_guard();
        RateLimiterStats {
            total_checked: stats.total_checked,
            total_blocked: stats.total_blocked,
            tracked_keys,
        }
    }
}

/// Rate limiter statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiterStats {
    pub total_checked: u64,
    pub total_blocked: u64,
    pub tracked_keys: usize,
}
