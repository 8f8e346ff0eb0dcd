//! Expiry sweeping
//!
//! Sessions and rate-limit counters expire lazily on access. This task
//! removes entries nobody touches again so memory stays bounded.

use crate::metrics::Metrics;
use crate::security::AuthRateLimiter;
use crate::session::SessionStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Entries removed by one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub sessions: usize,
    pub rate_limit_entries: usize,
}

pub struct SweepTask {
    sessions: Arc<SessionStore>,
    rate_limiter: Arc<AuthRateLimiter>,
    metrics: Arc<Metrics>,
    interval: Duration,
}

impl SweepTask {
    pub fn new(
        sessions: Arc<SessionStore>,
        rate_limiter: Arc<AuthRateLimiter>,
        metrics: Arc<Metrics>,
        interval: Duration,
    ) -> Self {
        Self {
            sessions,
            rate_limiter,
            metrics,
            interval,
        }
    }

    pub fn run_once(&self) -> SweepReport {
        let report = SweepReport {
            sessions: self.sessions.sweep_expired(),
            rate_limit_entries: self.rate_limiter.cleanup_old_entries(),
        };

        self.metrics
            .record_sweep(report.sessions, report.rate_limit_entries);
        self.metrics
            .set_active_sessions(self.sessions.active_session_count());

        if report != SweepReport::default() {
            debug!(
                sessions = report.sessions,
                rate_limit_entries = report.rate_limit_entries,
                "Expiry sweep removed entries"
            );
        }
        report
    }

    /// Sweep on every tick until shutdown is broadcast
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!("Expiry sweep running every {:?}", self.interval);

        let mut ticker = tokio::time::interval(self.interval);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_once();
                }
                _ = shutdown_rx.recv() => {
                    debug!("Expiry sweep stopping");
                    break;
                }
            }
        }
    }
}
