//! Metrics Collector

use crate::security::SecurityEvent;
use crate::Result;
use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use tracing::error;

/// Collects and exports auth metrics
pub struct Metrics {
    prometheus_registry: Registry,

    sessions_created_total: IntCounter,
    sessions_invalidated_total: IntCounter,
    active_sessions: IntGauge,
    session_checks_total: IntCounterVec,
    csrf_checks_total: IntCounterVec,
    rate_limit_checks_total: IntCounter,
    rate_limit_denied_total: IntCounter,
    password_checks_total: IntCounter,
    rejected_requests_total: IntCounterVec,
    swept_entries_total: IntCounterVec,
}

impl Metrics {
    /// Create a new metrics collector with its own registry
    pub fn new() -> Result<Self> {
        let prometheus_registry = Registry::new();

        let sessions_created_total = IntCounter::new(
            "animehub_sessions_created_total",
            "Total number of sessions created",
        )?;
        let sessions_invalidated_total = IntCounter::new(
            "animehub_sessions_invalidated_total",
            "Total number of explicit session invalidations",
        )?;
        let active_sessions = IntGauge::new(
            "animehub_active_sessions",
            "Session records currently held in memory",
        )?;
        let session_checks_total = IntCounterVec::new(
            Opts::new(
                "animehub_session_checks_total",
                "Session validity checks by outcome",
            ),
            &["result"],
        )?;
        let csrf_checks_total = IntCounterVec::new(
            Opts::new("animehub_csrf_checks_total", "CSRF token checks by outcome"),
            &["result"],
        )?;
        let rate_limit_checks_total = IntCounter::new(
            "animehub_rate_limit_checks_total",
            "Total rate limit checks",
        )?;
        let rate_limit_denied_total = IntCounter::new(
            "animehub_rate_limit_denied_total",
            "Rate limit checks that were denied",
        )?;
        let password_checks_total = IntCounter::new(
            "animehub_password_checks_total",
            "Total password validations",
        )?;
        let rejected_requests_total = IntCounterVec::new(
            Opts::new(
                "animehub_rejected_requests_total",
                "Requests rejected by the request guard",
            ),
            &["reason"],
        )?;
        let swept_entries_total = IntCounterVec::new(
            Opts::new(
                "animehub_swept_entries_total",
                "Expired entries reclaimed by the maintenance sweep",
            ),
            &["kind"],
        )?;

        prometheus_registry.register(Box::new(sessions_created_total.clone()))?;
        prometheus_registry.register(Box::new(sessions_invalidated_total.clone()))?;
        prometheus_registry.register(Box::new(active_sessions.clone()))?;
        prometheus_registry.register(Box::new(session_checks_total.clone()))?;
        prometheus_registry.register(Box::new(csrf_checks_total.clone()))?;
        prometheus_registry.register(Box::new(rate_limit_checks_total.clone()))?;
        prometheus_registry.register(Box::new(rate_limit_denied_total.clone()))?;
        prometheus_registry.register(Box::new(password_checks_total.clone()))?;
        prometheus_registry.register(Box::new(rejected_requests_total.clone()))?;
        prometheus_registry.register(Box::new(swept_entries_total.clone()))?;

        Ok(Self {
            prometheus_registry,
            sessions_created_total,
            sessions_invalidated_total,
            active_sessions,
            session_checks_total,
            csrf_checks_total,
            rate_limit_checks_total,
            rate_limit_denied_total,
            password_checks_total,
            rejected_requests_total,
            swept_entries_total,
        })
    }

    pub fn record_session_created(&self) {
        self.sessions_created_total.inc();
    }

    pub fn record_session_invalidated(&self) {
        self.sessions_invalidated_total.inc();
    }

    pub fn set_active_sessions(&self, count: usize) {
        self.active_sessions.set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    pub fn record_session_check(&self, valid: bool) {
        let result = if valid { "valid" } else { "invalid" };
        self.session_checks_total.with_label_values(&[result]).inc();
    }

    pub fn record_csrf_check(&self, valid: bool) {
        let result = if valid { "valid" } else { "invalid" };
        self.csrf_checks_total.with_label_values(&[result]).inc();
    }

    pub fn record_rate_limit_check(&self, allowed: bool) {
        self.rate_limit_checks_total.inc();
        if !allowed {
            self.rate_limit_denied_total.inc();
        }
    }

    pub fn record_password_check(&self) {
        self.password_checks_total.inc();
    }

    /// Count a request the guard turned away
    pub fn record_rejection(&self, event: SecurityEvent) {
        self.rejected_requests_total
            .with_label_values(&[event.as_str()])
            .inc();
    }

    pub fn record_sweep(&self, sessions: usize, counters: usize) {
        self.swept_entries_total
            .with_label_values(&["session"])
            .inc_by(sessions as u64);
        self.swept_entries_total
            .with_label_values(&["rate_limit"])
            .inc_by(counters as u64);
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.prometheus_registry.gather();

        match encoder.encode_to_string(&metric_families) {
            Ok(output) => output,
            Err(e) => {
                error!(error = %e, "Failed to encode Prometheus metrics");
                String::new()
            }
        }
    }
}
