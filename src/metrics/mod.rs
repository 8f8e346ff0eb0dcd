//! Metrics Module
//!
//! Prometheus counters for the auth endpoints, scraped from `GET /metrics`.

pub mod collector;

pub use collector::Metrics;
