//! Configuration Manager

use super::Config;
use crate::Result;
use anyhow::{bail, Context};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Environment variable prefix for every override
pub const ENV_PREFIX: &str = "ANIMEHUB_";

/// Manages configuration loading and validation
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if path.exists() {
            tracing::info!("Loading configuration from: {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;

            let config = Self::parse(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

            config
                .validate()
                .with_context(|| "Configuration validation failed")?;

            tracing::info!("Configuration loaded and validated successfully");
            Ok(config)
        } else {
            tracing::warn!(
                "Configuration file not found at {}, using defaults",
                path.display()
            );
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// File (or defaults when absent), then `ANIMEHUB_*` overrides on top
    pub fn load_layered<F>(path: &Path, lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::load_from_file(path)?;
        config.apply_env_overrides(lookup)?;
        config
            .validate()
            .with_context(|| "Configuration validation failed after environment overrides")?;
        Ok(config)
    }

    /// Parse a TOML document into a configuration
    pub fn parse(content: &str) -> Result<Config> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}

impl Config {
    /// Apply `ANIMEHUB_*` overrides using `lookup` to resolve variables
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(bind_addr) = var("BIND_ADDR") {
            self.server.bind_addr = bind_addr
                .parse::<SocketAddr>()
                .with_context(|| format!("Invalid {ENV_PREFIX}BIND_ADDR: {}", bind_addr))?;
        }

        if let Some(max_body) = var("MAX_BODY_BYTES") {
            self.server.max_body_bytes = max_body
                .parse::<usize>()
                .with_context(|| format!("Invalid {ENV_PREFIX}MAX_BODY_BYTES: {}", max_body))?;
        }

        if let Some(trust) = var("TRUST_PROXY_HEADERS") {
            self.server.trust_proxy_headers = trust
                .parse::<bool>()
                .with_context(|| format!("Invalid {ENV_PREFIX}TRUST_PROXY_HEADERS: {}", trust))?;
        }

        if let Some(idle) = var("SESSION_IDLE_TIMEOUT") {
            self.session.idle_timeout = parse_duration("SESSION_IDLE_TIMEOUT", &idle)?;
        }

        if let Some(lifetime) = var("SESSION_MAX_LIFETIME") {
            self.session.absolute_lifetime = parse_duration("SESSION_MAX_LIFETIME", &lifetime)?;
        }

        if let Some(max_attempts) = var("RATE_LIMIT_MAX_ATTEMPTS") {
            self.rate_limit.max_attempts = max_attempts.parse::<u32>().with_context(|| {
                format!("Invalid {ENV_PREFIX}RATE_LIMIT_MAX_ATTEMPTS: {}", max_attempts)
            })?;
        }

        if let Some(window) = var("RATE_LIMIT_WINDOW") {
            self.rate_limit.window = parse_duration("RATE_LIMIT_WINDOW", &window)?;
        }

        if let Some(log_level) = var("LOG_LEVEL") {
            self.logging.level = log_level;
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.validate_server_config()
            .with_context(|| "Server configuration validation failed")?;

        self.validate_session_config()
            .with_context(|| "Session configuration validation failed")?;

        self.validate_rate_limit_config()
            .with_context(|| "Rate limit configuration validation failed")?;

        self.validate_password_config()
            .with_context(|| "Password policy validation failed")?;

        self.validate_logging_config()
            .with_context(|| "Logging configuration validation failed")?;

        Ok(())
    }

    fn validate_server_config(&self) -> Result<()> {
        if self.server.max_body_bytes == 0 {
            bail!("max_body_bytes must be greater than 0");
        }

        if self.server.max_body_bytes > 1_048_576 {
            bail!("max_body_bytes cannot exceed 1MB");
        }

        Ok(())
    }

    fn validate_session_config(&self) -> Result<()> {
        if self.session.idle_timeout.is_zero() {
            bail!("idle_timeout must be greater than 0");
        }

        if self.session.absolute_lifetime < self.session.idle_timeout {
            bail!("absolute_lifetime must be at least as long as idle_timeout");
        }

        if self.session.sweep_enabled && self.session.sweep_interval < Duration::from_secs(1) {
            bail!("sweep_interval must be at least 1s");
        }

        Ok(())
    }

    fn validate_rate_limit_config(&self) -> Result<()> {
        if self.rate_limit.max_attempts == 0 {
            bail!("max_attempts must be greater than 0");
        }

        if self.rate_limit.window.is_zero() {
            bail!("window must be greater than 0");
        }

        Ok(())
    }

    fn validate_password_config(&self) -> Result<()> {
        let policy = &self.password;
        if policy.min_length == 0 {
            bail!("min_length must be greater than 0");
        }

        if policy.strong_length < policy.min_length {
            bail!("strong_length cannot be shorter than min_length");
        }

        if policy.max_length < policy.strong_length {
            bail!("max_length cannot be shorter than strong_length");
        }

        Ok(())
    }

    fn validate_logging_config(&self) -> Result<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            bail!(
                "logging.level must be one of: {}",
                valid_log_levels.join(", ")
            );
        }

        Ok(())
    }

    /// Merge with CLI arguments
    pub fn merge_with_cli_args(&mut self, bind: Option<&str>, port: Option<u16>, json_logs: bool) {
        if let Some(bind_str) = bind {
            if let Ok(addr) = bind_str.parse::<SocketAddr>() {
                self.server.bind_addr = addr;
                tracing::info!("CLI override: bind address set to {}", addr);
            } else {
                tracing::warn!("Invalid bind address provided: {}", bind_str);
            }
        }

        if let Some(port) = port {
            self.server.bind_addr.set_port(port);
            tracing::info!("CLI override: port set to {}", port);
        }

        if json_logs {
            self.logging.json = true;
        }
    }
}

fn parse_duration(name: &str, value: &str) -> Result<Duration> {
    humantime::parse_duration(value)
        .with_context(|| format!("Invalid {ENV_PREFIX}{name}: {}", value))
}
