//! AnimeHub auth security service

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use animehub_auth::{
    config::{Config, ConfigManager},
    maintenance::SweepTask,
    shutdown::ShutdownAwareTask,
    AppState, AuthServer, ShutdownCoordinator, SystemClock,
};

/// CLI arguments for the auth service
#[derive(Parser, Debug)]
#[command(name = "animehub-auth")]
#[command(about = "AnimeHub auth security service")]
#[command(version)]
#[command(long_about = "
AnimeHub auth security service

Sessions, CSRF tokens, login rate limiting and password policy checks
exposed as a small JSON API under /api/auth.

Configuration priority (highest to lowest):
1. Command-line arguments
2. Environment variables
3. Configuration file
4. Built-in defaults

Environment variables:
  ANIMEHUB_BIND_ADDR                - Bind address (e.g., 127.0.0.1:3001)
  ANIMEHUB_MAX_BODY_BYTES           - Request body cap in bytes
  ANIMEHUB_TRUST_PROXY_HEADERS      - Trust X-Forwarded-For / X-Real-IP (true/false)
  ANIMEHUB_SESSION_IDLE_TIMEOUT     - Idle timeout (e.g., 30m)
  ANIMEHUB_SESSION_MAX_LIFETIME     - Absolute session lifetime (e.g., 24h)
  ANIMEHUB_RATE_LIMIT_MAX_ATTEMPTS  - Attempts allowed per window
  ANIMEHUB_RATE_LIMIT_WINDOW        - Rate limit window (e.g., 15m)
  ANIMEHUB_LOG_LEVEL                - Log level (trace, debug, info, warn, error)
  ANIMEHUB_CSRF_SECRET              - CSRF signing secret, at least 32 bytes
")]
pub struct CliArgs {
    #[arg(short, long, default_value = "config.toml", help = "Path to configuration file")]
    pub config: PathBuf,

    #[arg(short, long, help = "Bind address (e.g., 127.0.0.1:3001)")]
    pub bind: Option<String>,

    #[arg(short, long, help = "Port to bind to")]
    pub port: Option<u16>,

    /// Overrides the configured level
    #[arg(long, help = "Log level")]
    pub log_level: Option<String>,

    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[arg(long, help = "Validate configuration and exit")]
    pub validate_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // CLI args > environment > config file > defaults
    let mut config = ConfigManager::load_layered(&args.config, |key| std::env::var(key).ok())?;
    config.merge_with_cli_args(args.bind.as_deref(), args.port, args.json_logs);
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }

    config
        .validate()
        .context("Final configuration validation failed")?;

    init_tracing(&args, &config)?;

    if args.validate_config {
        info!("Configuration is valid");
        log_summary(&config);
        return Ok(());
    }

    info!("Starting animehub-auth v{}", env!("CARGO_PKG_VERSION"));
    log_summary(&config);

    let shutdown = ShutdownCoordinator::new(config.server.shutdown_timeout);
    let state = AppState::from_config(&config, Arc::new(SystemClock))?;

    let sweeper = if config.session.sweep_enabled {
        let task = SweepTask::new(
            state.sessions.clone(),
            state.rate_limiter.clone(),
            state.metrics.clone(),
            config.session.sweep_interval,
        );
        Some(ShutdownAwareTask::spawn(&shutdown, "expiry-sweep", |rx| task.run(rx)))
    } else {
        info!("Expiry sweep disabled");
        None
    };

    let server = AuthServer::new(config.server.bind_addr, state);
    let mut server_handle = tokio::spawn(server.start(shutdown.wait()));

    info!("Press Ctrl+C or send SIGTERM to shut down gracefully");

    tokio::select! {
        result = shutdown.listen_for_signals() => {
            if let Err(e) = result {
                error!("Error setting up signal handlers: {}", e);
                shutdown.trigger();
            }
        }
        result = &mut server_handle => {
            // the server exited on its own, usually a bind failure
            shutdown.trigger();
            return match result {
                Ok(inner) => inner,
                Err(e) => Err(e.into()),
            };
        }
    }

    info!("Initiating graceful shutdown...");

    match tokio::time::timeout(shutdown.timeout(), &mut server_handle).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => error!("Server error during shutdown: {}", e),
        Ok(Err(e)) => error!("Server task failed: {}", e),
        Err(_) => {
            error!("Server did not drain within {:?}", shutdown.timeout());
            server_handle.abort();
        }
    }

    if let Some(task) = sweeper {
        task.join(shutdown.timeout()).await?;
    }

    info!("Server shutdown complete");
    Ok(())
}

fn log_summary(config: &Config) {
    info!("  Bind address: {}", config.server.bind_addr);
    info!("  Max body size: {} bytes", config.server.max_body_bytes);
    info!(
        "  Session timeouts: idle {:?}, lifetime {:?}",
        config.session.idle_timeout, config.session.absolute_lifetime
    );
    info!(
        "  Rate limit: {} ({} attempts per {:?})",
        if config.rate_limit.enabled { "enabled" } else { "disabled" },
        config.rate_limit.max_attempts,
        config.rate_limit.window
    );
}

/// Initialize tracing/logging
fn init_tracing(args: &CliArgs, config: &Config) -> Result<()> {
    let log_level = if args.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.logging.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()
            .context("Failed to initialize tracing")?;
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_level(true)
                    .with_ansi(true),
            )
            .try_init()
            .context("Failed to initialize tracing")?;
    }

    Ok(())
}
