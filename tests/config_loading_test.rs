//! Configuration Loading Integration Tests

use animehub_auth::config::ConfigManager;
use anyhow::Result;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_load_partial_config_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
[server]
bind_addr = "0.0.0.0:4000"

[session]
idle_timeout = "10m"
absolute_lifetime = "12h"

[rate_limit]
max_attempts = 3
window = "5m"

[password]
min_length = 10
"#,
    )?;

    let config = ConfigManager::load_from_file(&config_path)?;

    assert_eq!(config.server.bind_addr.port(), 4000);
    assert_eq!(config.server.max_body_bytes, 1024);
    assert_eq!(config.session.idle_timeout, Duration::from_secs(600));
    assert_eq!(config.session.absolute_lifetime, Duration::from_secs(12 * 3600));
    assert_eq!(config.rate_limit.max_attempts, 3);
    assert_eq!(config.rate_limit.window, Duration::from_secs(300));
    assert_eq!(config.password.min_length, 10);
    assert_eq!(config.password.max_length, 128);
    Ok(())
}

#[test]
fn test_missing_file_falls_back_to_defaults() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = ConfigManager::load_from_file(&temp_dir.path().join("absent.toml"))?;

    assert_eq!(config.server.bind_addr.to_string(), "127.0.0.1:3001");
    assert_eq!(config.session.idle_timeout, Duration::from_secs(30 * 60));
    assert_eq!(config.rate_limit.max_attempts, 5);
    Ok(())
}

#[test]
fn test_invalid_file_is_rejected() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("config.toml");

    fs::write(&config_path, "[session]\nidle_timeout = \"2h\"\nabsolute_lifetime = \"1h\"\n")?;
    assert!(ConfigManager::load_from_file(&config_path).is_err());

    fs::write(&config_path, "[server\nbind_addr = ")?;
    assert!(ConfigManager::load_from_file(&config_path).is_err());
    Ok(())
}

#[test]
fn test_environment_overrides_file_values() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        "[server]\nbind_addr = \"0.0.0.0:4000\"\n\n[rate_limit]\nmax_attempts = 3\n",
    )?;

    let env = |key: &str| match key {
        "ANIMEHUB_RATE_LIMIT_MAX_ATTEMPTS" => Some("8".to_string()),
        "ANIMEHUB_TRUST_PROXY_HEADERS" => Some("true".to_string()),
        _ => None,
    };
    let config = ConfigManager::load_layered(&config_path, env)?;

    assert_eq!(config.server.bind_addr.port(), 4000);
    assert_eq!(config.rate_limit.max_attempts, 8);
    assert!(config.server.trust_proxy_headers);

    // no file: defaults plus environment
    let config = ConfigManager::load_layered(&temp_dir.path().join("absent.toml"), env)?;
    assert_eq!(config.rate_limit.max_attempts, 8);
    assert_eq!(config.server.bind_addr.port(), 3001);
    Ok(())
}
