//! Integration tests for Configuration System

use super::test_utils::ENV_MUTEX;
use nodeadmin::config::{ConfigLoader, NodeAdminConfig};
use nodeadmin::ConfigError;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_config_loads_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("nodeadmin.toml");

    std::fs::write(
        &config_file,
        r#"
[agent]
hostname = "container-123.domain.tld"
tick_interval_ms = 250
converge_ms = 50
freeze_timeout_ms = 1500

[logging]
level = "debug"
format = "json"
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&config_file).unwrap();
    assert_eq!(config.agent.hostname, "container-123.domain.tld");
    assert_eq!(config.agent.tick_interval(), Duration::from_millis(250));
    assert_eq!(config.agent.converge_time(), Duration::from_millis(50));
    assert_eq!(config.agent.freeze_timeout(), Duration::from_millis(1500));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, "json");
    assert_eq!(config.logging.output, "stderr");
}

#[test]
fn test_partial_file_keeps_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("nodeadmin.toml");
    std::fs::write(&config_file, "[agent]\nhostname = \"node-7\"\n").unwrap();

    let config = ConfigLoader::load_from_file(&config_file).unwrap();
    let defaults = NodeAdminConfig::default();
    assert_eq!(config.agent.hostname, "node-7");
    assert_eq!(config.agent.tick_interval_ms, defaults.agent.tick_interval_ms);
    assert_eq!(config.logging, defaults.logging);
}

#[test]
fn test_invalid_values_are_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("nodeadmin.toml");
    std::fs::write(&config_file, "[agent]\ntick_interval_ms = 0\n").unwrap();

    let result = ConfigLoader::load_from_file(&config_file);
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_out_of_range_timeout_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("nodeadmin.toml");
    std::fs::write(&config_file, "[agent]\nfreeze_timeout_ms = 86400001\n").unwrap();

    let result = ConfigLoader::load_from_file(&config_file);
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let result = ConfigLoader::load_from_file(&temp_dir.path().join("missing.toml"));
    assert!(matches!(result, Err(ConfigError::Load(_))));
}

#[test]
fn test_rendered_config_loads_back() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("nodeadmin.toml");

    let mut config = NodeAdminConfig::default();
    config.agent.hostname = "node-42".to_string();
    config.agent.freeze_timeout_ms = 750;
    std::fs::write(&config_file, config.to_toml().unwrap()).unwrap();

    assert_eq!(ConfigLoader::load_from_file(&config_file).unwrap(), config);
}

#[cfg(target_os = "linux")]
#[test]
fn test_environment_overrides_files() {
    let _guard = ENV_MUTEX.lock();
    let temp_dir = TempDir::new().unwrap();
    let previous = std::env::var("XDG_CONFIG_HOME").ok();
    std::env::set_var("XDG_CONFIG_HOME", temp_dir.path());
    std::env::set_var("NODEADMIN_AGENT__CONVERGE_MS", "75");

    let global_dir = temp_dir.path().join("nodeadmin");
    std::fs::create_dir_all(&global_dir).unwrap();
    std::fs::write(
        global_dir.join("config.toml"),
        "[agent]\nhostname = \"global-host\"\nconverge_ms = 10\n",
    )
    .unwrap();
    let explicit = temp_dir.path().join("explicit.toml");
    std::fs::write(&explicit, "[agent]\ntick_interval_ms = 300\n").unwrap();

    let result = ConfigLoader::load(Some(&explicit));

    std::env::remove_var("NODEADMIN_AGENT__CONVERGE_MS");
    match previous {
        Some(value) => std::env::set_var("XDG_CONFIG_HOME", value),
        None => std::env::remove_var("XDG_CONFIG_HOME"),
    }

    let config = result.unwrap();
    assert_eq!(config.agent.hostname, "global-host");
    assert_eq!(config.agent.tick_interval_ms, 300);
    assert_eq!(config.agent.converge_ms, 75);
}
