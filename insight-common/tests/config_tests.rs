//! Integration tests for configuration loading and graceful degradation
//!
//! Tests that manipulate INSIGHT_* environment variables are marked with
//! #[serial] so they run sequentially, not in parallel.

use insight_common::config::{
    resolve_config_path, EngineConfig, API_TOKEN_ENV_VAR, BACKEND_URL_ENV_VAR, CONFIG_ENV_VAR,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

fn clear_env() {
    env::remove_var(CONFIG_ENV_VAR);
    env::remove_var(BACKEND_URL_ENV_VAR);
    env::remove_var(API_TOKEN_ENV_VAR);
}

#[test]
#[serial]
fn test_missing_file_falls_back_to_defaults() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("does-not-exist.toml");

    let config = EngineConfig::load(Some(&path)).unwrap();
    assert_eq!(config, EngineConfig::default());
}

#[test]
#[serial]
fn test_file_values_are_loaded() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("modeling.toml");
    std::fs::write(
        &path,
        r#"
[backend]
base_url = "https://stats.example.org/api"
timeout_secs = 30

[collinearity]
debounce_ms = 500

[logging]
level = "debug"
"#,
    )
    .unwrap();

    let config = EngineConfig::load(Some(&path)).unwrap();
    assert_eq!(config.backend.base_url, "https://stats.example.org/api");
    assert_eq!(config.backend.timeout_secs, 30);
    assert_eq!(config.collinearity.debounce_ms, 500);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.notices.error_duration_ms, 10_000);
}

#[test]
#[serial]
fn test_malformed_file_is_config_error() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    std::fs::write(&path, "[backend\nbase_url = ").unwrap();

    let err = EngineConfig::load(Some(&path)).unwrap_err();
    assert!(matches!(err, insight_common::Error::Config(_)));
}

#[test]
#[serial]
fn test_env_overrides_file() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("modeling.toml");
    std::fs::write(&path, "[backend]\nbase_url = \"http://file/api\"\n").unwrap();

    env::set_var(BACKEND_URL_ENV_VAR, "http://env/api");
    env::set_var(API_TOKEN_ENV_VAR, "secret-token");

    let config = EngineConfig::load(Some(&path)).unwrap();
    assert_eq!(config.backend.base_url, "http://env/api");
    assert_eq!(config.backend.token.as_deref(), Some("secret-token"));

    clear_env();
}

#[test]
#[serial]
fn test_env_config_path_used_without_cli_arg() {
    clear_env();
    env::set_var(CONFIG_ENV_VAR, "/tmp/insight-from-env.toml");

    assert_eq!(
        resolve_config_path(None),
        Some(PathBuf::from("/tmp/insight-from-env.toml"))
    );

    clear_env();
}
