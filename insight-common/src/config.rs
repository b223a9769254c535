//! Configuration loading and config file resolution
//!
//! Settings sources, highest priority first:
//! 1. Command-line argument (config file path)
//! 2. Environment variables (`INSIGHT_CONFIG`, `INSIGHT_BACKEND_URL`, `INSIGHT_API_TOKEN`)
//! 3. TOML config file
//! 4. Built-in defaults (code constants)
//!
//! A missing config file is never fatal: the loader warns and continues with
//! defaults. A file that exists but does not parse is a configuration error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "INSIGHT_CONFIG";
/// Environment variable overriding `[backend] base_url`
pub const BACKEND_URL_ENV_VAR: &str = "INSIGHT_BACKEND_URL";
/// Environment variable overriding `[backend] token`
pub const API_TOKEN_ENV_VAR: &str = "INSIGHT_API_TOKEN";

/// Complete engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub collinearity: CollinearityConfig,

    #[serde(default)]
    pub notices: NoticeConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote modeling service connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendConfig {
    /// Base URL every operation path is appended to
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout. Model fits and AI calls can be slow.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Bearer token for the session (optional)
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            token: None,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Background collinearity screening settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollinearityConfig {
    /// Quiet period after the last feature edit before a check fires
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// VIF above which a feature is flagged
    #[serde(default = "default_vif_threshold")]
    pub vif_threshold: f64,
}

impl Default for CollinearityConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            vif_threshold: default_vif_threshold(),
        }
    }
}

impl CollinearityConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// User-visible notice settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoticeConfig {
    /// Display time for analytical-failure notices
    #[serde(default = "default_error_duration_ms")]
    pub error_duration_ms: u64,

    /// Display time for informational notices (e.g. suggestion reasons)
    #[serde(default = "default_info_duration_ms")]
    pub info_duration_ms: u64,

    /// Broadcast channel capacity
    #[serde(default = "default_notice_capacity")]
    pub capacity: usize,
}

impl Default for NoticeConfig {
    fn default() -> Self {
        Self {
            error_duration_ms: default_error_duration_ms(),
            info_duration_ms: default_info_duration_ms(),
            capacity: default_notice_capacity(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000/api".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_debounce_ms() -> u64 {
    1000
}

fn default_vif_threshold() -> f64 {
    5.0
}

fn default_error_duration_ms() -> u64 {
    10_000
}

fn default_info_duration_ms() -> u64 {
    5_000
}

fn default_notice_capacity() -> usize {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

impl EngineConfig {
    /// Resolve the config file, load it, and apply environment overrides.
    pub fn load(cli_arg: Option<&Path>) -> Result<Self> {
        let mut config = match resolve_config_path(cli_arg) {
            Some(path) => Self::from_file(&path)?,
            None => {
                info!("No config file found, using built-in defaults");
                Self::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from a specific TOML file.
    ///
    /// A missing file yields defaults with a warning.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(Error::Io(e)),
        };

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
        info!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Environment variables win over file values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(BACKEND_URL_ENV_VAR) {
            if !url.trim().is_empty() {
                self.backend.base_url = url;
            }
        }
        if let Ok(token) = std::env::var(API_TOKEN_ENV_VAR) {
            if !token.trim().is_empty() {
                self.backend.token = Some(token);
            }
        }
    }
}

/// Config file resolution:
/// 1. Command-line argument
/// 2. `INSIGHT_CONFIG` environment variable
/// 3. Platform config dir (`<config_dir>/insight/modeling.toml`) if it exists
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path().filter(|path| path.exists())
}

/// Platform config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("insight").join("modeling.toml"))
}
