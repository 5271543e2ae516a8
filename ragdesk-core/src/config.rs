//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/ragdesk/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/ragdesk/` (~/.config/ragdesk/)
//! - State/Logs: `$XDG_STATE_HOME/ragdesk/` (~/.local/state/ragdesk/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound for every millisecond timing setting (one hour)
pub const MAX_DELAY_MS: u64 = 3_600_000;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Document API connection
    #[serde(default)]
    pub api: ApiConfig,

    /// Typewriter pacing for chat messages
    #[serde(default)]
    pub reveal: RevealConfig,

    /// Background document status polling
    #[serde(default)]
    pub polling: PollingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Document API configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// Base URL of the document API (e.g., `http://localhost:8000/api`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token sent with every request
    pub api_key: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_api_timeout(),
        }
    }
}

impl ApiConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "api.base_url must start with http:// or https:// (got {:?})",
                self.base_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("api.timeout_secs must be > 0".to_string()));
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_api_timeout() -> u64 {
    30
}

/// Typewriter configuration
///
/// Mirrors [`RevealOptions`](crate::reveal::RevealOptions); every field
/// has the same default.
#[derive(Debug, Deserialize, Clone)]
pub struct RevealConfig {
    /// Delay between characters in milliseconds
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    /// Extra pause after sentence-ending punctuation
    #[serde(default = "default_punctuation_pause")]
    pub punctuation_pause_ms: u64,

    /// Texts longer than this many characters are shown at once
    #[serde(default = "default_auto_skip_threshold")]
    pub auto_skip_threshold: usize,

    /// Honor the host's reduced-motion preference
    #[serde(default = "default_true")]
    pub respect_reduced_motion: bool,

    /// The host's reduced-motion preference
    #[serde(default)]
    pub reduced_motion: bool,

    /// Grace period before a stalled reveal shows the full text
    #[serde(default = "default_watchdog")]
    pub watchdog_ms: u64,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay(),
            punctuation_pause_ms: default_punctuation_pause(),
            auto_skip_threshold: default_auto_skip_threshold(),
            respect_reduced_motion: true,
            reduced_motion: false,
            watchdog_ms: default_watchdog(),
        }
    }
}

fn default_base_delay() -> u64 {
    50
}

fn default_punctuation_pause() -> u64 {
    200
}

fn default_auto_skip_threshold() -> usize {
    500
}

fn default_watchdog() -> u64 {
    2000
}

fn default_true() -> bool {
    true
}

/// Document status polling configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PollingConfig {
    /// Milliseconds between status checks for one document
    #[serde(default = "default_poll_interval")]
    pub interval_ms: u64,

    /// Retries for a transient status fetch failure before giving up on the
    /// document. Zero abandons on the first failure.
    #[serde(default)]
    pub status_retries: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval(),
            status_retries: 0,
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

fn default_poll_interval() -> u64 {
    3000
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Check the timing settings. API settings are checked when a client is built.
    pub fn validate(&self) -> Result<()> {
        if self.reveal.base_delay_ms == 0 {
            return Err(Error::Config("reveal.base_delay_ms must be > 0".to_string()));
        }
        if self.reveal.watchdog_ms == 0 {
            return Err(Error::Config("reveal.watchdog_ms must be > 0".to_string()));
        }
        if self.polling.interval_ms == 0 {
            return Err(Error::Config("polling.interval_ms must be > 0".to_string()));
        }
        for (name, value) in [
            ("reveal.base_delay_ms", self.reveal.base_delay_ms),
            ("reveal.punctuation_pause_ms", self.reveal.punctuation_pause_ms),
            ("reveal.watchdog_ms", self.reveal.watchdog_ms),
            ("polling.interval_ms", self.polling.interval_ms),
        ] {
            if value > MAX_DELAY_MS {
                return Err(Error::Config(format!(
                    "{} must be <= {} (got {})",
                    name, MAX_DELAY_MS, value
                )));
            }
        }
        Ok(())
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/ragdesk/config.toml` (~/.config/ragdesk/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("ragdesk").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/ragdesk/` (~/.local/state/ragdesk/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("ragdesk")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/ragdesk/ragdesk.log` (~/.local/state/ragdesk/ragdesk.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("ragdesk.log")
    }
}
