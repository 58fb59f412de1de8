//! Configuration resolution for ocrelay.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/ocrelay/settings.json), or instead an
//!    explicit config file (`--config`)
//! 3. Environment variables
//! 4. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::chunk::DEFAULT_MAX_MESSAGE_LEN;
use crate::error::{Error, Result};

/// Base URL of a backend started with default settings.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:4096";
/// Host the backend binds to when the base URL names none.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Port the backend listens on when the base URL names none.
pub const DEFAULT_PORT: u16 = 4096;
/// Basic-auth username used when only a password is configured.
pub const DEFAULT_USERNAME: &str = "opencode";

/// Complete ocrelay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            supervisor: SupervisorConfig::default(),
            relay: RelayConfig::default(),
            log_level: default_log_level(),
        }
    }
}

/// How to reach the backend's HTTP surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub username: String,
    /// Basic-auth password. `None` disables authentication entirely.
    pub password: Option<String>,
    pub health_path: String,
    pub health_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub message_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            username: DEFAULT_USERNAME.to_string(),
            password: None,
            health_path: "/health".to_string(),
            health_timeout_secs: 3,
            request_timeout_secs: 10,
            message_timeout_secs: 300,
        }
    }
}

/// How to launch and wait for the backend process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Program and leading arguments; `--port` and `--hostname` are appended.
    pub command: Vec<String>,
    pub default_port: u16,
    /// Where the backend's stdout/stderr go. Discarded when unset.
    pub log_path: Option<PathBuf>,
    pub poll_attempts: u32,
    pub poll_interval_ms: u64,
    pub probe_timeout_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            command: vec!["opencode".to_string(), "serve".to_string()],
            default_port: DEFAULT_PORT,
            log_path: None,
            poll_attempts: 10,
            poll_interval_ms: 1000,
            probe_timeout_ms: 1000,
        }
    }
}

/// Relay settings shared by all front-ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Chunk size front-ends use when splitting replies.
    pub max_message_len: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
        }
    }
}

/// Load configuration with hierarchical resolution.
///
/// `explicit` is a config file named on the command line. It replaces the
/// global file, which is then not read at all, and unlike the global file it
/// must exist.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    load_config_from(global_config_path().as_deref(), explicit, |key| {
        std::env::var(key).ok()
    })
}

fn load_config_from(
    global: Option<&Path>,
    explicit: Option<&Path>,
    var: impl Fn(&str) -> Option<String>,
) -> Result<Config> {
    let mut config = match (explicit, global) {
        (Some(path), _) => {
            debug!(path = %path.display(), "Loading config file");
            load_config_file(path)?
        }
        (None, Some(path)) if path.exists() => {
            debug!(path = %path.display(), "Loading global config");
            load_config_file(path)?
        }
        (None, _) => Config::default(),
    };

    apply_overrides(&mut config, var);

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .ok()
            .map(|h| PathBuf::from(h).join(".ocrelay").join("settings.json"))
    }
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join("Library/Application Support/ocrelay/settings.json"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
            .map(|p| p.join("ocrelay").join("settings.json"))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

/// Parse a single settings file.
pub fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    let mut config: Config = serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })?;
    // An empty password in a file means "no auth", same as the env var.
    if config.backend.password.as_deref().is_some_and(str::is_empty) {
        config.backend.password = None;
    }
    Ok(config)
}

fn apply_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(val) = var("OPENCODE_BASE_URL") {
        if !val.is_empty() {
            config.backend.base_url = val;
        }
    }
    if let Some(val) = var("OPENCODE_SERVER_USERNAME") {
        if !val.is_empty() {
            config.backend.username = val;
        }
    }
    if let Some(val) = var("OPENCODE_SERVER_PASSWORD") {
        config.backend.password = if val.is_empty() { None } else { Some(val) };
    }
    if let Some(val) = var("OCRELAY_LOG_LEVEL") {
        config.log_level = val;
    }
    if let Some(val) = var("OCRELAY_MAX_MESSAGE_LEN") {
        if let Ok(n) = val.parse() {
            config.relay.max_message_len = n;
        }
    }
}
