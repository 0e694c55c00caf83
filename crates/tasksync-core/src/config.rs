use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable pointing at an alternative config file
pub const CONFIG_ENV: &str = "TASKSYNC_CONFIG";

/// Configuration for tasksync
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub auth: AuthState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the local task database
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Remote store base URL (if None, runs in local-only mode)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Bearer token sent with every remote call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    /// Per-call timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Interval between periodic sync passes in seconds
    #[serde(default = "default_sync_interval")]
    pub interval_seconds: u64,

    /// Interval between reachability probes in seconds
    #[serde(default = "default_probe_interval")]
    pub probe_interval_seconds: u64,
}

/// Who is signed in on this machine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tasksync")
        .join("tasks.db")
}

fn default_timeout() -> u64 {
    10
}

fn default_sync_interval() -> u64 {
    30 // 30 seconds
}

fn default_probe_interval() -> u64 {
    15
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: None,
            auth_token: None,
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            interval_seconds: default_sync_interval(),
            probe_interval_seconds: default_probe_interval(),
        }
    }
}

/// Location of the config file: `$TASKSYNC_CONFIG`, else the platform config dir
pub fn config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }
    Ok(dirs::config_dir()
        .context("Cannot determine config directory")?
        .join("tasksync")
        .join("config.toml"))
}

/// Expand a leading `~/` to the home directory
pub fn expand_tilde(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => Ok(dirs::home_dir()
            .context("Cannot determine home directory")?
            .join(rest)),
        None => Ok(PathBuf::from(path)),
    }
}

impl Config {
    /// Load from the default location, writing a default file on first use
    pub fn load() -> Result<Self> {
        Self::load_or_init(&config_path()?)
    }

    /// Load from `path`, creating it with defaults if it does not exist
    pub fn load_or_init(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load_from(path);
        }
        let config = Self::default();
        config
            .save_to(path)
            .context("Failed to save default config")?;
        tracing::info!("Created default config at {}", path.display());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Whether a remote store is configured at all
    pub fn has_remote(&self) -> bool {
        self.remote
            .url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }
}
