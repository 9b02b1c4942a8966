//! Application configuration management.
//!
//! This module handles loading and saving the client configuration: the
//! backend base URL, the login timeout, the alert lifetime, and the last
//! email used to log in.
//!
//! Configuration is stored at `~/.config/shopsphere/config.json`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/data directory paths
const APP_NAME: &str = "shopsphere";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Backend used when nothing else is configured
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";

/// Login requests are abandoned after this long.
/// Matches a generous HTTP request timeout without leaving login stuck.
const DEFAULT_LOGIN_TIMEOUT_SECS: u64 = 30;

/// Lower bound for a configured login timeout
const MIN_LOGIN_TIMEOUT_SECS: u64 = 1;

/// Alerts disappear after this many milliseconds
const DEFAULT_ALERT_TTL_MS: u64 = 3000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub login_timeout_secs: u64,
    pub alert_ttl_ms: u64,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            login_timeout_secs: DEFAULT_LOGIN_TIMEOUT_SECS,
            alert_ttl_ms: DEFAULT_ALERT_TTL_MS,
            last_email: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Record the email of the last successful login.
    ///
    /// The file is re-read first so that values overridden for this run
    /// (such as the backend URL) are not written back.
    pub fn remember_email(email: &str) -> Result<()> {
        Self::remember_email_at(&Self::config_path()?, email)
    }

    pub fn remember_email_at(path: &Path, email: &str) -> Result<()> {
        let mut config = Self::load_from(path)?;
        config.last_email = Some(email.to_string());
        config.save_to(path)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the persisted session snapshot.
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs.max(MIN_LOGIN_TIMEOUT_SECS))
    }

    pub fn alert_ttl(&self) -> Duration {
        Duration::from_millis(self.alert_ttl_ms)
    }
}
