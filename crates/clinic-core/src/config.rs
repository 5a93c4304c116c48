//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! the API base URL, where the session token is persisted, the request
//! timeout and the last used username.
//!
//! Configuration is stored at `~/.config/clinic-dash/config.json`. The base
//! URL can be overridden with the `CLINIC_API_BASE_URL` environment variable.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::api::client::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::auth::{FileTokenStore, KeyringTokenStore, Session};

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "clinic-dash";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the configured base URL
pub const BASE_URL_ENV: &str = "CLINIC_API_BASE_URL";

/// Used when neither the config file nor the environment names a backend
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Where the access token is persisted between runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TokenBackend {
    #[default]
    File,
    Keyring,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub token_backend: TokenBackend,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub last_username: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Effective base URL: environment, then config file, then default
    pub fn base_url(&self) -> String {
        Self::resolve_base_url(std::env::var(BASE_URL_ENV).ok(), self.api_base_url.as_deref())
    }

    fn resolve_base_url(env: Option<String>, configured: Option<&str>) -> String {
        env.filter(|v| !v.trim().is_empty())
            .or_else(|| configured.map(str::to_string))
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
            .trim()
            .trim_end_matches('/')
            .to_string()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    /// Build a session over the configured token backend
    pub fn session(&self) -> Result<Session> {
        Ok(match self.token_backend {
            TokenBackend::File => Session::new(FileTokenStore::new(self.cache_dir()?)),
            TokenBackend::Keyring => Session::new(KeyringTokenStore::new()),
            TokenBackend::Memory => Session::in_memory(),
        })
    }
}
