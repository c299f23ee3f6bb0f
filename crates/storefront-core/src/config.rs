//! Application configuration management.
//!
//! Holds the backend base address, the session storage backend and the last
//! used username. Configuration is stored at
//! `~/.config/storefront/config.json`; `STOREFRONT_API_URL` overrides the
//! backend address.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::{FileStore, KeyValueStore, KeyringStore, MemoryStore};

/// Application name used for config/data directory paths
const APP_NAME: &str = "storefront";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Session file name in the data directory (file storage backend)
const SESSION_FILE: &str = "session.json";

/// Environment variable that overrides `api_base_url`
pub const API_URL_ENV: &str = "STOREFRONT_API_URL";

pub const DEFAULT_API_BASE_URL: &str = "https://pashok00191.pythonanywhere.com/api/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Keyring,
    /// Nothing persists; for throwaway sessions
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub storage: StorageBackend,
    pub last_username: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            storage: StorageBackend::default(),
            last_username: None,
        }
    }
}

/// Ensure the base URL ends with exactly one `/` so relative endpoint paths
/// can be appended directly.
pub fn normalize_base_url(url: &str) -> String {
    format!("{}/", url.trim().trim_end_matches('/'))
}

impl Config {
    /// Config pointing at a specific backend, with in-memory storage
    pub fn for_base_url(url: &str) -> Self {
        Self {
            api_base_url: normalize_base_url(url),
            storage: StorageBackend::Memory,
            last_username: None,
        }
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };

        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                config.api_base_url = url;
            }
        }
        config.api_base_url = normalize_base_url(&config.api_base_url);
        Ok(config)
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

    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Absolute URL for an endpoint path relative to the API root
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url, path.trim_start_matches('/'))
    }

    /// Build the durable key-value backend selected by `storage`
    pub fn open_storage(&self) -> Result<Arc<dyn KeyValueStore>> {
        Ok(match self.storage {
            StorageBackend::File => Arc::new(FileStore::new(self.data_dir()?.join(SESSION_FILE))),
            StorageBackend::Keyring => Arc::new(KeyringStore::new()),
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
        })
    }
}
