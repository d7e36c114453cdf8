//! Application configuration
//!
//! Loaded from `config.toml` in the platform config directory (or an
//! explicit path). Every section has defaults, so a missing file or a
//! partial one is fine.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    DEFAULT_HTTP_PORT, DEFAULT_RELAY_URL, RELAY_HEALTH_TIMEOUT, RELAY_REQUEST_TIMEOUT,
    STATS_INTERVAL,
};
use crate::error::{Error, Result};
use crate::media::SyntheticConfig;

/// Environment variable overriding `relay.url`
pub const RELAY_URL_ENV: &str = "METASTREAM_RELAY_URL";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub relay: RelayConfig,
    pub stats: StatsConfig,
    pub ui: UiConfig,
    pub storage: StorageConfig,
    pub devices: SyntheticConfig,
    pub platforms: PlatformsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub url: String,
    /// Health probe timeout in seconds
    pub health_timeout_secs: f64,
    pub request_timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_RELAY_URL.to_string(),
            health_timeout_secs: RELAY_HEALTH_TIMEOUT.as_secs_f64(),
            request_timeout_secs: RELAY_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    pub interval_ms: u64,
}

impl StatsConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(100))
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            interval_ms: STATS_INTERVAL.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub bind_address: String,
    pub http_port: u16,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            http_port: DEFAULT_HTTP_PORT,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file backing the local store; `None` uses the data directory
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformsConfig {
    /// Honour per-platform advanced settings (server override, proxy)
    pub advanced: bool,
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "MetaStream", "metastream")
}

impl AppConfig {
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|d| d.config_dir().join("config.toml"))
    }

    /// Load from `path`, or the default location when `None`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::default_path(),
        };

        let mut config = match path {
            Some(path) if path.exists() => {
                let raw = std::fs::read_to_string(&path)?;
                let config: AppConfig = toml::from_str(&raw)
                    .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
                tracing::info!(path = %path.display(), "loaded config");
                config
            }
            _ => AppConfig::default(),
        };

        if let Ok(url) = std::env::var(RELAY_URL_ENV) {
            if !url.trim().is_empty() {
                config.relay.url = url;
            }
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let secs = self.relay.health_timeout_secs;
        if !secs.is_finite() || secs <= 0.0 {
            return Err(Error::Config(format!(
                "relay.health_timeout_secs must be a positive number of seconds, got {}",
                secs
            )));
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, raw)?;
        Ok(())
    }

    /// Where the local store lives
    pub fn storage_path(&self) -> PathBuf {
        self.storage
            .path
            .clone()
            .or_else(|| project_dirs().map(|d| d.data_dir().join("storage.json")))
            .unwrap_or_else(|| PathBuf::from("metastream-storage.json"))
    }
}
