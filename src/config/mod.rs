//! Configuration management for assetsync
//!
//! Uses XDG-compliant paths:
//! - Config: ~/.config/assetsync/config.toml
//! - Data: ~/.local/share/assetsync/

mod layout;
mod paths;

pub use layout::AssetLayout;
pub use paths::Paths;

use crate::download::DEFAULT_PROGRESS_INTERVAL;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;

pub const DEFAULT_MANIFEST_URL: &str =
    "http://www.makehumancommunity.org/sites/default/files/assets.json";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Asset server settings
    pub server: ServerConfig,

    /// Download behaviour
    pub download: DownloadConfig,

    /// Override for the asset database root (manifest, local state, cache)
    pub asset_root_override: Option<String>,

    /// Override for the install tree
    pub install_root_override: Option<String>,

    /// Paths configuration
    #[serde(skip)]
    pub paths: Paths,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            download: DownloadConfig::default(),
            asset_root_override: None,
            install_root_override: None,
            paths: Paths::new(),
        }
    }
}

/// Asset server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// URL of the asset manifest
    pub manifest_url: String,

    /// User agent sent with every request
    pub user_agent: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            manifest_url: DEFAULT_MANIFEST_URL.to_string(),
            user_agent: format!("assetsync/{}", crate::APP_VERSION),
            timeout_secs: 30,
        }
    }
}

/// Download configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Minimum delay between two progress reports
    pub progress_interval_ms: u64,

    /// Fetch screenshots during a sync
    pub screenshots: bool,

    /// Fetch thumbnails during a sync
    pub thumbnails: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            progress_interval_ms: DEFAULT_PROGRESS_INTERVAL.as_millis() as u64,
            screenshots: true,
            thumbnails: true,
        }
    }
}

impl DownloadConfig {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}

impl Config {
    /// Resolve the asset database root (override or default XDG path)
    pub fn asset_root(&self) -> PathBuf {
        self.asset_root_override
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.paths.asset_root())
    }

    /// Resolve the install root (override or default XDG path)
    pub fn install_root(&self) -> PathBuf {
        self.install_root_override
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.paths.install_root())
    }

    pub fn layout(&self) -> AssetLayout {
        AssetLayout::new(self.asset_root(), self.install_root())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.server.timeout_secs)
    }

    /// Validate and store a new manifest URL
    pub fn set_manifest_url(&mut self, value: &str) -> Result<()> {
        let value = value.trim();
        let url = url::Url::parse(value)
            .with_context(|| format!("Invalid manifest url '{}'", value))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("Manifest url must use http or https, got '{}'", url.scheme());
        }
        self.server.manifest_url = value.to_string();
        Ok(())
    }

    /// Ensure required directories exist, including overrides.
    pub fn ensure_dirs(&self) -> Result<()> {
        self.paths
            .ensure_dirs()
            .context("Failed to create default application directories")?;
        self.layout()
            .ensure_dirs()
            .context("Failed to create asset directories")?;
        Ok(())
    }

    /// Load configuration from disk or create default
    pub async fn load() -> Result<Self> {
        let paths = Paths::new();
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .await
                .context("Failed to read config file")?;
            Self::from_toml(&content)?
        } else {
            // Create default config
            let config = Config::default();
            config.save().await?;
            config
        };

        config.paths = paths;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Save configuration to disk
    pub async fn save(&self) -> Result<()> {
        let config_path = self.paths.config_file();

        // Ensure config directory exists
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content)
            .await
            .context("Failed to write config file")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let config = Config::from_toml(
            r#"
            install_root_override = "/srv/install"

            [download]
            screenshots = false
            "#,
        )
        .unwrap();

        assert_eq!(config.server.manifest_url, DEFAULT_MANIFEST_URL);
        assert_eq!(config.download.progress_interval(), DEFAULT_PROGRESS_INTERVAL);
        assert!(!config.download.screenshots);
        assert!(config.download.thumbnails);
        assert_eq!(config.install_root(), PathBuf::from("/srv/install"));
    }

    #[test]
    fn overrides_feed_the_layout() {
        let config = Config {
            asset_root_override: Some("/srv/assets".to_string()),
            install_root_override: Some("/srv/install".to_string()),
            ..Config::default()
        };

        let layout = config.layout();
        assert_eq!(layout.remote_db(), PathBuf::from("/srv/assets/remote.json"));
        assert_eq!(layout.install_root(), std::path::Path::new("/srv/install"));
    }

    #[test]
    fn manifest_url_must_be_http() {
        let mut config = Config::default();
        assert!(config.set_manifest_url("ftp://example.org/a.json").is_err());
        assert!(config.set_manifest_url("not a url").is_err());

        config
            .set_manifest_url(" https://example.org/assets.json ")
            .unwrap();
        assert_eq!(config.server.manifest_url, "https://example.org/assets.json");
    }

    #[test]
    fn round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back = Config::from_toml(&text).unwrap();
        assert_eq!(back.server.timeout_secs, config.server.timeout_secs);
        assert_eq!(back.download.progress_interval_ms, 500);
    }
}
