use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;
use crate::models::{PlayerSettings, Resolution};

const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub player: PlayerConfig,
    pub progress: ProgressConfig,
    pub list: ListConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    pub volume: f32,
    pub rate: f32,
    pub resolution: Resolution,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    pub throttle_secs: u64,
    pub pause_debounce_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListConfig {
    pub page_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// Directory for a daily-rotated log file; stderr only when unset.
    #[serde(default)]
    pub file_dir: Option<PathBuf>,
}

impl ServerConfig {
    pub fn url(&self) -> Result<Url, ConfigError> {
        Ok(Url::parse(&self.base_url)?)
    }

    pub fn token(&self) -> Option<String> {
        self.token.clone().filter(|t| !t.is_empty())
    }
}

impl PlayerConfig {
    pub fn settings(&self) -> PlayerSettings {
        PlayerSettings {
            volume: self.volume.clamp(0.0, 1.0),
            rate: if self.rate > 0.0 { self.rate } else { 1.0 },
            resolution: self.resolution,
        }
    }
}

impl ProgressConfig {
    pub fn throttle_window(&self) -> Duration {
        Duration::from_secs(self.throttle_secs.max(1))
    }

    pub fn pause_debounce(&self) -> Duration {
        Duration::from_millis(self.pause_debounce_ms)
    }
}

impl AppConfig {
    /// Load config: user file (if exists) or built-in defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let user_path = Self::config_path();
        if user_path.exists() {
            Self::load_from(&user_path)
        } else {
            Ok(toml::from_str(DEFAULT_CONFIG)?)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.server.url()?;
        Ok(config)
    }

    /// Save current config to the user config file.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Path to user config file (XDG on Linux, AppData on Windows).
    pub fn config_path() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "shosai")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("built-in default config is valid TOML")
    }
}
