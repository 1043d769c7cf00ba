//! Configuration management for storyline.
//!
//! Configuration is read from `~/.config/storyline/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::api::DEFAULT_PAGE_SIZE;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub feed: FeedConfig,
    pub storage: StorageConfig,
}

/// Remote story service settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL; `/stories` and `/login` are appended to it.
    pub base_url: String,
    /// Request timeout in seconds. A timed-out request falls back to the cache.
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://story-api.dicoding.dev/v1".to_string(),
            timeout_secs: 10,
            user_agent: concat!("storyline/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Defaults for story listings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub page_size: u32,
    pub with_location: bool,
    /// Pages warmed by `storyline prefetch` when no count is given.
    pub prefetch_pages: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            with_location: false,
            prefetch_pages: 3,
        }
    }
}

/// Local file locations. `None` means the platform data directory.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: Option<PathBuf>,
    pub session_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            Self::create_default_config(config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::Io {
            path: config_path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source: e,
        })?;

        url::Url::parse(&config.api.base_url).map_err(|e| ConfigError::InvalidUrl {
            url: config.api.base_url.clone(),
            source: e,
        })?;

        Ok(config)
    }

    /// Get the default config file path: `~/.config/storyline/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("storyline").join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    fn default_config_content() -> String {
        r##"# storyline configuration

[api]
# Story service base URL
base_url = "https://story-api.dicoding.dev/v1"

# Request timeout in seconds; on timeout, reads are served from the local cache
timeout_secs = 10

user_agent = "storyline/0.1.0"

[feed]
# Stories per page
page_size = 10

# Only list stories that carry coordinates
with_location = false

# Pages fetched by `storyline prefetch`
prefetch_pages = 3

[storage]
# Local database and session file. Defaults to the platform data directory.
# database_path = "/home/me/.local/share/storyline/storyline.db"
# session_path = "/home/me/.local/share/storyline/session.json"
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid API base URL {url}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
}
