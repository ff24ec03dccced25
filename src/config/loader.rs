//! Configuration loader.
//!
//! This module provides functionality to load prober settings from JSON
//! files, falling back to default locations and built-in defaults.

use crate::config::AppConfig;
use crate::error::Result;
use std::path::{Path, PathBuf};

/// Name of the settings file inside the config directory.
pub const CONFIG_FILE: &str = "config.json";

/// Settings file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "netprobe.json";

/// Configuration loader.
///
/// Provides various methods to locate, load and save [`AppConfig`].
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load settings from a JSON file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    ///
    /// The settings are not validated here: command-line overrides may
    /// still fill in what the file leaves invalid. Call
    /// [`AppConfig::validate`] once they are applied.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let config = ConfigLoader::load_from_file("netprobe.json")?;
    /// println!("{:?}", config.resolver.servers);
    /// ```
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Load settings from the first location that exists.
    ///
    /// Searches in the following order:
    /// 1. `path`, when given (must exist)
    /// 2. `$CONFIG_DIR/netprobe/config.json`
    /// 3. `netprobe.json` in the current directory
    ///
    /// Falls back to [`AppConfig::default`] when no file is found.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<AppConfig> {
        if let Some(path) = path {
            return Self::load_from_file(path);
        }

        for candidate in [Self::config_dir().join(CONFIG_FILE), PathBuf::from(LOCAL_CONFIG_FILE)] {
            if candidate.is_file() {
                tracing::debug!(path = %candidate.display(), "loading config");
                return Self::load_from_file(candidate);
            }
        }

        tracing::debug!("no config file found, using defaults");
        Ok(AppConfig::default())
    }

    /// Get the config directory path.
    #[must_use]
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("netprobe")
    }

    /// Write settings as pretty JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save<P: AsRef<Path>>(config: &AppConfig, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(config)?)?;
        Ok(())
    }
}
