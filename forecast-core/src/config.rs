use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::model::{Coordinate, UnitSystem};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
pub const DEFAULT_ICON_URL: &str = "https://openweathermap.org/img/wn";
pub const DEFAULT_LOOKUP_URL: &str = "https://ipapi.co/json/";

/// How the "use my location" path finds a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// IP geolocation endpoint.
    pub lookup_url: String,

    /// Fixed position; when both are set the IP lookup is skipped.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            lookup_url: DEFAULT_LOOKUP_URL.to_string(),
            latitude: None,
            longitude: None,
        }
    }
}

impl LocationConfig {
    /// The configured fixed position, if both halves are present and valid.
    pub fn fixed(&self) -> Option<Coordinate> {
        Coordinate::new(self.latitude?, self.longitude?)
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// units = "metric"
///
/// [location]
/// latitude = 51.5
/// longitude = -0.12
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub base_url: String,
    pub icon_url: String,
    pub units: UnitSystem,
    pub lang: String,
    pub location: LocationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            icon_url: DEFAULT_ICON_URL.to_string(),
            units: UnitSystem::default(),
            lang: "en".to_string(),
            location: LocationConfig::default(),
        }
    }
}

impl Config {
    /// Return the API key, or an error with a hint on how to set one.
    pub fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "No API key configured.\n\
                     Hint: run `forecast configure` or set FORECAST_API_KEY."
                )
            })
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "forecast", "forecast")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Apply `FORECAST_API_KEY`, `FORECAST_BASE_URL` and `FORECAST_ICON_URL`
    /// from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("FORECAST_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(url) = non_empty("FORECAST_BASE_URL") {
            self.base_url = url;
        }
        if let Some(url) = non_empty("FORECAST_ICON_URL") {
            self.icon_url = url;
        }
        self
    }
}
