use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::constants::*;
use crate::domain::Coordinate;
use crate::error::{LocatorError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub maps: MapsConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MapsConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub load_timeout_ms: u64,
    pub geocode_timeout_ms: u64,
    pub default_latitude: f64,
    pub default_longitude: f64,
    pub wide_zoom: u8,
    pub precise_zoom: u8,
}

impl Default for MapsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_MAPS_BASE_URL.to_string(),
            load_timeout_ms: DEFAULT_LOAD_TIMEOUT_MS,
            geocode_timeout_ms: DEFAULT_GEOCODE_TIMEOUT_MS,
            default_latitude: DEFAULT_LATITUDE,
            default_longitude: DEFAULT_LONGITUDE,
            wide_zoom: WIDE_ZOOM,
            precise_zoom: PRECISE_ZOOM,
        }
    }
}

impl MapsConfig {
    /// The API key, treating a blank value as absent
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    pub fn geocode_timeout(&self) -> Duration {
        Duration::from_millis(self.geocode_timeout_ms)
    }

    pub fn default_center(&self) -> Result<Coordinate> {
        Coordinate::new(self.default_latitude, self.default_longitude)
            .map_err(|e| LocatorError::Config(format!("default coordinate: {}", e)))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

impl Config {
    /// Reads `config.toml` (or the file named by `LISTING_MAP_CONFIG`) when it
    /// exists, then applies environment overrides.
    pub fn load() -> Result<Self> {
        let explicit = std::env::var(ENV_CONFIG_PATH).ok();
        let config_path = explicit.clone().unwrap_or_else(|| "config.toml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            info!("Loading configuration from {}", config_path);
            Self::from_file(&config_path)?
        } else if explicit.is_some() {
            return Err(LocatorError::Config(format!(
                "Config file '{}' does not exist",
                config_path
            )));
        } else {
            debug!("No config file, using defaults");
            Self::default()
        };

        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Overrides file values with whatever `lookup` finds for the known variables.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_MAPS_API_KEY) {
            self.maps.api_key = Some(key);
        }
        if let Some(url) = lookup(ENV_MAPS_BASE_URL) {
            self.maps.base_url = url;
        }
        if let Some(url) = lookup(ENV_API_BASE_URL) {
            self.api.base_url = url;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.maps.default_center()?;
        if self.maps.load_timeout_ms == 0 {
            return Err(LocatorError::Config("maps.load_timeout_ms must be positive".to_string()));
        }
        if self.maps.geocode_timeout_ms == 0 {
            return Err(LocatorError::Config("maps.geocode_timeout_ms must be positive".to_string()));
        }
        if self.maps.wide_zoom > self.maps.precise_zoom {
            return Err(LocatorError::Config(format!(
                "maps.wide_zoom ({}) must not exceed maps.precise_zoom ({})",
                self.maps.wide_zoom, self.maps.precise_zoom
            )));
        }
        Ok(())
    }
}
