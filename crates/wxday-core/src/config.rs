use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Open-Meteo historical archive endpoint.
pub const DEFAULT_ARCHIVE_BASE_URL: &str = "https://archive-api.open-meteo.com/v1/archive";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a single-line summary of all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Values supplied on the command line that replace file settings.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub input_file: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding one cached payload file per date
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Line-oriented file listing the dates to process
    #[serde(default = "default_input_file")]
    pub input_file: PathBuf,

    /// Remote archive settings
    #[serde(default)]
    pub weather: WeatherConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Latitude of the fixed observation point
    #[serde(default = "default_latitude")]
    pub latitude: f64,

    /// Longitude of the fixed observation point
    #[serde(default = "default_longitude")]
    pub longitude: f64,

    /// Historical archive endpoint
    #[serde(default = "default_archive_base_url")]
    pub archive_base_url: String,

    /// Timezone used by the archive to align daily aggregates
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Upper bound for a single fetch, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wxday")
}

fn default_input_file() -> PathBuf {
    PathBuf::from("dates.txt")
}

fn default_latitude() -> f64 {
    32.78
}

fn default_longitude() -> f64 {
    -96.8
}

fn default_archive_base_url() -> String {
    DEFAULT_ARCHIVE_BASE_URL.to_string()
}

fn default_timezone() -> String {
    "auto".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            latitude: default_latitude(),
            longitude: default_longitude(),
            archive_base_url: default_archive_base_url(),
            timezone: default_timezone(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            input_file: default_input_file(),
            weather: WeatherConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the user config directory, creating a default
    /// file if it doesn't exist.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = Self::default();
            config.save_to(&config_path)?;
            tracing::info!("Wrote default configuration to {}", config_path.display());
            return Ok(config);
        }

        Ok(Self::load_from(&config_path)?)
    }

    /// Load configuration from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::NotFound(format!("{}: {}", path.display(), e)))?;

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))
    }

    /// Load configuration (explicit path or user default), apply per-run
    /// overrides, then validate the result.
    ///
    /// Warnings are logged; errors fail the load.
    pub fn load_validated(
        path: Option<&Path>,
        overrides: ConfigOverrides,
    ) -> Result<(Self, ValidationResult)> {
        let mut config = match path {
            Some(p) => Self::load_from(p)?,
            None => Self::load()?,
        };
        config.apply_overrides(overrides);
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(input_file) = overrides.input_file {
            self.input_file = input_file;
        }
        if let Some(cache_dir) = overrides.cache_dir {
            self.cache_dir = cache_dir;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();
        let weather = &self.weather;

        if !weather.latitude.is_finite() || !(-90.0..=90.0).contains(&weather.latitude) {
            result.add_error(
                "weather.latitude",
                format!("Latitude must be within [-90, 90], got {}", weather.latitude),
            );
        }
        if !weather.longitude.is_finite() || !(-180.0..=180.0).contains(&weather.longitude) {
            result.add_error(
                "weather.longitude",
                format!(
                    "Longitude must be within [-180, 180], got {}",
                    weather.longitude
                ),
            );
        }

        self.validate_url(
            &weather.archive_base_url,
            "weather.archive_base_url",
            &mut result,
        );

        if weather.timezone.trim().is_empty() {
            result.add_error("weather.timezone", "Timezone must not be empty");
        }

        if weather.timeout_secs == 0 {
            result.add_error("weather.timeout_secs", "Timeout must be greater than 0");
        } else if weather.timeout_secs > 120 {
            result.add_warning(
                "weather.timeout_secs",
                "Timeout is unusually long (>120 seconds)",
            );
        }

        if !self.input_file.exists() {
            result.add_warning(
                "input_file",
                format!("Path does not exist: {}", self.input_file.display()),
            );
        }

        if self.cache_dir.exists() && !self.cache_dir.is_dir() {
            result.add_error(
                "cache_dir",
                format!("Path is not a directory: {}", self.cache_dir.display()),
            );
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to the given file, creating parent directories.
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the default configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("wxday");

        Ok(config_dir.join("config.toml"))
    }
}
