//! Configuration management infrastructure.
//!
//! This module provides configuration file support, allowing users to save
//! and load the Time-Stamp Authority endpoint, network timeout and
//! re-extension policy.

use crate::domain::constants::DEFAULT_TSA_TIMEOUT_SECS;
use crate::domain::types::TsaUrl;
use crate::domain::xades::ReextensionPolicy;
use crate::infra::error::{TimestampingError, TimestampingResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Public RFC3161 authority used until one is configured
pub const DEFAULT_TSA_URL: &str = "http://timestamp.digicert.com";

/// Application configuration for the extension pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtenderConfiguration {
    /// Time-Stamp Authority endpoint
    pub tsa_url: String,

    /// Round-trip timeout for the single TSA request
    pub timeout_seconds: u64,

    /// `User-Agent` header sent to the authority
    pub user_agent: String,

    /// Behaviour when the signature already carries a timestamp
    pub reextension_policy: ReextensionPolicy,

    /// Whether to show verbose output
    pub verbose: bool,
}

impl Default for ExtenderConfiguration {
    fn default() -> Self {
        Self {
            tsa_url: DEFAULT_TSA_URL.to_string(),
            timeout_seconds: DEFAULT_TSA_TIMEOUT_SECS,
            user_agent: crate::adapters::timestamp_http_client::DEFAULT_USER_AGENT.to_string(),
            reextension_policy: ReextensionPolicy::default(),
            verbose: false,
        }
    }
}

impl ExtenderConfiguration {
    /// Check every value, returning the parsed TSA URL.
    pub fn validate(&self) -> TimestampingResult<TsaUrl> {
        let url = TsaUrl::new(&self.tsa_url)
            .map_err(|e| TimestampingError::ConfigurationError(format!("tsa_url: {e}")))?;
        if self.timeout_seconds == 0 {
            return Err(TimestampingError::ConfigurationError(
                "Network timeout must be greater than 0".to_string(),
            ));
        }
        if self.user_agent.trim().is_empty() {
            return Err(TimestampingError::ConfigurationError(
                "User agent must not be empty".to_string(),
            ));
        }
        Ok(url)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Configuration manager for handling config files
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new configuration manager with default path
    #[must_use]
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a configuration manager with custom path
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        match dirs::config_dir() {
            Some(config_dir) => config_dir.join("asice-timestamper").join("config.toml"),
            None => PathBuf::from("asice-timestamper-config.toml"),
        }
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub fn load_or_create_default(&self) -> TimestampingResult<ExtenderConfiguration> {
        if self.config_path.exists() {
            self.load()
        } else {
            log::info!(
                "Configuration file not found, creating default: {}",
                self.config_path.display()
            );
            let default_config = ExtenderConfiguration::default();
            self.save(&default_config)?;
            Ok(default_config)
        }
    }

    /// Load configuration from file, falling back to defaults when absent
    pub fn load_or_default(&self) -> TimestampingResult<ExtenderConfiguration> {
        if self.config_path.exists() {
            self.load()
        } else {
            log::debug!(
                "No configuration at {}, using defaults",
                self.config_path.display()
            );
            Ok(ExtenderConfiguration::default())
        }
    }

    /// Load configuration from file
    pub fn load(&self) -> TimestampingResult<ExtenderConfiguration> {
        log::debug!("Loading configuration from: {}", self.config_path.display());

        let content = fs::read_to_string(&self.config_path).map_err(|e| {
            TimestampingError::ConfigurationError(format!(
                "Failed to read config file {}: {}",
                self.config_path.display(),
                e
            ))
        })?;

        let config: ExtenderConfiguration = toml::from_str(&content).map_err(|e| {
            TimestampingError::ConfigurationError(format!("Failed to parse config file: {e}"))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &ExtenderConfiguration) -> TimestampingResult<()> {
        config.validate()?;
        log::info!("Saving configuration to: {}", self.config_path.display());

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                TimestampingError::ConfigurationError(format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let content = toml::to_string_pretty(config).map_err(|e| {
            TimestampingError::ConfigurationError(format!("Failed to serialize config: {e}"))
        })?;

        fs::write(&self.config_path, content).map_err(|e| {
            TimestampingError::ConfigurationError(format!(
                "Failed to write config file {}: {}",
                self.config_path.display(),
                e
            ))
        })?;

        Ok(())
    }

    /// Update a specific configuration value
    pub fn update_value(&self, key: &str, value: &str) -> TimestampingResult<()> {
        let mut config = self.load_or_default()?;

        match key {
            "tsa_url" => {
                TsaUrl::new(value)
                    .map_err(|e| TimestampingError::ConfigurationError(format!("tsa_url: {e}")))?;
                config.tsa_url = value.trim().to_string();
            }
            "timeout_seconds" => {
                config.timeout_seconds = value.parse().map_err(|_| {
                    TimestampingError::ConfigurationError(format!("Invalid timeout: {value}"))
                })?;
            }
            "user_agent" => {
                config.user_agent = value.to_string();
            }
            "reextension_policy" => {
                config.reextension_policy =
                    value.parse().map_err(TimestampingError::ConfigurationError)?;
            }
            "verbose" => {
                config.verbose = value.parse().map_err(|_| {
                    TimestampingError::ConfigurationError(format!("Invalid boolean value: {value}"))
                })?;
            }
            _ => {
                return Err(TimestampingError::ConfigurationError(format!(
                    "Unknown configuration key: {key}"
                )));
            }
        }

        self.save(&config)
    }

    /// Get the configuration file path
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Export configuration as a portable format
    pub fn export_config(&self, format: ExportFormat) -> TimestampingResult<String> {
        let config = self.load_or_default()?;

        match format {
            ExportFormat::Toml => toml::to_string_pretty(&config).map_err(|e| {
                TimestampingError::ConfigurationError(format!("TOML export failed: {e}"))
            }),
            ExportFormat::Json => serde_json::to_string_pretty(&config).map_err(|e| {
                TimestampingError::ConfigurationError(format!("JSON export failed: {e}"))
            }),
            ExportFormat::Yaml => serde_yaml::to_string(&config).map_err(|e| {
                TimestampingError::ConfigurationError(format!("YAML export failed: {e}"))
            }),
        }
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Toml,
    Json,
    Yaml,
}
