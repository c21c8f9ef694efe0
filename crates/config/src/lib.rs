//! Configuration loading, validation, and management for chatwire.
//!
//! Loads configuration from `~/.chatwire/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use chatwire_citations::BUILTIN_SCHEMA_IDS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.chatwire/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Citation extraction configuration
    #[serde(default)]
    pub citations: CitationsConfig,

    /// Event log replay configuration
    #[serde(default)]
    pub replay: ReplayConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset, e.g. `info` or `chatwire_patch=debug`
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::ValidationError(format!(
                "unknown log format '{other}' (expected 'pretty' or 'json')"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationsConfig {
    /// Schema ids to try, highest priority first
    #[serde(default = "default_schemas")]
    pub schemas: Vec<String>,
}

fn default_schemas() -> Vec<String> {
    BUILTIN_SCHEMA_IDS.iter().map(|id| id.to_string()).collect()
}

impl Default for CitationsConfig {
    fn default() -> Self {
        Self {
            schemas: default_schemas(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Stop the replay at the first citation schema failure
    #[serde(default = "default_true")]
    pub fail_on_citation_error: bool,

    /// Print in-progress text of a message that never ended
    #[serde(default)]
    pub print_partial: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            fail_on_citation_error: true,
            print_partial: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location, then apply
    /// environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_dir().join("config.toml"))
    }

    /// Load configuration from a specific file path, then apply
    /// environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::read_file(path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Apply `CHATWIRE_*` overrides read through `lookup`.
    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(level) = lookup("CHATWIRE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("CHATWIRE_LOG_FORMAT") {
            self.logging.format = format.parse()?;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".chatwire")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.citations.schemas.is_empty() {
            return Err(ConfigError::ValidationError(
                "citations.schemas must name at least one schema".into(),
            ));
        }

        if let Some(unknown) = self
            .citations
            .schemas
            .iter()
            .find(|id| !BUILTIN_SCHEMA_IDS.contains(&id.as_str()))
        {
            return Err(ConfigError::ValidationError(format!(
                "unknown citation schema '{unknown}' (known: {})",
                BUILTIN_SCHEMA_IDS.join(", ")
            )));
        }

        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "logging.level must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for the `config` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
