//! Bus Configuration
//!
//! Settings can be built in code or loaded from a TOML file:
//!
//! ```toml
//! [bus]
//! trace = true
//! max-listeners = 25
//!
//! [logging]
//! level = "debug"
//! format = "json"
//! file = "/tmp/wildbus.log"
//! file-level = "trace"
//! ```
//!
//! Missing tables and keys fall back to defaults.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::logging::{parse_log_level, LogConfig, LogDestination, LogFormat};

/// Default bucket size above which a leak warning is logged
pub const DEFAULT_MAX_LISTENERS: usize = 10;

/// Per-bus settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BusConfig {
    /// Log registrations, removals and emissions
    pub trace: bool,

    /// Warn once when a single bucket grows past this many listeners.
    /// `None` or `0` disables the check.
    pub max_listeners: Option<usize>,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            trace: false,
            max_listeners: Some(DEFAULT_MAX_LISTENERS),
        }
    }
}

/// `[logging]` table of a configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LoggingSettings {
    pub level: Option<String>,
    pub file_level: Option<String>,
    pub format: Option<String>,
    pub file: Option<PathBuf>,
}

impl LoggingSettings {
    /// Convert to a logger configuration, validating level and format names
    pub fn to_log_config(&self) -> Result<LogConfig> {
        let mut config = LogConfig::default();

        if let Some(level) = &self.level {
            config.console_level = parse_log_level(level)?;
        }
        if let Some(format) = &self.format {
            config.format = format.parse::<LogFormat>().map_err(anyhow::Error::msg)?;
        }
        if let Some(path) = &self.file {
            config.destination = LogDestination::Both(path.clone());
            config.file_level = Some(match &self.file_level {
                Some(level) => parse_log_level(level)?,
                None => config.console_level,
            });
        }
        Ok(config)
    }
}

/// Complete configuration file contents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub bus: BusConfig,
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse bus configuration")
    }

    /// Load configuration from explicit file path
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading configuration from file: {}", path.display());

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        info!("Successfully loaded configuration from: {}", path.display());
        Ok(config)
    }
}

impl BusConfig {
    /// Parse the `[bus]` table from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(ConfigFile::from_toml_str(content)?.bus)
    }

    /// Load the `[bus]` table from a TOML file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(ConfigFile::load_from_file(path)?.bus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::LevelFilter;

    #[test]
    fn test_defaults() {
        let config = BusConfig::default();
        assert!(!config.trace);
        assert_eq!(config.max_listeners, Some(DEFAULT_MAX_LISTENERS));
    }

    #[test]
    fn test_missing_tables_use_defaults() {
        assert_eq!(BusConfig::from_toml_str("").unwrap(), BusConfig::default());
        assert_eq!(
            ConfigFile::from_toml_str("[other]\nkey = 1\n").unwrap(),
            ConfigFile::default()
        );
    }

    #[test]
    fn test_bus_table_parsing() {
        let config = BusConfig::from_toml_str("[bus]\ntrace = true\nmax-listeners = 3\n").unwrap();
        assert!(config.trace);
        assert_eq!(config.max_listeners, Some(3));
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(BusConfig::from_toml_str("[bus]\ntrace = \"often\"\n").is_err());
        assert!(BusConfig::from_toml_str("[bus\n").is_err());
    }

    #[test]
    fn test_logging_settings_conversion() {
        let file = ConfigFile::from_toml_str(
            "[logging]\nlevel = \"warn\"\nformat = \"json\"\nfile = \"/tmp/bus.log\"\nfile-level = \"trace\"\n",
        )
        .unwrap();
        let log_config = file.logging.to_log_config().unwrap();
        assert_eq!(log_config.console_level, LevelFilter::Warn);
        assert_eq!(log_config.file_level, Some(LevelFilter::Trace));
        assert_eq!(log_config.format, LogFormat::Json);
        assert_eq!(
            log_config.destination,
            LogDestination::Both(PathBuf::from("/tmp/bus.log"))
        );
    }

    #[test]
    fn test_logging_keys_are_kebab_case() {
        let file = ConfigFile::from_toml_str(
            "[bus]\nmax-listeners = 4\n\n[logging]\nlevel = \"info\"\nfile = \"/tmp/bus.log\"\nfile-level = \"debug\"\n",
        )
        .unwrap();
        assert_eq!(file.bus.max_listeners, Some(4));
        assert_eq!(file.logging.file_level.as_deref(), Some("debug"));

        let file = ConfigFile::from_toml_str("[logging]\nfile_level = \"debug\"\n").unwrap();
        assert_eq!(file.logging.file_level, None);
    }

    #[test]
    fn test_logging_settings_reject_unknown_names() {
        let settings = LoggingSettings {
            level: Some("loud".to_string()),
            ..LoggingSettings::default()
        };
        assert!(settings.to_log_config().is_err());

        let settings = LoggingSettings {
            format: Some("xml".to_string()),
            ..LoggingSettings::default()
        };
        assert!(settings.to_log_config().is_err());
    }
}
