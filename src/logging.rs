// Logging sink for wildbus
// Installs a `log` backend that writes trace lines produced by the bus
//
// The bus itself only talks to the `log` facade; applications that already
// run a logger need none of this. The sink supports:
// - Text and JSON line formats
// - Console (stderr), file, or both
// - Independent levels for console and file output
//
// Example usage:
// ```
// let config = LogConfig {
//     console_level: LevelFilter::Debug,
//     file_level: None,
//     format: LogFormat::Text,
//     destination: LogDestination::Console,
// };
// init_logger(config)?;
// bus.set_trace(true);
// ```

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use log::{Level, LevelFilter};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Log output format options
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: {}. Valid options: text, json", s)),
        }
    }
}

/// Log destination options
#[derive(Debug, Clone, PartialEq)]
pub enum LogDestination {
    Console,
    File(PathBuf),
    Both(PathBuf),
}

impl LogDestination {
    fn file_path(&self) -> Option<&Path> {
        match self {
            LogDestination::Console => None,
            LogDestination::File(path) | LogDestination::Both(path) => Some(path),
        }
    }

    fn writes_console(&self) -> bool {
        !matches!(self, LogDestination::File(_))
    }
}

/// One JSON log line
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonLogEntry {
    pub timestamp: String,
    pub level: String,
    pub target: String,
    pub message: String,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub console_level: LevelFilter,
    pub file_level: Option<LevelFilter>,
    pub format: LogFormat,
    pub destination: LogDestination,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console_level: LevelFilter::Info,
            file_level: None,
            format: LogFormat::Text,
            destination: LogDestination::Console,
        }
    }
}

impl LogConfig {
    /// Most verbose level any destination accepts
    pub fn max_level(&self) -> LevelFilter {
        let console = if self.destination.writes_console() {
            self.console_level
        } else {
            LevelFilter::Off
        };
        match self.file_level {
            Some(file_level) if file_level > console => file_level,
            _ => console,
        }
    }
}

/// `log` backend writing formatted lines to stderr and/or a file
pub struct BusLogger {
    config: LogConfig,
    file: Option<Mutex<File>>,
}

impl BusLogger {
    /// Create the logger, opening the log file up front
    pub fn new(config: LogConfig) -> Result<Self> {
        let file = match config.destination.file_path() {
            Some(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("Failed to open log file: {}", path.display()))?;
                Some(Mutex::new(file))
            }
            None => None,
        };
        Ok(Self { config, file })
    }

    fn format_timestamp() -> String {
        let now: DateTime<Local> = Local::now();
        now.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    fn format_line(&self, level: Level, target: &str, message: &str) -> String {
        let timestamp = Self::format_timestamp();
        match self.config.format {
            LogFormat::Text => format!(
                "{} [{}] {}: {}",
                timestamp,
                level.to_string().to_uppercase(),
                target,
                message
            ),
            LogFormat::Json => {
                let entry = JsonLogEntry {
                    timestamp,
                    level: level.to_string().to_uppercase(),
                    target: target.to_string(),
                    message: message.to_string(),
                };
                serde_json::to_string(&entry).unwrap_or_else(|e| {
                    format!("{{\"level\":\"ERROR\",\"message\":\"unserialisable log entry: {}\"}}", e)
                })
            }
        }
    }

    fn console_accepts(&self, level: Level) -> bool {
        self.config.destination.writes_console() && level <= self.config.console_level
    }

    fn file_accepts(&self, level: Level) -> bool {
        self.file.is_some() && self.config.file_level.is_some_and(|file_level| level <= file_level)
    }
}

impl log::Log for BusLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.console_accepts(metadata.level()) || self.file_accepts(metadata.level())
    }

    fn log(&self, record: &log::Record) {
        let level = record.level();
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = self.format_line(level, record.target(), &record.args().to_string());

        if self.console_accepts(level) {
            let _ = writeln!(io::stderr(), "{}", line);
        }
        if self.file_accepts(level) {
            if let Some(file) = &self.file {
                if let Err(e) = writeln!(file.lock(), "{}", line) {
                    let _ = writeln!(io::stderr(), "File logging error: {}", e);
                }
            }
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
        if let Some(file) = &self.file {
            let _ = file.lock().flush();
        }
    }
}

/// Install the sink as the process logger
pub fn init_logger(config: LogConfig) -> Result<()> {
    let max_level = config.max_level();
    let logger = BusLogger::new(config)?;

    log::set_boxed_logger(Box::new(logger)).context("Failed to set global logger")?;
    log::set_max_level(max_level);
    Ok(())
}

/// Convert string to LevelFilter
pub fn parse_log_level(level_str: &str) -> Result<LevelFilter> {
    match level_str.to_lowercase().as_str() {
        "error" => Ok(LevelFilter::Error),
        "warn" => Ok(LevelFilter::Warn),
        "info" => Ok(LevelFilter::Info),
        "debug" => Ok(LevelFilter::Debug),
        "trace" => Ok(LevelFilter::Trace),
        "off" => Ok(LevelFilter::Off),
        _ => Err(anyhow::anyhow!(
            "Invalid log level: {}. Valid levels: error, warn, info, debug, trace, off",
            level_str
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Log;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("invalid".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(parse_log_level("error").unwrap(), LevelFilter::Error);
        assert_eq!(parse_log_level("TRACE").unwrap(), LevelFilter::Trace);
        assert_eq!(parse_log_level("off").unwrap(), LevelFilter::Off);
        assert!(parse_log_level("invalid").is_err());
    }

    #[test]
    fn test_max_level_covers_every_destination() {
        let config = LogConfig {
            console_level: LevelFilter::Warn,
            file_level: Some(LevelFilter::Debug),
            format: LogFormat::Text,
            destination: LogDestination::Both(PathBuf::from("unused.log")),
        };
        assert_eq!(config.max_level(), LevelFilter::Debug);

        let config = LogConfig {
            file_level: Some(LevelFilter::Error),
            destination: LogDestination::File(PathBuf::from("unused.log")),
            ..LogConfig::default()
        };
        assert_eq!(config.max_level(), LevelFilter::Error);
        assert_eq!(LogConfig::default().max_level(), LevelFilter::Info);
    }

    #[test]
    fn test_text_line_formatting() {
        let logger = BusLogger::new(LogConfig::default()).unwrap();
        let line = logger.format_line(Level::Debug, "wildbus::bus", "Registered listener 1");
        assert!(line.contains("[DEBUG]"));
        assert!(line.contains("wildbus::bus: Registered listener 1"));
        assert_eq!(line.chars().nth(4), Some('-'));
        assert_eq!(line.chars().nth(10), Some(' '));
    }

    #[test]
    fn test_json_line_formatting() {
        let logger = BusLogger::new(LogConfig {
            format: LogFormat::Json,
            ..LogConfig::default()
        })
        .unwrap();
        let line = logger.format_line(Level::Info, "wildbus", "Cleared 2 listener(s)");
        let entry: JsonLogEntry = serde_json::from_str(&line).unwrap();
        assert_eq!(entry.level, "INFO");
        assert_eq!(entry.target, "wildbus");
        assert_eq!(entry.message, "Cleared 2 listener(s)");
    }

    #[test]
    fn test_init_logger_installs_once() {
        let config = LogConfig {
            console_level: LevelFilter::Error,
            ..LogConfig::default()
        };
        assert!(init_logger(config.clone()).is_ok());
        assert_eq!(log::max_level(), LevelFilter::Error);
        assert!(init_logger(config).is_err());
    }

    #[test]
    fn test_file_destination_receives_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bus.log");
        let logger = BusLogger::new(LogConfig {
            console_level: LevelFilter::Off,
            file_level: Some(LevelFilter::Debug),
            format: LogFormat::Text,
            destination: LogDestination::File(path.clone()),
        })
        .unwrap();

        logger.log(
            &log::Record::builder()
                .level(Level::Debug)
                .target("wildbus::bus::dispatcher")
                .args(format_args!("Emitted 'user.login'"))
                .build(),
        );
        logger.log(
            &log::Record::builder()
                .level(Level::Trace)
                .target("wildbus::bus::dispatcher")
                .args(format_args!("too verbose"))
                .build(),
        );
        logger.flush();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Emitted 'user.login'"));
        assert!(!content.contains("too verbose"));
    }
}
