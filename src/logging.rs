// Logging module for sentry-plugins
// Implements the `log` facade for the CLI and the plugin runtime.
//
// Records carry their target, so plugin output can be told apart by its
// `sentry.plugins.<slug>` target. Console and file destinations have
// independent levels; HTTP stack crates are held back to warnings unless
// trace logging is requested.
//
// Example usage:
// ```
// let config = LogConfig {
//     console_level: LevelFilter::Info,
//     file_level: Some(LevelFilter::Debug),
//     format: LogFormat::Json,
//     destination: LogDestination::Both(PathBuf::from("plugins.log")),
// };
// init_logger(config)?;
// log::info!(target: "sentry.plugins.webhooks", "webhook.sent url={}", url);
// ```

use log::{Level, LevelFilter};
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};

/// Targets of dependency crates that only log at warn or above
const QUIET_TARGETS: &[&str] = &["hyper", "reqwest", "rustls", "h2", "tokio_util", "wiremock"];

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
    fn path(&self) -> Option<&Path> {
        match self {
            LogDestination::Console => None,
            LogDestination::File(path) | LogDestination::Both(path) => Some(path),
        }
    }
}

/// JSON log entry structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonLogEntry {
    pub timestamp: String,
    pub level: String,
    pub target: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
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
        match self.file_level {
            Some(file_level) if file_level > self.console_level => file_level,
            _ => self.console_level,
        }
    }
}

/// Logger writing formatted records to stderr and/or a file
pub struct PluginsLogger {
    config: LogConfig,
    file: Mutex<Option<File>>,
}

impl PluginsLogger {
    pub fn new(config: LogConfig) -> Self {
        Self {
            config,
            file: Mutex::new(None),
        }
    }

    fn format_timestamp() -> String {
        let now: DateTime<Local> = Local::now();
        now.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    fn format_text_message(&self, level: Level, target: &str, message: &str) -> String {
        format!(
            "{} [{}] {}: {}",
            Self::format_timestamp(),
            level.to_string().to_uppercase(),
            target,
            message
        )
    }

    fn format_json_message(&self, level: Level, target: &str, message: &str) -> Result<String> {
        let entry = JsonLogEntry {
            timestamp: Self::format_timestamp(),
            level: level.to_string().to_uppercase(),
            target: target.to_string(),
            message: message.to_string(),
            detail: None,
        };

        serde_json::to_string(&entry).context("Failed to serialize log entry to JSON")
    }

    fn is_quiet_target(target: &str) -> bool {
        QUIET_TARGETS
            .iter()
            .any(|quiet| target == *quiet || target.starts_with(&format!("{}::", quiet)))
    }

    fn accepts(&self, level: Level, target: &str) -> bool {
        if Self::is_quiet_target(target) && level > Level::Warn && self.config.max_level() < LevelFilter::Trace {
            return false;
        }
        self.should_log_to_console(level) || self.should_log_to_file(level)
    }

    fn should_log_to_console(&self, level: Level) -> bool {
        !matches!(self.config.destination, LogDestination::File(_)) && level <= self.config.console_level
    }

    fn should_log_to_file(&self, level: Level) -> bool {
        match (self.config.destination.path(), self.config.file_level) {
            (Some(_), Some(file_level)) => level <= file_level,
            _ => false,
        }
    }

    fn write_to_console(&self, formatted_message: &str) -> Result<()> {
        writeln!(io::stderr(), "{}", formatted_message).context("Failed to write to console")
    }

    fn write_to_file(&self, formatted_message: &str, file_path: &Path) -> Result<()> {
        let mut guard = self.file.lock();
        if guard.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(file_path)
                .with_context(|| format!("Failed to open log file: {}", file_path.display()))?;
            *guard = Some(file);
        }
        match guard.as_mut() {
            Some(file) => writeln!(file, "{}", formatted_message).context("Failed to write to log file"),
            None => Ok(()),
        }
    }
}

impl log::Log for PluginsLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.accepts(metadata.level(), metadata.target())
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let message = record.args().to_string();
        let level = record.level();
        let target = record.target();

        let formatted_message = match self.config.format {
            LogFormat::Text => self.format_text_message(level, target, &message),
            LogFormat::Json => match self.format_json_message(level, target, &message) {
                Ok(json) => json,
                Err(e) => {
                    eprintln!("JSON formatting error: {}. Falling back to text format.", e);
                    self.format_text_message(level, target, &message)
                }
            },
        };

        if self.should_log_to_console(level) {
            if let Err(e) = self.write_to_console(&formatted_message) {
                eprintln!("Console logging error: {}", e);
            }
        }

        if let Some(path) = self.config.destination.path() {
            if self.should_log_to_file(level) {
                if let Err(e) = self.write_to_file(&formatted_message, path) {
                    eprintln!("File logging error: {}", e);
                }
            }
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
        if let Some(file) = self.file.lock().as_mut() {
            let _ = file.flush();
        }
    }
}

/// Initialize the logging system with the given configuration
pub fn init_logger(config: LogConfig) -> Result<()> {
    let max_level = config.max_level();
    log::set_boxed_logger(Box::new(PluginsLogger::new(config))).context("Failed to set global logger")?;
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
    use tempfile::TempDir;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("yaml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(parse_log_level("warn").unwrap(), LevelFilter::Warn);
        assert_eq!(parse_log_level("TRACE").unwrap(), LevelFilter::Trace);
        assert_eq!(parse_log_level("off").unwrap(), LevelFilter::Off);
        assert!(parse_log_level("verbose").is_err());
    }

    #[test]
    fn test_max_level() {
        let mut config = LogConfig::default();
        assert_eq!(config.max_level(), LevelFilter::Info);
        config.file_level = Some(LevelFilter::Debug);
        assert_eq!(config.max_level(), LevelFilter::Debug);
        config.file_level = Some(LevelFilter::Error);
        assert_eq!(config.max_level(), LevelFilter::Info);
    }

    #[test]
    fn test_timestamp_format() {
        let timestamp = PluginsLogger::format_timestamp();
        assert_eq!(timestamp.len(), 19);
        assert_eq!(timestamp.chars().nth(4), Some('-'));
        assert_eq!(timestamp.chars().nth(10), Some(' '));
        assert_eq!(timestamp.chars().nth(13), Some(':'));
    }

    #[test]
    fn test_message_formatting_includes_target() {
        let logger = PluginsLogger::new(LogConfig::default());

        let text = logger.format_text_message(Level::Warn, "sentry.plugins.github", "boom");
        assert!(text.ends_with("[WARN] sentry.plugins.github: boom"));

        let json = logger.format_json_message(Level::Info, "sentry.plugins.github", "boom").unwrap();
        let entry: JsonLogEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(entry.target, "sentry.plugins.github");
        assert_eq!(entry.level, "INFO");
        assert!(!json.contains("detail"));
    }

    #[test]
    fn test_quiet_targets() {
        let logger = PluginsLogger::new(LogConfig {
            console_level: LevelFilter::Debug,
            ..LogConfig::default()
        });

        assert!(logger.accepts(Level::Debug, "sentry.plugins.webhooks"));
        assert!(!logger.accepts(Level::Debug, "reqwest::connect"));
        assert!(logger.accepts(Level::Warn, "hyper"));
        assert!(!PluginsLogger::is_quiet_target("hyperlocal_app"));
    }

    #[test]
    fn test_file_destination() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plugins.log");
        let logger = PluginsLogger::new(LogConfig {
            console_level: LevelFilter::Off,
            file_level: Some(LevelFilter::Info),
            format: LogFormat::Text,
            destination: LogDestination::File(path.clone()),
        });

        logger.log(
            &log::Record::builder()
                .level(Level::Info)
                .target("sentry.plugins.splunk")
                .args(format_args!("forwarded"))
                .build(),
        );
        logger.flush();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("sentry.plugins.splunk: forwarded"));
    }
}
