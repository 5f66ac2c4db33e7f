use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Context, Result};
use toml::Value;
use log::{debug, info};
use crate::plugin::settings::PluginSettings;

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV: &str = "SENTRY_PLUGINS_CONFIG";

/// Configuration storage - section_name -> key -> value
pub type Configuration = HashMap<String, HashMap<String, String>>;

/// Configuration manager
pub struct ConfigManager {
    config: Configuration,
    config_file_path: Option<PathBuf>,
    selected_section: Option<String>,
}

impl ConfigManager {
    /// Create a new ConfigManager from a Configuration (primarily for testing)
    pub fn from_config(config: Configuration) -> Self {
        Self {
            config,
            config_file_path: None,
            selected_section: None,
        }
    }

    /// Load configuration using discovery hierarchy
    pub fn load() -> Result<Self> {
        debug!("Starting configuration discovery");

        for path in discover_config_files() {
            debug!("Attempting to load config from: {}", path.display());
            if path.exists() {
                return Self::load_from_file(path);
            }
        }

        info!("No configuration file found, using empty configuration");
        Ok(Self::from_config(Configuration::new()))
    }

    /// Load configuration from explicit file path
    pub fn load_from_file(path: PathBuf) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = parse_toml_config(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        info!("Loaded configuration from: {}", path.display());
        Ok(Self {
            config,
            config_file_path: Some(path),
            selected_section: None,
        })
    }

    pub fn config_file_path(&self) -> Option<&Path> {
        self.config_file_path.as_deref()
    }

    /// Get value from configuration with section fallback
    pub fn get_value(&self, section: &str, key: &str) -> Option<&String> {
        // Priority: selected_section -> specified section -> base
        if let Some(selected) = &self.selected_section {
            if let Some(value) = self.config.get(selected).and_then(|s| s.get(key)) {
                return Some(value);
            }
        }

        if let Some(value) = self.config.get(section).and_then(|s| s.get(key)) {
            return Some(value);
        }

        self.config.get("base").and_then(|s| s.get(key))
    }

    /// Select configuration section for --config-name
    pub fn select_section(&mut self, section: String) {
        debug!("Selecting configuration section: {}", section);
        self.selected_section = Some(section);
    }

    /// Get boolean value with type conversion
    pub fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>> {
        match self.get_value(section, key) {
            Some(value) => match value.to_lowercase().as_str() {
                "true" => Ok(Some(true)),
                "false" => Ok(Some(false)),
                _ => Err(anyhow::anyhow!("Invalid boolean value for {}.{}: {}", section, key, value)),
            },
            None => Ok(None),
        }
    }

    pub fn get_u64(&self, section: &str, key: &str) -> Result<Option<u64>> {
        match self.get_value(section, key) {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map(Some)
                .with_context(|| format!("Invalid number for {}.{}: {}", section, key, value)),
            None => Ok(None),
        }
    }

    /// Get list value; accepts a TOML array or a comma separated string
    pub fn get_list(&self, section: &str, key: &str) -> Result<Option<Vec<String>>> {
        match self.get_value(section, key) {
            Some(value) => parse_list(value)
                .map(Some)
                .with_context(|| format!("Invalid list for {}.{}: {}", section, key, value)),
            None => Ok(None),
        }
    }

    /// Get log level value with type conversion
    pub fn get_log_level(&self, section: &str, key: &str) -> Result<Option<log::LevelFilter>> {
        match self.get_value(section, key) {
            Some(value) => Ok(Some(crate::logging::parse_log_level(value)?)),
            None => Ok(None),
        }
    }

    /// Get path value with type conversion
    pub fn get_path(&self, section: &str, key: &str) -> Option<PathBuf> {
        self.get_value(section, key).map(PathBuf::from)
    }

    /// Plugin settings from the `[http]`, `[server]` and `[ratelimit]` sections
    pub fn get_plugin_settings(&self) -> Result<PluginSettings> {
        let mut settings = PluginSettings::default();

        if let Some(url_prefix) = self.get_value("server", "url-prefix") {
            settings = settings.with_url_prefix(url_prefix);
        }

        if let Some(timeout) = self.get_u64("http", "timeout")? {
            if timeout == 0 {
                anyhow::bail!("http.timeout must be greater than zero");
            }
            settings = settings.with_http_timeout(Duration::from_secs(timeout));
        }

        if let Some(user_agent) = self.get_value("http", "user-agent") {
            settings.user_agent = user_agent.clone();
        }

        let limit = self.get_u64("ratelimit", "notify-limit")?;
        let window = self.get_u64("ratelimit", "notify-window")?;
        if limit.is_some() || window.is_some() {
            let limit = match limit {
                Some(limit) => u32::try_from(limit).context("ratelimit.notify-limit is too large")?,
                None => settings.notify_limit,
            };
            let window = window.map(Duration::from_secs).unwrap_or(settings.notify_window);
            settings = settings.with_notify_limit(limit, window);
        }

        Ok(settings)
    }

    /// Installed plugin class paths; `None` means the built-in default list
    pub fn get_installed_plugins(&self) -> Result<Option<Vec<String>>> {
        self.get_list("plugins", "installed")
    }

    /// Slugs disabled for the whole installation
    pub fn get_disabled_plugins(&self) -> Result<Vec<String>> {
        Ok(self.get_list("plugins", "disabled")?.unwrap_or_default())
    }

    /// Path of the file-backed option store, if configured
    pub fn get_option_store_path(&self) -> Option<PathBuf> {
        self.get_path("options", "store")
    }
}

/// Discover configuration files in order of precedence
fn discover_config_files() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // 1. Environment variable
    if let Ok(env_path) = env::var(CONFIG_ENV) {
        paths.push(PathBuf::from(env_path));
    }

    // 2. XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("sentry-plugins").join("config.toml"));
    }

    // 3. Home directory
    if let Some(home_dir) = dirs::home_dir() {
        paths.push(home_dir.join(".sentry-plugins.toml"));
    }

    // 4. Working directory
    paths.push(PathBuf::from("./.sentry-plugins.toml"));

    debug!("Config discovery paths: {:?}", paths);
    paths
}

fn parse_list(raw: &str) -> Result<Vec<String>> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        let table: toml::Table = format!("list = {}", trimmed).parse().context("Failed to parse TOML array")?;
        let items = match table.get("list") {
            Some(Value::Array(items)) => items,
            _ => anyhow::bail!("Expected an array"),
        };
        return Ok(items.iter().map(toml_value_to_string).filter(|s| !s.is_empty()).collect());
    }

    Ok(trimmed
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect())
}

/// Parse TOML content to string-based configuration
fn parse_toml_config(content: &str) -> Result<Configuration> {
    let toml_value: Value = content.parse().context("Failed to parse TOML content")?;

    let mut config = Configuration::new();

    if let Value::Table(table) = toml_value {
        flatten_toml_table(&table, String::new(), &mut config);
    }

    debug!("Parsed configuration sections: {:?}", config.keys().collect::<Vec<_>>());
    Ok(config)
}

/// Recursively flatten TOML tables into section.subsection format
fn flatten_toml_table(table: &toml::Table, prefix: String, config: &mut Configuration) {
    for (key, value) in table {
        let section_name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            Value::Table(subtable) => {
                if subtable.values().all(|v| !matches!(v, Value::Table(_))) {
                    let section_map = subtable
                        .iter()
                        .map(|(subkey, subvalue)| (subkey.clone(), toml_value_to_string(subvalue)))
                        .collect();
                    config.insert(section_name, section_map);
                } else {
                    flatten_toml_table(subtable, section_name, config);
                }
            }
            _ => {
                config
                    .entry(if prefix.is_empty() { "base".to_string() } else { prefix.clone() })
                    .or_default()
                    .insert(key.clone(), toml_value_to_string(value));
            }
        }
    }
}

/// Convert TOML Value to string representation
fn toml_value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Array(_) | Value::Table(_) => value.to_string(),
        Value::Datetime(d) => d.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::NamedTempFile;

    fn manager(content: &str) -> ConfigManager {
        ConfigManager::from_config(parse_toml_config(content).unwrap())
    }

    #[test]
    fn test_toml_value_to_string_conversion() {
        assert_eq!(toml_value_to_string(&Value::String("test".to_string())), "test");
        assert_eq!(toml_value_to_string(&Value::Integer(42)), "42");
        assert_eq!(toml_value_to_string(&Value::Boolean(false)), "false");
    }

    #[test]
    fn test_parse_toml_config() {
        let config = parse_toml_config(
            r#"
[base]
log-format = "json"

[plugins]
installed = ["sentry_plugins.webhooks.WebHooksPlugin"]
"#,
        )
        .unwrap();

        assert_eq!(config["base"]["log-format"], "json");
        assert!(config["plugins"]["installed"].starts_with('['));
    }

    #[test]
    fn test_section_fallback_and_selection() {
        let mut manager = manager(
            r#"
[base]
quiet = true
log-format = "text"

[staging]
log-format = "json"
"#,
        );

        assert_eq!(manager.get_value("http", "quiet").unwrap(), "true");
        assert_eq!(manager.get_value("base", "log-format").unwrap(), "text");

        manager.select_section("staging".to_string());
        assert_eq!(manager.get_value("base", "log-format").unwrap(), "json");
    }

    #[test]
    fn test_type_conversion() {
        let manager = manager(
            r#"
[base]
debug = true
invalid-bool = "maybe"
log-level = "info"

[http]
timeout = 5
"#,
        );

        assert_eq!(manager.get_bool("base", "debug").unwrap(), Some(true));
        assert!(manager.get_bool("base", "invalid-bool").is_err());
        assert_eq!(manager.get_log_level("base", "log-level").unwrap(), Some(log::LevelFilter::Info));
        assert_eq!(manager.get_u64("http", "timeout").unwrap(), Some(5));
        assert!(manager.get_u64("base", "log-level").is_err());
    }

    #[test]
    fn test_lists() {
        let manager = manager(
            r#"
[plugins]
installed = ["a.B", "c.D"]
disabled = "webhooks, pagerduty"
"#,
        );

        assert_eq!(manager.get_installed_plugins().unwrap(), Some(vec!["a.B".to_string(), "c.D".to_string()]));
        assert_eq!(manager.get_disabled_plugins().unwrap(), vec!["webhooks", "pagerduty"]);
        assert!(ConfigManager::from_config(Configuration::new()).get_installed_plugins().unwrap().is_none());
    }

    #[test]
    fn test_plugin_settings() {
        let manager = manager(
            r#"
[server]
url-prefix = "https://sentry.example.com/"

[http]
timeout = 10
user-agent = "custom/1.0"

[ratelimit]
notify-limit = 3
"#,
        );

        let settings = manager.get_plugin_settings().unwrap();
        assert_eq!(settings.url_prefix, "https://sentry.example.com");
        assert_eq!(settings.http_timeout, Duration::from_secs(10));
        assert_eq!(settings.user_agent, "custom/1.0");
        assert_eq!(settings.notify_limit, 3);
        assert_eq!(settings.notify_window, PluginSettings::default().notify_window);
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let manager = manager("[http]\ntimeout = 0\n");
        assert!(manager.get_plugin_settings().is_err());
    }

    #[test]
    fn test_config_file_loading() {
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(&temp_file, "[options]\nstore = \"/tmp/options.json\"\n").unwrap();

        let manager = ConfigManager::load_from_file(temp_file.path().to_path_buf()).unwrap();
        assert_eq!(manager.get_option_store_path(), Some(PathBuf::from("/tmp/options.json")));
        assert_eq!(manager.config_file_path(), Some(temp_file.path()));
    }
}
