//! Application initialization and configuration

use anyhow::{Context, Result};
use std::sync::Arc;
use log::{debug, error, info};
use crate::options::{FileOptionStore, MemoryOptionStore, OptionStore};
use crate::plugin::{builtin, BindingManager, PluginContext, PluginManager};
use crate::{cli, config, logging};

/// Registries and shared services every command works against
pub struct Registries {
    pub manager: PluginManager,
    pub bindings: BindingManager,
    pub context: PluginContext,
}

pub fn load_configuration(args: &cli::Args) -> Result<config::ConfigManager> {
    let mut manager = if let Some(config_file) = &args.config_file {
        debug!("Loading configuration from explicit file: {}", config_file.display());
        config::ConfigManager::load_from_file(config_file.clone())?
    } else {
        config::ConfigManager::load()?
    };

    if let Some(section_name) = &args.config_name {
        debug!("Selecting configuration section: {}", section_name);
        manager.select_section(section_name.clone());
    }

    Ok(manager)
}

pub fn configure_logging(args: &cli::Args, config: &config::ConfigManager) -> Result<logging::LogConfig> {
    use log::LevelFilter;
    use std::str::FromStr;

    let console_level = if args.debug {
        LevelFilter::Trace
    } else if args.verbose {
        LevelFilter::Debug
    } else if args.quiet {
        LevelFilter::Error
    } else {
        match config.get_log_level("base", "console-level") {
            Ok(Some(level)) => {
                debug!("Using console log level from config: {:?}", level);
                level
            }
            Ok(None) => LevelFilter::Info,
            Err(e) => {
                debug!("Invalid console-level in config, using default: {}", e);
                LevelFilter::Info
            }
        }
    };

    debug!("Console log level set to: {:?}", console_level);

    let format = if !args.log_format.is_empty() && args.log_format != "text" {
        logging::LogFormat::from_str(&args.log_format).map_err(|e| anyhow::anyhow!(e))?
    } else {
        match config.get_value("base", "log-format") {
            Some(format_str) => {
                debug!("Using log format from config: {}", format_str);
                logging::LogFormat::from_str(format_str).unwrap_or(logging::LogFormat::Text)
            }
            None => logging::LogFormat::Text,
        }
    };

    let log_file_path = args.log_file.clone().or_else(|| config.get_path("base", "log-file"));

    let file_log_level = match &args.log_file_level {
        Some(level_str) => Some(logging::parse_log_level(level_str)?),
        None => match config.get_log_level("base", "file-log-level") {
            Ok(level) => level,
            Err(e) => {
                debug!("Invalid file-log-level in config, using None: {}", e);
                None
            }
        },
    };

    let (destination, file_level) = match (log_file_path, file_log_level) {
        (Some(file_path), Some(level)) => {
            debug!("File logging enabled: {} (level: {:?})", file_path.display(), level);
            (logging::LogDestination::Both(file_path), Some(level))
        }
        (Some(file_path), None) => {
            debug!("File logging enabled: {} (same level as console)", file_path.display());
            (logging::LogDestination::Both(file_path), Some(console_level))
        }
        (None, None) => (logging::LogDestination::Console, None),
        (None, Some(_)) => {
            error!("Log file level specified without log file");
            return Err(anyhow::anyhow!("Log file level specified without log file"));
        }
    };

    Ok(logging::LogConfig {
        console_level,
        file_level,
        format,
        destination,
    })
}

/// Option store selected by `[options] store`, in memory when unset
pub fn create_option_store(config: &config::ConfigManager) -> Result<Arc<dyn OptionStore>> {
    match config.get_option_store_path() {
        Some(path) => {
            let store = FileOptionStore::open(&path)
                .with_context(|| format!("Failed to open option store {}", path.display()))?;
            Ok(Arc::new(store))
        }
        None => {
            debug!("No option store configured, options will not persist");
            Ok(Arc::new(MemoryOptionStore::new()))
        }
    }
}

/// Build the plugin and binding registries from configuration
pub fn build_registries(config: &config::ConfigManager) -> Result<Registries> {
    let settings = config.get_plugin_settings().context("Invalid plugin settings")?;

    let class_list = match config.get_installed_plugins()? {
        Some(class_list) => class_list,
        None => builtin::default_class_list(),
    };
    let disabled = config.get_disabled_plugins()?;

    let catalog = Arc::new(builtin::catalog(settings.clone()));
    let manager = PluginManager::new(catalog, class_list).with_disabled(disabled);

    let bindings = BindingManager::new();
    builtin::register_bindings(&bindings, &settings);

    let context = PluginContext::new(create_option_store(config)?, settings);

    info!(
        "Registries ready: {} plugins, {} bindings",
        manager.len(),
        bindings.names().len()
    );

    Ok(Registries {
        manager,
        bindings,
        context,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Args, Command, VersionFilter};
    use crate::config::{ConfigManager, Configuration};
    use log::LevelFilter;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn args() -> Args {
        Args {
            verbose: false,
            quiet: false,
            debug: false,
            log_format: "text".to_string(),
            log_file: None,
            log_file_level: None,
            config_file: None,
            config_name: None,
            command: Command::List { project: None, version: VersionFilter::Any },
        }
    }

    fn config(entries: &[(&str, &str, &str)]) -> ConfigManager {
        let mut config: Configuration = HashMap::new();
        for (section, key, value) in entries {
            config
                .entry(section.to_string())
                .or_default()
                .insert(key.to_string(), value.to_string());
        }
        ConfigManager::from_config(config)
    }

    #[test]
    fn test_configure_logging_flags_override_config() {
        let config = config(&[("base", "console-level", "warn"), ("base", "log-format", "json")]);

        let log_config = configure_logging(&args(), &config).unwrap();
        assert_eq!(log_config.console_level, LevelFilter::Warn);
        assert_eq!(log_config.format, logging::LogFormat::Json);

        let verbose = Args { verbose: true, ..args() };
        assert_eq!(configure_logging(&verbose, &config).unwrap().console_level, LevelFilter::Debug);
    }

    #[test]
    fn test_configure_logging_file_level_defaults_to_console() {
        let with_file = Args {
            log_file: Some(PathBuf::from("plugins.log")),
            ..args()
        };
        let log_config = configure_logging(&with_file, &config(&[])).unwrap();
        assert_eq!(log_config.destination, logging::LogDestination::Both(PathBuf::from("plugins.log")));
        assert_eq!(log_config.file_level, Some(LevelFilter::Info));
    }

    #[test]
    fn test_build_registries_defaults() {
        let registries = build_registries(&config(&[])).unwrap();
        assert_eq!(registries.manager.len(), builtin::default_class_list().len());
        assert!(registries.manager.exists("webhooks"));
        assert_eq!(registries.bindings.provider_ids("repository.provider").unwrap(), vec!["github"]);
    }

    #[test]
    fn test_build_registries_installed_and_disabled() {
        let registries = build_registries(&config(&[
            (
                "plugins",
                "installed",
                "sentry_plugins.webhooks.WebHooksPlugin, sentry_plugins.splunk.SplunkPlugin",
            ),
            ("plugins", "disabled", "splunk"),
        ]))
        .unwrap();

        assert!(registries.manager.exists("webhooks"));
        assert!(!registries.manager.exists("github"));
        assert!(!registries.manager.exists("splunk"));
        assert_eq!(registries.manager.class_paths().len(), 2);
    }

    #[test]
    fn test_file_option_store_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("options.json");
        let config = config(&[("options", "store", path.to_str().unwrap())]);

        let registries = build_registries(&config).unwrap();
        registries
            .context
            .set_option("webhooks:urls", serde_json::json!("http://example.com"), Some(1), None)
            .unwrap();

        let reopened = build_registries(&config).unwrap();
        assert_eq!(
            reopened.context.get_option("webhooks:urls", Some(1), None).unwrap(),
            Some(serde_json::json!("http://example.com"))
        );
    }
}
