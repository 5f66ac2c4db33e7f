use clap::{Parser, Subcommand, ValueEnum};
use anyhow::Result;
use std::path::PathBuf;
use log::debug;

use crate::plugin::PluginVersion;

/// Legacy plugin system for Sentry integrations
#[derive(Parser, Debug)]
#[command(name = "sentry-plugins")]
#[command(about = "Inspect, configure and exercise Sentry plugins and their bindings")]
#[command(version)]
pub struct Args {
    /// Verbose output (debug level logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet output (error level logging only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Debug output (trace level logging)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Log format: text or json
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    pub log_format: String,

    /// Log file path for file output
    #[arg(long, value_name = "FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Log level for file output (independent of console level)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_file_level: Option<String>,

    /// Configuration file path
    #[arg(long, value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Configuration section name
    #[arg(long, value_name = "SECTION", global = true)]
    pub config_name: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List installed plugins, or those enabled for a project
    List {
        #[arg(long, value_name = "ID")]
        project: Option<u64>,

        /// Plugin API version to include
        #[arg(long, value_enum, default_value = "any")]
        version: VersionFilter,
    },

    /// Show a plugin's descriptor and configuration fields
    Show {
        slug: String,
    },

    /// Read or change stored plugin options
    Options {
        #[command(subcommand)]
        action: OptionsAction,
    },

    /// Enable a plugin for a project
    Enable {
        slug: String,
        #[arg(long, value_name = "ID")]
        project: u64,
    },

    /// Disable a plugin for a project
    Disable {
        slug: String,
        #[arg(long, value_name = "ID")]
        project: u64,
    },

    /// List binding names and their provider ids
    Bindings {
        name: Option<String>,
    },

    /// Run the post-processing pipeline over an event file
    Process {
        #[arg(value_name = "EVENT")]
        event: PathBuf,

        /// Project the event belongs to (defaults to the event's project_id)
        #[arg(long, value_name = "ID")]
        project: Option<u64>,

        /// Group the event belongs to (defaults to the event's group_id)
        #[arg(long, value_name = "ID")]
        group: Option<u64>,

        /// Organization owning the project (defaults to the event's organization_id)
        #[arg(long, value_name = "ID")]
        organization: Option<u64>,
    },

    /// Send a sample notification through a notification plugin
    TestConfig {
        slug: String,
        #[arg(long, value_name = "ID")]
        project: u64,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum OptionsAction {
    /// Print an option value
    Get {
        slug: String,
        name: String,
        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// Store an option value (parsed as JSON, falling back to a string)
    Set {
        slug: String,
        name: String,
        value: String,
        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// Remove an option value
    Unset {
        slug: String,
        name: String,
        #[command(flatten)]
        scope: ScopeArgs,
    },
}

/// Storage scope selected by `--project` and `--user`
#[derive(clap::Args, Debug, Clone, Default, PartialEq)]
pub struct ScopeArgs {
    #[arg(long, value_name = "ID")]
    pub project: Option<u64>,

    #[arg(long, value_name = "ID")]
    pub user: Option<u64>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionFilter {
    #[value(name = "1")]
    V1,
    #[value(name = "2")]
    V2,
    Any,
}

impl VersionFilter {
    pub fn as_version(self) -> Option<PluginVersion> {
        match self {
            VersionFilter::V1 => Some(PluginVersion::V1),
            VersionFilter::V2 => Some(PluginVersion::V2),
            VersionFilter::Any => None,
        }
    }
}

pub fn parse_args() -> Args {
    Args::parse()
}

pub fn validate_args(args: &Args) -> Result<()> {
    if args.verbose && args.quiet {
        return Err(anyhow::anyhow!("Cannot specify both --verbose and --quiet"));
    }

    if args.debug && args.quiet {
        return Err(anyhow::anyhow!("Cannot specify both --debug and --quiet"));
    }

    if !matches!(args.log_format.to_lowercase().as_str(), "text" | "json") {
        return Err(anyhow::anyhow!(
            "Invalid log format: {}. Valid options: text, json",
            args.log_format
        ));
    }

    if let Some(ref level) = args.log_file_level {
        crate::logging::parse_log_level(level)?;
    }

    if args.log_file_level.is_some() && args.log_file.is_none() {
        return Err(anyhow::anyhow!("--log-file-level requires --log-file to be specified"));
    }

    if let Command::Options { action: OptionsAction::Set { value, .. } } = &args.command {
        if value.is_empty() {
            return Err(anyhow::anyhow!("Option value must not be empty; use `options unset` instead"));
        }
    }

    debug!("Arguments validated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn create_test_args(command: Command) -> Args {
        Args {
            verbose: false,
            quiet: false,
            debug: false,
            log_format: "text".to_string(),
            log_file: None,
            log_file_level: None,
            config_file: None,
            config_name: None,
            command,
        }
    }

    fn list_command() -> Command {
        Command::List { project: None, version: VersionFilter::Any }
    }

    #[test]
    fn test_command_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_list_with_version() {
        let args = Args::try_parse_from(["sentry-plugins", "list", "--project", "3", "--version", "2"]).unwrap();
        assert_eq!(
            args.command,
            Command::List { project: Some(3), version: VersionFilter::V2 }
        );
    }

    #[test]
    fn test_parse_options_set_with_scope() {
        let args = Args::try_parse_from([
            "sentry-plugins", "options", "set", "webhooks", "urls", "http://example.com", "--project", "1",
        ])
        .unwrap();
        assert_eq!(
            args.command,
            Command::Options {
                action: OptionsAction::Set {
                    slug: "webhooks".to_string(),
                    name: "urls".to_string(),
                    value: "http://example.com".to_string(),
                    scope: ScopeArgs { project: Some(1), user: None },
                }
            }
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::try_parse_from(["sentry-plugins", "bindings", "--verbose", "--log-format", "json"]).unwrap();
        assert!(args.verbose);
        assert_eq!(args.log_format, "json");
        assert_eq!(args.command, Command::Bindings { name: None });
    }

    #[test]
    fn test_process_organization_flag() {
        let args = Args::try_parse_from(["sentry-plugins", "process", "event.json", "--organization", "12"]).unwrap();
        assert_eq!(
            args.command,
            Command::Process {
                event: PathBuf::from("event.json"),
                project: None,
                group: None,
                organization: Some(12),
            }
        );
    }

    #[test]
    fn test_enable_requires_project() {
        assert!(Args::try_parse_from(["sentry-plugins", "enable", "github"]).is_err());
        assert!(Args::try_parse_from(["sentry-plugins", "test-config", "webhooks"]).is_err());
    }

    #[test]
    fn test_invalid_version_rejected() {
        assert!(Args::try_parse_from(["sentry-plugins", "list", "--version", "3"]).is_err());
    }

    #[test]
    fn test_version_filter() {
        assert_eq!(VersionFilter::V1.as_version(), Some(PluginVersion::V1));
        assert_eq!(VersionFilter::V2.as_version(), Some(PluginVersion::V2));
        assert_eq!(VersionFilter::Any.as_version(), None);
    }

    #[test]
    fn test_validate_args_success() {
        let args = Args {
            verbose: true,
            log_format: "json".to_string(),
            ..create_test_args(list_command())
        };
        assert!(validate_args(&args).is_ok());
    }

    #[test]
    fn test_validate_args_conflicting_flags() {
        let args = Args {
            verbose: true,
            quiet: true,
            ..create_test_args(list_command())
        };
        assert!(validate_args(&args).is_err());

        let args = Args {
            debug: true,
            quiet: true,
            ..create_test_args(list_command())
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_invalid_format() {
        let args = Args {
            log_format: "invalid".to_string(),
            ..create_test_args(list_command())
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_file_level_without_file() {
        let args = Args {
            log_file_level: Some("debug".to_string()),
            ..create_test_args(list_command())
        };
        assert!(validate_args(&args).is_err());

        let args = Args {
            log_file: Some(PathBuf::from("plugins.log")),
            log_file_level: Some("loud".to_string()),
            ..create_test_args(list_command())
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_empty_option_value() {
        let args = create_test_args(Command::Options {
            action: OptionsAction::Set {
                slug: "splunk".to_string(),
                name: "index".to_string(),
                value: String::new(),
                scope: ScopeArgs::default(),
            },
        });
        assert!(validate_args(&args).is_err());
    }
}
