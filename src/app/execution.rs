//! Command execution against the plugin registries

use anyhow::{Context, Result};
use std::path::Path;
use log::{debug, info, warn};
use serde_json::Value;
use crate::cli::{Command, OptionsAction, ScopeArgs, VersionFilter};
use crate::model::{Event, Group, Project, ProjectId};
use crate::plugin::{dispatch, ConfigField, FieldType, PluginVersion};
use super::initialization::Registries;
use super::output::{format_compact_table, format_properties, heading, yes_no};

/// Run one command, returning the text to print
pub async fn execute(command: &Command, registries: &Registries) -> Result<String> {
    debug!("Executing {:?}", command);
    match command {
        Command::List { project, version } => list_plugins(registries, *project, *version),
        Command::Show { slug } => show_plugin(registries, slug),
        Command::Options { action } => handle_options(registries, action),
        Command::Enable { slug, project } => set_enabled(registries, slug, *project, true),
        Command::Disable { slug, project } => set_enabled(registries, slug, *project, false),
        Command::Bindings { name } => list_bindings(registries, name.as_deref()),
        Command::Process { event, project, group, organization } => {
            process_event(registries, event, *project, *group, *organization).await
        }
        Command::TestConfig { slug, project } => test_config(registries, slug, *project).await,
    }
}

/// Project handle for an id given on the command line
fn cli_project(id: ProjectId) -> Project {
    Project::new(id, 0, &format!("project-{}", id))
}

fn version_label(version: PluginVersion) -> String {
    version.as_u8().to_string()
}

fn list_plugins(registries: &Registries, project: Option<ProjectId>, version: VersionFilter) -> Result<String> {
    let Registries { manager, context, .. } = registries;
    let version = version.as_version();

    let (title, plugins) = match project {
        Some(id) => (
            format!("Plugins enabled for project {}", id),
            manager.for_project(context, &cli_project(id), version),
        ),
        None => ("Installed plugins".to_string(), manager.all(version)),
    };

    let rows: Vec<Vec<String>> = plugins
        .iter()
        .map(|plugin| {
            let mut row = vec![
                plugin.slug().to_string(),
                plugin.title().to_string(),
                version_label(plugin.api_version()),
                plugin.plugin_type().as_str().to_string(),
            ];
            if let Some(id) = project {
                let configured = plugin.is_configured(context, &cli_project(id)).unwrap_or(false);
                row.push(yes_no(configured));
            }
            row
        })
        .collect();

    let mut output = format!("{}\n\n", heading(&title));
    if rows.is_empty() {
        output.push_str("  No plugins.\n");
    } else if project.is_some() {
        output.push_str(&format_compact_table(&["Slug", "Title", "Version", "Type", "Configured"], &rows));
    } else {
        output.push_str(&format_compact_table(&["Slug", "Title", "Version", "Type"], &rows));
    }
    Ok(output)
}

fn field_row(field: &ConfigField) -> Vec<String> {
    vec![
        field.name.clone(),
        field.label.clone(),
        format!("{:?}", field.field_type).to_lowercase(),
        yes_no(field.required),
        format!("{:?}", field.scope).to_lowercase(),
        field.default.as_ref().map(Value::to_string).unwrap_or_default(),
    ]
}

fn show_plugin(registries: &Registries, slug: &str) -> Result<String> {
    let plugin = registries.manager.get(slug)?;
    let descriptor = plugin.descriptor();

    let author = match (&descriptor.author, &descriptor.author_url) {
        (Some(name), Some(url)) => format!("{} <{}>", name, url),
        (Some(name), None) => name.clone(),
        _ => String::new(),
    };

    let mut output = format!("{}\n\n", heading(plugin.title()));
    output.push_str(&format_properties(&[
        ("slug", descriptor.slug.clone()),
        ("conf_key", descriptor.conf_key.clone()),
        ("conf_title", descriptor.conf_title.clone()),
        ("type", plugin.plugin_type().as_str().to_string()),
        ("version", version_label(descriptor.api_version)),
        ("features", descriptor.features.names().join(", ")),
        ("author", author),
        ("project_conf", yes_no(descriptor.project_conf)),
        ("site_conf", yes_no(descriptor.site_conf)),
        ("can_disable", yes_no(descriptor.can_disable)),
        ("default_enabled", yes_no(descriptor.project_default_enabled)),
    ]));

    if !descriptor.description.is_empty() {
        output.push_str(&format!("\n  {}\n", descriptor.description));
    }

    for link in &descriptor.resource_links {
        output.push_str(&format!("  {}: {}\n", link.title, link.url));
    }

    let rows: Vec<Vec<String>> = plugin.config_fields().iter().map(field_row).collect();
    if !rows.is_empty() {
        output.push_str(&format!("\n{}\n\n", heading("Configuration")));
        output.push_str(&format_compact_table(
            &["Name", "Label", "Type", "Required", "Scope", "Default"],
            &rows,
        ));
    }
    Ok(output)
}

/// Interpret a command-line value according to the field it is stored in
fn parse_option_value(field: Option<&ConfigField>, raw: &str) -> Value {
    match field.map(|field| field.field_type) {
        Some(FieldType::Bool) | Some(FieldType::Number) | None => {
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
        }
        Some(_) => Value::String(raw.to_string()),
    }
}

fn scope_label(scope: &ScopeArgs) -> String {
    match (scope.project, scope.user) {
        (None, None) => "global".to_string(),
        (Some(project), None) => format!("project {}", project),
        (None, Some(user)) => format!("user {}", user),
        (Some(project), Some(user)) => format!("user {} in project {}", user, project),
    }
}

fn handle_options(registries: &Registries, action: &OptionsAction) -> Result<String> {
    let ctx = &registries.context;
    match action {
        OptionsAction::Get { slug, name, scope } => {
            let plugin = registries.manager.get(slug)?;
            let value = plugin.get_option(ctx, name, scope.project, scope.user)?;
            Ok(match value {
                Some(value) => format!("{}\n", value),
                None => format!("{}:{} is not set ({})\n", plugin.conf_key(), name, scope_label(scope)),
            })
        }
        OptionsAction::Set { slug, name, value, scope } => {
            let plugin = registries.manager.get(slug)?;
            let fields = plugin.config_fields();
            let field = fields.iter().find(|field| &field.name == name);
            if field.is_none() && name != "enabled" {
                warn!("{} has no configuration field named {}", slug, name);
            }

            let parsed = parse_option_value(field, value);
            let cleaned = match field {
                Some(field) => field.clean(Some(&parsed))?.unwrap_or(Value::Null),
                None => parsed,
            };

            plugin.set_option(ctx, name, cleaned.clone(), scope.project, scope.user)?;
            info!("Set {}:{} for {}", plugin.conf_key(), name, scope_label(scope));
            Ok(format!("{}:{} = {} ({})\n", plugin.conf_key(), name, cleaned, scope_label(scope)))
        }
        OptionsAction::Unset { slug, name, scope } => {
            let plugin = registries.manager.get(slug)?;
            let removed = plugin.unset_option(ctx, name, scope.project, scope.user)?;
            Ok(if removed {
                format!("Removed {}:{} ({})\n", plugin.conf_key(), name, scope_label(scope))
            } else {
                format!("{}:{} was not set ({})\n", plugin.conf_key(), name, scope_label(scope))
            })
        }
    }
}

fn set_enabled(registries: &Registries, slug: &str, project: ProjectId, enabled: bool) -> Result<String> {
    let plugin = registries.manager.get(slug)?;
    let project = cli_project(project);

    if !plugin.descriptor().can_disable || !plugin.can_enable_for_projects() {
        anyhow::bail!("{} cannot be enabled or disabled per project", plugin.title());
    }

    if enabled {
        plugin.enable(&registries.context, &project)?;
    } else {
        plugin.disable(&registries.context, &project)?;
    }

    let state = if enabled { "Enabled" } else { "Disabled" };
    info!("{} {} for project {}", state, slug, project.id);
    Ok(format!("{} {} for project {}\n", state, plugin.title(), project.id))
}

fn list_bindings(registries: &Registries, name: Option<&str>) -> Result<String> {
    let bindings = &registries.bindings;
    let names: Vec<String> = match name {
        Some(name) => {
            bindings.get(name)?;
            vec![name.to_string()]
        }
        None => bindings.names().iter().map(|name| name.to_string()).collect(),
    };

    let mut rows = Vec::new();
    for name in &names {
        let ids = bindings.provider_ids(name)?;
        if ids.is_empty() {
            rows.push(vec![name.clone(), "-".to_string()]);
        }
        rows.extend(ids.into_iter().map(|id| vec![name.clone(), id]));
    }

    Ok(format!("{}\n\n{}", heading("Bindings"), format_compact_table(&["Binding", "Provider"], &rows)))
}

/// Parse an event file, filling ids the pipeline needs
fn load_event(registries: &Registries, path: &Path, project: Option<ProjectId>) -> Result<Event> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read event file {}", path.display()))?;
    let raw: Value = serde_json::from_str(&content)
        .with_context(|| format!("Event file {} is not valid JSON", path.display()))?;

    let mut data = dispatch::preprocess_event(&registries.manager, raw);
    let obj = data
        .as_object_mut()
        .ok_or_else(|| anyhow::anyhow!("Event file {} must contain a JSON object", path.display()))?;

    if let Some(project) = project {
        obj.insert("project_id".to_string(), Value::from(project));
    }
    if !obj.contains_key("project_id") {
        anyhow::bail!("Event has no project_id; pass --project");
    }
    if !obj.get("event_id").map_or(false, Value::is_string) {
        obj.insert(
            "event_id".to_string(),
            Value::String(uuid::Uuid::new_v4().simple().to_string()),
        );
    }

    let mut event: Event = serde_json::from_value(data.clone()).context("Invalid event")?;
    if event.data.is_null() {
        event.data = data;
    }
    Ok(event)
}

/// Organization for an event; without one each project is its own bucket
fn event_organization(event: &Event, organization: Option<u64>) -> u64 {
    organization
        .or_else(|| event.data.get("organization_id").and_then(Value::as_u64))
        .unwrap_or(event.project_id)
}

async fn process_event(
    registries: &Registries,
    path: &Path,
    project: Option<ProjectId>,
    group: Option<u64>,
    organization: Option<u64>,
) -> Result<String> {
    let event = load_event(registries, path, project)?;
    let project = Project::new(
        event.project_id,
        event_organization(&event, organization),
        &format!("project-{}", event.project_id),
    );
    let group = Group::new(group.or(event.group_id).unwrap_or(0), project.id, event.display_title());

    info!("Processing event {} for project {}", event.event_id, project.id);
    let report = dispatch::post_process_group(
        &registries.manager,
        &registries.context,
        &event,
        &group,
        &project,
        &[],
    )
    .await;

    let mut output = serde_json::to_string_pretty(&report)?;
    output.push('\n');
    Ok(output)
}

async fn test_config(registries: &Registries, slug: &str, project: ProjectId) -> Result<String> {
    let plugin = registries.manager.get(slug)?;
    let notifier = plugin
        .as_notifier()
        .ok_or_else(|| anyhow::anyhow!("{} does not send notifications", plugin.title()))?;

    let project = cli_project(project);
    let sent = notifier
        .test_configuration(&registries.context, &project)
        .await
        .with_context(|| format!("Test notification through {} failed", plugin.title()))?;

    Ok(if sent {
        format!("Sent a test notification through {}\n", plugin.title())
    } else {
        format!("{} is not configured for project {}\n", plugin.title(), project.id)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigManager;
    use crate::app::initialization::build_registries;
    use serde_json::json;
    use std::collections::HashMap;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn registries() -> Registries {
        colored::control::set_override(false);
        build_registries(&ConfigManager::from_config(HashMap::new())).unwrap()
    }

    fn set(slug: &str, name: &str, value: &str, project: Option<u64>) -> Command {
        Command::Options {
            action: OptionsAction::Set {
                slug: slug.to_string(),
                name: name.to_string(),
                value: value.to_string(),
                scope: ScopeArgs { project, user: None },
            },
        }
    }

    #[tokio::test]
    async fn test_list_all_and_by_version() {
        let registries = registries();

        let output = execute(&Command::List { project: None, version: VersionFilter::Any }, &registries)
            .await
            .unwrap();
        for slug in ["webhooks", "pagerduty", "github", "splunk", "urls", "interface_types"] {
            assert!(output.contains(slug), "{} missing", slug);
        }

        let output = execute(&Command::List { project: None, version: VersionFilter::V2 }, &registries)
            .await
            .unwrap();
        assert!(output.contains("github"));
        assert!(!output.contains("webhooks"));
    }

    #[tokio::test]
    async fn test_list_for_project_uses_default_enablement() {
        let registries = registries();
        let output = execute(&Command::List { project: Some(1), version: VersionFilter::Any }, &registries)
            .await
            .unwrap();
        assert!(output.contains("urls"));
        assert!(!output.contains("interface_types"));

        execute(&Command::Enable { slug: "interface_types".to_string(), project: 1 }, &registries)
            .await
            .unwrap();
        let output = execute(&Command::List { project: Some(1), version: VersionFilter::Any }, &registries)
            .await
            .unwrap();
        assert!(output.contains("interface_types"));
    }

    #[tokio::test]
    async fn test_show_plugin() {
        let registries = registries();
        let output = execute(&Command::Show { slug: "splunk".to_string() }, &registries).await.unwrap();
        assert!(output.contains("Splunk"));
        assert!(output.contains("data-forwarding"));
        assert!(output.contains("instance"));
        assert!(output.contains("\"main\""));

        assert!(execute(&Command::Show { slug: "nope".to_string() }, &registries).await.is_err());
    }

    #[tokio::test]
    async fn test_options_round_trip() {
        let registries = registries();

        let output = execute(&set("splunk", "index", "events", Some(4)), &registries).await.unwrap();
        assert!(output.contains("splunk:index = \"events\""));

        let get = Command::Options {
            action: OptionsAction::Get {
                slug: "splunk".to_string(),
                name: "index".to_string(),
                scope: ScopeArgs { project: Some(4), user: None },
            },
        };
        assert_eq!(execute(&get, &registries).await.unwrap(), "\"events\"\n");

        let unset = Command::Options {
            action: OptionsAction::Unset {
                slug: "splunk".to_string(),
                name: "index".to_string(),
                scope: ScopeArgs { project: Some(4), user: None },
            },
        };
        assert!(execute(&unset, &registries).await.unwrap().starts_with("Removed"));
        assert!(execute(&get, &registries).await.unwrap().contains("is not set (project 4)"));
    }

    #[tokio::test]
    async fn test_options_set_validates_field() {
        let registries = registries();
        assert!(execute(&set("splunk", "instance", "not a url", Some(1)), &registries).await.is_err());
    }

    #[test]
    fn test_parse_option_value() {
        let number = ConfigField::number("port", "Port");
        let text = ConfigField::text("name", "Name");
        assert_eq!(parse_option_value(Some(&number), "42"), json!(42));
        assert_eq!(parse_option_value(Some(&text), "42"), json!("42"));
        assert_eq!(parse_option_value(None, "true"), json!(true));
        assert_eq!(parse_option_value(None, "plain"), json!("plain"));
    }

    #[tokio::test]
    async fn test_bindings() {
        let registries = registries();
        let output = execute(&Command::Bindings { name: None }, &registries).await.unwrap();
        assert!(output.contains("repository.provider"));
        assert!(output.contains("integrations:github"));

        let unknown = Command::Bindings { name: Some("nope".to_string()) };
        assert!(execute(&unknown, &registries).await.is_err());
    }

    #[tokio::test]
    async fn test_process_event_file() {
        let registries = registries();
        let dir = TempDir::new().unwrap();
        let event_path = dir.path().join("event.json");
        std::fs::write(
            &event_path,
            json!({
                "message": "boom",
                "request": {"url": "http://example.com/checkout"},
            })
            .to_string(),
        )
        .unwrap();

        let command = Command::Process { event: event_path.clone(), project: None, group: None, organization: None };
        assert!(execute(&command, &registries).await.is_err());

        let command = Command::Process { event: event_path, project: Some(2), group: Some(9), organization: None };
        let output = execute(&command, &registries).await.unwrap();
        let report: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(report["tags"], json!([["url", "http://example.com/checkout"]]));
        assert_eq!(report["failed"], json!([]));
    }

    #[test]
    fn test_event_organization_resolution() {
        let project = Project::new(4, 0, "api");
        let mut event = Event::sample(&project);
        event.data = json!({"project_id": 4});
        assert_eq!(event_organization(&event, None), 4);

        event.data = json!({"project_id": 4, "organization_id": 12});
        assert_eq!(event_organization(&event, None), 12);
        assert_eq!(event_organization(&event, Some(30)), 30);
    }

    #[tokio::test]
    async fn test_test_config_sends_webhook() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let registries = registries();
        let url = format!("{}/hook", server.uri());
        execute(&set("webhooks", "urls", &url, Some(3)), &registries).await.unwrap();

        let output = execute(&Command::TestConfig { slug: "webhooks".to_string(), project: 3 }, &registries)
            .await
            .unwrap();
        assert!(output.starts_with("Sent a test notification"));
    }

    #[tokio::test]
    async fn test_test_config_reports_unconfigured_project() {
        let registries = registries();
        let output = execute(&Command::TestConfig { slug: "webhooks".to_string(), project: 77 }, &registries)
            .await
            .unwrap();
        assert_eq!(output, "WebHooks is not configured for project 77\n");
    }

    #[tokio::test]
    async fn test_test_config_requires_notifier() {
        let registries = registries();
        let command = Command::TestConfig { slug: "splunk".to_string(), project: 1 };
        assert!(execute(&command, &registries).await.is_err());
    }
}
