//! Core Plugin Traits
//!
//! Every plugin is a stateless handler implementing [`Plugin`]. The trait
//! exposes the lifecycle hooks the registry and the post-processing pipeline
//! call; specialized behaviour (notifications, issue tracking, data
//! forwarding, tagging) lives in the sub-traits under [`crate::plugin::bases`]
//! and is reached through the `as_*` accessors.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use crate::model::{Event, Group, Project, ProjectId, UserId};
use crate::options::{self, option_key};
use super::bases::{DataForwardingPlugin, IssueTrackingPlugin, NotificationPlugin, TagPlugin};
use super::bases::{issue, tag};
use super::context::PluginContext;
use super::descriptor::{PluginDescriptor, PluginType, PluginVersion};
use super::error::{PluginError, PluginResult};
use super::fields::{self, ConfigField, FieldScope};
use super::settings::PluginSettings;

/// Rewrites raw event data before it is stored.
///
/// Returns the new data, or `None` when nothing changed.
pub type EventPreprocessor = Box<dyn Fn(&Value) -> Option<Value> + Send + Sync>;

/// Annotation rendered next to an issue group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginAnnotation {
    pub description: String,
    pub url: Option<String>,
}

/// Action link offered on an issue group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginAction {
    pub label: String,
    pub url: String,
}

/// Core plugin interface that all plugins must implement
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Get plugin metadata
    fn descriptor(&self) -> &PluginDescriptor;

    fn slug(&self) -> &str {
        &self.descriptor().slug
    }

    fn title(&self) -> &str {
        &self.descriptor().title
    }

    /// Namespace of this plugin's options
    fn conf_key(&self) -> &str {
        &self.descriptor().conf_key
    }

    fn api_version(&self) -> PluginVersion {
        self.descriptor().api_version
    }

    /// Classification derived from the specializations the plugin offers
    fn plugin_type(&self) -> PluginType {
        if self.as_issue_tracker().is_some() {
            PluginType::IssueTracking
        } else if self.as_notifier().is_some() {
            PluginType::Notification
        } else if self.as_data_forwarder().is_some() {
            PluginType::DataForwarding
        } else if self.as_tagger().is_some() {
            PluginType::Tagging
        } else {
            PluginType::Default
        }
    }

    /// Configuration form schema
    fn config_fields(&self) -> Vec<ConfigField> {
        Vec::new()
    }

    fn has_site_conf(&self) -> bool {
        self.descriptor().site_conf
    }

    fn has_project_conf(&self) -> bool {
        self.descriptor().project_conf
    }

    fn can_enable_for_projects(&self) -> bool {
        true
    }

    fn can_configure_for_project(&self, _ctx: &PluginContext, _project: &Project) -> PluginResult<bool> {
        Ok(self.has_project_conf() && self.can_enable_for_projects())
    }

    /// Check whether the plugin is enabled, optionally for one project.
    ///
    /// Globally disabled plugins are never enabled. Plugins that cannot be
    /// disabled, or cannot be toggled per project, are always enabled.
    /// Otherwise the project's `enabled` option decides, falling back to
    /// `project_default_enabled`.
    fn is_enabled(&self, ctx: &PluginContext, project: Option<&Project>) -> PluginResult<bool> {
        let descriptor = self.descriptor();
        if !descriptor.enabled {
            return Ok(false);
        }
        if !descriptor.can_disable || !self.can_enable_for_projects() {
            return Ok(true);
        }

        let project = match project {
            Some(project) => project,
            None => return Ok(true),
        };

        match self.get_option(ctx, "enabled", Some(project.id), None)? {
            Some(Value::Bool(enabled)) => Ok(enabled),
            None | Some(Value::Null) => Ok(descriptor.project_default_enabled),
            Some(other) => Err(PluginError::configuration_error(format!(
                "Invalid value for {}: {}",
                option_key(self.conf_key(), "enabled"),
                other
            ))),
        }
    }

    /// Check that every required project field has a value
    fn is_configured(&self, ctx: &PluginContext, project: &Project) -> PluginResult<bool> {
        for field in self.config_fields() {
            if !field.required || field.scope != FieldScope::Project {
                continue;
            }
            if !options::is_present(&self.get_option(ctx, &field.name, Some(project.id), None)?) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Validate a submitted project configuration
    fn validate_config(
        &self,
        _ctx: &PluginContext,
        _project: &Project,
        config: &Map<String, Value>,
    ) -> PluginResult<Map<String, Value>> {
        let fields: Vec<ConfigField> = self
            .config_fields()
            .into_iter()
            .filter(|field| field.scope == FieldScope::Project)
            .collect();
        fields::clean_form(&fields, config)
    }

    /// Validate and store a project configuration
    fn save_config(
        &self,
        ctx: &PluginContext,
        project: &Project,
        config: &Map<String, Value>,
    ) -> PluginResult<Map<String, Value>> {
        let cleaned = self.validate_config(ctx, project, config)?;
        for field in self.config_fields() {
            if field.scope != FieldScope::Project {
                continue;
            }
            match cleaned.get(&field.name) {
                Some(value) => self.set_option(ctx, &field.name, value.clone(), Some(project.id), None)?,
                None => {
                    self.unset_option(ctx, &field.name, Some(project.id), None)?;
                }
            }
        }
        Ok(cleaned)
    }

    /// Remove every configured field value from a scope
    fn reset_options(&self, ctx: &PluginContext, project: Option<ProjectId>, user: Option<UserId>) -> PluginResult<()> {
        for field in self.config_fields() {
            self.unset_option(ctx, &field.name, project, user)?;
        }
        Ok(())
    }

    fn get_option(
        &self,
        ctx: &PluginContext,
        name: &str,
        project: Option<ProjectId>,
        user: Option<UserId>,
    ) -> PluginResult<Option<Value>> {
        ctx.get_option(&option_key(self.conf_key(), name), project, user)
    }

    /// String option, `None` when unset or blank
    fn get_option_str(
        &self,
        ctx: &PluginContext,
        name: &str,
        project: Option<ProjectId>,
        user: Option<UserId>,
    ) -> PluginResult<Option<String>> {
        match self.get_option(ctx, name, project, user)? {
            Some(Value::String(s)) if !s.trim().is_empty() => Ok(Some(s.trim().to_string())),
            Some(Value::String(_)) | Some(Value::Null) | None => Ok(None),
            Some(other) => Ok(Some(other.to_string())),
        }
    }

    fn set_option(
        &self,
        ctx: &PluginContext,
        name: &str,
        value: Value,
        project: Option<ProjectId>,
        user: Option<UserId>,
    ) -> PluginResult<()> {
        ctx.set_option(&option_key(self.conf_key(), name), value, project, user)
    }

    fn unset_option(
        &self,
        ctx: &PluginContext,
        name: &str,
        project: Option<ProjectId>,
        user: Option<UserId>,
    ) -> PluginResult<bool> {
        ctx.unset_option(&option_key(self.conf_key(), name), project, user)
    }

    fn enable(&self, ctx: &PluginContext, project: &Project) -> PluginResult<()> {
        self.set_option(ctx, "enabled", Value::Bool(true), Some(project.id), None)
    }

    fn disable(&self, ctx: &PluginContext, project: &Project) -> PluginResult<()> {
        self.set_option(ctx, "enabled", Value::Bool(false), Some(project.id), None)
    }

    /// Tags contributed to an event
    fn get_tags(&self, event: &Event) -> Vec<(String, String)> {
        match self.as_tagger() {
            Some(tagger) => tag::tags_for(tagger, event),
            None => Vec::new(),
        }
    }

    /// Annotations rendered next to an issue group
    fn get_annotations(&self, ctx: &PluginContext, group: &Group) -> PluginResult<Vec<PluginAnnotation>> {
        match self.as_issue_tracker() {
            Some(tracker) => issue::annotations(tracker, ctx, group),
            None => Ok(Vec::new()),
        }
    }

    fn get_actions(&self, _ctx: &PluginContext, _group: &Group) -> Vec<PluginAction> {
        Vec::new()
    }

    /// Preprocessors applied to raw event data (version 2 plugins)
    fn get_event_preprocessors(&self, _data: &Value) -> Vec<EventPreprocessor> {
        Vec::new()
    }

    /// Called for every event of a project the plugin is enabled for
    async fn post_process(
        &self,
        _ctx: &PluginContext,
        _event: &Event,
        _group: &Group,
        _project: &Project,
    ) -> PluginResult<()> {
        Ok(())
    }

    fn as_notifier(&self) -> Option<&dyn NotificationPlugin> {
        None
    }

    fn as_issue_tracker(&self) -> Option<&dyn IssueTrackingPlugin> {
        None
    }

    fn as_data_forwarder(&self) -> Option<&dyn DataForwardingPlugin> {
        None
    }

    fn as_tagger(&self) -> Option<&dyn TagPlugin> {
        None
    }
}

/// A plugin type that can be registered by class path
pub trait PluginClass: Plugin + Sized + 'static {
    /// Fully-qualified, dotted class path the registry knows this type by
    const CLASS_PATH: &'static str;

    /// Construct the singleton instance
    fn create(settings: &PluginSettings) -> PluginResult<Self>;
}
