//! Issue tracking plugins
//!
//! Issue trackers create tickets in a third-party tracker (or link existing
//! ones) and remember the ticket id in group metadata under
//! `<conf_key>:tid`. A group links at most one ticket per plugin: creating
//! or linking overwrites the previous id, unlinking removes it.

use async_trait::async_trait;
use log::{error, info};
use serde::Serialize;
use serde_json::{json, Map, Value};
use crate::model::{Event, Group, Project, UserId};
use crate::plugin::context::PluginContext;
use crate::plugin::error::{PluginError, PluginResult};
use crate::plugin::fields::{clean_form, ConfigField};
use crate::plugin::traits::{Plugin, PluginAnnotation};

pub const ERR_INTERNAL: &str =
    "An internal error occurred with the integration and the Sentry team has been notified";
pub const ERR_UNAUTHORIZED: &str =
    "Unauthorized: either your access token was invalid or you do not have access";

/// A ticket linked to a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkedIssue {
    pub id: String,
    pub label: String,
    pub url: String,
}

/// Form-validation shaped error returned to the caller
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorPayload {
    pub status: u16,
    pub body: Value,
}

/// Render an id-like JSON value as a plain string
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
pub trait IssueTrackingPlugin: Plugin {
    /// Fields of the "create issue" form
    fn new_issue_fields(&self, ctx: &PluginContext, group: &Group, event: Option<&Event>) -> Vec<ConfigField> {
        vec![
            ConfigField::text("title", "Title")
                .required()
                .default_value(json!(group.title)),
            ConfigField::textarea("description", "Description")
                .default_value(json!(default_description(ctx, group, event))),
        ]
    }

    /// Fields of the "link existing issue" form; empty when unsupported
    fn link_issue_fields(&self, _ctx: &PluginContext, _group: &Group) -> Vec<ConfigField> {
        Vec::new()
    }

    /// Create a ticket, returning the tracker's response (must carry `id`)
    async fn create_issue(
        &self,
        ctx: &PluginContext,
        group: &Group,
        project: &Project,
        form: &Map<String, Value>,
        user: Option<UserId>,
    ) -> PluginResult<Value>;

    /// Look up an existing ticket, returning the tracker's response
    async fn link_issue(
        &self,
        _ctx: &PluginContext,
        _group: &Group,
        _project: &Project,
        _form: &Map<String, Value>,
        _user: Option<UserId>,
    ) -> PluginResult<Value> {
        Err(PluginError::validation(format!("{} does not support linking existing issues", self.title())))
    }

    fn issue_label(&self, _group: &Group, issue_id: &str) -> String {
        format!("#{}", issue_id)
    }

    fn issue_url(&self, _ctx: &PluginContext, _group: &Group, _issue_id: &str) -> String {
        String::new()
    }

    /// Response keys recorded in group metadata, mapped to their meta keys
    fn issue_field_map(&self) -> Vec<(String, String)> {
        vec![("id".to_string(), format!("{}:tid", self.conf_key()))]
    }

    fn error_message_from_json(&self, data: &Value) -> String {
        data.get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string()
    }

    /// User-facing description of an API failure
    fn message_from_error(&self, err: &PluginError) -> String {
        match err {
            PluginError::ApiUnauthorized { .. } => ERR_UNAUTHORIZED.to_string(),
            PluginError::ApiHostError { .. } | PluginError::ApiTimeout { .. } => err.to_string(),
            PluginError::Api { code, json, .. } => {
                let message = json
                    .as_ref()
                    .map(|data| self.error_message_from_json(data))
                    .unwrap_or_else(|| "unknown error".to_string());
                match code {
                    Some(code) => format!("Error Communicating with {} (HTTP {}): {}", self.title(), code, message),
                    None => format!("Error Communicating with {}: {}", self.title(), message),
                }
            }
            _ => ERR_INTERNAL.to_string(),
        }
    }

    /// Convert any failure into the user-facing error taxonomy
    fn raise_error(&self, err: PluginError, identity: Option<String>) -> PluginError {
        match err {
            PluginError::ApiUnauthorized { .. } => {
                PluginError::invalid_identity(self.message_from_error(&err), identity)
            }
            ref api if api.is_api_error() => PluginError::validation(self.message_from_error(api)),
            PluginError::Validation { .. } | PluginError::InvalidIdentity { .. } => err,
            other => {
                error!(target: self.descriptor().logger_target().as_str(), "{}", other);
                PluginError::validation(self.message_from_error(&other))
            }
        }
    }

    /// Shape an error as the JSON payload shown to the user
    fn handle_api_error(&self, err: &PluginError) -> ErrorPayload {
        match err {
            PluginError::InvalidIdentity { message, identity } => ErrorPayload {
                status: 400,
                body: json!({
                    "error_type": "auth",
                    "message": message,
                    "identity": identity,
                }),
            },
            PluginError::Validation { message } => ErrorPayload {
                status: 400,
                body: json!({
                    "error_type": "validation",
                    "errors": {"__all__": message},
                }),
            },
            other => {
                error!(target: self.descriptor().logger_target().as_str(), "{}", other);
                ErrorPayload {
                    status: 500,
                    body: json!({"error_type": "unknown"}),
                }
            }
        }
    }

    fn linked_issue_id(&self, ctx: &PluginContext, group: &Group) -> Option<String> {
        ctx.group_meta()
            .get_value(group.id, &format!("{}:tid", self.conf_key()))
    }

    /// Store the tracker response in group metadata
    fn record_issue(&self, ctx: &PluginContext, group: &Group, response: &Value) -> PluginResult<LinkedIssue> {
        let id = response
            .get("id")
            .filter(|id| !id.is_null())
            .map(value_to_string)
            .ok_or_else(|| PluginError::api(None, "Issue tracker response did not contain an id"))?;

        for (key, meta_key) in self.issue_field_map() {
            match response.get(&key).filter(|v| !v.is_null()) {
                Some(value) => ctx.group_meta().set_value(group.id, &meta_key, value_to_string(value)),
                None => {
                    ctx.group_meta().unset_value(group.id, &meta_key);
                }
            }
        }

        info!(
            target: self.descriptor().logger_target().as_str(),
            "issue.linked group_id={} issue_id={}",
            group.id,
            id
        );

        Ok(LinkedIssue {
            label: self.issue_label(group, &id),
            url: self.issue_url(ctx, group, &id),
            id,
        })
    }

    /// Validate the form, create a ticket and link it to the group
    async fn open_issue(
        &self,
        ctx: &PluginContext,
        group: &Group,
        project: &Project,
        event: Option<&Event>,
        form: &Map<String, Value>,
        user: Option<UserId>,
    ) -> Result<LinkedIssue, ErrorPayload> {
        let fields = self.new_issue_fields(ctx, group, event);
        let cleaned = clean_form(&fields, form).map_err(|e| self.handle_api_error(&e))?;

        let response = match self.create_issue(ctx, group, project, &cleaned, user).await {
            Ok(response) => response,
            Err(e) => return Err(self.handle_api_error(&self.raise_error(e, None))),
        };

        self.record_issue(ctx, group, &response)
            .map_err(|e| self.handle_api_error(&self.raise_error(e, None)))
    }

    /// Validate the form, look up an existing ticket and link it
    async fn attach_issue(
        &self,
        ctx: &PluginContext,
        group: &Group,
        project: &Project,
        form: &Map<String, Value>,
        user: Option<UserId>,
    ) -> Result<LinkedIssue, ErrorPayload> {
        let fields = self.link_issue_fields(ctx, group);
        if fields.is_empty() {
            let err = PluginError::validation(format!("{} does not support linking existing issues", self.title()));
            return Err(self.handle_api_error(&err));
        }
        let cleaned = clean_form(&fields, form).map_err(|e| self.handle_api_error(&e))?;

        let response = match self.link_issue(ctx, group, project, &cleaned, user).await {
            Ok(response) => response,
            Err(e) => return Err(self.handle_api_error(&self.raise_error(e, None))),
        };

        self.record_issue(ctx, group, &response)
            .map_err(|e| self.handle_api_error(&self.raise_error(e, None)))
    }

    /// Forget the linked ticket, returning whether one was linked
    fn unlink_issue(&self, ctx: &PluginContext, group: &Group) -> bool {
        let mut removed = false;
        for (_, meta_key) in self.issue_field_map() {
            removed |= ctx.group_meta().unset_value(group.id, &meta_key);
        }
        if removed {
            info!(
                target: self.descriptor().logger_target().as_str(),
                "issue.unlinked group_id={}",
                group.id
            );
        }
        removed
    }
}

/// Annotation pointing at the linked ticket, if any
pub fn annotations(
    plugin: &dyn IssueTrackingPlugin,
    ctx: &PluginContext,
    group: &Group,
) -> PluginResult<Vec<PluginAnnotation>> {
    let issue_id = match plugin.linked_issue_id(ctx, group) {
        Some(id) => id,
        None => return Ok(Vec::new()),
    };

    let url = plugin.issue_url(ctx, group, &issue_id);
    Ok(vec![PluginAnnotation {
        description: plugin.issue_label(group, &issue_id),
        url: if url.is_empty() { None } else { Some(url) },
    }])
}

/// Default ticket body linking back to the group
pub fn default_description(ctx: &PluginContext, group: &Group, event: Option<&Event>) -> String {
    let url = group.absolute_url(&ctx.settings().url_prefix);
    let mut body = format!("Sentry Issue: [{}]({})", group.qualified_short_id(), url);

    let detail = event
        .and_then(|e| e.culprit.clone().filter(|c| !c.is_empty()).or_else(|| Some(e.message.clone())))
        .or_else(|| group.culprit.clone())
        .filter(|d| !d.is_empty());

    if let Some(detail) = detail {
        body.push_str("\n\n```\n");
        body.push_str(&detail);
        body.push_str("\n```");
    }
    body
}
