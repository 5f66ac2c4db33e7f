//! GitHub issue tracker
//!
//! Creates and links GitHub issues for Sentry issue groups. The repository
//! and API URL are project options; the access token belongs to the acting
//! user.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};
use crate::model::{Group, Project, UserId};
use crate::plugin::bases::issue::value_to_string;
use crate::plugin::bases::IssueTrackingPlugin;
use crate::plugin::context::PluginContext;
use crate::plugin::descriptor::{PluginDescriptor, PluginFeatures, PluginVersion};
use crate::plugin::error::{PluginError, PluginResult};
use crate::plugin::fields::{self, ConfigField, FieldScope};
use crate::plugin::settings::PluginSettings;
use crate::plugin::traits::{Plugin, PluginClass};
use super::client::{web_url, GitHubClient, DEFAULT_API_URL};

static REPO_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w.-]+/[\w.-]+$").unwrap());

pub const ERR_INVALID_REPO: &str = "Invalid Repository Name (must be in the form of `owner/name`)";

/// Check an `owner/name` repository identifier
pub fn validate_repo_name(repo: &str) -> PluginResult<()> {
    if REPO_NAME.is_match(repo) {
        Ok(())
    } else {
        Err(PluginError::validation(ERR_INVALID_REPO))
    }
}

pub struct GitHubPlugin {
    descriptor: PluginDescriptor,
}

impl GitHubPlugin {
    pub fn new() -> Self {
        Self {
            descriptor: PluginDescriptor::for_type::<Self>()
                .title("GitHub")
                .slug("github")
                .conf_key("github")
                .description("Integrate GitHub issues by linking a repository to a project.")
                .author("Sentry Team", Some("https://github.com/getsentry/sentry-plugins"))
                .resource_link("Bug Tracker", "https://github.com/getsentry/sentry-plugins/issues")
                .resource_link("Source", "https://github.com/getsentry/sentry-plugins")
                .api_version(PluginVersion::V2)
                .project_conf(true)
                .features(PluginFeatures::ISSUE_BASIC | PluginFeatures::COMMITS)
                .build(),
        }
    }

    fn repo(&self, ctx: &PluginContext, project_id: u64) -> PluginResult<Option<String>> {
        self.get_option_str(ctx, "repo", Some(project_id), None)
    }

    fn api_url(&self, ctx: &PluginContext, project_id: u64) -> PluginResult<String> {
        Ok(self
            .get_option_str(ctx, "github_url", Some(project_id), None)?
            .unwrap_or_else(|| DEFAULT_API_URL.to_string()))
    }

    /// Repository the project files issues against
    fn configured_repo(&self, ctx: &PluginContext, project: &Project) -> PluginResult<String> {
        self.repo(ctx, project.id)?
            .ok_or_else(|| PluginError::validation("GitHub repository is not configured for this project"))
    }

    /// API client authenticated as `user`
    fn client_for(&self, ctx: &PluginContext, project: &Project, user: Option<UserId>) -> PluginResult<GitHubClient> {
        let token = match user {
            Some(user_id) => self.get_option_str(ctx, "access_token", None, Some(user_id))?,
            None => None,
        };
        let token = token.ok_or_else(|| {
            PluginError::invalid_identity(
                "You must associate a GitHub account with your user to create or link issues",
                Some("github".to_string()),
            )
        })?;
        GitHubClient::new(ctx.settings(), &self.api_url(ctx, project.id)?, &token)
    }

    /// Tracker response reduced to what group metadata records
    fn issue_response(issue: &Value) -> PluginResult<Value> {
        let number = issue
            .get("number")
            .filter(|n| !n.is_null())
            .ok_or_else(|| PluginError::api(None, "GitHub response did not contain an issue number"))?;
        Ok(json!({
            "id": number,
            "title": issue.get("title").cloned().unwrap_or(Value::Null),
            "url": issue.get("html_url").cloned().unwrap_or(Value::Null),
        }))
    }
}

impl Default for GitHubPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for GitHubPlugin {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn config_fields(&self) -> Vec<ConfigField> {
        vec![
            ConfigField::text("repo", "Repository Name")
                .required()
                .placeholder("e.g. getsentry/sentry")
                .help("Enter your repository name, including the owner."),
            ConfigField::url("github_url", "GitHub API URL")
                .default_value(json!(DEFAULT_API_URL))
                .help("Change only for GitHub Enterprise, e.g. https://github.example.com/api/v3"),
            ConfigField::secret("access_token", "Access Token")
                .required()
                .user_scoped()
                .help("Personal access token used to file issues on your behalf."),
        ]
    }

    fn validate_config(
        &self,
        _ctx: &PluginContext,
        _project: &Project,
        config: &Map<String, Value>,
    ) -> PluginResult<Map<String, Value>> {
        let project_fields: Vec<ConfigField> = self
            .config_fields()
            .into_iter()
            .filter(|field| field.scope == FieldScope::Project)
            .collect();
        let cleaned = fields::clean_form(&project_fields, config)?;
        if let Some(repo) = cleaned.get("repo").and_then(Value::as_str) {
            validate_repo_name(repo)?;
        }
        Ok(cleaned)
    }

    fn as_issue_tracker(&self) -> Option<&dyn IssueTrackingPlugin> {
        Some(self)
    }
}

#[async_trait]
impl IssueTrackingPlugin for GitHubPlugin {
    fn link_issue_fields(&self, ctx: &PluginContext, group: &Group) -> Vec<ConfigField> {
        let comment = format!(
            "Sentry issue: [{}]({})",
            group.qualified_short_id(),
            group.absolute_url(&ctx.settings().url_prefix)
        );
        vec![
            ConfigField::number("issue_id", "Issue Number")
                .required()
                .help("Enter the number of the GitHub issue to link."),
            ConfigField::textarea("comment", "Comment")
                .default_value(json!(comment))
                .help("Leave blank if you don't want to add a comment to the GitHub issue."),
        ]
    }

    async fn create_issue(
        &self,
        ctx: &PluginContext,
        _group: &Group,
        project: &Project,
        form: &Map<String, Value>,
        user: Option<UserId>,
    ) -> PluginResult<Value> {
        let client = self.client_for(ctx, project, user)?;
        let repo = self.configured_repo(ctx, project)?;

        let mut data = Map::new();
        data.insert("title".to_string(), form.get("title").cloned().unwrap_or(Value::Null));
        data.insert("body".to_string(), form.get("description").cloned().unwrap_or_else(|| json!("")));
        if let Some(assignee) = form.get("assignee").filter(|a| !a.is_null()) {
            data.insert("assignee".to_string(), assignee.clone());
        }

        let issue = client.create_issue(&repo, Value::Object(data)).await?;
        Self::issue_response(&issue)
    }

    async fn link_issue(
        &self,
        ctx: &PluginContext,
        _group: &Group,
        project: &Project,
        form: &Map<String, Value>,
        user: Option<UserId>,
    ) -> PluginResult<Value> {
        let client = self.client_for(ctx, project, user)?;
        let repo = self.configured_repo(ctx, project)?;
        let issue_id = form
            .get("issue_id")
            .map(value_to_string)
            .ok_or_else(|| PluginError::validation("Issue Number: This field is required."))?;

        let issue = client.get_issue(&repo, &issue_id).await?;
        if let Some(comment) = form.get("comment").and_then(Value::as_str).filter(|c| !c.is_empty()) {
            client.create_comment(&repo, &issue_id, json!({"body": comment})).await?;
        }
        Self::issue_response(&issue)
    }

    fn issue_label(&self, _group: &Group, issue_id: &str) -> String {
        format!("GH-{}", issue_id)
    }

    fn issue_url(&self, ctx: &PluginContext, group: &Group, issue_id: &str) -> String {
        let repo = self.repo(ctx, group.project_id).ok().flatten().unwrap_or_default();
        let api_url = self
            .api_url(ctx, group.project_id)
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        format!("{}/{}/issues/{}", web_url(&api_url), repo, issue_id)
    }
}

impl PluginClass for GitHubPlugin {
    const CLASS_PATH: &'static str = "sentry_plugins.github.GitHubPlugin";

    fn create(_settings: &PluginSettings) -> PluginResult<Self> {
        Ok(Self::new())
    }
}
