//! GitHub repository providers
//!
//! Two flavours share the commit fetching: the identity-based provider
//! authenticates with the acting user's token, the integration provider
//! with the token stored for an installed integration.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use crate::model::{ChangeType, Commit, FileChange, Repository};
use crate::plugin::bases::issue::value_to_string;
use crate::plugin::bases::{IntegrationRepositoryProvider, RepositoryProvider};
use crate::plugin::context::PluginContext;
use crate::plugin::error::{PluginError, PluginResult};
use crate::plugin::fields::{self, ConfigField};
use crate::plugin::settings::PluginSettings;
use super::client::{web_url, GitHubClient, DEFAULT_API_URL, LAST_COMMITS_LIMIT};
use super::issues::validate_repo_name;

pub const PROVIDER_ID: &str = "github";
pub const INTEGRATION_PROVIDER_ID: &str = "integrations:github";

/// Global option holding the token of an installed integration
pub fn integration_token_key(integration_id: u64) -> String {
    format!("github-integration:{}:token", integration_id)
}

/// Files touched by a commit, as reported by the commit endpoint
fn patch_set(commit: &Value) -> Vec<FileChange> {
    let files = match commit.get("files").and_then(Value::as_array) {
        Some(files) => files,
        None => return Vec::new(),
    };

    let mut changes = Vec::new();
    for file in files {
        let path = match file.get("filename").and_then(Value::as_str) {
            Some(path) => path.to_string(),
            None => continue,
        };
        match file.get("status").and_then(Value::as_str) {
            Some("added") => changes.push(FileChange { path, change_type: ChangeType::Added }),
            Some("removed") => changes.push(FileChange { path, change_type: ChangeType::Deleted }),
            Some("renamed") => {
                if let Some(previous) = file.get("previous_filename").and_then(Value::as_str) {
                    changes.push(FileChange { path: previous.to_string(), change_type: ChangeType::Deleted });
                }
                changes.push(FileChange { path, change_type: ChangeType::Added });
            }
            _ => changes.push(FileChange { path, change_type: ChangeType::Modified }),
        }
    }
    changes
}

/// Convert one commit object into a [`Commit`]
fn commit_from_json(repo_name: &str, data: &Value, files: Vec<FileChange>) -> Option<Commit> {
    let id = data.get("sha").and_then(Value::as_str)?.to_string();
    let detail = data.get("commit");
    let author = detail.and_then(|c| c.get("author"));
    let text = |v: Option<&Value>, key: &str| v.and_then(|v| v.get(key)).and_then(Value::as_str).map(str::to_string);

    Some(Commit {
        id,
        repository: repo_name.to_string(),
        author_email: text(author, "email"),
        author_name: text(author, "name"),
        message: text(detail, "message").unwrap_or_default(),
        timestamp: text(author, "date")
            .and_then(|date| DateTime::parse_from_rfc3339(&date).ok())
            .map(|date| date.with_timezone(&Utc)),
        patch_set: files,
    })
}

/// Commits between two revisions, oldest first.
///
/// Without a start revision the last few commits up to `end_sha` are used.
pub async fn fetch_commits(
    client: &GitHubClient,
    repo_name: &str,
    start_sha: Option<&str>,
    end_sha: &str,
) -> PluginResult<Vec<Commit>> {
    let listed: Vec<Value> = match start_sha {
        Some(start_sha) => client
            .compare_commits(repo_name, start_sha, end_sha)
            .await?
            .get("commits")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
        None => {
            let recent = client.get_last_commits(repo_name, end_sha).await?;
            let mut recent: Vec<Value> = recent
                .as_array()
                .map(|commits| commits.iter().take(LAST_COMMITS_LIMIT).cloned().collect())
                .unwrap_or_default();
            recent.reverse();
            recent
        }
    };

    let mut commits = Vec::with_capacity(listed.len());
    for data in &listed {
        let sha = match data.get("sha").and_then(Value::as_str) {
            Some(sha) => sha,
            None => continue,
        };
        let files = patch_set(&client.get_commit(repo_name, sha).await?);
        if let Some(commit) = commit_from_json(repo_name, data, files) {
            commits.push(commit);
        }
    }
    Ok(commits)
}

/// Map a failed repository lookup to a form error
fn repo_lookup_error(repo: &str, err: PluginError) -> PluginError {
    match err.status_code() {
        Some(404) => PluginError::validation(format!(
            "Could not find repository {}. Make sure the account has access to it.",
            repo
        )),
        _ => err,
    }
}

/// Repository provider authenticated through a user's GitHub identity
pub struct GitHubRepositoryProvider {
    settings: PluginSettings,
    api_url: String,
}

impl GitHubRepositoryProvider {
    pub fn new(settings: PluginSettings) -> Self {
        Self::with_api_url(settings, DEFAULT_API_URL)
    }

    pub fn with_api_url(settings: PluginSettings, api_url: &str) -> Self {
        Self { settings, api_url: api_url.to_string() }
    }

    fn client(&self, access_token: &str) -> PluginResult<GitHubClient> {
        GitHubClient::new(&self.settings, &self.api_url, access_token)
    }
}

#[async_trait]
impl RepositoryProvider for GitHubRepositoryProvider {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    fn name(&self) -> &str {
        "GitHub"
    }

    fn config_fields(&self) -> Vec<ConfigField> {
        vec![ConfigField::text("name", "Repository Name")
            .required()
            .placeholder("e.g. getsentry/sentry")
            .help("Enter your repository name, including the owner.")]
    }

    async fn validate_config(
        &self,
        _ctx: &PluginContext,
        config: &Map<String, Value>,
        access_token: &str,
    ) -> PluginResult<Map<String, Value>> {
        let mut cleaned = fields::clean_form(&self.config_fields(), config)?;
        let name = cleaned
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_default();
        validate_repo_name(&name)?;

        let repo = self
            .client(access_token)?
            .get_repo(&name)
            .await
            .map_err(|e| repo_lookup_error(&name, e))?;
        let external_id = repo
            .get("id")
            .map(value_to_string)
            .ok_or_else(|| PluginError::api(None, "GitHub response did not contain a repository id"))?;
        cleaned.insert("external_id".to_string(), json!(external_id));
        Ok(cleaned)
    }

    async fn create_repository(
        &self,
        _ctx: &PluginContext,
        config: &Map<String, Value>,
        _access_token: &str,
    ) -> PluginResult<Repository> {
        let name = config
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| PluginError::validation("Repository Name: This field is required."))?;

        let mut repo = Repository::new(name, PROVIDER_ID);
        repo.external_id = config.get("external_id").and_then(Value::as_str).map(str::to_string);
        repo.url = Some(format!("{}/{}", web_url(&self.api_url), name));
        repo.config.insert("name".to_string(), json!(name));
        Ok(repo)
    }

    async fn compare_commits(
        &self,
        _ctx: &PluginContext,
        repo: &Repository,
        start_sha: Option<&str>,
        end_sha: &str,
        access_token: &str,
    ) -> PluginResult<Vec<Commit>> {
        let name = repo.config.get("name").and_then(Value::as_str).unwrap_or(&repo.name);
        fetch_commits(&self.client(access_token)?, name, start_sha, end_sha).await
    }
}

/// Repository provider backed by an installed GitHub integration
pub struct GitHubIntegrationRepositoryProvider {
    settings: PluginSettings,
    api_url: String,
}

impl GitHubIntegrationRepositoryProvider {
    pub fn new(settings: PluginSettings) -> Self {
        Self::with_api_url(settings, DEFAULT_API_URL)
    }

    pub fn with_api_url(settings: PluginSettings, api_url: &str) -> Self {
        Self { settings, api_url: api_url.to_string() }
    }

    fn client(&self, ctx: &PluginContext, integration_id: u64) -> PluginResult<GitHubClient> {
        let token = ctx
            .get_option(&integration_token_key(integration_id), None, None)?
            .and_then(|token| token.as_str().map(str::to_string))
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                PluginError::invalid_identity(
                    format!("GitHub integration {} has no access token", integration_id),
                    None,
                )
            })?;
        GitHubClient::new(&self.settings, &self.api_url, &token)
    }
}

#[async_trait]
impl IntegrationRepositoryProvider for GitHubIntegrationRepositoryProvider {
    fn id(&self) -> &str {
        INTEGRATION_PROVIDER_ID
    }

    fn name(&self) -> &str {
        "GitHub"
    }

    async fn get_repository_data(
        &self,
        ctx: &PluginContext,
        integration_id: u64,
        config: &Map<String, Value>,
    ) -> PluginResult<Map<String, Value>> {
        let identifier = config
            .get("identifier")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| PluginError::validation("Repository: This field is required."))?;
        validate_repo_name(identifier)?;

        let repo = self
            .client(ctx, integration_id)?
            .get_repo(identifier)
            .await
            .map_err(|e| repo_lookup_error(identifier, e))?;

        let mut data = config.clone();
        data.insert(
            "name".to_string(),
            repo.get("full_name").cloned().unwrap_or_else(|| json!(identifier)),
        );
        data.insert("external_id".to_string(), repo.get("id").cloned().unwrap_or(Value::Null));
        Ok(data)
    }

    fn build_repository_config(&self, integration_id: u64, data: &Map<String, Value>) -> PluginResult<Repository> {
        let name = data
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| PluginError::validation("Repository data is missing a name"))?;

        let mut repo = Repository::new(name, INTEGRATION_PROVIDER_ID);
        repo.external_id = data
            .get("external_id")
            .filter(|id| !id.is_null())
            .map(value_to_string);
        repo.url = Some(format!("{}/{}", web_url(&self.api_url), name));
        repo.integration_id = Some(integration_id);
        repo.config.insert("name".to_string(), json!(name));
        Ok(repo)
    }

    async fn compare_commits(
        &self,
        ctx: &PluginContext,
        repo: &Repository,
        start_sha: Option<&str>,
        end_sha: &str,
    ) -> PluginResult<Vec<Commit>> {
        let integration_id = repo
            .integration_id
            .ok_or_else(|| PluginError::validation(format!("Repository {} has no integration", repo.name)))?;
        let name = repo.config.get("name").and_then(Value::as_str).unwrap_or(&repo.name);
        fetch_commits(&self.client(ctx, integration_id)?, name, start_sha, end_sha).await
    }
}
