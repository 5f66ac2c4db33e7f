//! GitHub REST API client

use serde_json::Value;
use crate::plugin::client::{ApiClient, ApiRequest, ApiResponse};
use crate::plugin::error::PluginResult;
use crate::plugin::settings::PluginSettings;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const ACCEPT: &str = "application/vnd.github+json";

/// Number of commits fetched when a release has no previous revision
pub const LAST_COMMITS_LIMIT: usize = 10;

/// Web URL matching an API URL.
///
/// `api.github.com` maps to `github.com`; Enterprise installs drop their
/// `/api/v3` suffix.
pub fn web_url(api_url: &str) -> String {
    let api_url = api_url.trim_end_matches('/');
    if api_url == DEFAULT_API_URL {
        return "https://github.com".to_string();
    }
    api_url.trim_end_matches("/api/v3").to_string()
}

/// Client authenticated with a single access token
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: ApiClient,
    token: String,
}

impl GitHubClient {
    pub fn new(settings: &PluginSettings, api_url: &str, token: &str) -> PluginResult<Self> {
        let client = ApiClient::builder("github")
            .settings(settings)
            .base_url(api_url)
            .build()?;
        Ok(Self { client, token: token.to_string() })
    }

    fn request(&self) -> ApiRequest {
        ApiRequest::new().header("Accept", ACCEPT).bearer(&self.token)
    }

    async fn get(&self, path: &str) -> PluginResult<ApiResponse> {
        self.client.get(path, self.request()).await
    }

    pub async fn get_repo(&self, repo: &str) -> PluginResult<Value> {
        Ok(self.get(&format!("/repos/{}", repo)).await?.body)
    }

    pub async fn get_issue(&self, repo: &str, issue_id: &str) -> PluginResult<Value> {
        Ok(self.get(&format!("/repos/{}/issues/{}", repo, issue_id)).await?.body)
    }

    pub async fn create_issue(&self, repo: &str, data: Value) -> PluginResult<Value> {
        let response = self
            .client
            .post(&format!("/repos/{}/issues", repo), self.request().json(data))
            .await?;
        Ok(response.body)
    }

    pub async fn create_comment(&self, repo: &str, issue_id: &str, data: Value) -> PluginResult<Value> {
        let response = self
            .client
            .post(&format!("/repos/{}/issues/{}/comments", repo, issue_id), self.request().json(data))
            .await?;
        Ok(response.body)
    }

    /// Comparison between two revisions, commits listed oldest first
    pub async fn compare_commits(&self, repo: &str, start_sha: &str, end_sha: &str) -> PluginResult<Value> {
        Ok(self
            .get(&format!("/repos/{}/compare/{}...{}", repo, start_sha, end_sha))
            .await?
            .body)
    }

    /// Most recent commits reachable from `end_sha`, newest first
    pub async fn get_last_commits(&self, repo: &str, end_sha: &str) -> PluginResult<Value> {
        let request = self.request().param("sha", end_sha);
        Ok(self
            .client
            .get(&format!("/repos/{}/commits", repo), request)
            .await?
            .body)
    }

    /// Single commit including its changed files
    pub async fn get_commit(&self, repo: &str, sha: &str) -> PluginResult<Value> {
        Ok(self.get(&format!("/repos/{}/commits/{}", repo, sha)).await?.body)
    }
}
