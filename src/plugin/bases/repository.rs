//! Repository providers
//!
//! Providers are not plugins: they are registered under a binding name in
//! the [`BindingManager`](crate::plugin::bindings::BindingManager) and
//! looked up by provider id when a repository is connected or when commits
//! are fetched for a release.

use async_trait::async_trait;
use serde_json::{Map, Value};
use crate::model::{Commit, Repository};
use crate::plugin::context::PluginContext;
use crate::plugin::error::PluginResult;
use crate::plugin::fields::ConfigField;

/// Provider authenticated through a user's linked identity
#[async_trait]
pub trait RepositoryProvider: Send + Sync {
    /// Provider id, e.g. `github`
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn config_fields(&self) -> Vec<ConfigField>;

    /// Validate submitted configuration against the remote service
    async fn validate_config(
        &self,
        ctx: &PluginContext,
        config: &Map<String, Value>,
        access_token: &str,
    ) -> PluginResult<Map<String, Value>>;

    /// Build the repository record from validated configuration
    async fn create_repository(
        &self,
        ctx: &PluginContext,
        config: &Map<String, Value>,
        access_token: &str,
    ) -> PluginResult<Repository>;

    /// Remove remote hooks; nothing to do by default
    async fn delete_repository(
        &self,
        _ctx: &PluginContext,
        _repo: &Repository,
        _access_token: &str,
    ) -> PluginResult<()> {
        Ok(())
    }

    /// Commits between two revisions, oldest first.
    ///
    /// Without a start revision the most recent commits up to the end
    /// revision are returned.
    async fn compare_commits(
        &self,
        ctx: &PluginContext,
        repo: &Repository,
        start_sha: Option<&str>,
        end_sha: &str,
        access_token: &str,
    ) -> PluginResult<Vec<Commit>>;
}

/// Provider authenticated through an installed integration
#[async_trait]
pub trait IntegrationRepositoryProvider: Send + Sync {
    /// Provider id, e.g. `integrations:github`
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    /// Fetch and validate repository details from the remote service
    async fn get_repository_data(
        &self,
        ctx: &PluginContext,
        integration_id: u64,
        config: &Map<String, Value>,
    ) -> PluginResult<Map<String, Value>>;

    /// Build the repository record from fetched repository data
    fn build_repository_config(&self, integration_id: u64, data: &Map<String, Value>) -> PluginResult<Repository>;

    async fn compare_commits(
        &self,
        ctx: &PluginContext,
        repo: &Repository,
        start_sha: Option<&str>,
        end_sha: &str,
    ) -> PluginResult<Vec<Commit>>;
}
