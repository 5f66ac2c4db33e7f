//! Built-in Plugin Implementations
//!
//! Integrations shipped with the crate, plus helpers that register them with
//! a catalog and a binding manager at start-up.

use std::sync::Arc;
use super::bases::{IntegrationRepositoryProvider, RepositoryProvider};
use super::bindings::BindingManager;
use super::instance::PluginCatalog;
use super::settings::PluginSettings;
use super::traits::PluginClass;

pub mod github;
pub mod pagerduty;
pub mod splunk;
pub mod taggers;
pub mod webhooks;

// Re-export built-in plugins
pub use github::{GitHubIntegrationRepositoryProvider, GitHubPlugin, GitHubRepositoryProvider};
pub use pagerduty::PagerDutyPlugin;
pub use splunk::SplunkPlugin;
pub use taggers::{InterfaceTypesPlugin, UrlsPlugin};
pub use webhooks::WebHooksPlugin;

/// Catalog able to construct every built-in plugin
pub fn catalog(settings: PluginSettings) -> PluginCatalog {
    let catalog = PluginCatalog::new(settings);
    catalog.add_class::<WebHooksPlugin>();
    catalog.add_class::<PagerDutyPlugin>();
    catalog.add_class::<GitHubPlugin>();
    catalog.add_class::<SplunkPlugin>();
    catalog.add_class::<UrlsPlugin>();
    catalog.add_class::<InterfaceTypesPlugin>();
    catalog
}

/// Class paths installed when the configuration names none
pub fn default_class_list() -> Vec<String> {
    [
        WebHooksPlugin::CLASS_PATH,
        PagerDutyPlugin::CLASS_PATH,
        GitHubPlugin::CLASS_PATH,
        SplunkPlugin::CLASS_PATH,
        UrlsPlugin::CLASS_PATH,
        InterfaceTypesPlugin::CLASS_PATH,
    ]
    .iter()
    .map(|path| path.to_string())
    .collect()
}

/// Register the built-in repository providers
pub fn register_bindings(bindings: &BindingManager, settings: &PluginSettings) {
    let repo_settings = settings.clone();
    bindings.repository_providers().add(github::repository::PROVIDER_ID, move |_| {
        Arc::new(GitHubRepositoryProvider::new(repo_settings.clone())) as Arc<dyn RepositoryProvider>
    });

    let integration_settings = settings.clone();
    bindings
        .integration_repository_providers()
        .add(github::repository::INTEGRATION_PROVIDER_ID, move |_| {
            Arc::new(GitHubIntegrationRepositoryProvider::new(integration_settings.clone()))
                as Arc<dyn IntegrationRepositoryProvider>
        });
}
