//! Provider Bindings
//!
//! Extension points that are not plugins. Each binding name owns a
//! [`ProviderManager`] mapping provider ids to factories; the provider
//! type of every binding is fixed at compile time.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use parking_lot::RwLock;
use super::bases::{IntegrationRepositoryProvider, RepositoryProvider};
use super::error::{PluginError, PluginResult};

/// Constructor of one provider, given its id
pub type ProviderFactory<P> = Arc<dyn Fn(&str) -> Arc<P> + Send + Sync>;

/// Provider id to factory table for one binding
pub struct ProviderManager<P: ?Sized> {
    binding: BindingName,
    providers: RwLock<BTreeMap<String, ProviderFactory<P>>>,
}

impl<P: ?Sized> ProviderManager<P> {
    pub fn new(binding: BindingName) -> Self {
        Self {
            binding,
            providers: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn binding(&self) -> BindingName {
        self.binding
    }

    /// Register a provider factory, replacing any previous one for the id
    pub fn add<F>(&self, id: &str, factory: F)
    where
        F: Fn(&str) -> Arc<P> + Send + Sync + 'static,
    {
        self.providers.write().insert(id.to_string(), Arc::new(factory));
    }

    pub fn remove(&self, id: &str) -> bool {
        self.providers.write().remove(id).is_some()
    }

    /// Instantiate the provider registered under `id`
    pub fn get(&self, id: &str) -> PluginResult<Arc<P>> {
        let factory = self
            .providers
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| PluginError::provider_not_found(self.binding.as_str(), id))?;
        Ok(factory(id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.providers.read().contains_key(id)
    }

    /// Registered ids in sorted order
    pub fn ids(&self) -> Vec<String> {
        self.providers.read().keys().cloned().collect()
    }

    /// Instantiate every provider
    pub fn all(&self) -> Vec<(String, Arc<P>)> {
        let providers: Vec<(String, ProviderFactory<P>)> = self
            .providers
            .read()
            .iter()
            .map(|(id, factory)| (id.clone(), Arc::clone(factory)))
            .collect();
        providers
            .into_iter()
            .map(|(id, factory)| {
                let provider = factory(&id);
                (id, provider)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.providers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.read().is_empty()
    }
}

/// Known extension points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingName {
    RepositoryProvider,
    IntegrationRepositoryProvider,
}

impl BindingName {
    pub const ALL: [BindingName; 2] = [
        BindingName::RepositoryProvider,
        BindingName::IntegrationRepositoryProvider,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BindingName::RepositoryProvider => "repository.provider",
            BindingName::IntegrationRepositoryProvider => "integration-repository.provider",
        }
    }
}

impl fmt::Display for BindingName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BindingName {
    type Err = PluginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BindingName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| PluginError::binding_not_found(s))
    }
}

/// A binding's provider table, typed by binding
pub enum Binding<'a> {
    Repository(&'a ProviderManager<dyn RepositoryProvider>),
    IntegrationRepository(&'a ProviderManager<dyn IntegrationRepositoryProvider>),
}

impl Binding<'_> {
    pub fn ids(&self) -> Vec<String> {
        match self {
            Binding::Repository(manager) => manager.ids(),
            Binding::IntegrationRepository(manager) => manager.ids(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        match self {
            Binding::Repository(manager) => manager.contains(id),
            Binding::IntegrationRepository(manager) => manager.contains(id),
        }
    }
}

/// Registry of every binding
pub struct BindingManager {
    repository: ProviderManager<dyn RepositoryProvider>,
    integration_repository: ProviderManager<dyn IntegrationRepositoryProvider>,
}

impl BindingManager {
    pub fn new() -> Self {
        Self {
            repository: ProviderManager::new(BindingName::RepositoryProvider),
            integration_repository: ProviderManager::new(BindingName::IntegrationRepositoryProvider),
        }
    }

    pub fn repository_providers(&self) -> &ProviderManager<dyn RepositoryProvider> {
        &self.repository
    }

    pub fn integration_repository_providers(&self) -> &ProviderManager<dyn IntegrationRepositoryProvider> {
        &self.integration_repository
    }

    /// Look up a binding by its dotted name
    pub fn get(&self, name: &str) -> PluginResult<Binding<'_>> {
        Ok(match name.parse::<BindingName>()? {
            BindingName::RepositoryProvider => Binding::Repository(&self.repository),
            BindingName::IntegrationRepositoryProvider => {
                Binding::IntegrationRepository(&self.integration_repository)
            }
        })
    }

    pub fn names(&self) -> Vec<&'static str> {
        BindingName::ALL.iter().map(|name| name.as_str()).collect()
    }

    pub fn provider_ids(&self, name: &str) -> PluginResult<Vec<String>> {
        Ok(self.get(name)?.ids())
    }
}

impl Default for BindingManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{Map, Value};
    use crate::model::{Commit, Repository};
    use crate::plugin::context::PluginContext;
    use crate::plugin::fields::ConfigField;

    struct DummyProvider {
        id: String,
    }

    #[async_trait]
    impl RepositoryProvider for DummyProvider {
        fn id(&self) -> &str {
            &self.id
        }

        fn name(&self) -> &str {
            "Dummy"
        }

        fn config_fields(&self) -> Vec<ConfigField> {
            vec![ConfigField::text("name", "Repository").required()]
        }

        async fn validate_config(
            &self,
            _ctx: &PluginContext,
            config: &Map<String, Value>,
            _access_token: &str,
        ) -> PluginResult<Map<String, Value>> {
            Ok(config.clone())
        }

        async fn create_repository(
            &self,
            _ctx: &PluginContext,
            config: &Map<String, Value>,
            _access_token: &str,
        ) -> PluginResult<Repository> {
            let name = config.get("name").and_then(Value::as_str).unwrap_or_default();
            Ok(Repository::new(name, &self.id))
        }

        async fn compare_commits(
            &self,
            _ctx: &PluginContext,
            _repo: &Repository,
            _start_sha: Option<&str>,
            _end_sha: &str,
            _access_token: &str,
        ) -> PluginResult<Vec<Commit>> {
            Ok(Vec::new())
        }
    }

    fn dummy(id: &str) -> Arc<dyn RepositoryProvider> {
        Arc::new(DummyProvider { id: id.to_string() })
    }

    #[test]
    fn test_add_and_get_provider() {
        let bindings = BindingManager::new();
        bindings.repository_providers().add("dummy", dummy);

        let provider = bindings.repository_providers().get("dummy").unwrap();
        assert_eq!(provider.id(), "dummy");
        assert_eq!(provider.name(), "Dummy");
        assert!(bindings.repository_providers().contains("dummy"));
    }

    #[test]
    fn test_missing_provider() {
        let bindings = BindingManager::new();
        let err = bindings.repository_providers().get("gitlab").err().unwrap();
        assert!(matches!(err, PluginError::ProviderNotFound { ref binding, ref id }
            if binding == "repository.provider" && id == "gitlab"));
    }

    #[test]
    fn test_ids_are_sorted_and_all_instantiates() {
        let bindings = BindingManager::new();
        let providers = bindings.repository_providers();
        providers.add("zeta", dummy);
        providers.add("alpha", dummy);

        assert_eq!(providers.ids(), vec!["alpha", "zeta"]);
        let all = providers.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].1.id(), "zeta");
        assert!(providers.remove("zeta"));
        assert_eq!(providers.len(), 1);
    }

    #[test]
    fn test_lookup_by_name() {
        let bindings = BindingManager::new();
        bindings.repository_providers().add("dummy", dummy);

        assert_eq!(bindings.names(), vec!["repository.provider", "integration-repository.provider"]);
        assert_eq!(bindings.provider_ids("repository.provider").unwrap(), vec!["dummy"]);
        assert!(bindings.provider_ids("integration-repository.provider").unwrap().is_empty());
        assert!(matches!(bindings.get("repository.provider").unwrap(), Binding::Repository(_)));

        let err = bindings.get("issue-tracker.provider").err().unwrap();
        assert!(matches!(err, PluginError::BindingNotFound { .. }));
    }
}
