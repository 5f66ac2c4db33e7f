//! Plugin Manager
//!
//! Registry of installed plugins. Owns the instance manager and answers the
//! lookups the pipeline, the CLI and the option screens need: every plugin,
//! the ones enabled for a project, the site-configurable ones, and the
//! first plugin answering a hook.

use std::collections::HashSet;
use std::sync::Arc;
use parking_lot::RwLock;
use crate::model::Project;
use super::context::PluginContext;
use super::descriptor::PluginVersion;
use super::error::{PluginError, PluginResult};
use super::instance::{InstanceManager, PluginCatalog};
use super::safe::safe_execute;
use super::traits::{Plugin, PluginClass};

/// Registry of plugin singletons keyed by class path
pub struct PluginManager {
    instances: InstanceManager,
    /// Slugs switched off by site configuration
    disabled: RwLock<HashSet<String>>,
}

impl PluginManager {
    /// Create a manager over a catalog and the installed class paths
    pub fn new(catalog: Arc<PluginCatalog>, class_list: Vec<String>) -> Self {
        Self {
            instances: InstanceManager::new(catalog, class_list),
            disabled: RwLock::new(HashSet::new()),
        }
    }

    /// Globally disable plugins by slug
    pub fn with_disabled<I, S>(self, slugs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disabled.write().extend(slugs.into_iter().map(Into::into));
        self
    }

    pub fn catalog(&self) -> &Arc<PluginCatalog> {
        self.instances.catalog()
    }

    pub fn class_paths(&self) -> Vec<String> {
        self.instances.class_list()
    }

    /// Install a plugin type, making it known to the catalog if needed
    pub fn register<T: PluginClass>(&self) {
        if !self.catalog().contains(T::CLASS_PATH) {
            self.catalog().add_class::<T>();
        }
        self.instances.add(T::CLASS_PATH);
    }

    /// Install a class path already known to the catalog
    pub fn register_path(&self, class_path: &str) -> PluginResult<()> {
        if !self.catalog().contains(class_path) {
            return Err(PluginError::class_not_registered(class_path));
        }
        self.instances.add(class_path);
        Ok(())
    }

    /// Uninstall a class path, returning whether it was installed
    pub fn unregister(&self, class_path: &str) -> bool {
        self.instances.remove(class_path)
    }

    pub fn unregister_class<T: PluginClass>(&self) -> bool {
        self.unregister(T::CLASS_PATH)
    }

    pub fn set_disabled(&self, slug: &str, disabled: bool) {
        let mut set = self.disabled.write();
        if disabled {
            set.insert(slug.to_string());
        } else {
            set.remove(slug);
        }
    }

    fn globally_enabled(&self, plugin: &dyn Plugin) -> bool {
        plugin.descriptor().enabled && !self.disabled.read().contains(plugin.slug())
    }

    /// Globally enabled plugins sorted by title, optionally of one API version
    pub fn all(&self, version: Option<PluginVersion>) -> Vec<Arc<dyn Plugin>> {
        let mut plugins: Vec<Arc<dyn Plugin>> = self
            .instances
            .all()
            .into_iter()
            .filter(|plugin| self.globally_enabled(plugin.as_ref()))
            .filter(|plugin| version.map_or(true, |v| plugin.api_version() == v))
            .collect();
        plugins.sort_by(|a, b| a.title().cmp(b.title()));
        plugins
    }

    pub fn len(&self) -> usize {
        self.all(None).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn exists(&self, slug: &str) -> bool {
        self.all(None).iter().any(|plugin| plugin.slug() == slug)
    }

    /// Look up an enabled plugin by slug
    pub fn get(&self, slug: &str) -> PluginResult<Arc<dyn Plugin>> {
        self.all(None)
            .into_iter()
            .find(|plugin| plugin.slug() == slug)
            .ok_or_else(|| PluginError::plugin_not_found(slug))
    }

    /// Plugins enabled for a project; plugins failing the check are skipped
    pub fn for_project(
        &self,
        ctx: &PluginContext,
        project: &Project,
        version: Option<PluginVersion>,
    ) -> Vec<Arc<dyn Plugin>> {
        self.all(version)
            .into_iter()
            .filter(|plugin| {
                safe_execute(plugin.slug(), "is_enabled", || plugin.is_enabled(ctx, Some(project)))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Plugins with site-wide configuration
    pub fn for_site(&self, version: Option<PluginVersion>) -> Vec<Arc<dyn Plugin>> {
        self.all(version)
            .into_iter()
            .filter(|plugin| plugin.has_site_conf())
            .collect()
    }

    /// Plugins a project may configure; plugins failing the check are skipped
    pub fn configurable_for_project(
        &self,
        ctx: &PluginContext,
        project: &Project,
        version: Option<PluginVersion>,
    ) -> Vec<Arc<dyn Plugin>> {
        self.all(version)
            .into_iter()
            .filter(|plugin| {
                safe_execute(plugin.slug(), "can_configure_for_project", || {
                    plugin.can_configure_for_project(ctx, project)
                })
                .unwrap_or(false)
            })
            .collect()
    }

    /// Plugins with any configuration surface, project or site
    pub fn plugin_that_can_be_configured(&self) -> Vec<Arc<dyn Plugin>> {
        self.all(None)
            .into_iter()
            .filter(|plugin| {
                (plugin.has_project_conf() && plugin.can_enable_for_projects()) || plugin.has_site_conf()
            })
            .collect()
    }

    /// First non-empty hook result.
    ///
    /// Plugins whose hook fails or panics are logged and skipped.
    pub fn first<T, F>(&self, hook: &str, version: Option<PluginVersion>, mut f: F) -> Option<T>
    where
        F: FnMut(&dyn Plugin) -> PluginResult<Option<T>>,
    {
        self.all(version)
            .into_iter()
            .find_map(|plugin| safe_execute(plugin.slug(), hook, || f(plugin.as_ref())).flatten())
    }
}
