//! Plugin Instances
//!
//! The [`PluginCatalog`] knows how to construct every plugin type by its
//! dotted class path. The [`InstanceManager`] holds the ordered list of
//! installed class paths and lazily turns it into singleton instances.

use std::collections::HashMap;
use std::sync::Arc;
use log::{debug, error, warn};
use parking_lot::RwLock;
use super::error::{PluginError, PluginResult};
use super::settings::PluginSettings;
use super::traits::{Plugin, PluginClass};

/// Constructor of one plugin type
pub type PluginFactory = Arc<dyn Fn() -> PluginResult<Arc<dyn Plugin>> + Send + Sync>;

/// Class path to factory table
pub struct PluginCatalog {
    settings: PluginSettings,
    factories: RwLock<HashMap<String, PluginFactory>>,
}

impl PluginCatalog {
    pub fn new(settings: PluginSettings) -> Self {
        Self {
            settings,
            factories: RwLock::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &PluginSettings {
        &self.settings
    }

    /// Make a plugin type constructible under its class path
    pub fn add_class<T: PluginClass>(&self) {
        let settings = self.settings.clone();
        self.add_factory(
            T::CLASS_PATH,
            Arc::new(move || T::create(&settings).map(|plugin| Arc::new(plugin) as Arc<dyn Plugin>)),
        );
    }

    pub fn add_factory(&self, class_path: &str, factory: PluginFactory) {
        self.factories.write().insert(class_path.to_string(), factory);
    }

    pub fn contains(&self, class_path: &str) -> bool {
        self.factories.read().contains_key(class_path)
    }

    pub fn class_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.factories.read().keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Construct a fresh instance of a class path
    pub fn instantiate(&self, class_path: &str) -> PluginResult<Arc<dyn Plugin>> {
        let factory = self
            .factories
            .read()
            .get(class_path)
            .cloned()
            .ok_or_else(|| PluginError::class_not_registered(class_path))?;
        factory()
    }
}

#[derive(Default)]
struct InstanceCache {
    entries: Vec<(String, Arc<dyn Plugin>)>,
    valid: bool,
}

/// Ordered class paths plus the cached instances built from them
pub struct InstanceManager {
    catalog: Arc<PluginCatalog>,
    class_list: RwLock<Vec<String>>,
    cache: RwLock<InstanceCache>,
}

impl InstanceManager {
    pub fn new(catalog: Arc<PluginCatalog>, class_list: Vec<String>) -> Self {
        Self {
            catalog,
            class_list: RwLock::new(class_list),
            cache: RwLock::new(InstanceCache::default()),
        }
    }

    pub fn catalog(&self) -> &Arc<PluginCatalog> {
        &self.catalog
    }

    pub fn class_list(&self) -> Vec<String> {
        self.class_list.read().clone()
    }

    /// Append a class path; already present paths keep their position
    pub fn add(&self, class_path: &str) {
        {
            let mut class_list = self.class_list.write();
            if !class_list.iter().any(|path| path == class_path) {
                class_list.push(class_path.to_string());
            }
        }
        self.invalidate();
    }

    /// Remove a class path, returning whether it was installed
    pub fn remove(&self, class_path: &str) -> bool {
        let removed = {
            let mut class_list = self.class_list.write();
            let before = class_list.len();
            class_list.retain(|path| path != class_path);
            class_list.len() != before
        };
        self.invalidate();
        removed
    }

    /// Replace the whole class list
    pub fn update(&self, class_list: Vec<String>) {
        *self.class_list.write() = class_list;
        self.invalidate();
    }

    fn invalidate(&self) {
        self.cache.write().valid = false;
    }

    /// Instances of still-installed classes survive a rebuild
    fn build(&self, previous: Vec<(String, Arc<dyn Plugin>)>) -> Vec<(String, Arc<dyn Plugin>)> {
        let mut previous: HashMap<String, Arc<dyn Plugin>> = previous.into_iter().collect();
        let class_list = self.class_list.read().clone();
        let mut entries = Vec::with_capacity(class_list.len());

        for class_path in class_list {
            if let Some(plugin) = previous.remove(&class_path) {
                entries.push((class_path, plugin));
                continue;
            }

            match self.catalog.instantiate(&class_path) {
                Ok(plugin) => {
                    debug!("plugin.loaded class_path={} slug={}", class_path, plugin.slug());
                    entries.push((class_path, plugin));
                }
                Err(e @ PluginError::InvalidConfiguration { .. }) => {
                    warn!("plugin.invalid_configuration class_path={} error={}", class_path, e);
                }
                Err(e) => {
                    error!("plugin.load_failed class_path={} error={}", class_path, e);
                }
            }
        }

        entries
    }

    /// Every loadable plugin, in class list order
    pub fn all(&self) -> Vec<Arc<dyn Plugin>> {
        {
            let cache = self.cache.read();
            if cache.valid {
                return cache.entries.iter().map(|(_, plugin)| Arc::clone(plugin)).collect();
            }
        }

        let mut cache = self.cache.write();
        if !cache.valid {
            let previous = std::mem::take(&mut cache.entries);
            cache.entries = self.build(previous);
            cache.valid = true;
        }
        cache.entries.iter().map(|(_, plugin)| Arc::clone(plugin)).collect()
    }
}
