//! Plugin System Module
//!
//! Registries, base contracts and built-in integrations. A host builds one
//! [`PluginManager`] and one [`BindingManager`] at start-up and passes them
//! by reference; plugin state lives in the option store behind a
//! [`PluginContext`].
//!
//! # Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use sentry_plugins::plugin::{builtin, PluginContext, PluginManager, PluginSettings};
//!
//! let settings = PluginSettings::default();
//! let catalog = Arc::new(builtin::catalog(settings.clone()));
//! let manager = PluginManager::new(catalog, builtin::default_class_list());
//!
//! let ctx = PluginContext::in_memory();
//! for plugin in manager.all(None) {
//!     println!("{} enabled={:?}", plugin.slug(), plugin.is_enabled(&ctx, None));
//! }
//! ```

pub mod traits;
pub mod error;
pub mod context;
pub mod settings;
pub mod descriptor;
pub mod fields;
pub mod ratelimit;
pub mod safe;
pub mod bases;
pub mod instance;
pub mod manager;
pub mod bindings;
pub mod client;
pub mod dispatch;
pub mod builtin;

#[cfg(test)]
pub mod tests;

// Re-export core types for easier access
pub use traits::{EventPreprocessor, Plugin, PluginAction, PluginAnnotation, PluginClass};
pub use error::{PluginError, PluginResult};
pub use context::PluginContext;
pub use settings::PluginSettings;
pub use descriptor::{PluginDescriptor, PluginFeatures, PluginType, PluginVersion};
pub use fields::{ConfigField, FieldScope, FieldType};

// Specialized contracts
pub use bases::{
    DataForwardingPlugin, IntegrationRepositoryProvider, IssueTrackingPlugin, NotificationPlugin,
    RepositoryProvider, TagPlugin,
};

// Registry and management
pub use instance::{InstanceManager, PluginCatalog};
pub use manager::PluginManager;
pub use bindings::{Binding, BindingManager, BindingName, ProviderManager};
pub use safe::{safe_execute, safe_execute_async};
pub use dispatch::{post_process_group, preprocess_event, PostProcessReport};
