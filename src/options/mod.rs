//! Scoped Option Storage
//!
//! Plugin options live in a single key/value store parameterized by scope.
//! A scope is global, a project, or a user (optionally narrowed to one
//! project). Plugin option keys are namespaced as `<conf_key>:<name>`.
//!
//! ```
//! use sentry_plugins::options::{MemoryOptionStore, OptionScope, OptionStore};
//! use serde_json::json;
//!
//! let store = MemoryOptionStore::new();
//! store.set(&OptionScope::Project(1), "webhooks:urls", json!("https://example.com")).unwrap();
//! assert!(store.get(&OptionScope::Project(1), "webhooks:urls").unwrap().is_some());
//! ```

pub mod memory;
pub mod file;
pub mod group_meta;

pub use memory::MemoryOptionStore;
pub use file::FileOptionStore;
pub use group_meta::GroupMetaStore;

use std::fmt;
use std::str::FromStr;
use serde_json::Value;
use crate::model::{ProjectId, UserId};
use crate::plugin::error::{PluginError, PluginResult};

/// Storage scope of an option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OptionScope {
    Global,
    Project(ProjectId),
    User {
        user_id: UserId,
        project_id: Option<ProjectId>,
    },
}

impl OptionScope {
    /// Pick the scope an option lookup addresses.
    ///
    /// A user always wins (narrowed to the project when one is given), then
    /// the project, then the global scope.
    pub fn resolve(project: Option<ProjectId>, user: Option<UserId>) -> Self {
        match (user, project) {
            (Some(user_id), project_id) => OptionScope::User { user_id, project_id },
            (None, Some(project_id)) => OptionScope::Project(project_id),
            (None, None) => OptionScope::Global,
        }
    }

    pub fn user(user_id: UserId) -> Self {
        OptionScope::User { user_id, project_id: None }
    }

    pub fn project_id(&self) -> Option<ProjectId> {
        match self {
            OptionScope::Global => None,
            OptionScope::Project(id) => Some(*id),
            OptionScope::User { project_id, .. } => *project_id,
        }
    }
}

impl fmt::Display for OptionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionScope::Global => write!(f, "global"),
            OptionScope::Project(id) => write!(f, "project:{}", id),
            OptionScope::User { user_id, project_id: None } => write!(f, "user:{}", user_id),
            OptionScope::User { user_id, project_id: Some(project_id) } => {
                write!(f, "user:{}:project:{}", user_id, project_id)
            }
        }
    }
}

impl FromStr for OptionScope {
    type Err = PluginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let parse_id = |raw: &str| {
            raw.parse::<u64>()
                .map_err(|_| PluginError::storage(format!("Invalid option scope: {}", s)))
        };

        match parts.as_slice() {
            ["global"] => Ok(OptionScope::Global),
            ["project", id] => Ok(OptionScope::Project(parse_id(id)?)),
            ["user", id] => Ok(OptionScope::user(parse_id(id)?)),
            ["user", id, "project", project] => Ok(OptionScope::User {
                user_id: parse_id(id)?,
                project_id: Some(parse_id(project)?),
            }),
            _ => Err(PluginError::storage(format!("Invalid option scope: {}", s))),
        }
    }
}

/// Key/value option storage shared by all plugins
pub trait OptionStore: Send + Sync {
    /// Read an option, `None` when unset
    fn get(&self, scope: &OptionScope, key: &str) -> PluginResult<Option<Value>>;

    /// Write an option, replacing any previous value
    fn set(&self, scope: &OptionScope, key: &str, value: Value) -> PluginResult<()>;

    /// Remove an option, returning whether it was set
    fn unset(&self, scope: &OptionScope, key: &str) -> PluginResult<bool>;

    /// All keys set in a scope, sorted
    fn keys(&self, scope: &OptionScope) -> PluginResult<Vec<String>>;
}

/// Namespaced option key for a plugin
pub fn option_key(conf_key: &str, name: &str) -> String {
    format!("{}:{}", conf_key, name)
}

/// Read an option from the scope selected by `project` and `user`
pub fn get_option(
    store: &dyn OptionStore,
    key: &str,
    project: Option<ProjectId>,
    user: Option<UserId>,
) -> PluginResult<Option<Value>> {
    store.get(&OptionScope::resolve(project, user), key)
}

/// Write an option into the scope selected by `project` and `user`
pub fn set_option(
    store: &dyn OptionStore,
    key: &str,
    value: Value,
    project: Option<ProjectId>,
    user: Option<UserId>,
) -> PluginResult<()> {
    store.set(&OptionScope::resolve(project, user), key, value)
}

/// Remove an option from the scope selected by `project` and `user`
pub fn unset_option(
    store: &dyn OptionStore,
    key: &str,
    project: Option<ProjectId>,
    user: Option<UserId>,
) -> PluginResult<bool> {
    store.unset(&OptionScope::resolve(project, user), key)
}

/// Whether an option value counts as "set" for configuration checks
pub fn is_present(value: &Option<Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}
