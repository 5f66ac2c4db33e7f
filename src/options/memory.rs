//! In-memory option store

use std::collections::{BTreeMap, HashMap};
use parking_lot::RwLock;
use serde_json::Value;
use super::{OptionScope, OptionStore};
use crate::plugin::error::PluginResult;

type ScopeTable = BTreeMap<String, Value>;

/// Option store kept entirely in process memory
#[derive(Debug, Default)]
pub struct MemoryOptionStore {
    scopes: RwLock<HashMap<OptionScope, ScopeTable>>,
}

impl MemoryOptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from pre-populated scopes
    pub fn from_scopes(scopes: HashMap<OptionScope, BTreeMap<String, Value>>) -> Self {
        Self {
            scopes: RwLock::new(scopes),
        }
    }

    /// Copy of every scope and its values
    pub fn snapshot(&self) -> HashMap<OptionScope, BTreeMap<String, Value>> {
        self.scopes.read().clone()
    }

    /// Number of values across all scopes
    pub fn len(&self) -> usize {
        self.scopes.read().values().map(|table| table.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OptionStore for MemoryOptionStore {
    fn get(&self, scope: &OptionScope, key: &str) -> PluginResult<Option<Value>> {
        Ok(self
            .scopes
            .read()
            .get(scope)
            .and_then(|table| table.get(key))
            .cloned())
    }

    fn set(&self, scope: &OptionScope, key: &str, value: Value) -> PluginResult<()> {
        self.scopes
            .write()
            .entry(*scope)
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    fn unset(&self, scope: &OptionScope, key: &str) -> PluginResult<bool> {
        let mut scopes = self.scopes.write();
        let removed = match scopes.get_mut(scope) {
            Some(table) => table.remove(key).is_some(),
            None => false,
        };
        if scopes.get(scope).map_or(false, |table| table.is_empty()) {
            scopes.remove(scope);
        }
        Ok(removed)
    }

    fn keys(&self, scope: &OptionScope) -> PluginResult<Vec<String>> {
        Ok(self
            .scopes
            .read()
            .get(scope)
            .map(|table| table.keys().cloned().collect())
            .unwrap_or_default())
    }
}
