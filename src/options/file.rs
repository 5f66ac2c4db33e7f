//! JSON-file backed option store
//!
//! Wraps the in-memory store and rewrites a JSON snapshot after every
//! mutation. The snapshot maps scope names (`global`, `project:<id>`,
//! `user:<id>`, `user:<id>:project:<id>`) to their key/value tables.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use log::debug;
use parking_lot::Mutex;
use serde_json::Value;
use super::{MemoryOptionStore, OptionScope, OptionStore};
use crate::plugin::error::{PluginError, PluginResult};

type Snapshot = BTreeMap<String, BTreeMap<String, Value>>;

/// Option store persisted as a JSON document
#[derive(Debug)]
pub struct FileOptionStore {
    path: PathBuf,
    inner: MemoryOptionStore,
    write_lock: Mutex<()>,
}

impl FileOptionStore {
    /// Open the store, loading the snapshot when the file exists
    pub fn open<P: AsRef<Path>>(path: P) -> PluginResult<Self> {
        let path = path.as_ref().to_path_buf();
        let inner = if path.exists() {
            let content = fs::read_to_string(&path)?;
            let snapshot: Snapshot = if content.trim().is_empty() {
                Snapshot::new()
            } else {
                serde_json::from_str(&content).map_err(|e| {
                    PluginError::storage(format!("Failed to parse option store {}: {}", path.display(), e))
                })?
            };
            MemoryOptionStore::from_scopes(Self::decode(snapshot)?)
        } else {
            MemoryOptionStore::new()
        };

        debug!("Opened option store at {} ({} values)", path.display(), inner.len());
        Ok(Self {
            path,
            inner,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn decode(snapshot: Snapshot) -> PluginResult<HashMap<OptionScope, BTreeMap<String, Value>>> {
        snapshot
            .into_iter()
            .map(|(scope, table)| scope.parse::<OptionScope>().map(|scope| (scope, table)))
            .collect()
    }

    /// Write the current snapshot; callers hold `write_lock`
    fn persist(&self) -> PluginResult<()> {
        let snapshot: Snapshot = self
            .inner
            .snapshot()
            .into_iter()
            .map(|(scope, table)| (scope.to_string(), table))
            .collect();

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, serde_json::to_vec_pretty(&snapshot)?)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Put a key back to its value before a mutation whose write failed
    fn restore(&self, scope: &OptionScope, key: &str, previous: Option<Value>) -> PluginResult<()> {
        match previous {
            Some(value) => self.inner.set(scope, key, value),
            None => self.inner.unset(scope, key).map(|_| ()),
        }
    }
}

impl OptionStore for FileOptionStore {
    fn get(&self, scope: &OptionScope, key: &str) -> PluginResult<Option<Value>> {
        self.inner.get(scope, key)
    }

    fn set(&self, scope: &OptionScope, key: &str, value: Value) -> PluginResult<()> {
        let _guard = self.write_lock.lock();
        let previous = self.inner.get(scope, key)?;
        self.inner.set(scope, key, value)?;
        if let Err(e) = self.persist() {
            self.restore(scope, key, previous)?;
            return Err(e);
        }
        Ok(())
    }

    fn unset(&self, scope: &OptionScope, key: &str) -> PluginResult<bool> {
        let _guard = self.write_lock.lock();
        let previous = self.inner.get(scope, key)?;
        let removed = self.inner.unset(scope, key)?;
        if removed {
            if let Err(e) = self.persist() {
                self.restore(scope, key, previous)?;
                return Err(e);
            }
        }
        Ok(removed)
    }

    fn keys(&self, scope: &OptionScope) -> PluginResult<Vec<String>> {
        self.inner.keys(scope)
    }
}
