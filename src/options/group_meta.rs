//! Group metadata store
//!
//! Arbitrary `(group, key) -> value` pairs attached to issue groups. Issue
//! tracking plugins record linked ticket ids here.

use std::collections::{BTreeMap, HashMap};
use parking_lot::RwLock;
use crate::model::GroupId;

#[derive(Debug, Default)]
pub struct GroupMetaStore {
    values: RwLock<HashMap<GroupId, BTreeMap<String, String>>>,
}

impl GroupMetaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_value(&self, group: GroupId, key: &str) -> Option<String> {
        self.values
            .read()
            .get(&group)
            .and_then(|meta| meta.get(key))
            .cloned()
    }

    pub fn set_value(&self, group: GroupId, key: &str, value: impl Into<String>) {
        self.values
            .write()
            .entry(group)
            .or_default()
            .insert(key.to_string(), value.into());
    }

    /// Remove a value, returning whether it existed
    pub fn unset_value(&self, group: GroupId, key: &str) -> bool {
        let mut values = self.values.write();
        let removed = values
            .get_mut(&group)
            .map_or(false, |meta| meta.remove(key).is_some());
        if values.get(&group).map_or(false, |meta| meta.is_empty()) {
            values.remove(&group);
        }
        removed
    }

    /// Every value attached to a group
    pub fn get_all(&self, group: GroupId) -> BTreeMap<String, String> {
        self.values.read().get(&group).cloned().unwrap_or_default()
    }
}
