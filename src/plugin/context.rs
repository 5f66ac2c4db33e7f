//! Plugin Context
//!
//! Shared services handed to every hook: option storage, group metadata,
//! the rate limiter and process-wide settings. Built once at start-up and
//! passed by reference.

use std::sync::Arc;
use serde_json::Value;
use crate::model::{ProjectId, UserId};
use crate::options::{self, GroupMetaStore, MemoryOptionStore, OptionStore};
use super::error::PluginResult;
use super::ratelimit::RateLimiter;
use super::settings::PluginSettings;

#[derive(Clone)]
pub struct PluginContext {
    options: Arc<dyn OptionStore>,
    group_meta: Arc<GroupMetaStore>,
    rate_limiter: Arc<RateLimiter>,
    settings: PluginSettings,
}

impl PluginContext {
    pub fn new(options: Arc<dyn OptionStore>, settings: PluginSettings) -> Self {
        Self {
            options,
            group_meta: Arc::new(GroupMetaStore::new()),
            rate_limiter: Arc::new(RateLimiter::new()),
            settings,
        }
    }

    /// Context backed by in-memory stores and default settings
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryOptionStore::new()), PluginSettings::default())
    }

    pub fn with_group_meta(mut self, group_meta: Arc<GroupMetaStore>) -> Self {
        self.group_meta = group_meta;
        self
    }

    pub fn with_rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    pub fn options(&self) -> &dyn OptionStore {
        self.options.as_ref()
    }

    pub fn group_meta(&self) -> &GroupMetaStore {
        &self.group_meta
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn settings(&self) -> &PluginSettings {
        &self.settings
    }

    /// Read a fully namespaced option
    pub fn get_option(&self, key: &str, project: Option<ProjectId>, user: Option<UserId>) -> PluginResult<Option<Value>> {
        options::get_option(self.options(), key, project, user)
    }

    pub fn set_option(&self, key: &str, value: Value, project: Option<ProjectId>, user: Option<UserId>) -> PluginResult<()> {
        options::set_option(self.options(), key, value, project, user)
    }

    pub fn unset_option(&self, key: &str, project: Option<ProjectId>, user: Option<UserId>) -> PluginResult<bool> {
        options::unset_option(self.options(), key, project, user)
    }
}

impl std::fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginContext")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
