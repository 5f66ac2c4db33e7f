//! Plugin Descriptors
//!
//! Static metadata every plugin exposes: its slug, title, option namespace
//! and the flags that drive registry filtering. Unset names are derived:
//! the title defaults to the type name, the slug to the lower-cased title
//! with spaces turned into dashes, and the conf key to the lower-cased conf
//! title with spaces turned into underscores.

use std::fmt;
use std::str::FromStr;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use super::error::PluginError;

/// Hook contract a plugin is written against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PluginVersion {
    V1,
    V2,
}

impl PluginVersion {
    pub fn as_u8(self) -> u8 {
        match self {
            PluginVersion::V1 => 1,
            PluginVersion::V2 => 2,
        }
    }
}

impl fmt::Display for PluginVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

impl FromStr for PluginVersion {
    type Err = PluginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" | "v1" => Ok(PluginVersion::V1),
            "2" | "v2" => Ok(PluginVersion::V2),
            other => Err(PluginError::configuration_error(format!(
                "Invalid plugin version: {}. Valid versions: 1, 2", other
            ))),
        }
    }
}

/// Plugin classification used by the UI and the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PluginType {
    Default,
    Notification,
    IssueTracking,
    DataForwarding,
    Tagging,
}

impl PluginType {
    pub fn as_str(self) -> &'static str {
        match self {
            PluginType::Default => "default",
            PluginType::Notification => "notification",
            PluginType::IssueTracking => "issue-tracking",
            PluginType::DataForwarding => "data-forwarding",
            PluginType::Tagging => "tagging",
        }
    }
}

impl fmt::Display for PluginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags! {
    /// Features advertised by a plugin
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct PluginFeatures: u32 {
        const ISSUE_BASIC = 1 << 0;
        const ISSUE_SYNC = 1 << 1;
        const NOTIFICATION = 1 << 2;
        const DATA_FORWARDING = 1 << 3;
        const TAGGING = 1 << 4;
        const COMMITS = 1 << 5;
    }
}

impl PluginFeatures {
    /// Human readable feature names
    pub fn names(&self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }
}

/// Link rendered next to a plugin's configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLink {
    pub title: String,
    pub url: String,
}

/// Static plugin metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub slug: String,
    pub title: String,
    pub conf_title: String,
    pub conf_key: String,
    pub description: String,
    /// Version of the plugin itself
    pub version: String,
    pub author: Option<String>,
    pub author_url: Option<String>,
    pub resource_links: Vec<ResourceLink>,
    /// Hook contract version
    pub api_version: PluginVersion,
    /// Globally enabled
    pub enabled: bool,
    pub can_disable: bool,
    pub project_default_enabled: bool,
    pub site_conf: bool,
    pub project_conf: bool,
    pub features: PluginFeatures,
}

impl PluginDescriptor {
    /// Start a descriptor whose default title is `type_name`
    pub fn builder(type_name: &str) -> PluginDescriptorBuilder {
        PluginDescriptorBuilder::new(type_name)
    }

    /// Start a descriptor named after the Rust type `T`
    pub fn for_type<T: ?Sized>() -> PluginDescriptorBuilder {
        let full = std::any::type_name::<T>();
        let short = full.rsplit("::").next().unwrap_or(full);
        PluginDescriptorBuilder::new(short)
    }

    /// Log target for records emitted on behalf of this plugin
    pub fn logger_target(&self) -> String {
        format!("sentry.plugins.{}", self.slug)
    }
}

/// Derive a slug from a title
pub fn slugify(title: &str) -> String {
    title.replace(' ', "-").to_lowercase()
}

/// Derive a conf key from a conf title
pub fn conf_keyify(conf_title: &str) -> String {
    conf_title.to_lowercase().replace(' ', "_")
}

/// Builder filling in derived names at `build` time
#[derive(Debug, Clone)]
pub struct PluginDescriptorBuilder {
    type_name: String,
    slug: Option<String>,
    title: Option<String>,
    conf_title: Option<String>,
    conf_key: Option<String>,
    description: String,
    version: String,
    author: Option<String>,
    author_url: Option<String>,
    resource_links: Vec<ResourceLink>,
    api_version: PluginVersion,
    enabled: bool,
    can_disable: bool,
    project_default_enabled: bool,
    site_conf: bool,
    project_conf: bool,
    features: PluginFeatures,
}

impl PluginDescriptorBuilder {
    fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            slug: None,
            title: None,
            conf_title: None,
            conf_key: None,
            description: String::new(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            author: None,
            author_url: None,
            resource_links: Vec::new(),
            api_version: PluginVersion::V1,
            enabled: true,
            can_disable: true,
            project_default_enabled: false,
            site_conf: false,
            project_conf: false,
            features: PluginFeatures::empty(),
        }
    }

    pub fn slug(mut self, slug: &str) -> Self {
        self.slug = Some(slug.to_string());
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn conf_title(mut self, conf_title: &str) -> Self {
        self.conf_title = Some(conf_title.to_string());
        self
    }

    pub fn conf_key(mut self, conf_key: &str) -> Self {
        self.conf_key = Some(conf_key.to_string());
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn author(mut self, author: &str, url: Option<&str>) -> Self {
        self.author = Some(author.to_string());
        self.author_url = url.map(str::to_string);
        self
    }

    pub fn resource_link(mut self, title: &str, url: &str) -> Self {
        self.resource_links.push(ResourceLink {
            title: title.to_string(),
            url: url.to_string(),
        });
        self
    }

    pub fn api_version(mut self, api_version: PluginVersion) -> Self {
        self.api_version = api_version;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn can_disable(mut self, can_disable: bool) -> Self {
        self.can_disable = can_disable;
        self
    }

    pub fn project_default_enabled(mut self, enabled: bool) -> Self {
        self.project_default_enabled = enabled;
        self
    }

    pub fn site_conf(mut self, site_conf: bool) -> Self {
        self.site_conf = site_conf;
        self
    }

    pub fn project_conf(mut self, project_conf: bool) -> Self {
        self.project_conf = project_conf;
        self
    }

    pub fn features(mut self, features: PluginFeatures) -> Self {
        self.features = features;
        self
    }

    pub fn build(self) -> PluginDescriptor {
        let title = self.title.unwrap_or(self.type_name);
        let slug = self.slug.unwrap_or_else(|| slugify(&title));
        let conf_title = self.conf_title.unwrap_or_else(|| title.clone());
        let conf_key = self.conf_key.unwrap_or_else(|| conf_keyify(&conf_title));

        PluginDescriptor {
            slug,
            title,
            conf_title,
            conf_key,
            description: self.description,
            version: self.version,
            author: self.author,
            author_url: self.author_url,
            resource_links: self.resource_links,
            api_version: self.api_version,
            enabled: self.enabled,
            can_disable: self.can_disable,
            project_default_enabled: self.project_default_enabled,
            site_conf: self.site_conf,
            project_conf: self.project_conf,
            features: self.features,
        }
    }
}
