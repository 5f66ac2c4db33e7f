//! Domain Records
//!
//! Projects, issue groups, events and repositories as the plugin layer sees
//! them. These are plain serde records; persistence belongs to the host.

use std::collections::BTreeMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub type OrganizationId = u64;
pub type ProjectId = u64;
pub type GroupId = u64;
pub type UserId = u64;

/// Event payload keys that are treated as interfaces
pub const INTERFACE_KEYS: &[&str] = &[
    "exception",
    "logentry",
    "request",
    "stacktrace",
    "template",
    "threads",
    "user",
    "breadcrumbs",
    "contexts",
    "debug_meta",
    "csp",
    "hpkp",
    "expectct",
    "expectstaple",
];

/// A project that plugins are configured for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub organization_id: OrganizationId,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub platform: Option<String>,
}

impl Project {
    pub fn new(id: ProjectId, organization_id: OrganizationId, slug: &str) -> Self {
        Self {
            id,
            organization_id,
            slug: slug.to_string(),
            name: slug.to_string(),
            platform: None,
        }
    }
}

/// An issue group aggregating similar events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub project_id: ProjectId,
    pub title: String,
    #[serde(default)]
    pub culprit: Option<String>,
    #[serde(default)]
    pub short_id: Option<String>,
    #[serde(default)]
    pub permalink: Option<String>,
}

impl Group {
    pub fn new(id: GroupId, project_id: ProjectId, title: &str) -> Self {
        Self {
            id,
            project_id,
            title: title.to_string(),
            culprit: None,
            short_id: None,
            permalink: None,
        }
    }

    /// Absolute URL of the issue in the web UI
    pub fn absolute_url(&self, url_prefix: &str) -> String {
        match &self.permalink {
            Some(permalink) => permalink.clone(),
            None => format!("{}/issues/{}/", url_prefix.trim_end_matches('/'), self.id),
        }
    }

    /// Short identifier shown to users, falling back to the numeric id
    pub fn qualified_short_id(&self) -> String {
        self.short_id.clone().unwrap_or_else(|| self.id.to_string())
    }
}

fn default_level() -> String {
    "error".to_string()
}

/// A single processed event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    pub project_id: ProjectId,
    #[serde(default)]
    pub group_id: Option<GroupId>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub culprit: Option<String>,
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub logger: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub release: Option<String>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<(String, String)>,
    /// Raw event payload including interfaces
    #[serde(default)]
    pub data: Value,
}

impl Event {
    /// Title used for notifications, falling back to the message
    pub fn display_title(&self) -> &str {
        match &self.title {
            Some(title) if !title.is_empty() => title,
            _ => &self.message,
        }
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Names of the interfaces present in the payload
    pub fn interfaces(&self) -> Vec<&str> {
        match self.data.as_object() {
            Some(obj) => INTERFACE_KEYS
                .iter()
                .copied()
                .filter(|key| obj.get(*key).map_or(false, |v| !v.is_null()))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn interface(&self, name: &str) -> Option<&Value> {
        self.data.get(name).filter(|v| !v.is_null())
    }

    /// URL of the request interface, if any
    pub fn request_url(&self) -> Option<&str> {
        self.interface("request")
            .and_then(|request| request.get("url"))
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
    }

    pub fn tags_map(&self) -> BTreeMap<String, String> {
        self.tags.iter().cloned().collect()
    }

    /// Serialized event body handed to forwarders and webhooks
    pub fn as_payload(&self) -> Value {
        let mut body = match &self.data {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        body.insert("event_id".to_string(), json!(self.event_id));
        body.insert("id".to_string(), json!(self.event_id));
        body.insert("project".to_string(), json!(self.project_id));
        body.insert("message".to_string(), json!(self.message));
        body.insert("level".to_string(), json!(self.level));
        body.insert("tags".to_string(), json!(self.tags));
        body.insert("datetime".to_string(), json!(self.timestamp.to_rfc3339()));
        if let Some(platform) = &self.platform {
            body.insert("platform".to_string(), json!(platform));
        }
        if let Some(culprit) = &self.culprit {
            body.insert("culprit".to_string(), json!(culprit));
        }
        Value::Object(body)
    }

    /// Sample event used to exercise a notification configuration
    pub fn sample(project: &Project) -> Self {
        let platform = project.platform.clone().unwrap_or_else(|| "python".to_string());
        Self {
            event_id: uuid::Uuid::new_v4().simple().to_string(),
            project_id: project.id,
            group_id: None,
            message: "This is an example Python exception".to_string(),
            title: Some("ZeroDivisionError: integer division or modulo by zero".to_string()),
            culprit: Some("raven.scripts.runner in main".to_string()),
            level: "error".to_string(),
            platform: Some(platform),
            logger: Some("root".to_string()),
            environment: Some("production".to_string()),
            release: None,
            timestamp: Utc::now(),
            tags: vec![
                ("level".to_string(), "error".to_string()),
                ("sample_event".to_string(), "yes".to_string()),
            ],
            data: json!({
                "request": {
                    "url": "http://example.com/foo",
                    "method": "GET",
                },
                "exception": {
                    "values": [{
                        "type": "ZeroDivisionError",
                        "value": "integer division or modulo by zero",
                    }],
                },
            }),
        }
    }
}

/// A notification produced by alert rules for a single event
#[derive(Debug, Clone)]
pub struct Notification {
    pub event: Event,
    pub group: Group,
    pub project: Project,
    pub rules: Vec<String>,
}

impl Notification {
    pub fn new(event: Event, group: Group, project: Project) -> Self {
        Self { event, group, project, rules: Vec::new() }
    }

    pub fn with_rules(mut self, rules: Vec<String>) -> Self {
        self.rules = rules;
        self
    }

    /// Notification built from the sample event
    pub fn sample(project: &Project) -> Self {
        let event = Event::sample(project);
        let mut group = Group::new(0, project.id, event.display_title());
        group.culprit = event.culprit.clone();
        Self::new(event, group, project.clone())
    }
}

/// A source repository linked through a repository provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub provider: String,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub integration_id: Option<u64>,
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl Repository {
    pub fn new(name: &str, provider: &str) -> Self {
        Self {
            name: name.to_string(),
            provider: provider.to_string(),
            external_id: None,
            url: None,
            integration_id: None,
            config: Map::new(),
        }
    }
}

/// Kind of change applied to a file by a commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeType {
    #[serde(rename = "A")]
    Added,
    #[serde(rename = "M")]
    Modified,
    #[serde(rename = "D")]
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    #[serde(rename = "type")]
    pub change_type: ChangeType,
}

/// A commit returned by compare-commits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    pub id: String,
    pub repository: String,
    #[serde(default)]
    pub author_email: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub patch_set: Vec<FileChange>,
}
