//! PagerDuty notifier
//!
//! Triggers an incident through the PagerDuty Events API. The group id is
//! the incident key, so repeated notifications for one issue de-duplicate
//! into a single incident.

use async_trait::async_trait;
use serde_json::{json, Value};
use crate::model::{Notification, Project};
use crate::plugin::bases::NotificationPlugin;
use crate::plugin::client::{ApiClient, ApiRequest};
use crate::plugin::context::PluginContext;
use crate::plugin::descriptor::{PluginDescriptor, PluginFeatures};
use crate::plugin::error::PluginResult;
use crate::plugin::fields::ConfigField;
use crate::plugin::settings::PluginSettings;
use crate::plugin::traits::{Plugin, PluginClass};

pub const EVENTS_API_URL: &str = "https://events.pagerduty.com/generic/2010-04-15/create_event.json";

/// PagerDuty rejects longer incident descriptions
pub const MAX_DESCRIPTION_LENGTH: usize = 1024;

pub struct PagerDutyPlugin {
    descriptor: PluginDescriptor,
    client: ApiClient,
    events_url: String,
}

impl PagerDutyPlugin {
    pub fn new(settings: &PluginSettings) -> PluginResult<Self> {
        Self::with_events_url(settings, EVENTS_API_URL)
    }

    /// Plugin posting to a different Events API endpoint
    pub fn with_events_url(settings: &PluginSettings, events_url: &str) -> PluginResult<Self> {
        let descriptor = PluginDescriptor::for_type::<Self>()
            .title("PagerDuty")
            .slug("pagerduty")
            .conf_key("pagerduty")
            .description("Send alerts to PagerDuty.")
            .author("Sentry Team", Some("https://github.com/getsentry/sentry-plugins"))
            .resource_link("Bug Tracker", "https://github.com/getsentry/sentry-plugins/issues")
            .resource_link("Source", "https://github.com/getsentry/sentry-plugins")
            .project_conf(true)
            .features(PluginFeatures::NOTIFICATION)
            .build();

        let client = ApiClient::builder(&descriptor.slug).settings(settings).build()?;

        Ok(Self {
            descriptor,
            client,
            events_url: events_url.to_string(),
        })
    }

    /// Request body of a trigger event
    pub fn trigger_body(&self, ctx: &PluginContext, service_key: &str, notification: &Notification) -> Value {
        let Notification { event, group, project, .. } = notification;
        let url = group.absolute_url(&ctx.settings().url_prefix);

        let description: String = event
            .display_title()
            .chars()
            .take(MAX_DESCRIPTION_LENGTH)
            .collect();

        json!({
            "service_key": service_key,
            "event_type": "trigger",
            "incident_key": group.id.to_string(),
            "description": description,
            "client": "sentry",
            "client_url": url,
            "details": {
                "event_id": event.event_id,
                "project": project.name,
                "release": event.release,
                "platform": event.platform,
                "culprit": event.culprit,
                "datetime": event.timestamp.to_rfc3339(),
                "tags": event.tags_map(),
                "url": url,
            },
            "contexts": [{
                "type": "link",
                "href": url,
                "text": "View Sentry Issue Details",
            }],
        })
    }
}

#[async_trait]
impl Plugin for PagerDutyPlugin {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn config_fields(&self) -> Vec<ConfigField> {
        vec![ConfigField::secret("service_key", "Service Key")
            .required()
            .help("PagerDuty's Sentry integration key for the service to alert.")]
    }

    fn as_notifier(&self) -> Option<&dyn NotificationPlugin> {
        Some(self)
    }
}

#[async_trait]
impl NotificationPlugin for PagerDutyPlugin {
    async fn notify_users(&self, ctx: &PluginContext, notification: &Notification) -> PluginResult<()> {
        let project: &Project = &notification.project;
        let service_key = match self.get_option_str(ctx, "service_key", Some(project.id), None)? {
            Some(key) => key,
            None => return Ok(()),
        };

        let body = self.trigger_body(ctx, &service_key, notification);
        self.client
            .post(&self.events_url, ApiRequest::new().json(body))
            .await?;
        Ok(())
    }
}

impl PluginClass for PagerDutyPlugin {
    const CLASS_PATH: &'static str = "sentry_plugins.pagerduty.PagerDutyPlugin";

    fn create(settings: &PluginSettings) -> PluginResult<Self> {
        Self::new(settings)
    }
}
