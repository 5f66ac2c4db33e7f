//! WebHooks notifier
//!
//! Posts a JSON summary of every notified event to a list of callback URLs.

use std::time::Duration;
use async_trait::async_trait;
use log::debug;
use serde_json::{Map, Value};
use crate::model::{Notification, Project};
use crate::plugin::bases::notify::group_data;
use crate::plugin::bases::NotificationPlugin;
use crate::plugin::client::{ApiClient, ApiRequest};
use crate::plugin::context::PluginContext;
use crate::plugin::descriptor::{PluginDescriptor, PluginFeatures};
use crate::plugin::error::{PluginError, PluginResult};
use crate::plugin::fields::{self, validate_http_url, ConfigField};
use crate::plugin::safe::safe_execute_async;
use crate::plugin::settings::PluginSettings;
use crate::plugin::traits::{Plugin, PluginClass};

/// Callbacks get less time than regular API calls
pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(3);

/// Split a `urls` option into its non-empty lines
pub fn split_urls(value: &str) -> Vec<String> {
    value
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub struct WebHooksPlugin {
    descriptor: PluginDescriptor,
    client: ApiClient,
}

impl WebHooksPlugin {
    pub fn new(settings: &PluginSettings) -> PluginResult<Self> {
        let descriptor = PluginDescriptor::for_type::<Self>()
            .title("WebHooks")
            .slug("webhooks")
            .conf_key("webhooks")
            .description("Integrates web hooks.")
            .author("Sentry Team", Some("https://github.com/getsentry/sentry"))
            .resource_link("Report Issue", "https://github.com/getsentry/sentry/issues")
            .project_conf(true)
            .features(PluginFeatures::NOTIFICATION)
            .build();

        let client = ApiClient::builder(&descriptor.slug)
            .settings(settings)
            .timeout(WEBHOOK_TIMEOUT)
            .allow_text(true)
            .build()?;

        Ok(Self { descriptor, client })
    }

    /// Configured callback URLs of a project
    pub fn webhook_urls(&self, ctx: &PluginContext, project: &Project) -> PluginResult<Vec<String>> {
        Ok(self
            .get_option_str(ctx, "urls", Some(project.id), None)?
            .map(|urls| split_urls(&urls))
            .unwrap_or_default())
    }

    async fn send_webhook(&self, url: &str, payload: &Value) -> PluginResult<()> {
        self.client
            .post(url, ApiRequest::new().json(payload.clone()))
            .await?;
        debug!(target: self.descriptor.logger_target().as_str(), "webhook.sent url={}", url);
        Ok(())
    }
}

#[async_trait]
impl Plugin for WebHooksPlugin {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn config_fields(&self) -> Vec<ConfigField> {
        vec![ConfigField::textarea("urls", "Callback URLs")
            .required()
            .placeholder("https://sentry.io/callback/url")
            .help("Enter callback URLs to POST new events to (one per line).")]
    }

    fn is_configured(&self, ctx: &PluginContext, project: &Project) -> PluginResult<bool> {
        Ok(!self.webhook_urls(ctx, project)?.is_empty())
    }

    fn validate_config(
        &self,
        _ctx: &PluginContext,
        _project: &Project,
        config: &Map<String, Value>,
    ) -> PluginResult<Map<String, Value>> {
        let cleaned = fields::clean_form(&self.config_fields(), config)?;
        if let Some(urls) = cleaned.get("urls").and_then(Value::as_str) {
            for url in split_urls(urls) {
                validate_http_url(&url)
                    .map_err(|_| PluginError::validation(format!("{} is not a valid URL.", url)))?;
            }
        }
        Ok(cleaned)
    }

    fn as_notifier(&self) -> Option<&dyn NotificationPlugin> {
        Some(self)
    }
}

#[async_trait]
impl NotificationPlugin for WebHooksPlugin {
    async fn notify_users(&self, ctx: &PluginContext, notification: &Notification) -> PluginResult<()> {
        let mut payload = group_data(ctx, notification);
        if let Value::Object(map) = &mut payload {
            map.insert("event".to_string(), notification.event.as_payload());
        }

        for url in self.webhook_urls(ctx, &notification.project)? {
            // One failing callback must not stop the others
            safe_execute_async(self.slug(), "send_webhook", self.send_webhook(&url, &payload)).await;
        }
        Ok(())
    }
}

impl PluginClass for WebHooksPlugin {
    const CLASS_PATH: &'static str = "sentry_plugins.webhooks.WebHooksPlugin";

    fn create(settings: &PluginSettings) -> PluginResult<Self> {
        Self::new(settings)
    }
}
