//! Splunk data forwarder
//!
//! Ships events to a Splunk HTTP Event Collector. Events are forwarded for
//! every project the plugin is enabled for, limited per organization.

use std::time::Duration;
use async_trait::async_trait;
use log::warn;
use serde_json::{json, Map, Value};
use crate::model::{Event, Project};
use crate::plugin::bases::DataForwardingPlugin;
use crate::plugin::client::{ApiClient, ApiRequest};
use crate::plugin::context::PluginContext;
use crate::plugin::descriptor::{PluginDescriptor, PluginFeatures};
use crate::plugin::error::PluginResult;
use crate::plugin::fields::ConfigField;
use crate::plugin::settings::PluginSettings;
use crate::plugin::traits::{Plugin, PluginClass};

const COLLECTOR_PATH: &str = "/services/collector";

/// Normalize an instance URL to its event collector endpoint
pub fn collector_url(instance: &str) -> String {
    let instance = instance.trim_end_matches('/');
    if instance.ends_with(COLLECTOR_PATH) {
        instance.to_string()
    } else {
        format!("{}{}", instance, COLLECTOR_PATH)
    }
}

pub struct SplunkPlugin {
    descriptor: PluginDescriptor,
    client: ApiClient,
}

impl SplunkPlugin {
    pub fn new(settings: &PluginSettings) -> PluginResult<Self> {
        let descriptor = PluginDescriptor::for_type::<Self>()
            .title("Splunk")
            .slug("splunk")
            .conf_key("splunk")
            .description("Send Sentry events into Splunk.")
            .resource_link("Splunk Setup Instructions", "https://github.com/getsentry/sentry-plugins/blob/master/src/sentry_plugins/splunk/Splunk_Instructions.md")
            .project_conf(true)
            .features(PluginFeatures::DATA_FORWARDING)
            .build();

        let client = ApiClient::builder(&descriptor.slug)
            .settings(settings)
            .allow_text(true)
            .build()?;

        Ok(Self { descriptor, client })
    }

    /// Host the event came from, taken from its tags or request URL
    fn event_host(event: &Event) -> Option<String> {
        event
            .tag("server_name")
            .map(str::to_string)
            .or_else(|| {
                event
                    .request_url()
                    .and_then(|raw| url::Url::parse(raw).ok())
                    .and_then(|url| url.host_str().map(str::to_string))
            })
    }
}

#[async_trait]
impl Plugin for SplunkPlugin {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn config_fields(&self) -> Vec<ConfigField> {
        vec![
            ConfigField::url("instance", "Instance URL")
                .required()
                .placeholder("e.g. https://input-foo.cloud.splunk.com:8088")
                .help("The HTTP Event Collector endpoint for your Splunk instance."),
            ConfigField::text("index", "Index")
                .required()
                .default_value(json!("main")),
            ConfigField::text("source", "Source")
                .default_value(json!("sentry"))
                .help("The source used for events sent from this project."),
            ConfigField::secret("token", "Token").required(),
        ]
    }

    fn as_data_forwarder(&self) -> Option<&dyn DataForwardingPlugin> {
        Some(self)
    }
}

#[async_trait]
impl DataForwardingPlugin for SplunkPlugin {
    fn rate_limit(&self) -> (u32, Duration) {
        (1000, Duration::from_secs(1))
    }

    fn event_payload(&self, event: &Event) -> Value {
        let mut props = Map::new();
        props.insert("event_id".to_string(), json!(event.event_id));
        props.insert("project_id".to_string(), json!(event.project_id));
        props.insert("message".to_string(), json!(event.message));
        props.insert("title".to_string(), json!(event.display_title()));
        props.insert("type".to_string(), json!(if event.interface("exception").is_some() { "error" } else { "default" }));
        props.insert("level".to_string(), json!(event.level));
        if let Some(culprit) = &event.culprit {
            props.insert("culprit".to_string(), json!(culprit));
        }
        if let Some(platform) = &event.platform {
            props.insert("platform".to_string(), json!(platform));
        }
        if let Some(environment) = &event.environment {
            props.insert("environment".to_string(), json!(environment));
        }
        if let Some(release) = &event.release {
            props.insert("release".to_string(), json!(release));
        }
        for (key, value) in event.tags_map() {
            props.entry(format!("tags[{}]", key)).or_insert(json!(value));
        }
        if let Some(url) = event.request_url() {
            props.insert("request_url".to_string(), json!(url));
        }
        Value::Object(props)
    }

    async fn forward_event(
        &self,
        ctx: &PluginContext,
        event: &Event,
        project: &Project,
        payload: Value,
    ) -> PluginResult<bool> {
        let option = |name: &str| self.get_option_str(ctx, name, Some(project.id), None);
        let (instance, token, index) = match (option("instance")?, option("token")?, option("index")?) {
            (Some(instance), Some(token), Some(index)) => (instance, token, index),
            _ => return Ok(false),
        };
        let source = option("source")?.unwrap_or_else(|| "sentry".to_string());

        let mut body = json!({
            "time": event.timestamp.timestamp(),
            "source": source,
            "index": index,
            "event": payload,
        });
        if let Some(host) = Self::event_host(event) {
            body["host"] = json!(host);
        }

        let request = ApiRequest::new()
            .header("Authorization", &format!("Splunk {}", token))
            .json(body);

        match self.client.post(&collector_url(&instance), request).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_api_error() => {
                warn!(
                    target: self.descriptor.logger_target().as_str(),
                    "splunk.send_event.failed project_id={} organization_id={} error={}",
                    project.id,
                    project.organization_id,
                    e
                );
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

impl PluginClass for SplunkPlugin {
    const CLASS_PATH: &'static str = "sentry_plugins.splunk.SplunkPlugin";

    fn create(settings: &PluginSettings) -> PluginResult<Self> {
        Self::new(settings)
    }
}
