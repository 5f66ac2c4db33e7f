//! Auto-tagging plugins

use crate::model::Event;
use crate::plugin::bases::TagPlugin;
use crate::plugin::descriptor::{PluginDescriptor, PluginFeatures};
use crate::plugin::error::PluginResult;
use crate::plugin::settings::PluginSettings;
use crate::plugin::traits::{Plugin, PluginClass};

/// Tags events with the URL of their request interface
pub struct UrlsPlugin {
    descriptor: PluginDescriptor,
}

impl UrlsPlugin {
    pub fn new() -> Self {
        Self {
            descriptor: PluginDescriptor::for_type::<Self>()
                .title("Auto Tag: URLs")
                .slug("urls")
                .conf_key("urls")
                .conf_title("URLs")
                .description("Automatically adds the 'url' tag from events containing interface data from sentry.interfaces.Request.")
                .project_default_enabled(true)
                .features(PluginFeatures::TAGGING)
                .build(),
        }
    }
}

impl Default for UrlsPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for UrlsPlugin {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn as_tagger(&self) -> Option<&dyn TagPlugin> {
        Some(self)
    }
}

impl TagPlugin for UrlsPlugin {
    fn tag_key(&self) -> &str {
        "url"
    }

    fn get_tag_values(&self, event: &Event) -> Vec<String> {
        event.request_url().map(str::to_string).into_iter().collect()
    }
}

impl PluginClass for UrlsPlugin {
    const CLASS_PATH: &'static str = "sentry_plugins.taggers.UrlsPlugin";

    fn create(_settings: &PluginSettings) -> PluginResult<Self> {
        Ok(Self::new())
    }
}

/// Tags events with the names of the interfaces they carry
pub struct InterfaceTypesPlugin {
    descriptor: PluginDescriptor,
}

impl InterfaceTypesPlugin {
    pub fn new() -> Self {
        Self {
            descriptor: PluginDescriptor::for_type::<Self>()
                .title("Auto Tag: Interface Types")
                .slug("interface_types")
                .conf_key("interface_types")
                .conf_title("Interface Types")
                .description("Automatically adds the 'interface_type' tag from events containing referencing the class name of each interface (e.g. Http, Stacktrace, Exception).")
                .project_default_enabled(false)
                .features(PluginFeatures::TAGGING)
                .build(),
        }
    }
}

impl Default for InterfaceTypesPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for InterfaceTypesPlugin {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn as_tagger(&self) -> Option<&dyn TagPlugin> {
        Some(self)
    }
}

impl TagPlugin for InterfaceTypesPlugin {
    fn tag_key(&self) -> &str {
        "interface_type"
    }

    fn get_tag_values(&self, event: &Event) -> Vec<String> {
        event.interfaces().into_iter().map(str::to_string).collect()
    }
}

impl PluginClass for InterfaceTypesPlugin {
    const CLASS_PATH: &'static str = "sentry_plugins.taggers.InterfaceTypesPlugin";

    fn create(_settings: &PluginSettings) -> PluginResult<Self> {
        Ok(Self::new())
    }
}
