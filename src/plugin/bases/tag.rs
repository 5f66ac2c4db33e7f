//! Auto-tagging plugins

use crate::model::Event;
use crate::plugin::traits::Plugin;

/// Values longer than this are dropped rather than truncated
pub const MAX_TAG_VALUE_LENGTH: usize = 200;

pub trait TagPlugin: Plugin {
    /// Tag key written for every value
    fn tag_key(&self) -> &str;

    fn get_tag_values(&self, event: &Event) -> Vec<String>;
}

/// `(tag_key, value)` pairs for an event, first occurrence wins
pub fn tags_for(plugin: &dyn TagPlugin, event: &Event) -> Vec<(String, String)> {
    let mut values: Vec<String> = Vec::new();
    for value in plugin.get_tag_values(event) {
        if value.is_empty() || value.chars().count() > MAX_TAG_VALUE_LENGTH {
            continue;
        }
        if !values.contains(&value) {
            values.push(value);
        }
    }

    values
        .into_iter()
        .map(|value| (plugin.tag_key().to_string(), value))
        .collect()
}
