//! Configuration Field Schema
//!
//! Plugins describe their settings (and the forms they present for issue
//! creation) as a list of fields. The schema drives validation, the
//! "is configured" check and the `show` output of the CLI.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;
use super::error::{PluginError, PluginResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Textarea,
    Secret,
    Url,
    Bool,
    Number,
    Select,
}

/// Where a field's value is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldScope {
    Project,
    User,
}

/// One configurable field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigField {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<(String, String)>,
    pub scope: FieldScope,
}

impl ConfigField {
    pub fn new(name: &str, label: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            field_type,
            required: false,
            default: None,
            help: None,
            placeholder: None,
            choices: Vec::new(),
            scope: FieldScope::Project,
        }
    }

    pub fn text(name: &str, label: &str) -> Self {
        Self::new(name, label, FieldType::Text)
    }

    pub fn textarea(name: &str, label: &str) -> Self {
        Self::new(name, label, FieldType::Textarea)
    }

    pub fn secret(name: &str, label: &str) -> Self {
        Self::new(name, label, FieldType::Secret)
    }

    pub fn url(name: &str, label: &str) -> Self {
        Self::new(name, label, FieldType::Url)
    }

    pub fn boolean(name: &str, label: &str) -> Self {
        Self::new(name, label, FieldType::Bool)
    }

    pub fn number(name: &str, label: &str) -> Self {
        Self::new(name, label, FieldType::Number)
    }

    pub fn select(name: &str, label: &str, choices: &[(&str, &str)]) -> Self {
        let mut field = Self::new(name, label, FieldType::Select);
        field.choices = choices
            .iter()
            .map(|(value, label)| (value.to_string(), label.to_string()))
            .collect();
        field
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn help(mut self, help: &str) -> Self {
        self.help = Some(help.to_string());
        self
    }

    pub fn placeholder(mut self, placeholder: &str) -> Self {
        self.placeholder = Some(placeholder.to_string());
        self
    }

    pub fn user_scoped(mut self) -> Self {
        self.scope = FieldScope::User;
        self
    }

    fn error(&self, message: &str) -> PluginError {
        PluginError::validation(format!("{}: {}", self.label, message))
    }

    /// Normalize a submitted value.
    ///
    /// Returns `None` for an empty optional field.
    pub fn clean(&self, value: Option<&Value>) -> PluginResult<Option<Value>> {
        let value = match value {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(v) => Some(v),
        };

        let value = match value {
            Some(v) => v,
            None if self.required => return Err(self.error("This field is required.")),
            None => return Ok(None),
        };

        let cleaned = match self.field_type {
            FieldType::Text | FieldType::Secret => match value {
                Value::String(s) => Value::String(s.trim().to_string()),
                Value::Number(n) => Value::String(n.to_string()),
                _ => return Err(self.error("Enter a valid value.")),
            },
            FieldType::Textarea => match value {
                Value::String(s) => Value::String(s.trim_end().to_string()),
                _ => return Err(self.error("Enter a valid value.")),
            },
            FieldType::Url => {
                let raw = value
                    .as_str()
                    .ok_or_else(|| self.error("Enter a valid URL."))?
                    .trim();
                validate_http_url(raw).map_err(|_| self.error("Enter a valid URL."))?;
                Value::String(raw.to_string())
            }
            FieldType::Bool => match value {
                Value::Bool(b) => Value::Bool(*b),
                Value::String(s) => match s.trim().to_lowercase().as_str() {
                    "true" | "1" | "yes" | "on" => Value::Bool(true),
                    "false" | "0" | "no" | "off" => Value::Bool(false),
                    _ => return Err(self.error("Enter a valid boolean.")),
                },
                _ => return Err(self.error("Enter a valid boolean.")),
            },
            FieldType::Number => match value {
                Value::Number(n) => Value::Number(n.clone()),
                Value::String(s) => {
                    let parsed: i64 = s
                        .trim()
                        .parse()
                        .map_err(|_| self.error("Enter a whole number."))?;
                    Value::from(parsed)
                }
                _ => return Err(self.error("Enter a whole number.")),
            },
            FieldType::Select => {
                let raw = value
                    .as_str()
                    .ok_or_else(|| self.error("Select a valid choice."))?;
                if !self.choices.iter().any(|(choice, _)| choice == raw) {
                    return Err(self.error(&format!(
                        "Select a valid choice. {} is not one of the available choices.",
                        raw
                    )));
                }
                Value::String(raw.to_string())
            }
        };

        Ok(Some(cleaned))
    }
}

/// Check that `raw` is an absolute http(s) URL
pub fn validate_http_url(raw: &str) -> PluginResult<Url> {
    let url = Url::parse(raw)
        .map_err(|e| PluginError::validation(format!("{} is not a valid URL: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(PluginError::validation(format!("{} is not a valid URL", raw))),
    }
}

/// Validate a submitted form against a field list.
///
/// Unknown keys are dropped; empty optional fields are left out.
pub fn clean_form(fields: &[ConfigField], form: &Map<String, Value>) -> PluginResult<Map<String, Value>> {
    let mut cleaned = Map::new();
    for field in fields {
        if let Some(value) = field.clean(form.get(&field.name))? {
            cleaned.insert(field.name.clone(), value);
        }
    }
    Ok(cleaned)
}
