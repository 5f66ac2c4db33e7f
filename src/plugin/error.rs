//! Plugin Error Types
//!
//! Error taxonomy for plugin hooks, option storage and the third-party API
//! clients the integrations talk through.

use serde_json::Value;
use thiserror::Error;

/// Result type for plugin operations
pub type PluginResult<T> = Result<T, PluginError>;

fn code_suffix(code: &Option<u16>) -> String {
    code.map(|c| format!(" (HTTP {})", c)).unwrap_or_default()
}

/// Error types for plugin operations
#[derive(Error, Debug, Clone)]
pub enum PluginError {
    /// Third-party API answered with an error status
    #[error("API error{}: {text}", code_suffix(.code))]
    Api {
        code: Option<u16>,
        text: String,
        json: Option<Value>,
    },

    /// Third-party API rejected our credentials (HTTP 401)
    #[error("Unauthorized: {text}")]
    ApiUnauthorized { text: String },

    /// Host could not be reached
    #[error("Unable to reach host: {host}")]
    ApiHostError { host: String },

    /// Host did not answer in time
    #[error("Timed out attempting to reach host: {host}")]
    ApiTimeout { host: String },

    /// User-facing validation failure
    #[error("{message}")]
    Validation { message: String },

    /// The acting user's linked identity is missing or invalid
    #[error("{message}")]
    InvalidIdentity { message: String, identity: Option<String> },

    /// Plugin cannot be constructed with the current settings
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// Plugin not found
    #[error("Plugin not found: {slug}")]
    PluginNotFound { slug: String },

    /// Class path is not known to the catalog or registry
    #[error("Plugin class not registered: {class_path}")]
    ClassNotRegistered { class_path: String },

    /// Binding name is not a known extension point
    #[error("Binding not found: {name}")]
    BindingNotFound { name: String },

    /// Provider id is not registered under a binding
    #[error("Provider not found: {binding}/{id}")]
    ProviderNotFound { binding: String, id: String },

    /// Stored option has an unusable value
    #[error("Plugin configuration error: {message}")]
    ConfigurationError { message: String },

    /// Option or metadata storage failure
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Hook failed in an unexpected way
    #[error("Plugin execution error: {message}")]
    ExecutionFailed { message: String },
}

impl PluginError {
    /// Create an API error
    pub fn api<S: Into<String>>(code: Option<u16>, text: S) -> Self {
        let text = text.into();
        let json = serde_json::from_str::<Value>(&text).ok();
        Self::Api { code, text, json }
    }

    /// Build the error matching an HTTP error response
    pub fn from_response<S: Into<String>>(status: u16, text: S) -> Self {
        if status == 401 {
            Self::ApiUnauthorized { text: text.into() }
        } else {
            Self::api(Some(status), text)
        }
    }

    pub fn host_error<S: Into<String>>(host: S) -> Self {
        Self::ApiHostError { host: host.into() }
    }

    pub fn timeout<S: Into<String>>(host: S) -> Self {
        Self::ApiTimeout { host: host.into() }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into() }
    }

    pub fn invalid_identity<S: Into<String>>(message: S, identity: Option<String>) -> Self {
        Self::InvalidIdentity { message: message.into(), identity }
    }

    pub fn invalid_configuration<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfiguration { message: message.into() }
    }

    /// Create a plugin not found error
    pub fn plugin_not_found<S: Into<String>>(slug: S) -> Self {
        Self::PluginNotFound { slug: slug.into() }
    }

    pub fn class_not_registered<S: Into<String>>(class_path: S) -> Self {
        Self::ClassNotRegistered { class_path: class_path.into() }
    }

    pub fn binding_not_found<S: Into<String>>(name: S) -> Self {
        Self::BindingNotFound { name: name.into() }
    }

    pub fn provider_not_found<B: Into<String>, S: Into<String>>(binding: B, id: S) -> Self {
        Self::ProviderNotFound { binding: binding.into(), id: id.into() }
    }

    /// Create a configuration error
    pub fn configuration_error<S: Into<String>>(message: S) -> Self {
        Self::ConfigurationError { message: message.into() }
    }

    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::Storage { message: message.into() }
    }

    /// Create an execution error
    pub fn execution_failed<S: Into<String>>(message: S) -> Self {
        Self::ExecutionFailed { message: message.into() }
    }

    /// HTTP status of an API error, if there was a response
    pub fn status_code(&self) -> Option<u16> {
        match self {
            PluginError::Api { code, .. } => *code,
            PluginError::ApiUnauthorized { .. } => Some(401),
            _ => None,
        }
    }

    /// Check if error came from talking to a third-party API
    pub fn is_api_error(&self) -> bool {
        matches!(self,
            PluginError::Api { .. } |
            PluginError::ApiUnauthorized { .. } |
            PluginError::ApiHostError { .. } |
            PluginError::ApiTimeout { .. }
        )
    }

    /// Check if error should be shown to the user as a form error
    pub fn is_user_facing(&self) -> bool {
        matches!(self,
            PluginError::Validation { .. } |
            PluginError::InvalidIdentity { .. }
        )
    }

    /// Check if error is related to registry lookups
    pub fn is_registry_error(&self) -> bool {
        matches!(self,
            PluginError::PluginNotFound { .. } |
            PluginError::ClassNotRegistered { .. } |
            PluginError::BindingNotFound { .. } |
            PluginError::ProviderNotFound { .. }
        )
    }
}

impl From<std::io::Error> for PluginError {
    fn from(err: std::io::Error) -> Self {
        PluginError::storage(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for PluginError {
    fn from(err: serde_json::Error) -> Self {
        PluginError::configuration_error(format!("JSON error: {}", err))
    }
}

impl From<reqwest::Error> for PluginError {
    fn from(err: reqwest::Error) -> Self {
        let host = err
            .url()
            .and_then(|url| url.host_str())
            .unwrap_or("unknown")
            .to_string();

        if err.is_timeout() {
            PluginError::timeout(host)
        } else if err.is_connect() {
            PluginError::host_error(host)
        } else {
            PluginError::api(err.status().map(|s| s.as_u16()), err.to_string())
        }
    }
}
