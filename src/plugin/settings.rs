//! Plugin Settings and Configuration
//!
//! Process-wide settings handed to plugin factories and hooks: where the web
//! UI lives, how the HTTP clients behave and how notifications are
//! throttled.

use std::time::Duration;

/// Default timeout for third-party API calls
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Default notification rate limit per project and plugin
pub const DEFAULT_NOTIFY_LIMIT: u32 = 10;
pub const DEFAULT_NOTIFY_WINDOW: Duration = Duration::from_secs(60);

/// Configuration settings passed to plugins
#[derive(Debug, Clone)]
pub struct PluginSettings {
    /// Absolute URL prefix of the web UI, used to build issue links
    pub url_prefix: String,
    /// Timeout applied to API clients unless a plugin overrides it
    pub http_timeout: Duration,
    /// User agent sent with every outgoing request
    pub user_agent: String,
    /// Notifications allowed per window before a plugin is rate limited
    pub notify_limit: u32,
    pub notify_window: Duration,
}

impl PluginSettings {
    pub fn with_url_prefix(mut self, url_prefix: &str) -> Self {
        self.url_prefix = url_prefix.trim_end_matches('/').to_string();
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn with_notify_limit(mut self, limit: u32, window: Duration) -> Self {
        self.notify_limit = limit;
        self.notify_window = window;
        self
    }
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            url_prefix: "http://localhost:9000".to_string(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            user_agent: format!("sentry-plugins/{}", env!("CARGO_PKG_VERSION")),
            notify_limit: DEFAULT_NOTIFY_LIMIT,
            notify_window: DEFAULT_NOTIFY_WINDOW,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = PluginSettings::default();
        assert_eq!(settings.http_timeout, Duration::from_secs(30));
        assert_eq!(settings.notify_limit, 10);
        assert_eq!(settings.notify_window, Duration::from_secs(60));
        assert!(settings.user_agent.starts_with("sentry-plugins/"));
    }

    #[test]
    fn test_url_prefix_is_normalized() {
        let settings = PluginSettings::default().with_url_prefix("https://sentry.example.com/");
        assert_eq!(settings.url_prefix, "https://sentry.example.com");
    }
}
