//! Third-party API client
//!
//! Thin wrapper over `reqwest` shared by the integrations. Paths are
//! appended to the client's base URL, responses are decoded as JSON and
//! failures are normalized into the API variants of [`PluginError`].

use std::time::Duration;
use log::debug;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde_json::{Map, Value};
use url::Url;
use super::error::{PluginError, PluginResult};
use super::settings::{PluginSettings, DEFAULT_HTTP_TIMEOUT};

/// Decoded API response
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// JSON body; `{}` for empty responses
    pub body: Value,
    pub text: String,
}

impl ApiResponse {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }
}

/// Optional request parts
#[derive(Debug, Clone, Default)]
pub struct ApiRequest {
    headers: Vec<(String, String)>,
    params: Vec<(String, String)>,
    json: Option<Value>,
    bearer: Option<String>,
}

impl ApiRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn param(mut self, name: &str, value: &str) -> Self {
        self.params.push((name.to_string(), value.to_string()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.json = Some(body);
        self
    }

    pub fn bearer(mut self, token: &str) -> Self {
        self.bearer = Some(token.to_string());
        self
    }
}

pub struct ApiClientBuilder {
    slug: String,
    base_url: Option<String>,
    timeout: Duration,
    user_agent: Option<String>,
    allow_text: bool,
}

impl ApiClientBuilder {
    pub fn base_url(mut self, base_url: &str) -> Self {
        self.base_url = Some(base_url.to_string());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = Some(user_agent.to_string());
        self
    }

    /// Accept non-JSON success bodies instead of failing
    pub fn allow_text(mut self, allow_text: bool) -> Self {
        self.allow_text = allow_text;
        self
    }

    /// Apply the timeout and user agent from settings
    pub fn settings(self, settings: &PluginSettings) -> Self {
        let user_agent = settings.user_agent.clone();
        self.timeout(settings.http_timeout).user_agent(&user_agent)
    }

    pub fn build(self) -> PluginResult<ApiClient> {
        let mut builder = reqwest::Client::builder().timeout(self.timeout);
        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }
        let client = builder
            .build()
            .map_err(|e| PluginError::invalid_configuration(format!("HTTP client: {}", e)))?;

        Ok(ApiClient {
            slug: self.slug,
            base_url: self.base_url.map(|url| url.trim_end_matches('/').to_string()),
            client,
            allow_text: self.allow_text,
        })
    }
}

/// HTTP client bound to one plugin and, optionally, one base URL
#[derive(Clone)]
pub struct ApiClient {
    slug: String,
    base_url: Option<String>,
    client: reqwest::Client,
    allow_text: bool,
}

impl ApiClient {
    pub fn builder(slug: &str) -> ApiClientBuilder {
        ApiClientBuilder {
            slug: slug.to_string(),
            base_url: None,
            timeout: DEFAULT_HTTP_TIMEOUT,
            user_agent: None,
            allow_text: false,
        }
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Resolve a path against the base URL; absolute URLs pass through
    pub fn build_url(&self, path: &str) -> PluginResult<Url> {
        let raw = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            match &self.base_url {
                Some(base) if path.is_empty() => base.clone(),
                Some(base) if path.starts_with('/') => format!("{}{}", base, path),
                Some(base) => format!("{}/{}", base, path),
                None => return Err(PluginError::invalid_configuration(format!("No base URL for path {}", path))),
            }
        };
        Url::parse(&raw).map_err(|e| PluginError::invalid_configuration(format!("Invalid URL {}: {}", raw, e)))
    }

    fn headers(request: &ApiRequest) -> PluginResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| PluginError::validation(format!("Invalid header {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| PluginError::validation(format!("Invalid header value: {}", e)))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    pub async fn request(&self, method: Method, path: &str, request: ApiRequest) -> PluginResult<ApiResponse> {
        let url = self.build_url(path)?;
        let target = format!("sentry.plugins.{}", self.slug);
        debug!(target: target.as_str(), "http.request method={} url={}", method, url);

        let mut builder = self
            .client
            .request(method, url.clone())
            .headers(Self::headers(&request)?);
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.json {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map_or(false, |v| v.contains("json"));
        let text = response.text().await?;
        debug!(target: target.as_str(), "http.response status={} url={}", status, url);

        if !(200..300).contains(&status) {
            return Err(PluginError::from_response(status, text));
        }

        if status == 204 || text.trim().is_empty() {
            return Ok(ApiResponse { status, body: Value::Object(Map::new()), text });
        }

        match serde_json::from_str::<Value>(&text) {
            Ok(body) => Ok(ApiResponse { status, body, text }),
            Err(_) if self.allow_text && !is_json => Ok(ApiResponse {
                status,
                body: Value::String(text.clone()),
                text,
            }),
            Err(e) => Err(PluginError::api(Some(status), format!("Unable to decode response: {}", e))),
        }
    }

    pub async fn get(&self, path: &str, request: ApiRequest) -> PluginResult<ApiResponse> {
        self.request(Method::GET, path, request).await
    }

    pub async fn post(&self, path: &str, request: ApiRequest) -> PluginResult<ApiResponse> {
        self.request(Method::POST, path, request).await
    }

    pub async fn put(&self, path: &str, request: ApiRequest) -> PluginResult<ApiResponse> {
        self.request(Method::PUT, path, request).await
    }

    pub async fn delete(&self, path: &str, request: ApiRequest) -> PluginResult<ApiResponse> {
        self.request(Method::DELETE, path, request).await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("slug", &self.slug)
            .field("base_url", &self.base_url)
            .finish()
    }
}
