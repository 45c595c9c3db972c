//! Transport abstraction and the shared service client.
//!
//! Every resource family talks to the API through a [`ServiceClient`], which
//! prefixes the family's base path and delegates the actual exchange to a
//! [`Transport`]. [`HttpTransport`] is the default, `reqwest`-backed
//! implementation; tests and embedding applications may supply their own.

use crate::config::ApiConfig;
use crate::page::PaginationEngine;
use crate::query::QueryParams;
use crate::response::Download;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, ClientBuilder, Method};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default connect timeout in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

const USER_AGENT: &str = concat!("ukfast-sdk-rust/", env!("CARGO_PKG_VERSION"));

/// HTTP client configuration for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout
    pub timeout: Duration,

    /// Connect timeout
    pub connect_timeout: Duration,

    /// Enable request logging
    pub enable_logging: bool,

    /// Enable response compression
    pub enable_compression: bool,
}

impl ClientConfig {
    /// Create a new client configuration with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            enable_logging: true,
            enable_compression: true,
        }
    }

    /// Set request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Enable or disable logging.
    #[must_use]
    pub const fn with_logging(mut self, enabled: bool) -> Self {
        self.enable_logging = enabled;
        self
    }

    /// Enable or disable compression.
    #[must_use]
    pub const fn with_compression(mut self, enabled: bool) -> Self {
        self.enable_compression = enabled;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A single request handed to a [`Transport`].
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    /// HTTP method
    pub method: Method,
    /// Path relative to the API base URL, or an absolute URL
    pub path: String,
    /// Query parameters
    pub query: QueryParams,
    /// Request body
    pub body: Option<Vec<u8>>,
    /// Extra request headers
    pub headers: Vec<(String, String)>,
}

impl TransportRequest {
    /// Create a request without query, body, or extra headers.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: QueryParams::new(),
            body: None,
            headers: Vec::new(),
        }
    }

    /// Attach query parameters.
    #[must_use]
    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }

    /// Attach a raw body.
    #[must_use]
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach a JSON body and the matching content type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the value cannot be encoded.
    pub fn with_json(self, body: &Value) -> Result<Self> {
        let bytes = serde_json::to_vec(body)?;
        Ok(self
            .with_body(bytes)
            .with_header(CONTENT_TYPE.as_str(), "application/json"))
    }

    /// Add a request header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        if !self
            .headers
            .iter()
            .any(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            self.headers.push((name, value.into()));
        }
        self
    }

    /// Look up a request header, ignoring case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// What a [`Transport`] hands back: status, headers, and raw body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers keyed by lower-case name
    pub headers: HashMap<String, String>,
    /// Raw response body
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Create a response with no headers.
    #[must_use]
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Create a response whose body is the given JSON value.
    #[must_use]
    pub fn json_body(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string())
            .with_header(CONTENT_TYPE.as_str(), "application/json")
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Look up a header, ignoring case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Whether the status is in the 2xx range.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Body as text, replacing invalid UTF-8.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Turn a non-success status into [`Error::Status`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Status`] carrying the status and body.
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::Status {
                status: self.status,
                body: self.text(),
            })
        }
    }

    /// Decode the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the body is empty or not valid JSON.
    pub fn json(&self) -> Result<Value> {
        if self.body.is_empty() {
            return Err(Error::Decode("empty response body".to_string()));
        }
        serde_json::from_slice(&self.body).map_err(Error::from)
    }
}

/// The request/response capability every client is built on.
///
/// Implementations must surface connection failures as an error rather than
/// a fabricated response. Retry, caching, and rate limiting, if wanted, live
/// here and not in the mapping layer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] or [`Error::Timeout`] if no response was
    /// obtained.
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse>;
}

/// `reqwest`-backed [`Transport`].
pub struct HttpTransport {
    http: Client,
    base_url: Url,
    api_key: Option<SecretString>,
    enable_logging: bool,
}

impl HttpTransport {
    /// Build a transport from connection settings with default HTTP tuning.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the base URL or TLS settings are invalid.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        Self::with_http_config(config, &ClientConfig::new(), USER_AGENT)
    }

    /// Build a transport with explicit HTTP tuning and user agent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the base URL or TLS settings are invalid.
    pub fn with_http_config(
        config: &ApiConfig,
        http_config: &ClientConfig,
        user_agent: &str,
    ) -> Result<Self> {
        let base_url = config.parse_base_url()?;

        let mut builder = ClientBuilder::new()
            .user_agent(user_agent)
            .timeout(http_config.timeout)
            .connect_timeout(http_config.connect_timeout);

        if !http_config.enable_compression {
            builder = builder.no_gzip();
        }

        if !config.tls_verify {
            warn!("TLS verification disabled for UKFast API client");
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(ca_cert) = &config.tls_ca_cert {
            debug!("loading CA certificate from {}", ca_cert.display());
            let bytes = std::fs::read(ca_cert).map_err(|err| {
                Error::Config(format!(
                    "Failed to read CA certificate {}: {err}",
                    ca_cert.display()
                ))
            })?;
            let cert = reqwest::Certificate::from_pem(&bytes)
                .map_err(|err| Error::Config(format!("Invalid CA certificate: {err}")))?;
            builder = builder.add_root_certificate(cert);
        }

        let http = builder
            .build()
            .map_err(|err| Error::Config(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            http,
            base_url,
            api_key: config.api_key.clone().map(SecretString::from),
            enable_logging: http_config.enable_logging,
        })
    }

    /// Return the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn build_url(&self, path: &str, query: &QueryParams) -> Result<Url> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|err| Error::InvalidEndpoint(format!("Invalid path `{path}`: {err}")))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.pairs());
        }
        Ok(url)
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url.as_str())
            .field("enable_logging", &self.enable_logging)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        let url = self.build_url(&request.path, &request.query)?;
        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .header(ACCEPT, "application/json");

        if let Some(api_key) = &self.api_key {
            builder = builder.header(AUTHORIZATION, api_key.expose_secret());
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        if self.enable_logging {
            info!(
                method = %request.method,
                path = %request.path,
                params = request.query.pairs().len(),
                "Sending UKFast API request"
            );
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        debug!(status, bytes = body.len(), "Received UKFast API response");

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

/// Builder for [`ServiceClient`].
#[derive(Clone)]
pub struct ServiceClientBuilder {
    config: ApiConfig,
    http_config: ClientConfig,
    base_path: String,
    user_agent: String,
    transport: Option<Arc<dyn Transport>>,
}

impl ServiceClientBuilder {
    /// Create a builder for a resource family rooted at `base_path`
    /// (for example `loadbalancers/`).
    #[must_use]
    pub fn new(base_path: impl Into<String>, config: ApiConfig) -> Self {
        Self {
            config,
            http_config: ClientConfig::new(),
            base_path: base_path.into(),
            user_agent: USER_AGENT.to_string(),
            transport: None,
        }
    }

    /// Override the HTTP client configuration.
    #[must_use]
    pub fn with_http_config(mut self, config: ClientConfig) -> Self {
        self.http_config = config;
        self
    }

    /// Override the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Configure the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config = self.config.with_api_key(api_key);
        self
    }

    /// Use a custom transport instead of [`HttpTransport`].
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the default transport cannot be built.
    pub fn build(self) -> Result<ServiceClient> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                let http_config = self.http_config.with_timeout(self.config.timeout());
                Arc::new(HttpTransport::with_http_config(
                    &self.config,
                    &http_config,
                    &self.user_agent,
                )?)
            }
        };

        Ok(ServiceClient::new(transport, self.base_path))
    }
}

/// Client for one resource family: a base path plus a shared transport.
#[derive(Clone)]
pub struct ServiceClient {
    transport: Arc<dyn Transport>,
    base_path: String,
}

impl ServiceClient {
    /// Wrap a transport for the given base path.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, base_path: impl Into<String>) -> Self {
        Self {
            transport,
            base_path: base_path.into(),
        }
    }

    /// The base path every relative request path is prefixed with.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Pagination engine issuing requests through this client.
    #[must_use]
    pub fn pagination(&self) -> PaginationEngine {
        PaginationEngine::new(self.clone())
    }

    fn resolve(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let path = path.trim_start_matches('/');
        let base = self.base_path.trim_matches('/');
        if base.is_empty() {
            path.to_string()
        } else {
            format!("{base}/{path}")
        }
    }

    /// Send a request and return the response whatever its status.
    ///
    /// # Errors
    ///
    /// Propagates transport failures unchanged.
    pub async fn execute(&self, mut request: TransportRequest) -> Result<TransportResponse> {
        request.path = self.resolve(&request.path);
        self.transport.send(request).await
    }

    /// Send a request and decode its JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Status`] on a non-success status and
    /// [`Error::Decode`] if the body is not JSON.
    pub async fn json(&self, request: TransportRequest) -> Result<Value> {
        let path = request.path.clone();
        let response = self.execute(request).await?.error_for_status()?;
        response.json().map_err(|err| match err {
            Error::Decode(message) => {
                Error::Decode(format!("Failed to parse response for `{path}`: {message}"))
            }
            other => other,
        })
    }

    /// `GET` a path and decode the JSON body.
    ///
    /// # Errors
    ///
    /// See [`ServiceClient::json`].
    pub async fn get_json(&self, path: &str) -> Result<Value> {
        self.json(TransportRequest::new(Method::GET, path)).await
    }

    /// `POST` an optional JSON body and decode the JSON response.
    ///
    /// # Errors
    ///
    /// See [`ServiceClient::json`].
    pub async fn post_json(&self, path: &str, body: Option<&Value>) -> Result<Value> {
        let mut request = TransportRequest::new(Method::POST, path);
        if let Some(body) = body {
            request = request.with_json(body)?;
        }
        self.json(request).await
    }

    /// `PATCH` a JSON body and decode the JSON response.
    ///
    /// # Errors
    ///
    /// See [`ServiceClient::json`].
    pub async fn patch_json(&self, path: &str, body: &Value) -> Result<Value> {
        let request = TransportRequest::new(Method::PATCH, path).with_json(body)?;
        self.json(request).await
    }

    /// `DELETE` a path. Only an exact `204 No Content` counts as deleted;
    /// every other status yields `false`.
    ///
    /// # Errors
    ///
    /// Propagates transport failures unchanged.
    pub async fn delete(&self, path: &str) -> Result<bool> {
        let response = self
            .execute(TransportRequest::new(Method::DELETE, path))
            .await?;
        let deleted = response.status == 204;
        if !deleted {
            debug!(path, status = response.status, "Delete did not return 204");
        }
        Ok(deleted)
    }

    /// `GET` a path whose body is not JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Status`] on a non-success status.
    pub async fn download(&self, path: &str) -> Result<Download> {
        let response = self
            .execute(TransportRequest::new(Method::GET, path))
            .await?
            .error_for_status()?;
        Ok(Download::from_response(response))
    }
}

impl fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceClient")
            .field("base_path", &self.base_path)
            .finish_non_exhaustive()
    }
}
