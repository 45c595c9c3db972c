//! Entry point for the load balancer API.

use crate::listener::ListenerClient;
use crate::ssl::SslClient;
use crate::Result;
use std::sync::Arc;
use ukfast_core::{ApiConfig, ClientConfig, ServiceClient, ServiceClientBuilder, Transport};

/// Base path of the load balancer service.
pub const BASE_PATH: &str = "loadbalancers/";

const USER_AGENT: &str = concat!("ukfast-loadbalancers/", env!("CARGO_PKG_VERSION"));

/// Builder for [`LoadBalancerClient`].
#[derive(Clone)]
pub struct LoadBalancerClientBuilder {
    inner: ServiceClientBuilder,
}

impl LoadBalancerClientBuilder {
    /// Create a builder from connection settings.
    #[must_use]
    pub fn new(config: ApiConfig) -> Self {
        Self {
            inner: ServiceClientBuilder::new(BASE_PATH, config).with_user_agent(USER_AGENT),
        }
    }

    /// Override the HTTP client configuration.
    #[must_use]
    pub fn with_http_config(mut self, config: ClientConfig) -> Self {
        self.inner = self.inner.with_http_config(config);
        self
    }

    /// Configure the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.inner = self.inner.with_api_key(api_key);
        self
    }

    /// Use a custom transport.
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.inner = self.inner.with_transport(transport);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`ukfast_core::Error::Config`] if the transport cannot be built.
    pub fn build(self) -> Result<LoadBalancerClient> {
        LoadBalancerClient::from_service(self.inner.build()?)
    }
}

/// Client for the load balancer API.
#[derive(Debug, Clone)]
pub struct LoadBalancerClient {
    listeners: ListenerClient,
}

impl LoadBalancerClient {
    /// Client for the public API authenticated with `api_key`.
    ///
    /// # Errors
    ///
    /// Returns [`ukfast_core::Error::Config`] if the transport cannot be built.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        LoadBalancerClientBuilder::new(ApiConfig::default())
            .with_api_key(api_key)
            .build()
    }

    /// Client issuing requests through an existing service client.
    ///
    /// # Errors
    ///
    /// Returns [`ukfast_core::Error::Config`] if a field map is malformed.
    pub fn from_service(service: ServiceClient) -> Result<Self> {
        Ok(Self {
            listeners: ListenerClient::new(service)?,
        })
    }

    /// Listeners and their binds, certificates, access rules and SSLs.
    #[must_use]
    pub const fn listeners(&self) -> &ListenerClient {
        &self.listeners
    }

    /// SSL bindings.
    #[must_use]
    pub const fn ssls(&self) -> &SslClient {
        self.listeners.ssls()
    }
}
