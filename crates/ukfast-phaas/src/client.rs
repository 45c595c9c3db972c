//! Domain verification client for the PHaaS service.

use crate::models::{Domain, NewDomain};
use crate::Result;
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use ukfast_core::url_encoding::path_segment;
use ukfast_core::{
    ApiConfig, ClientConfig, CollectionResource, EntityFactory, Error, FieldMap, ListParams, Page,
    ServiceClient, ServiceClientBuilder, Transport, TransportRequest, TransportResponse,
};

/// Base path of the PHaaS service.
pub const BASE_PATH: &str = "phaas/";

/// Collection path for domains.
pub const DOMAIN_COLLECTION: &str = "v1/domains";

/// Length of a domain verification hash.
pub const VERIFICATION_HASH_LEN: usize = 28;

const USER_AGENT: &str = concat!("ukfast-phaas/", env!("CARGO_PKG_VERSION"));

/// Builder for [`DomainClient`].
#[derive(Clone)]
pub struct PhaasClientBuilder {
    inner: ServiceClientBuilder,
}

impl PhaasClientBuilder {
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
    pub fn build(self) -> Result<DomainClient> {
        Ok(DomainClient::from_service(self.inner.build()?))
    }
}

/// Client for PHaaS domains.
#[derive(Debug, Clone)]
pub struct DomainClient {
    domains: CollectionResource<Domain>,
}

impl DomainClient {
    /// Client for the public API authenticated with `api_key`.
    ///
    /// # Errors
    ///
    /// Returns [`ukfast_core::Error::Config`] if the transport cannot be built.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        PhaasClientBuilder::new(ApiConfig::default())
            .with_api_key(api_key)
            .build()
    }

    /// Client issuing requests through an existing service client.
    #[must_use]
    pub fn from_service(service: ServiceClient) -> Self {
        Self {
            domains: CollectionResource::new(
                service,
                DOMAIN_COLLECTION,
                EntityFactory::new(FieldMap::empty()),
            ),
        }
    }

    fn service(&self) -> &ServiceClient {
        self.domains.service()
    }

    /// Get a page of domains.
    ///
    /// # Errors
    ///
    /// Propagates request and decoding errors.
    pub async fn get_all(&self, params: &ListParams) -> Result<Page<Domain>> {
        self.domains.list(params).await
    }

    /// Register a domain and the address its verification email goes to.
    ///
    /// # Errors
    ///
    /// Returns a validation error, without sending anything, if either
    /// argument is blank.
    pub async fn add_domain(&self, domain: &str, verification_email: &str) -> Result<Domain> {
        if domain.trim().is_empty() {
            return Err(Error::validation("A domain must be provided"));
        }
        if verification_email.trim().is_empty() {
            return Err(Error::validation(
                "A verification email address must be provided",
            ));
        }

        let body = serde_json::to_value(NewDomain {
            domain,
            verification_email,
        })?;
        let request = TransportRequest::new(Method::POST, DOMAIN_COLLECTION).with_json(&body)?;
        debug!(domain, "Registering PHaaS domain");
        let envelope = self.service().json(request).await?;
        self.load_data(&envelope)
    }

    /// Ask the service to send the verification email again.
    ///
    /// # Errors
    ///
    /// Returns a validation error, without sending anything, if
    /// `domain_id` is blank or a dot segment.
    pub async fn resend_validation_email(&self, domain_id: &str) -> Result<Domain> {
        if domain_id.trim().is_empty() {
            return Err(Error::validation("A domain id must be provided"));
        }

        let segment = path_segment(domain_id, "domain id")?;
        let path = format!("{}/resend-verification", self.domains.item_path(segment));
        let envelope = self.service().get_json(&path).await?;
        self.load_data(&envelope)
    }

    /// Submit a verification hash. The raw response is returned whatever
    /// its status.
    ///
    /// # Errors
    ///
    /// Returns a validation error, without sending anything, unless `hash`
    /// is exactly 28 characters long. The hash is sent as a single
    /// percent-encoded path segment.
    pub async fn verify_domain_hash(&self, hash: &str) -> Result<TransportResponse> {
        if hash.chars().count() != VERIFICATION_HASH_LEN {
            return Err(Error::validation(
                "A valid domain verification hash must be provided",
            ));
        }

        let path = format!(
            "{DOMAIN_COLLECTION}/verify/{}",
            path_segment(hash, "domain verification hash")?
        );
        let response = self
            .service()
            .execute(TransportRequest::new(Method::GET, path))
            .await?;
        debug!(status = response.status, "Domain verification hash submitted");
        Ok(response)
    }

    fn load_data(&self, envelope: &Value) -> Result<Domain> {
        let data = envelope
            .get("data")
            .ok_or_else(|| Error::Decode("Response has no `data` member".to_string()))?;
        self.domains.factory().load(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockall::mock;
    use serde_json::json;
    use ukfast_core::ErrorKind;

    mock! {
        Api {}

        #[async_trait]
        impl Transport for Api {
            async fn send(&self, request: TransportRequest) -> ukfast_core::Result<TransportResponse>;
        }
    }

    fn client_with(transport: MockApi) -> DomainClient {
        DomainClient::from_service(ServiceClient::new(Arc::new(transport), BASE_PATH))
    }

    fn silent() -> DomainClient {
        let mut transport = MockApi::new();
        transport.expect_send().times(0);
        client_with(transport)
    }

    #[tokio::test]
    async fn add_domain_rejects_blank_arguments() {
        let client = silent();

        let err = client.add_domain("", "admin@example.com").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("A domain must be provided"));

        let err = client.add_domain("example.com", " ").await.unwrap_err();
        assert!(err
            .to_string()
            .contains("A verification email address must be provided"));
    }

    #[tokio::test]
    async fn resend_rejects_blank_id() {
        let err = silent().resend_validation_email("").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("A domain id must be provided"));
    }

    #[tokio::test]
    async fn verify_rejects_wrong_hash_length() {
        let client = silent();
        let long = "x".repeat(VERIFICATION_HASH_LEN + 1);
        for hash in ["", "short", long.as_str()] {
            let err = client.verify_domain_hash(hash).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
    }

    #[tokio::test]
    async fn add_domain_posts_json_body() {
        let mut transport = MockApi::new();
        transport
            .expect_send()
            .withf(|request| {
                request.method == Method::POST
                    && request.path == "phaas/v1/domains"
                    && request.header("content-type") == Some("application/json")
                    && request
                        .body
                        .as_deref()
                        .and_then(|body| serde_json::from_slice::<Value>(body).ok())
                        == Some(json!({
                            "domain": "example.com",
                            "verification_email": "admin@example.com"
                        }))
            })
            .times(1)
            .returning(|_| {
                Ok(TransportResponse::json_body(
                    201,
                    &json!({"data": {"id": "d-1", "domain": "example.com", "verified": false}}),
                ))
            });

        let domain = client_with(transport)
            .add_domain("example.com", "admin@example.com")
            .await
            .unwrap();
        assert_eq!(domain.id.as_deref(), Some("d-1"));
        assert_eq!(domain.verified, Some(false));
    }

    #[tokio::test]
    async fn verify_returns_raw_response_on_failure_status() {
        let hash = "a".repeat(VERIFICATION_HASH_LEN);
        let expected = format!("phaas/v1/domains/verify/{hash}");
        let mut transport = MockApi::new();
        transport
            .expect_send()
            .withf(move |request| request.method == Method::GET && request.path == expected)
            .times(1)
            .returning(|_| Ok(TransportResponse::new(422, "hash expired")));

        let response = client_with(transport).verify_domain_hash(&hash).await.unwrap();
        assert_eq!(response.status, 422);
        assert_eq!(response.text(), "hash expired");
    }

    #[tokio::test]
    async fn verify_keeps_reserved_characters_in_one_segment() {
        let mut transport = MockApi::new();
        transport
            .expect_send()
            .withf(|request| request.path == "phaas/v1/domains/verify/abcdefghijklmnopqrstuvwxy%23z1")
            .times(1)
            .returning(|_| Ok(TransportResponse::new(200, "")));

        let response = client_with(transport)
            .verify_domain_hash("abcdefghijklmnopqrstuvwxy#z1")
            .await
            .unwrap();
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn verify_counts_characters_not_bytes() {
        let hash = format!("{}\u{e9}", "a".repeat(VERIFICATION_HASH_LEN - 1));
        let mut transport = MockApi::new();
        transport
            .expect_send()
            .withf(|request| request.path.ends_with("/verify/aaaaaaaaaaaaaaaaaaaaaaaaaaa%C3%A9"))
            .times(1)
            .returning(|_| Ok(TransportResponse::new(204, "")));

        let response = client_with(transport).verify_domain_hash(&hash).await.unwrap();
        assert_eq!(response.status, 204);

        let too_short = format!("{}\u{e9}", "a".repeat(VERIFICATION_HASH_LEN - 2));
        assert_eq!(too_short.len(), VERIFICATION_HASH_LEN);
        let err = silent().verify_domain_hash(&too_short).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn resend_cannot_leave_the_domain_collection() {
        let mut transport = MockApi::new();
        transport
            .expect_send()
            .withf(|request| {
                request.path
                    == "phaas/v1/domains/..%2F..%2Floadbalancers%2Fv2%2Ffrontends%2F1/resend-verification"
            })
            .times(1)
            .returning(|_| Ok(TransportResponse::new(404, "not found")));

        let err = client_with(transport)
            .resend_validation_email("../../loadbalancers/v2/frontends/1")
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));

        for id in [".", ".."] {
            let err = silent().resend_validation_email(id).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
    }

    #[tokio::test]
    async fn missing_data_is_a_decode_error() {
        let mut transport = MockApi::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| Ok(TransportResponse::json_body(200, &json!({"meta": {}}))));

        let err = client_with(transport)
            .resend_validation_email("d-1")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }
}
