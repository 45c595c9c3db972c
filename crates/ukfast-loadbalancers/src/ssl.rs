//! SSL bindings and the `allowTls` folding.

use crate::models::{Ssl, TlsVersion, SSL_FIELDS};
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use ukfast_core::id::SslId;
use ukfast_core::mapper::Attributes;
use ukfast_core::{
    require_id, CollectionResource, EntityFactory, EntityOwner, FieldMap, FieldTransform,
    ListParams, Page, SelfResponse, ServiceClient,
};

/// Collection path for SSL bindings.
pub const SSL_COLLECTION: &str = "v2/ssls";

const ALLOW_TLS: &str = "allowTls";

/// Folds the `allow_tlsv1`/`allow_tlsv11` wire flags into the friendly
/// `allowTls` token list and back.
///
/// When neither flag is on the wire the entity gets no `allowTls` at all; a
/// single missing flag reads as `false`. Unknown tokens are ignored on the
/// way out and a `null` list is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowTlsTransform;

impl FieldTransform for AllowTlsTransform {
    fn from_api(&self, wire: &mut Attributes) {
        if TlsVersion::ALL
            .iter()
            .all(|version| !wire.contains_key(version.wire_flag()))
        {
            return;
        }

        let tokens = TlsVersion::ALL
            .iter()
            .filter(|version| {
                wire.remove(version.wire_flag())
                    .and_then(|flag| flag.as_bool())
                    .unwrap_or(false)
            })
            .map(|version| Value::from(version.as_str()))
            .collect();
        wire.insert(ALLOW_TLS.to_string(), Value::Array(tokens));
    }

    fn to_api(&self, friendly: &mut Attributes) {
        let Some(Value::Array(tokens)) = friendly.remove(ALLOW_TLS) else {
            return;
        };

        for version in TlsVersion::ALL {
            let allowed = tokens
                .iter()
                .any(|token| token.as_str() == Some(version.as_str()));
            friendly.insert(version.wire_flag().to_string(), Value::Bool(allowed));
        }
    }
}

/// Builds the entity factory for SSL bindings.
pub(crate) fn ssl_factory() -> Result<EntityFactory<Ssl>> {
    Ok(EntityFactory::new(FieldMap::new(SSL_FIELDS)?).with_transform(Arc::new(AllowTlsTransform)))
}

/// Client for `v2/ssls`.
#[derive(Debug, Clone)]
pub struct SslClient {
    resource: CollectionResource<Ssl>,
}

impl SslClient {
    /// Client issuing requests through `service`.
    ///
    /// # Errors
    ///
    /// Returns [`ukfast_core::Error::Config`] if the field map is malformed.
    pub fn new(service: ServiceClient) -> Result<Self> {
        Ok(Self {
            resource: CollectionResource::new(service, SSL_COLLECTION, ssl_factory()?),
        })
    }

    pub(crate) fn factory(&self) -> &EntityFactory<Ssl> {
        self.resource.factory()
    }

    /// Get a page of SSL bindings. Filters use friendly names, including
    /// `allowTls`.
    ///
    /// # Errors
    ///
    /// Propagates request and decoding errors.
    pub async fn list(&self, params: &ListParams) -> Result<Page<Ssl>> {
        self.resource.list(params).await
    }

    /// Get one SSL binding.
    ///
    /// # Errors
    ///
    /// Propagates request and decoding errors.
    pub async fn get(&self, id: SslId) -> Result<Ssl> {
        self.resource.get(id).await
    }

    /// Create an SSL binding.
    ///
    /// # Errors
    ///
    /// Propagates request and decoding errors.
    pub async fn create(&self, ssl: &Ssl) -> Result<SelfResponse<Self, Ssl>> {
        self.resource.create(self.clone(), ssl).await
    }

    /// Update an SSL binding identified by its own id.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `ssl` has no id.
    pub async fn update(&self, ssl: &Ssl) -> Result<SelfResponse<Self, Ssl>> {
        let id = require_id(ssl.id, "id")?;
        self.resource.update(self.clone(), id, ssl).await
    }

    /// Delete an SSL binding.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub async fn delete(&self, id: SslId) -> Result<bool> {
        self.resource.delete(id).await
    }
}

#[async_trait]
impl EntityOwner<Ssl> for SslClient {
    async fn fetch_entity(&self, ssl: &Ssl) -> Result<SelfResponse<Self, Ssl>> {
        let id = require_id(ssl.id, "id")?;
        self.resource.get_response(self.clone(), id).await
    }

    async fn update_entity(&self, ssl: &Ssl) -> Result<SelfResponse<Self, Ssl>> {
        self.update(ssl).await
    }

    async fn delete_entity(&self, ssl: &Ssl) -> Result<bool> {
        let id = require_id(ssl.id, "id")?;
        self.delete(id).await
    }
}
