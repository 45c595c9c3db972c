//! Single-entity responses and raw downloads.

use crate::client::TransportResponse;
use crate::entity::{kind_of, Serializer};
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::ops::Deref;

/// Property holding an entity's identity unless overridden.
pub const DEFAULT_ID_PROPERTY: &str = "id";

static NULL: Value = Value::Null;

/// A client able to act on entities of type `T` it previously returned.
///
/// Implementations find everything they need (the entity's own id, the
/// parent id of nested resources) on the entity itself, and must fail with
/// [`Error::Validation`] before sending anything when it is missing.
#[async_trait]
pub trait EntityOwner<T: Send + Sync>: Clone + Send + Sync + Sized {
    /// Fetch the current server-side state of `entity`.
    async fn fetch_entity(&self, entity: &T) -> Result<SelfResponse<Self, T>>;

    /// Send `entity` back to the server.
    async fn update_entity(&self, entity: &T) -> Result<SelfResponse<Self, T>>;

    /// Delete `entity`. Only `204 No Content` counts as deleted.
    async fn delete_entity(&self, entity: &T) -> Result<bool>;
}

/// One decoded entity bound to the client that produced it.
///
/// The raw envelope (`{"data": {...}, "meta": {...}}`) is kept so the entity
/// can be rebuilt with a different serializer and so response metadata such
/// as the `location` of a created resource remains reachable.
#[derive(Clone)]
pub struct SelfResponse<C, T = Value> {
    client: C,
    envelope: Value,
    entity: T,
    id_property: String,
}

impl<C> SelfResponse<C> {
    /// Wrap a decoded envelope. The entity starts out as the raw `data`
    /// object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if `data` is missing or not an object.
    pub fn new(client: C, envelope: Value) -> Result<Self> {
        let entity = match envelope.get("data") {
            Some(data @ Value::Object(_)) => data.clone(),
            Some(other) => {
                return Err(Error::Decode(format!(
                    "response `data` is {}, expected an object",
                    kind_of(other)
                )))
            }
            None => return Err(Error::Decode("response has no `data` member".to_string())),
        };

        Ok(Self {
            client,
            envelope,
            entity,
            id_property: DEFAULT_ID_PROPERTY.to_string(),
        })
    }
}

impl<C, T> SelfResponse<C, T> {
    /// Rebuild the entity from the raw `data` object. Replaces any previously
    /// attached serializer's result.
    ///
    /// # Errors
    ///
    /// Propagates the serializer's error.
    pub fn serialize_with<U, F>(self, f: F) -> Result<SelfResponse<C, U>>
    where
        F: FnOnce(&Value) -> Result<U>,
    {
        let entity = f(self.data())?;
        Ok(SelfResponse {
            client: self.client,
            envelope: self.envelope,
            entity,
            id_property: self.id_property,
        })
    }

    /// [`SelfResponse::serialize_with`] for a shared [`Serializer`].
    ///
    /// # Errors
    ///
    /// Propagates the serializer's error.
    pub fn with_serializer<U>(self, serializer: &Serializer<U>) -> Result<SelfResponse<C, U>> {
        self.serialize_with(|data| serializer(data))
    }

    /// Use a different identity property.
    #[must_use]
    pub fn with_id_property(mut self, property: impl Into<String>) -> Self {
        self.id_property = property.into();
        self
    }

    /// The raw identity value from `data`.
    #[must_use]
    pub fn id(&self) -> Option<&Value> {
        self.data()
            .get(&self.id_property)
            .filter(|id| !id.is_null())
    }

    /// `meta.location`, when the server reports one.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.envelope
            .pointer("/meta/location")
            .and_then(Value::as_str)
    }

    /// The whole decoded envelope.
    #[must_use]
    pub const fn raw(&self) -> &Value {
        &self.envelope
    }

    /// The raw `data` object.
    #[must_use]
    pub fn data(&self) -> &Value {
        self.envelope.get("data").unwrap_or(&NULL)
    }

    /// The typed entity.
    #[must_use]
    pub const fn entity(&self) -> &T {
        &self.entity
    }

    /// Take the typed entity.
    #[must_use]
    pub fn into_entity(self) -> T {
        self.entity
    }

    /// The bound client.
    #[must_use]
    pub const fn client(&self) -> &C {
        &self.client
    }
}

impl<C, T> SelfResponse<C, T>
where
    C: EntityOwner<T>,
    T: Send + Sync,
{
    /// Re-fetch this entity through the bound client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the entity lacks its identity, and
    /// propagates request errors.
    pub async fn refresh(&self) -> Result<Self> {
        self.client.fetch_entity(&self.entity).await
    }

    /// Send this entity back through the bound client.
    ///
    /// # Errors
    ///
    /// See [`SelfResponse::refresh`].
    pub async fn update(&self) -> Result<Self> {
        self.client.update_entity(&self.entity).await
    }

    /// Delete this entity through the bound client.
    ///
    /// # Errors
    ///
    /// See [`SelfResponse::refresh`].
    pub async fn delete(&self) -> Result<bool> {
        self.client.delete_entity(&self.entity).await
    }
}

impl<C, T> Deref for SelfResponse<C, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.entity
    }
}

impl<C, T: fmt::Debug> fmt::Debug for SelfResponse<C, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelfResponse")
            .field("entity", &self.entity)
            .field("location", &self.location())
            .finish_non_exhaustive()
    }
}

/// Unwrap an identity field or fail before any request is made.
///
/// # Errors
///
/// Returns [`Error::Validation`] naming the field when it is absent.
pub fn require_id<I>(value: Option<I>, field: &str) -> Result<I> {
    value.ok_or_else(|| Error::validation(format!("entity has no `{field}`")))
}

/// A non-JSON response body, such as an attachment. Returned by
/// [`crate::ServiceClient::download`] for resource families that serve files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    content_type: Option<String>,
    body: Vec<u8>,
}

impl Download {
    /// Take the body and content type of a response.
    #[must_use]
    pub fn from_response(response: TransportResponse) -> Self {
        Self {
            content_type: response.header("content-type").map(str::to_string),
            body: response.body,
        }
    }

    /// The `Content-Type` header, if sent.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// The body.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    /// Take the body.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.body
    }

    /// Body length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// True for an empty body.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}
