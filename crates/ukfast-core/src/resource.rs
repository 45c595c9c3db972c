//! Generic collection operations shared by every resource client.

use crate::client::{ServiceClient, TransportRequest};
use crate::entity::EntityFactory;
use crate::page::{ListParams, Page, PageRequest};
use crate::response::SelfResponse;
use crate::{Error, Result};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Display;
use tracing::debug;

/// `list`/`get`/`create`/`update`/`delete` over one collection path.
///
/// A resource client owns one of these per collection it exposes; nested
/// collections such as `v2/frontends/{id}/binds` get their own instance per
/// parent id.
#[derive(Debug, Clone)]
pub struct CollectionResource<T> {
    service: ServiceClient,
    path: String,
    factory: EntityFactory<T>,
}

impl<T> CollectionResource<T> {
    /// Collection at `path` (relative to the service base path).
    #[must_use]
    pub fn new(service: ServiceClient, path: impl Into<String>, factory: EntityFactory<T>) -> Self {
        Self {
            service,
            path: path.into().trim_end_matches('/').to_string(),
            factory,
        }
    }

    /// Collection path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path of one item.
    #[must_use]
    pub fn item_path(&self, id: impl Display) -> String {
        format!("{}/{id}", self.path)
    }

    /// The entity factory.
    #[must_use]
    pub const fn factory(&self) -> &EntityFactory<T> {
        &self.factory
    }

    /// The service client requests go through.
    #[must_use]
    pub const fn service(&self) -> &ServiceClient {
        &self.service
    }

    /// Delete one item. Only `204 No Content` counts as deleted.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub async fn delete(&self, id: impl Display + Send) -> Result<bool> {
        self.service.delete(&self.item_path(id)).await
    }
}

impl<T> CollectionResource<T>
where
    T: DeserializeOwned + Serialize + Send + Sync + 'static,
{
    /// Fetch one page. Filters use friendly names and are translated here.
    ///
    /// # Errors
    ///
    /// See [`crate::page::PaginationEngine::fetch`].
    pub async fn list(&self, params: &ListParams) -> Result<Page<T>> {
        let request = PageRequest::new(self.path.clone())
            .with_params(params)
            .with_filters(self.factory.filters_to_api(&params.filters));
        let page = self.service.pagination().fetch(request).await?;
        Ok(page.with_serializer(self.factory.serializer()))
    }

    /// Fetch one item by id, reading the `data` member of the envelope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the envelope has no `data` object, and
    /// propagates request errors.
    pub async fn get(&self, id: impl Display + Send) -> Result<T> {
        let body = self.service.get_json(&self.item_path(id)).await?;
        let data = body
            .get("data")
            .ok_or_else(|| Error::Decode(format!("`{}` returned no `data` member", self.path)))?;
        self.factory.load(data)
    }

    /// Fetch one item wrapped with `owner` for follow-up mutations.
    ///
    /// # Errors
    ///
    /// See [`CollectionResource::get`].
    pub async fn get_response<C>(&self, owner: C, id: impl Display + Send) -> Result<SelfResponse<C, T>> {
        let body = self.service.get_json(&self.item_path(id)).await?;
        SelfResponse::new(owner, body)?.with_serializer(&self.factory.serializer())
    }

    /// Create an item from its friendly form.
    ///
    /// Attributes the server omits from its reply are filled from what was
    /// sent, so the wrapped entity reflects the created resource.
    ///
    /// # Errors
    ///
    /// Propagates encoding, request, and decoding errors.
    pub async fn create<C>(&self, owner: C, entity: &T) -> Result<SelfResponse<C, T>> {
        let wire = self.factory.to_api(entity)?;
        self.send(owner, Method::POST, self.path.clone(), Some(wire))
            .await
    }

    /// `POST` to the collection without a body.
    ///
    /// # Errors
    ///
    /// Propagates request and decoding errors.
    pub async fn create_empty<C>(&self, owner: C) -> Result<SelfResponse<C, T>> {
        self.send(owner, Method::POST, self.path.clone(), None).await
    }

    /// Update one item with `PATCH`.
    ///
    /// # Errors
    ///
    /// Propagates encoding, request, and decoding errors.
    pub async fn update<C>(
        &self,
        owner: C,
        id: impl Display + Send,
        entity: &T,
    ) -> Result<SelfResponse<C, T>> {
        let wire = self.factory.to_api(entity)?;
        self.send(owner, Method::PATCH, self.item_path(id), Some(wire))
            .await
    }

    async fn send<C>(
        &self,
        owner: C,
        method: Method,
        path: String,
        wire: Option<Value>,
    ) -> Result<SelfResponse<C, T>> {
        let mut request = TransportRequest::new(method, path);
        if let Some(wire) = &wire {
            request = request.with_json(wire)?;
        }

        let mut body = self.service.json(request).await?;
        if let (Some(Value::Object(sent)), Some(Value::Object(data))) =
            (wire, body.get_mut("data"))
        {
            for (key, value) in sent {
                data.entry(key).or_insert(value);
            }
        }

        let response = SelfResponse::new(owner, body)?;
        debug!(path = %self.path, id = ?response.id(), "Resource written");
        response.with_serializer(&self.factory.serializer())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{MockTransport, TransportResponse};
    use crate::mapper::FieldMap;
    use mockall::predicate::function;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::Arc;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Cert {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<u64>,
        #[serde(rename = "frontendId", default, skip_serializing_if = "Option::is_none")]
        frontend_id: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    }

    fn certs(transport: MockTransport) -> CollectionResource<Cert> {
        let map = FieldMap::new(&[("frontend_id", "frontendId"), ("certs_name", "name")]).unwrap();
        CollectionResource::new(
            ServiceClient::new(Arc::new(transport), "loadbalancers/"),
            "v2/frontends/4/certs/",
            EntityFactory::new(map),
        )
    }

    fn body_of(req: &TransportRequest) -> Value {
        serde_json::from_slice(req.body.as_deref().unwrap_or_default()).unwrap_or(Value::Null)
    }

    #[tokio::test]
    async fn test_list_translates_filters_and_items() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .with(function(|req: &TransportRequest| {
                req.path == "loadbalancers/v2/frontends/4/certs"
                    && req.query.get("certs_name") == Some("wildcard")
                    && req.query.get("per_page") == Some("5")
            }))
            .times(1)
            .returning(|_| {
                Ok(TransportResponse::json_body(
                    200,
                    &json!({
                        "data": [{"id": 1, "frontend_id": 4, "certs_name": "wildcard"}],
                        "meta": {"pagination": {"total": 1, "total_pages": 1, "current_page": 1, "per_page": 5}}
                    }),
                ))
            });

        let params = ListParams::new().with_per_page(5).with_filter("name", "wildcard");
        let page = certs(transport).list(&params).await.unwrap();
        assert_eq!(
            page.items().unwrap(),
            vec![Cert {
                id: Some(1),
                frontend_id: Some(4),
                name: Some("wildcard".to_string())
            }]
        );
    }

    #[tokio::test]
    async fn test_get_reads_data_member() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .with(function(|req: &TransportRequest| {
                req.method == Method::GET && req.path == "loadbalancers/v2/frontends/4/certs/9"
            }))
            .returning(|_| {
                Ok(TransportResponse::json_body(
                    200,
                    &json!({"data": {"id": 9, "certs_name": "api"}, "meta": {}}),
                ))
            });

        let cert = certs(transport).get(9).await.unwrap();
        assert_eq!(cert.id, Some(9));
        assert_eq!(cert.name.as_deref(), Some("api"));
    }

    #[tokio::test]
    async fn test_create_merges_sent_fields() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .with(function(|req: &TransportRequest| {
                req.method == Method::POST
                    && req.header("content-type") == Some("application/json")
                    && body_of(req) == json!({"frontend_id": 4, "certs_name": "new"})
            }))
            .times(1)
            .returning(|_| {
                Ok(TransportResponse::json_body(
                    201,
                    &json!({"data": {"id": 77}, "meta": {"location": "https://api.ukfast.io/loadbalancers/v2/frontends/4/certs/77"}}),
                ))
            });

        let sent = Cert {
            id: None,
            frontend_id: Some(4),
            name: Some("new".to_string()),
        };
        let response = certs(transport).create((), &sent).await.unwrap();
        assert_eq!(response.id(), Some(&json!(77)));
        assert_eq!(response.frontend_id, sent.frontend_id);
        assert_eq!(response.name, sent.name);
        assert!(response.location().unwrap().ends_with("/certs/77"));
    }

    #[tokio::test]
    async fn test_update_patches_item_path() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .with(function(|req: &TransportRequest| {
                req.method == Method::PATCH
                    && req.path == "loadbalancers/v2/frontends/4/certs/77"
                    && body_of(req) == json!({"certs_name": "renamed"})
            }))
            .times(1)
            .returning(|_| {
                Ok(TransportResponse::json_body(
                    200,
                    &json!({"data": {"id": 77, "certs_name": "renamed"}}),
                ))
            });

        let patch = Cert {
            name: Some("renamed".to_string()),
            ..Cert::default()
        };
        let response = certs(transport).update((), 77, &patch).await.unwrap();
        assert_eq!(response.into_entity().name.as_deref(), Some("renamed"));
    }

    #[tokio::test]
    async fn test_delete_exact_status() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .with(function(|req: &TransportRequest| req.method == Method::DELETE))
            .times(1)
            .returning(|_| Ok(TransportResponse::new(200, "{}")));

        assert!(!certs(transport).delete(77).await.unwrap());
    }
}
