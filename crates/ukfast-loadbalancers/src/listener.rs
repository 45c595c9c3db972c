//! Listeners and the resources nested under them.

use crate::models::{
    AccessRule, Bind, Cert, Listener, Ssl, ACCESS_RULE_FIELDS, BIND_FIELDS, CERT_FIELDS,
    LISTENER_FIELDS, PARENT_KEY,
};
use crate::ssl::SslClient;
use crate::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use ukfast_core::id::{AccessRuleId, BindId, CertId, ListenerId};
use ukfast_core::mapper::Attributes;
use ukfast_core::{
    require_id, CollectionResource, EntityFactory, EntityOwner, FieldMap, ListParams, Page,
    SelfResponse, ServiceClient,
};

/// Collection path for listeners.
pub const LISTENER_COLLECTION: &str = "v2/frontends";

/// Client for `v2/frontends` and its binds, certificates, access rules and
/// SSLs.
///
/// Entities of nested collections returned by this client always carry
/// their listener's id, so a [`SelfResponse`] wrapping them can be updated
/// or deleted without naming the listener again.
#[derive(Debug, Clone)]
pub struct ListenerClient {
    listeners: CollectionResource<Listener>,
    binds: EntityFactory<Bind>,
    certs: EntityFactory<Cert>,
    access_rules: EntityFactory<AccessRule>,
    ssls: SslClient,
}

impl ListenerClient {
    /// Client issuing requests through `service`.
    ///
    /// # Errors
    ///
    /// Returns [`ukfast_core::Error::Config`] if a field map is malformed.
    pub fn new(service: ServiceClient) -> Result<Self> {
        Ok(Self {
            listeners: CollectionResource::new(
                service.clone(),
                LISTENER_COLLECTION,
                EntityFactory::new(FieldMap::new(LISTENER_FIELDS)?),
            ),
            binds: EntityFactory::new(FieldMap::new(BIND_FIELDS)?),
            certs: EntityFactory::new(FieldMap::new(CERT_FIELDS)?),
            access_rules: EntityFactory::new(FieldMap::new(ACCESS_RULE_FIELDS)?),
            ssls: SslClient::new(service)?,
        })
    }

    /// The SSL client used for SSLs created through a listener.
    #[must_use]
    pub const fn ssls(&self) -> &SslClient {
        &self.ssls
    }

    fn nested<T>(
        &self,
        factory: &EntityFactory<T>,
        listener: ListenerId,
        segment: &str,
    ) -> CollectionResource<T> {
        let mut parent = Attributes::new();
        parent.insert(PARENT_KEY.to_string(), Value::from(listener.get()));
        CollectionResource::new(
            self.listeners.service().clone(),
            format!("{LISTENER_COLLECTION}/{listener}/{segment}"),
            factory.clone().with_context(parent),
        )
    }

    fn binds(&self, listener: ListenerId) -> CollectionResource<Bind> {
        self.nested(&self.binds, listener, "binds")
    }

    fn certs(&self, listener: ListenerId) -> CollectionResource<Cert> {
        self.nested(&self.certs, listener, "certs")
    }

    fn access_rules(&self, listener: ListenerId) -> CollectionResource<AccessRule> {
        self.nested(&self.access_rules, listener, "access")
    }

    /// Get a page of listeners.
    ///
    /// # Errors
    ///
    /// Propagates request and decoding errors.
    pub async fn list(&self, params: &ListParams) -> Result<Page<Listener>> {
        self.listeners.list(params).await
    }

    /// Get one listener.
    ///
    /// # Errors
    ///
    /// Propagates request and decoding errors.
    pub async fn get(&self, id: ListenerId) -> Result<Listener> {
        self.listeners.get(id).await
    }

    /// Create a listener.
    ///
    /// # Errors
    ///
    /// Propagates request and decoding errors.
    pub async fn create(&self, listener: &Listener) -> Result<SelfResponse<Self, Listener>> {
        self.listeners.create(self.clone(), listener).await
    }

    /// Update a listener identified by its own id.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `listener` has no id.
    pub async fn update(&self, listener: &Listener) -> Result<SelfResponse<Self, Listener>> {
        let id = require_id(listener.id, "id")?;
        self.listeners.update(self.clone(), id, listener).await
    }

    /// Delete a listener.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub async fn delete(&self, id: ListenerId) -> Result<bool> {
        self.listeners.delete(id).await
    }

    /// Get a page of a listener's SSLs. Filters use SSL friendly names.
    ///
    /// # Errors
    ///
    /// Propagates request and decoding errors.
    pub async fn get_ssls(&self, listener: ListenerId, params: &ListParams) -> Result<Page<Ssl>> {
        CollectionResource::new(
            self.listeners.service().clone(),
            format!("{LISTENER_COLLECTION}/{listener}/ssls"),
            self.ssls.factory().clone(),
        )
        .list(params)
        .await
    }

    /// Add an SSL to a listener. The result is bound to the SSL client.
    ///
    /// # Errors
    ///
    /// Propagates request and decoding errors.
    pub async fn add_ssl(
        &self,
        listener: ListenerId,
        ssl: &Ssl,
    ) -> Result<SelfResponse<SslClient, Ssl>> {
        CollectionResource::new(
            self.listeners.service().clone(),
            format!("{LISTENER_COLLECTION}/{listener}/ssls"),
            self.ssls.factory().clone(),
        )
        .create(self.ssls.clone(), ssl)
        .await
    }

    /// Get a page of a listener's binds.
    ///
    /// # Errors
    ///
    /// Propagates request and decoding errors.
    pub async fn get_binds(&self, listener: ListenerId, params: &ListParams) -> Result<Page<Bind>> {
        self.binds(listener).list(params).await
    }

    /// Add a bind to a listener.
    ///
    /// # Errors
    ///
    /// Propagates request and decoding errors.
    pub async fn add_bind(
        &self,
        listener: ListenerId,
        bind: &Bind,
    ) -> Result<SelfResponse<Self, Bind>> {
        self.binds(listener).create(self.clone(), bind).await
    }

    /// Update a bind identified by its own id.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `bind` has no id.
    pub async fn update_bind(
        &self,
        listener: ListenerId,
        bind: &Bind,
    ) -> Result<SelfResponse<Self, Bind>> {
        let id = require_id(bind.id, "id")?;
        self.binds(listener).update(self.clone(), id, bind).await
    }

    /// Delete a bind.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub async fn delete_bind(&self, listener: ListenerId, id: BindId) -> Result<bool> {
        self.binds(listener).delete(id).await
    }

    /// Get a page of a listener's certificates.
    ///
    /// # Errors
    ///
    /// Propagates request and decoding errors.
    pub async fn get_certs(&self, listener: ListenerId, params: &ListParams) -> Result<Page<Cert>> {
        self.certs(listener).list(params).await
    }

    /// Add a certificate to a listener.
    ///
    /// # Errors
    ///
    /// Propagates request and decoding errors.
    pub async fn add_cert(
        &self,
        listener: ListenerId,
        cert: &Cert,
    ) -> Result<SelfResponse<Self, Cert>> {
        self.certs(listener).create(self.clone(), cert).await
    }

    /// Delete a certificate.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub async fn delete_cert(&self, listener: ListenerId, id: CertId) -> Result<bool> {
        self.certs(listener).delete(id).await
    }

    /// Get a page of a listener's access rules.
    ///
    /// # Errors
    ///
    /// Propagates request and decoding errors.
    pub async fn get_access_rule_page(
        &self,
        listener: ListenerId,
        params: &ListParams,
    ) -> Result<Page<AccessRule>> {
        self.access_rules(listener).list(params).await
    }

    /// Get one access rule of a listener.
    ///
    /// # Errors
    ///
    /// Propagates request and decoding errors.
    pub async fn get_access_rule_by_id(
        &self,
        listener: ListenerId,
        id: AccessRuleId,
    ) -> Result<AccessRule> {
        self.access_rules(listener).get(id).await
    }

    /// Add an access rule to a listener. With `None` an empty request is
    /// posted and the server fills in defaults.
    ///
    /// # Errors
    ///
    /// Propagates request and decoding errors.
    pub async fn add_access_rule(
        &self,
        listener: ListenerId,
        rule: Option<&AccessRule>,
    ) -> Result<SelfResponse<Self, AccessRule>> {
        let rules = self.access_rules(listener);
        match rule {
            Some(rule) => rules.create(self.clone(), rule).await,
            None => rules.create_empty(self.clone()).await,
        }
    }

    /// Update an access rule identified by its own id.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `rule` has no id.
    pub async fn update_access_rule(
        &self,
        listener: ListenerId,
        rule: &AccessRule,
    ) -> Result<SelfResponse<Self, AccessRule>> {
        let id = require_id(rule.id, "id")?;
        self.access_rules(listener)
            .update(self.clone(), id, rule)
            .await
    }

    /// Delete an access rule.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub async fn delete_access_rule(&self, listener: ListenerId, id: AccessRuleId) -> Result<bool> {
        self.access_rules(listener).delete(id).await
    }
}

/// Identity of an entity nested under a listener.
trait Nested {
    type Id: std::fmt::Display + Send;

    fn ids(&self) -> Result<(ListenerId, Self::Id)>;
}

impl Nested for Bind {
    type Id = BindId;

    fn ids(&self) -> Result<(ListenerId, BindId)> {
        Ok((require_id(self.frontend_id, "frontendId")?, require_id(self.id, "id")?))
    }
}

impl Nested for Cert {
    type Id = CertId;

    fn ids(&self) -> Result<(ListenerId, CertId)> {
        Ok((require_id(self.frontend_id, "frontendId")?, require_id(self.id, "id")?))
    }
}

impl Nested for AccessRule {
    type Id = AccessRuleId;

    fn ids(&self) -> Result<(ListenerId, AccessRuleId)> {
        Ok((require_id(self.frontend_id, "frontendId")?, require_id(self.id, "id")?))
    }
}

impl ListenerClient {
    async fn fetch_nested<T>(
        &self,
        factory: &EntityFactory<T>,
        segment: &str,
        entity: &T,
    ) -> Result<SelfResponse<Self, T>>
    where
        T: Nested + DeserializeOwned + Serialize + Send + Sync + 'static,
    {
        let (listener, id) = entity.ids()?;
        self.nested(factory, listener, segment)
            .get_response(self.clone(), id)
            .await
    }

    async fn update_nested<T>(
        &self,
        factory: &EntityFactory<T>,
        segment: &str,
        entity: &T,
    ) -> Result<SelfResponse<Self, T>>
    where
        T: Nested + DeserializeOwned + Serialize + Send + Sync + 'static,
    {
        let (listener, id) = entity.ids()?;
        debug!(%listener, %id, segment, "Updating nested resource");
        self.nested(factory, listener, segment)
            .update(self.clone(), id, entity)
            .await
    }

    async fn delete_nested<T>(&self, factory: &EntityFactory<T>, segment: &str, entity: &T) -> Result<bool>
    where
        T: Nested,
    {
        let (listener, id) = entity.ids()?;
        self.nested(factory, listener, segment).delete(id).await
    }
}

#[async_trait]
impl EntityOwner<Listener> for ListenerClient {
    async fn fetch_entity(&self, listener: &Listener) -> Result<SelfResponse<Self, Listener>> {
        let id = require_id(listener.id, "id")?;
        self.listeners.get_response(self.clone(), id).await
    }

    async fn update_entity(&self, listener: &Listener) -> Result<SelfResponse<Self, Listener>> {
        self.update(listener).await
    }

    async fn delete_entity(&self, listener: &Listener) -> Result<bool> {
        let id = require_id(listener.id, "id")?;
        self.delete(id).await
    }
}

#[async_trait]
impl EntityOwner<Bind> for ListenerClient {
    async fn fetch_entity(&self, bind: &Bind) -> Result<SelfResponse<Self, Bind>> {
        self.fetch_nested(&self.binds, "binds", bind).await
    }

    async fn update_entity(&self, bind: &Bind) -> Result<SelfResponse<Self, Bind>> {
        self.update_nested(&self.binds, "binds", bind).await
    }

    async fn delete_entity(&self, bind: &Bind) -> Result<bool> {
        self.delete_nested(&self.binds, "binds", bind).await
    }
}

#[async_trait]
impl EntityOwner<Cert> for ListenerClient {
    async fn fetch_entity(&self, cert: &Cert) -> Result<SelfResponse<Self, Cert>> {
        self.fetch_nested(&self.certs, "certs", cert).await
    }

    async fn update_entity(&self, cert: &Cert) -> Result<SelfResponse<Self, Cert>> {
        self.update_nested(&self.certs, "certs", cert).await
    }

    async fn delete_entity(&self, cert: &Cert) -> Result<bool> {
        self.delete_nested(&self.certs, "certs", cert).await
    }
}

#[async_trait]
impl EntityOwner<AccessRule> for ListenerClient {
    async fn fetch_entity(&self, rule: &AccessRule) -> Result<SelfResponse<Self, AccessRule>> {
        self.fetch_nested(&self.access_rules, "access", rule).await
    }

    async fn update_entity(&self, rule: &AccessRule) -> Result<SelfResponse<Self, AccessRule>> {
        self.update_nested(&self.access_rules, "access", rule).await
    }

    async fn delete_entity(&self, rule: &AccessRule) -> Result<bool> {
        self.delete_nested(&self.access_rules, "access", rule).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use ukfast_core::id::VipId;
    use ukfast_core::{ApiConfig, ErrorKind, ServiceClientBuilder};
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> ListenerClient {
        let config = ApiConfig::new(server.uri()).unwrap();
        let service = ServiceClientBuilder::new("loadbalancers/", config)
            .build()
            .unwrap();
        ListenerClient::new(service).unwrap()
    }

    fn page_of(items: Value) -> Value {
        json!({
            "data": items,
            "meta": {"pagination": {"total": 1, "count": 1, "per_page": 15, "current_page": 1, "total_pages": 1}}
        })
    }

    #[tokio::test]
    async fn create_listener_returns_friendly_entity() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/loadbalancers/v2/frontends"))
            .and(body_json(json!({
                "name": "web",
                "vips_id": 2,
                "hsts_enabled": true,
                "hsts_maxage": 600
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "data": {"id": 44},
                "meta": {"location": "https://api.ukfast.io/loadbalancers/v2/frontends/44"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let listener = Listener {
            name: Some("web".to_string()),
            vips_id: Some(VipId::new(2)),
            hsts_enabled: Some(true),
            hsts_max_age: Some(600),
            ..Listener::default()
        };
        let response = client(&server).create(&listener).await.unwrap();

        assert_eq!(response.id, Some(ListenerId::new(44)));
        assert_eq!(response.name, listener.name);
        assert_eq!(response.vips_id, listener.vips_id);
        assert_eq!(response.hsts_max_age, Some(600));
    }

    #[tokio::test]
    async fn get_binds_stamps_listener_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/loadbalancers/v2/frontends/7/binds"))
            .and(query_param("vips_id", "3"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(page_of(json!([{"id": 1, "vips_id": 3, "port": 443}]))),
            )
            .expect(1)
            .mount(&server)
            .await;

        let params = ListParams::new().with_filter("vipsId", 3);
        let binds = client(&server)
            .get_binds(ListenerId::new(7), &params)
            .await
            .unwrap()
            .items()
            .unwrap();

        assert_eq!(binds.len(), 1);
        assert_eq!(binds[0].frontend_id, Some(ListenerId::new(7)));
        assert_eq!(binds[0].vips_id, Some(VipId::new(3)));
        assert_eq!(binds[0].port, Some(443));
    }

    #[tokio::test]
    async fn added_bind_deletes_itself() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/loadbalancers/v2/frontends/7/binds"))
            .and(body_json(json!({"vips_id": 3, "port": 80})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"data": {"id": 12}})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/loadbalancers/v2/frontends/7/binds/12"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let bind = Bind {
            vips_id: Some(VipId::new(3)),
            port: Some(80),
            ..Bind::default()
        };
        let response = client(&server)
            .add_bind(ListenerId::new(7), &bind)
            .await
            .unwrap();
        assert_eq!(response.frontend_id, Some(ListenerId::new(7)));
        assert!(response.delete().await.unwrap());
    }

    #[tokio::test]
    async fn cert_maps_name_and_pem() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/loadbalancers/v2/frontends/2/certs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_of(json!([{
                "id": 6,
                "frontend_id": 2,
                "certs_name": "wildcard",
                "certs_pem": "-----BEGIN CERTIFICATE-----"
            }]))))
            .mount(&server)
            .await;

        let certs = client(&server)
            .get_certs(ListenerId::new(2), &ListParams::default())
            .await
            .unwrap();
        let cert = certs.get(0).unwrap().unwrap();
        assert_eq!(cert.name.as_deref(), Some("wildcard"));
        assert_eq!(cert.pem.as_deref(), Some("-----BEGIN CERTIFICATE-----"));
    }

    #[tokio::test]
    async fn delete_cert_requires_no_content() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/loadbalancers/v2/frontends/2/certs/6"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let deleted = client(&server)
            .delete_cert(ListenerId::new(2), CertId::new(6))
            .await
            .unwrap();
        assert!(!deleted);
    }

    #[tokio::test]
    async fn access_rule_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/loadbalancers/v2/frontends/5/access/9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"id": 9, "frontend_id": 5, "ip": "10.0.0.0/8", "whitelist": false}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/loadbalancers/v2/frontends/5/access/9"))
            .and(body_json(json!({"id": 9, "frontend_id": 5, "ip": "10.0.0.0/8", "whitelist": true})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"id": 9, "frontend_id": 5, "ip": "10.0.0.0/8", "whitelist": true}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        let mut rule = client
            .get_access_rule_by_id(ListenerId::new(5), AccessRuleId::new(9))
            .await
            .unwrap();
        assert_eq!(rule.whitelist, Some(false));

        rule.whitelist = Some(true);
        let updated = client
            .update_access_rule(ListenerId::new(5), &rule)
            .await
            .unwrap();
        assert_eq!(updated.whitelist, Some(true));
        assert_eq!(updated.id(), Some(&json!(9)));
    }

    #[tokio::test]
    async fn add_access_rule_without_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/loadbalancers/v2/frontends/5/access"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"data": {"id": 10}})))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server)
            .add_access_rule(ListenerId::new(5), None)
            .await
            .unwrap();
        assert_eq!(response.id, Some(AccessRuleId::new(10)));
        assert_eq!(response.frontend_id, Some(ListenerId::new(5)));
    }

    #[tokio::test]
    async fn nested_mutation_without_parent_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let orphan = AccessRule {
            id: Some(AccessRuleId::new(3)),
            ..AccessRule::default()
        };
        let client = client(&server);
        let err = EntityOwner::<AccessRule>::delete_entity(&client, &orphan)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn add_ssl_binds_result_to_ssl_client() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/loadbalancers/v2/frontends/4/ssls"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "data": {"id": 21, "allow_tlsv1": false, "allow_tlsv11": false}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/loadbalancers/v2/ssls/21"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server)
            .add_ssl(ListenerId::new(4), &Ssl::default())
            .await
            .unwrap();
        assert_eq!(response.allow_tls, Some(Default::default()));
        assert!(response.delete().await.unwrap());
    }
}
