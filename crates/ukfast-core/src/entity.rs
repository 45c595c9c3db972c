//! Typed entity construction from wire objects and back.

use crate::mapper::{api_to_friendly, friendly_to_api, Attributes, FieldMap, FieldTransform};
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Deserialization strategy applied to one raw wire item.
pub type Serializer<T> = Arc<dyn Fn(&Value) -> Result<T> + Send + Sync>;

/// Builds entities of type `T` from wire objects and turns them back into
/// wire objects, using a resource's [`FieldMap`] and optional
/// [`FieldTransform`].
pub struct EntityFactory<T> {
    map: FieldMap,
    transform: Option<Arc<dyn FieldTransform>>,
    context: Attributes,
    _entity: PhantomData<fn() -> T>,
}

impl<T> EntityFactory<T> {
    /// Factory driven by a field map alone.
    #[must_use]
    pub fn new(map: FieldMap) -> Self {
        Self {
            map,
            transform: None,
            context: Attributes::new(),
            _entity: PhantomData,
        }
    }

    /// Add a transform for composite attributes.
    #[must_use]
    pub fn with_transform(mut self, transform: Arc<dyn FieldTransform>) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Friendly attributes stamped onto every loaded entity that lacks them.
    #[must_use]
    pub fn with_context(mut self, context: Attributes) -> Self {
        self.context = context;
        self
    }

    /// The field map in use.
    #[must_use]
    pub fn map(&self) -> &FieldMap {
        &self.map
    }

    /// Wire object to friendly attributes.
    #[must_use]
    pub fn api_to_friendly(&self, mut wire: Attributes) -> Attributes {
        if let Some(transform) = &self.transform {
            transform.from_api(&mut wire);
        }
        api_to_friendly(wire, &self.map)
    }

    /// Friendly attributes to wire object.
    #[must_use]
    pub fn friendly_to_api(&self, mut friendly: Attributes) -> Attributes {
        if let Some(transform) = &self.transform {
            transform.to_api(&mut friendly);
        }
        friendly_to_api(friendly, &self.map)
    }

    /// Translate friendly listing filters into wire query pairs.
    #[must_use]
    pub fn filters_to_api(&self, filters: &Attributes) -> Vec<(String, String)> {
        self.friendly_to_api(filters.clone())
            .into_iter()
            .filter_map(|(key, value)| query_value(&value).map(|value| (key, value)))
            .collect()
    }
}

impl<T: DeserializeOwned> EntityFactory<T> {
    /// Build a typed entity from one wire item.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the item is not an object or does not fit `T`.
    pub fn load(&self, wire: &Value) -> Result<T> {
        let Value::Object(wire) = wire else {
            return Err(Error::Decode(format!(
                "expected a JSON object, found {}",
                kind_of(wire)
            )));
        };

        let mut friendly = self.api_to_friendly(wire.clone());
        for (key, value) in &self.context {
            if friendly.get(key).map_or(true, Value::is_null) {
                friendly.insert(key.clone(), value.clone());
            }
        }

        serde_json::from_value(Value::Object(friendly)).map_err(Error::from)
    }
}

impl<T: DeserializeOwned + 'static> EntityFactory<T> {
    /// This factory as a per-item deserialization strategy.
    #[must_use]
    pub fn serializer(&self) -> Serializer<T> {
        let factory = self.clone();
        Arc::new(move |item: &Value| factory.load(item))
    }
}

impl<T: Serialize> EntityFactory<T> {
    /// Turn a typed entity into a wire object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if `T` does not serialize to a JSON object.
    pub fn to_api(&self, entity: &T) -> Result<Value> {
        match serde_json::to_value(entity)? {
            Value::Object(friendly) => Ok(Value::Object(self.friendly_to_api(friendly))),
            other => Err(Error::Decode(format!(
                "entity serialized to {} instead of an object",
                kind_of(&other)
            ))),
        }
    }
}

impl<T> Clone for EntityFactory<T> {
    fn clone(&self) -> Self {
        Self {
            map: self.map.clone(),
            transform: self.transform.clone(),
            context: self.context.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T> fmt::Debug for EntityFactory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityFactory")
            .field("map", &self.map)
            .field("transform", &self.transform.is_some())
            .field("context", &self.context)
            .finish()
    }
}

fn query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(query_value)
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Object(_) => Some(value.to_string()),
    }
}

pub(crate) const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Bind {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<u64>,
        #[serde(rename = "frontendId", default, skip_serializing_if = "Option::is_none")]
        frontend_id: Option<u64>,
        #[serde(rename = "vipsId", default, skip_serializing_if = "Option::is_none")]
        vips_id: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        port: Option<u16>,
    }

    fn factory() -> EntityFactory<Bind> {
        EntityFactory::new(
            FieldMap::new(&[("frontend_id", "frontendId"), ("vips_id", "vipsId")]).unwrap(),
        )
    }

    struct Upper;

    impl FieldTransform for Upper {
        fn from_api(&self, wire: &mut Attributes) {
            if let Some(Value::String(s)) = wire.remove("shout") {
                wire.insert("loud".to_string(), Value::String(s.to_uppercase()));
            }
        }

        fn to_api(&self, friendly: &mut Attributes) {
            if let Some(Value::String(s)) = friendly.remove("loud") {
                friendly.insert("shout".to_string(), Value::String(s.to_lowercase()));
            }
        }
    }

    #[test]
    fn test_load_maps_wire_item() {
        let bind = factory()
            .load(&json!({"id": 1, "frontend_id": 2, "vips_id": 3, "port": 443, "ignored": "x"}))
            .unwrap();
        assert_eq!(
            bind,
            Bind {
                id: Some(1),
                frontend_id: Some(2),
                vips_id: Some(3),
                port: Some(443)
            }
        );
    }

    #[test]
    fn test_load_rejects_non_object() {
        let err = factory().load(&json!([1, 2])).unwrap_err();
        assert!(matches!(err, Error::Decode(msg) if msg.contains("an array")));
    }

    #[test]
    fn test_load_rejects_wrong_types() {
        let err = factory().load(&json!({"port": "https"})).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_to_api_omits_absent_fields() {
        let bind = Bind {
            id: None,
            frontend_id: Some(7),
            vips_id: None,
            port: Some(80),
        };
        assert_eq!(
            factory().to_api(&bind).unwrap(),
            json!({"frontend_id": 7, "port": 80})
        );
    }

    #[test]
    fn test_context_fills_missing_attributes_only() {
        let mut context = Attributes::new();
        context.insert("frontendId".to_string(), json!(99));
        let factory = factory().with_context(context);

        let stamped = factory.load(&json!({"id": 5})).unwrap();
        assert_eq!(stamped.frontend_id, Some(99));

        let kept = factory.load(&json!({"id": 5, "frontend_id": 3})).unwrap();
        assert_eq!(kept.frontend_id, Some(3));
    }

    #[test]
    fn test_transform_runs_around_generic_map() {
        let factory = EntityFactory::<Value>::new(FieldMap::empty()).with_transform(Arc::new(Upper));

        let friendly = factory.api_to_friendly(
            json!({"shout": "hey", "other": 1})
                .as_object()
                .cloned()
                .unwrap(),
        );
        assert_eq!(Value::Object(friendly.clone()), json!({"loud": "HEY", "other": 1}));

        let wire = factory.friendly_to_api(friendly);
        assert_eq!(Value::Object(wire), json!({"shout": "hey", "other": 1}));
    }

    #[test]
    fn test_filters_to_api_flattens_values() {
        let mut filters = Attributes::new();
        filters.insert("frontendId".to_string(), json!(12));
        filters.insert("port".to_string(), json!([80, 443]));
        filters.insert("enabled".to_string(), json!(true));
        filters.insert("skip".to_string(), Value::Null);

        let mut pairs = factory().filters_to_api(&filters);
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                ("enabled".to_string(), "true".to_string()),
                ("frontend_id".to_string(), "12".to_string()),
                ("port".to_string(), "80,443".to_string()),
            ]
        );
    }

    #[test]
    fn test_serializer_wraps_load() {
        let serializer = factory().serializer();
        let bind = serializer(&json!({"id": 8})).unwrap();
        assert_eq!(bind.id, Some(8));
    }
}
