//! Translation between wire field names and friendly field names.
//!
//! The API speaks `snake_case` keys such as `frontend_id`; entities use the
//! friendly `camelCase` form (`frontendId`). A [`FieldMap`] lists the keys
//! that differ. Keys absent from the map pass through untouched in both
//! directions, and neither direction ever fails on missing or extra keys.

use crate::{Error, Result};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;

/// A flat JSON object keyed by field name.
pub type Attributes = Map<String, Value>;

/// Ordered, immutable wire-key to friendly-key translation table.
///
/// Cloning is cheap; the pairs are shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap {
    pairs: Arc<[(String, String)]>,
}

impl FieldMap {
    /// Build a map from `(wire, friendly)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a wire key or a friendly key appears twice.
    pub fn new(pairs: &[(&str, &str)]) -> Result<Self> {
        let mut wire_keys = HashSet::new();
        let mut friendly_keys = HashSet::new();
        for (wire, friendly) in pairs {
            if !wire_keys.insert(*wire) {
                return Err(Error::Config(format!("duplicate wire key `{wire}` in field map")));
            }
            if !friendly_keys.insert(*friendly) {
                return Err(Error::Config(format!(
                    "duplicate friendly key `{friendly}` in field map"
                )));
            }
        }

        Ok(Self {
            pairs: pairs
                .iter()
                .map(|(wire, friendly)| ((*wire).to_string(), (*friendly).to_string()))
                .collect(),
        })
    }

    /// A map that translates nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            pairs: Arc::from(Vec::new()),
        }
    }

    /// Friendly key for a wire key, if mapped.
    #[must_use]
    pub fn friendly_for(&self, wire: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(w, _)| w == wire)
            .map(|(_, f)| f.as_str())
    }

    /// Wire key for a friendly key, if mapped.
    #[must_use]
    pub fn wire_for(&self, friendly: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(_, f)| f == friendly)
            .map(|(w, _)| w.as_str())
    }

    /// Iterate over `(wire, friendly)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(w, f)| (w.as_str(), f.as_str()))
    }

    /// Number of mapped keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// True when nothing is mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl Default for FieldMap {
    fn default() -> Self {
        Self::empty()
    }
}

/// Rename wire keys to their friendly form. Unmapped keys are kept as-is.
#[must_use]
pub fn api_to_friendly(wire: Attributes, map: &FieldMap) -> Attributes {
    wire.into_iter()
        .map(|(key, value)| match map.friendly_for(&key) {
            Some(friendly) => (friendly.to_string(), value),
            None => (key, value),
        })
        .collect()
}

/// Rename friendly keys to their wire form. Unmapped keys are kept as-is.
#[must_use]
pub fn friendly_to_api(friendly: Attributes, map: &FieldMap) -> Attributes {
    friendly
        .into_iter()
        .map(|(key, value)| match map.wire_for(&key) {
            Some(wire) => (wire.to_string(), value),
            None => (key, value),
        })
        .collect()
}

/// Per-resource hook for attributes that do not map one key to one key.
///
/// `from_api` runs on the wire object before the generic rename and
/// `to_api` runs on the friendly object before the reverse rename, so a
/// transform only ever deals with keys the [`FieldMap`] leaves alone.
pub trait FieldTransform: Send + Sync {
    /// Fold wire attributes into their friendly composite form.
    fn from_api(&self, wire: &mut Attributes);

    /// Expand friendly composites back into wire attributes. The composite
    /// key must be removed.
    fn to_api(&self, friendly: &mut Attributes);
}
