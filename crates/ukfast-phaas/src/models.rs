//! PHaaS models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A domain registered for phishing simulation. Wire and friendly names are
/// the same.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    /// Domain id. Numeric ids are kept in their decimal form.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "opt_string_from_number_or_string"
    )]
    pub id: Option<String>,
    /// Domain name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Address the verification email is sent to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_email: Option<String>,
    /// Whether ownership has been verified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn opt_string_from_number_or_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a string or number id, found {other}"
        ))),
    }
}

/// Body of the add-domain request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct NewDomain<'a> {
    pub domain: &'a str,
    pub verification_email: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn domain_accepts_string_and_numeric_ids() {
        let text: Domain = serde_json::from_value(json!({"id": "c0ffee", "verified": false})).unwrap();
        assert_eq!(text.id.as_deref(), Some("c0ffee"));
        assert_eq!(text.verified, Some(false));

        let numeric: Domain = serde_json::from_value(json!({"id": 42})).unwrap();
        assert_eq!(numeric.id.as_deref(), Some("42"));

        let missing: Domain = serde_json::from_value(json!({"domain": "example.com"})).unwrap();
        assert_eq!(missing.id, None);

        assert!(serde_json::from_value::<Domain>(json!({"id": [1]})).is_err());
    }

    #[test]
    fn new_domain_body_shape() {
        let body = serde_json::to_value(NewDomain {
            domain: "example.com",
            verification_email: "admin@example.com",
        })
        .unwrap();
        assert_eq!(
            body,
            json!({"domain": "example.com", "verification_email": "admin@example.com"})
        );
    }
}
