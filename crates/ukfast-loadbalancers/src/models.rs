//! Load balancer entities and their wire field maps.
//!
//! Entities are declared in their friendly form. Every field is optional:
//! the same struct serves as a create payload, a partial update, and a
//! decoded response.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use ukfast_core::id::{
    AccessRuleId, BackendId, BindId, CertId, ConfigId, ListenerId, SslId, VipId,
};

/// Wire to friendly names for listeners.
pub const LISTENER_FIELDS: &[(&str, &str)] = &[
    ("vips_id", "vipsId"),
    ("config_id", "configId"),
    ("hsts_enabled", "hstsEnabled"),
    ("hsts_maxage", "hstsMaxAge"),
    ("redirect_https", "redirectHttps"),
    ("default_backend_id", "defaultBackendId"),
];

/// Wire to friendly names for binds.
pub const BIND_FIELDS: &[(&str, &str)] = &[("frontend_id", "frontendId"), ("vips_id", "vipsId")];

/// Wire to friendly names for certificates.
pub const CERT_FIELDS: &[(&str, &str)] = &[
    ("frontend_id", "frontendId"),
    ("certs_name", "name"),
    ("certs_pem", "pem"),
];

/// Wire to friendly names for access rules.
pub const ACCESS_RULE_FIELDS: &[(&str, &str)] =
    &[("frontend_id", "frontendId"), ("whitelist", "whitelist")];

/// Wire to friendly names for SSL bindings. `allowTls` is handled by
/// [`crate::ssl::AllowTlsTransform`].
pub const SSL_FIELDS: &[(&str, &str)] = &[
    ("binds_id", "bindsId"),
    ("disable_http2", "disableHttp2"),
    ("http2_only", "onlyHttp2"),
    ("custom_ciphers", "customCiphers"),
    ("custom_tls13_ciphers", "customTls13Ciphers"),
];

/// Friendly key linking nested resources to their listener.
pub const PARENT_KEY: &str = "frontendId";

/// A listener (frontend).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listener {
    /// Listener id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ListenerId>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Virtual IP group.
    #[serde(rename = "vipsId", default, skip_serializing_if = "Option::is_none")]
    pub vips_id: Option<VipId>,
    /// Owning configuration.
    #[serde(rename = "configId", default, skip_serializing_if = "Option::is_none")]
    pub config_id: Option<ConfigId>,
    /// Whether HSTS is sent.
    #[serde(rename = "hstsEnabled", default, skip_serializing_if = "Option::is_none")]
    pub hsts_enabled: Option<bool>,
    /// HSTS max age in seconds.
    #[serde(rename = "hstsMaxAge", default, skip_serializing_if = "Option::is_none")]
    pub hsts_max_age: Option<u64>,
    /// Whether plain HTTP is redirected to HTTPS.
    #[serde(rename = "redirectHttps", default, skip_serializing_if = "Option::is_none")]
    pub redirect_https: Option<bool>,
    /// Backend used when no rule matches.
    #[serde(rename = "defaultBackendId", default, skip_serializing_if = "Option::is_none")]
    pub default_backend_id: Option<BackendId>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A listener's bind to a virtual IP and port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bind {
    /// Bind id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<BindId>,
    /// Owning listener.
    #[serde(rename = "frontendId", default, skip_serializing_if = "Option::is_none")]
    pub frontend_id: Option<ListenerId>,
    /// Virtual IP group.
    #[serde(rename = "vipsId", default, skip_serializing_if = "Option::is_none")]
    pub vips_id: Option<VipId>,
    /// Port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A certificate attached to a listener.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cert {
    /// Certificate id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CertId>,
    /// Owning listener.
    #[serde(rename = "frontendId", default, skip_serializing_if = "Option::is_none")]
    pub frontend_id: Option<ListenerId>,
    /// Certificate name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// PEM bundle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pem: Option<String>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for Cert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cert")
            .field("id", &self.id)
            .field("frontend_id", &self.frontend_id)
            .field("name", &self.name)
            .field("pem", &self.pem.as_ref().map(|_| "[PEM]"))
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// An IP allow/deny rule on a listener.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRule {
    /// Rule id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<AccessRuleId>,
    /// Owning listener.
    #[serde(rename = "frontendId", default, skip_serializing_if = "Option::is_none")]
    pub frontend_id: Option<ListenerId>,
    /// Address or CIDR the rule matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    /// `true` allows the address, `false` denies it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whitelist: Option<bool>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Legacy TLS protocol versions that can be switched on per SSL binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TlsVersion {
    /// TLS 1.0
    #[serde(rename = "1.0")]
    V1_0,
    /// TLS 1.1
    #[serde(rename = "1.1")]
    V1_1,
}

impl TlsVersion {
    /// Token used in the friendly `allowTls` set.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::V1_0 => "1.0",
            Self::V1_1 => "1.1",
        }
    }

    /// Wire flag enabling this version.
    #[must_use]
    pub const fn wire_flag(self) -> &'static str {
        match self {
            Self::V1_0 => "allow_tlsv1",
            Self::V1_1 => "allow_tlsv11",
        }
    }

    /// Every version, in wire order.
    pub const ALL: [Self; 2] = [Self::V1_0, Self::V1_1];
}

impl fmt::Display for TlsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// TLS settings for a bind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ssl {
    /// SSL id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<SslId>,
    /// Bind the settings apply to.
    #[serde(rename = "bindsId", default, skip_serializing_if = "Option::is_none")]
    pub binds_id: Option<BindId>,
    /// Whether TLS is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Legacy versions allowed in addition to the defaults. `None` when the
    /// server did not report them.
    #[serde(rename = "allowTls", default, skip_serializing_if = "Option::is_none")]
    pub allow_tls: Option<BTreeSet<TlsVersion>>,
    /// Whether HTTP/2 is disabled.
    #[serde(rename = "disableHttp2", default, skip_serializing_if = "Option::is_none")]
    pub disable_http2: Option<bool>,
    /// Whether only HTTP/2 is accepted.
    #[serde(rename = "onlyHttp2", default, skip_serializing_if = "Option::is_none")]
    pub only_http2: Option<bool>,
    /// Cipher list for TLS 1.2 and below.
    #[serde(rename = "customCiphers", default, skip_serializing_if = "Option::is_none")]
    pub custom_ciphers: Option<String>,
    /// Cipher suites for TLS 1.3.
    #[serde(rename = "customTls13Ciphers", default, skip_serializing_if = "Option::is_none")]
    pub custom_tls13_ciphers: Option<String>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Ssl {
    /// Whether `version` is explicitly allowed.
    #[must_use]
    pub fn allows(&self, version: TlsVersion) -> bool {
        self.allow_tls
            .as_ref()
            .is_some_and(|versions| versions.contains(&version))
    }
}
