//! Strongly-typed identifiers for UKFast resources.
//!
//! The load balancer API identifies everything with plain integers. Wrapping
//! them keeps a bind id from being passed where a listener id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Macro to generate strongly-typed integer identifier types.
macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $doc:expr) => {
        $(#[$meta])*
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Creates a new identifier from its raw value.
            #[must_use]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the raw value.
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }

            /// Parses an identifier from a string.
            ///
            /// # Errors
            ///
            /// Returns [`Error::Validation`] if the string is not a non-negative integer.
            pub fn parse_str(input: &str) -> Result<Self> {
                input
                    .trim()
                    .parse::<u64>()
                    .map(Self)
                    .map_err(|_| Error::Validation(format!(
                        "Invalid {}: `{input}`",
                        stringify!($name)
                    )))
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Self::parse_str(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(ListenerId, "Load balancer listener (frontend) ID");
id_type!(BindId, "Listener bind ID");
id_type!(CertId, "Listener certificate ID");
id_type!(AccessRuleId, "Listener access rule ID");
id_type!(SslId, "SSL binding ID");
id_type!(VipId, "Virtual IP ID");
id_type!(ConfigId, "Load balancer configuration ID");
id_type!(BackendId, "Backend (target group) ID");
