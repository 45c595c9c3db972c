//! Client for the UKFast PHaaS (phishing as a service) API.
//!
//! Domains must be registered and verified before simulations can target
//! them. [`DomainClient`] covers listing, registration, resending the
//! verification email and submitting the verification hash.
//!
//! ```no_run
//! use ukfast_core::ListParams;
//! use ukfast_phaas::DomainClient;
//!
//! # async fn run() -> ukfast_phaas::Result<()> {
//! let client = DomainClient::new("my-api-key")?;
//! let domain = client.add_domain("example.com", "admin@example.com").await?;
//! let page = client.get_all(&ListParams::default()).await?;
//! # let _ = (domain, page);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod models;

pub use client::{DomainClient, PhaasClientBuilder};
pub use models::Domain;

/// Result type for PHaaS operations.
pub type Result<T> = ukfast_core::Result<T>;
