//! # ukfast-core
//!
//! Shared engine for the UKFast API clients.
//!
//! This crate turns raw JSON responses into typed entities and back. It knows
//! nothing about specific resources; each resource client supplies a
//! collection path, a field map, and an entity type.
//!
//! ## Modules
//!
//! - [`error`] - Error taxonomy shared by every client
//! - [`config`] - Connection settings
//! - [`client`] - Transport abstraction, default HTTP transport, service client
//! - [`query`] - Query string builder
//! - [`id`] - Strongly-typed identifiers
//! - [`mapper`] - Wire/friendly field name translation
//! - [`entity`] - Typed entity construction
//! - [`page`] - Paginated listings
//! - [`response`] - Self-aware single-entity responses and downloads
//! - [`resource`] - Generic collection operations
//! - [`url_encoding`] - Path segment encoding for caller-supplied ids
//!
//! ## Raw bodies
//!
//! Every load balancer and PHaaS operation exchanges JSON.
//! [`ServiceClient::download`] and [`Download`] are the extension point for
//! resource families that serve attachments or other non-JSON bodies. A
//! client for such a family calls `download` with the item path and hands
//! the [`Download`] to its caller.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod entity;
pub mod error;
pub mod id;
pub mod mapper;
pub mod page;
pub mod query;
pub mod resource;
pub mod response;
pub mod url_encoding;

// Re-export commonly used types
pub use client::{
    ClientConfig, HttpTransport, ServiceClient, ServiceClientBuilder, Transport, TransportRequest,
    TransportResponse,
};
pub use config::ApiConfig;
pub use entity::{EntityFactory, Serializer};
pub use error::{Error, ErrorKind, Result};
pub use mapper::{Attributes, FieldMap, FieldTransform};
pub use page::{ListParams, Page, PageMeta, PageRequest, PaginationEngine};
pub use resource::CollectionResource;
pub use response::{require_id, Download, EntityOwner, SelfResponse};
