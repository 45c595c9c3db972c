//! Client and entities for the UKFast load balancer API.
//!
//! Listeners (frontends) own binds, certificates, access rules and SSL
//! bindings. Entities use friendly field names; translation to and from the
//! wire format happens inside the clients.

#![deny(missing_docs)]

pub mod client;
pub mod listener;
pub mod models;
pub mod ssl;

pub use client::{LoadBalancerClient, LoadBalancerClientBuilder};
pub use listener::ListenerClient;
pub use models::{AccessRule, Bind, Cert, Listener, Ssl, TlsVersion};
pub use ssl::{AllowTlsTransform, SslClient};

/// Convenient result alias that reuses the shared UKFast error type.
pub type Result<T> = ukfast_core::Result<T>;
