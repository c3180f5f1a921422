//! Membersync Remote - Downstream system client
//!
//! HTTP adapter for the downstream member API:
//! - [`RemoteClient`] - raw request plumbing with bounded exponential-backoff
//!   retry on server errors
//! - [`HttpRemoteSystem`] - the `IRemoteSystem` port implementation
//!   (create/update/delete/lookup-by-secondary-key)
//! - [`envelope`] - tolerant list-envelope parsing with an explicit
//!   unrecognized-shape failure path
//!
//! Authentication is a bearer API key supplied out-of-band; HTTP/TLS details
//! beyond that are reqwest's concern.

pub mod client;
pub mod envelope;
pub mod system;

pub use client::{RemoteClient, RemoteClientConfig};
pub use system::HttpRemoteSystem;
