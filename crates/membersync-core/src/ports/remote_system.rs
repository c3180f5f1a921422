//! Remote system port (driven/secondary port)
//!
//! CRUD plus secondary-key lookup against the downstream system. Unlike the
//! storage ports this one returns typed [`RemoteError`]s: the reconciliation
//! driver branches on status classes (404 relink, 409/already-exists
//! fallback), so the classification must be explicit rather than recovered
//! from error strings.
//!
//! Retry on transient server errors is the adapter's responsibility; by the
//! time an error reaches the driver, retries are exhausted.

use serde_json::Value;

use crate::domain::{RemoteError, RemoteId};

/// Port trait for the downstream member API.
#[async_trait::async_trait]
pub trait IRemoteSystem: Send + Sync {
    /// Creates a new entity and returns its downstream identifier
    async fn create(&self, payload: &Value) -> Result<RemoteId, RemoteError>;

    /// Updates an existing entity by downstream identifier
    async fn update(&self, id: &RemoteId, payload: &Value) -> Result<(), RemoteError>;

    /// Deletes an entity by downstream identifier
    async fn delete(&self, id: &RemoteId) -> Result<(), RemoteError>;

    /// Looks up an entity by secondary key (e.g. contact email).
    ///
    /// Returns `None` when no entity matches; used to reconcile create
    /// attempts that collide with a pre-existing remote entity that is
    /// not yet linked locally.
    async fn find_by_secondary_key(&self, key: &str) -> Result<Option<RemoteId>, RemoteError>;
}
