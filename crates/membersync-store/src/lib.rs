//! Membersync Store - Local state persistence
//!
//! SQLite-based storage for:
//! - The tracking table (change-detection cache, one row per member code)
//! - The run/step/error audit trail
//!
//! ## Architecture
//!
//! This crate implements the `ITrackingStore` and `IRunStore` ports from
//! `membersync-core` using SQLite as the storage backend. It is a driven
//! (secondary) adapter in the hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - Connection pool with migration support
//! - [`SqliteTrackingStore`] - `ITrackingStore` + `IRunStore` implementation
//! - [`StoreError`] - Error types for store operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use membersync_store::{DatabasePool, SqliteTrackingStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::new(Path::new("/var/lib/membersync/state.db")).await?;
//! let store = SqliteTrackingStore::new(pool.pool().clone());
//! // Use store as ITrackingStore / IRunStore...
//! # Ok(())
//! # }
//! ```

pub mod migrations;
pub mod pool;
pub mod repository;

pub use pool::DatabasePool;
pub use repository::SqliteTrackingStore;

/// Errors that can occur during store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Serialization or deserialization of domain types failed
    #[error("Serialization error: {0}")]
    SerializationError(String),
}
