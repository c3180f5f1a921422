//! Port definitions (hexagonal architecture)
//!
//! Traits implemented by adapter crates:
//! - `ISourceProvider` - yields the full current source snapshot
//! - `ITrackingStore` - the durable change-detection cache
//! - `IRemoteSystem` - create/update/delete/lookup against a downstream system
//! - `IRunStore` - persistence for run/step/error audit records

pub mod remote_system;
pub mod run_store;
pub mod source_provider;
pub mod tracking_store;

pub use remote_system::IRemoteSystem;
pub use run_store::IRunStore;
pub use source_provider::ISourceProvider;
pub use tracking_store::ITrackingStore;
