//! Membersync Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `MemberRecord`, `SyncRun`, `SyncStep`, `SyncError`
//! - **Canonical hashing** - order-independent serialization + SHA-256 content hashes
//! - **Port definitions** - Traits for adapters: `ISourceProvider`, `ITrackingStore`,
//!   `IRemoteSystem`, `IRunStore`
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no external dependencies.
//! Ports define trait interfaces that adapter crates implement.

pub mod config;
pub mod domain;
pub mod ports;
