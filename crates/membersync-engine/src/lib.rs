//! Membersync Engine - Incremental reconciliation
//!
//! The [`ReconcileDriver`] orchestrates one reconciliation run between the
//! authoritative source and a downstream system:
//!
//! 1. **Refresh**: upsert the full source snapshot into the tracking table
//!    (content hashes recomputed, `last_seen_at` bumped)
//! 2. **Push**: select records whose hash changed (or all, when forced) and
//!    create/update each remote entity, strictly sequentially
//! 3. **Sweep**: delete orphans (tracked records absent from the snapshot),
//!    remotely first, then locally
//!
//! One bad record never aborts a run; per-record failures accumulate into
//! the run summary and audit trail.

pub mod driver;

pub use driver::{ReconcileDriver, ReconcileOptions};
