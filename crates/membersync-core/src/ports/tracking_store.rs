//! Tracking store port (driven/secondary port)
//!
//! The durable change-detection cache: one row per member code, recording
//! the latest observed payload, its content hash, and the hash/identifier
//! from the last successful push.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific
//!   and don't need domain-level classification; they propagate loudly.
//!   Retry/backoff belongs to the business-logic layer, never the store.
//! - `upsert_many` refreshes observation state only. Sync state
//!   (`remote_id`, `last_synced_hash`) is owned by successful pushes and
//!   is touched exclusively through `mark_synced` / `clear_remote_link`.

use crate::domain::{ContentHash, MemberCode, MemberRecord, RemoteId, SourceRecord};

/// Port trait for the durable tracking table.
#[async_trait::async_trait]
pub trait ITrackingStore: Send + Sync {
    /// Inserts or refreshes one row per source record, keyed by member code.
    ///
    /// Computes each record's content hash from its payload. On conflict,
    /// overwrites payload, hash, secondary key and `last_seen_at` but never
    /// `remote_id` or `last_synced_hash`. The batch is atomic: either every
    /// record is applied or none is.
    async fn upsert_many(&self, records: &[SourceRecord]) -> anyhow::Result<()>;

    /// Returns records needing a push: all of them when `force` is true,
    /// otherwise those never synced or whose hash changed since the last
    /// successful push. Ordered by member code for reproducible runs.
    async fn get_needing_sync(&self, force: bool) -> anyhow::Result<Vec<MemberRecord>>;

    /// Records a successful push: sets `last_synced_at` to now,
    /// `last_synced_hash` and `remote_id` to the given values.
    async fn mark_synced(
        &self,
        code: &MemberCode,
        synced_hash: &ContentHash,
        remote_id: &RemoteId,
    ) -> anyhow::Result<()>;

    /// Resets `remote_id` and `last_synced_hash` after the remote entity
    /// was deleted out-of-band, so the next push re-creates it.
    async fn clear_remote_link(&self, code: &MemberCode) -> anyhow::Result<()>;

    /// Returns every tracked record whose member code is absent from
    /// `current_codes`. An empty `current_codes` returns all records;
    /// callers must guard against an erroneous empty snapshot before
    /// acting on the result.
    async fn get_missing_from(
        &self,
        current_codes: &[MemberCode],
    ) -> anyhow::Result<Vec<MemberRecord>>;

    /// Retrieves a single record by member code
    async fn get(&self, code: &MemberCode) -> anyhow::Result<Option<MemberRecord>>;

    /// Removes a tracked record entirely. Callers confirm first that the
    /// corresponding remote entity is gone or never existed.
    async fn delete(&self, code: &MemberCode) -> anyhow::Result<()>;

    /// Number of tracked records
    async fn count(&self) -> anyhow::Result<u64>;
}
