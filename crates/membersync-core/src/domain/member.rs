//! MemberRecord domain entity
//!
//! A `MemberRecord` is the locally tracked reconciliation state for one
//! member in one downstream system: the latest observed payload, its
//! content hash, and the hash/identifier from the last successful push.
//!
//! The record's lifecycle: created on first observation from the source,
//! refreshed in place on every subsequent observation, and deleted once a
//! reconciliation run determines the member code is absent from the current
//! full source snapshot (after best-effort remote deletion).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::canonical::hash_value;
use super::newtypes::{ContentHash, MemberCode, RemoteId};

/// One element of a source snapshot, as yielded by a source provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// The source system's stable identifier for this member
    pub member_code: MemberCode,
    /// Human-meaningful secondary identifier (e.g. contact email),
    /// used to find a pre-existing remote entity before creating one
    pub secondary_key: String,
    /// The member's current field values, opaque to the engine
    pub payload: Value,
}

impl SourceRecord {
    /// Content hash of this record's payload
    pub fn content_hash(&self) -> ContentHash {
        hash_value(&self.payload)
    }
}

/// Locally tracked reconciliation state for one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    /// Unique reconciliation key
    member_code: MemberCode,
    /// Secondary identifier for de-duplication against unlinked remote entities
    secondary_key: String,
    /// Latest observed payload
    payload: Value,
    /// SHA-256 over the canonical serialization of `payload`
    content_hash: ContentHash,
    /// Downstream identifier; set iff at least one push has succeeded
    /// since the record was last created remotely
    remote_id: Option<RemoteId>,
    /// `content_hash` at the time of the last successful push
    last_synced_hash: Option<ContentHash>,
    /// When this member was last observed in a source snapshot
    last_seen_at: DateTime<Utc>,
    /// When this member was last successfully pushed
    last_synced_at: Option<DateTime<Utc>>,
    /// When this record was first created locally
    created_at: DateTime<Utc>,
}

impl MemberRecord {
    /// Creates a fresh, never-synced record from a source observation
    pub fn from_source(record: &SourceRecord) -> Self {
        let now = Utc::now();
        Self {
            member_code: record.member_code.clone(),
            secondary_key: record.secondary_key.clone(),
            content_hash: record.content_hash(),
            payload: record.payload.clone(),
            remote_id: None,
            last_synced_hash: None,
            last_seen_at: now,
            last_synced_at: None,
            created_at: now,
        }
    }

    /// Reconstructs a record from persisted state
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        member_code: MemberCode,
        secondary_key: String,
        payload: Value,
        content_hash: ContentHash,
        remote_id: Option<RemoteId>,
        last_synced_hash: Option<ContentHash>,
        last_seen_at: DateTime<Utc>,
        last_synced_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            member_code,
            secondary_key,
            payload,
            content_hash,
            remote_id,
            last_synced_hash,
            last_seen_at,
            last_synced_at,
            created_at,
        }
    }

    // --- Getters ---

    /// Returns the reconciliation key
    pub fn member_code(&self) -> &MemberCode {
        &self.member_code
    }

    /// Returns the secondary identifier
    pub fn secondary_key(&self) -> &str {
        &self.secondary_key
    }

    /// Returns the latest observed payload
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Returns the content hash of the latest observed payload
    pub fn content_hash(&self) -> &ContentHash {
        &self.content_hash
    }

    /// Returns the downstream identifier, if this record has been pushed
    pub fn remote_id(&self) -> Option<&RemoteId> {
        self.remote_id.as_ref()
    }

    /// Returns the hash recorded at the last successful push
    pub fn last_synced_hash(&self) -> Option<&ContentHash> {
        self.last_synced_hash.as_ref()
    }

    /// Returns when this member was last observed in a snapshot
    pub fn last_seen_at(&self) -> DateTime<Utc> {
        self.last_seen_at
    }

    /// Returns when this member was last successfully pushed
    pub fn last_synced_at(&self) -> Option<DateTime<Utc>> {
        self.last_synced_at
    }

    /// Returns when this record was created locally
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// A record needs sync iff it has never been pushed, or its payload
    /// changed since the last successful push
    pub fn needs_sync(&self) -> bool {
        match &self.last_synced_hash {
            None => true,
            Some(synced) => synced != &self.content_hash,
        }
    }

    // --- Mutations (sync state is owned by successful pushes only) ---

    /// Records a successful push to the downstream system
    pub fn mark_synced(&mut self, synced_hash: ContentHash, remote_id: RemoteId) {
        self.last_synced_hash = Some(synced_hash);
        self.remote_id = Some(remote_id);
        self.last_synced_at = Some(Utc::now());
    }

    /// Clears the remote linkage after an out-of-band remote deletion,
    /// so the next push re-creates the entity
    pub fn clear_remote_link(&mut self) {
        self.remote_id = None;
        self.last_synced_hash = None;
    }
}
