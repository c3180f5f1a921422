//! SQLite implementation of ITrackingStore and IRunStore
//!
//! This module provides the concrete SQLite-based implementation of the
//! tracking-store and run-store ports defined in membersync-core. It
//! handles all domain type serialization/deserialization and SQL query
//! construction.
//!
//! ## Type Mapping
//!
//! | Domain Type    | SQL Type | Strategy                                   |
//! |----------------|----------|--------------------------------------------|
//! | MemberCode     | TEXT     | String via `.as_str()` / `MemberCode::new()` |
//! | RemoteId       | TEXT     | String via `.as_str()` / `RemoteId::new()` |
//! | ContentHash    | TEXT     | Hex string via `.as_str()` / `ContentHash::new()` |
//! | RunId          | TEXT     | UUID string via `.to_string()` / `FromStr` |
//! | DateTime<Utc>  | TEXT     | ISO 8601 via `to_rfc3339()` / `DateTime::parse_from_rfc3339()` |
//! | payload        | TEXT     | serde_json serialization                   |

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use membersync_core::domain::{
    canonical, ContentHash, MemberCode, MemberRecord, RemoteId, RunId, RunState, SourceRecord,
    StepCounts, StepState, SyncErrorEntry, SyncRun, SyncStep,
};
use membersync_core::ports::{IRunStore, ITrackingStore};

use crate::StoreError;

/// SQLite-based implementation of the tracking and run-store ports
///
/// Provides persistent storage for tracked member records and the
/// run/step/error audit trail. All operations go through a connection pool.
pub struct SqliteTrackingStore {
    pool: SqlitePool,
}

impl SqliteTrackingStore {
    /// Creates a new store instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Helper functions for type conversion
// ============================================================================

/// Serialize a RunState to a string for storage
fn run_state_to_string(state: &RunState) -> String {
    match state {
        RunState::Running => "running".to_string(),
        RunState::Success => "success".to_string(),
        RunState::Partial => "partial".to_string(),
        RunState::Failure => "failure".to_string(),
    }
}

/// Deserialize a RunState from its stored string representation
fn run_state_from_string(s: &str) -> Result<RunState, StoreError> {
    match s {
        "running" => Ok(RunState::Running),
        "success" => Ok(RunState::Success),
        "partial" => Ok(RunState::Partial),
        "failure" => Ok(RunState::Failure),
        other => Err(StoreError::SerializationError(format!(
            "Unknown run state: {}",
            other
        ))),
    }
}

/// Serialize a StepState to a string for storage
fn step_state_to_string(state: &StepState) -> String {
    match state {
        StepState::Pending => "pending".to_string(),
        StepState::Success => "success".to_string(),
        StepState::Failure => "failure".to_string(),
    }
}

/// Deserialize a StepState from its stored string representation
fn step_state_from_string(s: &str) -> Result<StepState, StoreError> {
    match s {
        "pending" => Ok(StepState::Pending),
        "success" => Ok(StepState::Success),
        "failure" => Ok(StepState::Failure),
        other => Err(StoreError::SerializationError(format!(
            "Unknown step state: {}",
            other
        ))),
    }
}

/// Parse a DateTime<Utc> from an ISO 8601 string
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Try parsing without timezone (SQLite default format)
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
                .map(|ndt| ndt.and_utc())
        })
        .map_err(|e| {
            StoreError::SerializationError(format!("Failed to parse datetime '{}': {}", s, e))
        })
}

/// Parse an optional DateTime<Utc> from an optional string
fn parse_optional_datetime(s: Option<String>) -> Result<Option<DateTime<Utc>>, StoreError> {
    match s {
        Some(ref val) if !val.is_empty() => parse_datetime(val).map(Some),
        _ => Ok(None),
    }
}

// ============================================================================
// Row mapping functions
// ============================================================================

/// Reconstruct a MemberRecord from a database row
fn member_record_from_row(row: &SqliteRow) -> Result<MemberRecord, StoreError> {
    let code_str: String = row.get("member_code");
    let secondary_key: String = row.get("secondary_key");
    let payload_str: String = row.get("payload");
    let content_hash_str: String = row.get("content_hash");
    let remote_id_str: Option<String> = row.get("remote_id");
    let last_synced_hash_str: Option<String> = row.get("last_synced_hash");
    let last_seen_at_str: String = row.get("last_seen_at");
    let last_synced_at_str: Option<String> = row.get("last_synced_at");
    let created_at_str: String = row.get("created_at");

    let member_code = MemberCode::new(code_str.clone()).map_err(|e| {
        StoreError::SerializationError(format!("Invalid member code '{}': {}", code_str, e))
    })?;

    let payload: serde_json::Value = serde_json::from_str(&payload_str)
        .map_err(|e| StoreError::SerializationError(format!("Invalid payload JSON: {}", e)))?;

    let content_hash = canonical::parse_hash(&content_hash_str).map_err(|e| {
        StoreError::SerializationError(format!("Invalid content hash '{}': {}", content_hash_str, e))
    })?;

    let remote_id = match remote_id_str {
        Some(ref s) if !s.is_empty() => Some(RemoteId::new(s.clone()).map_err(|e| {
            StoreError::SerializationError(format!("Invalid remote id '{}': {}", s, e))
        })?),
        _ => None,
    };

    let last_synced_hash = match last_synced_hash_str {
        Some(ref s) if !s.is_empty() => Some(canonical::parse_hash(s).map_err(|e| {
            StoreError::SerializationError(format!("Invalid synced hash '{}': {}", s, e))
        })?),
        _ => None,
    };

    Ok(MemberRecord::from_parts(
        member_code,
        secondary_key,
        payload,
        content_hash,
        remote_id,
        last_synced_hash,
        parse_datetime(&last_seen_at_str)?,
        parse_optional_datetime(last_synced_at_str)?,
        parse_datetime(&created_at_str)?,
    ))
}

/// Reconstruct a SyncRun from a database row
fn run_from_row(row: &SqliteRow) -> Result<SyncRun, StoreError> {
    let id_str: String = row.get("id");
    let started_at_str: String = row.get("started_at");
    let finished_at_str: Option<String> = row.get("finished_at");
    let state_str: String = row.get("state");

    let id = RunId::from_str(&id_str).map_err(|e| {
        StoreError::SerializationError(format!("Invalid RunId '{}': {}", id_str, e))
    })?;

    Ok(SyncRun::from_parts(
        id,
        parse_datetime(&started_at_str)?,
        parse_optional_datetime(finished_at_str)?,
        run_state_from_string(&state_str)?,
    ))
}

/// Reconstruct a SyncStep from a database row
fn step_from_row(row: &SqliteRow) -> Result<SyncStep, StoreError> {
    let id: i64 = row.get("id");
    let run_id_str: String = row.get("run_id");
    let name: String = row.get("name");
    let state_str: String = row.get("state");
    let created: i64 = row.get("created");
    let updated: i64 = row.get("updated");
    let skipped: i64 = row.get("skipped");
    let deleted: i64 = row.get("deleted");
    let failed: i64 = row.get("failed");
    let started_at_str: String = row.get("started_at");
    let finished_at_str: Option<String> = row.get("finished_at");

    let run_id = RunId::from_str(&run_id_str).map_err(|e| {
        StoreError::SerializationError(format!("Invalid RunId '{}': {}", run_id_str, e))
    })?;

    Ok(SyncStep {
        id,
        run_id,
        name,
        state: step_state_from_string(&state_str)?,
        counts: StepCounts {
            created: created as u64,
            updated: updated as u64,
            skipped: skipped as u64,
            deleted: deleted as u64,
            failed: failed as u64,
        },
        started_at: parse_datetime(&started_at_str)?,
        finished_at: parse_optional_datetime(finished_at_str)?,
    })
}

/// Reconstruct a SyncErrorEntry from a database row
fn error_from_row(row: &SqliteRow) -> Result<SyncErrorEntry, StoreError> {
    let run_id_str: String = row.get("run_id");
    let step_id: Option<i64> = row.get("step_id");
    let member_code_str: Option<String> = row.get("member_code");
    let message: String = row.get("message");
    let occurred_at_str: String = row.get("occurred_at");

    let run_id = RunId::from_str(&run_id_str).map_err(|e| {
        StoreError::SerializationError(format!("Invalid RunId '{}': {}", run_id_str, e))
    })?;

    let member_code = match member_code_str {
        Some(ref s) if !s.is_empty() => Some(MemberCode::new(s.clone()).map_err(|e| {
            StoreError::SerializationError(format!("Invalid member code '{}': {}", s, e))
        })?),
        _ => None,
    };

    Ok(SyncErrorEntry {
        run_id,
        step_id,
        member_code,
        message,
        occurred_at: parse_datetime(&occurred_at_str)?,
    })
}

// ============================================================================
// ITrackingStore implementation
// ============================================================================

#[async_trait::async_trait]
impl ITrackingStore for SqliteTrackingStore {
    async fn upsert_many(&self, records: &[SourceRecord]) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();

        // One transaction for the whole batch: a failure mid-write must not
        // leave a partial snapshot behind.
        let mut tx = self.pool.begin().await?;

        for record in records {
            let payload = serde_json::to_string(&record.payload)
                .map_err(|e| anyhow::anyhow!("Failed to serialize payload: {}", e))?;
            let content_hash = record.content_hash();

            sqlx::query(
                "INSERT INTO tracked_members \
                 (member_code, secondary_key, payload, content_hash, \
                  remote_id, last_synced_hash, last_seen_at, last_synced_at, created_at) \
                 VALUES (?, ?, ?, ?, NULL, NULL, ?, NULL, ?) \
                 ON CONFLICT(member_code) DO UPDATE SET \
                    secondary_key = excluded.secondary_key, \
                    payload = excluded.payload, \
                    content_hash = excluded.content_hash, \
                    last_seen_at = excluded.last_seen_at",
            )
            .bind(record.member_code.as_str())
            .bind(&record.secondary_key)
            .bind(&payload)
            .bind(content_hash.as_str())
            .bind(&now)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!(records = records.len(), "Upserted snapshot batch");
        Ok(())
    }

    async fn get_needing_sync(&self, force: bool) -> anyhow::Result<Vec<MemberRecord>> {
        let sql = if force {
            "SELECT * FROM tracked_members ORDER BY member_code"
        } else {
            "SELECT * FROM tracked_members \
             WHERE last_synced_hash IS NULL OR last_synced_hash != content_hash \
             ORDER BY member_code"
        };

        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(member_record_from_row(row)?);
        }

        Ok(records)
    }

    async fn mark_synced(
        &self,
        code: &MemberCode,
        synced_hash: &ContentHash,
        remote_id: &RemoteId,
    ) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "UPDATE tracked_members \
             SET last_synced_hash = ?, remote_id = ?, last_synced_at = ? \
             WHERE member_code = ?",
        )
        .bind(synced_hash.as_str())
        .bind(remote_id.as_str())
        .bind(&now)
        .bind(code.as_str())
        .execute(&self.pool)
        .await?;

        tracing::trace!(member_code = %code, remote_id = %remote_id, "Recorded successful push");
        Ok(())
    }

    async fn clear_remote_link(&self, code: &MemberCode) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE tracked_members \
             SET remote_id = NULL, last_synced_hash = NULL \
             WHERE member_code = ?",
        )
        .bind(code.as_str())
        .execute(&self.pool)
        .await?;

        tracing::trace!(member_code = %code, "Cleared remote link");
        Ok(())
    }

    async fn get_missing_from(
        &self,
        current_codes: &[MemberCode],
    ) -> anyhow::Result<Vec<MemberRecord>> {
        // An empty snapshot means every tracked record is an orphan.
        // Callers guard against acting on an erroneously empty snapshot.
        let rows = if current_codes.is_empty() {
            sqlx::query("SELECT * FROM tracked_members ORDER BY member_code")
                .fetch_all(&self.pool)
                .await?
        } else {
            let placeholders = vec!["?"; current_codes.len()].join(", ");
            let sql = format!(
                "SELECT * FROM tracked_members \
                 WHERE member_code NOT IN ({}) ORDER BY member_code",
                placeholders
            );

            let mut query = sqlx::query(&sql);
            for code in current_codes {
                query = query.bind(code.as_str());
            }
            query.fetch_all(&self.pool).await?
        };

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(member_record_from_row(row)?);
        }

        Ok(records)
    }

    async fn get(&self, code: &MemberCode) -> anyhow::Result<Option<MemberRecord>> {
        let row = sqlx::query("SELECT * FROM tracked_members WHERE member_code = ?")
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(member_record_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, code: &MemberCode) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM tracked_members WHERE member_code = ?")
            .bind(code.as_str())
            .execute(&self.pool)
            .await?;

        tracing::trace!(member_code = %code, "Deleted tracked record");
        Ok(())
    }

    async fn count(&self) -> anyhow::Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tracked_members")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

// ============================================================================
// IRunStore implementation
// ============================================================================

#[async_trait::async_trait]
impl IRunStore for SqliteTrackingStore {
    async fn save_run(&self, run: &SyncRun) -> anyhow::Result<()> {
        let id = run.id().to_string();
        let started_at = run.started_at().to_rfc3339();
        let finished_at = run.finished_at().map(|dt| dt.to_rfc3339());
        let state = run_state_to_string(run.state());

        sqlx::query(
            "INSERT OR REPLACE INTO sync_runs (id, started_at, finished_at, state) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&started_at)
        .bind(&finished_at)
        .bind(&state)
        .execute(&self.pool)
        .await?;

        tracing::trace!(run_id = %id, state = %state, "Saved sync run");
        Ok(())
    }

    async fn insert_step(&self, run_id: RunId, name: &str) -> anyhow::Result<i64> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO sync_steps (run_id, name, state, started_at) \
             VALUES (?, ?, 'pending', ?)",
        )
        .bind(run_id.to_string())
        .bind(name)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn finish_step(
        &self,
        step_id: i64,
        state: &StepState,
        counts: &StepCounts,
    ) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "UPDATE sync_steps \
             SET state = ?, created = ?, updated = ?, skipped = ?, deleted = ?, \
                 failed = ?, finished_at = ? \
             WHERE id = ?",
        )
        .bind(step_state_to_string(state))
        .bind(counts.created as i64)
        .bind(counts.updated as i64)
        .bind(counts.skipped as i64)
        .bind(counts.deleted as i64)
        .bind(counts.failed as i64)
        .bind(&now)
        .bind(step_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_error(&self, entry: &SyncErrorEntry) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO sync_errors (run_id, step_id, member_code, message, occurred_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(entry.run_id.to_string())
        .bind(entry.step_id)
        .bind(entry.member_code.as_ref().map(|c| c.as_str().to_string()))
        .bind(&entry.message)
        .bind(entry.occurred_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent_runs(&self, limit: u32) -> anyhow::Result<Vec<SyncRun>> {
        let rows = sqlx::query("SELECT * FROM sync_runs ORDER BY started_at DESC LIMIT ?")
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        let mut runs = Vec::with_capacity(rows.len());
        for row in &rows {
            runs.push(run_from_row(row)?);
        }

        Ok(runs)
    }

    async fn steps_for_run(&self, run_id: RunId) -> anyhow::Result<Vec<SyncStep>> {
        let rows = sqlx::query("SELECT * FROM sync_steps WHERE run_id = ? ORDER BY id ASC")
            .bind(run_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        let mut steps = Vec::with_capacity(rows.len());
        for row in &rows {
            steps.push(step_from_row(row)?);
        }

        Ok(steps)
    }

    async fn errors_for_run(&self, run_id: RunId) -> anyhow::Result<Vec<SyncErrorEntry>> {
        let rows = sqlx::query("SELECT * FROM sync_errors WHERE run_id = ? ORDER BY id ASC")
            .bind(run_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        let mut errors = Vec::with_capacity(rows.len());
        for row in &rows {
            errors.push(error_from_row(row)?);
        }

        Ok(errors)
    }
}
