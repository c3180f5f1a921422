//! Reconciliation driver
//!
//! ## Error handling
//!
//! - Remote errors (already retried by the client) fail the current record
//!   only; processing continues with the next one.
//! - A 404 on update means the remote entity was deleted out-of-band: the
//!   local link is cleared and the record falls through to the create path.
//! - A conflict on create (409, or 400 "already exists") falls back to a
//!   secondary-key lookup and updates the found entity instead.
//! - Local storage errors are fatal to the run and propagate.
//!
//! ## Empty snapshots
//!
//! An empty snapshot would mark every tracked record as an orphan. Since an
//! upstream fault is far more likely than a genuinely emptied membership,
//! the sweep is skipped and the run flagged unless the caller explicitly
//! opts in via [`ReconcileOptions::allow_empty_sweep`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use membersync_audit::RunTracker;
use membersync_core::domain::{
    MemberCode, MemberRecord, ReconcileSummary, RecordError, RunState, SourceRecord, StepCounts,
    StepState, SyncRun,
};
use membersync_core::ports::{IRemoteSystem, ISourceProvider, ITrackingStore};

/// Per-run behavior switches
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Push every record regardless of hash state
    pub force: bool,
    /// Log would-be actions without touching the store or the remote system
    pub dry_run: bool,
    /// Run the orphan sweep even when the snapshot is empty
    pub allow_empty_sweep: bool,
    /// Fixed delay between records (rate-limiting courtesy)
    pub record_delay: Duration,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            force: false,
            dry_run: false,
            allow_empty_sweep: false,
            record_delay: Duration::from_millis(250),
        }
    }
}

/// Outcome of pushing a single record
enum PushOutcome {
    /// A new remote entity was created and linked
    Created,
    /// An existing remote entity was updated (or linked via secondary key)
    Updated,
}

/// Per-record failures are recorded; storage failures abort the run
enum PushError {
    Record(String),
    Fatal(anyhow::Error),
}

impl PushError {
    fn fatal(err: anyhow::Error) -> Self {
        PushError::Fatal(err)
    }
}

/// Orchestrates one reconciliation run
///
/// ## Dependencies
///
/// - `source`: yields the full current snapshot (external collaborator)
/// - `store`: the durable change-detection cache
/// - `remote`: create/update/delete/lookup against the downstream system
/// - `tracker`: non-fatal run/step/error audit recording
pub struct ReconcileDriver {
    source: Arc<dyn ISourceProvider>,
    store: Arc<dyn ITrackingStore>,
    remote: Arc<dyn IRemoteSystem>,
    tracker: Arc<RunTracker>,
    options: ReconcileOptions,
}

impl ReconcileDriver {
    /// Creates a new driver with the given dependencies
    pub fn new(
        source: Arc<dyn ISourceProvider>,
        store: Arc<dyn ITrackingStore>,
        remote: Arc<dyn IRemoteSystem>,
        tracker: Arc<RunTracker>,
        options: ReconcileOptions,
    ) -> Self {
        Self {
            source,
            store,
            remote,
            tracker,
            options,
        }
    }

    /// Executes one reconciliation run and finalizes its audit record.
    ///
    /// Per-record failures end up in the summary's error list; only a
    /// snapshot-fetch failure or a local storage error makes this return
    /// `Err` (with the run finalized as `Failure`).
    #[tracing::instrument(skip(self, run), fields(run_id = %run.id()))]
    pub async fn run_once(&self, mut run: SyncRun) -> Result<ReconcileSummary> {
        match self.execute(&run).await {
            Ok(summary) => {
                let state = summary.run_state();
                self.tracker.finish_run(&mut run, state).await;
                info!(
                    total = summary.total,
                    created = summary.created,
                    updated = summary.updated,
                    skipped = summary.skipped,
                    deleted = summary.deleted,
                    errors = summary.errors.len(),
                    "Reconciliation run completed"
                );
                Ok(summary)
            }
            Err(err) => {
                self.tracker
                    .record_error(run.id(), None, None, &format!("{err:#}"))
                    .await;
                self.tracker.finish_run(&mut run, RunState::Failure).await;
                Err(err)
            }
        }
    }

    async fn execute(&self, run: &SyncRun) -> Result<ReconcileSummary> {
        let snapshot = self
            .source
            .fetch_snapshot()
            .await
            .context("Failed to fetch source snapshot")?;

        info!(records = snapshot.len(), "Fetched source snapshot");

        let mut summary = ReconcileSummary {
            total: snapshot.len() as u64,
            ..Default::default()
        };

        if self.options.dry_run {
            return self.dry_run_pass(&snapshot, summary).await;
        }

        // Step 1: refresh the tracking table from the snapshot
        let step = self.tracker.start_step(run.id(), "refresh").await;
        match self.store.upsert_many(&snapshot).await {
            Ok(()) => {
                self.tracker
                    .finish_step(step, StepState::Success, StepCounts::default())
                    .await;
            }
            Err(err) => {
                self.tracker
                    .finish_step(step, StepState::Failure, StepCounts::default())
                    .await;
                return Err(err.context("Failed to refresh tracking table"));
            }
        }

        // Step 2: push changed records, one at a time
        let step = self.tracker.start_step(run.id(), "push").await;
        let needing = self
            .store
            .get_needing_sync(self.options.force)
            .await
            .context("Failed to select records needing sync")?;

        summary.synced = needing.len() as u64;
        summary.skipped = summary.total.saturating_sub(summary.synced);

        debug!(
            needing = needing.len(),
            skipped = summary.skipped,
            force = self.options.force,
            "Selected records needing sync"
        );

        for record in &needing {
            match self.push_record(record).await {
                Ok(PushOutcome::Created) => summary.created += 1,
                Ok(PushOutcome::Updated) => summary.updated += 1,
                Err(PushError::Record(message)) => {
                    warn!(member_code = %record.member_code(), %message, "Record push failed");
                    self.tracker
                        .record_error(
                            run.id(),
                            step,
                            Some(record.member_code().clone()),
                            &message,
                        )
                        .await;
                    summary.errors.push(RecordError {
                        member_code: record.member_code().clone(),
                        message,
                    });
                }
                Err(PushError::Fatal(err)) => {
                    self.tracker
                        .finish_step(step, StepState::Failure, push_counts(&summary))
                        .await;
                    return Err(err.context("Tracking store failed during push"));
                }
            }

            if !self.options.record_delay.is_zero() {
                tokio::time::sleep(self.options.record_delay).await;
            }
        }

        let push_state = if summary.errors.is_empty() {
            StepState::Success
        } else {
            StepState::Failure
        };
        self.tracker
            .finish_step(step, push_state, push_counts(&summary))
            .await;

        // Step 3: orphan sweep
        self.sweep_orphans(run, &snapshot, &mut summary).await?;

        Ok(summary)
    }

    // ========================================================================
    // Record push
    // ========================================================================

    /// Pushes one record to the downstream system and records the new sync
    /// state on success.
    async fn push_record(&self, record: &MemberRecord) -> Result<PushOutcome, PushError> {
        let code = record.member_code();
        let hash = record.content_hash();

        // Known remote entity: update in place
        if let Some(remote_id) = record.remote_id() {
            match self.remote.update(remote_id, record.payload()).await {
                Ok(()) => {
                    self.store
                        .mark_synced(code, hash, remote_id)
                        .await
                        .map_err(PushError::fatal)?;
                    debug!(member_code = %code, remote_id = %remote_id, "Updated remote entity");
                    return Ok(PushOutcome::Updated);
                }
                Err(err) if err.is_not_found() => {
                    // Deleted out-of-band: forget the link and re-create below
                    warn!(
                        member_code = %code,
                        remote_id = %remote_id,
                        "Remote entity gone, re-creating"
                    );
                    self.store
                        .clear_remote_link(code)
                        .await
                        .map_err(PushError::fatal)?;
                }
                Err(err) => return Err(PushError::Record(format!("update failed: {err}"))),
            }
        }

        // No link yet: a matching entity may already exist remotely
        match self
            .remote
            .find_by_secondary_key(record.secondary_key())
            .await
        {
            Ok(Some(found)) => {
                self.remote
                    .update(&found, record.payload())
                    .await
                    .map_err(|e| PushError::Record(format!("update of found entity failed: {e}")))?;
                self.store
                    .mark_synced(code, hash, &found)
                    .await
                    .map_err(PushError::fatal)?;
                debug!(member_code = %code, remote_id = %found, "Linked existing remote entity");
                return Ok(PushOutcome::Updated);
            }
            Ok(None) => {}
            Err(err) => {
                return Err(PushError::Record(format!(
                    "secondary-key lookup failed: {err}"
                )))
            }
        }

        match self.remote.create(record.payload()).await {
            Ok(remote_id) => {
                self.store
                    .mark_synced(code, hash, &remote_id)
                    .await
                    .map_err(PushError::fatal)?;
                debug!(member_code = %code, remote_id = %remote_id, "Created remote entity");
                Ok(PushOutcome::Created)
            }
            Err(err) if err.is_conflict() => self.resolve_create_conflict(record).await,
            Err(err) => Err(PushError::Record(format!("create failed: {err}"))),
        }
    }

    /// The create collided with an entity the lookup did not surface the
    /// first time; look again and link it. If it still cannot be found the
    /// record needs manual intervention, not endless retries.
    async fn resolve_create_conflict(
        &self,
        record: &MemberRecord,
    ) -> Result<PushOutcome, PushError> {
        let code = record.member_code();

        match self
            .remote
            .find_by_secondary_key(record.secondary_key())
            .await
        {
            Ok(Some(found)) => {
                self.remote
                    .update(&found, record.payload())
                    .await
                    .map_err(|e| {
                        PushError::Record(format!("update after conflict failed: {e}"))
                    })?;
                self.store
                    .mark_synced(code, record.content_hash(), &found)
                    .await
                    .map_err(PushError::fatal)?;
                info!(member_code = %code, remote_id = %found, "Resolved create conflict by linking");
                Ok(PushOutcome::Updated)
            }
            Ok(None) => Err(PushError::Record(format!(
                "create conflicted but no entity matches secondary key '{}'; manual intervention required",
                record.secondary_key()
            ))),
            Err(err) => Err(PushError::Record(format!(
                "conflict fallback lookup failed: {err}"
            ))),
        }
    }

    // ========================================================================
    // Orphan sweep
    // ========================================================================

    /// Deletes tracked records absent from the current snapshot, remotely
    /// first. A remote 404 counts as already deleted; any other remote
    /// failure keeps the local record so the orphan is retried next run.
    async fn sweep_orphans(
        &self,
        run: &SyncRun,
        snapshot: &[SourceRecord],
        summary: &mut ReconcileSummary,
    ) -> Result<()> {
        if snapshot.is_empty() && !self.options.allow_empty_sweep {
            warn!("Source snapshot is empty; skipping orphan sweep and flagging run");
            summary.sweep_skipped = true;
            self.tracker
                .record_error(
                    run.id(),
                    None,
                    None,
                    "empty snapshot; orphan sweep skipped",
                )
                .await;
            return Ok(());
        }

        let current_codes: Vec<MemberCode> = snapshot
            .iter()
            .map(|record| record.member_code.clone())
            .collect();

        let step = self.tracker.start_step(run.id(), "sweep").await;
        let orphans = self
            .store
            .get_missing_from(&current_codes)
            .await
            .context("Failed to select orphans")?;

        debug!(orphans = orphans.len(), "Orphan sweep selected");

        let mut counts = StepCounts::default();
        for orphan in &orphans {
            match self.delete_orphan(orphan).await {
                Ok(()) => {
                    summary.deleted += 1;
                    counts.deleted += 1;
                }
                Err(PushError::Record(message)) => {
                    warn!(member_code = %orphan.member_code(), %message, "Orphan delete failed; keeping record");
                    self.tracker
                        .record_error(
                            run.id(),
                            step,
                            Some(orphan.member_code().clone()),
                            &message,
                        )
                        .await;
                    counts.failed += 1;
                    summary.errors.push(RecordError {
                        member_code: orphan.member_code().clone(),
                        message,
                    });
                }
                Err(PushError::Fatal(err)) => {
                    self.tracker
                        .finish_step(step, StepState::Failure, counts)
                        .await;
                    return Err(err.context("Tracking store failed during sweep"));
                }
            }

            if !self.options.record_delay.is_zero() {
                tokio::time::sleep(self.options.record_delay).await;
            }
        }

        let state = if counts.failed == 0 {
            StepState::Success
        } else {
            StepState::Failure
        };
        self.tracker.finish_step(step, state, counts).await;

        Ok(())
    }

    async fn delete_orphan(&self, orphan: &MemberRecord) -> Result<(), PushError> {
        let code = orphan.member_code();

        if let Some(remote_id) = orphan.remote_id() {
            match self.remote.delete(remote_id).await {
                Ok(()) => {
                    debug!(member_code = %code, remote_id = %remote_id, "Deleted remote entity");
                }
                Err(err) if err.is_not_found() => {
                    debug!(member_code = %code, "Remote entity already gone");
                }
                Err(err) => {
                    return Err(PushError::Record(format!("remote delete failed: {err}")))
                }
            }
        }

        self.store.delete(code).await.map_err(PushError::fatal)?;
        debug!(member_code = %code, "Deleted tracked record");
        Ok(())
    }

    // ========================================================================
    // Dry run
    // ========================================================================

    /// Read-only classification pass: logs every action a real run would
    /// take without touching the tracking store or the remote system.
    async fn dry_run_pass(
        &self,
        snapshot: &[SourceRecord],
        mut summary: ReconcileSummary,
    ) -> Result<ReconcileSummary> {
        for record in snapshot {
            let new_hash = record.content_hash();
            let existing = self
                .store
                .get(&record.member_code)
                .await
                .context("Failed to query tracking table")?;

            match existing {
                None => {
                    info!(member_code = %record.member_code, "[dry-run] would create");
                    summary.created += 1;
                    summary.synced += 1;
                }
                Some(tracked) => {
                    let changed = self.options.force
                        || tracked.last_synced_hash() != Some(&new_hash);
                    if !changed {
                        debug!(member_code = %record.member_code, "[dry-run] unchanged, would skip");
                        summary.skipped += 1;
                    } else if tracked.remote_id().is_some() {
                        info!(member_code = %record.member_code, "[dry-run] would update");
                        summary.updated += 1;
                        summary.synced += 1;
                    } else {
                        info!(member_code = %record.member_code, "[dry-run] would create");
                        summary.created += 1;
                        summary.synced += 1;
                    }
                }
            }
        }

        if snapshot.is_empty() && !self.options.allow_empty_sweep {
            warn!("[dry-run] source snapshot is empty; orphan sweep would be skipped");
            summary.sweep_skipped = true;
            return Ok(summary);
        }

        let current_codes: Vec<MemberCode> = snapshot
            .iter()
            .map(|record| record.member_code.clone())
            .collect();
        let orphans = self
            .store
            .get_missing_from(&current_codes)
            .await
            .context("Failed to select orphans")?;

        for orphan in &orphans {
            info!(member_code = %orphan.member_code(), "[dry-run] would delete orphan");
            summary.deleted += 1;
        }

        Ok(summary)
    }
}

/// Step counters derived from the push phase of a summary
fn push_counts(summary: &ReconcileSummary) -> StepCounts {
    StepCounts {
        created: summary.created,
        updated: summary.updated,
        skipped: summary.skipped,
        failed: summary.errors.len() as u64,
        deleted: 0,
    }
}
