//! Run store port (driven/secondary port)
//!
//! Persistence for the run/step/error audit trail. Implementations fail
//! loudly like any store; the non-fatal degradation required for audit
//! bookkeeping lives one layer up, in the run tracker.

use crate::domain::{RunId, StepCounts, StepState, SyncErrorEntry, SyncRun, SyncStep};

/// Port trait for run/step/error audit persistence.
#[async_trait::async_trait]
pub trait IRunStore: Send + Sync {
    /// Saves a run (insert or update by run id)
    async fn save_run(&self, run: &SyncRun) -> anyhow::Result<()>;

    /// Inserts a new step and returns its storage-assigned id
    async fn insert_step(&self, run_id: RunId, name: &str) -> anyhow::Result<i64>;

    /// Finalizes a step with its terminal state and counters
    async fn finish_step(
        &self,
        step_id: i64,
        state: &StepState,
        counts: &StepCounts,
    ) -> anyhow::Result<()>;

    /// Appends an error entry
    async fn insert_error(&self, entry: &SyncErrorEntry) -> anyhow::Result<()>;

    /// Returns the most recent runs, newest first
    async fn recent_runs(&self, limit: u32) -> anyhow::Result<Vec<SyncRun>>;

    /// Returns the steps of a run, in insertion order
    async fn steps_for_run(&self, run_id: RunId) -> anyhow::Result<Vec<SyncStep>>;

    /// Returns the errors recorded for a run, in insertion order
    async fn errors_for_run(&self, run_id: RunId) -> anyhow::Result<Vec<SyncErrorEntry>>;
}
