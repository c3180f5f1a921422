//! RunTracker - non-fatal run/step/error recording
//!
//! Wraps `IRunStore` with convenience methods for the reconciliation
//! lifecycle. All methods are non-fatal: errors in audit persistence are
//! logged via `tracing::warn!` but never propagated, so a tracking-storage
//! fault can never abort reconciliation itself.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use membersync_core::domain::{
    MemberCode, RunId, RunState, StepCounts, StepState, SyncErrorEntry, SyncRun,
};
use membersync_core::ports::IRunStore;

/// High-level run tracker over the run-store port.
///
/// All methods silently swallow storage errors (logging a warning) to
/// ensure audit failures never break reconciliation.
pub struct RunTracker {
    store: Arc<dyn IRunStore>,
}

impl RunTracker {
    /// Creates a new `RunTracker` backed by the given run store.
    pub fn new(store: Arc<dyn IRunStore>) -> Self {
        Self { store }
    }

    /// Persist a run, swallowing errors with a tracing warning.
    async fn save(&self, run: &SyncRun) {
        if let Err(e) = self.store.save_run(run).await {
            tracing::warn!(run_id = %run.id(), error = %e, "Failed to save sync run");
        }
    }

    /// Starts a new run and records it as Running.
    ///
    /// The run object is always returned; if persistence failed, the later
    /// recording calls for this run degrade to warnings as well.
    pub async fn start_run(&self) -> SyncRun {
        let run = SyncRun::new();
        self.save(&run).await;
        run
    }

    /// Records the start of a step. Returns `None` when persistence failed;
    /// subsequent calls accept `None` and no-op.
    pub async fn start_step(&self, run_id: RunId, name: &str) -> Option<i64> {
        match self.store.insert_step(run_id, name).await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(%run_id, step = name, error = %e, "Failed to record step start");
                None
            }
        }
    }

    /// Finalizes a step with its terminal state and counters.
    pub async fn finish_step(&self, step_id: Option<i64>, state: StepState, counts: StepCounts) {
        let Some(step_id) = step_id else {
            return;
        };
        if let Err(e) = self.store.finish_step(step_id, &state, &counts).await {
            tracing::warn!(step_id, error = %e, "Failed to record step finish");
        }
    }

    /// Appends an error entry to the run (and optionally a step/member).
    pub async fn record_error(
        &self,
        run_id: RunId,
        step_id: Option<i64>,
        member_code: Option<MemberCode>,
        message: &str,
    ) {
        let entry = SyncErrorEntry {
            run_id,
            step_id,
            member_code,
            message: message.to_string(),
            occurred_at: Utc::now(),
        };
        if let Err(e) = self.store.insert_error(&entry).await {
            tracing::warn!(%run_id, error = %e, "Failed to record sync error");
        }
    }

    /// Transitions a run to a terminal state and persists it.
    pub async fn finish_run(&self, run: &mut SyncRun, state: RunState) {
        run.finish(state);
        self.save(run).await;
    }

    /// Finalizes a crashed run as `Failure` with a synthetic error entry.
    ///
    /// Used by the supervisor when the reconciliation task itself died,
    /// so a crash still leaves an accurate audit trail instead of a row
    /// stuck in `running` forever.
    pub async fn finalize_crashed(
        &self,
        run_id: RunId,
        started_at: DateTime<Utc>,
        message: &str,
    ) {
        self.record_error(run_id, None, None, message).await;
        let mut run = SyncRun::from_parts(run_id, started_at, None, RunState::Running);
        run.finish(RunState::Failure);
        self.save(&run).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use membersync_core::domain::SyncStep;

    /// In-memory mock run store that records calls
    #[derive(Default)]
    struct MockRunStore {
        runs: Mutex<Vec<SyncRun>>,
        steps: Mutex<Vec<(RunId, String)>>,
        errors: Mutex<Vec<SyncErrorEntry>>,
    }

    #[async_trait]
    impl IRunStore for MockRunStore {
        async fn save_run(&self, run: &SyncRun) -> anyhow::Result<()> {
            self.runs.lock().unwrap().push(run.clone());
            Ok(())
        }
        async fn insert_step(&self, run_id: RunId, name: &str) -> anyhow::Result<i64> {
            let mut steps = self.steps.lock().unwrap();
            steps.push((run_id, name.to_string()));
            Ok(steps.len() as i64)
        }
        async fn finish_step(
            &self,
            _step_id: i64,
            _state: &StepState,
            _counts: &StepCounts,
        ) -> anyhow::Result<()> {
            Ok(())
        }
        async fn insert_error(&self, entry: &SyncErrorEntry) -> anyhow::Result<()> {
            self.errors.lock().unwrap().push(entry.clone());
            Ok(())
        }
        async fn recent_runs(&self, _limit: u32) -> anyhow::Result<Vec<SyncRun>> {
            Ok(self.runs.lock().unwrap().clone())
        }
        async fn steps_for_run(&self, _run_id: RunId) -> anyhow::Result<Vec<SyncStep>> {
            Ok(vec![])
        }
        async fn errors_for_run(&self, _run_id: RunId) -> anyhow::Result<Vec<SyncErrorEntry>> {
            Ok(self.errors.lock().unwrap().clone())
        }
    }

    /// A run store that always fails
    struct FailingRunStore;

    #[async_trait]
    impl IRunStore for FailingRunStore {
        async fn save_run(&self, _: &SyncRun) -> anyhow::Result<()> {
            anyhow::bail!("Database write error")
        }
        async fn insert_step(&self, _: RunId, _: &str) -> anyhow::Result<i64> {
            anyhow::bail!("Database write error")
        }
        async fn finish_step(
            &self,
            _: i64,
            _: &StepState,
            _: &StepCounts,
        ) -> anyhow::Result<()> {
            anyhow::bail!("Database write error")
        }
        async fn insert_error(&self, _: &SyncErrorEntry) -> anyhow::Result<()> {
            anyhow::bail!("Database write error")
        }
        async fn recent_runs(&self, _: u32) -> anyhow::Result<Vec<SyncRun>> {
            anyhow::bail!("Database read error")
        }
        async fn steps_for_run(&self, _: RunId) -> anyhow::Result<Vec<SyncStep>> {
            anyhow::bail!("Database read error")
        }
        async fn errors_for_run(&self, _: RunId) -> anyhow::Result<Vec<SyncErrorEntry>> {
            anyhow::bail!("Database read error")
        }
    }

    #[tokio::test]
    async fn test_start_run_persists_running_state() {
        let store = Arc::new(MockRunStore::default());
        let tracker = RunTracker::new(store.clone());

        let run = tracker.start_run().await;

        let runs = store.runs.lock().unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].id(), run.id());
        assert!(runs[0].state().is_running());
    }

    #[tokio::test]
    async fn test_steps_and_errors_recorded() {
        let store = Arc::new(MockRunStore::default());
        let tracker = RunTracker::new(store.clone());

        let run = tracker.start_run().await;
        let step = tracker.start_step(run.id(), "push").await;
        assert!(step.is_some());

        tracker
            .record_error(
                run.id(),
                step,
                Some(MemberCode::new("M-1").unwrap()),
                "remote said no",
            )
            .await;
        tracker
            .finish_step(step, StepState::Failure, StepCounts::default())
            .await;

        let errors = store.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "remote said no");
        assert_eq!(errors[0].step_id, step);
    }

    #[tokio::test]
    async fn test_finish_run_persists_terminal_state() {
        let store = Arc::new(MockRunStore::default());
        let tracker = RunTracker::new(store.clone());

        let mut run = tracker.start_run().await;
        tracker.finish_run(&mut run, RunState::Partial).await;

        assert_eq!(*run.state(), RunState::Partial);
        let runs = store.runs.lock().unwrap();
        assert_eq!(*runs.last().unwrap().state(), RunState::Partial);
    }

    #[tokio::test]
    async fn test_finalize_crashed_leaves_failure_row() {
        let store = Arc::new(MockRunStore::default());
        let tracker = RunTracker::new(store.clone());

        let run = tracker.start_run().await;
        tracker
            .finalize_crashed(run.id(), run.started_at(), "reconciliation task panicked")
            .await;

        let runs = store.runs.lock().unwrap();
        assert_eq!(*runs.last().unwrap().state(), RunState::Failure);
        assert!(runs.last().unwrap().finished_at().is_some());

        let errors = store.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("panicked"));
    }

    #[tokio::test]
    async fn test_tracking_failure_is_non_fatal() {
        let tracker = RunTracker::new(Arc::new(FailingRunStore));

        // None of these may panic or return an error
        let mut run = tracker.start_run().await;
        let step = tracker.start_step(run.id(), "push").await;
        assert!(step.is_none());
        tracker
            .finish_step(step, StepState::Success, StepCounts::default())
            .await;
        tracker.record_error(run.id(), None, None, "boom").await;
        tracker.finish_run(&mut run, RunState::Failure).await;
        tracker
            .finalize_crashed(run.id(), run.started_at(), "crash")
            .await;
    }
}
