//! Top-level error boundary for reconciliation runs
//!
//! Owns the finalize-on-crash responsibility for the active run: the
//! reconciliation future runs on its own task, and if that task panics the
//! run is finalized as `Failure` with a synthetic error entry before the
//! panic surfaces as an error. The tracker is injected here at startup
//! rather than held in a module-level "active run" singleton.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use membersync_core::domain::RunId;

use crate::tracker::RunTracker;

/// Runs `fut` under a crash boundary for the given run.
///
/// - Normal completion (Ok or Err) passes through untouched; the future is
///   expected to have finalized the run itself.
/// - A panic inside the future finalizes the run as `Failure` and returns
///   an error instead of propagating the panic.
pub async fn supervise<F, T>(
    tracker: Arc<RunTracker>,
    run_id: RunId,
    started_at: DateTime<Utc>,
    fut: F,
) -> anyhow::Result<T>
where
    F: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let handle = tokio::spawn(fut);

    match handle.await {
        Ok(result) => result,
        Err(join_err) if join_err.is_panic() => {
            tracing::error!(%run_id, "Reconciliation task panicked");
            tracker
                .finalize_crashed(run_id, started_at, "reconciliation task panicked")
                .await;
            Err(anyhow::anyhow!("Reconciliation task panicked"))
        }
        Err(join_err) => {
            tracing::error!(%run_id, error = %join_err, "Reconciliation task aborted");
            tracker
                .finalize_crashed(run_id, started_at, "reconciliation task aborted")
                .await;
            Err(anyhow::anyhow!("Reconciliation task aborted: {join_err}"))
        }
    }
}
