//! Runs command - inspect the reconciliation audit trail

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use membersync_core::config::Config;
use membersync_core::ports::IRunStore;
use membersync_store::{DatabasePool, SqliteTrackingStore};

use crate::output::OutputFormat;

#[derive(Debug, Args)]
pub struct RunsCommand {
    /// Maximum number of runs to show
    #[arg(long, default_value_t = 10)]
    pub limit: u32,
}

impl RunsCommand {
    pub async fn execute(&self, format: OutputFormat, config: &Config) -> Result<()> {
        let pool = DatabasePool::new(&config.store.db_path)
            .await
            .context("Failed to open tracking database")?;
        let store = Arc::new(SqliteTrackingStore::new(pool.pool().clone()));

        let runs = store.recent_runs(self.limit).await?;

        if format.is_json() {
            let mut entries = Vec::with_capacity(runs.len());
            for run in &runs {
                let steps = store.steps_for_run(run.id()).await?;
                let errors = store.errors_for_run(run.id()).await?;
                entries.push(serde_json::json!({
                    "id": run.id().to_string(),
                    "state": run.state().to_string(),
                    "started_at": run.started_at().to_rfc3339(),
                    "finished_at": run.finished_at().map(|dt| dt.to_rfc3339()),
                    "steps": steps.iter().map(|step| serde_json::json!({
                        "name": step.name,
                        "state": step.state.to_string(),
                        "created": step.counts.created,
                        "updated": step.counts.updated,
                        "skipped": step.counts.skipped,
                        "deleted": step.counts.deleted,
                        "failed": step.counts.failed,
                    })).collect::<Vec<_>>(),
                    "errors": errors.iter().map(|e| serde_json::json!({
                        "member_code": e.member_code.as_ref().map(|c| c.to_string()),
                        "message": e.message,
                    })).collect::<Vec<_>>(),
                }));
            }
            format.print_json(&serde_json::Value::Array(entries));
            return Ok(());
        }

        if runs.is_empty() {
            format.info("No reconciliation runs recorded yet");
            return Ok(());
        }

        for run in &runs {
            format.success(&format!(
                "{} {} ({})",
                run.started_at().format("%Y-%m-%d %H:%M:%S"),
                run.state(),
                run.id()
            ));

            for step in store.steps_for_run(run.id()).await? {
                format.info(&format!(
                    "{:<8} {}  created={} updated={} skipped={} deleted={} failed={}",
                    step.name,
                    step.state,
                    step.counts.created,
                    step.counts.updated,
                    step.counts.skipped,
                    step.counts.deleted,
                    step.counts.failed,
                ));
            }

            for error in store.errors_for_run(run.id()).await? {
                let code = error
                    .member_code
                    .as_ref()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "-".to_string());
                format.info(&format!("error [{}]: {}", code, error.message));
            }
        }

        Ok(())
    }
}
