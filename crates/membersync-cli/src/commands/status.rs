//! Status command - tracking table overview

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use membersync_core::config::Config;
use membersync_core::ports::{IRunStore, ITrackingStore};
use membersync_store::{DatabasePool, SqliteTrackingStore};

use crate::output::OutputFormat;

#[derive(Debug, Args)]
pub struct StatusCommand {}

impl StatusCommand {
    pub async fn execute(&self, format: OutputFormat, config: &Config) -> Result<()> {
        let pool = DatabasePool::new(&config.store.db_path)
            .await
            .context("Failed to open tracking database")?;
        let store = Arc::new(SqliteTrackingStore::new(pool.pool().clone()));

        let total = store.count().await?;
        let pending = store.get_needing_sync(false).await?.len();
        let last_run = store.recent_runs(1).await?.into_iter().next();

        if format.is_json() {
            let json = serde_json::json!({
                "tracked_records": total,
                "pending_sync": pending,
                "last_run": last_run.as_ref().map(|run| serde_json::json!({
                    "id": run.id().to_string(),
                    "state": run.state().to_string(),
                    "started_at": run.started_at().to_rfc3339(),
                    "finished_at": run.finished_at().map(|dt| dt.to_rfc3339()),
                })),
            });
            format.print_json(&json);
        } else {
            format.success(&format!("Tracking {} member records", total));
            format.info(&format!("Pending sync: {}", pending));
            match last_run {
                Some(run) => {
                    format.info(&format!(
                        "Last run:     {} ({})",
                        run.state(),
                        run.started_at().format("%Y-%m-%d %H:%M:%S")
                    ));
                }
                None => format.info("Last run:     never"),
            }
        }

        Ok(())
    }
}
