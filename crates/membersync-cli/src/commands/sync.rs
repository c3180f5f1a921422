//! Sync command - reconcile member records against the downstream system
//!
//! Wires up the store, remote client, run tracker, and driver, then runs
//! one reconciliation under the crash-finalizing supervisor and renders
//! the summary.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use membersync_audit::{supervise, RunTracker};
use membersync_core::config::Config;
use membersync_engine::{ReconcileDriver, ReconcileOptions};
use membersync_remote::{HttpRemoteSystem, RemoteClient, RemoteClientConfig};
use membersync_store::{DatabasePool, SqliteTrackingStore};

use crate::output::OutputFormat;
use crate::source::JsonFileSource;

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Path to the JSON snapshot file from the source system
    #[arg(long)]
    pub snapshot: PathBuf,

    /// Push every record, even if unchanged since the last run
    #[arg(long)]
    pub force: bool,

    /// Show what would be done without making changes
    #[arg(long)]
    pub dry_run: bool,

    /// Run the orphan sweep even when the snapshot is empty
    /// (deletes every tracked record's remote entity)
    #[arg(long)]
    pub allow_empty_snapshot: bool,
}

impl SyncCommand {
    pub async fn execute(&self, format: OutputFormat, config: &Config) -> Result<()> {
        // Open the tracking store
        let pool = DatabasePool::new(&config.store.db_path)
            .await
            .context("Failed to open tracking database")?;
        let store = Arc::new(SqliteTrackingStore::new(pool.pool().clone()));
        let tracker = Arc::new(RunTracker::new(store.clone()));

        // Downstream system client
        let mut remote_config = RemoteClientConfig::new(config.remote.base_url.clone())
            .with_timeout(Duration::from_secs(config.remote.timeout_secs))
            .with_max_retries(config.remote.max_retries);
        if let Some(key) = config.api_key() {
            remote_config = remote_config.with_api_key(key);
        }
        let remote = Arc::new(HttpRemoteSystem::new(
            RemoteClient::new(remote_config).context("Failed to build remote client")?,
        ));

        let source = Arc::new(JsonFileSource::new(self.snapshot.clone()));

        let options = ReconcileOptions {
            force: self.force,
            dry_run: self.dry_run,
            allow_empty_sweep: self.allow_empty_snapshot,
            record_delay: Duration::from_millis(config.sync.record_delay_ms),
        };

        if self.dry_run {
            format.info("Dry run mode - no changes will be made");
        }
        if self.force {
            format.info("Force mode - pushing all records");
        }

        info!(snapshot = %self.snapshot.display(), "Starting reconciliation");

        let driver = ReconcileDriver::new(source, store, remote, tracker.clone(), options);

        let run = tracker.start_run().await;
        let run_id = run.id();
        let started_at = run.started_at();
        let summary = supervise(tracker, run_id, started_at, async move {
            driver.run_once(run).await
        })
        .await?;

        // Render the summary
        if format.is_json() {
            format.print_json(&serde_json::to_value(&summary)?);
        } else {
            if summary.is_clean() {
                format.success(&format!("Reconciled {} records", summary.total));
            } else {
                format.warn(&format!(
                    "Reconciled {} records with {} errors",
                    summary.total,
                    summary.errors.len()
                ));
            }

            format.counter("Created", summary.created);
            format.counter("Updated", summary.updated);
            format.counter("Skipped", summary.skipped);
            format.counter("Deleted", summary.deleted);

            if summary.sweep_skipped {
                format.warn(
                    "Snapshot was empty; orphan sweep skipped (use --allow-empty-snapshot to override)",
                );
            }

            for error in &summary.errors {
                format.error(&format!("{}: {}", error.member_code, error.message));
            }
        }

        // Callers get failures as a non-zero exit, never as a panic
        if !summary.is_clean() {
            std::process::exit(1);
        }

        Ok(())
    }
}
