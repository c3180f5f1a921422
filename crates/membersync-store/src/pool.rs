//! SQLite connection pool
//!
//! Opens the tracking database lazily: the file and its parent directory
//! are created on first use, WAL mode is enabled, and the idempotent
//! migrations run before the pool is handed out. An in-memory variant
//! backs the test suites.

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::migrations;
use crate::StoreError;

/// Maximum connections for file-backed databases. In-memory databases get
/// a single connection because SQLite scopes them per-connection.
const MAX_CONNECTIONS: u32 = 5;

/// How long a connection waits on a locked database before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Pool of SQLite connections for membersync state persistence
pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// Opens (creating if absent) the database at `db_path` and runs
    /// migrations.
    ///
    /// # Errors
    ///
    /// `StoreError::ConnectionFailed` when the file or connection cannot
    /// be set up, `StoreError::MigrationFailed` when migrations fail.
    pub async fn new(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::ConnectionFailed(format!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(|e| {
                StoreError::ConnectionFailed(format!(
                    "Failed to connect to database at {}: {}",
                    db_path.display(),
                    e
                ))
            })?;

        migrations::run(&pool).await?;

        tracing::info!(path = %db_path.display(), "Tracking database opened");
        Ok(Self { pool })
    }

    /// Opens an in-memory database for tests.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| {
                StoreError::ConnectionFailed(format!("Failed to create in-memory database: {}", e))
            })?;

        migrations::run(&pool).await?;

        tracing::debug!("In-memory tracking database opened");
        Ok(Self { pool })
    }

    /// Returns the underlying SQLite connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
