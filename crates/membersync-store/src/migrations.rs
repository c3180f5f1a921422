//! Idempotent schema migrations
//!
//! Every migration is additive: tables are created with
//! `CREATE TABLE IF NOT EXISTS`, and columns added after the initial
//! schema go through [`ensure_column`], which checks `pragma_table_info`
//! before issuing an `ALTER TABLE`. Running the whole set repeatedly on
//! any schema version is safe; nothing is ever dropped or rewritten.

use sqlx::SqlitePool;

use crate::StoreError;

/// Initial schema: tracking table plus the run/step/error audit tables.
///
/// `secondary_key` and the `deleted` step counter were added after the
/// first release and are applied via [`ensure_column`] below so that
/// databases created by earlier versions upgrade in place.
const BASE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tracked_members (
    member_code      TEXT PRIMARY KEY NOT NULL,
    payload          TEXT NOT NULL,
    content_hash     TEXT NOT NULL,
    remote_id        TEXT,
    last_synced_hash TEXT,
    last_seen_at     TEXT NOT NULL,
    last_synced_at   TEXT,
    created_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sync_runs (
    id          TEXT PRIMARY KEY NOT NULL,
    started_at  TEXT NOT NULL,
    finished_at TEXT,
    state       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sync_steps (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id      TEXT NOT NULL REFERENCES sync_runs(id),
    name        TEXT NOT NULL,
    state       TEXT NOT NULL,
    created     INTEGER NOT NULL DEFAULT 0,
    updated     INTEGER NOT NULL DEFAULT 0,
    skipped     INTEGER NOT NULL DEFAULT 0,
    failed      INTEGER NOT NULL DEFAULT 0,
    started_at  TEXT NOT NULL,
    finished_at TEXT
);

CREATE TABLE IF NOT EXISTS sync_errors (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id      TEXT NOT NULL REFERENCES sync_runs(id),
    step_id     INTEGER,
    member_code TEXT,
    message     TEXT NOT NULL,
    occurred_at TEXT NOT NULL
);
"#;

/// Runs all migrations against the given pool.
pub async fn run(pool: &SqlitePool) -> Result<(), StoreError> {
    sqlx::raw_sql(BASE_SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("Failed to create base schema: {}", e)))?;

    ensure_column(
        pool,
        "tracked_members",
        "secondary_key",
        "TEXT NOT NULL DEFAULT ''",
    )
    .await?;
    ensure_column(pool, "sync_steps", "deleted", "INTEGER NOT NULL DEFAULT 0").await?;

    tracing::debug!("Database migrations completed");
    Ok(())
}

/// Adds `column` to `table` if it is not already present (check-then-alter).
async fn ensure_column(
    pool: &SqlitePool,
    table: &str,
    column: &str,
    definition: &str,
) -> Result<(), StoreError> {
    let present: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM pragma_table_info(?) WHERE name = ?")
            .bind(table)
            .bind(column)
            .fetch_one(pool)
            .await
            .map_err(|e| {
                StoreError::MigrationFailed(format!(
                    "Failed to inspect {}.{}: {}",
                    table, column, e
                ))
            })?;

    if present == 0 {
        let ddl = format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, definition);
        sqlx::raw_sql(&ddl).execute(pool).await.map_err(|e| {
            StoreError::MigrationFailed(format!("Failed to add {}.{}: {}", table, column, e))
        })?;
        tracing::info!(table, column, "Applied additive schema migration");
    }

    Ok(())
}
