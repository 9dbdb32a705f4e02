// schema.rs
// SQLite schema bootstrap. Two row shapes cover the whole persisted
// state: versioned JSON rows for CAS tables and append-only logs.

use crate::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;

/// Tables addressed by key with a version column for CAS.
pub const VERSIONED_TABLES: [&str; 3] = ["dossiers", "guardrails", "predictive_defaults"];

/// Append-only tables with a timestamp for range counting.
pub const APPEND_TABLES: [&str; 2] = ["assessment_history", "usage_log"];

/// Opens (and creates if missing) the storage database and applies the
/// schema.
pub async fn init_storage_db(path: &Path) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await?;
    apply_schema(&pool).await?;
    Ok(pool)
}

/// In-memory database for tests.
pub async fn init_test_db() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    apply_schema(&pool).await?;
    Ok(pool)
}

async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    for table in VERSIONED_TABLES {
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                key TEXT PRIMARY KEY,
                version INTEGER NOT NULL,
                data TEXT NOT NULL
            )",
            table
        ))
        .execute(pool)
        .await?;
    }

    for table in APPEND_TABLES {
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                key TEXT NOT NULL,
                field TEXT NOT NULL,
                value TEXT NOT NULL,
                appended_at INTEGER NOT NULL
            )",
            table
        ))
        .execute(pool)
        .await?;
        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{t}_key_time ON {t} (key, appended_at)",
            t = table
        ))
        .execute(pool)
        .await?;
    }

    Ok(())
}
