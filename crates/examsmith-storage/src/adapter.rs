// adapter.rs
// SQLite implementation of the storage port. Versioned tables carry one
// JSON document per key; the CAS update is a single conditional UPDATE
// so concurrent writers serialize on the version column.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use examsmith_core::ports::{StorageAdapter, StoredRow, Table};
use sqlx::{Row, SqlitePool};

pub struct SqliteStorageAdapter {
    pool: SqlitePool,
}

impl SqliteStorageAdapter {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn is_versioned(table: Table) -> bool {
        matches!(
            table,
            Table::Dossiers | Table::Guardrails | Table::PredictiveDefaults
        )
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorageAdapter {
    async fn read_one(&self, table: Table, key: &str) -> anyhow::Result<Option<StoredRow>> {
        anyhow::ensure!(
            Self::is_versioned(table),
            "table {} is append-only",
            table
        );
        let row = sqlx::query(&format!(
            "SELECT key, version, data FROM {} WHERE key = ?",
            table.as_str()
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            let data: String = r.get("data");
            Ok(StoredRow {
                key: r.get("key"),
                version: r.get("version"),
                data: serde_json::from_str(&data)?,
            })
        })
        .transpose()
    }

    async fn upsert(&self, table: Table, row: StoredRow) -> anyhow::Result<()> {
        anyhow::ensure!(
            Self::is_versioned(table),
            "table {} is append-only",
            table
        );
        sqlx::query(&format!(
            "INSERT INTO {} (key, version, data) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET
                version = excluded.version,
                data = excluded.data",
            table.as_str()
        ))
        .bind(&row.key)
        .bind(row.version)
        .bind(serde_json::to_string(&row.data)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_if_version(
        &self,
        table: Table,
        key: &str,
        data: serde_json::Value,
        expected_version: i64,
    ) -> anyhow::Result<bool> {
        anyhow::ensure!(
            Self::is_versioned(table),
            "table {} is append-only",
            table
        );
        let result = sqlx::query(&format!(
            "UPDATE {} SET version = ?, data = ? WHERE key = ? AND version = ?",
            table.as_str()
        ))
        .bind(expected_version + 1)
        .bind(serde_json::to_string(&data)?)
        .bind(key)
        .bind(expected_version)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn append(
        &self,
        table: Table,
        key: &str,
        field: &str,
        value: serde_json::Value,
    ) -> anyhow::Result<()> {
        anyhow::ensure!(
            !Self::is_versioned(table),
            "table {} is not append-only",
            table
        );
        sqlx::query(&format!(
            "INSERT INTO {} (key, field, value, appended_at) VALUES (?, ?, ?, ?)",
            table.as_str()
        ))
        .bind(key)
        .bind(field)
        .bind(serde_json::to_string(&value)?)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn count_since(
        &self,
        table: Table,
        key: &str,
        since: DateTime<Utc>,
    ) -> anyhow::Result<i64> {
        anyhow::ensure!(
            !Self::is_versioned(table),
            "table {} is not append-only",
            table
        );
        let row = sqlx::query(&format!(
            "SELECT COUNT(*) AS n FROM {} WHERE key = ? AND appended_at >= ?",
            table.as_str()
        ))
        .bind(key)
        .bind(since.timestamp_millis())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("n"))
    }
}

impl SqliteStorageAdapter {
    /// Appended values for a key, oldest first. Backs the history CLI.
    pub async fn appended_values(
        &self,
        table: Table,
        key: &str,
    ) -> anyhow::Result<Vec<serde_json::Value>> {
        anyhow::ensure!(
            !Self::is_versioned(table),
            "table {} is not append-only",
            table
        );
        let rows = sqlx::query(&format!(
            "SELECT value FROM {} WHERE key = ? ORDER BY id",
            table.as_str()
        ))
        .bind(key)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|r| {
                let value: String = r.get("value");
                Ok(serde_json::from_str(&value)?)
            })
            .collect()
    }
}
