// ports/storage.rs
// Key/value storage port with optimistic concurrency. Dossiers and
// guardrails are the only cross-run shared state; every mutation of
// them goes through compare-and-swap on the row version.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Persisted tables. The adapter maps these onto whatever backend it
/// fronts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Dossiers,
    Guardrails,
    AssessmentHistory,
    PredictiveDefaults,
    UsageLog,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Dossiers => "dossiers",
            Table::Guardrails => "guardrails",
            Table::AssessmentHistory => "assessment_history",
            Table::PredictiveDefaults => "predictive_defaults",
            Table::UsageLog => "usage_log",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A versioned JSON row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRow {
    pub key: String,
    pub version: i64,
    pub data: serde_json::Value,
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Fetch one row by key.
    async fn read_one(&self, table: Table, key: &str) -> anyhow::Result<Option<StoredRow>>;

    /// Insert or replace a row at the caller's version. Used for lazy
    /// creation and for tables without concurrent writers.
    async fn upsert(&self, table: Table, row: StoredRow) -> anyhow::Result<()>;

    /// Compare-and-swap: writes `data` at `expected_version + 1` only
    /// if the stored version still equals `expected_version`. Returns
    /// whether the swap happened.
    async fn update_if_version(
        &self,
        table: Table,
        key: &str,
        data: serde_json::Value,
        expected_version: i64,
    ) -> anyhow::Result<bool>;

    /// Append a value to a row's history field.
    async fn append(
        &self,
        table: Table,
        key: &str,
        field: &str,
        value: serde_json::Value,
    ) -> anyhow::Result<()>;

    /// Count appended entries for a key since a point in time. Drives
    /// the daily usage cap.
    async fn count_since(
        &self,
        table: Table,
        key: &str,
        since: DateTime<Utc>,
    ) -> anyhow::Result<i64>;
}
