// testing/memory_storage.rs
// HashMap-backed storage adapter with real CAS semantics, for unit and
// pipeline tests.

use crate::ports::{StorageAdapter, StoredRow, Table};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
struct State {
    rows: HashMap<(Table, String), StoredRow>,
    appends: HashMap<(Table, String), Vec<(DateTime<Utc>, String, serde_json::Value)>>,
}

#[derive(Default)]
pub struct MemoryStorage {
    state: Mutex<State>,
    /// When set, every operation fails; exercises the fail-closed path.
    failing: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            state: Mutex::new(State::default()),
            failing: true,
        }
    }

    pub fn appended(&self, table: Table, key: &str) -> Vec<serde_json::Value> {
        self.state
            .lock()
            .unwrap()
            .appends
            .get(&(table, key.to_string()))
            .map(|entries| entries.iter().map(|(_, _, v)| v.clone()).collect())
            .unwrap_or_default()
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.failing {
            anyhow::bail!("storage unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for MemoryStorage {
    async fn read_one(&self, table: Table, key: &str) -> anyhow::Result<Option<StoredRow>> {
        self.check()?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .rows
            .get(&(table, key.to_string()))
            .cloned())
    }

    async fn upsert(&self, table: Table, row: StoredRow) -> anyhow::Result<()> {
        self.check()?;
        self.state
            .lock()
            .unwrap()
            .rows
            .insert((table, row.key.clone()), row);
        Ok(())
    }

    async fn update_if_version(
        &self,
        table: Table,
        key: &str,
        data: serde_json::Value,
        expected_version: i64,
    ) -> anyhow::Result<bool> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        match state.rows.get_mut(&(table, key.to_string())) {
            Some(row) if row.version == expected_version => {
                row.version = expected_version + 1;
                row.data = data;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn append(
        &self,
        table: Table,
        key: &str,
        field: &str,
        value: serde_json::Value,
    ) -> anyhow::Result<()> {
        self.check()?;
        self.state
            .lock()
            .unwrap()
            .appends
            .entry((table, key.to_string()))
            .or_default()
            .push((Utc::now(), field.to_string(), value));
        Ok(())
    }

    async fn count_since(
        &self,
        table: Table,
        key: &str,
        since: DateTime<Utc>,
    ) -> anyhow::Result<i64> {
        self.check()?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .appends
            .get(&(table, key.to_string()))
            .map(|entries| entries.iter().filter(|(at, _, _)| *at >= since).count() as i64)
            .unwrap_or(0))
    }
}
