// Integration tests for the SQLite adapter: CAS semantics, append
// counting, and round trips, against both in-memory and on-disk files.

use chrono::{Duration, Utc};
use examsmith_storage::{init_storage_db, init_test_db, SqliteStorageAdapter};
use examsmith_core::ports::{StorageAdapter, StoredRow, Table};
use serde_json::json;
use tempfile::tempdir;

async fn adapter() -> SqliteStorageAdapter {
    SqliteStorageAdapter::new(init_test_db().await.unwrap())
}

fn row(key: &str, version: i64, data: serde_json::Value) -> StoredRow {
    StoredRow {
        key: key.to_string(),
        version,
        data,
    }
}

#[tokio::test]
async fn upsert_and_read_round_trip() {
    let adapter = adapter().await;
    adapter
        .upsert(
            Table::Dossiers,
            row("t1:writer:biology", 1, json!({"trustScore": 5.0})),
        )
        .await
        .unwrap();

    let read = adapter
        .read_one(Table::Dossiers, "t1:writer:biology")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(read.version, 1);
    assert_eq!(read.data["trustScore"], 5.0);

    assert!(adapter
        .read_one(Table::Dossiers, "missing")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn upsert_replaces_existing_rows() {
    let adapter = adapter().await;
    adapter
        .upsert(Table::Guardrails, row("k", 1, json!({"rules": []})))
        .await
        .unwrap();
    adapter
        .upsert(Table::Guardrails, row("k", 2, json!({"rules": [1]})))
        .await
        .unwrap();

    let read = adapter.read_one(Table::Guardrails, "k").await.unwrap().unwrap();
    assert_eq!(read.version, 2);
    assert_eq!(read.data["rules"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn cas_swaps_only_on_the_expected_version() {
    let adapter = adapter().await;
    adapter
        .upsert(Table::Dossiers, row("k", 1, json!({"n": 1})))
        .await
        .unwrap();

    // Correct expectation wins and bumps the version.
    let swapped = adapter
        .update_if_version(Table::Dossiers, "k", json!({"n": 2}), 1)
        .await
        .unwrap();
    assert!(swapped);
    let read = adapter.read_one(Table::Dossiers, "k").await.unwrap().unwrap();
    assert_eq!(read.version, 2);
    assert_eq!(read.data["n"], 2);

    // A stale expectation loses and changes nothing.
    let stale = adapter
        .update_if_version(Table::Dossiers, "k", json!({"n": 99}), 1)
        .await
        .unwrap();
    assert!(!stale);
    let read = adapter.read_one(Table::Dossiers, "k").await.unwrap().unwrap();
    assert_eq!(read.version, 2);
    assert_eq!(read.data["n"], 2);

    // Missing keys never swap.
    let missing = adapter
        .update_if_version(Table::Dossiers, "absent", json!({}), 0)
        .await
        .unwrap();
    assert!(!missing);
}

#[tokio::test]
async fn concurrent_cas_writers_serialize() {
    let adapter = std::sync::Arc::new(adapter().await);
    adapter
        .upsert(Table::Dossiers, row("k", 1, json!({"n": 0})))
        .await
        .unwrap();

    // Both writers read version 1; only one swap can win.
    let a = adapter
        .update_if_version(Table::Dossiers, "k", json!({"n": 1}), 1)
        .await
        .unwrap();
    let b = adapter
        .update_if_version(Table::Dossiers, "k", json!({"n": 2}), 1)
        .await
        .unwrap();
    assert!(a ^ b, "exactly one swap must win");

    let read = adapter.read_one(Table::Dossiers, "k").await.unwrap().unwrap();
    assert_eq!(read.version, 2);
}

#[tokio::test]
async fn append_counts_respect_the_time_window() {
    let adapter = adapter().await;
    for i in 0..3 {
        adapter
            .append(Table::UsageLog, "t1", "runs", json!({"i": i}))
            .await
            .unwrap();
    }
    adapter
        .append(Table::UsageLog, "someone-else", "runs", json!({}))
        .await
        .unwrap();

    let since_yesterday = Utc::now() - Duration::days(1);
    assert_eq!(
        adapter
            .count_since(Table::UsageLog, "t1", since_yesterday)
            .await
            .unwrap(),
        3
    );
    let since_tomorrow = Utc::now() + Duration::days(1);
    assert_eq!(
        adapter
            .count_since(Table::UsageLog, "t1", since_tomorrow)
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn appended_values_preserve_order() {
    let adapter = adapter().await;
    for i in 0..3 {
        adapter
            .append(Table::AssessmentHistory, "t1", "runs", json!({"run": i}))
            .await
            .unwrap();
    }
    let values = adapter
        .appended_values(Table::AssessmentHistory, "t1")
        .await
        .unwrap();
    assert_eq!(values.len(), 3);
    assert_eq!(values[0]["run"], 0);
    assert_eq!(values[2]["run"], 2);
}

#[tokio::test]
async fn versioned_and_append_tables_do_not_mix() {
    let adapter = adapter().await;
    assert!(adapter
        .append(Table::Dossiers, "k", "runs", json!({}))
        .await
        .is_err());
    assert!(adapter.read_one(Table::UsageLog, "k").await.is_err());
}

#[tokio::test]
async fn on_disk_database_persists_across_pools() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("examsmith.db");

    {
        let pool = init_storage_db(&path).await.unwrap();
        let adapter = SqliteStorageAdapter::new(pool);
        adapter
            .upsert(Table::Dossiers, row("k", 3, json!({"kept": true})))
            .await
            .unwrap();
    }

    let pool = init_storage_db(&path).await.unwrap();
    let adapter = SqliteStorageAdapter::new(pool);
    let read = adapter.read_one(Table::Dossiers, "k").await.unwrap().unwrap();
    assert_eq!(read.version, 3);
    assert_eq!(read.data["kept"], true);
}
