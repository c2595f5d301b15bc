// ABOUTME: Integration tests for the in-memory and SQLite token stores
// ABOUTME: Both backends must replace records whole, isolate users, clear, and survive reopening
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::sync::Arc;

use chrono::Duration;
use tempfile::TempDir;

use vitalsync::storage::{InMemoryTokenStore, SqliteTokenStore, TokenStore};

async fn exercise_store(store: Arc<dyn TokenStore>) {
    assert!(store.get("user-1").await.unwrap().is_none());

    let first = common::record("access-1", "refresh-1", common::t0(), 3600);
    store.put("user-1", &first).await.unwrap();
    assert_eq!(store.get("user-1").await.unwrap(), Some(first.clone()));

    let second = common::record(
        "access-2",
        "refresh-2",
        common::t0() + Duration::hours(1),
        7200,
    )
    .preserving_connected_at(first.connected_at());
    store.put("user-1", &second).await.unwrap();

    let stored = store.get("user-1").await.unwrap().unwrap();
    assert_eq!(stored, second);
    assert_eq!(stored.access_token(), "access-2");
    assert_eq!(stored.refresh_token(), "refresh-2");
    assert_eq!(stored.connected_at(), common::t0());
    assert_eq!(stored.expires_at(), common::t0() + Duration::hours(3));

    let other = common::record("access-9", "refresh-9", common::t0(), 3600);
    store.put("user-2", &other).await.unwrap();

    store.clear("user-1").await.unwrap();
    assert!(store.get("user-1").await.unwrap().is_none());
    assert_eq!(store.get("user-2").await.unwrap(), Some(other));

    // Clearing an absent user is not an error.
    store.clear("user-1").await.unwrap();
}

#[tokio::test]
async fn test_memory_store() {
    common::init_test_logging();
    exercise_store(Arc::new(InMemoryTokenStore::new())).await;
}

#[tokio::test]
async fn test_sqlite_memory_store() {
    common::init_test_logging();
    let store = SqliteTokenStore::connect("sqlite::memory:").await.unwrap();
    exercise_store(Arc::new(store)).await;
}

#[tokio::test]
async fn test_sqlite_file_store_survives_reopen() {
    common::init_test_logging();
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite:{}", dir.path().join("tokens.db").display());

    let record = common::record("access-1", "refresh-1", common::t0(), 3600);
    {
        let store = SqliteTokenStore::connect(&url).await.unwrap();
        store.put("user-1", &record).await.unwrap();
    }

    let reopened = SqliteTokenStore::connect(&url).await.unwrap();
    assert_eq!(reopened.get("user-1").await.unwrap(), Some(record));
}

#[tokio::test]
async fn test_sqlite_migrate_is_idempotent() {
    let store = SqliteTokenStore::connect("sqlite::memory:").await.unwrap();
    store.migrate().await.unwrap();
    store.migrate().await.unwrap();
}

#[tokio::test]
async fn test_sqlite_rejects_bad_url() {
    assert!(SqliteTokenStore::connect("postgres://nope").await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_puts_leave_one_whole_record() {
    let store: Arc<dyn TokenStore> = Arc::new(InMemoryTokenStore::new());

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let record = common::record(
                    &format!("access-{i}"),
                    &format!("refresh-{i}"),
                    common::t0(),
                    3600,
                );
                store.put("user-1", &record).await.unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let stored = store.get("user-1").await.unwrap().unwrap();
    let suffix = stored.access_token().trim_start_matches("access-");
    assert_eq!(stored.refresh_token(), format!("refresh-{suffix}"));
}
