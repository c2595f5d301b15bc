// ABOUTME: Durable per-user token record storage behind a narrow async trait
// ABOUTME: Whole-record get / put / clear only; no partial field updates are exposed
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Token Storage
//!
//! A [`TokenStore`] holds at most one [`TokenRecord`] per user. `put` replaces
//! the whole record atomically, so concurrent writers for the same user resolve
//! as last-writer-wins at record granularity and never interleave fields.

use async_trait::async_trait;

use vitalsync_core::errors::StorageError;
use vitalsync_core::models::TokenRecord;

/// In-process store backed by a concurrent map
pub mod memory;
/// `SQLite` store with single-statement upserts
pub mod sqlite;

pub use memory::InMemoryTokenStore;
pub use sqlite::SqliteTokenStore;

/// Per-user token record persistence
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Record for `user_id`, if connected
    async fn get(&self, user_id: &str) -> Result<Option<TokenRecord>, StorageError>;

    /// Replace the record for `user_id`
    async fn put(&self, user_id: &str, record: &TokenRecord) -> Result<(), StorageError>;

    /// Delete the record for `user_id`; deleting a missing record is not an error
    async fn clear(&self, user_id: &str) -> Result<(), StorageError>;
}
