// ABOUTME: In-memory token store for development and tests
// ABOUTME: DashMap insert replaces the whole record under the shard lock

use async_trait::async_trait;
use dashmap::DashMap;

use super::TokenStore;
use vitalsync_core::errors::StorageError;
use vitalsync_core::models::TokenRecord;

/// Token records held in process memory
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    records: DashMap<String, TokenRecord>,
}

impl InMemoryTokenStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn get(&self, user_id: &str) -> Result<Option<TokenRecord>, StorageError> {
        Ok(self.records.get(user_id).map(|entry| entry.value().clone()))
    }

    async fn put(&self, user_id: &str, record: &TokenRecord) -> Result<(), StorageError> {
        self.records.insert(user_id.to_owned(), record.clone());
        Ok(())
    }

    async fn clear(&self, user_id: &str) -> Result<(), StorageError> {
        self.records.remove(user_id);
        Ok(())
    }
}
