// ABOUTME: SQLite-backed token store using sqlx with an idempotent schema migration
// ABOUTME: put is a single INSERT .. ON CONFLICT DO UPDATE, so a record is replaced atomically
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info};

use super::TokenStore;
use vitalsync_core::errors::StorageError;
use vitalsync_core::models::{PersistedTokenRecord, TokenRecord};

/// Token records in a `SQLite` database
#[derive(Debug, Clone)]
pub struct SqliteTokenStore {
    pool: SqlitePool,
}

impl SqliteTokenStore {
    /// Connect to `database_url` (creating the file if needed) and run migrations
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, the database cannot be opened,
    /// or the schema cannot be created.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| StorageError::backend(format!("Invalid database URL: {e}")))?
            .create_if_missing(true);

        // Every pooled connection to `:memory:` would be a separate database.
        let pool_options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| StorageError::backend(format!("Failed to open database: {e}")))?;

        let store = Self { pool };
        store.migrate().await?;
        info!("SQLite token store ready");
        Ok(store)
    }

    /// Create the token table if it does not exist
    ///
    /// # Errors
    ///
    /// Returns an error if the DDL statement fails
    pub async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS wearable_tokens (
                user_id TEXT PRIMARY KEY,
                access_token TEXT NOT NULL,
                refresh_token TEXT NOT NULL,
                token_type TEXT NOT NULL,
                scope TEXT NOT NULL,
                issued_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                connected_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::backend(format!("Failed to create wearable_tokens: {e}")))?;
        Ok(())
    }

    fn row_to_record(row: &SqliteRow) -> Result<TokenRecord, StorageError> {
        let user_id: String = row.get("user_id");
        let timestamp = |column: &str| -> Result<DateTime<Utc>, StorageError> {
            let raw: String = row.get(column);
            DateTime::parse_from_rfc3339(&raw)
                .map(|parsed| parsed.with_timezone(&Utc))
                .map_err(|e| StorageError::Corrupt {
                    user_id: user_id.clone(),
                    reason: format!("invalid {column}: {e}"),
                })
        };

        TokenRecord::rehydrate(PersistedTokenRecord {
            issued_at: timestamp("issued_at")?,
            expires_at: timestamp("expires_at")?,
            connected_at: timestamp("connected_at")?,
            access_token: row.get("access_token"),
            refresh_token: row.get("refresh_token"),
            token_type: row.get("token_type"),
            scope: row.get("scope"),
            user_id: user_id.clone(),
        })
    }
}

#[async_trait]
impl TokenStore for SqliteTokenStore {
    async fn get(&self, user_id: &str) -> Result<Option<TokenRecord>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, access_token, refresh_token, token_type, scope,
                   issued_at, expires_at, connected_at
            FROM wearable_tokens
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::backend(format!("Failed to get token record: {e}")))?;

        row.map(|r| Self::row_to_record(&r)).transpose()
    }

    async fn put(&self, user_id: &str, record: &TokenRecord) -> Result<(), StorageError> {
        let persisted = record.to_persisted(user_id);
        sqlx::query(
            r"
            INSERT INTO wearable_tokens (
                user_id, access_token, refresh_token, token_type, scope,
                issued_at, expires_at, connected_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT(user_id) DO UPDATE SET
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                token_type = excluded.token_type,
                scope = excluded.scope,
                issued_at = excluded.issued_at,
                expires_at = excluded.expires_at,
                connected_at = excluded.connected_at
            ",
        )
        .bind(&persisted.user_id)
        .bind(&persisted.access_token)
        .bind(&persisted.refresh_token)
        .bind(&persisted.token_type)
        .bind(&persisted.scope)
        .bind(persisted.issued_at.to_rfc3339())
        .bind(persisted.expires_at.to_rfc3339())
        .bind(persisted.connected_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::backend(format!("Failed to upsert token record: {e}")))?;

        debug!(user_id = %user_id, "Token record stored");
        Ok(())
    }

    async fn clear(&self, user_id: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM wearable_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::backend(format!("Failed to clear token record: {e}")))?;
        debug!(user_id = %user_id, "Token record cleared");
        Ok(())
    }
}
