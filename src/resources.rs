// ABOUTME: Centralized resource container built once at startup and shared by all routes
// ABOUTME: Wires config, stores, clock, broker, connection manager, and the vendor data client
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Server Resources
//!
//! Everything a handler needs is created here exactly once and handed out as
//! `Arc<ServerResources>`. The refresh coordinator in particular must be a
//! single instance per process, or its per-user gate would not be shared.

use std::sync::Arc;

use anyhow::Result;
use chrono::Duration;
use reqwest::Client;
use tracing::info;

use crate::broker::TokenBroker;
use crate::config::{DatabaseUrl, ServerConfig};
use crate::oauth2_client::{
    AuthorizationRequestBuilder, CallbackValidator, ConnectionManager, InMemorySessionStore,
    OutcomeLedger, RefreshCoordinator, SessionStore, TokenExchangeClient, TokenGrantClient,
};
use crate::providers::{FitbitDataClient, ResilientApiClient};
use crate::storage::{InMemoryTokenStore, SqliteTokenStore, TokenStore};
use crate::utils::clock::{Clock, SystemClock};
use crate::utils::http_client::create_client_with_timeout;

/// Shared server state
pub struct ServerResources {
    /// Loaded configuration
    pub config: Arc<ServerConfig>,
    /// Token record persistence
    pub token_store: Arc<dyn TokenStore>,
    /// Pending authorization attempts
    pub sessions: Arc<dyn SessionStore>,
    /// Time source
    pub clock: Arc<dyn Clock>,
    /// Connect / callback / status / disconnect
    pub connections: ConnectionManager,
    /// Vendor data reads
    pub fitbit: FitbitDataClient,
    /// Secret-holding token broker
    pub broker: TokenBroker,
}

impl ServerResources {
    /// Build resources from configuration, opening the configured token store
    ///
    /// # Errors
    ///
    /// Returns an error if the `SQLite` token store cannot be opened.
    pub async fn from_config(config: ServerConfig) -> Result<Self> {
        let token_store: Arc<dyn TokenStore> = match &config.database {
            DatabaseUrl::Memory => Arc::new(InMemoryTokenStore::new()),
            DatabaseUrl::SQLite { connection_string } => {
                Arc::new(SqliteTokenStore::connect(connection_string).await?)
            }
        };
        info!(database = %config.database, "Token store initialized");
        Ok(Self::new(config, token_store, Arc::new(SystemClock)))
    }

    /// Build resources over an existing store and clock, talking to the configured broker
    #[must_use]
    pub fn new(config: ServerConfig, token_store: Arc<dyn TokenStore>, clock: Arc<dyn Clock>) -> Self {
        let http = outbound_client(&config);
        let grants: Arc<dyn TokenGrantClient> = Arc::new(TokenExchangeClient::new(
            http,
            config.token_broker_url.clone(),
            Arc::clone(&clock),
        ));
        Self::with_grant_client(config, token_store, clock, grants)
    }

    /// Build resources with a caller-supplied grant client
    #[must_use]
    pub fn with_grant_client(
        config: ServerConfig,
        token_store: Arc<dyn TokenStore>,
        clock: Arc<dyn Clock>,
        grants: Arc<dyn TokenGrantClient>,
    ) -> Self {
        let http = outbound_client(&config);
        let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
        let outcomes = Arc::new(OutcomeLedger::new());

        let coordinator = RefreshCoordinator::new(
            Arc::clone(&token_store),
            Arc::clone(&grants),
            Arc::clone(&clock),
            Arc::clone(&outcomes),
            Duration::seconds(config.token_expiry_skew_secs),
        );

        let connections = ConnectionManager::new(
            AuthorizationRequestBuilder::new(
                config.oauth.clone(),
                Arc::clone(&sessions),
                Arc::clone(&clock),
            ),
            CallbackValidator::new(Arc::clone(&sessions), Arc::clone(&clock)),
            grants,
            coordinator.clone(),
            Arc::clone(&sessions),
            Arc::clone(&token_store),
            outcomes,
        );

        let api = ResilientApiClient::new(
            http.clone(),
            config.api_base_url.clone(),
            coordinator,
            config.retry.clone(),
        );
        let fitbit = FitbitDataClient::new(api, Arc::clone(&clock));
        let broker = TokenBroker::new(http, config.broker.clone());

        Self {
            config: Arc::new(config),
            token_store,
            sessions,
            clock,
            connections,
            fitbit,
            broker,
        }
    }
}

fn outbound_client(config: &ServerConfig) -> Client {
    create_client_with_timeout(config.http.timeout_secs, config.http.connect_timeout_secs)
}
