// ABOUTME: Orchestrates one user's connect, callback, status, and disconnect operations
// ABOUTME: Ties authorization, callback validation, code exchange, and token installation together
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use dashmap::DashSet;
use tracing::{info, warn};

use crate::oauth2_client::authorization::AuthorizationRequestBuilder;
use crate::oauth2_client::callback::CallbackValidator;
use crate::oauth2_client::exchange::TokenGrantClient;
use crate::oauth2_client::outcome::OutcomeLedger;
use crate::oauth2_client::refresh::RefreshCoordinator;
use crate::oauth2_client::session::SessionStore;
use crate::storage::TokenStore;
use vitalsync_core::errors::{ConnectionError, EnsureValidError, StorageError};
use vitalsync_core::models::{
    CallbackParams, ConnectionSnapshot, ConnectionState, ConnectionStatus, LastOutcome,
};

/// Marks a user as exchanging for as long as it lives
struct ExchangeGuard<'a> {
    exchanging: &'a DashSet<String>,
    user_id: String,
}

impl<'a> ExchangeGuard<'a> {
    fn enter(exchanging: &'a DashSet<String>, user_id: &str) -> Self {
        exchanging.insert(user_id.to_owned());
        Self {
            exchanging,
            user_id: user_id.to_owned(),
        }
    }
}

impl Drop for ExchangeGuard<'_> {
    fn drop(&mut self) {
        self.exchanging.remove(&self.user_id);
    }
}

/// Per-user connection lifecycle
pub struct ConnectionManager {
    authorization: AuthorizationRequestBuilder,
    callbacks: CallbackValidator,
    grants: Arc<dyn TokenGrantClient>,
    coordinator: RefreshCoordinator,
    sessions: Arc<dyn SessionStore>,
    store: Arc<dyn TokenStore>,
    outcomes: Arc<OutcomeLedger>,
    exchanging: DashSet<String>,
}

impl ConnectionManager {
    /// Assemble a manager from its collaborators
    ///
    /// `coordinator` must share `store` and `outcomes` with this manager.
    #[must_use]
    pub fn new(
        authorization: AuthorizationRequestBuilder,
        callbacks: CallbackValidator,
        grants: Arc<dyn TokenGrantClient>,
        coordinator: RefreshCoordinator,
        sessions: Arc<dyn SessionStore>,
        store: Arc<dyn TokenStore>,
        outcomes: Arc<OutcomeLedger>,
    ) -> Self {
        Self {
            authorization,
            callbacks,
            grants,
            coordinator,
            sessions,
            store,
            outcomes,
            exchanging: DashSet::new(),
        }
    }

    /// Start connecting `user_id`; returns the vendor authorization URL
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::Authorization`] if OAuth settings are missing or invalid.
    pub fn begin(&self, user_id: &str) -> Result<String, ConnectionError> {
        let url = self.authorization.begin(user_id)?;
        self.outcomes.record(user_id, LastOutcome::Ok);
        Ok(url)
    }

    /// Finish connecting `user_id` from the vendor's callback parameters
    ///
    /// On success the new token record is stored and the user is connected.
    ///
    /// # Errors
    ///
    /// - [`ConnectionError::Callback`] if the callback is rejected; the user must restart
    /// - [`ConnectionError::Exchange`] if the code could not be exchanged
    /// - [`ConnectionError::Storage`] if the record could not be stored
    pub async fn complete(
        &self,
        user_id: &str,
        params: &CallbackParams,
    ) -> Result<ConnectionStatus, ConnectionError> {
        let validated = match self.callbacks.validate(user_id, params) {
            Ok(validated) => validated,
            Err(callback_error) => {
                // A forged callback must not hide a real terminal loss.
                if self.outcomes.last(user_id) != LastOutcome::Terminal {
                    self.outcomes.record(user_id, LastOutcome::Restart);
                }
                return Err(callback_error.into());
            }
        };

        let record = {
            let _exchanging = ExchangeGuard::enter(&self.exchanging, user_id);
            self.grants
                .exchange(&validated.code, &validated.redirect_uri)
                .await
                .inspect_err(|exchange_error| {
                    warn!(user_id = %user_id, error = %exchange_error, "Authorization code exchange failed");
                    self.outcomes.record(user_id, LastOutcome::Transient);
                })?
        };

        self.coordinator
            .install(user_id, record)
            .await
            .map_err(install_error)?;

        info!(user_id = %user_id, "Wearable account connected");
        self.status(user_id).await.map_err(ConnectionError::from)
    }

    /// Derived connection status of `user_id`
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the token store failed.
    pub async fn status(&self, user_id: &str) -> Result<ConnectionStatus, StorageError> {
        let record = self.store.get(user_id).await?;
        let snapshot = ConnectionSnapshot {
            has_record: record.is_some(),
            has_pending: self.sessions.get(user_id).is_some(),
            refresh_in_flight: self.coordinator.is_refreshing(user_id),
            exchange_in_flight: self.exchanging.contains(user_id),
            last_outcome: self.outcomes.last(user_id),
        };

        Ok(ConnectionStatus {
            user_id: user_id.to_owned(),
            state: ConnectionState::derive(&snapshot),
            expires_at: record.as_ref().map(|r| r.expires_at()),
            connected_at: record.as_ref().map(|r| r.connected_at()),
            scope: record.map(|r| r.scope().to_owned()),
        })
    }

    /// Forget everything held for `user_id`
    ///
    /// Credentials are not revoked at the vendor.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the token store failed.
    pub async fn disconnect(&self, user_id: &str) -> Result<(), StorageError> {
        self.store.clear(user_id).await?;
        self.sessions.remove(user_id);
        self.outcomes.record(user_id, LastOutcome::Ok);
        info!(user_id = %user_id, "Wearable account disconnected");
        Ok(())
    }

    /// Shared refresh coordinator
    #[must_use]
    pub const fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }
}

fn install_error(error: EnsureValidError) -> ConnectionError {
    match error {
        EnsureValidError::Storage(storage) => ConnectionError::Storage(storage),
        other => ConnectionError::Storage(StorageError::backend(other.to_string())),
    }
}
