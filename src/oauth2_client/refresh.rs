// ABOUTME: Keeps a currently-valid access token available with single-flight refresh per user
// ABOUTME: Concurrent callers share one in-flight refresh; terminal refresh failures clear the store
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Refresh Coordination
//!
//! Every write to a user's token record after the first connection goes
//! through the per-user gate held here. The gate is a slot in a [`DashMap`]
//! holding a [`Shared`] future: the first caller that finds the slot empty
//! spawns the operation and installs it, later callers clone the shared handle
//! and await the same result. The spawned task frees the slot as its last step,
//! so anyone arriving afterwards reads the freshly stored record instead.
//!
//! Vendors that rotate refresh tokens invalidate the old one on use; two
//! overlapping refreshes would make the loser look like a revoked credential.

use std::future::Future;
use std::sync::Arc;

use chrono::Duration;
use dashmap::{mapref::entry::Entry, DashMap};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, error, info, warn};

use crate::oauth2_client::exchange::TokenGrantClient;
use crate::oauth2_client::outcome::OutcomeLedger;
use crate::storage::TokenStore;
use crate::utils::clock::Clock;
use crate::utils::redact::fingerprint;
use vitalsync_core::errors::{EnsureValidError, RefreshError};
use vitalsync_core::models::{LastOutcome, TokenRecord};

type GateResult = Result<String, EnsureValidError>;
type SharedGate = Shared<BoxFuture<'static, GateResult>>;

/// What a gated operation was started for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateKind {
    Refresh,
    Install,
}

#[derive(Clone)]
struct InFlight {
    kind: GateKind,
    result: SharedGate,
}

/// Why a refresh was requested
#[derive(Debug, Clone)]
enum Trigger {
    /// Local clock says the token is (nearly) expired
    Expiry,
    /// The vendor rejected this access token with a 401
    Rejected(String),
}

struct Inner {
    store: Arc<dyn TokenStore>,
    grants: Arc<dyn TokenGrantClient>,
    clock: Arc<dyn Clock>,
    outcomes: Arc<OutcomeLedger>,
    skew: Duration,
    in_flight: DashMap<String, InFlight>,
}

/// Hands out valid access tokens, refreshing at most once at a time per user
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

impl RefreshCoordinator {
    /// Create a coordinator
    ///
    /// `skew` is subtracted from `expires_at` so a token is refreshed slightly
    /// before the vendor would reject it.
    #[must_use]
    pub fn new(
        store: Arc<dyn TokenStore>,
        grants: Arc<dyn TokenGrantClient>,
        clock: Arc<dyn Clock>,
        outcomes: Arc<OutcomeLedger>,
        skew: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                grants,
                clock,
                outcomes,
                skew,
                in_flight: DashMap::new(),
            }),
        }
    }

    /// Current access token for `user_id`, refreshing it first if it is expired
    ///
    /// A fresh token is returned without any network call.
    ///
    /// # Errors
    ///
    /// - [`EnsureValidError::ReauthRequired`] if there is no record, or the
    ///   refresh token was rejected (the record is then cleared)
    /// - [`EnsureValidError::Transient`] if the refresh failed but may succeed later
    /// - [`EnsureValidError::Storage`] if the token store failed
    pub async fn ensure_valid(&self, user_id: &str) -> GateResult {
        let record = self
            .inner
            .store
            .get(user_id)
            .await?
            .ok_or(EnsureValidError::ReauthRequired)?;

        if record.is_fresh_at(self.inner.clock.now(), self.inner.skew) {
            return Ok(record.access_token().to_owned());
        }

        debug!(user_id = %user_id, expires_at = %record.expires_at(), "Access token expired");
        self.join_or_start_refresh(user_id, Trigger::Expiry).await
    }

    /// Refresh after the vendor rejected `rejected_access_token`, regardless of local expiry
    ///
    /// If a refresh is already running its result is used; if the stored token
    /// already differs from the rejected one and is still fresh, it is returned.
    ///
    /// # Errors
    ///
    /// Same as [`Self::ensure_valid`].
    pub async fn refresh_after_rejection(
        &self,
        user_id: &str,
        rejected_access_token: &str,
    ) -> GateResult {
        let running = self
            .inner
            .in_flight
            .get(user_id)
            .map(|entry| entry.value().result.clone());

        if let Some(running) = running {
            let token = running.await?;
            if token != rejected_access_token {
                return Ok(token);
            }
        }

        self.join_or_start_refresh(
            user_id,
            Trigger::Rejected(rejected_access_token.to_owned()),
        )
        .await
    }

    /// Store the record of a new connection, ordered after any running refresh
    ///
    /// Keeps `connected_at` of a record that is being replaced.
    ///
    /// # Errors
    ///
    /// Returns [`EnsureValidError::Storage`] if the token store failed.
    pub async fn install(&self, user_id: &str, record: TokenRecord) -> GateResult {
        loop {
            let running = match self.inner.in_flight.entry(user_id.to_owned()) {
                Entry::Occupied(entry) => entry.get().result.clone(),
                Entry::Vacant(entry) => {
                    let result = spawn_gated(
                        Arc::clone(&self.inner),
                        user_id.to_owned(),
                        install_record(Arc::clone(&self.inner), user_id.to_owned(), record),
                    );
                    entry.insert(InFlight {
                        kind: GateKind::Install,
                        result: result.clone(),
                    });
                    return result.await;
                }
            };
            // Outcome of someone else's operation is irrelevant; only ordering matters.
            let _ = running.await;
        }
    }

    /// Whether a refresh is running for `user_id`
    #[must_use]
    pub fn is_refreshing(&self, user_id: &str) -> bool {
        self.inner
            .in_flight
            .get(user_id)
            .is_some_and(|entry| entry.value().kind == GateKind::Refresh)
    }

    async fn join_or_start_refresh(&self, user_id: &str, trigger: Trigger) -> GateResult {
        let result = match self.inner.in_flight.entry(user_id.to_owned()) {
            Entry::Occupied(entry) => {
                debug!(user_id = %user_id, "Joining in-flight token operation");
                entry.get().result.clone()
            }
            Entry::Vacant(entry) => {
                let result = spawn_gated(
                    Arc::clone(&self.inner),
                    user_id.to_owned(),
                    run_refresh(Arc::clone(&self.inner), user_id.to_owned(), trigger),
                );
                entry.insert(InFlight {
                    kind: GateKind::Refresh,
                    result: result.clone(),
                });
                result
            }
        };
        result.await
    }
}

/// Run `operation` on its own task so caller cancellation cannot abandon it
/// halfway, and free the user's gate slot when it finishes.
fn spawn_gated<F>(inner: Arc<Inner>, user_id: String, operation: F) -> SharedGate
where
    F: Future<Output = GateResult> + Send + 'static,
{
    let handle = tokio::spawn(async move {
        let result = operation.await;
        inner.in_flight.remove(&user_id);
        result
    });

    async move {
        handle.await.unwrap_or_else(|join_error| {
            error!(error = %join_error, "Token operation task failed");
            Err(EnsureValidError::Transient {
                source: RefreshError::RefreshFailed { status: None },
            })
        })
    }
    .boxed()
    .shared()
}

async fn run_refresh(inner: Arc<Inner>, user_id: String, trigger: Trigger) -> GateResult {
    let current = inner
        .store
        .get(&user_id)
        .await?
        .ok_or(EnsureValidError::ReauthRequired)?;

    // The record may have changed while this caller waited for the gate.
    match &trigger {
        Trigger::Expiry if current.is_fresh_at(inner.clock.now(), inner.skew) => {
            return Ok(current.access_token().to_owned());
        }
        Trigger::Rejected(rejected)
            if current.access_token() != rejected
                && current.is_fresh_at(inner.clock.now(), inner.skew) =>
        {
            return Ok(current.access_token().to_owned());
        }
        _ => {}
    }

    info!(
        user_id = %user_id,
        trigger = ?TriggerLabel::from(&trigger),
        refresh_token = %fingerprint(current.refresh_token()),
        "Refreshing access token"
    );

    match inner.grants.refresh(&current).await {
        Ok(next) => {
            inner.store.put(&user_id, &next).await?;
            inner.outcomes.record(&user_id, LastOutcome::Ok);
            Ok(next.access_token().to_owned())
        }
        Err(refresh_error) if refresh_error.is_terminal() => {
            error!(
                user_id = %user_id,
                error = %refresh_error,
                "Refresh token rejected; clearing stored credentials"
            );
            inner.store.clear(&user_id).await?;
            inner.outcomes.record(&user_id, LastOutcome::Terminal);
            Err(EnsureValidError::ReauthRequired)
        }
        Err(refresh_error) => {
            warn!(
                user_id = %user_id,
                error = %refresh_error,
                "Token refresh failed transiently; keeping stored credentials"
            );
            inner.outcomes.record(&user_id, LastOutcome::Transient);
            Err(EnsureValidError::Transient {
                source: refresh_error,
            })
        }
    }
}

async fn install_record(inner: Arc<Inner>, user_id: String, record: TokenRecord) -> GateResult {
    let record = match inner.store.get(&user_id).await? {
        Some(existing) => record.preserving_connected_at(existing.connected_at()),
        None => record,
    };
    inner.store.put(&user_id, &record).await?;
    inner.outcomes.record(&user_id, LastOutcome::Ok);
    Ok(record.access_token().to_owned())
}

/// Trigger without the token, for logging
#[derive(Debug)]
enum TriggerLabel {
    Expiry,
    Rejected,
}

impl From<&Trigger> for TriggerLabel {
    fn from(trigger: &Trigger) -> Self {
        match trigger {
            Trigger::Expiry => Self::Expiry,
            Trigger::Rejected(_) => Self::Rejected,
        }
    }
}
