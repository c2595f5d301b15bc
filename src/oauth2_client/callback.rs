// ABOUTME: Validates the vendor's redirect back against the pending authorization attempt
// ABOUTME: Denial, missing attempt, expiry, CSRF state, and code presence are checked in that order
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use tracing::{info, warn};

use crate::oauth2_client::session::{states_match, SessionStore};
use crate::utils::clock::Clock;
use vitalsync_core::errors::CallbackError;
use vitalsync_core::models::{CallbackParams, ValidatedCallback};

/// The single validator every callback entry point goes through
pub struct CallbackValidator {
    sessions: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
}

impl CallbackValidator {
    /// Create a validator over the given session store
    #[must_use]
    pub fn new(sessions: Arc<dyn SessionStore>, clock: Arc<dyn Clock>) -> Self {
        Self { sessions, clock }
    }

    /// Validate a callback for `user_id`
    ///
    /// On success the pending attempt is consumed and cannot be validated again.
    /// A denial carrying the attempt's state consumes it as well, and expiry
    /// deletes it. A state mismatch or missing code leaves the attempt in place,
    /// so a forged request cannot cancel the user's genuine one.
    ///
    /// # Errors
    ///
    /// Returns the first [`CallbackError`] that applies.
    pub fn validate(
        &self,
        user_id: &str,
        params: &CallbackParams,
    ) -> Result<ValidatedCallback, CallbackError> {
        if let Some(error) = &params.error {
            // The denied attempt is spent; an unrelated state cannot cancel it.
            let aborted = params
                .state
                .as_deref()
                .and_then(|state| self.sessions.consume(user_id, state))
                .is_some();
            warn!(
                user_id = %user_id,
                vendor_error = %error,
                attempt_aborted = aborted,
                "Vendor denied authorization"
            );
            return Err(CallbackError::AuthorizationDenied {
                error: error.clone(),
                description: params.error_description.clone(),
            });
        }

        let pending = self
            .sessions
            .get(user_id)
            .ok_or(CallbackError::NoPendingAuthorization)?;

        if pending.is_expired_at(self.clock.now()) {
            // Only drop the attempt we just inspected; a newer one may have replaced it.
            let _ = self.sessions.consume(user_id, &pending.state);
            warn!(user_id = %user_id, "Authorization attempt expired");
            return Err(CallbackError::SessionExpired);
        }

        let returned_state = params.state.as_deref().unwrap_or_default();
        if !states_match(&pending.state, returned_state) {
            warn!(user_id = %user_id, "Callback state does not match pending attempt");
            return Err(CallbackError::CsrfMismatch);
        }

        let code = params
            .code
            .as_deref()
            .filter(|code| !code.is_empty())
            .ok_or(CallbackError::MissingCode)?;

        let consumed = self
            .sessions
            .consume(user_id, returned_state)
            .ok_or(CallbackError::NoPendingAuthorization)?;

        info!(user_id = %user_id, "Authorization callback accepted");
        Ok(ValidatedCallback {
            code: code.to_owned(),
            redirect_uri: consumed.redirect_uri,
        })
    }
}
