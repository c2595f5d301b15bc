// ABOUTME: Builds the vendor authorization redirect and records the pending attempt
// ABOUTME: Each attempt gets a fresh 256-bit CSRF state nonce from the system CSPRNG
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ring::rand::{SecureRandom, SystemRandom};
use tracing::{error, info};
use url::Url;

use crate::config::OAuthClientConfig;
use crate::oauth2_client::session::SessionStore;
use crate::utils::clock::Clock;
use vitalsync_core::constants::{
    env_config,
    oauth::{RESPONSE_TYPE_CODE, STATE_ENTROPY_BYTES},
};
use vitalsync_core::errors::AuthorizationError;
use vitalsync_core::models::PendingAuthorization;

/// Starts authorization attempts
pub struct AuthorizationRequestBuilder {
    config: OAuthClientConfig,
    sessions: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    rng: SystemRandom,
}

impl AuthorizationRequestBuilder {
    /// Create a builder over the given session store
    #[must_use]
    pub fn new(
        config: OAuthClientConfig,
        sessions: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            sessions,
            clock,
            rng: SystemRandom::new(),
        }
    }

    /// Redirect URI used for every attempt in this deployment
    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.config.redirect_uri
    }

    /// Start an attempt for `user_id` and return the URL to send the browser to
    ///
    /// Replaces any attempt already outstanding for the user.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizationError::ConfigurationError`] when no client id is
    /// configured, [`AuthorizationError::InvalidEndpoint`] when the authorize
    /// URL does not parse, and [`AuthorizationError::RandomSource`] if the
    /// system RNG fails.
    pub fn begin(&self, user_id: &str) -> Result<String, AuthorizationError> {
        let client_id = self
            .config
            .client_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(AuthorizationError::ConfigurationError {
                key: env_config::FITBIT_CLIENT_ID,
            })?;

        let mut url =
            Url::parse(&self.config.auth_url).map_err(|_| AuthorizationError::InvalidEndpoint {
                url: self.config.auth_url.clone(),
            })?;

        let state = self.generate_state()?;

        url.query_pairs_mut()
            .append_pair("response_type", RESPONSE_TYPE_CODE)
            .append_pair("client_id", client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("state", &state);

        let replaced = self.sessions.get(user_id).is_some();
        self.sessions.put(
            user_id,
            PendingAuthorization {
                state,
                created_at: self.clock.now(),
                redirect_uri: self.config.redirect_uri.clone(),
            },
        );

        info!(
            user_id = %user_id,
            replaced_previous = replaced,
            "Authorization attempt started"
        );
        Ok(url.into())
    }

    fn generate_state(&self) -> Result<String, AuthorizationError> {
        let mut bytes = [0_u8; STATE_ENTROPY_BYTES];
        self.rng.fill(&mut bytes).map_err(|_| {
            error!("CRITICAL: SystemRandom failed - cannot generate authorization state");
            AuthorizationError::RandomSource
        })?;
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }
}
