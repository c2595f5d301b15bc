// ABOUTME: Delegated-access token record and the token endpoint wire types
// ABOUTME: TokenRecord keeps expiry derived from issue time so it cannot drift from the access token
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::oauth::{DEFAULT_TOKEN_TYPE, MAX_EXPIRES_IN_SECS};
use crate::errors::StorageError;

/// Body sent to the broker's code exchange endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenExchangeRequest {
    /// Authorization code from the callback
    pub code: String,
    /// Redirect URI used for the original authorization request
    pub redirect_uri: String,
}

/// Body sent to the broker's refresh endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenRequest {
    /// Refresh token to redeem
    pub refresh_token: String,
}

/// Token endpoint response, as relayed by the broker
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// New access token
    pub access_token: String,
    /// New refresh token; vendors that do not rotate may omit it on refresh
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Token type, usually `Bearer`
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime of the access token in seconds
    pub expires_in: i64,
    /// Granted scopes, space separated
    #[serde(default)]
    pub scope: Option<String>,
    /// Vendor user id, when the vendor includes it
    #[serde(default)]
    pub user_id: Option<String>,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// Why a token response cannot become a [`TokenRecord`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenResponseError {
    /// `access_token` was empty
    #[error("token response has an empty access_token")]
    MissingAccessToken,
    /// First exchange returned no `refresh_token`
    #[error("token response has no refresh_token")]
    MissingRefreshToken,
    /// `expires_in` was non-positive or implausibly large
    #[error("token response has invalid expires_in: {0}")]
    InvalidExpiresIn(i64),
}

/// Durable per-user credential set
///
/// Fields are private: a record is only built from a validated token response
/// or rehydrated from storage, so `expires_at` always belongs to `access_token`.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenRecord {
    access_token: String,
    refresh_token: String,
    token_type: String,
    scope: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    connected_at: DateTime<Utc>,
}

impl TokenRecord {
    /// Build the first record of a connection from an exchange response
    ///
    /// # Errors
    ///
    /// Returns an error if the response lacks a refresh token or carries an
    /// unusable access token or lifetime.
    pub fn from_response(
        response: TokenResponse,
        issued_at: DateTime<Utc>,
    ) -> Result<Self, TokenResponseError> {
        let refresh_token = response
            .refresh_token
            .clone()
            .filter(|token| !token.is_empty())
            .ok_or(TokenResponseError::MissingRefreshToken)?;
        Self::build(response, refresh_token, issued_at, issued_at)
    }

    /// Build the successor of `previous` from a refresh response
    ///
    /// Keeps the previous refresh token when the vendor did not rotate it and
    /// never moves `connected_at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the response carries an unusable access token or lifetime.
    pub fn from_refresh(
        previous: &Self,
        response: TokenResponse,
        issued_at: DateTime<Utc>,
    ) -> Result<Self, TokenResponseError> {
        let refresh_token = response
            .refresh_token
            .clone()
            .filter(|token| !token.is_empty())
            .unwrap_or_else(|| previous.refresh_token.clone());
        Self::build(response, refresh_token, issued_at, previous.connected_at)
    }

    fn build(
        response: TokenResponse,
        refresh_token: String,
        issued_at: DateTime<Utc>,
        connected_at: DateTime<Utc>,
    ) -> Result<Self, TokenResponseError> {
        if response.access_token.is_empty() {
            return Err(TokenResponseError::MissingAccessToken);
        }
        if response.expires_in <= 0 || response.expires_in > MAX_EXPIRES_IN_SECS {
            return Err(TokenResponseError::InvalidExpiresIn(response.expires_in));
        }

        Ok(Self {
            access_token: response.access_token,
            refresh_token,
            token_type: response
                .token_type
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_owned()),
            scope: response.scope.unwrap_or_default(),
            issued_at,
            expires_at: issued_at + Duration::seconds(response.expires_in),
            connected_at,
        })
    }

    /// Same credentials, but with the connection start time of an earlier record
    #[must_use]
    pub fn preserving_connected_at(mut self, connected_at: DateTime<Utc>) -> Self {
        self.connected_at = connected_at;
        self
    }

    /// Restore a record read back from persistent storage
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Corrupt`] if a credential is empty or the
    /// timestamps are inconsistent.
    pub fn rehydrate(persisted: PersistedTokenRecord) -> Result<Self, StorageError> {
        let reason = if persisted.access_token.is_empty() {
            Some("empty access token")
        } else if persisted.refresh_token.is_empty() {
            Some("empty refresh token")
        } else if persisted.expires_at <= persisted.issued_at {
            Some("expires_at is not after issued_at")
        } else {
            None
        };

        if let Some(reason) = reason {
            return Err(StorageError::Corrupt {
                user_id: persisted.user_id,
                reason: reason.to_owned(),
            });
        }

        Ok(Self {
            access_token: persisted.access_token,
            refresh_token: persisted.refresh_token,
            token_type: persisted.token_type,
            scope: persisted.scope,
            issued_at: persisted.issued_at,
            expires_at: persisted.expires_at,
            connected_at: persisted.connected_at,
        })
    }

    /// Flatten into the persisted layout for `user_id`
    #[must_use]
    pub fn to_persisted(&self, user_id: &str) -> PersistedTokenRecord {
        PersistedTokenRecord {
            user_id: user_id.to_owned(),
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            token_type: self.token_type.clone(),
            scope: self.scope.clone(),
            issued_at: self.issued_at,
            expires_at: self.expires_at,
            connected_at: self.connected_at,
        }
    }

    /// Whether the access token is still usable at `now` with a `skew` safety margin
    #[must_use]
    pub fn is_fresh_at(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        now < self.expires_at - skew
    }

    /// Bearer credential
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Credential used to mint new access tokens
    #[must_use]
    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    /// Token type echoed by the authorization server
    #[must_use]
    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    /// Granted scopes
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// When the current access token was issued
    #[must_use]
    pub const fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// When the current access token expires
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// First successful connection time
    #[must_use]
    pub const fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }
}

impl fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRecord")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .field("connected_at", &self.connected_at)
            .finish()
    }
}

/// Flat storage layout of a [`TokenRecord`], keyed by user id
#[derive(Clone, PartialEq, Eq)]
pub struct PersistedTokenRecord {
    /// Owner
    pub user_id: String,
    /// Access token
    pub access_token: String,
    /// Refresh token
    pub refresh_token: String,
    /// Token type
    pub token_type: String,
    /// Granted scopes
    pub scope: String,
    /// Issue time
    pub issued_at: DateTime<Utc>,
    /// Expiry time
    pub expires_at: DateTime<Utc>,
    /// First connection time
    pub connected_at: DateTime<Utc>,
}

impl fmt::Debug for PersistedTokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistedTokenRecord")
            .field("user_id", &self.user_id)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}
