// ABOUTME: Pending authorization attempt and callback parameter models
// ABOUTME: A pending attempt lives for at most ten minutes and is consumed exactly once
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::oauth::PENDING_AUTHORIZATION_TIMEOUT_SECS;

/// One outstanding authorization attempt for a user
#[derive(Clone, PartialEq, Eq)]
pub struct PendingAuthorization {
    /// CSRF nonce sent as `state`
    pub state: String,
    /// When the attempt started
    pub created_at: DateTime<Utc>,
    /// Redirect URI sent to the vendor; reused verbatim for the exchange
    pub redirect_uri: String,
}

impl PendingAuthorization {
    /// Lifetime of a pending attempt
    #[must_use]
    pub fn timeout() -> Duration {
        Duration::seconds(PENDING_AUTHORIZATION_TIMEOUT_SECS)
    }

    /// Expired once strictly more than the timeout has elapsed
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at > Self::timeout()
    }
}

impl fmt::Debug for PendingAuthorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingAuthorization")
            .field("state", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

/// Query parameters on the vendor's redirect back to us
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallbackParams {
    /// Authorization code
    pub code: Option<String>,
    /// Returned CSRF nonce
    pub state: Option<String>,
    /// Vendor error code
    pub error: Option<String>,
    /// Vendor error description
    pub error_description: Option<String>,
}

/// A callback that passed validation
#[derive(Clone, PartialEq, Eq)]
pub struct ValidatedCallback {
    /// Authorization code to exchange
    pub code: String,
    /// Redirect URI of the consumed attempt
    pub redirect_uri: String,
}

impl fmt::Debug for ValidatedCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedCallback")
            .field("code", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}
