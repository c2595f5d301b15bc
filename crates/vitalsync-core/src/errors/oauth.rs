// ABOUTME: Typed failure taxonomy for every layer of the delegated-access token lifecycle
// ABOUTME: Terminal vs transient classification is structural, never derived from message text
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Delegated-access flow errors
//!
//! Each component of the flow has its own error enum so callers can match on
//! exactly the failures that component can produce. Every enum answers
//! `is_terminal()` (user must re-authorize) and, where relevant,
//! `is_transient()` (a later attempt may succeed without user action).

use super::storage::StorageError;

/// Failure to start an authorization attempt
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizationError {
    /// A required OAuth setting is missing
    #[error("OAuth configuration error: {key} is not configured")]
    ConfigurationError {
        /// Name of the missing setting
        key: &'static str,
    },

    /// The configured authorization endpoint is not a valid URL
    #[error("Invalid authorization endpoint URL: {url}")]
    InvalidEndpoint {
        /// Offending URL
        url: String,
    },

    /// The system random source failed to produce a state nonce
    #[error("Secure random source unavailable")]
    RandomSource,
}

/// Rejection of an authorization callback; the user must restart the flow
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallbackError {
    /// The vendor reported an error instead of a code
    #[error("Authorization denied by vendor: {error}")]
    AuthorizationDenied {
        /// Vendor error code (e.g. `access_denied`)
        error: String,
        /// Optional human-readable reason from the vendor
        description: Option<String>,
    },

    /// No authorization attempt is outstanding for this user
    #[error("No pending authorization for this user")]
    NoPendingAuthorization,

    /// The pending authorization outlived its timeout
    #[error("Authorization session expired")]
    SessionExpired,

    /// The returned state does not match the stored nonce
    #[error("State parameter mismatch")]
    CsrfMismatch,

    /// The callback carried no authorization code
    #[error("Authorization code missing from callback")]
    MissingCode,
}

impl CallbackError {
    /// Vendor reason for a denied authorization, if any
    #[must_use]
    pub fn vendor_reason(&self) -> Option<&str> {
        match self {
            Self::AuthorizationDenied { error, description } => {
                Some(description.as_deref().unwrap_or(error))
            }
            _ => None,
        }
    }
}

/// Failure of the authorization-code exchange
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExchangeError {
    /// The broker answered non-2xx, returned an unusable body, or was unreachable
    ///
    /// `status` is `None` when no HTTP response was received (timeout, connection error).
    #[error("Token exchange failed (status {status:?}): {body}")]
    ExchangeFailed {
        /// HTTP status from the broker, if a response arrived
        status: Option<u16>,
        /// Response body or transport error description
        body: String,
    },
}

impl ExchangeError {
    /// Exchange failures are transient: the user may retry the callback flow
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        true
    }
}

/// Failure of a refresh-token grant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    /// Refresh endpoint answered 401: the refresh token expired
    #[error("Refresh token expired")]
    RefreshTokenExpired,

    /// Refresh endpoint answered 400: the refresh token is invalid or revoked
    #[error("Refresh token invalid")]
    RefreshTokenInvalid,

    /// Any other failure, including timeouts (`status` is `None` without a response)
    #[error("Token refresh failed (status {status:?})")]
    RefreshFailed {
        /// HTTP status from the broker, if a response arrived
        status: Option<u16>,
    },
}

impl RefreshError {
    /// Whether this failure destroys the stored credentials
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::RefreshTokenExpired | Self::RefreshTokenInvalid)
    }

    /// Whether a later attempt may succeed without user action
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        !self.is_terminal()
    }
}

/// Outcome of asking for a currently-valid access token
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnsureValidError {
    /// No usable credentials; the user must reconnect
    #[error("Re-authorization required")]
    ReauthRequired,

    /// Refresh failed transiently; the stored record is untouched
    #[error("Token refresh temporarily unavailable: {source}")]
    Transient {
        /// Underlying refresh failure
        #[source]
        source: RefreshError,
    },

    /// Token store failure
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl EnsureValidError {
    /// Whether the user must re-authorize
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::ReauthRequired)
    }
}

/// Failure of a vendor resource API call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VendorApiError {
    /// Credentials are gone; the presentation layer must prompt re-authorization
    #[error("Vendor connection requires reconnect")]
    NeedsReconnect,

    /// 429/5xx persisted through every retry
    #[error("Vendor API temporarily unavailable (status {status})")]
    TransientApiError {
        /// Last status observed
        status: u16,
    },

    /// Non-retryable non-2xx response
    #[error("Vendor API error (status {status}): {body}")]
    ApiError {
        /// Response status
        status: u16,
        /// Response body
        body: String,
    },

    /// No response after every retry (timeout, connection failure)
    #[error("Vendor API unreachable: {details}")]
    Transport {
        /// Transport error description
        details: String,
    },

    /// A token refresh needed for this call failed transiently
    #[error("Token refresh temporarily unavailable: {source}")]
    RefreshUnavailable {
        /// Underlying refresh failure
        #[source]
        source: RefreshError,
    },

    /// 2xx response whose body could not be parsed
    #[error("Invalid vendor API response: {details}")]
    InvalidResponse {
        /// Parse error description
        details: String,
    },

    /// Token store failure
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl VendorApiError {
    /// Whether the user must re-authorize
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::NeedsReconnect)
    }

    /// Whether the caller may retry later without user action
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::TransientApiError { .. } | Self::Transport { .. } | Self::RefreshUnavailable { .. }
        )
    }
}

impl From<EnsureValidError> for VendorApiError {
    fn from(error: EnsureValidError) -> Self {
        match error {
            EnsureValidError::ReauthRequired => Self::NeedsReconnect,
            EnsureValidError::Transient { source } => Self::RefreshUnavailable { source },
            EnsureValidError::Storage(source) => Self::Storage(source),
        }
    }
}

/// Failure of a connect (callback + exchange + persist) sequence
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    /// Starting the attempt failed
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    /// Callback rejected; restart required
    #[error(transparent)]
    Callback(#[from] CallbackError),

    /// Code exchange failed
    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    /// Token store failure
    #[error(transparent)]
    Storage(#[from] StorageError),
}
