// ABOUTME: Unified error handling with standard error codes and HTTP response formatting
// ABOUTME: Maps the typed delegated-access flow errors onto stable client-facing codes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Unified Error Handling System
//!
//! Flow components return the typed errors in [`oauth`] and [`storage`]. The HTTP
//! surface converts them into an [`AppError`], whose [`ErrorCode`] decides the
//! status code and tells clients whether to retry later or restart authorization.

/// Delegated-access flow errors
pub mod oauth;
/// Token and session storage errors
pub mod storage;

pub use oauth::{
    AuthorizationError, CallbackError, ConnectionError, EnsureValidError, ExchangeError,
    RefreshError, VendorApiError,
};
pub use storage::StorageError;

use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(feature = "http-response")]
use axum::{
    response::{IntoResponse, Response},
    Json,
};
#[cfg(feature = "http-response")]
use http::StatusCode;

/// Standard error codes used throughout the application
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Authorization flow (1000-1999)
    /// The authorization attempt was aborted and must be restarted
    #[serde(rename = "AUTHORIZATION_RESTART_REQUIRED")]
    AuthorizationRestartRequired = 1000,
    /// Stored credentials are gone; the user must reconnect
    #[serde(rename = "RECONNECT_REQUIRED")]
    ReconnectRequired = 1001,

    // Validation (3000-3999)
    /// Generic invalid input
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput = 3000,

    // External Services (5000-5999)
    /// Upstream service returned a non-retryable error
    #[serde(rename = "EXTERNAL_SERVICE_ERROR")]
    ExternalServiceError = 5000,
    /// Upstream service temporarily unavailable
    #[serde(rename = "EXTERNAL_SERVICE_UNAVAILABLE")]
    ExternalServiceUnavailable = 5001,

    // Configuration (6000-6999)
    /// Required configuration is missing
    #[serde(rename = "CONFIG_MISSING")]
    ConfigMissing = 6001,

    // Internal Errors (9000-9999)
    /// Unexpected internal failure
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError = 9000,
    /// Storage backend failure
    #[serde(rename = "STORAGE_ERROR")]
    StorageError = 9002,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::AuthorizationRestartRequired | Self::InvalidInput => 400,

            Self::ReconnectRequired => 401,

            Self::ExternalServiceError => 502,

            Self::ExternalServiceUnavailable => 503,

            Self::ConfigMissing | Self::InternalError | Self::StorageError => 500,
        }
    }

    /// Get a user-friendly description of this error
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::AuthorizationRestartRequired => {
                "The authorization attempt failed. Please start connecting again"
            }
            Self::ReconnectRequired => "Your device connection expired. Please reconnect",
            Self::InvalidInput => "The provided input is invalid",
            Self::ExternalServiceError => "An external service encountered an error",
            Self::ExternalServiceUnavailable => "Temporarily unavailable, try again",
            Self::ConfigMissing => "Required configuration is missing",
            Self::InternalError => "An internal server error occurred",
            Self::StorageError => "Storage operation failed",
        }
    }
}

/// Unified error type for the HTTP surface
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Invalid input
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Internal server error
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.code.http_status()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// HTTP error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error payload
    pub error: ErrorResponseDetails,
}

/// Body of an [`ErrorResponse`]
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponseDetails {
    /// Machine-readable code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        Self {
            error: ErrorResponseDetails {
                code: error.code,
                message: error.message,
            },
        }
    }
}

#[cfg(feature = "http-response")]
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorResponse::from(self))).into_response()
    }
}

impl From<StorageError> for AppError {
    fn from(error: StorageError) -> Self {
        tracing::error!(error = %error, "Storage failure surfaced to HTTP layer");
        Self::new(ErrorCode::StorageError, "Storage operation failed")
    }
}

impl From<AuthorizationError> for AppError {
    fn from(error: AuthorizationError) -> Self {
        match error {
            AuthorizationError::ConfigurationError { .. }
            | AuthorizationError::InvalidEndpoint { .. } => {
                Self::new(ErrorCode::ConfigMissing, error.to_string())
            }
            AuthorizationError::RandomSource => Self::internal(error.to_string()),
        }
    }
}

impl From<CallbackError> for AppError {
    fn from(error: CallbackError) -> Self {
        let message = match &error {
            CallbackError::AuthorizationDenied { .. } => format!(
                "Authorization was denied ({}). Please try again",
                error.vendor_reason().unwrap_or("unknown reason")
            ),
            CallbackError::NoPendingAuthorization => {
                "No authorization in progress. Please start connecting again".to_owned()
            }
            CallbackError::SessionExpired => {
                "The authorization session expired. Please start connecting again".to_owned()
            }
            CallbackError::CsrfMismatch => {
                "Invalid state parameter. Please start connecting again".to_owned()
            }
            CallbackError::MissingCode => {
                "Authorization code missing. Please start connecting again".to_owned()
            }
        };
        Self::new(ErrorCode::AuthorizationRestartRequired, message)
    }
}

impl From<ExchangeError> for AppError {
    fn from(error: ExchangeError) -> Self {
        let ExchangeError::ExchangeFailed { status, .. } = &error;
        tracing::warn!(status = ?status, "Token exchange failed");
        Self::new(
            ErrorCode::ExternalServiceUnavailable,
            "Could not complete the connection. Please try again",
        )
    }
}

impl From<EnsureValidError> for AppError {
    fn from(error: EnsureValidError) -> Self {
        match error {
            EnsureValidError::ReauthRequired => Self::new(
                ErrorCode::ReconnectRequired,
                "Reconnect required to continue syncing",
            ),
            EnsureValidError::Transient { .. } => Self::new(
                ErrorCode::ExternalServiceUnavailable,
                "Device data temporarily unavailable, try again",
            ),
            EnsureValidError::Storage(source) => source.into(),
        }
    }
}

impl From<VendorApiError> for AppError {
    fn from(error: VendorApiError) -> Self {
        match error {
            VendorApiError::NeedsReconnect => Self::new(
                ErrorCode::ReconnectRequired,
                "Reconnect required to continue syncing",
            ),
            VendorApiError::TransientApiError { .. }
            | VendorApiError::Transport { .. }
            | VendorApiError::RefreshUnavailable { .. } => Self::new(
                ErrorCode::ExternalServiceUnavailable,
                "Device data temporarily unavailable, try again",
            ),
            VendorApiError::ApiError { status, .. } => Self::new(
                ErrorCode::ExternalServiceError,
                format!("Device vendor returned status {status}"),
            ),
            VendorApiError::InvalidResponse { details } => Self::new(
                ErrorCode::ExternalServiceError,
                format!("Unexpected device vendor response: {details}"),
            ),
            VendorApiError::Storage(source) => source.into(),
        }
    }
}

impl From<ConnectionError> for AppError {
    fn from(error: ConnectionError) -> Self {
        match error {
            ConnectionError::Authorization(source) => source.into(),
            ConnectionError::Callback(source) => source.into(),
            ConnectionError::Exchange(source) => source.into(),
            ConnectionError::Storage(source) => source.into(),
        }
    }
}
