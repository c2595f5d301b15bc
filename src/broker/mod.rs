// ABOUTME: Trusted token broker that holds the client secret and talks to the vendor token endpoint
// ABOUTME: Forwards code exchange and refresh grants and classifies vendor failures into stable statuses
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Token Broker
//!
//! The only component that ever sees the client secret. The connection flow
//! posts `{code, redirect_uri}` or `{refresh_token}` here; the broker adds
//! HTTP Basic client authentication and forwards a form-encoded grant to the
//! vendor. Successful vendor bodies are returned verbatim.
//!
//! Refresh failures are classified so the caller can tell a dead refresh
//! token (401/400) from a vendor outage (502).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::config::BrokerConfig;
use crate::utils::redact::{fingerprint, truncate_body};
use vitalsync_core::constants::vendor::ERROR_TYPE_EXPIRED_TOKEN;

/// Broker failure, rendered as `{ "error": "<message>" }`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrokerError {
    /// Client id or secret missing
    #[error("Server configuration error")]
    NotConfigured,

    /// A required body field is absent or blank
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// The body is not valid JSON
    #[error("Invalid JSON in request body")]
    InvalidJson,

    /// The vendor refused the authorization code
    #[error("Invalid authorization code")]
    InvalidCode,

    /// The vendor reported the refresh token as expired
    #[error("Refresh token expired")]
    RefreshTokenExpired,

    /// The vendor refused the refresh token
    #[error("Invalid refresh token")]
    RefreshTokenInvalid,

    /// The vendor was unreachable, overloaded, or answered unexpectedly
    #[error("Token endpoint unavailable")]
    Upstream {
        /// Vendor status, if a response arrived
        status: Option<u16>,
    },
}

impl BrokerError {
    /// HTTP status returned to the caller
    #[must_use]
    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::NotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MissingField(_)
            | Self::InvalidJson
            | Self::InvalidCode
            | Self::RefreshTokenInvalid => StatusCode::BAD_REQUEST,
            Self::RefreshTokenExpired => StatusCode::UNAUTHORIZED,
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for BrokerError {
    fn into_response(self) -> Response {
        (self.http_status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Vendor error body: `{"errors":[{"errorType": "...", "message": "..."}]}`
#[derive(Debug, Deserialize)]
struct VendorErrorBody {
    #[serde(default)]
    errors: Vec<VendorErrorEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VendorErrorEntry {
    error_type: Option<String>,
}

fn vendor_error_type(body: &str) -> Option<String> {
    serde_json::from_str::<VendorErrorBody>(body)
        .ok()?
        .errors
        .into_iter()
        .find_map(|entry| entry.error_type)
}

/// Forwards grants to the vendor token endpoint with client credentials
#[derive(Clone)]
pub struct TokenBroker {
    http: Client,
    config: BrokerConfig,
}

impl TokenBroker {
    /// Create a broker
    #[must_use]
    pub const fn new(http: Client, config: BrokerConfig) -> Self {
        Self { http, config }
    }

    /// Exchange an authorization code
    ///
    /// # Errors
    ///
    /// [`BrokerError::NotConfigured`], [`BrokerError::InvalidCode`] on any vendor
    /// non-2xx, [`BrokerError::Upstream`] on transport failure or an unreadable body.
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<Value, BrokerError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];
        let (status, body) = self.post_grant(&form).await?;

        if !status.is_success() {
            warn!(
                status = status.as_u16(),
                code = %fingerprint(code),
                body = %truncate_body(&body),
                "Vendor rejected authorization code"
            );
            return Err(BrokerError::InvalidCode);
        }

        info!(code = %fingerprint(code), "Authorization code exchanged");
        parse_token_body(status, &body)
    }

    /// Redeem a refresh token
    ///
    /// # Errors
    ///
    /// - [`BrokerError::RefreshTokenExpired`] on vendor 401 or an `expired_token` error type
    /// - [`BrokerError::RefreshTokenInvalid`] on any other vendor 400
    /// - [`BrokerError::Upstream`] on 429/5xx, other statuses, or transport failure
    pub async fn refresh(&self, refresh_token: &str) -> Result<Value, BrokerError> {
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        let (status, body) = self.post_grant(&form).await?;

        if status.is_success() {
            info!(refresh_token = %fingerprint(refresh_token), "Refresh token redeemed");
            return parse_token_body(status, &body);
        }

        let error_type = vendor_error_type(&body);
        let classified = if status == StatusCode::UNAUTHORIZED
            || error_type.as_deref() == Some(ERROR_TYPE_EXPIRED_TOKEN)
        {
            BrokerError::RefreshTokenExpired
        } else if status == StatusCode::BAD_REQUEST {
            BrokerError::RefreshTokenInvalid
        } else {
            BrokerError::Upstream {
                status: Some(status.as_u16()),
            }
        };

        warn!(
            status = status.as_u16(),
            error_type = ?error_type,
            refresh_token = %fingerprint(refresh_token),
            classified = %classified,
            "Vendor refused refresh grant"
        );
        Err(classified)
    }

    async fn post_grant(&self, form: &[(&str, &str)]) -> Result<(StatusCode, String), BrokerError> {
        let (client_id, client_secret) = self.credentials()?;
        let basic = STANDARD.encode(format!("{client_id}:{client_secret}"));

        let response = self
            .http
            .post(&self.config.token_url)
            .header("Authorization", format!("Basic {basic}"))
            .form(form)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, token_url = %self.config.token_url, "Vendor token endpoint unreachable");
                BrokerError::Upstream { status: None }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            error!(error = %e, "Failed to read vendor token response");
            BrokerError::Upstream {
                status: Some(status.as_u16()),
            }
        })?;
        Ok((status, body))
    }

    fn credentials(&self) -> Result<(&str, &str), BrokerError> {
        match (
            self.config.client_id.as_deref(),
            self.config.client_secret.as_deref(),
        ) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => Ok((id, secret)),
            _ => {
                error!("Token broker called without FITBIT_CLIENT_ID / FITBIT_CLIENT_SECRET");
                Err(BrokerError::NotConfigured)
            }
        }
    }
}

fn parse_token_body(status: StatusCode, body: &str) -> Result<Value, BrokerError> {
    serde_json::from_str(body).map_err(|e| {
        error!(error = %e, "Vendor token response is not JSON");
        BrokerError::Upstream {
            status: Some(status.as_u16()),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_error_type_extraction() {
        let body = r#"{"errors":[{"errorType":"expired_token","message":"Refresh token expired"}],"success":false}"#;
        assert_eq!(vendor_error_type(body).as_deref(), Some("expired_token"));
        assert_eq!(vendor_error_type("not json"), None);
        assert_eq!(vendor_error_type(r#"{"errors":[]}"#), None);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(BrokerError::NotConfigured.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(BrokerError::InvalidCode.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(BrokerError::RefreshTokenExpired.http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            BrokerError::Upstream { status: Some(503) }.http_status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            BrokerError::MissingField("code").to_string(),
            "Missing required field: code"
        );
    }
}
