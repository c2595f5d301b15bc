// ABOUTME: Client for the trusted token broker that holds the OAuth client secret
// ABOUTME: Exchanges authorization codes and refresh tokens for token records, classifying failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use crate::utils::clock::Clock;
use crate::utils::redact::{fingerprint, truncate_body};
use vitalsync_core::constants::endpoints;
use vitalsync_core::errors::{ExchangeError, RefreshError};
use vitalsync_core::models::{RefreshTokenRequest, TokenExchangeRequest, TokenRecord, TokenResponse};

/// Grants that turn a code or a refresh token into a token record
#[async_trait]
pub trait TokenGrantClient: Send + Sync {
    /// Exchange an authorization code; `redirect_uri` must be the one used to obtain it
    async fn exchange(&self, code: &str, redirect_uri: &str)
        -> Result<TokenRecord, ExchangeError>;

    /// Redeem the refresh token of `previous` for its successor record
    async fn refresh(&self, previous: &TokenRecord) -> Result<TokenRecord, RefreshError>;
}

/// HTTP client for the broker's `/token-exchange` and `/refresh` endpoints
///
/// The client never sees the client secret; the broker adds it.
pub struct TokenExchangeClient {
    http: Client,
    broker_url: String,
    clock: Arc<dyn Clock>,
}

impl TokenExchangeClient {
    /// Create a client for the broker at `broker_url`
    ///
    /// `http` should carry the per-call timeout; a timed-out call is a
    /// transient failure, never a terminal one.
    #[must_use]
    pub fn new(http: Client, broker_url: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            http,
            broker_url: broker_url.into(),
            clock,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.broker_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl TokenGrantClient for TokenExchangeClient {
    async fn exchange(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenRecord, ExchangeError> {
        debug!(code = %fingerprint(code), "Exchanging authorization code");

        let response = self
            .http
            .post(self.endpoint(endpoints::TOKEN_EXCHANGE))
            .json(&TokenExchangeRequest {
                code: code.to_owned(),
                redirect_uri: redirect_uri.to_owned(),
            })
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Token exchange request failed");
                ExchangeError::ExchangeFailed {
                    status: None,
                    body: e.to_string(),
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| ExchangeError::ExchangeFailed {
            status: Some(status.as_u16()),
            body: e.to_string(),
        })?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "Token broker rejected authorization code");
            return Err(ExchangeError::ExchangeFailed {
                status: Some(status.as_u16()),
                body: truncate_body(&body),
            });
        }

        let record = serde_json::from_str::<TokenResponse>(&body)
            .map_err(|e| e.to_string())
            .and_then(|parsed| {
                TokenRecord::from_response(parsed, self.clock.now()).map_err(|e| e.to_string())
            })
            .map_err(|reason| {
                warn!(reason = %reason, "Token broker returned unusable exchange response");
                ExchangeError::ExchangeFailed {
                    status: Some(status.as_u16()),
                    body: reason,
                }
            })?;

        info!(
            access_token = %fingerprint(record.access_token()),
            expires_at = %record.expires_at(),
            "Authorization code exchanged"
        );
        Ok(record)
    }

    async fn refresh(&self, previous: &TokenRecord) -> Result<TokenRecord, RefreshError> {
        debug!(
            refresh_token = %fingerprint(previous.refresh_token()),
            "Refreshing access token"
        );

        let response = self
            .http
            .post(self.endpoint(endpoints::REFRESH))
            .json(&RefreshTokenRequest {
                refresh_token: previous.refresh_token().to_owned(),
            })
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Token refresh request failed");
                RefreshError::RefreshFailed { status: None }
            })?;

        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED => return Err(RefreshError::RefreshTokenExpired),
            StatusCode::BAD_REQUEST => return Err(RefreshError::RefreshTokenInvalid),
            s if !s.is_success() => {
                return Err(RefreshError::RefreshFailed {
                    status: Some(s.as_u16()),
                })
            }
            _ => {}
        }

        let unusable = |reason: String| {
            warn!(reason = %reason, "Token broker returned unusable refresh response");
            RefreshError::RefreshFailed {
                status: Some(status.as_u16()),
            }
        };

        let parsed = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| unusable(e.to_string()))?;
        let record = TokenRecord::from_refresh(previous, parsed, self.clock.now())
            .map_err(|e| unusable(e.to_string()))?;

        info!(
            access_token = %fingerprint(record.access_token()),
            refresh_rotated = record.refresh_token() != previous.refresh_token(),
            expires_at = %record.expires_at(),
            "Access token refreshed"
        );
        Ok(record)
    }
}
