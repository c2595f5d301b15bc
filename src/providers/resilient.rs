// ABOUTME: Vendor resource API caller with reactive token refresh and transient-failure backoff
// ABOUTME: One refresh-and-retry on 401, bounded jittered retries on 429/5xx and transport errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use reqwest::{header::ACCEPT, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::oauth2_client::RefreshCoordinator;
use crate::providers::retry::RetryBackoffConfig;
use crate::utils::redact::truncate_body;
use vitalsync_core::errors::VendorApiError;

/// Authenticated GET client for the vendor resource API
#[derive(Clone)]
pub struct ResilientApiClient {
    http: Client,
    base_url: String,
    coordinator: RefreshCoordinator,
    retry: RetryBackoffConfig,
}

/// What to do after one attempt
enum Attempt<T> {
    Done(T),
    Unauthorized(String),
    Retryable(VendorApiError),
}

impl ResilientApiClient {
    /// Create a client rooted at `base_url` (e.g. `https://api.fitbit.com`)
    #[must_use]
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        coordinator: RefreshCoordinator,
        retry: RetryBackoffConfig,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            coordinator,
            retry,
        }
    }

    /// GET `path` on behalf of `user_id` and parse the JSON body
    ///
    /// A valid token is obtained first; without one no request is sent. A 401
    /// triggers one reactive refresh and exactly one retry. 429, 5xx and
    /// transport failures are retried up to `max_retries` times with backoff.
    /// 2xx bodies are returned as parsed, whatever they contain.
    ///
    /// # Errors
    ///
    /// - [`VendorApiError::NeedsReconnect`] when credentials are gone
    /// - [`VendorApiError::RefreshUnavailable`] when a needed refresh failed transiently
    /// - [`VendorApiError::TransientApiError`] / [`VendorApiError::Transport`] after exhausting retries
    /// - [`VendorApiError::ApiError`] for any other non-2xx, including a second 401
    /// - [`VendorApiError::InvalidResponse`] when a 2xx body is not the expected JSON
    pub async fn call<T: DeserializeOwned>(
        &self,
        user_id: &str,
        path: &str,
    ) -> Result<T, VendorApiError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut token = self.coordinator.ensure_valid(user_id).await?;
        let mut refreshed = false;
        let mut retries = 0_u32;

        loop {
            match self.attempt(user_id, &url, &token, retries).await? {
                Attempt::Done(body) => return parse_body(&body),
                Attempt::Unauthorized(body) => {
                    if refreshed {
                        return Err(VendorApiError::ApiError {
                            status: StatusCode::UNAUTHORIZED.as_u16(),
                            body,
                        });
                    }
                    refreshed = true;
                    debug!(user_id = %user_id, "Vendor rejected access token; refreshing");
                    token = self
                        .coordinator
                        .refresh_after_rejection(user_id, &token)
                        .await?;
                }
                Attempt::Retryable(error) => {
                    if retries >= self.retry.max_retries {
                        return Err(error);
                    }
                    retries += 1;
                    let delay = self.retry.delay_for_attempt(retries);
                    warn!(
                        user_id = %user_id,
                        retry = retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Transient vendor API failure; backing off"
                    );
                    sleep(delay).await;
                    // The token may have expired while waiting.
                    token = self.coordinator.ensure_valid(user_id).await?;
                }
            }
        }
    }

    async fn attempt(
        &self,
        user_id: &str,
        url: &str,
        token: &str,
        retries: u32,
    ) -> Result<Attempt<String>, VendorApiError> {
        let response = match self
            .http
            .get(url)
            .bearer_auth(token)
            .header(ACCEPT, "application/json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(transport) => {
                return Ok(Attempt::Retryable(VendorApiError::Transport {
                    details: transport.to_string(),
                }))
            }
        };

        let status = response.status();
        debug!(user_id = %user_id, status = status.as_u16(), attempt = retries + 1, url = %url, "Vendor API response");

        if status.is_success() {
            return read_body(response).await.map(Attempt::Done);
        }

        let body = truncate_body(&response.text().await.unwrap_or_default());
        if status == StatusCode::UNAUTHORIZED {
            return Ok(Attempt::Unauthorized(body));
        }
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Ok(Attempt::Retryable(VendorApiError::TransientApiError {
                status: status.as_u16(),
            }));
        }

        warn!(user_id = %user_id, status = status.as_u16(), "Vendor API request failed");
        Err(VendorApiError::ApiError {
            status: status.as_u16(),
            body,
        })
    }
}

async fn read_body(response: Response) -> Result<String, VendorApiError> {
    response
        .text()
        .await
        .map_err(|e| VendorApiError::InvalidResponse {
            details: format!("Failed to read response body: {e}"),
        })
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, VendorApiError> {
    serde_json::from_str(body).map_err(|e| VendorApiError::InvalidResponse {
        details: format!("Failed to parse API response: {e}"),
    })
}
