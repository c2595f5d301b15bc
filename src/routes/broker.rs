// ABOUTME: Token broker HTTP endpoints for authorization code exchange and token refresh
// ABOUTME: Validates JSON bodies and forwards grants to the secret-holding TokenBroker
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use serde_json::Value;

use crate::broker::BrokerError;
use crate::resources::ServerResources;
use vitalsync_core::constants::endpoints;

/// Broker routes implementation
pub struct BrokerRoutes;

impl BrokerRoutes {
    /// Create `/token-exchange` and `/refresh`
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(endpoints::TOKEN_EXCHANGE, post(Self::handle_token_exchange))
            .route(endpoints::REFRESH, post(Self::handle_refresh))
            .with_state(resources)
    }

    async fn handle_token_exchange(
        State(resources): State<Arc<ServerResources>>,
        body: Bytes,
    ) -> Result<Json<Value>, BrokerError> {
        let payload = parse_json(&body)?;
        let code = required_field(&payload, "code")?;
        let redirect_uri = required_field(&payload, "redirect_uri")?;

        resources
            .broker
            .exchange_code(code, redirect_uri)
            .await
            .map(Json)
    }

    async fn handle_refresh(
        State(resources): State<Arc<ServerResources>>,
        body: Bytes,
    ) -> Result<Json<Value>, BrokerError> {
        let payload = parse_json(&body)?;
        let refresh_token = required_field(&payload, "refresh_token")?;

        resources.broker.refresh(refresh_token).await.map(Json)
    }
}

/// Bodies are accepted regardless of `Content-Type`
fn parse_json(body: &[u8]) -> Result<Value, BrokerError> {
    serde_json::from_slice(body).map_err(|_| BrokerError::InvalidJson)
}

fn required_field<'a>(payload: &'a Value, field: &'static str) -> Result<&'a str, BrokerError> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty())
        .ok_or(BrokerError::MissingField(field))
}
