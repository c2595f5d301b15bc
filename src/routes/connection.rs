// ABOUTME: Wearable connection route handlers: connect redirect, OAuth callback, status, disconnect
// ABOUTME: Also serves the daily summary read so reconnect prompts surface through one error mapping
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Connection routes
//!
//! The registered redirect URI is fixed per deployment, so the callback cannot
//! carry the user id in its path. `/connect/{user_id}` drops a short-lived
//! `HttpOnly` cookie naming the user; `/oauth/callback` reads it back to find
//! whose pending authorization to check.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::resources::ServerResources;
use vitalsync_core::constants::{cookies, endpoints};
use vitalsync_core::errors::{AppError, AppResult, CallbackError};
use vitalsync_core::models::CallbackParams;

const MAX_USER_ID_LEN: usize = 128;

/// Query parameters for the daily summary endpoint
#[derive(Debug, Deserialize, Default)]
struct DailySummaryQuery {
    #[serde(default)]
    date: Option<String>,
}

/// Connection routes implementation
pub struct ConnectionRoutes;

impl ConnectionRoutes {
    /// Create all connection routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/connect/:user_id", get(Self::handle_connect))
            .route(endpoints::OAUTH_CALLBACK, get(Self::handle_callback))
            .route(
                "/connections/:user_id",
                get(Self::handle_status).delete(Self::handle_disconnect),
            )
            .route("/connections/:user_id/profile", get(Self::handle_profile))
            .route(
                "/connections/:user_id/daily-summary",
                get(Self::handle_daily_summary),
            )
            .with_state(resources)
    }

    /// Start an authorization attempt and redirect the browser to the vendor
    async fn handle_connect(
        State(resources): State<Arc<ServerResources>>,
        Path(user_id): Path<String>,
    ) -> AppResult<Response> {
        validate_user_id(&user_id)?;
        let url = resources.connections.begin(&user_id)?;
        let cookie = user_cookie(
            &user_id,
            cookies::USER_COOKIE_MAX_AGE_SECS,
            resources.config.environment.is_production(),
        );

        Ok((
            StatusCode::FOUND,
            [(header::LOCATION, url), (header::SET_COOKIE, cookie)],
        )
            .into_response())
    }

    /// Vendor redirect target
    async fn handle_callback(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(params): Query<CallbackParams>,
    ) -> AppResult<Response> {
        let user_id = cookie_value(&headers, cookies::USER_COOKIE)
            .ok_or(CallbackError::NoPendingAuthorization)?;

        let status = resources.connections.complete(&user_id, &params).await?;
        info!(user_id = %user_id, state = ?status.state, "OAuth callback completed");

        let cleared = user_cookie(&user_id, 0, resources.config.environment.is_production());
        Ok((
            StatusCode::OK,
            [(header::SET_COOKIE, cleared)],
            Json(json!({
                "status": "connected",
                "user_id": status.user_id,
                "state": status.state,
                "expires_at": status.expires_at,
                "scope": status.scope,
            })),
        )
            .into_response())
    }

    async fn handle_status(
        State(resources): State<Arc<ServerResources>>,
        Path(user_id): Path<String>,
    ) -> AppResult<Response> {
        validate_user_id(&user_id)?;
        let status = resources.connections.status(&user_id).await?;
        Ok((StatusCode::OK, Json(status)).into_response())
    }

    /// Explicit user-initiated disconnect
    async fn handle_disconnect(
        State(resources): State<Arc<ServerResources>>,
        Path(user_id): Path<String>,
    ) -> AppResult<Response> {
        validate_user_id(&user_id)?;
        resources.connections.disconnect(&user_id).await?;
        let status = resources.connections.status(&user_id).await?;
        Ok((StatusCode::OK, Json(status)).into_response())
    }

    async fn handle_profile(
        State(resources): State<Arc<ServerResources>>,
        Path(user_id): Path<String>,
    ) -> AppResult<Response> {
        validate_user_id(&user_id)?;
        let profile = resources.fitbit.profile(&user_id).await?;
        Ok((StatusCode::OK, Json(profile)).into_response())
    }

    /// Daily activity summary; `date` defaults to today (UTC)
    async fn handle_daily_summary(
        State(resources): State<Arc<ServerResources>>,
        Path(user_id): Path<String>,
        Query(query): Query<DailySummaryQuery>,
    ) -> AppResult<Response> {
        validate_user_id(&user_id)?;
        let date = match query.date.as_deref() {
            Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                AppError::invalid_input(format!("Invalid date '{raw}': expected YYYY-MM-DD"))
            })?,
            None => resources.clock.now().date_naive(),
        };

        let summary = resources.fitbit.daily_summary(&user_id, date).await?;
        Ok((StatusCode::OK, Json(summary)).into_response())
    }
}

/// User ids travel in paths and cookies, so keep them to a header-safe alphabet
fn validate_user_id(user_id: &str) -> AppResult<()> {
    let valid = !user_id.is_empty()
        && user_id.len() <= MAX_USER_ID_LEN
        && user_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'));
    if valid {
        Ok(())
    } else {
        Err(AppError::invalid_input(
            "User id must be 1-128 characters of letters, digits, '-', '_' or '.'",
        ))
    }
}

fn user_cookie(user_id: &str, max_age_secs: i64, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{}={user_id}; HttpOnly; Path=/; SameSite=Lax; Max-Age={max_age_secs}{secure}",
        cookies::USER_COOKIE
    )
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && validate_user_id(value).is_ok())
        .map(|(_, value)| value.to_owned())
}
