// ABOUTME: Route module organization for Vitalsync HTTP endpoints
// ABOUTME: Assembles health, token broker, and connection routes into one layered router
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Route module for Vitalsync
//!
//! Each domain module contains only route definitions and thin handlers that
//! delegate to the components held by [`ServerResources`].

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::middleware::{create_request_span, setup_cors};
use crate::resources::ServerResources;

/// Token requests and callbacks are tiny; anything larger is rejected
const MAX_REQUEST_BODY_BYTES: usize = 16 * 1024;

/// Token broker routes
pub mod broker;
/// Wearable connection routes
pub mod connection;
/// Health check routes
pub mod health;

/// Token broker route handlers
pub use broker::BrokerRoutes;
/// Connection route handlers
pub use connection::ConnectionRoutes;
/// Health check route handlers
pub use health::HealthRoutes;

/// Build the complete application router
///
/// Handlers are bounded slightly above the outbound timeout so a slow vendor
/// still yields a classified error rather than a dropped connection.
pub fn build_router(resources: Arc<ServerResources>) -> Router {
    let handler_timeout = Duration::from_secs(
        resources
            .config
            .http
            .timeout_secs
            .saturating_mul(u64::from(resources.config.retry.max_retries) + 2)
            .saturating_add(resources.config.retry.max_delay_ms / 1000),
    );
    let cors = setup_cors(&resources.config);

    Router::new()
        .merge(HealthRoutes::routes())
        .merge(BrokerRoutes::routes(Arc::clone(&resources)))
        .merge(ConnectionRoutes::routes(resources))
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .layer(TimeoutLayer::new(handler_timeout))
        .layer(cors)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(create_request_span))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
