// ABOUTME: Main library entry point for the Vitalsync wearable connection service
// ABOUTME: Delegated-access token lifecycle for Fitbit plus the broker and HTTP surface around it
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Vitalsync
//!
//! Connects a user's Fitbit account through the OAuth 2.0 authorization-code
//! flow and keeps a valid access token available afterwards.
//!
//! ## Architecture
//!
//! - **`oauth2_client`**: authorization requests, callback validation, code
//!   exchange, single-flight refresh, and the connection manager tying them together
//! - **`storage`**: per-user token records (in-memory or `SQLite`)
//! - **`providers`**: vendor API calls with reactive refresh and backoff
//! - **`broker`**: the only component holding the client secret
//! - **`routes`**: axum HTTP surface
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use vitalsync::config::ServerConfig;
//! use vitalsync::resources::ServerResources;
//! use vitalsync::routes::build_router;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!     let resources = Arc::new(ServerResources::from_config(config).await?);
//!     let _app = build_router(resources);
//!     Ok(())
//! }
//! ```

/// Secret-holding token broker
pub mod broker;

/// Environment configuration
pub mod config;

/// Structured logging setup
pub mod logging;

/// HTTP middleware (request spans, CORS)
pub mod middleware;

/// OAuth 2.0 client side of the connection lifecycle
pub mod oauth2_client;

/// Vendor data access
pub mod providers;

/// Shared server state
pub mod resources;

/// HTTP routes
pub mod routes;

/// Token record persistence
pub mod storage;

/// Clock, HTTP client, and log redaction helpers
pub mod utils;

pub use vitalsync_core::{constants, errors, models};
