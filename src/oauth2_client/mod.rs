// ABOUTME: OAuth 2.0 client side of the wearable connection: authorize, callback, exchange, refresh
// ABOUTME: Owns the per-user token lifecycle from first redirect to reconnect
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # OAuth 2.0 Client Module
//!
//! Vitalsync acts as an OAuth 2.0 client of the wearable vendor on behalf of
//! users. This module handles:
//! - Authorization requests with a per-user CSRF state nonce
//! - Callback validation and single-use consumption of that nonce
//! - Code exchange and refresh through the token broker
//! - Single-flight refresh so rotated refresh tokens are never used twice

/// Authorization URL construction
pub mod authorization;
/// Callback validation
pub mod callback;
/// Connect / status / disconnect orchestration
pub mod connection;
/// Code exchange and refresh grants via the token broker
pub mod exchange;
/// Last lifecycle outcome per user
pub mod outcome;
/// Single-flight token refresh
pub mod refresh;
/// Pending authorization storage
pub mod session;

pub use authorization::AuthorizationRequestBuilder;
pub use callback::CallbackValidator;
pub use connection::ConnectionManager;
pub use exchange::{TokenExchangeClient, TokenGrantClient};
pub use outcome::OutcomeLedger;
pub use refresh::RefreshCoordinator;
pub use session::{InMemorySessionStore, SessionStore};
