// ABOUTME: Core data models for the delegated-access lifecycle
// ABOUTME: Re-exports token, pending authorization, connection state, and wearable types
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Data Models
//!
//! - `TokenRecord`: durable credential set, one per user
//! - `PendingAuthorization`: short-lived authorization attempt, one per user
//! - `ConnectionState`: derived on demand, never stored
//! - `DailySummary`: wearable data served once connected

mod authorization;
mod connection;
mod token;
mod wearable;

pub use authorization::{CallbackParams, PendingAuthorization, ValidatedCallback};
pub use connection::{ConnectionSnapshot, ConnectionState, ConnectionStatus, LastOutcome};
pub use token::{
    PersistedTokenRecord, RefreshTokenRequest, TokenExchangeRequest, TokenRecord, TokenResponse,
    TokenResponseError,
};
pub use wearable::{DailySummary, DeviceStatus, WearableProfile};
