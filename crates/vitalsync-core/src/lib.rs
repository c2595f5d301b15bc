// ABOUTME: Core types and constants for the vitalsync wearable connection service
// ABOUTME: Foundation crate with error taxonomy, token models, and connection state derivation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Vitalsync Core
//!
//! Foundation crate providing the shared types of the delegated-access token
//! lifecycle. It holds no I/O and is designed to change infrequently.
//!
//! ## Modules
//!
//! - **errors**: `AppError`, `ErrorCode`, and the typed failure taxonomy of every flow layer
//! - **constants**: Timeouts, vendor endpoints, and environment variable names
//! - **models**: `PendingAuthorization`, `TokenRecord`, and `ConnectionState`

/// Unified error handling with typed flow errors and HTTP error codes
pub mod errors;

/// Application constants organized by domain
pub mod constants;

/// Pending authorization, token record, and connection state models
pub mod models;
