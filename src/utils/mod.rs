// ABOUTME: Utility modules for common functionality across the application
// ABOUTME: Contains the clock abstraction, HTTP client construction, and secret redaction
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

/// Injectable time source
pub mod clock;
/// HTTP client configuration and helpers
pub mod http_client;
/// Fingerprints and truncation for log-safe output
pub mod redact;
