// ABOUTME: Wearable vendor data access built on the delegated-access token lifecycle
// ABOUTME: Resilient authenticated calls, retry policy, and the Fitbit endpoint client
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

/// Fitbit Web API data client
pub mod fitbit;
/// Authenticated vendor API calls with refresh and backoff
pub mod resilient;
/// Backoff policy for transient failures
pub mod retry;

pub use fitbit::FitbitDataClient;
pub use resilient::ResilientApiClient;
pub use retry::RetryBackoffConfig;
