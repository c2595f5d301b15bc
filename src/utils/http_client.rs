// ABOUTME: Shared HTTP client utilities with connection pooling and timeout configuration
// ABOUTME: Every outbound call (exchange, refresh, vendor API) goes through a bounded-timeout client

use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// Create a new HTTP client with custom timeout settings
///
/// Both the whole request and the TCP connect are bounded, so a hung peer
/// surfaces as a transport error instead of a stuck caller. Falls back to a
/// default client if the builder fails.
#[must_use]
pub fn create_client_with_timeout(timeout_secs: u64, connect_timeout_secs: u64) -> Client {
    ClientBuilder::new()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .build()
        .unwrap_or_else(|_| Client::new())
}
