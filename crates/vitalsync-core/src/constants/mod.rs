// ABOUTME: Constants module with domain-separated organization
// ABOUTME: OAuth timing, vendor endpoints, retry defaults, and environment variable names
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Constants module
//!
//! Constants are grouped into logical domains rather than being in a single large file.

/// Wearable vendor (Fitbit) endpoints and scope defaults
pub mod vendor;

/// Delegated-access timing and sizing constants
pub mod oauth {
    /// Lifetime of a pending authorization attempt (10 minutes)
    pub const PENDING_AUTHORIZATION_TIMEOUT_SECS: i64 = 600;

    /// Bytes of entropy in a CSRF state nonce (256 bits)
    pub const STATE_ENTROPY_BYTES: usize = 32;

    /// Safety margin subtracted from `expires_at` before a token counts as expired
    pub const DEFAULT_EXPIRY_SKEW_SECS: i64 = 60;

    /// Upper bound accepted for a server-granted `expires_in` (one year)
    pub const MAX_EXPIRES_IN_SECS: i64 = 31_536_000;

    /// OAuth response type requested from the authorization server
    pub const RESPONSE_TYPE_CODE: &str = "code";

    /// Token type assumed when the server omits one
    pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";
}

/// HTTP client timeouts
pub mod network {
    /// Per-call request timeout for exchange, refresh, and vendor API calls
    pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

    /// TCP connect timeout
    pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

    /// Maximum number of characters of an upstream error body kept in errors and logs
    pub const MAX_ERROR_BODY_CHARS: usize = 1024;
}

/// Retry and backoff defaults for vendor API calls
pub mod retry {
    /// Retries after the initial attempt for 429/5xx responses
    pub const DEFAULT_MAX_RETRIES: u32 = 2;

    /// Base delay for exponential backoff
    pub const DEFAULT_BASE_DELAY_MS: u64 = 2000;

    /// Ceiling for a single backoff delay
    pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;

    /// Fraction of the computed delay used as +/- jitter
    pub const DEFAULT_JITTER_FACTOR: f64 = 0.25;
}

/// HTTP routes served by the binary
pub mod endpoints {
    /// Trusted backend: authorization-code exchange
    pub const TOKEN_EXCHANGE: &str = "/token-exchange";
    /// Trusted backend: refresh-token grant
    pub const REFRESH: &str = "/refresh";
    /// Health check endpoint
    pub const HEALTH_CHECK: &str = "/health";
    /// Readiness endpoint
    pub const READY: &str = "/ready";
    /// OAuth redirect landing route
    pub const OAUTH_CALLBACK: &str = "/oauth/callback";
}

/// Network ports
pub mod ports {
    /// Default HTTP port
    pub const DEFAULT_HTTP_PORT: u16 = 8081;
}

/// Service names used in structured logs
pub mod service_names {
    /// Server binary service name
    pub const VITALSYNC_SERVER: &str = "vitalsync-server";
}

/// Cookie names
pub mod cookies {
    /// Identifies whose pending authorization a callback belongs to
    pub const USER_COOKIE: &str = "vitalsync_user";

    /// Cookie lifetime, matching the pending authorization timeout
    pub const USER_COOKIE_MAX_AGE_SECS: i64 = super::oauth::PENDING_AUTHORIZATION_TIMEOUT_SECS;
}

/// Environment variable names
pub mod env_config {
    /// HTTP listen port
    pub const HTTP_PORT: &str = "HTTP_PORT";
    /// Deployment environment (development, production, testing)
    pub const ENVIRONMENT: &str = "ENVIRONMENT";
    /// OAuth client identifier
    pub const FITBIT_CLIENT_ID: &str = "FITBIT_CLIENT_ID";
    /// OAuth client secret (token broker only)
    pub const FITBIT_CLIENT_SECRET: &str = "FITBIT_CLIENT_SECRET";
    /// Vendor authorization endpoint
    pub const FITBIT_AUTH_URL: &str = "FITBIT_AUTH_URL";
    /// Vendor token endpoint
    pub const FITBIT_TOKEN_URL: &str = "FITBIT_TOKEN_URL";
    /// Vendor resource API base URL
    pub const FITBIT_API_BASE_URL: &str = "FITBIT_API_BASE_URL";
    /// Space-separated scopes
    pub const FITBIT_SCOPES: &str = "FITBIT_SCOPES";
    /// Redirect URI used outside production
    pub const FITBIT_REDIRECT_URI_DEV: &str = "FITBIT_REDIRECT_URI_DEV";
    /// Redirect URI used in production
    pub const FITBIT_REDIRECT_URI_PROD: &str = "FITBIT_REDIRECT_URI_PROD";
    /// Base URL of the trusted token broker
    pub const TOKEN_BROKER_URL: &str = "TOKEN_BROKER_URL";
    /// Per-call HTTP timeout
    pub const HTTP_TIMEOUT_SECS: &str = "HTTP_TIMEOUT_SECS";
    /// HTTP connect timeout
    pub const HTTP_CONNECT_TIMEOUT_SECS: &str = "HTTP_CONNECT_TIMEOUT_SECS";
    /// Expiry safety margin
    pub const TOKEN_EXPIRY_SKEW_SECS: &str = "TOKEN_EXPIRY_SKEW_SECS";
    /// Vendor API retries after the first attempt
    pub const RETRY_MAX_RETRIES: &str = "RETRY_MAX_RETRIES";
    /// Backoff base delay
    pub const RETRY_BASE_DELAY_MS: &str = "RETRY_BASE_DELAY_MS";
    /// Backoff ceiling
    pub const RETRY_MAX_DELAY_MS: &str = "RETRY_MAX_DELAY_MS";
    /// Backoff jitter fraction
    pub const RETRY_JITTER_FACTOR: &str = "RETRY_JITTER_FACTOR";
    /// Token store location (`memory` or a `sqlite:` URL)
    pub const DATABASE_URL: &str = "DATABASE_URL";
    /// Comma-separated browser origins allowed to call the API, or `*`
    pub const CORS_ALLOWED_ORIGINS: &str = "CORS_ALLOWED_ORIGINS";
}
