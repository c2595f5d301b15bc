// ABOUTME: Wearable vendor endpoint constants for the Fitbit Web API
// ABOUTME: Authorization, token, and resource URLs plus the default scope set
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Vendor identifier used in logs
pub const FITBIT: &str = "fitbit";

/// Authorization endpoint the browser is redirected to
pub const FITBIT_AUTH_URL: &str = "https://www.fitbit.com/oauth2/authorize";

/// Token endpoint (only the token broker talks to it)
pub const FITBIT_TOKEN_URL: &str = "https://api.fitbit.com/oauth2/token";

/// Resource API base URL
pub const FITBIT_API_BASE_URL: &str = "https://api.fitbit.com";

/// Scopes requested when `FITBIT_SCOPES` is unset
pub const FITBIT_DEFAULT_SCOPES: &str =
    "activity heartrate location nutrition profile settings sleep social weight";

/// Redirect URI used in development when none is configured
pub const DEFAULT_DEV_REDIRECT_URI: &str = "http://localhost:8081/oauth/callback";

/// Vendor error type signalling an expired refresh token
pub const ERROR_TYPE_EXPIRED_TOKEN: &str = "expired_token";

/// Minutes within which a device sync counts as recent
pub const RECENT_SYNC_MINUTES: i64 = 30;
