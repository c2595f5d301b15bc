// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Handles environment variables, deployment modes, and per-environment redirect URIs
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Environment-based configuration management for production deployment

use std::env;
use std::error::Error as StdError;
use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

use crate::providers::retry::RetryBackoffConfig;
use crate::utils::redact::fingerprint;
use vitalsync_core::constants::{
    env_config, network, oauth, ports,
    vendor::{
        DEFAULT_DEV_REDIRECT_URI, FITBIT_API_BASE_URL, FITBIT_AUTH_URL, FITBIT_DEFAULT_SCOPES,
        FITBIT_TOKEN_URL,
    },
};

/// Environment type for redirect URI selection and logging defaults
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development
    #[default]
    Development,
    /// Deployed service
    Production,
    /// Automated tests
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Where token records are persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DatabaseUrl {
    /// Process-local map; records are lost on restart
    #[default]
    Memory,
    /// `SQLite` database at the given connection string
    SQLite {
        /// Full `sqlite:` connection string
        connection_string: String,
    },
}

impl DatabaseUrl {
    /// Parse from string with validation
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is neither `memory` nor a `sqlite:` URL.
    pub fn parse_url(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("memory") {
            Ok(Self::Memory)
        } else if trimmed.starts_with("sqlite:") {
            Ok(Self::SQLite {
                connection_string: trimmed.to_owned(),
            })
        } else {
            Err(anyhow!(
                "Unsupported {}: expected 'memory' or a 'sqlite:' URL",
                env_config::DATABASE_URL
            ))
        }
    }

    /// Check if this is the in-process store
    #[must_use]
    pub const fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

impl fmt::Display for DatabaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::SQLite { connection_string } => write!(f, "{connection_string}"),
        }
    }
}

/// Settings for building the authorization redirect
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthClientConfig {
    /// OAuth client identifier; `None` makes `begin` fail with a configuration error
    pub client_id: Option<String>,
    /// Vendor authorization endpoint
    pub auth_url: String,
    /// Requested scopes
    pub scopes: Vec<String>,
    /// Redirect URI registered for the current environment
    pub redirect_uri: String,
}

impl Default for OAuthClientConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            auth_url: FITBIT_AUTH_URL.to_owned(),
            scopes: parse_scopes(FITBIT_DEFAULT_SCOPES),
            redirect_uri: DEFAULT_DEV_REDIRECT_URI.to_owned(),
        }
    }
}

/// Settings for the trusted token broker, the only holder of the client secret
#[derive(Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// OAuth client identifier
    pub client_id: Option<String>,
    /// OAuth client secret
    #[serde(skip_serializing)]
    pub client_secret: Option<String>,
    /// Vendor token endpoint
    pub token_url: String,
}

impl BrokerConfig {
    /// Get a fingerprint of the client secret for logging (first 8 hex chars of SHA-256)
    #[must_use]
    pub fn secret_fingerprint(&self) -> Option<String> {
        self.client_secret.as_deref().map(fingerprint)
    }

    /// Whether both credentials are present
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.client_id.as_deref().is_some_and(|id| !id.is_empty())
            && self
                .client_secret
                .as_deref()
                .is_some_and(|secret| !secret.is_empty())
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            token_url: FITBIT_TOKEN_URL.to_owned(),
        }
    }
}

impl fmt::Debug for BrokerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.secret_fingerprint())
            .field("token_url", &self.token_url)
            .finish()
    }
}

/// Outbound HTTP timeouts
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HttpClientConfig {
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,
    /// TCP connect timeout in seconds
    pub connect_timeout_secs: u64,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: network::DEFAULT_HTTP_TIMEOUT_SECS,
            connect_timeout_secs: network::DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

/// Complete server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,
    /// Deployment environment
    pub environment: Environment,
    /// Authorization redirect settings
    pub oauth: OAuthClientConfig,
    /// Token broker settings
    pub broker: BrokerConfig,
    /// Base URL of the broker the exchange client talks to
    pub token_broker_url: String,
    /// Vendor resource API base URL
    pub api_base_url: String,
    /// Outbound timeouts
    pub http: HttpClientConfig,
    /// Safety margin before `expires_at`, in seconds
    pub token_expiry_skew_secs: i64,
    /// Vendor API backoff policy
    pub retry: RetryBackoffConfig,
    /// Token store location
    pub database: DatabaseUrl,
    /// Browser origins allowed by CORS (`*` or a comma-separated list)
    pub cors_allowed_origins: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: ports::DEFAULT_HTTP_PORT,
            environment: Environment::default(),
            oauth: OAuthClientConfig::default(),
            broker: BrokerConfig::default(),
            token_broker_url: format!("http://localhost:{}", ports::DEFAULT_HTTP_PORT),
            api_base_url: FITBIT_API_BASE_URL.to_owned(),
            http: HttpClientConfig::default(),
            token_expiry_skew_secs: oauth::DEFAULT_EXPIRY_SKEW_SECS,
            retry: RetryBackoffConfig::default(),
            database: DatabaseUrl::default(),
            cors_allowed_origins: "*".to_owned(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable does not parse, a URL is
    /// malformed, or production runs without a production redirect URI.
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        let environment = Environment::from_str_or_default(&env_var_or(
            env_config::ENVIRONMENT,
            "development",
        ));
        let client_id = optional_env(env_config::FITBIT_CLIENT_ID);

        let config = Self {
            http_port: parse_env_or(env_config::HTTP_PORT, ports::DEFAULT_HTTP_PORT)?,
            environment,
            oauth: OAuthClientConfig {
                client_id: client_id.clone(),
                auth_url: env_var_or(env_config::FITBIT_AUTH_URL, FITBIT_AUTH_URL),
                scopes: parse_scopes(&env_var_or(
                    env_config::FITBIT_SCOPES,
                    FITBIT_DEFAULT_SCOPES,
                )),
                redirect_uri: redirect_uri_for(environment)?,
            },
            broker: BrokerConfig {
                client_id,
                client_secret: optional_env(env_config::FITBIT_CLIENT_SECRET),
                token_url: env_var_or(env_config::FITBIT_TOKEN_URL, FITBIT_TOKEN_URL),
            },
            token_broker_url: env_var_or(
                env_config::TOKEN_BROKER_URL,
                &format!("http://localhost:{}", ports::DEFAULT_HTTP_PORT),
            ),
            api_base_url: env_var_or(env_config::FITBIT_API_BASE_URL, FITBIT_API_BASE_URL),
            http: HttpClientConfig {
                timeout_secs: parse_env_or(
                    env_config::HTTP_TIMEOUT_SECS,
                    network::DEFAULT_HTTP_TIMEOUT_SECS,
                )?,
                connect_timeout_secs: parse_env_or(
                    env_config::HTTP_CONNECT_TIMEOUT_SECS,
                    network::DEFAULT_CONNECT_TIMEOUT_SECS,
                )?,
            },
            token_expiry_skew_secs: parse_env_or(
                env_config::TOKEN_EXPIRY_SKEW_SECS,
                oauth::DEFAULT_EXPIRY_SKEW_SECS,
            )?,
            retry: retry_from_env()?,
            database: DatabaseUrl::parse_url(&env_var_or(env_config::DATABASE_URL, "memory"))?,
            cors_allowed_origins: env_var_or(env_config::CORS_ALLOWED_ORIGINS, "*"),
        };

        config.validate()?;
        info!("{}", config.summary());
        Ok(config)
    }

    /// Validate cross-field constraints
    ///
    /// # Errors
    ///
    /// Returns an error describing the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            (env_config::FITBIT_AUTH_URL, &self.oauth.auth_url),
            (env_config::FITBIT_TOKEN_URL, &self.broker.token_url),
            (env_config::TOKEN_BROKER_URL, &self.token_broker_url),
            (env_config::FITBIT_API_BASE_URL, &self.api_base_url),
            ("redirect URI", &self.oauth.redirect_uri),
        ] {
            Url::parse(value).with_context(|| format!("Invalid URL in {name}: {value}"))?;
        }

        if self.http.timeout_secs == 0 {
            return Err(anyhow!("{} must be positive", env_config::HTTP_TIMEOUT_SECS));
        }
        if self.token_expiry_skew_secs < 0 {
            return Err(anyhow!(
                "{} must not be negative",
                env_config::TOKEN_EXPIRY_SKEW_SECS
            ));
        }
        if !(0.0..=1.0).contains(&self.retry.jitter_factor) {
            return Err(anyhow!(
                "{} must be between 0.0 and 1.0",
                env_config::RETRY_JITTER_FACTOR
            ));
        }

        if self.oauth.client_id.is_none() {
            warn!(
                "{} is not set; connect requests will fail",
                env_config::FITBIT_CLIENT_ID
            );
        }
        if !self.broker.is_configured() {
            warn!("Token broker credentials incomplete; /token-exchange and /refresh will return 500");
        }

        Ok(())
    }

    /// Get a summary of the configuration for logging (without secrets)
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Vitalsync Configuration:\n\
             - HTTP Port: {}\n\
             - Environment: {}\n\
             - Redirect URI: {}\n\
             - Token Broker: {}\n\
             - Client Secret: {}\n\
             - Token Store: {}\n\
             - HTTP Timeout: {}s (connect {}s)\n\
             - Expiry Skew: {}s\n\
             - Retries: {} (base {}ms, max {}ms, jitter {})",
            self.http_port,
            self.environment,
            self.oauth.redirect_uri,
            self.token_broker_url,
            self.broker
                .secret_fingerprint()
                .unwrap_or_else(|| "not configured".to_owned()),
            if self.database.is_memory() {
                "memory"
            } else {
                "sqlite"
            },
            self.http.timeout_secs,
            self.http.connect_timeout_secs,
            self.token_expiry_skew_secs,
            self.retry.max_retries,
            self.retry.base_delay_ms,
            self.retry.max_delay_ms,
            self.retry.jitter_factor,
        )
    }
}

/// Redirect URI for the deployment environment
fn redirect_uri_for(environment: Environment) -> Result<String> {
    if environment.is_production() {
        optional_env(env_config::FITBIT_REDIRECT_URI_PROD).ok_or_else(|| {
            anyhow!(
                "{} is required in production",
                env_config::FITBIT_REDIRECT_URI_PROD
            )
        })
    } else {
        Ok(env_var_or(
            env_config::FITBIT_REDIRECT_URI_DEV,
            DEFAULT_DEV_REDIRECT_URI,
        ))
    }
}

fn retry_from_env() -> Result<RetryBackoffConfig> {
    let defaults = RetryBackoffConfig::default();
    Ok(RetryBackoffConfig {
        max_retries: parse_env_or(env_config::RETRY_MAX_RETRIES, defaults.max_retries)?,
        base_delay_ms: parse_env_or(env_config::RETRY_BASE_DELAY_MS, defaults.base_delay_ms)?,
        max_delay_ms: parse_env_or(env_config::RETRY_MAX_DELAY_MS, defaults.max_delay_ms)?,
        jitter_factor: parse_env_or(env_config::RETRY_JITTER_FACTOR, defaults.jitter_factor)?,
    })
}

/// Get environment variable or default value
fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Non-empty environment variable
fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Parse an environment variable, falling back to `default` when unset
fn parse_env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: StdError + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {key} value: {raw}")),
        None => Ok(default),
    }
}

/// Parse space- or comma-separated scopes
fn parse_scopes(scopes_str: &str) -> Vec<String> {
    scopes_str
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}
