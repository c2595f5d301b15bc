// ABOUTME: Unit tests for environment-driven server configuration
// ABOUTME: Validates defaults, overrides, redirect URI selection, and rejection of malformed values
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::env;

use serial_test::serial;

use vitalsync::config::{DatabaseUrl, Environment, ServerConfig};
use vitalsync_core::constants::env_config;

const ALL_VARS: &[&str] = &[
    env_config::HTTP_PORT,
    env_config::ENVIRONMENT,
    env_config::FITBIT_CLIENT_ID,
    env_config::FITBIT_CLIENT_SECRET,
    env_config::FITBIT_AUTH_URL,
    env_config::FITBIT_TOKEN_URL,
    env_config::FITBIT_API_BASE_URL,
    env_config::FITBIT_SCOPES,
    env_config::FITBIT_REDIRECT_URI_DEV,
    env_config::FITBIT_REDIRECT_URI_PROD,
    env_config::TOKEN_BROKER_URL,
    env_config::HTTP_TIMEOUT_SECS,
    env_config::HTTP_CONNECT_TIMEOUT_SECS,
    env_config::TOKEN_EXPIRY_SKEW_SECS,
    env_config::RETRY_MAX_RETRIES,
    env_config::RETRY_BASE_DELAY_MS,
    env_config::RETRY_MAX_DELAY_MS,
    env_config::RETRY_JITTER_FACTOR,
    env_config::DATABASE_URL,
    env_config::CORS_ALLOWED_ORIGINS,
];

fn clear_env() {
    for var in ALL_VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_defaults_without_environment() {
    clear_env();
    let config = ServerConfig::from_env().unwrap();

    assert_eq!(config.http_port, 8081);
    assert_eq!(config.environment, Environment::Development);
    assert_eq!(config.oauth.client_id, None);
    assert_eq!(config.oauth.auth_url, "https://www.fitbit.com/oauth2/authorize");
    assert_eq!(
        config.oauth.redirect_uri,
        "http://localhost:8081/oauth/callback"
    );
    assert!(config.oauth.scopes.contains(&"activity".to_owned()));
    assert_eq!(config.broker.token_url, "https://api.fitbit.com/oauth2/token");
    assert!(!config.broker.is_configured());
    assert_eq!(config.api_base_url, "https://api.fitbit.com");
    assert_eq!(config.token_broker_url, "http://localhost:8081");
    assert_eq!(config.token_expiry_skew_secs, 60);
    assert_eq!(config.retry.max_retries, 2);
    assert_eq!(config.database, DatabaseUrl::Memory);
    assert_eq!(config.cors_allowed_origins, "*");
}

#[test]
#[serial]
fn test_overrides_from_environment() {
    clear_env();
    env::set_var(env_config::HTTP_PORT, "9090");
    env::set_var(env_config::FITBIT_CLIENT_ID, "client-abc");
    env::set_var(env_config::FITBIT_CLIENT_SECRET, "secret-xyz");
    env::set_var(env_config::FITBIT_SCOPES, "activity, sleep profile");
    env::set_var(env_config::TOKEN_BROKER_URL, "https://broker.example.com");
    env::set_var(env_config::TOKEN_EXPIRY_SKEW_SECS, "120");
    env::set_var(env_config::RETRY_MAX_RETRIES, "5");
    env::set_var(env_config::DATABASE_URL, "sqlite:./tokens.db");

    let config = ServerConfig::from_env().unwrap();
    clear_env();

    assert_eq!(config.http_port, 9090);
    assert_eq!(config.oauth.client_id.as_deref(), Some("client-abc"));
    assert_eq!(config.broker.client_id.as_deref(), Some("client-abc"));
    assert!(config.broker.is_configured());
    assert_eq!(config.oauth.scopes, vec!["activity", "sleep", "profile"]);
    assert_eq!(config.token_broker_url, "https://broker.example.com");
    assert_eq!(config.token_expiry_skew_secs, 120);
    assert_eq!(config.retry.max_retries, 5);
    assert_eq!(
        config.database,
        DatabaseUrl::SQLite {
            connection_string: "sqlite:./tokens.db".to_owned()
        }
    );
}

#[test]
#[serial]
fn test_summary_never_contains_secret() {
    clear_env();
    env::set_var(env_config::FITBIT_CLIENT_ID, "client-abc");
    env::set_var(env_config::FITBIT_CLIENT_SECRET, "super-secret-value");

    let config = ServerConfig::from_env().unwrap();
    clear_env();

    assert!(!config.summary().contains("super-secret-value"));
    assert!(!format!("{:?}", config.broker).contains("super-secret-value"));
}

#[test]
#[serial]
fn test_production_requires_production_redirect() {
    clear_env();
    env::set_var(env_config::ENVIRONMENT, "production");
    assert!(ServerConfig::from_env().is_err());

    env::set_var(
        env_config::FITBIT_REDIRECT_URI_PROD,
        "https://app.example.com/oauth/callback",
    );
    let config = ServerConfig::from_env().unwrap();
    clear_env();

    assert!(config.environment.is_production());
    assert_eq!(
        config.oauth.redirect_uri,
        "https://app.example.com/oauth/callback"
    );
}

#[test]
#[serial]
fn test_development_redirect_override() {
    clear_env();
    env::set_var(
        env_config::FITBIT_REDIRECT_URI_DEV,
        "http://127.0.0.1:3000/oauth/callback",
    );
    let config = ServerConfig::from_env().unwrap();
    clear_env();

    assert_eq!(
        config.oauth.redirect_uri,
        "http://127.0.0.1:3000/oauth/callback"
    );
}

#[test]
#[serial]
fn test_malformed_values_rejected() {
    for (var, value) in [
        (env_config::HTTP_PORT, "not-a-port"),
        (env_config::HTTP_TIMEOUT_SECS, "0"),
        (env_config::TOKEN_EXPIRY_SKEW_SECS, "-5"),
        (env_config::RETRY_JITTER_FACTOR, "2.0"),
        (env_config::DATABASE_URL, "postgres://db"),
        (env_config::TOKEN_BROKER_URL, "not a url"),
    ] {
        clear_env();
        env::set_var(var, value);
        assert!(
            ServerConfig::from_env().is_err(),
            "{var}={value} should be rejected"
        );
    }
    clear_env();
}

#[test]
fn test_environment_parsing() {
    assert_eq!(
        Environment::from_str_or_default("PROD"),
        Environment::Production
    );
    assert_eq!(
        Environment::from_str_or_default("testing"),
        Environment::Testing
    );
    assert_eq!(
        Environment::from_str_or_default("invalid"),
        Environment::Development
    );
    assert_eq!(Environment::Production.to_string(), "production");
}

#[test]
fn test_database_url_display() {
    assert_eq!(DatabaseUrl::Memory.to_string(), "memory");
    assert_eq!(DatabaseUrl::parse_url("  ").unwrap(), DatabaseUrl::Memory);
    assert!(DatabaseUrl::parse_url("sqlite::memory:").unwrap().to_string().contains("sqlite"));
}
