// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides quiet logging, fixed clocks, token fixtures, configs, and a scriptable grant client
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used,
    clippy::expect_used
)]
//! Shared test utilities for `vitalsync`

use std::collections::VecDeque;
use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use tracing::Level;

use vitalsync::config::{BrokerConfig, OAuthClientConfig, ServerConfig};
use vitalsync::oauth2_client::TokenGrantClient;
use vitalsync::providers::RetryBackoffConfig;
use vitalsync::utils::clock::{Clock, ManualClock};
use vitalsync_core::errors::{ExchangeError, RefreshError};
use vitalsync_core::models::{TokenRecord, TokenResponse};

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => Level::TRACE,
            Ok("DEBUG") => Level::DEBUG,
            Ok("INFO") => Level::INFO,
            _ => Level::WARN,
        };

        let _ = tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .try_init();
    });
}

/// Fixed "T" all timing tests start from
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
}

/// Manual clock at [`t0`], both as itself and as `Arc<dyn Clock>`
pub fn manual_clock() -> (ManualClock, Arc<dyn Clock>) {
    let clock = ManualClock::new(t0());
    let shared: Arc<dyn Clock> = Arc::new(clock.clone());
    (clock, shared)
}

/// Token endpoint JSON body
pub fn token_json(access: &str, refresh: Option<&str>, expires_in: i64) -> Value {
    let mut body = json!({
        "access_token": access,
        "token_type": "Bearer",
        "expires_in": expires_in,
        "scope": "activity heartrate",
        "user_id": "ABC123",
    });
    if let Some(refresh) = refresh {
        body["refresh_token"] = json!(refresh);
    }
    body
}

/// Token record issued at `issued_at`
pub fn record(access: &str, refresh: &str, issued_at: DateTime<Utc>, expires_in: i64) -> TokenRecord {
    let response: TokenResponse =
        serde_json::from_value(token_json(access, Some(refresh), expires_in)).unwrap();
    TokenRecord::from_response(response, issued_at).unwrap()
}

/// Configuration pointing every outbound URL at test servers
pub fn test_config(broker_url: &str, api_url: &str) -> ServerConfig {
    ServerConfig {
        oauth: OAuthClientConfig {
            client_id: Some("test-client-id".to_owned()),
            auth_url: "https://www.fitbit.com/oauth2/authorize".to_owned(),
            scopes: vec!["activity".to_owned(), "heartrate".to_owned()],
            redirect_uri: "http://localhost:8081/oauth/callback".to_owned(),
        },
        broker: BrokerConfig {
            client_id: Some("test-client-id".to_owned()),
            client_secret: Some("test-client-secret".to_owned()),
            token_url: format!("{broker_url}/oauth2/token"),
        },
        token_broker_url: broker_url.to_owned(),
        api_base_url: api_url.to_owned(),
        retry: RetryBackoffConfig::immediate(2),
        ..ServerConfig::default()
    }
}

/// Scripted [`TokenGrantClient`] that counts calls
///
/// Refresh results are popped in order; when the script is empty a refresh
/// succeeds with `refreshed-<n>` tokens valid for one hour.
pub struct FakeGrantClient {
    clock: Arc<dyn Clock>,
    refresh_script: Mutex<VecDeque<Result<(String, Option<String>), RefreshError>>>,
    exchange_script: Mutex<VecDeque<Result<TokenRecord, ExchangeError>>>,
    delay: Option<StdDuration>,
    refresh_calls: AtomicUsize,
    exchange_calls: AtomicUsize,
}

impl FakeGrantClient {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            refresh_script: Mutex::new(VecDeque::new()),
            exchange_script: Mutex::new(VecDeque::new()),
            delay: None,
            refresh_calls: AtomicUsize::new(0),
            exchange_calls: AtomicUsize::new(0),
        }
    }

    /// Every grant sleeps this long before answering
    pub fn with_delay(mut self, delay: StdDuration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Next refresh yields `access` (and `refresh`, if rotated)
    pub fn push_refresh_ok(&self, access: &str, refresh: Option<&str>) {
        self.refresh_script
            .lock()
            .unwrap()
            .push_back(Ok((access.to_owned(), refresh.map(str::to_owned))));
    }

    /// Next refresh fails with `error`
    pub fn push_refresh_err(&self, error: RefreshError) {
        self.refresh_script.lock().unwrap().push_back(Err(error));
    }

    /// Next exchange yields `result`
    pub fn push_exchange(&self, result: Result<TokenRecord, ExchangeError>) {
        self.exchange_script.lock().unwrap().push_back(result);
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn exchange_calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenGrantClient for FakeGrantClient {
    async fn exchange(&self, code: &str, _redirect_uri: &str) -> Result<TokenRecord, ExchangeError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.exchange_script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(record(
                &format!("access-for-{code}"),
                &format!("refresh-for-{code}"),
                self.clock.now(),
                3600,
            ))
        })
    }

    async fn refresh(&self, previous: &TokenRecord) -> Result<TokenRecord, RefreshError> {
        let call = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.refresh_script.lock().unwrap().pop_front();
        let (access, refresh) = match scripted {
            Some(Ok(tokens)) => tokens,
            Some(Err(error)) => return Err(error),
            None => (format!("refreshed-{call}"), Some(format!("refresh-{call}"))),
        };

        let mut body = token_json(&access, refresh.as_deref(), 3600);
        if refresh.is_none() {
            body.as_object_mut().unwrap().remove("refresh_token");
        }
        let response: TokenResponse = serde_json::from_value(body).unwrap();
        Ok(TokenRecord::from_refresh(previous, response, self.clock.now()).unwrap())
    }
}
