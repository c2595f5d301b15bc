// ABOUTME: Integration tests for OAuth callback validation against pending attempts
// ABOUTME: Covers check order, CSRF mismatch handling, the ten minute expiry boundary, and single use
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::sync::Arc;

use chrono::Duration;

use vitalsync::oauth2_client::{CallbackValidator, InMemorySessionStore, SessionStore};
use vitalsync::utils::clock::ManualClock;
use vitalsync_core::errors::CallbackError;
use vitalsync_core::models::{CallbackParams, PendingAuthorization};

const REDIRECT: &str = "http://localhost:8081/oauth/callback";

struct Fixture {
    clock: ManualClock,
    sessions: Arc<InMemorySessionStore>,
    validator: CallbackValidator,
}

fn fixture() -> Fixture {
    common::init_test_logging();
    let (clock, shared) = common::manual_clock();
    let sessions = Arc::new(InMemorySessionStore::new());
    let validator = CallbackValidator::new(sessions.clone(), shared);
    Fixture {
        clock,
        sessions,
        validator,
    }
}

fn pending(fx: &Fixture, user_id: &str, state: &str) {
    fx.sessions.put(
        user_id,
        PendingAuthorization {
            state: state.to_owned(),
            created_at: common::t0(),
            redirect_uri: REDIRECT.to_owned(),
        },
    );
}

fn params(code: Option<&str>, state: Option<&str>) -> CallbackParams {
    CallbackParams {
        code: code.map(str::to_owned),
        state: state.map(str::to_owned),
        ..CallbackParams::default()
    }
}

#[test]
fn test_valid_callback_consumes_attempt() {
    let fx = fixture();
    pending(&fx, "user-1", "nonce-abc");

    let validated = fx
        .validator
        .validate("user-1", &params(Some("code-1"), Some("nonce-abc")))
        .unwrap();
    assert_eq!(validated.code, "code-1");
    assert_eq!(validated.redirect_uri, REDIRECT);
    assert!(fx.sessions.get("user-1").is_none());

    let replay = fx
        .validator
        .validate("user-1", &params(Some("code-1"), Some("nonce-abc")));
    assert_eq!(replay.unwrap_err(), CallbackError::NoPendingAuthorization);
}

#[test]
fn test_vendor_error_is_checked_first() {
    let fx = fixture();
    let denied = CallbackParams {
        error: Some("access_denied".to_owned()),
        error_description: Some("User declined".to_owned()),
        ..params(Some("code-1"), Some("whatever"))
    };

    // No pending attempt exists, yet the denial wins.
    let error = fx.validator.validate("user-1", &denied).unwrap_err();
    assert_eq!(
        error,
        CallbackError::AuthorizationDenied {
            error: "access_denied".to_owned(),
            description: Some("User declined".to_owned()),
        }
    );
    assert_eq!(error.vendor_reason(), Some("User declined"));
}

#[test]
fn test_denial_consumes_matching_attempt() {
    let fx = fixture();
    pending(&fx, "user-1", "nonce-abc");
    let denied = CallbackParams {
        error: Some("access_denied".to_owned()),
        ..params(None, Some("nonce-abc"))
    };

    let error = fx.validator.validate("user-1", &denied).unwrap_err();
    assert!(matches!(error, CallbackError::AuthorizationDenied { .. }));
    assert!(fx.sessions.get("user-1").is_none());

    let late = fx
        .validator
        .validate("user-1", &params(Some("code-1"), Some("nonce-abc")));
    assert_eq!(late.unwrap_err(), CallbackError::NoPendingAuthorization);
}

#[test]
fn test_denial_with_foreign_state_keeps_attempt() {
    let fx = fixture();
    pending(&fx, "user-1", "nonce-abc");

    for state in [None, Some("forged")] {
        let denied = CallbackParams {
            error: Some("access_denied".to_owned()),
            ..params(None, state)
        };
        let error = fx.validator.validate("user-1", &denied).unwrap_err();
        assert!(matches!(error, CallbackError::AuthorizationDenied { .. }));
        assert!(fx.sessions.get("user-1").is_some());
    }
}

#[test]
fn test_missing_attempt() {
    let fx = fixture();
    let error = fx
        .validator
        .validate("user-1", &params(Some("code-1"), Some("nonce")))
        .unwrap_err();
    assert_eq!(error, CallbackError::NoPendingAuthorization);
}

#[test]
fn test_csrf_mismatch_keeps_pending_attempt() {
    let fx = fixture();
    pending(&fx, "user-1", "nonce-abc");

    let error = fx
        .validator
        .validate("user-1", &params(Some("code-1"), Some("forged")))
        .unwrap_err();
    assert_eq!(error, CallbackError::CsrfMismatch);
    assert!(fx.sessions.get("user-1").is_some());

    // The genuine callback still succeeds afterwards.
    assert!(fx
        .validator
        .validate("user-1", &params(Some("code-1"), Some("nonce-abc")))
        .is_ok());
}

#[test]
fn test_missing_state_is_mismatch() {
    let fx = fixture();
    pending(&fx, "user-1", "nonce-abc");

    let error = fx
        .validator
        .validate("user-1", &params(Some("code-1"), None))
        .unwrap_err();
    assert_eq!(error, CallbackError::CsrfMismatch);
}

#[test]
fn test_state_checked_before_code() {
    let fx = fixture();
    pending(&fx, "user-1", "nonce-abc");

    let error = fx
        .validator
        .validate("user-1", &params(None, Some("forged")))
        .unwrap_err();
    assert_eq!(error, CallbackError::CsrfMismatch);

    for code in [None, Some("")] {
        let error = fx
            .validator
            .validate("user-1", &params(code, Some("nonce-abc")))
            .unwrap_err();
        assert_eq!(error, CallbackError::MissingCode);
    }
    assert!(fx.sessions.get("user-1").is_some());
}

#[test]
fn test_exactly_ten_minutes_is_still_valid() {
    let fx = fixture();
    pending(&fx, "user-1", "nonce-abc");
    fx.clock.advance(Duration::minutes(10));

    assert!(fx
        .validator
        .validate("user-1", &params(Some("code-1"), Some("nonce-abc")))
        .is_ok());
}

#[test]
fn test_expired_attempt_is_deleted() {
    let fx = fixture();
    pending(&fx, "user-1", "nonce-abc");
    fx.clock.advance(Duration::minutes(10) + Duration::seconds(1));

    let error = fx
        .validator
        .validate("user-1", &params(Some("code-1"), Some("nonce-abc")))
        .unwrap_err();
    assert_eq!(error, CallbackError::SessionExpired);
    assert!(fx.sessions.get("user-1").is_none());
}

#[test]
fn test_expiry_checked_before_state() {
    let fx = fixture();
    pending(&fx, "user-1", "nonce-abc");
    fx.clock.advance(Duration::minutes(11));

    let error = fx
        .validator
        .validate("user-1", &params(Some("code-1"), Some("forged")))
        .unwrap_err();
    assert_eq!(error, CallbackError::SessionExpired);
}

#[test]
fn test_attempts_are_per_user() {
    let fx = fixture();
    pending(&fx, "alice", "nonce-alice");
    pending(&fx, "bob", "nonce-bob");

    let error = fx
        .validator
        .validate("alice", &params(Some("code-1"), Some("nonce-bob")))
        .unwrap_err();
    assert_eq!(error, CallbackError::CsrfMismatch);
    assert!(fx
        .validator
        .validate("bob", &params(Some("code-2"), Some("nonce-bob")))
        .is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callbacks_succeed_at_most_once() {
    let fx = fixture();
    pending(&fx, "user-1", "nonce-abc");
    let validator = Arc::new(fx.validator);

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let validator = Arc::clone(&validator);
            tokio::spawn(async move {
                validator
                    .validate("user-1", &params(Some("code-1"), Some("nonce-abc")))
                    .is_ok()
            })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);
}
