// ABOUTME: Short-lived storage of the one outstanding authorization attempt per user
// ABOUTME: Consumption is an atomic remove-if-state-matches so a callback can win at most once
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use dashmap::DashMap;
use subtle::ConstantTimeEq;

use vitalsync_core::models::PendingAuthorization;

/// Storage for pending authorization attempts, keyed by user id
///
/// At most one attempt per user is held; `put` replaces any earlier one.
pub trait SessionStore: Send + Sync {
    /// Store `pending` for `user_id`, replacing any earlier attempt
    fn put(&self, user_id: &str, pending: PendingAuthorization);

    /// Current attempt for `user_id`
    fn get(&self, user_id: &str) -> Option<PendingAuthorization>;

    /// Delete the attempt for `user_id`, returning it
    fn remove(&self, user_id: &str) -> Option<PendingAuthorization>;

    /// Delete and return the attempt only if its state equals `state`
    ///
    /// The comparison is constant-time and the check-and-delete is atomic, so
    /// two concurrent callbacks carrying the same state cannot both succeed.
    fn consume(&self, user_id: &str, state: &str) -> Option<PendingAuthorization>;
}

/// Process-local session store
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    pending: DashMap<String, PendingAuthorization>,
}

impl InMemorySessionStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn put(&self, user_id: &str, pending: PendingAuthorization) {
        self.pending.insert(user_id.to_owned(), pending);
    }

    fn get(&self, user_id: &str) -> Option<PendingAuthorization> {
        self.pending.get(user_id).map(|entry| entry.value().clone())
    }

    fn remove(&self, user_id: &str) -> Option<PendingAuthorization> {
        self.pending.remove(user_id).map(|(_, pending)| pending)
    }

    fn consume(&self, user_id: &str, state: &str) -> Option<PendingAuthorization> {
        self.pending
            .remove_if(user_id, |_, pending| states_match(&pending.state, state))
            .map(|(_, pending)| pending)
    }
}

/// Constant-time state comparison
#[must_use]
pub fn states_match(stored: &str, returned: &str) -> bool {
    stored.as_bytes().ct_eq(returned.as_bytes()).into()
}
