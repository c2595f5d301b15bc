// ABOUTME: Derived connection state for a user's wearable account
// ABOUTME: Computed from stored facts and the last outcome; never persisted
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a user stands in the connect / refresh / reconnect lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No credentials and no attempt outstanding
    Disconnected,
    /// User was sent to the vendor; waiting for the callback
    Authorizing,
    /// Callback accepted; code exchange in progress
    Exchanging,
    /// Credentials on hand
    Connected,
    /// Credentials on hand and a refresh is in flight
    Refreshing,
    /// Credentials were destroyed by a terminal failure
    NeedsReconnect,
}

/// Classification of the most recent operation's result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LastOutcome {
    /// Succeeded, or nothing has happened yet
    #[default]
    Ok,
    /// Terminal credential loss (refresh 401/400, reconnect required)
    Terminal,
    /// Authorization attempt aborted (CSRF, expiry, denial)
    Restart,
    /// Retryable failure; stored credentials untouched
    Transient,
}

/// Facts the state is derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionSnapshot {
    /// A token record is stored
    pub has_record: bool,
    /// An authorization attempt is outstanding
    pub has_pending: bool,
    /// A refresh is running for this user
    pub refresh_in_flight: bool,
    /// A code exchange is running for this user
    pub exchange_in_flight: bool,
    /// Result of the last operation
    pub last_outcome: LastOutcome,
}

impl ConnectionState {
    /// Derive the state from a snapshot
    #[must_use]
    pub const fn derive(snapshot: &ConnectionSnapshot) -> Self {
        if matches!(snapshot.last_outcome, LastOutcome::Terminal) {
            Self::NeedsReconnect
        } else if snapshot.exchange_in_flight {
            Self::Exchanging
        } else if snapshot.refresh_in_flight && snapshot.has_record {
            Self::Refreshing
        } else if snapshot.has_record {
            Self::Connected
        } else if snapshot.has_pending && !matches!(snapshot.last_outcome, LastOutcome::Restart) {
            Self::Authorizing
        } else {
            Self::Disconnected
        }
    }

    /// Whether the user holds usable credentials
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected | Self::Refreshing)
    }
}

/// Connection status reported to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionStatus {
    /// User the status belongs to
    pub user_id: String,
    /// Derived state
    pub state: ConnectionState,
    /// Access token expiry, when connected
    pub expires_at: Option<DateTime<Utc>>,
    /// First connection time, when connected
    pub connected_at: Option<DateTime<Utc>>,
    /// Granted scopes, when connected
    pub scope: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_outcome_wins() {
        let snapshot = ConnectionSnapshot {
            has_pending: true,
            last_outcome: LastOutcome::Terminal,
            ..ConnectionSnapshot::default()
        };
        assert_eq!(
            ConnectionState::derive(&snapshot),
            ConnectionState::NeedsReconnect
        );
    }

    #[test]
    fn test_transient_failure_keeps_connected() {
        let snapshot = ConnectionSnapshot {
            has_record: true,
            last_outcome: LastOutcome::Transient,
            ..ConnectionSnapshot::default()
        };
        assert_eq!(ConnectionState::derive(&snapshot), ConnectionState::Connected);
    }

    #[test]
    fn test_refresh_without_record_is_not_refreshing() {
        let snapshot = ConnectionSnapshot {
            refresh_in_flight: true,
            ..ConnectionSnapshot::default()
        };
        assert_eq!(
            ConnectionState::derive(&snapshot),
            ConnectionState::Disconnected
        );
    }

    #[test]
    fn test_restart_lands_in_disconnected() {
        let snapshot = ConnectionSnapshot {
            last_outcome: LastOutcome::Restart,
            ..ConnectionSnapshot::default()
        };
        assert_eq!(
            ConnectionState::derive(&snapshot),
            ConnectionState::Disconnected
        );
    }

    #[test]
    fn test_aborted_attempt_reads_disconnected_even_if_kept() {
        let snapshot = ConnectionSnapshot {
            has_pending: true,
            last_outcome: LastOutcome::Restart,
            ..ConnectionSnapshot::default()
        };
        assert_eq!(
            ConnectionState::derive(&snapshot),
            ConnectionState::Disconnected
        );
    }

    #[test]
    fn test_pending_attempt_is_authorizing() {
        let snapshot = ConnectionSnapshot {
            has_pending: true,
            ..ConnectionSnapshot::default()
        };
        assert_eq!(
            ConnectionState::derive(&snapshot),
            ConnectionState::Authorizing
        );
    }

    #[test]
    fn test_restart_does_not_hide_stored_credentials() {
        let snapshot = ConnectionSnapshot {
            has_record: true,
            last_outcome: LastOutcome::Restart,
            ..ConnectionSnapshot::default()
        };
        assert_eq!(ConnectionState::derive(&snapshot), ConnectionState::Connected);
    }

    #[test]
    fn test_serializes_snake_case() {
        let json = serde_json::to_string(&ConnectionState::NeedsReconnect).unwrap();
        assert_eq!(json, "\"needs_reconnect\"");
    }
}
