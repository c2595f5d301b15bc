// ABOUTME: Storage error types for token record and pending authorization persistence
// ABOUTME: Cloneable so single-flight refresh outcomes can be shared across waiters
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Failure of a token or session storage backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// The backend rejected or failed the operation
    #[error("Storage backend failure: {details}")]
    Backend {
        /// Backend-provided description
        details: String,
    },

    /// A persisted record could not be turned back into a model
    #[error("Stored record for user '{user_id}' is corrupt: {reason}")]
    Corrupt {
        /// Owner of the corrupt record
        user_id: String,
        /// What was wrong with it
        reason: String,
    },
}

impl StorageError {
    /// Wrap a backend error message
    #[must_use]
    pub fn backend(details: impl Into<String>) -> Self {
        Self::Backend {
            details: details.into(),
        }
    }
}
