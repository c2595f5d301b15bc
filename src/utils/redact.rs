// ABOUTME: Log-safe rendering of credentials and upstream response bodies
// ABOUTME: Secrets appear in logs only as short SHA-256 fingerprints

use sha2::{Digest, Sha256};

use vitalsync_core::constants::network::MAX_ERROR_BODY_CHARS;

/// First 8 hex characters of the SHA-256 of `secret`
///
/// Lets two log lines be correlated to the same credential without revealing it.
#[must_use]
pub fn fingerprint(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    let result = hasher.finalize();
    format!("{result:x}").chars().take(8).collect()
}

/// Upstream body cut to a bounded number of characters
#[must_use]
pub fn truncate_body(body: &str) -> String {
    if body.chars().count() <= MAX_ERROR_BODY_CHARS {
        return body.to_owned();
    }
    let mut truncated: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    truncated.push_str("...");
    truncated
}
