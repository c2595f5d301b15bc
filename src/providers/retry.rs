// ABOUTME: Exponential backoff with jitter for transient vendor API failures
// ABOUTME: Delay doubles per attempt from a base, capped, then spread by a random jitter fraction
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use vitalsync_core::constants::retry::{
    DEFAULT_BASE_DELAY_MS, DEFAULT_JITTER_FACTOR, DEFAULT_MAX_DELAY_MS, DEFAULT_MAX_RETRIES,
};

/// Backoff policy for 429/5xx and transport failures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryBackoffConfig {
    /// Retries after the initial attempt
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds
    pub base_delay_ms: u64,
    /// Ceiling for any single delay, in milliseconds
    pub max_delay_ms: u64,
    /// Fraction of the delay applied as +/- random jitter (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for RetryBackoffConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            jitter_factor: DEFAULT_JITTER_FACTOR,
        }
    }
}

impl RetryBackoffConfig {
    /// Policy with no waiting between attempts
    #[must_use]
    pub const fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay_ms: 0,
            max_delay_ms: 0,
            jitter_factor: 0.0,
        }
    }

    /// Unjittered delay before retry number `attempt` (1-based)
    #[must_use]
    pub fn base_delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let delay_ms = self
            .base_delay_ms
            .saturating_mul(1_u64 << exponent)
            .min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }

    /// Jittered delay before retry number `attempt` (1-based)
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.base_delay_for_attempt(attempt);
        let jitter = self.jitter_factor.clamp(0.0, 1.0);
        if jitter <= 0.0 || base.is_zero() {
            return base;
        }

        let spread = rand::thread_rng().gen_range(-jitter..=jitter);
        let scaled = (base.as_millis() as f64 * (1.0 + spread)).max(0.0);
        Duration::from_millis(scaled as u64)
    }
}
