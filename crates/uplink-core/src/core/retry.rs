// crates/uplink-core/src/core/retry.rs
// ============================================================================
// Module: Uplink Retry Policy
// Description: Backoff delay table, jitter, and retry eligibility rules.
// Purpose: Bound retries and desynchronize them across queued items.
// Dependencies: crate::core::{item, time}, rand, serde
// ============================================================================

//! ## Overview
//! The retry policy is a pure function over an item's attempt count. Base
//! delays grow from zero to a five-minute ceiling; each failure adds a
//! uniform jitter of up to 20% of the base so that many items failing
//! together do not retry together. Jitter is drawn once per failure and
//! materialized as the item's `next_attempt_at` deadline.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rand::Rng;
use rand::RngCore;
use serde::Deserialize;
use serde::Serialize;

use crate::core::item::ItemStatus;
use crate::core::item::QueueItem;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default maximum attempts before an item becomes a terminal failure.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
/// Backoff ceiling in milliseconds applied from the fifth attempt onward.
const DELAY_CEILING_MS: u64 = 300_000;
/// Jitter numerator: jitter is uniform in `[0, base / 5)`.
const JITTER_DIVISOR: u64 = 5;

// ============================================================================
// SECTION: Retry Policy
// ============================================================================

/// Retry policy bounding attempts and spacing them with jittered backoff.
///
/// # Invariants
/// - `base_delay_ms` is non-decreasing in the attempt count.
/// - Jittered delays never fall below the base delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum failed attempts before the item is terminal.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

impl RetryPolicy {
    /// Creates a retry policy with an explicit attempt budget.
    #[must_use]
    pub const fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
        }
    }

    /// Returns the base backoff delay in milliseconds for an attempt count.
    #[must_use]
    pub const fn base_delay_ms(attempts: u32) -> u64 {
        match attempts {
            0 => 0,
            1 => 30_000,
            2 => 60_000,
            3 => 120_000,
            4 => 240_000,
            _ => DELAY_CEILING_MS,
        }
    }

    /// Returns the base delay plus a uniform jitter in `[0, base / 5)`.
    #[must_use]
    pub fn jittered_delay_ms(attempts: u32, rng: &mut (impl RngCore + ?Sized)) -> u64 {
        let base = Self::base_delay_ms(attempts);
        let jitter_span = base / JITTER_DIVISOR;
        if jitter_span == 0 {
            return base;
        }
        base + rng.gen_range(0..jitter_span)
    }

    /// Computes the retry deadline after a failure raised `attempts`.
    #[must_use]
    pub fn next_attempt_at(
        attempts: u32,
        now: Timestamp,
        rng: &mut (impl RngCore + ?Sized),
    ) -> Timestamp {
        now.saturating_add_millis(Self::jittered_delay_ms(attempts, rng))
    }

    /// Returns whether the item may be retried at `now`.
    ///
    /// Eligibility requires a failed status, a remaining attempt budget, and
    /// an elapsed backoff deadline. Items without a materialized deadline
    /// fall back to the base delay measured from the last attempt.
    #[must_use]
    pub fn should_retry(&self, item: &QueueItem, now: Timestamp) -> bool {
        if item.status != ItemStatus::Failed || item.attempts >= self.max_attempts {
            return false;
        }
        match (item.next_attempt_at, item.last_attempt_at) {
            (Some(deadline), _) => deadline <= now,
            (None, Some(last)) => now.millis_since(last) >= Self::base_delay_ms(item.attempts),
            (None, None) => true,
        }
    }

    /// Returns whether the attempt budget is exhausted.
    #[must_use]
    pub const fn is_terminal(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts
    }
}
