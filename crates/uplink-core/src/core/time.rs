// crates/uplink-core/src/core/time.rs
// ============================================================================
// Module: Uplink Time Model
// Description: Canonical timestamp representation for queue records and ticks.
// Purpose: Provide explicit, caller-supplied time values across engine records.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Uplink uses explicit time values passed into every store and engine
//! operation to keep retry scheduling and tests deterministic. The core never
//! reads wall-clock time directly; hosts supply timestamps via the
//! [`crate::interfaces::Clock`] seam.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Canonical timestamp in unix epoch milliseconds.
///
/// # Invariants
/// - Values are explicitly provided by callers; the core never reads
///   wall-clock time.
/// - No monotonicity is enforced; callers own clock discipline.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(&self) -> i64 {
        self.0
    }

    /// Returns the timestamp advanced by `millis`, saturating on overflow.
    #[must_use]
    pub const fn saturating_add_millis(&self, millis: u64) -> Self {
        let delta = if millis > i64::MAX as u64 { i64::MAX } else { millis as i64 };
        Self(self.0.saturating_add(delta))
    }

    /// Returns the whole milliseconds elapsed since `earlier`, or zero when
    /// `earlier` is not in the past.
    #[must_use]
    pub const fn millis_since(&self, earlier: Self) -> u64 {
        let delta = self.0.saturating_sub(earlier.0);
        if delta < 0 { 0 } else { delta as u64 }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<i64> for Timestamp {
    fn from(value: i64) -> Self {
        Self::from_unix_millis(value)
    }
}
