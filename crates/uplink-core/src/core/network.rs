// crates/uplink-core/src/core/network.rs
// ============================================================================
// Module: Uplink Network Condition Estimator
// Description: Connection classes and adaptive batch size recommendation.
// Purpose: Scale upload batches with connectivity quality and recent outcomes.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The estimator tracks the current connection class and a short rolling
//! window of upload outcomes, producing a recommended batch size in
//! `[20, 500]`. With fewer than three samples the full class base size is
//! used optimistically; a connection-class change clears the window so stale
//! history from the previous network cannot bias the new one.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::VecDeque;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Number of upload outcomes kept in the rolling window.
pub const SAMPLE_WINDOW: usize = 10;
/// Minimum samples before success-rate scaling applies.
pub const MIN_SAMPLES_FOR_SCALING: usize = 3;
/// Smallest batch size ever recommended.
pub const MIN_BATCH_SIZE: usize = 20;
/// Largest batch size ever recommended.
pub const MAX_BATCH_SIZE: usize = 500;

// ============================================================================
// SECTION: Connection Class
// ============================================================================

/// Coarse connectivity classification reported by the host.
///
/// # Invariants
/// - Variants are stable for serialization and configuration parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionClass {
    /// Wi-Fi or wired uplink.
    WifiOrWired,
    /// Cellular uplink.
    Cellular,
    /// Connectivity present but unclassified.
    Unknown,
    /// No connectivity.
    Disconnected,
}

impl ConnectionClass {
    /// Returns the base batch size for this connection class.
    #[must_use]
    pub const fn base_batch_size(&self) -> usize {
        match self {
            Self::WifiOrWired => MAX_BATCH_SIZE,
            Self::Cellular => 100,
            Self::Unknown => 50,
            Self::Disconnected => MIN_BATCH_SIZE,
        }
    }
}

// ============================================================================
// SECTION: Estimator
// ============================================================================

/// Rolling estimate of network conditions driving batch sizing.
///
/// # Invariants
/// - The sample window never exceeds [`SAMPLE_WINDOW`] entries.
/// - Recommendations are always within `[MIN_BATCH_SIZE, MAX_BATCH_SIZE]`.
#[derive(Debug, Clone)]
pub struct NetworkConditionEstimator {
    /// Current connection class.
    connection_class: ConnectionClass,
    /// Recent upload outcomes, oldest first.
    samples: VecDeque<bool>,
}

impl Default for NetworkConditionEstimator {
    fn default() -> Self {
        Self::new(ConnectionClass::Unknown)
    }
}

impl NetworkConditionEstimator {
    /// Creates an estimator with an initial connection class and no history.
    #[must_use]
    pub fn new(connection_class: ConnectionClass) -> Self {
        Self {
            connection_class,
            samples: VecDeque::with_capacity(SAMPLE_WINDOW),
        }
    }

    /// Returns the current connection class.
    #[must_use]
    pub const fn connection_class(&self) -> ConnectionClass {
        self.connection_class
    }

    /// Updates the connection class, clearing history on change.
    pub fn set_connection_class(&mut self, class: ConnectionClass) {
        if self.connection_class != class {
            self.connection_class = class;
            self.reset();
        }
    }

    /// Records one upload outcome, evicting the oldest beyond the window.
    pub fn record_result(&mut self, success: bool) {
        if self.samples.len() == SAMPLE_WINDOW {
            self.samples.pop_front();
        }
        self.samples.push_back(success);
    }

    /// Clears the sample history.
    pub fn reset(&mut self) {
        self.samples.clear();
    }

    /// Returns the rolling success rate once enough samples exist.
    #[must_use]
    pub fn success_rate(&self) -> Option<f64> {
        if self.samples.len() < MIN_SAMPLES_FOR_SCALING {
            return None;
        }
        let successes = self.samples.iter().filter(|sample| **sample).count();
        #[allow(clippy::cast_precision_loss, reason = "Window length is at most ten.")]
        Some(successes as f64 / self.samples.len() as f64)
    }

    /// Returns the recommended batch size for the next upload cycle.
    ///
    /// Disconnected hosts always get the minimum. Below three samples the
    /// class base size is used unchanged; beyond that the base is scaled by
    /// the success-rate multiplier and clamped to `[20, 500]`.
    #[must_use]
    pub fn recommended_size(&self) -> usize {
        if self.connection_class == ConnectionClass::Disconnected {
            return MIN_BATCH_SIZE;
        }
        let base = self.connection_class.base_batch_size();
        let Some(rate) = self.success_rate() else {
            return base;
        };
        let scaled = if rate >= 0.90 {
            base
        } else if rate >= 0.70 {
            base * 3 / 4
        } else if rate >= 0.50 {
            base / 2
        } else {
            MIN_BATCH_SIZE
        };
        scaled.clamp(MIN_BATCH_SIZE, MAX_BATCH_SIZE)
    }

    /// Returns a snapshot of the estimator state for status reporting.
    #[must_use]
    pub fn snapshot(&self) -> NetworkSnapshot {
        NetworkSnapshot {
            connection_class: self.connection_class,
            sample_count: self.samples.len(),
            success_rate: self.success_rate(),
            recommended_size: self.recommended_size(),
        }
    }
}

// ============================================================================
// SECTION: Snapshot
// ============================================================================

/// Point-in-time view of the estimator for status feeds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    /// Connection class at snapshot time.
    pub connection_class: ConnectionClass,
    /// Number of samples in the rolling window.
    pub sample_count: usize,
    /// Rolling success rate, absent below the scaling threshold.
    pub success_rate: Option<f64>,
    /// Recommended batch size at snapshot time.
    pub recommended_size: usize,
}
