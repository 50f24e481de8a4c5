// crates/uplink-core/src/core/health.rs
// ============================================================================
// Module: Uplink Health Values
// Description: Health status and per-subsystem check reports.
// Purpose: Provide the observational values produced by health ticks.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Health values are purely observational: each health tick produces one
//! status per registered subsystem plus the outcome of any recovery it
//! triggered. Nothing here is persisted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Health Status
// ============================================================================

/// Health of one monitored subsystem.
///
/// # Invariants
/// - Variants are stable for serialization and status feeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HealthStatus {
    /// Subsystem is operating normally.
    Healthy,
    /// Subsystem reported a problem; recovery should be attempted.
    Unhealthy {
        /// Human-readable failure description.
        reason: String,
    },
    /// Subsystem is intentionally off; no action required.
    Disabled,
}

// ============================================================================
// SECTION: Check Reports
// ============================================================================

/// Outcome of a recovery action triggered by an unhealthy check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecoveryResult {
    /// The subsystem's recovery action completed.
    Succeeded,
    /// The subsystem's recovery action failed.
    Failed {
        /// Human-readable failure description.
        reason: String,
    },
}

/// Result of one subsystem check within a health tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Registered subsystem name.
    pub name: String,
    /// Reported status.
    pub status: HealthStatus,
    /// Recovery outcome when a recovery was triggered.
    pub recovery: Option<RecoveryResult>,
}
