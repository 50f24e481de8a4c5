// crates/uplink-core/src/core/permissions.rs
// ============================================================================
// Module: Uplink Permission Values
// Description: Permission issues and capability transition events.
// Purpose: Provide the user-facing values produced by permission monitoring.
// Dependencies: crate::core::identifiers, serde
// ============================================================================

//! ## Overview
//! Permission values describe authorization transitions per capability. An
//! issue is replaced, never appended, so at most one exists per capability at
//! any time. A downgrade (authorized then revoked) is distinct from the
//! non-alarming case of a capability first observed unauthorized.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::CapabilityId;

// ============================================================================
// SECTION: Permission Issues
// ============================================================================

/// User-actionable record of a capability that is not authorized.
///
/// # Invariants
/// - At most one issue exists per capability (replace-on-update semantics).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionIssue {
    /// Capability the issue concerns.
    pub capability: CapabilityId,
    /// Human-readable description of the problem.
    pub message: String,
    /// Suggested user action to resolve the issue.
    pub suggested_action: String,
}

// ============================================================================
// SECTION: Transition Events
// ============================================================================

/// Authorization transition observed during one permission check.
///
/// # Invariants
/// - Variants are stable for serialization and status feeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PermissionEvent {
    /// A previously authorized capability was revoked; the dependent
    /// collector was stopped.
    Downgraded {
        /// Capability that lost authorization.
        capability: CapabilityId,
        /// Failure description when the collector stop action failed.
        stop_error: Option<String>,
    },
    /// A capability was first observed unauthorized; nothing was running.
    InitialDenial {
        /// Capability observed unauthorized.
        capability: CapabilityId,
    },
    /// A capability regained authorization; its issue was cleared.
    Restored {
        /// Capability that regained authorization.
        capability: CapabilityId,
    },
}
