// crates/uplink-core/src/runtime/permissions.rs
// ============================================================================
// Module: Uplink Permission Guard
// Description: Capability authorization polling with downgrade handling.
// Purpose: Stop dependent collectors on revocation and track actionable issues.
// Dependencies: crate::{core, interfaces}, tracing
// ============================================================================

//! ## Overview
//! The guard polls each registered capability and reacts to transitions, not
//! states: a downgrade stops the dependent collector exactly once and raises
//! an issue, an initial denial raises an issue without stopping anything, and
//! a restoration clears the issue. The guard is the only writer of the issue
//! set, so hosts read a consistent view between polls.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;
use tracing::warn;

use crate::core::identifiers::CapabilityId;
use crate::core::permissions::PermissionEvent;
use crate::core::permissions::PermissionIssue;
use crate::interfaces::CapabilitySource;
use crate::interfaces::CollectorControl;

// ============================================================================
// SECTION: Guard
// ============================================================================

/// One monitored capability and the collector depending on it.
struct CapabilityBinding {
    /// Authorization source for the capability.
    source: Arc<dyn CapabilitySource>,
    /// Control surface of the dependent collector.
    collector: Arc<dyn CollectorControl>,
}

/// Polls capability authorization and reacts to transitions.
#[derive(Default)]
pub struct PermissionGuard {
    /// Registered bindings in registration order.
    bindings: Vec<CapabilityBinding>,
    /// Last observed authorization per capability.
    observed: BTreeMap<CapabilityId, bool>,
    /// Current issues, at most one per capability.
    issues: BTreeMap<CapabilityId, PermissionIssue>,
}

impl PermissionGuard {
    /// Creates an empty guard.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
            observed: BTreeMap::new(),
            issues: BTreeMap::new(),
        }
    }

    /// Registers a capability source with its dependent collector.
    pub fn register(
        &mut self,
        source: Arc<dyn CapabilitySource>,
        collector: Arc<dyn CollectorControl>,
    ) {
        self.bindings.push(CapabilityBinding {
            source,
            collector,
        });
    }

    /// Returns the number of registered bindings.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// Returns the current issues ordered by capability.
    #[must_use]
    pub fn issues(&self) -> Vec<PermissionIssue> {
        self.issues.values().cloned().collect()
    }

    /// Polls every binding once and returns the observed transitions.
    pub fn poll(&mut self) -> Vec<PermissionEvent> {
        let mut events = Vec::new();
        for binding in &self.bindings {
            let capability = binding.source.capability().clone();
            let authorized = binding.source.is_authorized();
            let previous = self.observed.get(&capability).copied();
            match (previous, authorized) {
                (Some(true), false) => {
                    warn!(capability = %capability, "capability authorization revoked");
                    let stop_error = match binding.collector.stop() {
                        Ok(()) => None,
                        Err(error) => {
                            warn!(
                                capability = %capability,
                                error = %error,
                                "collector stop failed after revocation"
                            );
                            Some(error.to_string())
                        }
                    };
                    self.issues.insert(capability.clone(), PermissionIssue {
                        capability: capability.clone(),
                        message: format!("authorization for '{capability}' was revoked"),
                        suggested_action: "re-grant access in system settings".to_string(),
                    });
                    events.push(PermissionEvent::Downgraded {
                        capability: capability.clone(),
                        stop_error,
                    });
                }
                (None, false) => {
                    info!(capability = %capability, "capability unauthorized at first check");
                    self.issues.insert(capability.clone(), PermissionIssue {
                        capability: capability.clone(),
                        message: format!("'{capability}' is not authorized"),
                        suggested_action: "grant access in system settings".to_string(),
                    });
                    events.push(PermissionEvent::InitialDenial {
                        capability: capability.clone(),
                    });
                }
                (Some(false), true) | (None, true) => {
                    if self.issues.remove(&capability).is_some() || previous == Some(false) {
                        info!(capability = %capability, "capability authorization restored");
                        events.push(PermissionEvent::Restored {
                            capability: capability.clone(),
                        });
                    }
                }
                (Some(false), false) | (Some(true), true) => {}
            }
            self.observed.insert(capability, authorized);
        }
        events
    }
}
