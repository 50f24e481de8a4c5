// crates/uplink-core/src/runtime/health.rs
// ============================================================================
// Module: Uplink Health Coordinator
// Description: Periodic probe evaluation with per-subsystem recovery.
// Purpose: Detect silently-stopped subsystems and restart them in place.
// Dependencies: crate::{core, interfaces}, tracing
// ============================================================================

//! ## Overview
//! The coordinator iterates registered probes on each health tick. An
//! unhealthy check triggers that probe's own recovery action; the outcome is
//! reported, never escalated, so one failing subsystem cannot take down the
//! tick. Disabled subsystems are observed without action.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::core::health::HealthReport;
use crate::core::health::HealthStatus;
use crate::core::health::RecoveryResult;
use crate::interfaces::HealthProbe;

// ============================================================================
// SECTION: Coordinator
// ============================================================================

/// Runs registered health probes and their recovery actions.
#[derive(Default)]
pub struct HealthCheckCoordinator {
    /// Registered probes in registration order.
    probes: Vec<Arc<dyn HealthProbe>>,
}

impl HealthCheckCoordinator {
    /// Creates an empty coordinator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            probes: Vec::new(),
        }
    }

    /// Registers a probe; checks run in registration order.
    pub fn register(&mut self, probe: Arc<dyn HealthProbe>) {
        self.probes.push(probe);
    }

    /// Returns the number of registered probes.
    #[must_use]
    pub fn probe_count(&self) -> usize {
        self.probes.len()
    }

    /// Checks every probe, recovering unhealthy subsystems in place.
    #[must_use]
    pub fn run_checks(&self) -> Vec<HealthReport> {
        let mut reports = Vec::with_capacity(self.probes.len());
        for probe in &self.probes {
            let name = probe.name().to_string();
            let status = probe.check();
            let recovery = match &status {
                HealthStatus::Healthy => {
                    debug!(subsystem = %name, "health check passed");
                    None
                }
                HealthStatus::Disabled => {
                    debug!(subsystem = %name, "subsystem disabled");
                    None
                }
                HealthStatus::Unhealthy {
                    reason,
                } => {
                    warn!(subsystem = %name, reason = %reason, "health check failed");
                    Some(match probe.recover() {
                        Ok(()) => {
                            info!(subsystem = %name, "recovery succeeded");
                            RecoveryResult::Succeeded
                        }
                        Err(recover_error) => {
                            error!(
                                subsystem = %name,
                                error = %recover_error,
                                "recovery failed"
                            );
                            RecoveryResult::Failed {
                                reason: recover_error.to_string(),
                            }
                        }
                    })
                }
            };
            reports.push(HealthReport {
                name,
                status,
                recovery,
            });
        }
        reports
    }
}
