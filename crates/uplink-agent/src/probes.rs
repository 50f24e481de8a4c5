// crates/uplink-agent/src/probes.rs
// ============================================================================
// Module: Uplink Agent Health Probes
// Description: Store readiness and storage pressure probes for the agent.
// Purpose: Surface queue store problems through the health coordinator.
// Dependencies: uplink-core, tracing
// ============================================================================

//! ## Overview
//! The agent registers two probes with the health coordinator: one that
//! checks the queue store answers at all, and one that watches the store size
//! against the configured warn threshold. Storage pressure recovery runs an
//! immediate retention purge, which frees the space held by delivered and
//! terminally failed items without touching anything still owed to the
//! endpoint.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use tracing::info;
use uplink_core::Clock;
use uplink_core::HealthProbe;
use uplink_core::HealthStatus;
use uplink_core::ProbeError;
use uplink_core::QueueStore;
use uplink_core::SharedQueueStore;

// ============================================================================
// SECTION: Store Readiness
// ============================================================================

/// Health probe reporting whether the queue store answers.
pub struct StoreReadinessProbe {
    /// Store handle under observation.
    store: SharedQueueStore,
}

impl StoreReadinessProbe {
    /// Creates a readiness probe over a store handle.
    #[must_use]
    pub const fn new(store: SharedQueueStore) -> Self {
        Self {
            store,
        }
    }
}

impl HealthProbe for StoreReadinessProbe {
    fn name(&self) -> &str {
        "queue-store"
    }

    fn check(&self) -> HealthStatus {
        match self.store.readiness() {
            Ok(()) => HealthStatus::Healthy,
            Err(error) => HealthStatus::Unhealthy {
                reason: error.to_string(),
            },
        }
    }

    /// Readiness failures are usually transient lock contention, so recovery
    /// is a fresh probe; a version mismatch or corruption stays unhealthy.
    fn recover(&self) -> Result<(), ProbeError> {
        self.store
            .readiness()
            .map_err(|error| ProbeError::ActionFailed(error.to_string()))
    }
}

// ============================================================================
// SECTION: Storage Pressure
// ============================================================================

/// Health probe watching store size against the configured warn threshold.
pub struct StoragePressureProbe {
    /// Store handle under observation.
    store: SharedQueueStore,
    /// Clock anchoring stats and purge timestamps.
    clock: Arc<dyn Clock>,
    /// Store size in bytes above which the probe reports unhealthy.
    warn_threshold_bytes: u64,
    /// Retention window handed to the recovery purge.
    retention_ms: u64,
}

impl StoragePressureProbe {
    /// Creates a storage pressure probe.
    #[must_use]
    pub fn new(
        store: SharedQueueStore,
        clock: Arc<dyn Clock>,
        warn_threshold_bytes: u64,
        retention_ms: u64,
    ) -> Self {
        Self {
            store,
            clock,
            warn_threshold_bytes,
            retention_ms,
        }
    }
}

impl HealthProbe for StoragePressureProbe {
    fn name(&self) -> &str {
        "queue-storage"
    }

    fn check(&self) -> HealthStatus {
        match self.store.stats(self.clock.now()) {
            Ok(stats) => {
                if stats.store_size_bytes >= self.warn_threshold_bytes {
                    HealthStatus::Unhealthy {
                        reason: format!(
                            "store size {} bytes at or above threshold {} bytes",
                            stats.store_size_bytes, self.warn_threshold_bytes
                        ),
                    }
                } else {
                    HealthStatus::Healthy
                }
            }
            Err(error) => HealthStatus::Unhealthy {
                reason: format!("queue stats unavailable: {error}"),
            },
        }
    }

    fn recover(&self) -> Result<(), ProbeError> {
        let purged = self
            .store
            .purge_expired(self.retention_ms, self.clock.now())
            .map_err(|error| ProbeError::ActionFailed(error.to_string()))?;
        info!(purged, "storage pressure purge completed");
        Ok(())
    }
}
