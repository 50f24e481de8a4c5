// crates/uplink-core/src/runtime/status.rs
// ============================================================================
// Module: Uplink Status Hub
// Description: Aggregated engine status with pull and bounded push observation.
// Purpose: Expose queue, network, health, and permission state to hosts.
// Dependencies: crate::{core, interfaces, runtime}, serde, tracing
// ============================================================================

//! ## Overview
//! The status hub is the single observation point for the engine. Supervisors
//! push their latest results after each tick; hosts either pull a combined
//! [`EngineStatus`] or subscribe to a bounded event channel. Observation never
//! blocks the engine: a lagging subscriber loses events (counted), and a
//! disconnected one is dropped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::mpsc;
use std::sync::mpsc::Receiver;
use std::sync::mpsc::SyncSender;
use std::sync::mpsc::TrySendError;

use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

use crate::core::health::HealthReport;
use crate::core::item::QueueStats;
use crate::core::network::NetworkSnapshot;
use crate::core::permissions::PermissionEvent;
use crate::core::permissions::PermissionIssue;
use crate::interfaces::Clock;
use crate::interfaces::QueueStore;
use crate::runtime::store::SharedQueueStore;
use crate::runtime::uploader::CycleReport;

// ============================================================================
// SECTION: Status Types
// ============================================================================

/// Combined engine status for pull-based observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStatus {
    /// Aggregate queue counters, absent when the store read failed.
    pub queue: Option<QueueStats>,
    /// Estimator snapshot from the most recent cycle.
    pub network: Option<NetworkSnapshot>,
    /// Most recent upload cycle report.
    pub last_cycle: Option<CycleReport>,
    /// Current permission issues, at most one per capability.
    pub permission_issues: Vec<PermissionIssue>,
    /// Most recent health reports.
    pub health: Vec<HealthReport>,
    /// Events dropped across all lagging subscribers.
    pub dropped_events: u64,
}

/// Engine event pushed to subscribers.
///
/// # Invariants
/// - Variants are stable for serialization in host integrations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatusEvent {
    /// An upload cycle finished.
    CycleCompleted {
        /// Report for the finished cycle.
        report: CycleReport,
    },
    /// A health tick finished evaluating all probes.
    HealthEvaluated {
        /// Reports for every registered probe.
        reports: Vec<HealthReport>,
    },
    /// A permission transition was observed.
    PermissionChanged {
        /// The observed transition.
        event: PermissionEvent,
    },
}

// ============================================================================
// SECTION: Status Hub
// ============================================================================

/// Mutable hub state protected by the hub mutex.
#[derive(Default)]
struct HubState {
    /// Most recent upload cycle report.
    last_cycle: Option<CycleReport>,
    /// Most recent health reports.
    health: Vec<HealthReport>,
    /// Current permission issues.
    permission_issues: Vec<PermissionIssue>,
    /// Subscriber channels, pruned on disconnect.
    subscribers: Vec<SyncSender<StatusEvent>>,
    /// Events dropped across all lagging subscribers.
    dropped_events: u64,
}

/// Aggregation point for engine observation.
pub struct StatusHub {
    /// Store handle for on-demand queue stats.
    store: SharedQueueStore,
    /// Clock anchoring stat age calculations.
    clock: Arc<dyn Clock>,
    /// Hub state protected by a mutex.
    state: Mutex<HubState>,
}

impl StatusHub {
    /// Creates a status hub over a store handle and clock.
    #[must_use]
    pub fn new(store: SharedQueueStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            state: Mutex::new(HubState::default()),
        }
    }

    /// Locks the hub state, recovering the last written state on poison.
    fn lock_state(&self) -> MutexGuard<'_, HubState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Records a finished cycle and notifies subscribers.
    pub fn publish_cycle(&self, report: CycleReport) {
        let mut state = self.lock_state();
        state.last_cycle = Some(report.clone());
        broadcast(&mut state, &StatusEvent::CycleCompleted {
            report,
        });
    }

    /// Records the latest health reports and notifies subscribers.
    pub fn publish_health(&self, reports: Vec<HealthReport>) {
        let mut state = self.lock_state();
        state.health.clone_from(&reports);
        broadcast(&mut state, &StatusEvent::HealthEvaluated {
            reports,
        });
    }

    /// Records the current permission issues and notifies subscribers of
    /// each transition.
    pub fn publish_permissions(
        &self,
        issues: Vec<PermissionIssue>,
        events: Vec<PermissionEvent>,
    ) {
        let mut state = self.lock_state();
        state.permission_issues = issues;
        for event in events {
            broadcast(&mut state, &StatusEvent::PermissionChanged {
                event,
            });
        }
    }

    /// Registers a bounded subscriber and returns its receiving end.
    #[must_use]
    pub fn subscribe(&self, capacity: usize) -> Receiver<StatusEvent> {
        let (sender, receiver) = mpsc::sync_channel(capacity);
        self.lock_state().subscribers.push(sender);
        receiver
    }

    /// Returns the combined engine status.
    ///
    /// A failed stats read leaves `queue` empty rather than failing the
    /// observation.
    #[must_use]
    pub fn current(&self) -> EngineStatus {
        let queue = match self.store.stats(self.clock.now()) {
            Ok(stats) => Some(stats),
            Err(error) => {
                warn!(error = %error, "queue stats unavailable for status");
                None
            }
        };
        let state = self.lock_state();
        EngineStatus {
            queue,
            network: state.last_cycle.as_ref().map(|cycle| cycle.connection),
            last_cycle: state.last_cycle.clone(),
            permission_issues: state.permission_issues.clone(),
            health: state.health.clone(),
            dropped_events: state.dropped_events,
        }
    }

    /// Returns the number of events dropped across all subscribers.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.lock_state().dropped_events
    }
}

/// Sends one event to every subscriber, counting drops and pruning
/// disconnected channels.
fn broadcast(state: &mut HubState, event: &StatusEvent) {
    let dropped = &mut state.dropped_events;
    state.subscribers.retain(|subscriber| {
        match subscriber.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                *dropped += 1;
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    });
}
