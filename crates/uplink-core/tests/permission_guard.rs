// crates/uplink-core/tests/permission_guard.rs
// ============================================================================
// Module: Permission Guard Tests
// Description: Tests for capability polling and downgrade handling.
// Purpose: Validate transition detection, collector stops, and issue lifecycle.
// Dependencies: uplink-core
// ============================================================================
//! ## Overview
//! Drives the permission guard with settable capability sources and counting
//! collector controls, asserting that downgrades stop collectors exactly
//! once, initial denials stay quiet, and restorations clear issues.
//!
//! Security posture: Revoked capabilities stop data collection immediately.
//! Threat model: TM-PERM-001 - Collection continuing after revocation.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    clippy::missing_docs_in_private_items,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use uplink_core::CapabilityId;
use uplink_core::CapabilitySource;
use uplink_core::CollectorControl;
use uplink_core::PermissionEvent;
use uplink_core::PermissionGuard;
use uplink_core::ProbeError;

/// Capability source with an externally settable authorization flag.
struct SettableSource {
    /// Monitored capability.
    capability: CapabilityId,
    /// Current authorization.
    authorized: AtomicBool,
}

impl SettableSource {
    fn new(capability: &str, authorized: bool) -> Arc<Self> {
        Arc::new(Self {
            capability: CapabilityId::new(capability),
            authorized: AtomicBool::new(authorized),
        })
    }

    fn set_authorized(&self, authorized: bool) {
        self.authorized.store(authorized, Ordering::SeqCst);
    }
}

impl CapabilitySource for SettableSource {
    fn capability(&self) -> &CapabilityId {
        &self.capability
    }

    fn is_authorized(&self) -> bool {
        self.authorized.load(Ordering::SeqCst)
    }
}

/// Collector control counting stop and start calls.
struct CountingCollector {
    /// Stop invocations.
    stops: AtomicU64,
    /// Start invocations.
    starts: AtomicU64,
    /// Whether stop calls fail.
    fail_stop: bool,
}

impl CountingCollector {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            stops: AtomicU64::new(0),
            starts: AtomicU64::new(0),
            fail_stop: false,
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            stops: AtomicU64::new(0),
            starts: AtomicU64::new(0),
            fail_stop: true,
        })
    }

    fn stop_count(&self) -> u64 {
        self.stops.load(Ordering::SeqCst)
    }

    fn start_count(&self) -> u64 {
        self.starts.load(Ordering::SeqCst)
    }
}

impl CollectorControl for CountingCollector {
    fn stop(&self) -> Result<(), ProbeError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if self.fail_stop {
            Err(ProbeError::ActionFailed("collector busy".to_string()))
        } else {
            Ok(())
        }
    }

    fn start(&self) -> Result<(), ProbeError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Verifies an authorized capability at first poll stays quiet.
#[test]
fn authorized_first_poll_is_quiet() {
    let source = SettableSource::new("location", true);
    let collector = CountingCollector::new();
    let mut guard = PermissionGuard::new();
    guard.register(
        Arc::clone(&source) as Arc<dyn CapabilitySource>,
        Arc::clone(&collector) as Arc<dyn CollectorControl>,
    );

    let events = guard.poll();

    assert!(events.is_empty());
    assert!(guard.issues().is_empty());
    assert_eq!(collector.stop_count(), 0);
}

/// Verifies an initial denial raises an issue without stopping anything.
#[test]
fn initial_denial_raises_issue_without_stop() {
    let source = SettableSource::new("motion", false);
    let collector = CountingCollector::new();
    let mut guard = PermissionGuard::new();
    guard.register(
        Arc::clone(&source) as Arc<dyn CapabilitySource>,
        Arc::clone(&collector) as Arc<dyn CollectorControl>,
    );

    let events = guard.poll();

    assert_eq!(events, vec![PermissionEvent::InitialDenial {
        capability: CapabilityId::new("motion"),
    }]);
    let issues = guard.issues();
    assert_eq!(issues.len(), 1);
    assert!(issues[0].message.contains("not authorized"));
    assert_eq!(collector.stop_count(), 0);

    // A repeat poll in the same state is not a new transition.
    assert!(guard.poll().is_empty());
    assert_eq!(guard.issues().len(), 1);
}

/// Verifies a downgrade stops the collector exactly once and raises an
/// issue.
#[test]
fn downgrade_stops_collector_once() {
    let source = SettableSource::new("location", true);
    let collector = CountingCollector::new();
    let mut guard = PermissionGuard::new();
    guard.register(
        Arc::clone(&source) as Arc<dyn CapabilitySource>,
        Arc::clone(&collector) as Arc<dyn CollectorControl>,
    );

    assert!(guard.poll().is_empty());
    source.set_authorized(false);
    let events = guard.poll();

    assert_eq!(events, vec![PermissionEvent::Downgraded {
        capability: CapabilityId::new("location"),
        stop_error: None,
    }]);
    assert_eq!(collector.stop_count(), 1);
    let issues = guard.issues();
    assert_eq!(issues.len(), 1);
    assert!(issues[0].message.contains("revoked"));

    // Still revoked on the next poll: no second stop, no new event.
    assert!(guard.poll().is_empty());
    assert_eq!(collector.stop_count(), 1);
}

/// Verifies a failed collector stop is carried in the downgrade event.
#[test]
fn failed_stop_is_reported_in_event() {
    let source = SettableSource::new("location", true);
    let collector = CountingCollector::failing();
    let mut guard = PermissionGuard::new();
    guard.register(
        Arc::clone(&source) as Arc<dyn CapabilitySource>,
        Arc::clone(&collector) as Arc<dyn CollectorControl>,
    );

    assert!(guard.poll().is_empty());
    source.set_authorized(false);
    let events = guard.poll();

    match &events[0] {
        PermissionEvent::Downgraded {
            stop_error: Some(reason),
            ..
        } => assert!(reason.contains("collector busy")),
        other => panic!("unexpected event: {other:?}"),
    }
    // The issue is raised even when the stop action failed.
    assert_eq!(guard.issues().len(), 1);
}

/// Verifies restoration clears the issue and emits a restore event.
#[test]
fn restoration_clears_issue() {
    let source = SettableSource::new("location", true);
    let collector = CountingCollector::new();
    let mut guard = PermissionGuard::new();
    guard.register(
        Arc::clone(&source) as Arc<dyn CapabilitySource>,
        Arc::clone(&collector) as Arc<dyn CollectorControl>,
    );

    assert!(guard.poll().is_empty());
    source.set_authorized(false);
    assert_eq!(guard.poll().len(), 1);
    source.set_authorized(true);
    let events = guard.poll();

    assert_eq!(events, vec![PermissionEvent::Restored {
        capability: CapabilityId::new("location"),
    }]);
    assert!(guard.issues().is_empty());
    assert_eq!(collector.start_count(), 0);
}

/// Verifies a revoke-restore-revoke sequence replaces the issue rather
/// than accumulating.
#[test]
fn issues_are_replaced_not_accumulated() {
    let source = SettableSource::new("motion", false);
    let collector = CountingCollector::new();
    let mut guard = PermissionGuard::new();
    guard.register(
        Arc::clone(&source) as Arc<dyn CapabilitySource>,
        Arc::clone(&collector) as Arc<dyn CollectorControl>,
    );

    // Initial denial, then grant, then revoke.
    assert_eq!(guard.poll().len(), 1);
    source.set_authorized(true);
    assert_eq!(guard.poll().len(), 1);
    source.set_authorized(false);
    assert_eq!(guard.poll().len(), 1);

    let issues = guard.issues();
    assert_eq!(issues.len(), 1);
    assert!(issues[0].message.contains("revoked"));
    assert_eq!(collector.stop_count(), 1);
}

/// Verifies independent capabilities are tracked separately.
#[test]
fn capabilities_are_tracked_independently() {
    let location = SettableSource::new("location", true);
    let motion = SettableSource::new("motion", true);
    let location_collector = CountingCollector::new();
    let motion_collector = CountingCollector::new();
    let mut guard = PermissionGuard::new();
    guard.register(
        Arc::clone(&location) as Arc<dyn CapabilitySource>,
        Arc::clone(&location_collector) as Arc<dyn CollectorControl>,
    );
    guard.register(
        Arc::clone(&motion) as Arc<dyn CapabilitySource>,
        Arc::clone(&motion_collector) as Arc<dyn CollectorControl>,
    );

    assert_eq!(guard.binding_count(), 2);
    assert!(guard.poll().is_empty());

    location.set_authorized(false);
    let events = guard.poll();

    assert_eq!(events.len(), 1);
    assert_eq!(location_collector.stop_count(), 1);
    assert_eq!(motion_collector.stop_count(), 0);
    assert_eq!(guard.issues().len(), 1);
    assert_eq!(guard.issues()[0].capability, CapabilityId::new("location"));
}
