// crates/uplink-core/src/runtime/hosts.rs
// ============================================================================
// Module: Uplink Host Adapters
// Description: System clock, manual clock, and fixed connectivity adapters.
// Purpose: Provide host seam implementations for production and tests.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! This module provides the stock implementations of the host seams: a
//! wall-clock [`Clock`], a manually advanced clock for deterministic tests,
//! and a connectivity probe with an externally settable class for fixed
//! deployments and tests.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use crate::core::network::ConnectionClass;
use crate::core::time::Timestamp;
use crate::interfaces::Clock;
use crate::interfaces::ConnectivityProbe;

// ============================================================================
// SECTION: System Clock
// ============================================================================

/// Wall-clock [`Clock`] backed by [`SystemTime`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    /// Creates a new system clock.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX));
        Timestamp::from_unix_millis(millis)
    }
}

// ============================================================================
// SECTION: Manual Clock
// ============================================================================

/// Manually advanced [`Clock`] for deterministic tests.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    /// Current time protected by a mutex.
    now: Arc<Mutex<Timestamp>>,
}

impl ManualClock {
    /// Creates a manual clock starting at the given time.
    #[must_use]
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Sets the current time.
    pub fn set(&self, now: Timestamp) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    /// Advances the current time by `millis`.
    pub fn advance_millis(&self, millis: u64) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = guard.saturating_add_millis(millis);
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.lock().map_or_else(|_| Timestamp::default(), |guard| *guard)
    }
}

// ============================================================================
// SECTION: Static Connectivity
// ============================================================================

/// Connectivity probe with an externally settable class.
///
/// Suitable for deployments with a fixed uplink and for tests; hosts with
/// real connectivity monitoring implement [`ConnectivityProbe`] directly.
#[derive(Debug, Clone)]
pub struct StaticConnectivity {
    /// Current class protected by a mutex.
    class: Arc<Mutex<ConnectionClass>>,
}

impl Default for StaticConnectivity {
    fn default() -> Self {
        Self::new(ConnectionClass::Unknown)
    }
}

impl StaticConnectivity {
    /// Creates a probe reporting the given class.
    #[must_use]
    pub fn new(class: ConnectionClass) -> Self {
        Self {
            class: Arc::new(Mutex::new(class)),
        }
    }

    /// Updates the reported class.
    pub fn set(&self, class: ConnectionClass) {
        if let Ok(mut guard) = self.class.lock() {
            *guard = class;
        }
    }
}

impl ConnectivityProbe for StaticConnectivity {
    fn connection_class(&self) -> ConnectionClass {
        self.class.lock().map_or(ConnectionClass::Unknown, |guard| *guard)
    }
}
