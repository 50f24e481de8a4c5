// crates/uplink-agent/src/runtime.rs
// ============================================================================
// Module: Uplink Agent Runtime
// Description: Component assembly and tick supervision for the agent.
// Purpose: Build the engine from validated config and drive its three loops.
// Dependencies: uplink-core, uplink-config, uplink-store-sqlite, uplink-transport
// ============================================================================

//! ## Overview
//! [`AgentRuntime`] assembles the delivery engine from a validated
//! configuration: the queue store backend, the HTTP ingest transport, the
//! batch uploader with its estimator, the health coordinator with the agent's
//! two store probes, and the permission guard. [`AgentRuntime::start`] spawns
//! the sync, health, and permission tick workers after running one inline
//! cycle of each, so a fresh start drains backlog immediately instead of
//! waiting out the first interval.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::time::Duration;

use thiserror::Error;
use tracing::info;
use uplink_config::StoreType;
use uplink_config::UplinkConfig;
use uplink_core::BatchUploader;
use uplink_core::CapabilitySource;
use uplink_core::Clock;
use uplink_core::CollectorControl;
use uplink_core::DEFAULT_MAX_ATTEMPTS;
use uplink_core::DeviceId;
use uplink_core::HealthCheckCoordinator;
use uplink_core::InMemoryQueueStore;
use uplink_core::PermissionGuard;
use uplink_core::SchedulerError;
use uplink_core::SharedQueueStore;
use uplink_core::StaticConnectivity;
use uplink_core::StatusHub;
use uplink_core::SystemClock;
use uplink_core::TickHandle;
use uplink_core::TickOutcome;
use uplink_core::UploaderConfig;
use uplink_core::spawn_tick;
use uplink_store_sqlite::SqliteQueueConfig;
use uplink_store_sqlite::SqliteQueueStore;
use uplink_transport::HttpIngestTransport;
use uplink_transport::HttpTransportConfig;

use crate::probes::StoragePressureProbe;
use crate::probes::StoreReadinessProbe;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Agent assembly and supervision errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Queue store construction failed.
    #[error("agent store error: {0}")]
    Store(String),
    /// Upload transport construction failed.
    #[error("agent transport error: {0}")]
    Transport(String),
    /// Tick worker scheduling failed.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

// ============================================================================
// SECTION: Store Assembly
// ============================================================================

/// Builds the queue store selected by the configuration.
///
/// # Errors
///
/// Returns [`AgentError::Store`] when the sqlite backend cannot be opened.
pub fn open_store(config: &UplinkConfig) -> Result<SharedQueueStore, AgentError> {
    match config.store.store_type {
        StoreType::Memory => {
            let store = InMemoryQueueStore::with_limits(
                DEFAULT_MAX_ATTEMPTS,
                config.store.max_payload_bytes,
            );
            Ok(SharedQueueStore::from_store(store))
        }
        StoreType::Sqlite => {
            let path = config
                .store
                .path
                .as_ref()
                .ok_or_else(|| AgentError::Store("sqlite store requires path".to_string()))?;
            let mut store_config = SqliteQueueConfig::new(path.clone());
            store_config.busy_timeout_ms = config.store.busy_timeout_ms;
            store_config.journal_mode = config.store.journal_mode;
            store_config.sync_mode = config.store.sync_mode;
            store_config.max_payload_bytes = config.store.max_payload_bytes;
            let store = SqliteQueueStore::new(store_config)
                .map_err(|error| AgentError::Store(error.to_string()))?;
            Ok(SharedQueueStore::from_store(store))
        }
    }
}

// ============================================================================
// SECTION: Runtime
// ============================================================================

/// Assembled delivery engine with its supervision loops.
pub struct AgentRuntime {
    /// Shared queue store handle.
    store: SharedQueueStore,
    /// Status hub observed by hosts and the CLI.
    status: Arc<StatusHub>,
    /// Batch uploader; one cycle runs at a time under the mutex.
    uploader: Arc<Mutex<BatchUploader>>,
    /// Health coordinator with the agent's store probes registered.
    health: Arc<HealthCheckCoordinator>,
    /// Permission guard; bindings are registered by the embedding host.
    guard: Arc<Mutex<PermissionGuard>>,
    /// Connectivity probe hosts update with observed connection classes.
    connectivity: Arc<StaticConnectivity>,
    /// Spacing between sync cycles in milliseconds.
    sync_interval_ms: u64,
    /// Spacing between health ticks in milliseconds.
    health_interval_ms: u64,
    /// Spacing between permission polls in milliseconds.
    permissions_interval_ms: u64,
}

impl AgentRuntime {
    /// Assembles the engine from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] when the store or transport cannot be built.
    pub fn new(config: &UplinkConfig) -> Result<Self, AgentError> {
        let store = open_store(config)?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let connectivity = Arc::new(StaticConnectivity::new(config.uploader.initial_connection));

        let mut transport_config = HttpTransportConfig::new(
            config.endpoint.ingest_url.clone(),
            config.device.device_token.clone(),
        );
        transport_config.timeout_ms = config.endpoint.request_timeout_ms;
        transport_config.max_response_bytes = config.endpoint.max_response_bytes;
        transport_config.user_agent = config.endpoint.user_agent.clone();
        transport_config.allow_http = config.endpoint.allow_http;
        let transport = HttpIngestTransport::new(transport_config)
            .map_err(|error| AgentError::Transport(error.to_string()))?;

        let mut uploader_config = UploaderConfig::new(
            DeviceId::new(config.device.device_id.clone()),
            config.device.app_version.clone(),
        );
        uploader_config.stale_grace_ms = config.uploader.stale_grace_ms;
        uploader_config.purge_interval_ms = config.uploader.purge_interval_ms;
        uploader_config.retention_ms = config.uploader.retention_ms;

        let uploader = BatchUploader::new(
            store.clone(),
            Arc::new(transport),
            clock.clone(),
            connectivity.clone(),
            uploader_config,
        );

        let mut health = HealthCheckCoordinator::new();
        health.register(Arc::new(StoreReadinessProbe::new(store.clone())));
        health.register(Arc::new(StoragePressureProbe::new(
            store.clone(),
            clock.clone(),
            config.storage.warn_threshold_bytes,
            config.uploader.retention_ms,
        )));

        let status = Arc::new(StatusHub::new(store.clone(), clock));
        Ok(Self {
            store,
            status,
            uploader: Arc::new(Mutex::new(uploader)),
            health: Arc::new(health),
            guard: Arc::new(Mutex::new(PermissionGuard::new())),
            connectivity,
            sync_interval_ms: config.uploader.sync_interval_ms,
            health_interval_ms: config.health.check_interval_ms,
            permissions_interval_ms: config.permissions.check_interval_ms,
        })
    }

    /// Returns the shared queue store handle.
    #[must_use]
    pub fn store(&self) -> SharedQueueStore {
        self.store.clone()
    }

    /// Returns the status hub.
    #[must_use]
    pub fn status(&self) -> Arc<StatusHub> {
        self.status.clone()
    }

    /// Returns the connectivity probe hosts update with observed classes.
    #[must_use]
    pub fn connectivity(&self) -> Arc<StaticConnectivity> {
        self.connectivity.clone()
    }

    /// Registers a capability source with its dependent collector.
    pub fn register_capability(
        &self,
        source: Arc<dyn CapabilitySource>,
        collector: Arc<dyn CollectorControl>,
    ) {
        lock_guard(&self.guard).register(source, collector);
    }

    /// Runs one cycle of every loop inline: sync, health, permissions.
    pub fn run_once(&self) {
        run_sync(&self.uploader, &self.status);
        run_health(&self.health, &self.status);
        run_permissions(&self.guard, &self.status);
    }

    /// Spawns the three tick workers after one inline cycle of each.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Scheduler`] when a worker cannot be spawned.
    pub fn start(&self) -> Result<AgentHandles, AgentError> {
        self.run_once();

        let uploader = self.uploader.clone();
        let status = self.status.clone();
        let sync = spawn_tick("sync", Duration::from_millis(self.sync_interval_ms), move || {
            run_sync(&uploader, &status);
        })?;

        let health = self.health.clone();
        let status = self.status.clone();
        let health_handle = spawn_tick(
            "health",
            Duration::from_millis(self.health_interval_ms),
            move || {
                run_health(&health, &status);
            },
        )?;

        let guard = self.guard.clone();
        let status = self.status.clone();
        let permissions = spawn_tick(
            "permissions",
            Duration::from_millis(self.permissions_interval_ms),
            move || {
                run_permissions(&guard, &status);
            },
        )?;

        info!(
            sync_interval_ms = self.sync_interval_ms,
            health_interval_ms = self.health_interval_ms,
            permissions_interval_ms = self.permissions_interval_ms,
            "agent loops started"
        );
        Ok(AgentHandles {
            sync,
            health: health_handle,
            permissions,
        })
    }
}

// ============================================================================
// SECTION: Handles
// ============================================================================

/// Tick counts reported by the loops on shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgentShutdown {
    /// Sync loop outcome.
    pub sync: TickOutcome,
    /// Health loop outcome.
    pub health: TickOutcome,
    /// Permission loop outcome.
    pub permissions: TickOutcome,
}

/// Handles owning the three spawned tick workers.
pub struct AgentHandles {
    /// Sync loop handle.
    sync: TickHandle,
    /// Health loop handle.
    health: TickHandle,
    /// Permission loop handle.
    permissions: TickHandle,
}

impl AgentHandles {
    /// Signals every loop and joins them.
    ///
    /// All three loops receive their shutdown signal before the first join
    /// result is inspected.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Scheduler`] when a worker panicked.
    pub fn stop(self) -> Result<AgentShutdown, AgentError> {
        let sync = self.sync.stop();
        let health = self.health.stop();
        let permissions = self.permissions.stop();
        let shutdown = AgentShutdown {
            sync: sync?,
            health: health?,
            permissions: permissions?,
        };
        info!(
            sync_ticks = shutdown.sync.ticks,
            health_ticks = shutdown.health.ticks,
            permission_ticks = shutdown.permissions.ticks,
            "agent loops stopped"
        );
        Ok(shutdown)
    }
}

// ============================================================================
// SECTION: Loop Bodies
// ============================================================================

/// Runs one sync cycle and publishes its report.
fn run_sync(uploader: &Mutex<BatchUploader>, status: &StatusHub) {
    let report = lock_uploader(uploader).run_cycle();
    status.publish_cycle(report);
}

/// Runs one health tick and publishes its reports.
fn run_health(health: &HealthCheckCoordinator, status: &StatusHub) {
    status.publish_health(health.run_checks());
}

/// Runs one permission poll and publishes issues and transitions.
fn run_permissions(guard: &Mutex<PermissionGuard>, status: &StatusHub) {
    let mut guard = lock_guard(guard);
    let events = guard.poll();
    let issues = guard.issues();
    drop(guard);
    status.publish_permissions(issues, events);
}

/// Locks the uploader, recovering the last written state on poison.
fn lock_uploader(uploader: &Mutex<BatchUploader>) -> MutexGuard<'_, BatchUploader> {
    uploader.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Locks the permission guard, recovering the last written state on poison.
fn lock_guard(guard: &Mutex<PermissionGuard>) -> MutexGuard<'_, PermissionGuard> {
    guard.lock().unwrap_or_else(PoisonError::into_inner)
}
