// crates/uplink-core/src/lib.rs
// ============================================================================
// Module: Uplink Core Library
// Description: Public API surface for the Uplink delivery engine.
// Purpose: Expose core types, interfaces, and runtime components.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Uplink core implements a resilient store-and-forward delivery engine: a
//! durable queue of telemetry items, adaptive batch uploads with bounded
//! retries, and periodic health and permission supervision. It is
//! backend-agnostic and integrates through explicit interfaces rather than
//! embedding platform or storage specifics.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::CapabilitySource;
pub use interfaces::Clock;
pub use interfaces::CollectorControl;
pub use interfaces::ConnectivityProbe;
pub use interfaces::HealthProbe;
pub use interfaces::MAX_STREAM_NAME_LENGTH;
pub use interfaces::ProbeError;
pub use interfaces::QueueStore;
pub use interfaces::RetrySchedule;
pub use interfaces::StoreError;
pub use interfaces::TransportError;
pub use interfaces::UploadReceipt;
pub use interfaces::UploadTransport;
pub use interfaces::validate_payload;
pub use interfaces::validate_stream_name;
pub use runtime::BatchOutcome;
pub use runtime::BatchUploader;
pub use runtime::CycleReport;
pub use runtime::DEFAULT_MAX_PAYLOAD_BYTES;
pub use runtime::EngineStatus;
pub use runtime::HealthCheckCoordinator;
pub use runtime::InMemoryQueueStore;
pub use runtime::ManualClock;
pub use runtime::PermissionGuard;
pub use runtime::SchedulerError;
pub use runtime::SharedQueueStore;
pub use runtime::StaticConnectivity;
pub use runtime::StatusEvent;
pub use runtime::StatusHub;
pub use runtime::StreamCycleResult;
pub use runtime::SystemClock;
pub use runtime::TickHandle;
pub use runtime::TickOutcome;
pub use runtime::UploaderConfig;
pub use runtime::spawn_tick;
