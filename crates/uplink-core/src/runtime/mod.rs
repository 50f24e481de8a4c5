// crates/uplink-core/src/runtime/mod.rs
// ============================================================================
// Module: Uplink Runtime
// Description: Upload engine, supervision loops, tick scheduler, and helpers.
// Purpose: Drive deliveries and self-monitoring over the interface seams.
// Dependencies: crate::{core, interfaces}, rand, tracing
// ============================================================================

//! ## Overview
//! Runtime modules implement the batch upload cycle, the health and
//! permission supervisors, the re-armable tick scheduler, and the status
//! hub. Every component is constructed explicitly and injected; there is no
//! hidden global state.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod health;
pub mod hosts;
pub mod permissions;
pub mod scheduler;
pub mod status;
pub mod store;
pub mod uploader;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use health::HealthCheckCoordinator;
pub use hosts::ManualClock;
pub use hosts::StaticConnectivity;
pub use hosts::SystemClock;
pub use permissions::PermissionGuard;
pub use scheduler::SchedulerError;
pub use scheduler::TickHandle;
pub use scheduler::TickOutcome;
pub use scheduler::spawn_tick;
pub use status::EngineStatus;
pub use status::StatusEvent;
pub use status::StatusHub;
pub use store::DEFAULT_MAX_PAYLOAD_BYTES;
pub use store::InMemoryQueueStore;
pub use store::SharedQueueStore;
pub use uploader::BatchOutcome;
pub use uploader::BatchUploader;
pub use uploader::CycleReport;
pub use uploader::StreamCycleResult;
pub use uploader::UploaderConfig;
