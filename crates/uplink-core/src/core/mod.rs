// crates/uplink-core/src/core/mod.rs
// ============================================================================
// Module: Uplink Core Types
// Description: Canonical queue, batching, retry, and supervision structures.
// Purpose: Provide stable, serializable types for the delivery engine.
// Dependencies: rand, serde
// ============================================================================

//! ## Overview
//! Uplink core types define queue items, upload batches, the retry policy,
//! the network condition estimator, and the supervision value types. These
//! types are the canonical source of truth for any derived surfaces (CLI,
//! status feeds, or embedding hosts).

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod batch;
pub mod health;
pub mod identifiers;
pub mod item;
pub mod network;
pub mod permissions;
pub mod retry;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use batch::BatchMetadata;
pub use batch::UploadBatch;
pub use health::HealthReport;
pub use health::HealthStatus;
pub use health::RecoveryResult;
pub use identifiers::CapabilityId;
pub use identifiers::DeviceId;
pub use identifiers::ItemId;
pub use identifiers::StreamName;
pub use item::ItemStatus;
pub use item::QueueItem;
pub use item::QueueStats;
pub use network::ConnectionClass;
pub use network::NetworkConditionEstimator;
pub use network::NetworkSnapshot;
pub use permissions::PermissionEvent;
pub use permissions::PermissionIssue;
pub use retry::DEFAULT_MAX_ATTEMPTS;
pub use retry::RetryPolicy;
pub use time::Timestamp;
