// crates/uplink-core/src/interfaces/mod.rs
// ============================================================================
// Module: Uplink Interfaces
// Description: Backend-agnostic interfaces for storage, transport, and hosts.
// Purpose: Define the contract surfaces used by the Uplink runtime.
// Dependencies: crate::core, serde, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how the delivery engine integrates with storage,
//! networking, and the host platform without embedding backend-specific
//! details. Implementations must fail closed on missing or invalid data, and
//! every operation that touches shared state takes an explicit timestamp so
//! hosts own clock discipline.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::batch::UploadBatch;
use crate::core::health::HealthStatus;
use crate::core::identifiers::CapabilityId;
use crate::core::identifiers::ItemId;
use crate::core::identifiers::StreamName;
use crate::core::item::QueueItem;
use crate::core::item::QueueStats;
use crate::core::network::ConnectionClass;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Queue Store
// ============================================================================

/// Queue store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("queue store io error: {0}")]
    Io(String),
    /// Store data is corrupted or fails integrity checks.
    #[error("queue store corruption: {0}")]
    Corrupt(String),
    /// Store schema version is incompatible.
    #[error("queue store version mismatch: {0}")]
    VersionMismatch(String),
    /// Input rejected at the store boundary.
    #[error("queue store invalid data: {0}")]
    Invalid(String),
    /// Payload exceeds the configured size limit.
    #[error("payload too large: {actual_bytes} bytes (max {max_bytes})")]
    PayloadTooLarge {
        /// Maximum allowed payload bytes.
        max_bytes: usize,
        /// Actual payload size in bytes.
        actual_bytes: usize,
    },
    /// Store reported an error.
    #[error("queue store error: {0}")]
    Store(String),
}

/// Retry deadline for one failed item, computed by the caller from the
/// retry policy so jitter is drawn exactly once per failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySchedule {
    /// Item the schedule applies to.
    pub item_id: ItemId,
    /// Jittered deadline before which the item must not be retried.
    pub next_attempt_at: Timestamp,
}

/// Durable queue store owning every [`QueueItem`].
///
/// Mutations are serialized by the implementation (single-writer
/// discipline); claims are atomic with the transition to `uploading` so two
/// concurrent cycles can never double-send an item.
pub trait QueueStore: Send + Sync {
    /// Appends a new pending item and returns its store-assigned identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when validation or the durable write fails.
    fn enqueue(
        &self,
        stream: &StreamName,
        payload: &[u8],
        now: Timestamp,
    ) -> Result<ItemId, StoreError>;

    /// Returns eligible items without mutating them: pending items plus
    /// failed items whose retry deadline has passed, ordered by `created_at`
    /// ascending.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn dequeue_eligible(
        &self,
        stream: Option<&StreamName>,
        limit: usize,
        now: Timestamp,
    ) -> Result<Vec<QueueItem>, StoreError>;

    /// Atomically claims up to `limit` eligible items for one stream,
    /// transitioning them to `uploading`, and returns the claimed rows.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the claim transaction fails.
    fn claim_eligible(
        &self,
        stream: &StreamName,
        limit: usize,
        now: Timestamp,
    ) -> Result<Vec<QueueItem>, StoreError>;

    /// Marks items completed; idempotent, returning the rows affected.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn mark_completed(&self, ids: &[ItemId], now: Timestamp) -> Result<u64, StoreError>;

    /// Marks items failed: increments `attempts`, sets `last_attempt_at`,
    /// and stores each supplied retry deadline. Returns the rows affected.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn mark_failed(&self, schedules: &[RetrySchedule], now: Timestamp) -> Result<u64, StoreError>;

    /// Reverts items stuck in `uploading` longer than `grace_ms` back to
    /// `failed`, exactly as if the upload had failed. Returns the rows
    /// affected.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the sweep fails.
    fn release_stale(&self, grace_ms: u64, now: Timestamp) -> Result<u64, StoreError>;

    /// Deletes completed items and terminal failures older than the
    /// retention window. Never deletes pending, uploading, or retry-eligible
    /// items regardless of age. Returns the rows deleted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the purge fails.
    fn purge_expired(&self, retention_ms: u64, now: Timestamp) -> Result<u64, StoreError>;

    /// Returns the distinct streams that currently have eligible items.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn pending_streams(&self, now: Timestamp) -> Result<Vec<StreamName>, StoreError>;

    /// Returns aggregate queue counters; `now` anchors age calculations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn stats(&self, now: Timestamp) -> Result<QueueStats, StoreError>;

    /// Reports store readiness for health probes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn readiness(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Boundary Validation
// ============================================================================

/// Maximum stream name length in bytes.
pub const MAX_STREAM_NAME_LENGTH: usize = 128;

/// Validates a stream name at the store boundary.
///
/// # Errors
///
/// Returns [`StoreError::Invalid`] when the name is empty, too long, or
/// contains characters outside `[a-z0-9_.-]`.
pub fn validate_stream_name(stream: &StreamName) -> Result<(), StoreError> {
    let name = stream.as_str();
    if name.is_empty() {
        return Err(StoreError::Invalid("stream name must be non-empty".to_string()));
    }
    if name.len() > MAX_STREAM_NAME_LENGTH {
        return Err(StoreError::Invalid("stream name exceeds max length".to_string()));
    }
    let valid = name.bytes().all(|byte| {
        byte.is_ascii_lowercase() || byte.is_ascii_digit() || matches!(byte, b'_' | b'-' | b'.')
    });
    if !valid {
        return Err(StoreError::Invalid(
            "stream name must use lowercase alphanumerics, underscore, dash, or dot".to_string(),
        ));
    }
    Ok(())
}

/// Validates a payload at the store boundary.
///
/// Payloads must be valid JSON so batches can embed them as records, and
/// must not exceed the configured size limit.
///
/// # Errors
///
/// Returns [`StoreError::PayloadTooLarge`] or [`StoreError::Invalid`] when
/// the payload violates either bound.
pub fn validate_payload(payload: &[u8], max_bytes: usize) -> Result<(), StoreError> {
    if payload.len() > max_bytes {
        return Err(StoreError::PayloadTooLarge {
            max_bytes,
            actual_bytes: payload.len(),
        });
    }
    if serde_json::from_slice::<serde_json::Value>(payload).is_err() {
        return Err(StoreError::Invalid("payload must be valid json".to_string()));
    }
    Ok(())
}

// ============================================================================
// SECTION: Upload Transport
// ============================================================================

/// Transport errors for batch uploads.
///
/// # Invariants
/// - Variants are stable for programmatic handling; auth rejection is kept
///   distinct from transient failures so callers can surface it.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Device identity rejected by the ingestion endpoint (401).
    #[error("device identity rejected: {0}")]
    AuthRejected(String),
    /// Timeout, connection failure, or other network-level error.
    #[error("upload transport failure: {0}")]
    Network(String),
    /// Non-success HTTP status outside the auth case.
    #[error("upload rejected with status {status}: {message}")]
    Status {
        /// HTTP status code returned by the endpoint.
        status: u16,
        /// Response detail, truncated to a bounded length.
        message: String,
    },
    /// Request body could not be serialized.
    #[error("upload encode error: {0}")]
    Encode(String),
}

impl TransportError {
    /// Returns whether the failure is an auth rejection rather than a
    /// transient condition.
    #[must_use]
    pub const fn is_auth_rejection(&self) -> bool {
        matches!(self, Self::AuthRejected(_))
    }
}

/// Acknowledgement returned for an accepted upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    /// HTTP status code (always 2xx).
    pub status: u16,
    /// Records the endpoint reported as accepted, when present.
    pub records_accepted: Option<u64>,
}

/// Batch upload transport to the ingestion endpoint.
pub trait UploadTransport: Send + Sync {
    /// Sends one batch and returns the endpoint acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the request fails or the endpoint
    /// responds with a non-success status.
    fn upload(&self, batch: &UploadBatch) -> Result<UploadReceipt, TransportError>;
}

// ============================================================================
// SECTION: Host Seams
// ============================================================================

/// Wall-clock seam; the engine never reads time directly.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> Timestamp;
}

/// Host-reported connectivity seam feeding the network estimator.
pub trait ConnectivityProbe: Send + Sync {
    /// Returns the current connection class.
    fn connection_class(&self) -> ConnectionClass;
}

// ============================================================================
// SECTION: Health Probes
// ============================================================================

/// Probe errors for health and collector actions.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The probe's action failed.
    #[error("probe action failed: {0}")]
    ActionFailed(String),
}

/// Monitored subsystem checked on each health tick.
pub trait HealthProbe: Send + Sync {
    /// Returns the registered subsystem name.
    fn name(&self) -> &str;

    /// Performs one health check.
    fn check(&self) -> HealthStatus;

    /// Runs the subsystem's recovery action after an unhealthy check.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] when recovery fails.
    fn recover(&self) -> Result<(), ProbeError>;
}

// ============================================================================
// SECTION: Capability Providers
// ============================================================================

/// Authorization source for one monitored capability.
pub trait CapabilitySource: Send + Sync {
    /// Returns the capability this source reports on.
    fn capability(&self) -> &CapabilityId;

    /// Returns whether the capability is currently authorized.
    fn is_authorized(&self) -> bool;
}

/// Control surface of the collector depending on a capability.
pub trait CollectorControl: Send + Sync {
    /// Stops the collector.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] when the stop action fails.
    fn stop(&self) -> Result<(), ProbeError>;

    /// Starts the collector.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] when the start action fails.
    fn start(&self) -> Result<(), ProbeError>;
}
