// crates/uplink-core/src/core/item.rs
// ============================================================================
// Module: Uplink Queue Items
// Description: Durable queue item records, status machine, and aggregate stats.
// Purpose: Capture the canonical delivery state for every telemetry item.
// Dependencies: crate::core::{identifiers, time}, serde
// ============================================================================

//! ## Overview
//! Queue items are the durable unit of delivery. Status transitions follow a
//! fixed machine: `pending -> uploading -> {completed | failed}` with
//! `failed -> uploading` retries until the attempt budget is exhausted.
//! Terminal failures are retained and reported through aggregate stats, never
//! silently dropped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ItemId;
use crate::core::identifiers::StreamName;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Item Status
// ============================================================================

/// Delivery status of a queue item.
///
/// # Invariants
/// - Variants are stable for serialization and store encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Enqueued and never claimed.
    Pending,
    /// Claimed by an upload cycle and in flight.
    Uploading,
    /// Last upload attempt failed; retry may follow.
    Failed,
    /// Delivered and acknowledged by the ingestion endpoint.
    Completed,
}

impl ItemStatus {
    /// Returns the stable string form used in store encodings.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Uploading => "uploading",
            Self::Failed => "failed",
            Self::Completed => "completed",
        }
    }

    /// Parses the stable string form used in store encodings.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "uploading" => Some(Self::Uploading),
            "failed" => Some(Self::Failed),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    /// Returns whether the status machine permits `self -> next`.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending | Self::Failed, Self::Uploading)
                | (Self::Uploading, Self::Completed | Self::Failed)
        )
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Queue Item
// ============================================================================

/// Durable telemetry item owned by the persistent queue.
///
/// # Invariants
/// - `attempts` only increases.
/// - `payload` is opaque to the engine and never transformed in place.
/// - `next_attempt_at` is set whenever `status` is `failed` and a retry is
///   still permitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    /// Store-assigned monotonic identifier.
    pub id: ItemId,
    /// Stream name grouping this item for batching.
    pub stream_name: StreamName,
    /// Opaque payload bytes (validated as JSON at the enqueue boundary).
    pub payload: Vec<u8>,
    /// Enqueue timestamp.
    pub created_at: Timestamp,
    /// Number of failed upload attempts so far.
    pub attempts: u32,
    /// Timestamp of the most recent failed attempt.
    pub last_attempt_at: Option<Timestamp>,
    /// Jittered deadline before which the item must not be retried.
    pub next_attempt_at: Option<Timestamp>,
    /// Timestamp when the item was last claimed for upload.
    pub claimed_at: Option<Timestamp>,
    /// Delivery status.
    pub status: ItemStatus,
}

// ============================================================================
// SECTION: Aggregate Stats
// ============================================================================

/// Aggregate queue counters for observability.
///
/// # Invariants
/// - `failed` counts retry-eligible failures; `terminal_failed` counts items
///   whose attempt budget is exhausted. The two are disjoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueueStats {
    /// Items awaiting their first claim.
    pub pending: u64,
    /// Items currently claimed by an upload cycle.
    pub uploading: u64,
    /// Failed items still inside the retry budget.
    pub failed: u64,
    /// Failed items with the retry budget exhausted.
    pub terminal_failed: u64,
    /// Delivered items not yet purged.
    pub completed: u64,
    /// Total items in the store.
    pub total: u64,
    /// Age of the oldest pending item in milliseconds, when any exist.
    pub oldest_pending_age_ms: Option<u64>,
    /// Approximate store footprint in bytes for storage-pressure warnings.
    pub store_size_bytes: u64,
}
