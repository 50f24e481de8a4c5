// crates/uplink-core/src/core/batch.rs
// ============================================================================
// Module: Uplink Batch Envelope
// Description: Wire envelope for one batched upload request per stream.
// Purpose: Define the canonical ingestion request body and its metadata.
// Dependencies: crate::core::identifiers, serde, serde_json
// ============================================================================

//! ## Overview
//! One upload request carries every claimed item for a single stream. The
//! envelope shape is the ingestion contract: `stream_name`, `device_id`, a
//! `data` array of records, and `batch_metadata` describing the batch. Field
//! names serialize exactly as the endpoint expects.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::DeviceId;
use crate::core::identifiers::StreamName;

// ============================================================================
// SECTION: Envelope Types
// ============================================================================

/// Metadata describing one upload batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchMetadata {
    /// Number of records carried in `data`.
    pub total_records: u64,
    /// Application version string reported by the device.
    pub app_version: String,
}

/// Wire envelope for one `POST /ingest` request.
///
/// # Invariants
/// - `data.len()` equals `batch_metadata.total_records`.
/// - Records preserve queue order (oldest first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadBatch {
    /// Stream the records belong to.
    pub stream_name: StreamName,
    /// Device identity for attribution.
    pub device_id: DeviceId,
    /// Stream-specific records, one per queue item.
    pub data: Vec<Value>,
    /// Batch metadata.
    pub batch_metadata: BatchMetadata,
}

impl UploadBatch {
    /// Returns the number of records in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns whether the batch carries no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
