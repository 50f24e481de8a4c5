// crates/uplink-core/src/runtime/uploader.rs
// ============================================================================
// Module: Uplink Batch Uploader
// Description: Store-and-forward upload cycle over the store and transport seams.
// Purpose: Drain eligible queue items in adaptive batches with bounded retries.
// Dependencies: crate::{core, interfaces, runtime::store}, rand, serde, tracing
// ============================================================================

//! ## Overview
//! The uploader runs one delivery cycle at a time: reconcile stale claims,
//! purge expired items on schedule, then claim and upload one batch per
//! pending stream. Claims transition items to `uploading` atomically, so an
//! interrupted cycle loses nothing; the stale sweep reclaims its items on a
//! later cycle. Each batch outcome feeds the network estimator, and every
//! retry deadline is drawn here, once per failure, so stores stay free of
//! randomness.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use rand::RngCore;
use rand::rngs::OsRng;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::core::batch::BatchMetadata;
use crate::core::batch::UploadBatch;
use crate::core::identifiers::DeviceId;
use crate::core::identifiers::ItemId;
use crate::core::identifiers::StreamName;
use crate::core::item::QueueItem;
use crate::core::network::ConnectionClass;
use crate::core::network::NetworkConditionEstimator;
use crate::core::network::NetworkSnapshot;
use crate::core::retry::RetryPolicy;
use crate::core::time::Timestamp;
use crate::interfaces::Clock;
use crate::interfaces::ConnectivityProbe;
use crate::interfaces::QueueStore;
use crate::interfaces::RetrySchedule;
use crate::interfaces::UploadTransport;
use crate::runtime::store::SharedQueueStore;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default grace period before an `uploading` claim is considered stale.
pub const DEFAULT_STALE_GRACE_MS: u64 = 300_000;
/// Default spacing between retention purges (six hours).
pub const DEFAULT_PURGE_INTERVAL_MS: u64 = 21_600_000;
/// Default retention window for delivered and terminal items (three days).
pub const DEFAULT_RETENTION_MS: u64 = 259_200_000;

/// Uploader configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploaderConfig {
    /// Device identity carried in every upload request.
    pub device_id: DeviceId,
    /// Application version reported in batch metadata.
    pub app_version: String,
    /// Retry policy bounding attempts and spacing retries.
    pub retry_policy: RetryPolicy,
    /// Grace period in milliseconds before reclaiming stale claims.
    pub stale_grace_ms: u64,
    /// Spacing in milliseconds between retention purges.
    pub purge_interval_ms: u64,
    /// Retention window in milliseconds for delivered and terminal items.
    pub retention_ms: u64,
}

impl UploaderConfig {
    /// Creates an uploader configuration with default timing parameters.
    #[must_use]
    pub fn new(device_id: DeviceId, app_version: impl Into<String>) -> Self {
        Self {
            device_id,
            app_version: app_version.into(),
            retry_policy: RetryPolicy::default(),
            stale_grace_ms: DEFAULT_STALE_GRACE_MS,
            purge_interval_ms: DEFAULT_PURGE_INTERVAL_MS,
            retention_ms: DEFAULT_RETENTION_MS,
        }
    }
}

// ============================================================================
// SECTION: Cycle Reports
// ============================================================================

/// Outcome of one batch upload within a cycle.
///
/// # Invariants
/// - Variants are stable for serialization in status feeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BatchOutcome {
    /// The endpoint acknowledged the batch.
    Delivered {
        /// Records sent in the batch.
        records: u64,
        /// HTTP status returned by the endpoint.
        status: u16,
    },
    /// The upload failed; items were rescheduled for retry.
    Failed {
        /// Transport error description.
        error: String,
        /// Whether the failure was an auth rejection.
        auth_rejected: bool,
    },
    /// The claim returned no uploadable items.
    Empty,
}

/// Result of processing one stream within a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamCycleResult {
    /// Stream the batch was drawn from.
    pub stream: StreamName,
    /// Batch size limit recommended by the estimator.
    pub batch_size_limit: usize,
    /// Items claimed for the batch.
    pub claimed: u64,
    /// Outcome of the batch upload.
    pub outcome: BatchOutcome,
}

/// Summary of one full upload cycle for logs and the status hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    /// Cycle start time.
    pub started_at: Timestamp,
    /// Cycle end time.
    pub finished_at: Timestamp,
    /// Estimator snapshot at cycle end.
    pub connection: NetworkSnapshot,
    /// Items reclaimed from stale `uploading` claims.
    pub released_stale: u64,
    /// Items removed by the retention purge, when one ran.
    pub purged: u64,
    /// Per-stream batch results in processing order.
    pub streams: Vec<StreamCycleResult>,
    /// Items marked completed across all batches.
    pub completed_items: u64,
    /// Items marked failed across all batches.
    pub failed_items: u64,
    /// Whether the endpoint rejected the device identity this cycle.
    pub auth_rejected: bool,
    /// Store-level errors encountered during the cycle.
    pub errors: Vec<String>,
}

impl CycleReport {
    /// Creates an empty report anchored at the cycle start.
    fn begin(started_at: Timestamp, connection: NetworkSnapshot) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            connection,
            released_stale: 0,
            purged: 0,
            streams: Vec::new(),
            completed_items: 0,
            failed_items: 0,
            auth_rejected: false,
            errors: Vec::new(),
        }
    }
}

// ============================================================================
// SECTION: Batch Uploader
// ============================================================================

/// A batch prepared from claimed items, with any unparseable leftovers.
struct PreparedBatch {
    /// Wire batch ready for upload.
    batch: UploadBatch,
    /// Identifier and pre-failure attempt count of each embedded item.
    members: Vec<(ItemId, u32)>,
    /// Identifier and pre-failure attempt count of each item whose payload
    /// failed to parse.
    poison: Vec<(ItemId, u32)>,
}

/// Store-and-forward upload engine.
///
/// The uploader owns its estimator and jitter source; one instance runs one
/// cycle at a time on the sync tick.
pub struct BatchUploader {
    /// Durable queue store.
    store: SharedQueueStore,
    /// Upload transport to the ingestion endpoint.
    transport: Arc<dyn UploadTransport>,
    /// Clock seam.
    clock: Arc<dyn Clock>,
    /// Connectivity seam feeding the estimator.
    connectivity: Arc<dyn ConnectivityProbe>,
    /// Adaptive batch size estimator.
    estimator: NetworkConditionEstimator,
    /// Jitter source for retry deadlines.
    rng: Box<dyn RngCore + Send>,
    /// Engine configuration.
    config: UploaderConfig,
    /// Timestamp of the last completed retention purge.
    last_purge_at: Option<Timestamp>,
}

impl BatchUploader {
    /// Creates an uploader with an operating-system jitter source.
    #[must_use]
    pub fn new(
        store: SharedQueueStore,
        transport: Arc<dyn UploadTransport>,
        clock: Arc<dyn Clock>,
        connectivity: Arc<dyn ConnectivityProbe>,
        config: UploaderConfig,
    ) -> Self {
        Self::with_rng(store, transport, clock, connectivity, config, Box::new(OsRng))
    }

    /// Creates an uploader with an explicit jitter source.
    #[must_use]
    pub fn with_rng(
        store: SharedQueueStore,
        transport: Arc<dyn UploadTransport>,
        clock: Arc<dyn Clock>,
        connectivity: Arc<dyn ConnectivityProbe>,
        config: UploaderConfig,
        rng: Box<dyn RngCore + Send>,
    ) -> Self {
        Self {
            store,
            transport,
            clock,
            connectivity,
            estimator: NetworkConditionEstimator::default(),
            rng,
            config,
            last_purge_at: None,
        }
    }

    /// Returns a snapshot of the estimator state.
    #[must_use]
    pub fn network_snapshot(&self) -> NetworkSnapshot {
        self.estimator.snapshot()
    }

    /// Runs one full upload cycle and returns its report.
    ///
    /// A cycle never fails wholesale: store and transport errors are
    /// recorded in the report and the cycle moves on, except for an auth
    /// rejection, which halts further batches because every stream shares
    /// the device identity.
    pub fn run_cycle(&mut self) -> CycleReport {
        let started_at = self.clock.now();
        let class = self.connectivity.connection_class();
        self.estimator.set_connection_class(class);
        let mut report = CycleReport::begin(started_at, self.estimator.snapshot());
        debug!(connection = ?class, "sync cycle started");

        self.reconcile(&mut report, started_at);
        if class == ConnectionClass::Disconnected {
            debug!("disconnected; skipping upload phase");
        } else {
            self.upload_pending(&mut report);
        }

        report.finished_at = self.clock.now();
        report.connection = self.estimator.snapshot();
        info!(
            streams = report.streams.len(),
            completed = report.completed_items,
            failed = report.failed_items,
            released_stale = report.released_stale,
            purged = report.purged,
            "sync cycle finished"
        );
        report
    }

    /// Reclaims stale claims and runs the retention purge when due.
    ///
    /// Maintenance runs even while disconnected so a long outage cannot grow
    /// the store unboundedly.
    fn reconcile(&mut self, report: &mut CycleReport, now: Timestamp) {
        match self.store.release_stale(self.config.stale_grace_ms, now) {
            Ok(count) => {
                report.released_stale = count;
                if count > 0 {
                    warn!(count, "released stale uploading items");
                }
            }
            Err(error) => {
                error!(error = %error, "stale claim sweep failed");
                report.errors.push(error.to_string());
            }
        }

        let purge_due = self
            .last_purge_at
            .is_none_or(|last| now.millis_since(last) >= self.config.purge_interval_ms);
        if purge_due {
            match self.store.purge_expired(self.config.retention_ms, now) {
                Ok(count) => {
                    report.purged = count;
                    self.last_purge_at = Some(now);
                    if count > 0 {
                        info!(count, "purged expired items");
                    }
                }
                Err(error) => {
                    error!(error = %error, "retention purge failed");
                    report.errors.push(error.to_string());
                }
            }
        }
    }

    /// Claims and uploads one batch per pending stream.
    fn upload_pending(&mut self, report: &mut CycleReport) {
        let streams = match self.store.pending_streams(self.clock.now()) {
            Ok(streams) => streams,
            Err(error) => {
                error!(error = %error, "pending stream listing failed");
                report.errors.push(error.to_string());
                return;
            }
        };

        for stream in streams {
            let limit = self.estimator.recommended_size();
            let result = self.upload_stream(&stream, limit, report);
            let halt = matches!(
                &result.outcome,
                BatchOutcome::Failed {
                    auth_rejected: true,
                    ..
                }
            );
            report.streams.push(result);
            if halt {
                report.auth_rejected = true;
                error!("device identity rejected; halting cycle");
                break;
            }
        }
    }

    /// Claims, prepares, and uploads one batch for a stream.
    fn upload_stream(
        &mut self,
        stream: &StreamName,
        limit: usize,
        report: &mut CycleReport,
    ) -> StreamCycleResult {
        let claimed = match self.store.claim_eligible(stream, limit, self.clock.now()) {
            Ok(claimed) => claimed,
            Err(error) => {
                error!(stream = %stream, error = %error, "claim failed");
                report.errors.push(error.to_string());
                return StreamCycleResult {
                    stream: stream.clone(),
                    batch_size_limit: limit,
                    claimed: 0,
                    outcome: BatchOutcome::Empty,
                };
            }
        };
        let claimed_count = u64::try_from(claimed.len()).unwrap_or(u64::MAX);
        if claimed.is_empty() {
            return StreamCycleResult {
                stream: stream.clone(),
                batch_size_limit: limit,
                claimed: 0,
                outcome: BatchOutcome::Empty,
            };
        }

        let prepared = self.prepare_batch(stream, claimed);
        if !prepared.poison.is_empty() {
            warn!(
                stream = %stream,
                count = prepared.poison.len(),
                "claimed items with unparseable payloads; rescheduling"
            );
            self.fail_members(&prepared.poison, report);
        }
        if prepared.members.is_empty() {
            return StreamCycleResult {
                stream: stream.clone(),
                batch_size_limit: limit,
                claimed: claimed_count,
                outcome: BatchOutcome::Empty,
            };
        }

        let outcome = match self.transport.upload(&prepared.batch) {
            Ok(receipt) => {
                self.estimator.record_result(true);
                let ids: Vec<ItemId> = prepared.members.iter().map(|(id, _)| *id).collect();
                match self.store.mark_completed(&ids, self.clock.now()) {
                    Ok(count) => report.completed_items += count,
                    Err(error) => {
                        error!(stream = %stream, error = %error, "completion mark failed");
                        report.errors.push(error.to_string());
                    }
                }
                info!(
                    stream = %stream,
                    records = prepared.batch.len(),
                    status = receipt.status,
                    "batch delivered"
                );
                BatchOutcome::Delivered {
                    records: u64::try_from(prepared.batch.len()).unwrap_or(u64::MAX),
                    status: receipt.status,
                }
            }
            Err(error) => {
                self.estimator.record_result(false);
                let auth_rejected = error.is_auth_rejection();
                warn!(stream = %stream, error = %error, "batch upload failed");
                self.fail_members(&prepared.members, report);
                BatchOutcome::Failed {
                    error: error.to_string(),
                    auth_rejected,
                }
            }
        };

        StreamCycleResult {
            stream: stream.clone(),
            batch_size_limit: limit,
            claimed: claimed_count,
            outcome,
        }
    }

    /// Builds the wire batch from claimed items, separating unparseable
    /// payloads.
    fn prepare_batch(&self, stream: &StreamName, claimed: Vec<QueueItem>) -> PreparedBatch {
        let mut data = Vec::with_capacity(claimed.len());
        let mut members = Vec::with_capacity(claimed.len());
        let mut poison = Vec::new();
        for item in claimed {
            match serde_json::from_slice::<serde_json::Value>(&item.payload) {
                Ok(value) => {
                    data.push(value);
                    members.push((item.id, item.attempts));
                }
                Err(_) => poison.push((item.id, item.attempts)),
            }
        }
        let batch = UploadBatch {
            stream_name: stream.clone(),
            device_id: self.config.device_id.clone(),
            batch_metadata: BatchMetadata {
                total_records: u64::try_from(data.len()).unwrap_or(u64::MAX),
                app_version: self.config.app_version.clone(),
            },
            data,
        };
        PreparedBatch {
            batch,
            members,
            poison,
        }
    }

    /// Marks batch members failed with freshly drawn retry deadlines.
    fn fail_members(&mut self, members: &[(ItemId, u32)], report: &mut CycleReport) {
        let now = self.clock.now();
        let schedules: Vec<RetrySchedule> = members
            .iter()
            .map(|(item_id, attempts)| self.schedule_for(*item_id, *attempts, now))
            .collect();
        match self.store.mark_failed(&schedules, now) {
            Ok(count) => report.failed_items += count,
            Err(error) => {
                error!(error = %error, "failure mark failed");
                report.errors.push(error.to_string());
            }
        }
    }

    /// Draws the retry deadline for one item's next attempt count.
    fn schedule_for(&mut self, item_id: ItemId, attempts: u32, now: Timestamp) -> RetrySchedule {
        let next_attempts = attempts.saturating_add(1);
        RetrySchedule {
            item_id,
            next_attempt_at: RetryPolicy::next_attempt_at(next_attempts, now, self.rng.as_mut()),
        }
    }
}
