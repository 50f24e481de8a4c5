// crates/uplink-core/tests/uploader_cycle.rs
// ============================================================================
// Module: Batch Uploader Cycle Tests
// Description: End-to-end cycle tests over scripted store and transport seams.
// Purpose: Validate claim, upload, retry, sweep, and purge behavior per cycle.
// Dependencies: uplink-core
// ============================================================================
//! ## Overview
//! Drives full upload cycles with a manual clock, a settable connectivity
//! probe, and a scripted transport, asserting the durable state transitions
//! and cycle reports they produce.
//!
//! Security posture: Auth rejections surface distinctly and halt the cycle.
//! Threat model: TM-QUEUE-001 - Item loss or duplicate delivery.

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

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use uplink_core::BatchOutcome;
use uplink_core::BatchUploader;
use uplink_core::ConnectionClass;
use uplink_core::DeviceId;
use uplink_core::InMemoryQueueStore;
use uplink_core::ItemId;
use uplink_core::ItemStatus;
use uplink_core::ManualClock;
use uplink_core::QueueItem;
use uplink_core::QueueStats;
use uplink_core::QueueStore;
use uplink_core::RetrySchedule;
use uplink_core::SharedQueueStore;
use uplink_core::StaticConnectivity;
use uplink_core::StoreError;
use uplink_core::StreamName;
use uplink_core::Timestamp;
use uplink_core::TransportError;
use uplink_core::UploadBatch;
use uplink_core::UploadReceipt;
use uplink_core::UploadTransport;
use uplink_core::UploaderConfig;

/// Transport that records batches and replays a scripted outcome per call.
struct ScriptedTransport {
    /// Batches received in call order.
    uploads: Mutex<Vec<UploadBatch>>,
    /// Scripted outcomes; exhausted scripts accept everything.
    script: Mutex<VecDeque<Result<UploadReceipt, TransportError>>>,
}

impl ScriptedTransport {
    fn accepting() -> Self {
        Self {
            uploads: Mutex::new(Vec::new()),
            script: Mutex::new(VecDeque::new()),
        }
    }

    fn with_script(script: Vec<Result<UploadReceipt, TransportError>>) -> Self {
        Self {
            uploads: Mutex::new(Vec::new()),
            script: Mutex::new(script.into_iter().collect()),
        }
    }

    fn uploads(&self) -> Vec<UploadBatch> {
        self.uploads.lock().unwrap().clone()
    }
}

impl UploadTransport for ScriptedTransport {
    fn upload(&self, batch: &UploadBatch) -> Result<UploadReceipt, TransportError> {
        self.uploads.lock().unwrap().push(batch.clone());
        self.script.lock().unwrap().pop_front().unwrap_or(Ok(UploadReceipt {
            status: 200,
            records_accepted: None,
        }))
    }
}

/// Store wrapper that corrupts claimed payloads, simulating on-disk damage.
struct CorruptingStore {
    /// Backing store.
    inner: InMemoryQueueStore,
}

impl QueueStore for CorruptingStore {
    fn enqueue(
        &self,
        stream: &StreamName,
        payload: &[u8],
        now: Timestamp,
    ) -> Result<ItemId, StoreError> {
        self.inner.enqueue(stream, payload, now)
    }

    fn dequeue_eligible(
        &self,
        stream: Option<&StreamName>,
        limit: usize,
        now: Timestamp,
    ) -> Result<Vec<QueueItem>, StoreError> {
        self.inner.dequeue_eligible(stream, limit, now)
    }

    fn claim_eligible(
        &self,
        stream: &StreamName,
        limit: usize,
        now: Timestamp,
    ) -> Result<Vec<QueueItem>, StoreError> {
        let mut claimed = self.inner.claim_eligible(stream, limit, now)?;
        for item in &mut claimed {
            item.payload = b"garbage".to_vec();
        }
        Ok(claimed)
    }

    fn mark_completed(&self, ids: &[ItemId], now: Timestamp) -> Result<u64, StoreError> {
        self.inner.mark_completed(ids, now)
    }

    fn mark_failed(&self, schedules: &[RetrySchedule], now: Timestamp) -> Result<u64, StoreError> {
        self.inner.mark_failed(schedules, now)
    }

    fn release_stale(&self, grace_ms: u64, now: Timestamp) -> Result<u64, StoreError> {
        self.inner.release_stale(grace_ms, now)
    }

    fn purge_expired(&self, retention_ms: u64, now: Timestamp) -> Result<u64, StoreError> {
        self.inner.purge_expired(retention_ms, now)
    }

    fn pending_streams(&self, now: Timestamp) -> Result<Vec<StreamName>, StoreError> {
        self.inner.pending_streams(now)
    }

    fn stats(&self, now: Timestamp) -> Result<QueueStats, StoreError> {
        self.inner.stats(now)
    }
}

struct Harness {
    store: InMemoryQueueStore,
    transport: Arc<ScriptedTransport>,
    clock: ManualClock,
    connectivity: StaticConnectivity,
    uploader: BatchUploader,
}

fn harness(class: ConnectionClass, transport: ScriptedTransport) -> Harness {
    let store = InMemoryQueueStore::new();
    let transport = Arc::new(transport);
    let clock = ManualClock::new(Timestamp::from_unix_millis(0));
    let connectivity = StaticConnectivity::new(class);
    let uploader = BatchUploader::new(
        SharedQueueStore::from_store(store.clone()),
        transport.clone(),
        Arc::new(clock.clone()),
        Arc::new(connectivity.clone()),
        UploaderConfig::new(DeviceId::new("device-1"), "1.2.3"),
    );
    Harness {
        store,
        transport,
        clock,
        connectivity,
        uploader,
    }
}

fn at(millis: i64) -> Timestamp {
    Timestamp::from_unix_millis(millis)
}

fn stream(name: &str) -> StreamName {
    StreamName::new(name)
}

/// Verifies queued location items are delivered in a single batch with the
/// full envelope metadata.
#[test]
fn delivers_pending_items_in_one_batch() {
    let mut harness = harness(ConnectionClass::WifiOrWired, ScriptedTransport::accepting());
    for index in 0..30 {
        let payload = format!("{{\"seq\":{index}}}");
        harness
            .store
            .enqueue(&stream("location"), payload.as_bytes(), at(index))
            .unwrap();
    }

    harness.clock.set(at(1_000));
    let report = harness.uploader.run_cycle();

    assert_eq!(report.completed_items, 30);
    assert_eq!(report.failed_items, 0);
    assert!(!report.auth_rejected);
    assert_eq!(report.streams.len(), 1);
    assert!(matches!(
        report.streams[0].outcome,
        BatchOutcome::Delivered {
            records: 30,
            status: 200,
        }
    ));

    let uploads = harness.transport.uploads();
    assert_eq!(uploads.len(), 1);
    let batch = &uploads[0];
    assert_eq!(batch.stream_name, stream("location"));
    assert_eq!(batch.device_id, DeviceId::new("device-1"));
    assert_eq!(batch.data.len(), 30);
    assert_eq!(batch.batch_metadata.total_records, 30);
    assert_eq!(batch.batch_metadata.app_version, "1.2.3");

    let stats = harness.store.stats(at(2_000)).unwrap();
    assert_eq!(stats.completed, 30);
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.uploading, 0);
}

/// Verifies a failed upload reschedules the batch with a jittered deadline
/// in the thirty-to-thirty-six-second band.
#[test]
fn failure_schedules_retry_with_deadline() {
    let mut harness = harness(
        ConnectionClass::WifiOrWired,
        ScriptedTransport::with_script(vec![Err(TransportError::Network(
            "connection reset".to_string(),
        ))]),
    );
    harness.store.enqueue(&stream("location"), b"{}", at(0)).unwrap();

    harness.clock.set(at(10_000));
    let report = harness.uploader.run_cycle();

    assert_eq!(report.failed_items, 1);
    assert_eq!(report.completed_items, 0);
    assert!(matches!(
        &report.streams[0].outcome,
        BatchOutcome::Failed {
            auth_rejected: false,
            ..
        }
    ));

    // Before the minimum deadline the item stays ineligible; after the
    // maximum it must be eligible again.
    assert!(harness.store.dequeue_eligible(None, 10, at(39_999)).unwrap().is_empty());
    let items = harness.store.dequeue_eligible(None, 10, at(46_000)).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].attempts, 1);
    assert_eq!(items[0].status, ItemStatus::Failed);
}

/// Verifies an auth rejection halts the cycle before later streams.
#[test]
fn auth_rejection_halts_cycle() {
    let mut harness = harness(
        ConnectionClass::WifiOrWired,
        ScriptedTransport::with_script(vec![Err(TransportError::AuthRejected(
            "token revoked".to_string(),
        ))]),
    );
    harness.store.enqueue(&stream("alpha"), b"{}", at(0)).unwrap();
    harness.store.enqueue(&stream("beta"), b"{}", at(0)).unwrap();

    harness.clock.set(at(1_000));
    let report = harness.uploader.run_cycle();

    assert!(report.auth_rejected);
    assert_eq!(report.streams.len(), 1);
    assert_eq!(harness.transport.uploads().len(), 1);

    // The second stream was never claimed.
    let stats = harness.store.stats(at(2_000)).unwrap();
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.failed, 1);
}

/// Verifies a disconnected host skips the upload phase entirely.
#[test]
fn disconnected_skips_uploads() {
    let mut harness = harness(ConnectionClass::Disconnected, ScriptedTransport::accepting());
    harness.store.enqueue(&stream("location"), b"{}", at(0)).unwrap();

    harness.clock.set(at(1_000));
    let report = harness.uploader.run_cycle();

    assert!(report.streams.is_empty());
    assert!(harness.transport.uploads().is_empty());
    assert_eq!(harness.store.stats(at(2_000)).unwrap().pending, 1);
}

/// Verifies reconnecting resumes delivery of items queued while offline.
#[test]
fn reconnect_resumes_delivery() {
    let mut harness = harness(ConnectionClass::Disconnected, ScriptedTransport::accepting());
    harness.store.enqueue(&stream("location"), b"{}", at(0)).unwrap();
    harness.clock.set(at(1_000));
    harness.uploader.run_cycle();

    harness.connectivity.set(ConnectionClass::Cellular);
    harness.clock.set(at(2_000));
    let report = harness.uploader.run_cycle();

    assert_eq!(report.completed_items, 1);
    assert_eq!(harness.transport.uploads().len(), 1);
}

/// Verifies stale claims from an interrupted cycle are swept and retried on
/// a later cycle.
#[test]
fn stale_claims_are_swept_and_retried() {
    let mut harness = harness(ConnectionClass::WifiOrWired, ScriptedTransport::accepting());
    harness.store.enqueue(&stream("location"), b"{}", at(0)).unwrap();

    // Simulate an interrupted cycle: claimed but never resolved.
    let claimed = harness.store.claim_eligible(&stream("location"), 10, at(0)).unwrap();
    assert_eq!(claimed.len(), 1);

    harness.clock.set(at(300_000));
    let report = harness.uploader.run_cycle();
    assert_eq!(report.released_stale, 1);
    assert!(harness.transport.uploads().is_empty());

    // The released item carries the base thirty-second delay.
    harness.clock.set(at(331_000));
    let report = harness.uploader.run_cycle();
    assert_eq!(report.completed_items, 1);
    assert_eq!(harness.transport.uploads().len(), 1);
}

/// Verifies the retention purge runs on its schedule, not every cycle.
#[test]
fn purge_runs_on_schedule() {
    let mut harness = harness(ConnectionClass::WifiOrWired, ScriptedTransport::accepting());
    let id = harness.store.enqueue(&stream("location"), b"{}", at(0)).unwrap();
    harness.store.claim_eligible(&stream("location"), 10, at(0)).unwrap();
    harness.store.mark_completed(&[id], at(0)).unwrap();

    harness.clock.set(at(259_200_001));
    let report = harness.uploader.run_cycle();
    assert_eq!(report.purged, 1);

    harness.clock.advance_millis(60_000);
    let report = harness.uploader.run_cycle();
    assert_eq!(report.purged, 0);
}

/// Verifies the estimator limit caps how many items one cycle claims.
#[test]
fn batch_size_limit_caps_claims() {
    let mut harness = harness(ConnectionClass::Unknown, ScriptedTransport::accepting());
    for index in 0..60 {
        harness.store.enqueue(&stream("location"), b"{}", at(index)).unwrap();
    }

    harness.clock.set(at(1_000));
    let report = harness.uploader.run_cycle();

    assert_eq!(report.streams[0].batch_size_limit, 50);
    assert_eq!(report.streams[0].claimed, 50);
    assert_eq!(report.completed_items, 50);
    assert_eq!(harness.store.stats(at(2_000)).unwrap().pending, 10);
}

/// Verifies batch outcomes feed the rolling success window.
#[test]
fn outcomes_feed_estimator_window() {
    let mut harness = harness(
        ConnectionClass::WifiOrWired,
        ScriptedTransport::with_script(vec![
            Err(TransportError::Network("timeout".to_string())),
            Ok(UploadReceipt {
                status: 200,
                records_accepted: Some(1),
            }),
        ]),
    );
    harness.store.enqueue(&stream("location"), b"{}", at(0)).unwrap();

    harness.clock.set(at(1_000));
    harness.uploader.run_cycle();
    assert_eq!(harness.uploader.network_snapshot().sample_count, 1);

    harness.clock.set(at(60_000));
    let report = harness.uploader.run_cycle();
    assert_eq!(report.completed_items, 1);
    assert_eq!(harness.uploader.network_snapshot().sample_count, 2);
}

/// Verifies unparseable stored payloads are rescheduled instead of uploaded.
#[test]
fn corrupt_payloads_are_rescheduled_not_uploaded() {
    let store = InMemoryQueueStore::new();
    let transport = Arc::new(ScriptedTransport::accepting());
    let clock = ManualClock::new(at(0));
    let connectivity = StaticConnectivity::new(ConnectionClass::WifiOrWired);
    let mut uploader = BatchUploader::new(
        SharedQueueStore::from_store(CorruptingStore {
            inner: store.clone(),
        }),
        transport.clone(),
        Arc::new(clock.clone()),
        Arc::new(connectivity),
        UploaderConfig::new(DeviceId::new("device-1"), "1.2.3"),
    );
    store.enqueue(&stream("location"), b"{}", at(0)).unwrap();

    clock.set(at(1_000));
    let report = uploader.run_cycle();

    assert!(transport.uploads().is_empty());
    assert_eq!(report.failed_items, 1);
    assert!(matches!(report.streams[0].outcome, BatchOutcome::Empty));
}
