// crates/uplink-core/src/runtime/store.rs
// ============================================================================
// Module: Uplink In-Memory Store
// Description: In-memory queue store for tests and headless runs.
// Purpose: Provide a deterministic store implementation without external deps.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! This module provides an in-memory implementation of [`QueueStore`] for
//! tests and local demos, plus a shared wrapper over any store backend. The
//! in-memory store honors the full queue contract, including claim atomicity
//! under its single mutex, but offers no durability across process restarts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::core::identifiers::ItemId;
use crate::core::identifiers::StreamName;
use crate::core::item::ItemStatus;
use crate::core::item::QueueItem;
use crate::core::item::QueueStats;
use crate::core::retry::DEFAULT_MAX_ATTEMPTS;
use crate::core::retry::RetryPolicy;
use crate::core::time::Timestamp;
use crate::interfaces::QueueStore;
use crate::interfaces::RetrySchedule;
use crate::interfaces::StoreError;
use crate::interfaces::validate_payload;
use crate::interfaces::validate_stream_name;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// Default maximum payload size accepted at the enqueue boundary (bytes).
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 256 * 1024;

/// Mutable queue state protected by the store mutex.
#[derive(Debug, Default)]
struct QueueState {
    /// Items keyed by identifier.
    items: BTreeMap<i64, QueueItem>,
    /// Most recently assigned identifier.
    last_id: i64,
}

/// In-memory queue store for tests and headless runs.
#[derive(Debug, Clone)]
pub struct InMemoryQueueStore {
    /// Queue state protected by a mutex.
    state: Arc<Mutex<QueueState>>,
    /// Attempt budget used for eligibility and terminal classification.
    max_attempts: u32,
    /// Maximum allowed payload size in bytes.
    max_payload_bytes: usize,
}

impl Default for InMemoryQueueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryQueueStore {
    /// Creates a new in-memory queue store with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_PAYLOAD_BYTES)
    }

    /// Creates a new in-memory queue store with explicit limits.
    #[must_use]
    pub fn with_limits(max_attempts: u32, max_payload_bytes: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState::default())),
            max_attempts,
            max_payload_bytes,
        }
    }

    /// Locks the queue state.
    fn lock_state(&self) -> Result<MutexGuard<'_, QueueState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Store("queue store mutex poisoned".to_string()))
    }
}

impl QueueStore for InMemoryQueueStore {
    fn enqueue(
        &self,
        stream: &StreamName,
        payload: &[u8],
        now: Timestamp,
    ) -> Result<ItemId, StoreError> {
        validate_stream_name(stream)?;
        validate_payload(payload, self.max_payload_bytes)?;
        let mut state = self.lock_state()?;
        state.last_id += 1;
        let id = ItemId::new(state.last_id);
        let item = QueueItem {
            id,
            stream_name: stream.clone(),
            payload: payload.to_vec(),
            created_at: now,
            attempts: 0,
            last_attempt_at: None,
            next_attempt_at: None,
            claimed_at: None,
            status: ItemStatus::Pending,
        };
        state.items.insert(id.as_i64(), item);
        Ok(id)
    }

    fn dequeue_eligible(
        &self,
        stream: Option<&StreamName>,
        limit: usize,
        now: Timestamp,
    ) -> Result<Vec<QueueItem>, StoreError> {
        let state = self.lock_state()?;
        let mut eligible: Vec<QueueItem> = state
            .items
            .values()
            .filter(|item| is_eligible(item, self.max_attempts, now))
            .filter(|item| stream.is_none_or(|name| item.stream_name == *name))
            .cloned()
            .collect();
        eligible.sort_by_key(|item| (item.created_at, item.id));
        eligible.truncate(limit);
        Ok(eligible)
    }

    fn claim_eligible(
        &self,
        stream: &StreamName,
        limit: usize,
        now: Timestamp,
    ) -> Result<Vec<QueueItem>, StoreError> {
        let mut state = self.lock_state()?;
        let mut keys: Vec<(Timestamp, ItemId)> = state
            .items
            .values()
            .filter(|item| {
                item.stream_name == *stream && is_eligible(item, self.max_attempts, now)
            })
            .map(|item| (item.created_at, item.id))
            .collect();
        keys.sort_unstable();
        keys.truncate(limit);
        let mut claimed = Vec::with_capacity(keys.len());
        for (_, id) in keys {
            if let Some(item) = state.items.get_mut(&id.as_i64()) {
                item.status = ItemStatus::Uploading;
                item.claimed_at = Some(now);
                claimed.push(item.clone());
            }
        }
        Ok(claimed)
    }

    fn mark_completed(&self, ids: &[ItemId], _now: Timestamp) -> Result<u64, StoreError> {
        let mut state = self.lock_state()?;
        let mut affected = 0_u64;
        for id in ids {
            if let Some(item) = state.items.get_mut(&id.as_i64())
                && item.status.can_transition_to(ItemStatus::Completed)
            {
                item.status = ItemStatus::Completed;
                item.next_attempt_at = None;
                item.claimed_at = None;
                affected += 1;
            }
        }
        Ok(affected)
    }

    fn mark_failed(&self, schedules: &[RetrySchedule], now: Timestamp) -> Result<u64, StoreError> {
        let mut state = self.lock_state()?;
        let mut affected = 0_u64;
        for schedule in schedules {
            if let Some(item) = state.items.get_mut(&schedule.item_id.as_i64())
                && item.status.can_transition_to(ItemStatus::Failed)
            {
                item.status = ItemStatus::Failed;
                item.attempts = item.attempts.saturating_add(1);
                item.last_attempt_at = Some(now);
                item.next_attempt_at = Some(schedule.next_attempt_at);
                item.claimed_at = None;
                affected += 1;
            }
        }
        Ok(affected)
    }

    fn release_stale(&self, grace_ms: u64, now: Timestamp) -> Result<u64, StoreError> {
        let mut state = self.lock_state()?;
        let mut affected = 0_u64;
        for item in state.items.values_mut() {
            if item.status == ItemStatus::Uploading
                && let Some(claimed_at) = item.claimed_at
                && now.millis_since(claimed_at) >= grace_ms
            {
                // Stale claims re-enter retry at the base delay; jitter is
                // drawn only for observed upload failures.
                item.status = ItemStatus::Failed;
                item.attempts = item.attempts.saturating_add(1);
                item.last_attempt_at = Some(now);
                item.next_attempt_at =
                    Some(now.saturating_add_millis(RetryPolicy::base_delay_ms(item.attempts)));
                item.claimed_at = None;
                affected += 1;
            }
        }
        Ok(affected)
    }

    fn purge_expired(&self, retention_ms: u64, now: Timestamp) -> Result<u64, StoreError> {
        let mut state = self.lock_state()?;
        let max_attempts = self.max_attempts;
        let mut removed = 0_u64;
        state.items.retain(|_, item| {
            let expired = now.millis_since(item.created_at) >= retention_ms;
            let purgeable = item.status == ItemStatus::Completed
                || (item.status == ItemStatus::Failed && item.attempts >= max_attempts);
            if expired && purgeable {
                removed += 1;
                false
            } else {
                true
            }
        });
        Ok(removed)
    }

    fn pending_streams(&self, now: Timestamp) -> Result<Vec<StreamName>, StoreError> {
        let state = self.lock_state()?;
        let streams: BTreeSet<StreamName> = state
            .items
            .values()
            .filter(|item| is_eligible(item, self.max_attempts, now))
            .map(|item| item.stream_name.clone())
            .collect();
        Ok(streams.into_iter().collect())
    }

    fn stats(&self, now: Timestamp) -> Result<QueueStats, StoreError> {
        let state = self.lock_state()?;
        let mut stats = QueueStats::default();
        let mut oldest_pending: Option<Timestamp> = None;
        for item in state.items.values() {
            stats.total += 1;
            let payload_bytes = u64::try_from(item.payload.len()).unwrap_or(u64::MAX);
            stats.store_size_bytes = stats.store_size_bytes.saturating_add(payload_bytes);
            match item.status {
                ItemStatus::Pending => {
                    stats.pending += 1;
                    let is_older =
                        oldest_pending.is_none_or(|current| item.created_at < current);
                    if is_older {
                        oldest_pending = Some(item.created_at);
                    }
                }
                ItemStatus::Uploading => stats.uploading += 1,
                ItemStatus::Failed => {
                    if item.attempts >= self.max_attempts {
                        stats.terminal_failed += 1;
                    } else {
                        stats.failed += 1;
                    }
                }
                ItemStatus::Completed => stats.completed += 1,
            }
        }
        stats.oldest_pending_age_ms = oldest_pending.map(|created| now.millis_since(created));
        Ok(stats)
    }
}

// ============================================================================
// SECTION: Shared Store Wrapper
// ============================================================================

/// Shared queue store backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedQueueStore {
    /// Inner store implementation.
    inner: Arc<dyn QueueStore>,
}

impl SharedQueueStore {
    /// Wraps a queue store in a shared, clonable wrapper.
    #[must_use]
    pub fn from_store(store: impl QueueStore + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Wraps an existing shared store.
    #[must_use]
    pub const fn new(store: Arc<dyn QueueStore>) -> Self {
        Self {
            inner: store,
        }
    }
}

impl QueueStore for SharedQueueStore {
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
        self.inner.claim_eligible(stream, limit, now)
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

    fn readiness(&self) -> Result<(), StoreError> {
        self.inner.readiness()
    }
}

// ============================================================================
// SECTION: Eligibility
// ============================================================================

/// Returns whether an item may be claimed at `now`.
fn is_eligible(item: &QueueItem, max_attempts: u32, now: Timestamp) -> bool {
    match item.status {
        ItemStatus::Pending => true,
        ItemStatus::Failed => {
            item.attempts < max_attempts
                && item.next_attempt_at.is_none_or(|deadline| deadline <= now)
        }
        ItemStatus::Uploading | ItemStatus::Completed => false,
    }
}
