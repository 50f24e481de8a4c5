// crates/uplink-store-sqlite/tests/proptest_queue.rs
// ============================================================================
// Module: SQLite Queue Property-Based Tests
// Description: Property tests for claim ordering and eligibility gating.
// Purpose: Detect queue invariant violations across randomized workloads.
// ============================================================================

//! Property-based tests for durable queue invariants.

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
    reason = "Test-only assertions and helpers are permitted."
)]

use proptest::prelude::*;
use tempfile::TempDir;
use uplink_core::ItemStatus;
use uplink_core::QueueStore;
use uplink_core::RetrySchedule;
use uplink_core::StreamName;
use uplink_core::Timestamp;
use uplink_store_sqlite::SqliteQueueConfig;
use uplink_store_sqlite::SqliteQueueStore;

fn fresh_store() -> (TempDir, SqliteQueueStore) {
    let dir = TempDir::new().unwrap();
    let mut config = SqliteQueueConfig::new(dir.path().join("queue.sqlite"));
    config.busy_timeout_ms = 1_000;
    let store = SqliteQueueStore::new(config).expect("store init");
    (dir, store)
}

proptest! {
    #[test]
    fn claims_preserve_arrival_order_and_limit(
        created in proptest::collection::vec(0i64..1_000_000, 1..32),
        limit in 0usize..40,
    ) {
        let (_dir, store) = fresh_store();
        let stream = StreamName::new("location");
        for millis in &created {
            store.enqueue(&stream, b"{}", Timestamp::from_unix_millis(*millis)).unwrap();
        }

        let claimed = store
            .claim_eligible(&stream, limit, Timestamp::from_unix_millis(2_000_000))
            .unwrap();
        prop_assert_eq!(claimed.len(), limit.min(created.len()));
        for item in &claimed {
            prop_assert_eq!(item.status, ItemStatus::Uploading);
        }
        let keys: Vec<(i64, i64)> = claimed
            .iter()
            .map(|item| (item.created_at.as_unix_millis(), item.id.as_i64()))
            .collect();
        prop_assert!(keys.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn claimed_rows_never_reappear(
        total in 1usize..24,
        limit in 0usize..24,
    ) {
        let (_dir, store) = fresh_store();
        let stream = StreamName::new("location");
        for index in 0..total {
            let millis = i64::try_from(index).unwrap();
            store.enqueue(&stream, b"{}", Timestamp::from_unix_millis(millis)).unwrap();
        }

        let now = Timestamp::from_unix_millis(1_000_000);
        let claimed = store.claim_eligible(&stream, limit, now).unwrap();
        let remaining = store.dequeue_eligible(None, 1_000, now).unwrap();

        prop_assert_eq!(claimed.len() + remaining.len(), total);
        for item in &remaining {
            prop_assert!(claimed.iter().all(|other| other.id != item.id));
        }
    }

    #[test]
    fn failed_deadline_gates_eligibility(
        deadline in 0i64..1_000_000_000,
        probe in 0i64..1_000_000_000,
    ) {
        let (_dir, store) = fresh_store();
        let stream = StreamName::new("location");
        let id = store.enqueue(&stream, b"{}", Timestamp::from_unix_millis(0)).unwrap();
        store.claim_eligible(&stream, 1, Timestamp::from_unix_millis(1)).unwrap();
        store
            .mark_failed(
                &[RetrySchedule {
                    item_id: id,
                    next_attempt_at: Timestamp::from_unix_millis(deadline),
                }],
                Timestamp::from_unix_millis(1),
            )
            .unwrap();

        let items = store.dequeue_eligible(None, 10, Timestamp::from_unix_millis(probe)).unwrap();
        prop_assert_eq!(items.len() == 1, deadline <= probe);
    }

    #[test]
    fn purge_never_touches_pending_rows(
        ages in proptest::collection::vec(0i64..1_000_000, 1..16),
        retention in 0u64..2_000_000,
    ) {
        let (_dir, store) = fresh_store();
        let stream = StreamName::new("location");
        for millis in &ages {
            store.enqueue(&stream, b"{}", Timestamp::from_unix_millis(*millis)).unwrap();
        }

        let probe = Timestamp::from_unix_millis(2_000_000);
        let purged = store.purge_expired(retention, probe).unwrap();
        prop_assert_eq!(purged, 0);
        let stats = store.stats(probe).unwrap();
        prop_assert_eq!(stats.pending, u64::try_from(ages.len()).unwrap());
    }
}
