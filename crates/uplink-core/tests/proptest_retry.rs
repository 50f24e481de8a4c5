// crates/uplink-core/tests/proptest_retry.rs
// ============================================================================
// Module: Retry Policy Property-Based Tests
// Description: Property tests for backoff delays and retry eligibility.
// Purpose: Detect invariant violations across wide attempt and seed ranges.
// ============================================================================

//! Property-based tests for retry policy invariants.

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
use rand::SeedableRng;
use rand::rngs::StdRng;
use uplink_core::ItemId;
use uplink_core::ItemStatus;
use uplink_core::QueueItem;
use uplink_core::RetryPolicy;
use uplink_core::StreamName;
use uplink_core::Timestamp;

fn failed_item(attempts: u32, deadline_ms: Option<i64>) -> QueueItem {
    QueueItem {
        id: ItemId::new(1),
        stream_name: StreamName::new("location"),
        payload: b"{}".to_vec(),
        created_at: Timestamp::from_unix_millis(0),
        attempts,
        last_attempt_at: Some(Timestamp::from_unix_millis(0)),
        next_attempt_at: deadline_ms.map(Timestamp::from_unix_millis),
        claimed_at: None,
        status: ItemStatus::Failed,
    }
}

proptest! {
    #[test]
    fn jittered_delay_stays_in_band(attempts in 0u32..64, seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let base = RetryPolicy::base_delay_ms(attempts);
        let delay = RetryPolicy::jittered_delay_ms(attempts, &mut rng);
        prop_assert!(delay >= base);
        if base / 5 == 0 {
            prop_assert_eq!(delay, base);
        } else {
            prop_assert!(delay < base + base / 5);
        }
    }

    #[test]
    fn base_delay_is_monotonic(attempts in 0u32..1_000) {
        prop_assert!(
            RetryPolicy::base_delay_ms(attempts) <= RetryPolicy::base_delay_ms(attempts + 1)
        );
    }

    #[test]
    fn base_delay_never_exceeds_ceiling(attempts in any::<u32>()) {
        prop_assert!(RetryPolicy::base_delay_ms(attempts) <= 300_000);
    }

    #[test]
    fn deadline_never_precedes_now(
        attempts in 0u32..16,
        now_ms in 0i64..4_102_444_800_000,
        seed in any::<u64>(),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let now = Timestamp::from_unix_millis(now_ms);
        let deadline = RetryPolicy::next_attempt_at(attempts, now, &mut rng);
        prop_assert!(deadline >= now);
    }

    #[test]
    fn terminal_threshold_matches_budget(budget in 1u32..32, attempts in 0u32..64) {
        let policy = RetryPolicy::new(budget);
        prop_assert_eq!(policy.is_terminal(attempts), attempts >= budget);
    }

    #[test]
    fn retry_respects_materialized_deadline(
        deadline_ms in 0i64..10_000_000,
        now_ms in 0i64..10_000_000,
    ) {
        let policy = RetryPolicy::default();
        let item = failed_item(1, Some(deadline_ms));
        let eligible = policy.should_retry(&item, Timestamp::from_unix_millis(now_ms));
        prop_assert_eq!(eligible, deadline_ms <= now_ms);
    }

    #[test]
    fn exhausted_budget_is_never_retryable(
        attempts in 5u32..200,
        now_ms in 0i64..10_000_000,
    ) {
        let policy = RetryPolicy::default();
        let item = failed_item(attempts, Some(0));
        prop_assert!(!policy.should_retry(&item, Timestamp::from_unix_millis(now_ms)));
    }
}
