// crates/uplink-core/tests/proptest_estimator.rs
// ============================================================================
// Module: Network Estimator Property-Based Tests
// Description: Property tests for batch sizing bounds and window behavior.
// Purpose: Detect invariant violations across arbitrary outcome sequences.
// ============================================================================

//! Property-based tests for network estimator invariants.

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
use uplink_core::ConnectionClass;
use uplink_core::NetworkConditionEstimator;

fn class_strategy() -> impl Strategy<Value = ConnectionClass> {
    prop_oneof![
        Just(ConnectionClass::WifiOrWired),
        Just(ConnectionClass::Cellular),
        Just(ConnectionClass::Unknown),
        Just(ConnectionClass::Disconnected),
    ]
}

proptest! {
    #[test]
    fn recommendation_always_within_bounds(
        class in class_strategy(),
        outcomes in prop::collection::vec(any::<bool>(), 0..40),
    ) {
        let mut estimator = NetworkConditionEstimator::new(class);
        for outcome in outcomes {
            estimator.record_result(outcome);
        }
        let size = estimator.recommended_size();
        prop_assert!((20..=500).contains(&size));
    }

    #[test]
    fn disconnected_always_recommends_minimum(
        outcomes in prop::collection::vec(any::<bool>(), 0..40),
    ) {
        let mut estimator = NetworkConditionEstimator::new(ConnectionClass::Disconnected);
        for outcome in outcomes {
            estimator.record_result(outcome);
        }
        prop_assert_eq!(estimator.recommended_size(), 20);
    }

    #[test]
    fn window_never_exceeds_ten_samples(
        class in class_strategy(),
        outcomes in prop::collection::vec(any::<bool>(), 0..100),
    ) {
        let mut estimator = NetworkConditionEstimator::new(class);
        for outcome in outcomes {
            estimator.record_result(outcome);
        }
        prop_assert!(estimator.snapshot().sample_count <= 10);
    }

    #[test]
    fn success_rate_gated_by_minimum_samples(
        class in class_strategy(),
        outcomes in prop::collection::vec(any::<bool>(), 0..20),
    ) {
        let recorded = outcomes.len();
        let mut estimator = NetworkConditionEstimator::new(class);
        for outcome in outcomes {
            estimator.record_result(outcome);
        }
        match estimator.success_rate() {
            None => prop_assert!(recorded < 3),
            Some(rate) => {
                prop_assert!(recorded >= 3);
                prop_assert!((0.0..=1.0).contains(&rate));
            }
        }
    }

    #[test]
    fn class_change_clears_history(
        first in class_strategy(),
        second in class_strategy(),
        outcomes in prop::collection::vec(any::<bool>(), 1..20),
    ) {
        prop_assume!(first != second);
        let mut estimator = NetworkConditionEstimator::new(first);
        for outcome in outcomes {
            estimator.record_result(outcome);
        }
        estimator.set_connection_class(second);
        prop_assert_eq!(estimator.snapshot().sample_count, 0);
        prop_assert!(estimator.success_rate().is_none());
    }

    #[test]
    fn perfect_history_keeps_base_size(
        class in class_strategy(),
        count in 3usize..20,
    ) {
        prop_assume!(class != ConnectionClass::Disconnected);
        let mut estimator = NetworkConditionEstimator::new(class);
        for _ in 0..count {
            estimator.record_result(true);
        }
        prop_assert_eq!(estimator.recommended_size(), class.base_batch_size());
    }
}
