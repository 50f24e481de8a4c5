// crates/uplink-core/tests/network_estimator.rs
// ============================================================================
// Module: Network Estimator Tests
// Description: Tests for connection classes and adaptive batch sizing.
// Purpose: Validate base sizes, multiplier tiers, and window semantics.
// Dependencies: uplink-core
// ============================================================================
//! ## Overview
//! Ensures batch recommendations follow the class base sizes, scale with the
//! rolling success rate, and reset when the connection class changes.

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

use uplink_core::ConnectionClass;
use uplink_core::NetworkConditionEstimator;

fn record(estimator: &mut NetworkConditionEstimator, outcomes: &[bool]) {
    for outcome in outcomes {
        estimator.record_result(*outcome);
    }
}

/// Verifies class base sizes match the fixed table.
#[test]
fn base_sizes_follow_connection_class() {
    assert_eq!(ConnectionClass::WifiOrWired.base_batch_size(), 500);
    assert_eq!(ConnectionClass::Cellular.base_batch_size(), 100);
    assert_eq!(ConnectionClass::Unknown.base_batch_size(), 50);
    assert_eq!(ConnectionClass::Disconnected.base_batch_size(), 20);
}

/// Verifies the base size is used unchanged below three samples.
#[test]
fn below_three_samples_uses_base_size() {
    let mut estimator = NetworkConditionEstimator::new(ConnectionClass::WifiOrWired);
    assert_eq!(estimator.recommended_size(), 500);
    record(&mut estimator, &[false, false]);
    assert_eq!(estimator.success_rate(), None);
    assert_eq!(estimator.recommended_size(), 500);
}

/// Verifies the multiplier tiers scale the wifi base size at each rate
/// boundary.
#[test]
fn multiplier_tiers_scale_wifi_base() {
    let cases: [(&[bool], usize); 5] = [
        (&[true; 10], 500),
        (&[true, true, true, true, true, true, true, true, true, false], 500),
        (&[true, true, true, true, true, true, true, false, false, false], 375),
        (&[true, true, true, true, true, false, false, false, false, false], 250),
        (&[true, true, true, true, false, false, false, false, false, false], 20),
    ];
    for (outcomes, expected) in cases {
        let mut estimator = NetworkConditionEstimator::new(ConnectionClass::WifiOrWired);
        record(&mut estimator, outcomes);
        assert_eq!(
            estimator.recommended_size(),
            expected,
            "outcomes {outcomes:?}"
        );
    }
}

/// Verifies a mid-tier cellular success rate scales the base to 75.
#[test]
fn cellular_mid_tier_scales_to_seventy_five() {
    let mut estimator = NetworkConditionEstimator::new(ConnectionClass::Cellular);
    record(&mut estimator, &[true, true, true, false]);
    assert_eq!(estimator.recommended_size(), 75);
}

/// Verifies poor cellular conditions floor at the minimum batch size.
#[test]
fn cellular_floors_at_minimum() {
    let mut estimator = NetworkConditionEstimator::new(ConnectionClass::Cellular);
    record(&mut estimator, &[false, false, false]);
    assert_eq!(estimator.recommended_size(), 20);
}

/// Verifies disconnected hosts always get the minimum regardless of history.
#[test]
fn disconnected_always_minimum() {
    let mut estimator = NetworkConditionEstimator::new(ConnectionClass::Disconnected);
    record(&mut estimator, &[true; 10]);
    assert_eq!(estimator.recommended_size(), 20);
}

/// Verifies the window evicts the oldest sample beyond ten entries.
#[test]
fn window_holds_last_ten_samples() {
    let mut estimator = NetworkConditionEstimator::new(ConnectionClass::Cellular);
    record(&mut estimator, &[false; 10]);
    record(&mut estimator, &[true; 9]);
    assert_eq!(estimator.success_rate(), Some(0.9));
    assert_eq!(estimator.snapshot().sample_count, 10);
}

/// Verifies a class change clears the sample history.
#[test]
fn class_change_resets_history() {
    let mut estimator = NetworkConditionEstimator::new(ConnectionClass::Cellular);
    record(&mut estimator, &[false; 10]);
    estimator.set_connection_class(ConnectionClass::WifiOrWired);
    assert_eq!(estimator.success_rate(), None);
    assert_eq!(estimator.recommended_size(), 500);
}

/// Verifies setting the same class keeps the sample history.
#[test]
fn same_class_keeps_history() {
    let mut estimator = NetworkConditionEstimator::new(ConnectionClass::Cellular);
    record(&mut estimator, &[true, false, true]);
    estimator.set_connection_class(ConnectionClass::Cellular);
    assert_eq!(estimator.snapshot().sample_count, 3);
}

/// Verifies the snapshot mirrors the live estimator state.
#[test]
fn snapshot_reflects_state() {
    let mut estimator = NetworkConditionEstimator::new(ConnectionClass::Unknown);
    record(&mut estimator, &[true, true, false, true]);
    let snapshot = estimator.snapshot();
    assert_eq!(snapshot.connection_class, ConnectionClass::Unknown);
    assert_eq!(snapshot.sample_count, 4);
    assert_eq!(snapshot.success_rate, Some(0.75));
    assert_eq!(snapshot.recommended_size, estimator.recommended_size());
}
