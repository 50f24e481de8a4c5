// crates/uplink-core/tests/scheduler.rs
// ============================================================================
// Module: Tick Scheduler Tests
// Description: Tests for the interval tick worker and its shutdown handling.
// Purpose: Validate tick execution, prompt shutdown, and detach semantics.
// Dependencies: uplink-core
// ============================================================================
//! ## Overview
//! Ensures tick workers fire on their interval, stop promptly when signaled,
//! and exit cleanly when the handle is dropped.

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

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use uplink_core::spawn_tick;

/// Verifies the worker ticks repeatedly and reports its tick count.
#[test]
fn tick_runs_until_stopped() {
    let counter = Arc::new(AtomicU64::new(0));
    let tick_counter = Arc::clone(&counter);
    let handle = spawn_tick("count", Duration::from_millis(10), move || {
        tick_counter.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();

    thread::sleep(Duration::from_millis(120));
    let outcome = handle.stop().unwrap();

    assert!(outcome.ticks >= 1, "worker never ticked");
    assert_eq!(outcome.ticks, counter.load(Ordering::SeqCst));
}

/// Verifies stop interrupts a long interval wait instead of serving it out.
#[test]
fn stop_interrupts_long_wait() {
    let handle = spawn_tick("idle", Duration::from_secs(3_600), || {}).unwrap();
    let started = Instant::now();
    let outcome = handle.stop().unwrap();

    assert_eq!(outcome.ticks, 0);
    assert!(started.elapsed() < Duration::from_secs(5));
}

/// Verifies dropping the handle lets the worker exit without a join.
#[test]
fn drop_signals_shutdown() {
    let counter = Arc::new(AtomicU64::new(0));
    let tick_counter = Arc::clone(&counter);
    let handle = spawn_tick("detach", Duration::from_millis(5), move || {
        tick_counter.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();

    thread::sleep(Duration::from_millis(30));
    drop(handle);
    thread::sleep(Duration::from_millis(30));
    let after_drop = counter.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(30));

    // The worker observed the disconnect and stopped ticking.
    assert!(counter.load(Ordering::SeqCst) <= after_drop + 1);
}
