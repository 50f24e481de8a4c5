// crates/uplink-core/src/runtime/scheduler.rs
// ============================================================================
// Module: Uplink Tick Scheduler
// Description: Interval tick worker built on a shutdown-aware channel wait.
// Purpose: Drive periodic engine cycles without busy-waiting or async runtimes.
// Dependencies: std, thiserror
// ============================================================================

//! ## Overview
//! The scheduler runs one closure on a fixed interval inside a named worker
//! thread. The wait doubles as the shutdown signal: the worker blocks on a
//! bounded channel with a timeout, so a shutdown message (or a dropped
//! handle) wakes it immediately instead of after the current interval.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::mpsc;
use std::sync::mpsc::RecvTimeoutError;
use std::sync::mpsc::SyncSender;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Tick scheduler errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Worker thread could not be spawned.
    #[error("tick worker spawn failed: {0}")]
    Spawn(String),
    /// Worker thread terminated abnormally.
    #[error("tick worker terminated abnormally: {0}")]
    Worker(String),
}

// ============================================================================
// SECTION: Tick Worker
// ============================================================================

/// Summary of a tick worker's lifetime, returned on shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Number of ticks the worker executed.
    pub ticks: u64,
}

/// Handle owning a spawned tick worker.
///
/// Calling [`TickHandle::stop`] signals shutdown and joins the worker.
/// Dropping the handle signals shutdown without joining.
#[derive(Debug)]
pub struct TickHandle {
    /// Shutdown signal sender; disconnection also stops the worker.
    shutdown: SyncSender<()>,
    /// Worker join handle, taken on stop.
    worker: Option<JoinHandle<TickOutcome>>,
}

impl TickHandle {
    /// Signals shutdown and joins the worker.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Worker`] when the worker panicked.
    pub fn stop(mut self) -> Result<TickOutcome, SchedulerError> {
        // A send failure means the worker already exited; join still
        // surfaces its outcome.
        let _ = self.shutdown.send(());
        match self.worker.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| SchedulerError::Worker("tick worker panicked".to_string())),
            None => Ok(TickOutcome::default()),
        }
    }
}

/// Spawns a named worker that runs `tick` every `interval` until stopped.
///
/// # Errors
///
/// Returns [`SchedulerError::Spawn`] when the worker thread cannot be
/// created.
pub fn spawn_tick(
    name: &str,
    interval: Duration,
    mut tick: impl FnMut() + Send + 'static,
) -> Result<TickHandle, SchedulerError> {
    let (shutdown, signal) = mpsc::sync_channel::<()>(1);
    let worker = thread::Builder::new()
        .name(format!("uplink-{name}"))
        .spawn(move || {
            let mut outcome = TickOutcome::default();
            loop {
                match signal.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        tick();
                        outcome.ticks += 1;
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            outcome
        })
        .map_err(|error| SchedulerError::Spawn(error.to_string()))?;
    Ok(TickHandle {
        shutdown,
        worker: Some(worker),
    })
}
