// crates/uplink-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Queue Store
// Description: Durable QueueStore backend using SQLite WAL.
// Purpose: Provide production-grade persistence for the Uplink delivery queue.
// Dependencies: uplink-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`uplink_core::QueueStore`]
//! implementation that persists queue items across process restarts and
//! power loss. Claims are transactional so concurrent upload cycles can
//! never double-send an item, and every multi-row mutation commits
//! atomically. Security posture: database contents are untrusted; reads
//! fail closed on schema or status corruption.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteJournalMode;
pub use store::SqliteQueueConfig;
pub use store::SqliteQueueError;
pub use store::SqliteQueueStore;
pub use store::SqliteSyncMode;
