//! `SQLite` crash writer for queue durability tests.
// crates/uplink-store-sqlite/src/bin/queue_crash_writer.rs
// ============================================================================
// Binary: Queue Crash Writer
// Description: Simulates a crash during an uncommitted queue write.
// Purpose: Support durability tests for rollback/crash recovery behavior.
// Dependencies: uplink-core, uplink-store-sqlite, rusqlite
// ============================================================================

use std::env;
use std::path::PathBuf;

use rusqlite::params;
use uplink_core::QueueStore;
use uplink_core::StreamName;
use uplink_core::Timestamp;
use uplink_store_sqlite::SqliteQueueConfig;
use uplink_store_sqlite::SqliteQueueStore;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = env::args().skip(1);
    let path = args.next().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "missing sqlite path")
    })?;
    let stream = args.next().unwrap_or_else(|| "location".to_string());
    let path = PathBuf::from(path);

    let mut config = SqliteQueueConfig::new(path.clone());
    config.busy_timeout_ms = 1_000;
    let store = SqliteQueueStore::new(config)?;
    let stream = StreamName::new(stream);
    let now = Timestamp::from_unix_millis(1_000);
    store.enqueue(&stream, br#"{"seq":1}"#, now)?;
    drop(store);

    let mut conn = rusqlite::Connection::open(&path)?;
    conn.execute_batch(
        "PRAGMA foreign_keys = ON; PRAGMA journal_mode = wal; PRAGMA synchronous = full;",
    )?;
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO queue_items (stream_name, payload, created_at, attempts, status) \
         VALUES (?1, ?2, ?3, 0, 'pending')",
        params![stream.as_str(), br#"{"seq":2}"#.as_slice(), 2_000_i64],
    )?;

    std::process::abort();
}
