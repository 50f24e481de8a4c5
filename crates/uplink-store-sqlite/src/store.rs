// crates/uplink-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Queue Store
// Description: Durable QueueStore backed by SQLite WAL.
// Purpose: Persist queue items with transactional claims and atomic batches.
// Dependencies: uplink-core, rusqlite, serde, thiserror, tracing
// ============================================================================

//! ## Overview
//! This module implements a durable [`QueueStore`] using `SQLite`. Items live
//! in a single `queue_items` table keyed by a monotonic rowid; eligibility,
//! claims, and batch mutations are expressed as transactions over that table
//! so a crash between any two statements leaves the queue consistent.
//! Security posture: database contents are untrusted; decoding fails closed
//! on unknown status text or out-of-range counters.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use uplink_core::DEFAULT_MAX_ATTEMPTS;
use uplink_core::DEFAULT_MAX_PAYLOAD_BYTES;
use uplink_core::ItemId;
use uplink_core::ItemStatus;
use uplink_core::QueueItem;
use uplink_core::QueueStats;
use uplink_core::QueueStore;
use uplink_core::RetryPolicy;
use uplink_core::RetrySchedule;
use uplink_core::StoreError;
use uplink_core::StreamName;
use uplink_core::Timestamp;
use uplink_core::validate_payload;
use uplink_core::validate_stream_name;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the queue store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Column list shared by every row-returning query.
const ITEM_COLUMNS: &str =
    "id, stream_name, payload, created_at, attempts, last_attempt_at, next_attempt_at, \
     claimed_at, status";

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteJournalMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteJournalMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` queue store.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteQueueConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Attempt budget used for eligibility and terminal classification.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Maximum payload size accepted at the enqueue boundary, in bytes.
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
}

impl SqliteQueueConfig {
    /// Creates a config with default limits for the given database path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteJournalMode::Wal,
            sync_mode: SqliteSyncMode::Full,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Returns the default attempt budget.
const fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

/// Returns the default payload size limit.
const fn default_max_payload_bytes() -> usize {
    DEFAULT_MAX_PAYLOAD_BYTES
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` queue store errors.
#[derive(Debug, Error)]
pub enum SqliteQueueError {
    /// Store I/O error.
    #[error("sqlite queue io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite queue db error: {0}")]
    Db(String),
    /// Store corruption detected while decoding rows.
    #[error("sqlite queue corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite queue version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite queue invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteQueueError> for StoreError {
    fn from(error: SqliteQueueError) -> Self {
        match error {
            SqliteQueueError::Io(message) => Self::Io(message),
            SqliteQueueError::Db(message) => Self::Store(message),
            SqliteQueueError::Corrupt(message) => Self::Corrupt(message),
            SqliteQueueError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteQueueError::Invalid(message) => Self::Invalid(message),
        }
    }
}

/// Maps a `rusqlite` error onto the store error model.
///
/// Value conversion failures indicate damaged rows and are reported as
/// corruption; everything else is an engine error.
fn db_error(error: rusqlite::Error) -> SqliteQueueError {
    match error {
        rusqlite::Error::FromSqlConversionFailure(..) => {
            SqliteQueueError::Corrupt(error.to_string())
        }
        other => SqliteQueueError::Db(other.to_string()),
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed queue store with WAL support.
#[derive(Clone)]
pub struct SqliteQueueStore {
    /// Store configuration.
    config: SqliteQueueConfig,
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteQueueStore {
    /// Opens an `SQLite`-backed queue store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteQueueError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: SqliteQueueConfig) -> Result<Self, SqliteQueueError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        debug!(
            path = %config.path.display(),
            journal_mode = config.journal_mode.pragma_value(),
            sync_mode = config.sync_mode.pragma_value(),
            "sqlite queue store opened"
        );
        Ok(Self {
            config,
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Locks the shared connection.
    fn lock_connection(&self) -> Result<MutexGuard<'_, Connection>, SqliteQueueError> {
        self.connection
            .lock()
            .map_err(|_| SqliteQueueError::Db("connection mutex poisoned".to_string()))
    }

    /// Returns the attempt budget as an `SQLite` parameter.
    fn max_attempts_param(&self) -> i64 {
        i64::from(self.config.max_attempts)
    }
}

impl QueueStore for SqliteQueueStore {
    fn enqueue(
        &self,
        stream: &StreamName,
        payload: &[u8],
        now: Timestamp,
    ) -> Result<ItemId, StoreError> {
        validate_stream_name(stream)?;
        validate_payload(payload, self.config.max_payload_bytes)?;
        self.enqueue_item(stream, payload, now).map_err(StoreError::from)
    }

    fn dequeue_eligible(
        &self,
        stream: Option<&StreamName>,
        limit: usize,
        now: Timestamp,
    ) -> Result<Vec<QueueItem>, StoreError> {
        self.eligible_items(stream, limit, now).map_err(StoreError::from)
    }

    fn claim_eligible(
        &self,
        stream: &StreamName,
        limit: usize,
        now: Timestamp,
    ) -> Result<Vec<QueueItem>, StoreError> {
        self.claim_items(stream, limit, now).map_err(StoreError::from)
    }

    fn mark_completed(&self, ids: &[ItemId], now: Timestamp) -> Result<u64, StoreError> {
        self.complete_items(ids, now).map_err(StoreError::from)
    }

    fn mark_failed(&self, schedules: &[RetrySchedule], now: Timestamp) -> Result<u64, StoreError> {
        self.fail_items(schedules, now).map_err(StoreError::from)
    }

    fn release_stale(&self, grace_ms: u64, now: Timestamp) -> Result<u64, StoreError> {
        self.release_stale_items(grace_ms, now).map_err(StoreError::from)
    }

    fn purge_expired(&self, retention_ms: u64, now: Timestamp) -> Result<u64, StoreError> {
        self.purge_items(retention_ms, now).map_err(StoreError::from)
    }

    fn pending_streams(&self, now: Timestamp) -> Result<Vec<StreamName>, StoreError> {
        self.eligible_streams(now).map_err(StoreError::from)
    }

    fn stats(&self, now: Timestamp) -> Result<QueueStats, StoreError> {
        self.queue_stats(now).map_err(StoreError::from)
    }

    fn readiness(&self) -> Result<(), StoreError> {
        let guard = self.lock_connection()?;
        let version: i64 = guard
            .query_row("SELECT version FROM queue_meta LIMIT 1", params![], |row| row.get(0))
            .map_err(db_error)?;
        drop(guard);
        if version == SCHEMA_VERSION {
            Ok(())
        } else {
            Err(StoreError::VersionMismatch(format!("unsupported schema version: {version}")))
        }
    }
}

impl SqliteQueueStore {
    /// Inserts one pending item and returns its rowid.
    fn enqueue_item(
        &self,
        stream: &StreamName,
        payload: &[u8],
        now: Timestamp,
    ) -> Result<ItemId, SqliteQueueError> {
        let guard = self.lock_connection()?;
        guard
            .execute(
                "INSERT INTO queue_items (stream_name, payload, created_at, attempts, status) \
                 VALUES (?1, ?2, ?3, 0, 'pending')",
                params![stream.as_str(), payload, now.as_unix_millis()],
            )
            .map_err(db_error)?;
        let id = guard.last_insert_rowid();
        drop(guard);
        Ok(ItemId::new(id))
    }

    /// Returns eligible items without mutating them.
    fn eligible_items(
        &self,
        stream: Option<&StreamName>,
        limit: usize,
        now: Timestamp,
    ) -> Result<Vec<QueueItem>, SqliteQueueError> {
        let guard = self.lock_connection()?;
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM queue_items \
             WHERE (?1 IS NULL OR stream_name = ?1) \
               AND (status = 'pending' OR (status = 'failed' AND attempts < ?2 \
                    AND (next_attempt_at IS NULL OR next_attempt_at <= ?3))) \
             ORDER BY created_at ASC, id ASC \
             LIMIT ?4"
        );
        let mut select = guard.prepare(&sql).map_err(db_error)?;
        let rows = select
            .query_map(
                params![
                    stream.map(StreamName::as_str),
                    self.max_attempts_param(),
                    now.as_unix_millis(),
                    limit_param(limit)
                ],
                decode_item,
            )
            .map_err(db_error)?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row.map_err(db_error)?);
        }
        drop(select);
        drop(guard);
        Ok(items)
    }

    /// Claims eligible items inside one transaction.
    fn claim_items(
        &self,
        stream: &StreamName,
        limit: usize,
        now: Timestamp,
    ) -> Result<Vec<QueueItem>, SqliteQueueError> {
        let mut guard = self.lock_connection()?;
        let tx = guard.transaction().map_err(db_error)?;
        let mut claimed = {
            let sql = format!(
                "SELECT {ITEM_COLUMNS} FROM queue_items \
                 WHERE stream_name = ?1 \
                   AND (status = 'pending' OR (status = 'failed' AND attempts < ?2 \
                        AND (next_attempt_at IS NULL OR next_attempt_at <= ?3))) \
                 ORDER BY created_at ASC, id ASC \
                 LIMIT ?4"
            );
            let mut select = tx.prepare(&sql).map_err(db_error)?;
            let rows = select
                .query_map(
                    params![
                        stream.as_str(),
                        self.max_attempts_param(),
                        now.as_unix_millis(),
                        limit_param(limit)
                    ],
                    decode_item,
                )
                .map_err(db_error)?;
            let mut items = Vec::new();
            for row in rows {
                items.push(row.map_err(db_error)?);
            }
            items
        };
        {
            let mut update = tx
                .prepare(
                    "UPDATE queue_items SET status = 'uploading', claimed_at = ?1 WHERE id = ?2",
                )
                .map_err(db_error)?;
            for item in &mut claimed {
                update
                    .execute(params![now.as_unix_millis(), item.id.as_i64()])
                    .map_err(db_error)?;
                item.status = ItemStatus::Uploading;
                item.claimed_at = Some(now);
            }
        }
        tx.commit().map_err(db_error)?;
        drop(guard);
        Ok(claimed)
    }

    /// Marks uploading items as completed; idempotent.
    fn complete_items(&self, ids: &[ItemId], _now: Timestamp) -> Result<u64, SqliteQueueError> {
        let mut guard = self.lock_connection()?;
        let tx = guard.transaction().map_err(db_error)?;
        let mut affected = 0_u64;
        {
            let mut update = tx
                .prepare(
                    "UPDATE queue_items SET status = 'completed', next_attempt_at = NULL, \
                     claimed_at = NULL WHERE id = ?1 AND status = 'uploading'",
                )
                .map_err(db_error)?;
            for id in ids {
                let changed = update.execute(params![id.as_i64()]).map_err(db_error)?;
                affected = affected.saturating_add(u64::try_from(changed).unwrap_or(0));
            }
        }
        tx.commit().map_err(db_error)?;
        drop(guard);
        Ok(affected)
    }

    /// Marks uploading items as failed with caller-supplied retry deadlines.
    fn fail_items(
        &self,
        schedules: &[RetrySchedule],
        now: Timestamp,
    ) -> Result<u64, SqliteQueueError> {
        let mut guard = self.lock_connection()?;
        let tx = guard.transaction().map_err(db_error)?;
        let mut affected = 0_u64;
        {
            let mut update = tx
                .prepare(
                    "UPDATE queue_items SET status = 'failed', attempts = attempts + 1, \
                     last_attempt_at = ?1, next_attempt_at = ?2, claimed_at = NULL \
                     WHERE id = ?3 AND status = 'uploading'",
                )
                .map_err(db_error)?;
            for schedule in schedules {
                let changed = update
                    .execute(params![
                        now.as_unix_millis(),
                        schedule.next_attempt_at.as_unix_millis(),
                        schedule.item_id.as_i64()
                    ])
                    .map_err(db_error)?;
                affected = affected.saturating_add(u64::try_from(changed).unwrap_or(0));
            }
        }
        tx.commit().map_err(db_error)?;
        drop(guard);
        Ok(affected)
    }

    /// Reverts claims older than the grace period back to failed.
    fn release_stale_items(&self, grace_ms: u64, now: Timestamp) -> Result<u64, SqliteQueueError> {
        let cutoff = now.as_unix_millis().saturating_sub(millis_param(grace_ms));
        let mut guard = self.lock_connection()?;
        let tx = guard.transaction().map_err(db_error)?;
        let stale: Vec<(i64, u32)> = {
            let mut select = tx
                .prepare(
                    "SELECT id, attempts FROM queue_items \
                     WHERE status = 'uploading' AND claimed_at IS NOT NULL AND claimed_at <= ?1",
                )
                .map_err(db_error)?;
            let rows = select
                .query_map(params![cutoff], |row| {
                    let id: i64 = row.get(0)?;
                    let attempts: i64 = row.get(1)?;
                    Ok((id, attempts))
                })
                .map_err(db_error)?;
            let mut stale = Vec::new();
            for row in rows {
                let (id, attempts) = row.map_err(db_error)?;
                stale.push((id, decode_attempts(attempts)?));
            }
            stale
        };
        let mut affected = 0_u64;
        {
            let mut update = tx
                .prepare(
                    "UPDATE queue_items SET status = 'failed', attempts = ?1, \
                     last_attempt_at = ?2, next_attempt_at = ?3, claimed_at = NULL \
                     WHERE id = ?4 AND status = 'uploading'",
                )
                .map_err(db_error)?;
            for (id, attempts) in stale {
                // Stale claims re-enter retry at the base delay; jitter is
                // drawn only for observed upload failures.
                let raised = attempts.saturating_add(1);
                let deadline = now.saturating_add_millis(RetryPolicy::base_delay_ms(raised));
                let changed = update
                    .execute(params![
                        i64::from(raised),
                        now.as_unix_millis(),
                        deadline.as_unix_millis(),
                        id
                    ])
                    .map_err(db_error)?;
                affected = affected.saturating_add(u64::try_from(changed).unwrap_or(0));
            }
        }
        tx.commit().map_err(db_error)?;
        drop(guard);
        Ok(affected)
    }

    /// Deletes expired completed items and terminal failures.
    fn purge_items(&self, retention_ms: u64, now: Timestamp) -> Result<u64, SqliteQueueError> {
        let cutoff = now.as_unix_millis().saturating_sub(millis_param(retention_ms));
        let guard = self.lock_connection()?;
        let deleted = guard
            .execute(
                "DELETE FROM queue_items WHERE created_at <= ?1 \
                 AND (status = 'completed' OR (status = 'failed' AND attempts >= ?2))",
                params![cutoff, self.max_attempts_param()],
            )
            .map_err(db_error)?;
        drop(guard);
        Ok(u64::try_from(deleted).unwrap_or(0))
    }

    /// Returns the distinct streams with eligible items.
    fn eligible_streams(&self, now: Timestamp) -> Result<Vec<StreamName>, SqliteQueueError> {
        let guard = self.lock_connection()?;
        let mut select = guard
            .prepare(
                "SELECT DISTINCT stream_name FROM queue_items \
                 WHERE status = 'pending' OR (status = 'failed' AND attempts < ?1 \
                      AND (next_attempt_at IS NULL OR next_attempt_at <= ?2)) \
                 ORDER BY stream_name ASC",
            )
            .map_err(db_error)?;
        let rows = select
            .query_map(params![self.max_attempts_param(), now.as_unix_millis()], |row| {
                row.get::<_, String>(0)
            })
            .map_err(db_error)?;
        let mut streams = Vec::new();
        for row in rows {
            streams.push(StreamName::new(row.map_err(db_error)?));
        }
        drop(select);
        drop(guard);
        Ok(streams)
    }

    /// Returns aggregate queue counters and the database footprint.
    ///
    /// Fails closed when any row carries a status outside the known set.
    fn queue_stats(&self, now: Timestamp) -> Result<QueueStats, SqliteQueueError> {
        let guard = self.lock_connection()?;
        let count = |sql: &str, args: &[&dyn rusqlite::ToSql]| -> Result<u64, SqliteQueueError> {
            let value: i64 = guard.query_row(sql, args, |row| row.get(0)).map_err(db_error)?;
            Ok(u64::try_from(value).unwrap_or(0))
        };
        let max_attempts = self.max_attempts_param();
        let unknown = count(
            "SELECT COUNT(*) FROM queue_items \
             WHERE status NOT IN ('pending', 'uploading', 'completed', 'failed')",
            &[],
        )?;
        if unknown > 0 {
            return Err(SqliteQueueError::Corrupt(format!(
                "{unknown} rows carry an unknown status"
            )));
        }
        let total = count("SELECT COUNT(*) FROM queue_items", &[])?;
        let pending = count("SELECT COUNT(*) FROM queue_items WHERE status = 'pending'", &[])?;
        let uploading = count("SELECT COUNT(*) FROM queue_items WHERE status = 'uploading'", &[])?;
        let failed = count(
            "SELECT COUNT(*) FROM queue_items WHERE status = 'failed' AND attempts < ?1",
            &[&max_attempts],
        )?;
        let terminal_failed = count(
            "SELECT COUNT(*) FROM queue_items WHERE status = 'failed' AND attempts >= ?1",
            &[&max_attempts],
        )?;
        let completed = count("SELECT COUNT(*) FROM queue_items WHERE status = 'completed'", &[])?;
        let oldest_pending: Option<i64> = guard
            .query_row(
                "SELECT MIN(created_at) FROM queue_items WHERE status = 'pending'",
                params![],
                |row| row.get(0),
            )
            .map_err(db_error)?;
        let store_size: i64 = guard
            .query_row(
                "SELECT page_count * page_size FROM pragma_page_count(), pragma_page_size()",
                params![],
                |row| row.get(0),
            )
            .map_err(db_error)?;
        drop(guard);
        Ok(QueueStats {
            pending,
            uploading,
            failed,
            terminal_failed,
            completed,
            total,
            oldest_pending_age_ms: oldest_pending
                .map(|created| now.millis_since(Timestamp::from_unix_millis(created))),
            store_size_bytes: u64::try_from(store_size).unwrap_or(0),
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteQueueError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteQueueError::Io("store path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteQueueError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteQueueError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteQueueError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteQueueError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteQueueError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with durable defaults.
fn open_connection(config: &SqliteQueueConfig) -> Result<Connection, SqliteQueueError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags).map_err(db_error)?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteQueueConfig,
) -> Result<(), SqliteQueueError> {
    connection.execute_batch("PRAGMA foreign_keys = ON;").map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(db_error)?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteQueueError> {
    let tx = connection.transaction().map_err(db_error)?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS queue_meta (version INTEGER NOT NULL);")
        .map_err(db_error)?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM queue_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(db_error)?;
    match version {
        None => {
            tx.execute("INSERT INTO queue_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(db_error)?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS queue_items (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    stream_name TEXT NOT NULL,
                    payload BLOB NOT NULL,
                    created_at INTEGER NOT NULL,
                    attempts INTEGER NOT NULL DEFAULT 0,
                    last_attempt_at INTEGER,
                    next_attempt_at INTEGER,
                    claimed_at INTEGER,
                    status TEXT NOT NULL DEFAULT 'pending'
                );
                CREATE INDEX IF NOT EXISTS idx_queue_items_stream_status
                    ON queue_items (stream_name, status);
                CREATE INDEX IF NOT EXISTS idx_queue_items_status_created
                    ON queue_items (status, created_at);",
            )
            .map_err(db_error)?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteQueueError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(db_error)?;
    Ok(())
}

/// Decodes one `queue_items` row into a [`QueueItem`].
fn decode_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<QueueItem> {
    let status_text: String = row.get(8)?;
    let status = ItemStatus::parse(&status_text).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            8,
            rusqlite::types::Type::Text,
            format!("unknown item status: {status_text}").into(),
        )
    })?;
    let attempts_raw: i64 = row.get(4)?;
    let attempts = u32::try_from(attempts_raw).map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Integer,
            format!("attempt count out of range: {attempts_raw}").into(),
        )
    })?;
    Ok(QueueItem {
        id: ItemId::new(row.get(0)?),
        stream_name: StreamName::new(row.get::<_, String>(1)?),
        payload: row.get(2)?,
        created_at: Timestamp::from_unix_millis(row.get(3)?),
        attempts,
        last_attempt_at: row.get::<_, Option<i64>>(5)?.map(Timestamp::from_unix_millis),
        next_attempt_at: row.get::<_, Option<i64>>(6)?.map(Timestamp::from_unix_millis),
        claimed_at: row.get::<_, Option<i64>>(7)?.map(Timestamp::from_unix_millis),
        status,
    })
}

/// Decodes an attempts counter read outside [`decode_item`].
fn decode_attempts(value: i64) -> Result<u32, SqliteQueueError> {
    u32::try_from(value)
        .map_err(|_| SqliteQueueError::Corrupt(format!("attempt count out of range: {value}")))
}

/// Converts a row limit into an `SQLite` parameter.
fn limit_param(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// Converts a millisecond span into an `SQLite` parameter.
fn millis_param(span_ms: u64) -> i64 {
    i64::try_from(span_ms).unwrap_or(i64::MAX)
}
