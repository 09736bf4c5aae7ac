// crates/load-gate-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Storage Port
// Description: Durable StoragePort backed by SQLite.
// Purpose: Persist benchmark rows with per-chunk transactional commits.
// Dependencies: load-gate-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! This module implements [`StoragePort`] on `SQLite`. A single mutex-guarded
//! connection serializes all access; chunk operations run inside one
//! transaction each so the engine's per-chunk failure accounting maps directly
//! onto commit boundaries. Busy and locked conditions surface as transient
//! [`StorageError::Busy`] so the retry layer can back off and try again.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use load_gate_core::BenchRecord;
use load_gate_core::RecordId;
use load_gate_core::StorageError;
use load_gate_core::StoragePort;
use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Default database file name when no path is configured.
const DEFAULT_STORE_PATH: &str = "load-gate.db";
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures raised while opening or migrating the store.
///
/// Runtime mutation failures surface as [`StorageError`] through the port
/// methods instead.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: found {found}, expected {expected}")]
    VersionMismatch {
        /// Version recorded in the database file.
        found: i64,
        /// Version this build understands.
        expected: i64,
    },
    /// Invalid store configuration.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
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
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
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

/// Configuration for the `SQLite` storage port.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    #[serde(default = "default_store_path")]
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
}

impl Default for SqliteStoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteJournalMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default database file path.
fn default_store_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_PATH)
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Storage Port
// ============================================================================

/// [`StoragePort`] implementation on a mutex-guarded `SQLite` connection.
///
/// # Invariants
/// - Only one statement executes at a time; the mutex serializes callers.
/// - Chunk operations commit atomically or roll back entirely.
#[derive(Debug)]
pub struct SqliteStoragePort {
    /// Guarded database connection.
    connection: Mutex<Connection>,
}

impl SqliteStoragePort {
    /// Opens or creates the database, applies pragmas, and migrates schema.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the path is invalid, the file cannot
    /// be opened, or the on-disk schema version is unknown.
    pub fn open(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    /// Acquires the connection mutex, surfacing poisoning as an I/O failure.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StorageError> {
        self.connection.lock().map_err(|_| StorageError::Io("mutex poisoned".to_string()))
    }
}

impl StoragePort for SqliteStoragePort {
    fn insert_one(&self, record: &BenchRecord) -> Result<(), StorageError> {
        let guard = self.lock()?;
        let mut stmt = guard
            .prepare_cached(
                "INSERT INTO bench_records (label, payload, created_at_ms) VALUES (?1, ?2, ?3)",
            )
            .map_err(map_sqlite_error)?;
        stmt.execute(params![record.label, record.payload, record.created_at_ms])
            .map_err(map_sqlite_error)?;
        Ok(())
    }

    fn insert_many(&self, records: &[BenchRecord]) -> Result<u64, StorageError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(map_sqlite_error)?;
        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT INTO bench_records (label, payload, created_at_ms) \
                     VALUES (?1, ?2, ?3)",
                )
                .map_err(map_sqlite_error)?;
            for record in records {
                stmt.execute(params![record.label, record.payload, record.created_at_ms])
                    .map_err(map_sqlite_error)?;
            }
        }
        tx.commit().map_err(map_sqlite_error)?;
        Ok(u64::try_from(records.len()).unwrap_or(u64::MAX))
    }

    fn delete_one(&self, id: RecordId) -> Result<u64, StorageError> {
        let guard = self.lock()?;
        let mut stmt = guard
            .prepare_cached("DELETE FROM bench_records WHERE id = ?1")
            .map_err(map_sqlite_error)?;
        let changed = stmt.execute(params![id.raw()]).map_err(map_sqlite_error)?;
        Ok(u64::try_from(changed).unwrap_or(u64::MAX))
    }

    fn delete_many(&self, ids: &[RecordId]) -> Result<u64, StorageError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(map_sqlite_error)?;
        let mut deleted = 0_u64;
        {
            let mut stmt = tx
                .prepare_cached("DELETE FROM bench_records WHERE id = ?1")
                .map_err(map_sqlite_error)?;
            for id in ids {
                let changed = stmt.execute(params![id.raw()]).map_err(map_sqlite_error)?;
                deleted = deleted.saturating_add(u64::try_from(changed).unwrap_or(0));
            }
        }
        tx.commit().map_err(map_sqlite_error)?;
        Ok(deleted)
    }

    fn page_of_ids(&self, limit: u64, offset: u64) -> Result<Vec<RecordId>, StorageError> {
        let guard = self.lock()?;
        let mut stmt = guard
            .prepare_cached("SELECT id FROM bench_records ORDER BY id LIMIT ?1 OFFSET ?2")
            .map_err(map_sqlite_error)?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![limit, offset], |row| row.get::<_, i64>(0))
            .map_err(map_sqlite_error)?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(RecordId(row.map_err(map_sqlite_error)?));
        }
        Ok(ids)
    }

    fn count_all(&self) -> Result<u64, StorageError> {
        let guard = self.lock()?;
        let count: i64 = guard
            .query_row("SELECT COUNT(*) FROM bench_records", params![], |row| row.get(0))
            .map_err(map_sqlite_error)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

// ============================================================================
// SECTION: Error Mapping
// ============================================================================

/// Classifies a rusqlite failure into the port's error taxonomy.
///
/// Busy and locked map to the transient class; constraint violations and
/// corruption map to fatal classes the retry layer will not repeat.
fn map_sqlite_error(error: rusqlite::Error) -> StorageError {
    match &error {
        rusqlite::Error::SqliteFailure(inner, _) => match inner.code {
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => {
                StorageError::Busy(error.to_string())
            }
            ErrorCode::ConstraintViolation => StorageError::Constraint(error.to_string()),
            ErrorCode::DatabaseCorrupt | ErrorCode::NotADatabase => {
                StorageError::Corrupt(error.to_string())
            }
            _ => StorageError::Io(error.to_string()),
        },
        _ => StorageError::Io(error.to_string()),
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with the configured pragmas.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS bench_records (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    label TEXT NOT NULL,
                    payload TEXT NOT NULL,
                    created_at_ms INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_bench_records_label
                    ON bench_records (label);",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        Some(found) if found == SCHEMA_VERSION => {}
        Some(found) => {
            return Err(SqliteStoreError::VersionMismatch {
                found,
                expected: SCHEMA_VERSION,
            });
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))
}
