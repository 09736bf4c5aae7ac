// crates/load-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Load Gate Interfaces
// Description: Backend-agnostic interfaces for storage, metrics, and memory.
// Purpose: Define the contract surfaces used by the Load Gate runtime.
// Dependencies: crate::core, serde, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how the engine integrates with persistence and
//! observability backends without embedding backend-specific details.
//! Implementations must fail closed on invalid data: a storage adapter that
//! cannot classify a failure reports it as fatal, never as transient.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::EndpointClass;
use crate::core::request::OperationType;
use crate::core::result::OperationResult;

// ============================================================================
// SECTION: Records
// ============================================================================

/// Storage row identifier.
///
/// # Invariants
/// - Values are opaque to the engine; ordering is only used for paging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub i64);

impl RecordId {
    /// Returns the raw identifier value.
    #[must_use]
    pub const fn raw(self) -> i64 {
        self.0
    }
}

/// Generated benchmark record inserted during throughput runs.
///
/// # Invariants
/// - Contents are deterministic for a given record index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchRecord {
    /// Human-readable label carrying the record index.
    pub label: String,
    /// Fixed-shape payload body.
    pub payload: String,
    /// Creation timestamp in unix epoch milliseconds.
    pub created_at_ms: i64,
}

// ============================================================================
// SECTION: Storage Port
// ============================================================================

/// Storage failure classification.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Only [`StorageError::Busy`] and [`StorageError::Timeout`] are transient.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    /// Store is busy or locked; the attempt may be retried.
    #[error("storage busy: {0}")]
    Busy(String),
    /// Attempt exceeded its allotted time; the attempt may be retried.
    #[error("storage timeout: {0}")]
    Timeout(String),
    /// Constraint violation on a specific record.
    #[error("storage constraint violation: {0}")]
    Constraint(String),
    /// I/O failure reported by the store.
    #[error("storage io error: {0}")]
    Io(String),
    /// Store corruption detected.
    #[error("storage corruption: {0}")]
    Corrupt(String),
    /// Invalid input handed to the store.
    #[error("storage invalid input: {0}")]
    Invalid(String),
}

impl StorageError {
    /// Returns whether the failure class is transient and safe to retry.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Busy(_) | Self::Timeout(_))
    }

    /// Returns a stable label for the failure class.
    #[must_use]
    pub const fn class(&self) -> &'static str {
        match self {
            Self::Busy(_) => "busy",
            Self::Timeout(_) => "timeout",
            Self::Constraint(_) => "constraint",
            Self::Io(_) => "io",
            Self::Corrupt(_) => "corrupt",
            Self::Invalid(_) => "invalid",
        }
    }
}

/// Persistence abstraction mutated by throughput runs.
///
/// Each `insert_many`/`delete_many` call commits independently; the engine
/// relies on that boundary for its lenient per-chunk failure policy.
pub trait StoragePort: Send + Sync {
    /// Inserts a single record.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the insert fails.
    fn insert_one(&self, record: &BenchRecord) -> Result<(), StorageError>;

    /// Inserts a chunk of records in one transaction, returning the count inserted.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the chunk fails; no partial commit remains.
    fn insert_many(&self, records: &[BenchRecord]) -> Result<u64, StorageError>;

    /// Deletes a single record by identifier, returning 0 or 1.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the delete fails.
    fn delete_one(&self, id: RecordId) -> Result<u64, StorageError>;

    /// Deletes a chunk of records in one transaction, returning the count deleted.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the chunk fails; no partial commit remains.
    fn delete_many(&self, ids: &[RecordId]) -> Result<u64, StorageError>;

    /// Returns up to `limit` record identifiers in ascending order from `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the query fails.
    fn page_of_ids(&self, limit: u64, offset: u64) -> Result<Vec<RecordId>, StorageError>;

    /// Returns the total stored record count.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the query fails.
    fn count_all(&self) -> Result<u64, StorageError>;
}

// ============================================================================
// SECTION: Metrics Recorder
// ============================================================================

/// Completed-operation metric event payload.
///
/// # Invariants
/// - Mirrors the matching [`OperationResult`] fields without extra detail.
#[derive(Debug, Clone)]
pub struct OperationMetricEvent {
    /// Mutation kind for the run.
    pub operation_type: OperationType,
    /// Records per storage call as executed.
    pub batch_size: u64,
    /// Records successfully processed.
    pub records_processed: u64,
    /// Chunk count attempted.
    pub total_batches: u64,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Final status label.
    pub status: &'static str,
}

impl OperationMetricEvent {
    /// Builds a metric event from a finished result.
    #[must_use]
    pub fn from_result(result: &OperationResult) -> Self {
        Self {
            operation_type: result.operation_type,
            batch_size: result.batch_size,
            records_processed: result.records_processed,
            total_batches: result.total_batches,
            duration_ms: result.duration_ms,
            status: result.status.as_str(),
        }
    }
}

/// Retry attempt metric event payload.
///
/// # Invariants
/// - `attempt` starts at 1 for the first invocation.
#[derive(Debug, Clone, Copy)]
pub struct RetryMetricEvent {
    /// Mutation kind being retried.
    pub operation_type: OperationType,
    /// Attempt ordinal, starting at 1.
    pub attempt: u32,
    /// Configured attempt ceiling.
    pub max_attempts: u32,
    /// Backoff delay applied before this attempt, in milliseconds.
    pub delay_ms: u64,
}

/// Metrics sink for engine counters and timers.
///
/// Handles are injected at construction; the engine owns no metric transport.
pub trait MetricsRecorder: Send + Sync {
    /// Records that an operation entered execution.
    fn operation_started(&self, operation_type: OperationType);
    /// Records a completed operation with its accounting.
    fn operation_completed(&self, event: &OperationMetricEvent);
    /// Records a failed or rejected operation with a stable kind label.
    fn operation_failed(&self, operation_type: OperationType, kind: &'static str);
    /// Records a retry attempt.
    fn retry_attempt(&self, event: &RetryMetricEvent);
    /// Records an admission denial for the given class.
    fn admission_denied(&self, class: EndpointClass);
}

/// No-op metrics sink.
///
/// # Invariants
/// - Metrics are intentionally discarded.
#[derive(Debug, Default)]
pub struct NoopMetrics;

impl MetricsRecorder for NoopMetrics {
    fn operation_started(&self, _operation_type: OperationType) {}

    fn operation_completed(&self, _event: &OperationMetricEvent) {}

    fn operation_failed(&self, _operation_type: OperationType, _kind: &'static str) {}

    fn retry_attempt(&self, _event: &RetryMetricEvent) {}

    fn admission_denied(&self, _class: EndpointClass) {}
}

// ============================================================================
// SECTION: Memory Probe
// ============================================================================

/// Host memory usage probe consulted by the resource guard.
pub trait MemoryProbe: Send + Sync {
    /// Returns resident memory used by the process, in bytes, when known.
    fn used_bytes(&self) -> Option<u64>;

    /// Returns total memory available to the process, in bytes, when known.
    fn capacity_bytes(&self) -> Option<u64>;
}

/// Probe reading `/proc/self/statm` and `/proc/meminfo` on Linux.
///
/// # Invariants
/// - Returns `None` on platforms or states where the files are unreadable.
#[derive(Debug, Default)]
pub struct ProcSelfProbe;

/// Page size assumed when converting `statm` pages to bytes.
const PROC_PAGE_BYTES: u64 = 4_096;

impl MemoryProbe for ProcSelfProbe {
    fn used_bytes(&self) -> Option<u64> {
        let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
        let resident_pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
        Some(resident_pages.saturating_mul(PROC_PAGE_BYTES))
    }

    fn capacity_bytes(&self) -> Option<u64> {
        let meminfo = std::fs::read_to_string("/proc/meminfo").ok()?;
        let line = meminfo.lines().find(|line| line.starts_with("MemTotal:"))?;
        let kib: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
        Some(kib.saturating_mul(1_024))
    }
}

/// Fixed-value probe for deterministic tests.
///
/// # Invariants
/// - Reported values never change after construction.
#[derive(Debug, Clone, Copy)]
pub struct FixedProbe {
    /// Reported used bytes.
    pub used: u64,
    /// Reported capacity bytes.
    pub capacity: u64,
}

impl MemoryProbe for FixedProbe {
    fn used_bytes(&self) -> Option<u64> {
        Some(self.used)
    }

    fn capacity_bytes(&self) -> Option<u64> {
        Some(self.capacity)
    }
}
