// crates/load-gate-core/src/core/result.rs
// ============================================================================
// Module: Operation Results
// Description: Immutable result record produced once per throughput run.
// Purpose: Stable contract consumed by callers and reporting layers.
// Dependencies: crate::core::{identifiers, request}, serde
// ============================================================================

//! ## Overview
//! [`OperationResult`] is produced exactly once per request and returned to
//! both the caller and the metrics sink. Field names and units (`duration_ms`,
//! `avg_time_per_record_ms`, byte counts) are a stable downstream contract
//! and must not be renamed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::OperationId;
use crate::core::request::OperationType;

// ============================================================================
// SECTION: Status
// ============================================================================

/// Final status of a throughput run.
///
/// # Invariants
/// - Variants are stable for serialization and metric labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    /// Every requested record was processed.
    Success,
    /// Some records were processed; per-record or per-chunk failures occurred.
    Partial,
    /// No record was processed and an error occurred before any progress.
    Failed,
}

impl OperationStatus {
    /// Returns a stable label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }
}

// ============================================================================
// SECTION: Result Record
// ============================================================================

/// Immutable result of one throughput run.
///
/// # Invariants
/// - `records_processed + records_failed` never exceeds the clamped request.
/// - Averages use `max(count, 1)` denominators and never divide by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    /// Identifier assigned when the run was admitted.
    pub operation_id: OperationId,
    /// Mutation kind for the run.
    pub operation_type: OperationType,
    /// Records per storage call as executed (after any delete clamp).
    pub batch_size: u64,
    /// Records successfully processed.
    pub records_processed: u64,
    /// Records that failed permanently after retries.
    pub records_failed: u64,
    /// Chunk count attempted for the run.
    pub total_batches: u64,
    /// Chunks that failed permanently after retries.
    pub batches_failed: u64,
    /// Wall-clock duration of the run in milliseconds.
    pub duration_ms: u64,
    /// Average milliseconds per processed record.
    pub avg_time_per_record_ms: f64,
    /// Average milliseconds per attempted batch.
    pub avg_time_per_batch_ms: f64,
    /// Resident memory delta across the run in bytes.
    pub memory_delta_bytes: i64,
    /// Final run status.
    pub status: OperationStatus,
    /// Unix epoch milliseconds when the run started.
    pub started_at_ms: i64,
    /// Unix epoch milliseconds when the run finished.
    pub finished_at_ms: i64,
}
