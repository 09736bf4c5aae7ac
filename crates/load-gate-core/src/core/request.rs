// crates/load-gate-core/src/core/request.rs
// ============================================================================
// Module: Operation Requests
// Description: Validated request shapes for insert/delete throughput runs.
// Purpose: Enforce request invariants before any side effect occurs.
// Dependencies: crate::core::errors, serde
// ============================================================================

//! ## Overview
//! An [`OperationRequest`] is immutable once constructed and carries only
//! values that already passed validation against [`RequestLimits`]. Rejected
//! shapes fail fast with [`EngineError::Validation`] naming the violated
//! constraint, before admission or reservation is attempted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::errors::EngineError;

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default ceiling for `total_records` in one request.
pub const DEFAULT_MAX_TOTAL_RECORDS: u64 = 100_000;
/// Default ceiling for `batch_size` in one request.
pub const DEFAULT_MAX_BATCH_SIZE: u64 = 10_000;

// ============================================================================
// SECTION: Operation Type
// ============================================================================

/// Mutation kind exercised by a throughput run.
///
/// # Invariants
/// - Variants are stable for serialization and metric labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    /// Insert generated records.
    Insert,
    /// Delete existing records.
    Delete,
}

impl OperationType {
    /// Returns a stable label for the operation type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Delete => "delete",
        }
    }
}

// ============================================================================
// SECTION: Request Limits
// ============================================================================

/// Configured maxima applied during request validation.
///
/// # Invariants
/// - Both limits are greater than zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestLimits {
    /// Maximum allowed `total_records` per request.
    pub max_total_records: u64,
    /// Maximum allowed `batch_size` per request.
    pub max_batch_size: u64,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            max_total_records: DEFAULT_MAX_TOTAL_RECORDS,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

// ============================================================================
// SECTION: Operation Request
// ============================================================================

/// Validated request for one throughput run.
///
/// # Invariants
/// - `total_records > 0`, `batch_size > 0`, `batch_size <= total_records`.
/// - Both values are within the [`RequestLimits`] used at construction.
/// - Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRequest {
    /// Mutation kind for the run.
    operation_type: OperationType,
    /// Total records to mutate.
    total_records: u64,
    /// Records per storage call; 1 selects single-record mode.
    batch_size: u64,
}

impl OperationRequest {
    /// Validates and constructs a request.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] naming the violated constraint.
    pub fn new(
        operation_type: OperationType,
        total_records: u64,
        batch_size: u64,
        limits: &RequestLimits,
    ) -> Result<Self, EngineError> {
        if total_records == 0 {
            return Err(EngineError::Validation {
                constraint: "total_records must be greater than zero".to_string(),
            });
        }
        if batch_size == 0 {
            return Err(EngineError::Validation {
                constraint: "batch_size must be greater than zero".to_string(),
            });
        }
        if batch_size > total_records {
            return Err(EngineError::Validation {
                constraint: format!(
                    "batch_size {batch_size} exceeds total_records {total_records}"
                ),
            });
        }
        if total_records > limits.max_total_records {
            return Err(EngineError::Validation {
                constraint: format!(
                    "total_records {total_records} exceeds maximum allowed {max}",
                    max = limits.max_total_records
                ),
            });
        }
        if batch_size > limits.max_batch_size {
            return Err(EngineError::Validation {
                constraint: format!(
                    "batch_size {batch_size} exceeds maximum allowed {max}",
                    max = limits.max_batch_size
                ),
            });
        }
        Ok(Self {
            operation_type,
            total_records,
            batch_size,
        })
    }

    /// Returns the mutation kind.
    #[must_use]
    pub const fn operation_type(&self) -> OperationType {
        self.operation_type
    }

    /// Returns the total record count.
    #[must_use]
    pub const fn total_records(&self) -> u64 {
        self.total_records
    }

    /// Returns the batch size.
    #[must_use]
    pub const fn batch_size(&self) -> u64 {
        self.batch_size
    }

    /// Returns the chunk count for the request.
    ///
    /// Single-record mode (`batch_size == 1`) yields one batch per record;
    /// chunked mode yields `ceil(total_records / batch_size)` batches.
    #[must_use]
    pub const fn total_batches(&self) -> u64 {
        if self.batch_size == 1 {
            self.total_records
        } else {
            self.total_records.div_ceil(self.batch_size)
        }
    }

    /// Returns a copy of the request with `total_records` clamped down.
    ///
    /// Used by delete runs when fewer identifiers exist than requested. The
    /// clamp never raises the count and keeps `batch_size` within bounds.
    /// Callers must ensure `available > 0`; an empty working set is handled
    /// before clamping.
    #[must_use]
    pub fn clamped_to(&self, available: u64) -> Self {
        let total_records = self.total_records.min(available);
        Self {
            operation_type: self.operation_type,
            total_records,
            batch_size: self.batch_size.min(total_records),
        }
    }
}
