// crates/load-gate-core/src/core/errors.rs
// ============================================================================
// Module: Engine Error Taxonomy
// Description: Structured failure kinds surfaced by the admission engine.
// Purpose: Machine-readable failures with stable kinds and no storage detail leaks.
// Dependencies: crate::core::identifiers, thiserror
// ============================================================================

//! ## Overview
//! Expected failures travel as [`EngineError`] values, never as panics.
//! [`EngineError::Validation`] and [`EngineError::ResourceExhausted`] are
//! raised before any side effect; storage failures only surface after retries
//! are exhausted. Messages never embed SQL text or raw storage payloads.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::identifiers::OperationId;

// ============================================================================
// SECTION: Engine Errors
// ============================================================================

/// Failure kinds surfaced by the admission-and-execution engine.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Messages avoid embedding SQL text or raw record payloads.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    /// Request shape violated a validation constraint.
    #[error("validation failed: {constraint}")]
    Validation {
        /// Human-readable description of the violated constraint.
        constraint: String,
    },
    /// Admission denied by the rate limiter.
    #[error("rate limit exceeded; retry after {retry_after_ms} ms")]
    RateLimited {
        /// Suggested wait before retrying, in milliseconds.
        retry_after_ms: u64,
    },
    /// Memory or concurrency ceiling breached before execution.
    #[error("resource exhausted ({reason}): {active} active of {limit} allowed")]
    ResourceExhausted {
        /// Active heavy operations at rejection time.
        active: u64,
        /// Configured ceiling.
        limit: u64,
        /// Which ceiling was breached.
        reason: String,
    },
    /// Storage failure surfaced after retries were exhausted.
    #[error("storage operation failed after {attempts} attempts: {message}")]
    Storage {
        /// Sanitized failure description.
        message: String,
        /// Attempts consumed before giving up.
        attempts: u32,
    },
    /// Chunk exceeded its allotted time after retries.
    #[error("operation timed out after {attempts} attempts: {message}")]
    Timeout {
        /// Sanitized timeout description.
        message: String,
        /// Attempts consumed before giving up.
        attempts: u32,
    },
    /// Unexpected failure mid-execution.
    #[error("performance operation error: {message}")]
    Internal {
        /// Sanitized failure description.
        message: String,
    },
}

impl EngineError {
    /// Returns a stable machine-readable kind label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::RateLimited { .. } => "rate_limit_exceeded",
            Self::ResourceExhausted { .. } => "resource_exhausted",
            Self::Storage { .. } => "database_operation_error",
            Self::Timeout { .. } => "operation_timeout",
            Self::Internal { .. } => "performance_operation_error",
        }
    }
}

// ============================================================================
// SECTION: Operation Failure
// ============================================================================

/// Structured failure returned by engine entry points.
///
/// # Invariants
/// - `operation_id` is always populated so failures can be correlated.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("operation {operation_id} failed: {error}")]
pub struct OperationFailure {
    /// Identifier assigned to the rejected or failed request.
    pub operation_id: OperationId,
    /// Failure kind and detail.
    pub error: EngineError,
}

impl OperationFailure {
    /// Creates a failure wrapper for the given operation.
    #[must_use]
    pub const fn new(operation_id: OperationId, error: EngineError) -> Self {
        Self {
            operation_id,
            error,
        }
    }
}
