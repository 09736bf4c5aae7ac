// crates/load-gate-core/src/lib.rs
// ============================================================================
// Module: Load Gate Core Library
// Description: Admission-and-execution engine for insert/delete throughput runs.
// Purpose: Decide whether a run may start, execute it in chunks, account results.
// Dependencies: rand, serde, thiserror
// ============================================================================

//! ## Overview
//! Load Gate Core owns the full request lifecycle: token-bucket admission,
//! resource reservation, chunked execution against a [`StoragePort`], bounded
//! retry with exponential backoff, and result accounting.
//! Invariants:
//! - Validation and reservation failures occur before any storage side effect.
//! - Reservations are released on every exit path.
//! - Bucket and counter updates are serialized; no double-spend, no leaks.
//! - Exactly one [`OperationResult`] is produced per admitted request.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::errors::EngineError;
pub use crate::core::errors::OperationFailure;
pub use crate::core::identifiers::ClientId;
pub use crate::core::identifiers::EndpointClass;
pub use crate::core::identifiers::OperationId;
pub use crate::core::request::DEFAULT_MAX_BATCH_SIZE;
pub use crate::core::request::DEFAULT_MAX_TOTAL_RECORDS;
pub use crate::core::request::OperationRequest;
pub use crate::core::request::OperationType;
pub use crate::core::request::RequestLimits;
pub use crate::core::result::OperationResult;
pub use crate::core::result::OperationStatus;
pub use crate::core::time::Clock;
pub use crate::core::time::ManualClock;
pub use crate::core::time::SystemClock;
pub use crate::interfaces::BenchRecord;
pub use crate::interfaces::FixedProbe;
pub use crate::interfaces::MemoryProbe;
pub use crate::interfaces::MetricsRecorder;
pub use crate::interfaces::NoopMetrics;
pub use crate::interfaces::OperationMetricEvent;
pub use crate::interfaces::ProcSelfProbe;
pub use crate::interfaces::RecordId;
pub use crate::interfaces::RetryMetricEvent;
pub use crate::interfaces::StorageError;
pub use crate::interfaces::StoragePort;
pub use crate::runtime::admission::AdmissionController;
pub use crate::runtime::admission::AdmissionDecision;
pub use crate::runtime::admission::AdmissionPolicy;
pub use crate::runtime::admission::DEFAULT_IDLE_TTL_MS;
pub use crate::runtime::bucket::BucketConfig;
pub use crate::runtime::bucket::BucketDecision;
pub use crate::runtime::bucket::TokenBucket;
pub use crate::runtime::engine::BatchOperationEngine;
pub use crate::runtime::engine::EngineLimits;
pub use crate::runtime::guard::GuardConfig;
pub use crate::runtime::guard::Reservation;
pub use crate::runtime::guard::ResourceGuard;
pub use crate::runtime::retry::RetryExecutor;
pub use crate::runtime::retry::RetryExhausted;
pub use crate::runtime::retry::RetryPolicy;
