// crates/load-gate-core/src/runtime/engine.rs
// ============================================================================
// Module: Batch Operation Engine
// Description: Admission-gated insert/delete execution with chunk accounting.
// Purpose: Run one validated request end-to-end and produce one result.
// Dependencies: crate::core, crate::interfaces, crate::runtime, serde
// ============================================================================

//! ## Overview
//! The engine drives one request through VALIDATING, RESERVING, EXECUTING,
//! and FINALIZING. Validation and reservation failures occur before any side
//! effect. During execution the failure policy is lenient: a record or chunk
//! that fails permanently is counted and the run proceeds, bounding the blast
//! radius of one bad chunk while still reporting a non-zero failure count.
//! Chunks are processed sequentially in index order; the resource guard
//! bounds how many requests run concurrently, not how many chunks run within
//! one request.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use crate::core::errors::EngineError;
use crate::core::errors::OperationFailure;
use crate::core::identifiers::ClientId;
use crate::core::identifiers::EndpointClass;
use crate::core::identifiers::OperationId;
use crate::core::request::OperationRequest;
use crate::core::request::OperationType;
use crate::core::request::RequestLimits;
use crate::core::result::OperationResult;
use crate::core::result::OperationStatus;
use crate::core::time::Clock;
use crate::interfaces::BenchRecord;
use crate::interfaces::MemoryProbe;
use crate::interfaces::MetricsRecorder;
use crate::interfaces::OperationMetricEvent;
use crate::interfaces::StorageError;
use crate::interfaces::StoragePort;
use crate::runtime::admission::AdmissionController;
use crate::runtime::guard::ResourceGuard;
use crate::runtime::retry::RetryExecutor;
use crate::runtime::retry::RetryExhausted;

// ============================================================================
// SECTION: Engine Limits
// ============================================================================

/// Request maxima and per-chunk timeout ceilings.
///
/// # Invariants
/// - Timeout ceilings are greater than zero.
/// - Deletes get the longer ceiling; large deletes are slower than inserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineLimits {
    /// Request validation maxima.
    pub request: RequestLimits,
    /// Per-chunk wall-clock ceiling for inserts, in milliseconds.
    pub insert_chunk_timeout_ms: u64,
    /// Per-chunk wall-clock ceiling for deletes, in milliseconds.
    pub delete_chunk_timeout_ms: u64,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            request: RequestLimits::default(),
            insert_chunk_timeout_ms: 10_000,
            delete_chunk_timeout_ms: 30_000,
        }
    }
}

impl EngineLimits {
    /// Returns the chunk timeout ceiling for the given operation type.
    #[must_use]
    pub const fn chunk_timeout_ms(&self, operation_type: OperationType) -> u64 {
        match operation_type {
            OperationType::Insert => self.insert_chunk_timeout_ms,
            OperationType::Delete => self.delete_chunk_timeout_ms,
        }
    }
}

// ============================================================================
// SECTION: Execution Tally
// ============================================================================

/// Running counters accumulated while chunks execute.
#[derive(Debug, Default, Clone, Copy)]
struct ExecutionTally {
    /// Records successfully processed.
    records_processed: u64,
    /// Records that failed permanently.
    records_failed: u64,
    /// Chunks attempted.
    total_batches: u64,
    /// Chunks that failed permanently.
    batches_failed: u64,
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Admission-gated engine executing one request per call, synchronously.
///
/// # Invariants
/// - Validation and reservation failures produce no storage side effects.
/// - The guard reservation is released on every exit path.
/// - Exactly one [`OperationResult`] is produced per admitted request.
pub struct BatchOperationEngine {
    /// Admission controller gating entry points.
    admission: Arc<AdmissionController>,
    /// Resource guard bounding concurrent heavy operations.
    guard: Arc<ResourceGuard>,
    /// Retry wrapper for storage chunks.
    retry: RetryExecutor,
    /// Persistence backend.
    storage: Arc<dyn StoragePort>,
    /// Metrics sink.
    metrics: Arc<dyn MetricsRecorder>,
    /// Host memory probe for delta accounting.
    probe: Arc<dyn MemoryProbe>,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Request maxima and chunk timeouts.
    limits: EngineLimits,
}

impl BatchOperationEngine {
    /// Creates an engine from its collaborators.
    #[must_use]
    #[allow(clippy::too_many_arguments, reason = "constructor wires all injected collaborators")]
    pub fn new(
        admission: Arc<AdmissionController>,
        guard: Arc<ResourceGuard>,
        retry: RetryExecutor,
        storage: Arc<dyn StoragePort>,
        metrics: Arc<dyn MetricsRecorder>,
        probe: Arc<dyn MemoryProbe>,
        clock: Arc<dyn Clock>,
        limits: EngineLimits,
    ) -> Self {
        Self {
            admission,
            guard,
            retry,
            storage,
            metrics,
            probe,
            clock,
            limits,
        }
    }

    /// Runs an insert throughput operation.
    ///
    /// # Errors
    ///
    /// Returns [`OperationFailure`] when validation, admission, reservation,
    /// or execution fails before any progress.
    pub fn run_insert(
        &self,
        client: &ClientId,
        total_records: u64,
        batch_size: u64,
    ) -> Result<OperationResult, OperationFailure> {
        self.run(client, OperationType::Insert, total_records, batch_size)
    }

    /// Runs a delete throughput operation.
    ///
    /// # Errors
    ///
    /// Returns [`OperationFailure`] when validation, admission, reservation,
    /// or execution fails before any progress.
    pub fn run_delete(
        &self,
        client: &ClientId,
        total_records: u64,
        batch_size: u64,
    ) -> Result<OperationResult, OperationFailure> {
        self.run(client, OperationType::Delete, total_records, batch_size)
    }

    /// Drives one request through the full state machine.
    fn run(
        &self,
        client: &ClientId,
        operation_type: OperationType,
        total_records: u64,
        batch_size: u64,
    ) -> Result<OperationResult, OperationFailure> {
        let operation_id = OperationId::generate();

        // VALIDATING: no side effects yet.
        let request =
            OperationRequest::new(operation_type, total_records, batch_size, &self.limits.request)
                .map_err(|error| self.reject(operation_id.clone(), operation_type, error))?;

        // Admission: heavy class quota.
        let decision = self.admission.allow(client, EndpointClass::Heavy);
        if !decision.permitted {
            self.metrics.admission_denied(EndpointClass::Heavy);
            return Err(self.reject(
                operation_id,
                operation_type,
                EngineError::RateLimited {
                    retry_after_ms: decision.retry_after_ms,
                },
            ));
        }

        // RESERVING: no partial side effects are possible on rejection.
        let reservation = self
            .guard
            .reserve()
            .map_err(|error| self.reject(operation_id.clone(), operation_type, error))?;

        // EXECUTING and FINALIZING. The reservation is dropped on every path
        // out of this scope, including the error path.
        let outcome = self.execute(&operation_id, request);
        drop(reservation);

        match outcome {
            Ok(result) => {
                self.metrics.operation_completed(&OperationMetricEvent::from_result(&result));
                Ok(result)
            }
            Err(error) => {
                self.metrics.operation_failed(operation_type, error.kind());
                Err(OperationFailure::new(operation_id, error))
            }
        }
    }

    /// Builds a rejection failure and records the metric.
    fn reject(
        &self,
        operation_id: OperationId,
        operation_type: OperationType,
        error: EngineError,
    ) -> OperationFailure {
        self.metrics.operation_failed(operation_type, error.kind());
        OperationFailure::new(operation_id, error)
    }

    /// EXECUTING + FINALIZING for an admitted, reserved request.
    fn execute(
        &self,
        operation_id: &OperationId,
        request: OperationRequest,
    ) -> Result<OperationResult, EngineError> {
        let started_monotonic = self.clock.monotonic_ms();
        let started_at_ms = self.clock.unix_ms();
        let memory_before = self.probe.used_bytes();
        self.metrics.operation_started(request.operation_type());

        let (executed, tally) = match request.operation_type() {
            OperationType::Insert => (request, self.execute_insert(&request)),
            OperationType::Delete => self.execute_delete(request)?,
        };

        let finished_monotonic = self.clock.monotonic_ms();
        let finished_at_ms = self.clock.unix_ms();
        let memory_after = self.probe.used_bytes();
        Ok(Self::finalize(
            operation_id.clone(),
            executed,
            tally,
            finished_monotonic.saturating_sub(started_monotonic),
            started_at_ms,
            finished_at_ms,
            memory_delta_bytes(memory_before, memory_after),
        ))
    }

    /// Executes an insert run, single-record or chunked.
    fn execute_insert(&self, request: &OperationRequest) -> ExecutionTally {
        let mut tally = ExecutionTally::default();
        if request.batch_size() == 1 {
            for index in 0 .. request.total_records() {
                let record = generate_record(index, self.clock.unix_ms());
                tally.total_batches += 1;
                let attempt = self.timed_chunk(OperationType::Insert, |port| {
                    port.insert_one(&record).map(|()| 1)
                });
                match attempt {
                    Ok(_) => tally.records_processed += 1,
                    Err(_) => {
                        // Single-record mode is lenient: count and continue.
                        tally.records_failed += 1;
                        tally.batches_failed += 1;
                    }
                }
            }
            return tally;
        }
        let mut remaining = request.total_records();
        let mut index = 0_u64;
        while remaining > 0 {
            let chunk_len = remaining.min(request.batch_size());
            let records = generate_chunk(index, chunk_len, self.clock.unix_ms());
            tally.total_batches += 1;
            let attempt =
                self.timed_chunk(OperationType::Insert, |port| port.insert_many(&records));
            match attempt {
                Ok(inserted) => tally.records_processed += inserted.min(chunk_len),
                Err(_) => {
                    // A chunk that exhausts retries is counted, not fatal.
                    tally.records_failed += chunk_len;
                    tally.batches_failed += 1;
                }
            }
            index += chunk_len;
            remaining -= chunk_len;
        }
        tally
    }

    /// Executes a delete run over a resolved working set of identifiers.
    ///
    /// Returns the clamped request actually executed together with the tally.
    fn execute_delete(
        &self,
        request: OperationRequest,
    ) -> Result<(OperationRequest, ExecutionTally), EngineError> {
        // Resolve the working set by id page rather than materializing rows.
        let ids = self
            .retry
            .execute(OperationType::Delete, |_| {
                self.storage.page_of_ids(request.total_records(), 0)
            })
            .map_err(exhausted_to_engine)?;
        let available = u64::try_from(ids.len()).unwrap_or(u64::MAX);
        if available == 0 {
            // Nothing to delete; an over-request is never an error.
            return Ok((request, ExecutionTally::default()));
        }
        let executed = request.clamped_to(available);
        let mut tally = ExecutionTally::default();
        if executed.batch_size() == 1 {
            for id in ids.iter().take(usize::try_from(executed.total_records()).unwrap_or(0)) {
                tally.total_batches += 1;
                let attempt =
                    self.timed_chunk(OperationType::Delete, |port| port.delete_one(*id));
                match attempt {
                    Ok(deleted) => tally.records_processed += deleted.min(1),
                    Err(_) => {
                        tally.records_failed += 1;
                        tally.batches_failed += 1;
                    }
                }
            }
            return Ok((executed, tally));
        }
        let batch = usize::try_from(executed.batch_size()).unwrap_or(usize::MAX);
        let take = usize::try_from(executed.total_records()).unwrap_or(0);
        for chunk in ids[.. take].chunks(batch) {
            let chunk_len = u64::try_from(chunk.len()).unwrap_or(u64::MAX);
            tally.total_batches += 1;
            let attempt = self.timed_chunk(OperationType::Delete, |port| port.delete_many(chunk));
            match attempt {
                Ok(deleted) => tally.records_processed += deleted.min(chunk_len),
                Err(_) => {
                    tally.records_failed += chunk_len;
                    tally.batches_failed += 1;
                }
            }
        }
        Ok((executed, tally))
    }

    /// Runs one storage chunk under retry with a wall-clock ceiling.
    ///
    /// An attempt that fails after exceeding the ceiling is reclassified as a
    /// retryable timeout. Work that committed successfully is never discarded
    /// for being slow; a synchronous port cannot roll back a finished commit.
    fn timed_chunk(
        &self,
        operation_type: OperationType,
        mut chunk: impl FnMut(&dyn StoragePort) -> Result<u64, StorageError>,
    ) -> Result<u64, RetryExhausted> {
        let ceiling_ms = self.limits.chunk_timeout_ms(operation_type);
        self.retry.execute(operation_type, |_| {
            let attempt_started = self.clock.monotonic_ms();
            let outcome = chunk(self.storage.as_ref());
            let elapsed_ms = self.clock.monotonic_ms().saturating_sub(attempt_started);
            match outcome {
                Err(error) if elapsed_ms > ceiling_ms && error.is_transient() => {
                    Err(StorageError::Timeout(format!(
                        "chunk exceeded {ceiling_ms} ms ceiling ({elapsed_ms} ms)"
                    )))
                }
                other => other,
            }
        })
    }

    /// FINALIZING: assembles the immutable result record.
    fn finalize(
        operation_id: OperationId,
        request: OperationRequest,
        tally: ExecutionTally,
        duration_ms: u64,
        started_at_ms: i64,
        finished_at_ms: i64,
        memory_delta_bytes: i64,
    ) -> OperationResult {
        let status = if tally.records_processed >= request.total_records() {
            OperationStatus::Success
        } else if tally.records_processed > 0 {
            OperationStatus::Partial
        } else if tally.total_batches == 0 {
            // Empty delete working set: nothing requested survived the clamp.
            OperationStatus::Success
        } else {
            OperationStatus::Failed
        };
        #[allow(
            clippy::cast_precision_loss,
            reason = "durations and counts are far below the f64 mantissa range"
        )]
        let avg_time_per_record_ms = duration_ms as f64 / tally.records_processed.max(1) as f64;
        #[allow(
            clippy::cast_precision_loss,
            reason = "durations and counts are far below the f64 mantissa range"
        )]
        let avg_time_per_batch_ms = duration_ms as f64 / tally.total_batches.max(1) as f64;
        OperationResult {
            operation_id,
            operation_type: request.operation_type(),
            batch_size: request.batch_size(),
            records_processed: tally.records_processed,
            records_failed: tally.records_failed,
            total_batches: tally.total_batches,
            batches_failed: tally.batches_failed,
            duration_ms,
            avg_time_per_record_ms,
            avg_time_per_batch_ms,
            memory_delta_bytes,
            status,
            started_at_ms,
            finished_at_ms,
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Fixed payload body carried by every generated record.
const RECORD_PAYLOAD: &str = "load-gate synthetic benchmark payload 0123456789abcdef";

/// Generates the deterministic record for a given index.
fn generate_record(index: u64, created_at_ms: i64) -> BenchRecord {
    BenchRecord {
        label: format!("bench-{index:08}"),
        payload: RECORD_PAYLOAD.to_string(),
        created_at_ms,
    }
}

/// Generates a contiguous chunk of records starting at `start`.
fn generate_chunk(start: u64, len: u64, created_at_ms: i64) -> Vec<BenchRecord> {
    let capacity = usize::try_from(len).unwrap_or(0);
    let mut records = Vec::with_capacity(capacity);
    for index in start .. start + len {
        records.push(generate_record(index, created_at_ms));
    }
    records
}

/// Computes the resident memory delta across a run, saturating on overflow.
fn memory_delta_bytes(before: Option<u64>, after: Option<u64>) -> i64 {
    match (before, after) {
        (Some(before), Some(after)) => {
            let before = i64::try_from(before).unwrap_or(i64::MAX);
            let after = i64::try_from(after).unwrap_or(i64::MAX);
            after.saturating_sub(before)
        }
        _ => 0,
    }
}

/// Maps an exhausted retry into the engine error taxonomy.
fn exhausted_to_engine(exhausted: RetryExhausted) -> EngineError {
    match &exhausted.last_error {
        StorageError::Timeout(message) => EngineError::Timeout {
            message: message.clone(),
            attempts: exhausted.attempts,
        },
        other => EngineError::Storage {
            message: other.to_string(),
            attempts: exhausted.attempts,
        },
    }
}
