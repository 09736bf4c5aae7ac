// crates/load-gate-core/tests/retry_unit.rs
// ============================================================================
// Module: Retry Executor Unit Tests
// Description: Attempt bounds, backoff schedule, and failure classification.
// Purpose: Validate bounded retry semantics for transient storage failures.
// ============================================================================

//! ## Overview
//! Unit-level tests for retry invariants:
//! - The unit of work never runs more than `max_attempts` times
//! - Non-retryable failures propagate after exactly one attempt
//! - The backoff schedule follows `min(initial * multiplier^(i-1), max)`
//! - Attempt events reach the metrics sink

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::sync::Arc;
use std::sync::Mutex;

use load_gate_core::EndpointClass;
use load_gate_core::MetricsRecorder;
use load_gate_core::NoopMetrics;
use load_gate_core::OperationMetricEvent;
use load_gate_core::OperationType;
use load_gate_core::RetryExecutor;
use load_gate_core::RetryMetricEvent;
use load_gate_core::RetryPolicy;
use load_gate_core::StorageError;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Metrics fake capturing retry attempt events.
#[derive(Default)]
struct RecordingMetrics {
    attempts: Mutex<Vec<RetryMetricEvent>>,
}

impl MetricsRecorder for RecordingMetrics {
    fn operation_started(&self, _operation_type: OperationType) {}

    fn operation_completed(&self, _event: &OperationMetricEvent) {}

    fn operation_failed(&self, _operation_type: OperationType, _kind: &'static str) {}

    fn retry_attempt(&self, event: &RetryMetricEvent) {
        self.attempts.lock().unwrap().push(*event);
    }

    fn admission_denied(&self, _class: EndpointClass) {}
}

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_delay_ms: 1,
        multiplier: 2.0,
        max_delay_ms: 4,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn transient_failure_is_retried_until_success() {
    let executor = RetryExecutor::new(fast_policy(5), Arc::new(NoopMetrics));
    let mut calls = 0;
    let outcome = executor.execute(OperationType::Insert, |attempt| {
        calls += 1;
        if attempt < 3 {
            Err(StorageError::Busy("locked".to_string()))
        } else {
            Ok(42_u64)
        }
    });
    assert_eq!(outcome.unwrap(), 42);
    assert_eq!(calls, 3);
}

#[test]
fn attempts_never_exceed_the_policy_cap() {
    let executor = RetryExecutor::new(fast_policy(3), Arc::new(NoopMetrics));
    let mut calls = 0;
    let outcome: Result<(), _> = executor.execute(OperationType::Insert, |_| {
        calls += 1;
        Err(StorageError::Timeout("slow".to_string()))
    });
    let exhausted = outcome.unwrap_err();
    assert_eq!(calls, 3);
    assert_eq!(exhausted.attempts, 3);
    assert_eq!(exhausted.last_error, StorageError::Timeout("slow".to_string()));
}

#[test]
fn non_retryable_failure_propagates_after_one_attempt() {
    let executor = RetryExecutor::new(fast_policy(10), Arc::new(NoopMetrics));
    let mut calls = 0;
    let outcome: Result<(), _> = executor.execute(OperationType::Delete, |_| {
        calls += 1;
        Err(StorageError::Constraint("duplicate key".to_string()))
    });
    let exhausted = outcome.unwrap_err();
    assert_eq!(calls, 1);
    assert_eq!(exhausted.attempts, 1);
}

#[test]
fn backoff_schedule_is_capped_exponential() {
    let policy = RetryPolicy {
        max_attempts: 6,
        initial_delay_ms: 100,
        multiplier: 2.0,
        max_delay_ms: 500,
    };
    assert_eq!(policy.delay_for_attempt(1), 100);
    assert_eq!(policy.delay_for_attempt(2), 200);
    assert_eq!(policy.delay_for_attempt(3), 400);
    assert_eq!(policy.delay_for_attempt(4), 500);
    assert_eq!(policy.delay_for_attempt(5), 500);
}

#[test]
fn attempt_events_reach_the_metrics_sink() {
    let metrics = Arc::new(RecordingMetrics::default());
    let sink: Arc<dyn MetricsRecorder> = metrics.clone();
    let executor = RetryExecutor::new(fast_policy(3), sink);
    let _outcome: Result<(), _> = executor.execute(OperationType::Insert, |_| {
        Err(StorageError::Busy("locked".to_string()))
    });
    let events = metrics.attempts.lock().unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].attempt, 1);
    assert_eq!(events[0].delay_ms, 0);
    assert_eq!(events[2].attempt, 3);
    assert_eq!(events[2].max_attempts, 3);
}

#[test]
fn successful_first_attempt_needs_no_backoff() {
    let metrics = Arc::new(RecordingMetrics::default());
    let sink: Arc<dyn MetricsRecorder> = metrics.clone();
    let executor = RetryExecutor::new(fast_policy(3), sink);
    let outcome = executor.execute(OperationType::Insert, |_| Ok(1_u64));
    assert_eq!(outcome.unwrap(), 1);
    assert_eq!(metrics.attempts.lock().unwrap().len(), 1);
}
