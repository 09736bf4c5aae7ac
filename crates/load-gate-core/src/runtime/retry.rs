// crates/load-gate-core/src/runtime/retry.rs
// ============================================================================
// Module: Retry Executor
// Description: Bounded exponential-backoff retry around one unit of work.
// Purpose: Make retry policy a first-class, testable value.
// Dependencies: crate::core, crate::interfaces, serde
// ============================================================================

//! ## Overview
//! [`RetryExecutor::execute`] runs a unit of work up to `max_attempts` times.
//! Only transient storage failures (busy, timeout) are retried; everything
//! else propagates after the first attempt. Backoff sleeps on the calling
//! worker thread and holds no lock or storage connection while sleeping.
//! Attempt events are emitted to the injected metrics sink, which is this
//! component's only coupling to observability.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::core::request::OperationType;
use crate::interfaces::MetricsRecorder;
use crate::interfaces::RetryMetricEvent;
use crate::interfaces::StorageError;

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Retry policy applied to each storage chunk.
///
/// # Invariants
/// - `max_attempts >= 1`; `multiplier >= 1.0`.
/// - `initial_delay_ms <= max_delay_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum unit-of-work invocations, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt, in milliseconds.
    pub initial_delay_ms: u64,
    /// Multiplier applied to the delay after each failed attempt.
    pub multiplier: f64,
    /// Ceiling on the backoff delay, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 100,
            multiplier: 2.0,
            max_delay_ms: 2_000,
        }
    }
}

impl RetryPolicy {
    /// Returns the backoff delay applied before retrying after `attempt`.
    ///
    /// The delay is `min(initial * multiplier^(attempt - 1), max)`; attempt 0
    /// and 1 both map to the initial delay.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        #[allow(
            clippy::cast_precision_loss,
            reason = "delay values are far below the f64 mantissa range"
        )]
        let mut delay = self.initial_delay_ms as f64;
        #[allow(
            clippy::cast_precision_loss,
            reason = "delay values are far below the f64 mantissa range"
        )]
        let ceiling = self.max_delay_ms as f64;
        for _ in 1 .. attempt {
            delay = (delay * self.multiplier).min(ceiling);
            if delay >= ceiling {
                break;
            }
        }
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "delay is clamped to max_delay_ms before conversion"
        )]
        let delay = delay.min(ceiling).max(0.0) as u64;
        delay
    }
}

// ============================================================================
// SECTION: Exhaustion
// ============================================================================

/// Failure returned when the unit of work did not succeed.
///
/// # Invariants
/// - `attempts` counts unit-of-work invocations, never exceeding the policy cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryExhausted {
    /// Last error observed.
    pub last_error: StorageError,
    /// Attempts consumed.
    pub attempts: u32,
}

// ============================================================================
// SECTION: Executor
// ============================================================================

/// Bounded retry wrapper around storage units of work.
///
/// # Invariants
/// - The unit of work is invoked at most `policy.max_attempts` times.
/// - Non-transient failures propagate after exactly one attempt.
pub struct RetryExecutor {
    /// Backoff policy.
    policy: RetryPolicy,
    /// Metrics sink for attempt events.
    metrics: Arc<dyn MetricsRecorder>,
}

impl RetryExecutor {
    /// Creates an executor with the given policy and metrics sink.
    #[must_use]
    pub fn new(policy: RetryPolicy, metrics: Arc<dyn MetricsRecorder>) -> Self {
        Self {
            policy,
            metrics,
        }
    }

    /// Returns the configured policy.
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs the unit of work with bounded retries.
    ///
    /// The closure receives the attempt ordinal starting at 1. Transient
    /// failures back off and retry; the final failure is wrapped with the
    /// attempt count.
    ///
    /// # Errors
    ///
    /// Returns [`RetryExhausted`] when every permitted attempt failed or the
    /// first non-transient failure occurred.
    pub fn execute<T>(
        &self,
        operation_type: OperationType,
        mut work: impl FnMut(u32) -> Result<T, StorageError>,
    ) -> Result<T, RetryExhausted> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let delay_ms = if attempt == 1 {
                0
            } else {
                self.policy.delay_for_attempt(attempt - 1)
            };
            self.metrics.retry_attempt(&RetryMetricEvent {
                operation_type,
                attempt,
                max_attempts,
                delay_ms,
            });
            match work(attempt) {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if !error.is_transient() || attempt >= max_attempts {
                        return Err(RetryExhausted {
                            last_error: error,
                            attempts: attempt,
                        });
                    }
                    // No lock or connection is held across this sleep.
                    thread::sleep(Duration::from_millis(self.policy.delay_for_attempt(attempt)));
                    attempt += 1;
                }
            }
        }
    }
}
