// crates/load-gate-core/tests/proptest_engine.rs
// ============================================================================
// Module: Request and Bucket Property-Based Tests
// Description: Property tests for batch arithmetic and token bucket bounds.
// Purpose: Detect panics and invariant breaks across wide input ranges.
// ============================================================================

//! Property-based tests for batch math and token bucket invariants.

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
    clippy::cast_precision_loss,
    reason = "Test-only assertions and helpers are permitted."
)]

use load_gate_core::BucketConfig;
use load_gate_core::OperationRequest;
use load_gate_core::OperationType;
use load_gate_core::RequestLimits;
use load_gate_core::TokenBucket;
use proptest::prelude::*;

/// Limits wide enough that generated requests always validate.
fn open_limits() -> RequestLimits {
    RequestLimits {
        max_total_records: u64::MAX,
        max_batch_size: u64::MAX,
    }
}

/// Strategy producing a valid `(total_records, batch_size)` pair.
fn request_shape() -> impl Strategy<Value = (u64, u64)> {
    (1_u64 .. 1_000_000).prop_flat_map(|total| (Just(total), 1_u64 ..= total))
}

/// One step in a generated bucket workload.
#[derive(Debug, Clone, Copy)]
enum BucketStep {
    /// Advance the clock by the given milliseconds.
    Advance(u64),
    /// Attempt to deduct one token.
    Acquire,
    /// Return one token.
    Refund,
}

/// Strategy producing an arbitrary bucket workload.
fn bucket_steps() -> impl Strategy<Value = Vec<BucketStep>> {
    prop::collection::vec(
        prop_oneof![
            (0_u64 .. 100_000).prop_map(BucketStep::Advance),
            Just(BucketStep::Acquire),
            Just(BucketStep::Refund),
        ],
        0 .. 200,
    )
}

proptest! {
    #[test]
    fn batch_count_covers_exactly_the_requested_records((total, batch) in request_shape()) {
        let request =
            OperationRequest::new(OperationType::Insert, total, batch, &open_limits()).unwrap();
        let batches = request.total_batches();
        // Enough batches to cover every record.
        prop_assert!(batches.checked_mul(batch).is_none_or(|cover| cover >= total));
        if batch > 1 {
            // No batch is entirely empty.
            prop_assert!((batches - 1) * batch < total);
        } else {
            prop_assert_eq!(batches, total);
        }
    }

    #[test]
    fn clamping_never_raises_counts((total, batch) in request_shape(), available in 1_u64 .. 1_000_000) {
        let request =
            OperationRequest::new(OperationType::Delete, total, batch, &open_limits()).unwrap();
        let clamped = request.clamped_to(available);
        prop_assert!(clamped.total_records() <= request.total_records());
        prop_assert!(clamped.total_records() <= available);
        prop_assert!(clamped.batch_size() <= request.batch_size());
        prop_assert!(clamped.batch_size() <= clamped.total_records());
        // Clamping is idempotent.
        let again = clamped.clamped_to(available);
        prop_assert_eq!(again.total_records(), clamped.total_records());
        prop_assert_eq!(again.batch_size(), clamped.batch_size());
        // Batch arithmetic still covers the clamped working set.
        prop_assert!(clamped.total_batches() * clamped.batch_size() >= clamped.total_records());
    }

    #[test]
    fn bucket_tokens_stay_within_bounds(
        capacity in 1_u64 .. 1_000,
        refill in 1_u64 .. 1_000,
        interval_ms in 1_u64 .. 600_000,
        steps in bucket_steps(),
    ) {
        let config = BucketConfig {
            capacity,
            refill_per_interval: refill,
            interval_ms,
        };
        prop_assert!(config.is_valid());
        let mut bucket = TokenBucket::new(config, 0);
        let mut now_ms = 0_u64;
        let capacity_f = capacity as f64;
        for step in steps {
            match step {
                BucketStep::Advance(delta_ms) => {
                    now_ms = now_ms.saturating_add(delta_ms);
                    bucket.refill(now_ms);
                }
                BucketStep::Acquire => {
                    let decision = bucket.try_acquire(now_ms);
                    if decision.permitted {
                        prop_assert_eq!(decision.retry_after_ms, 0);
                    } else {
                        prop_assert!(decision.retry_after_ms >= 1);
                    }
                    prop_assert!(decision.remaining_tokens >= 0.0);
                    prop_assert!(decision.remaining_tokens <= capacity_f);
                }
                BucketStep::Refund => {
                    bucket.refund_one();
                }
            }
            prop_assert!(bucket.tokens() >= 0.0);
            prop_assert!(bucket.tokens() <= capacity_f);
        }
    }

    #[test]
    fn bucket_permits_never_exceed_supply(
        capacity in 1_u64 .. 100,
        attempts in 1_usize .. 400,
    ) {
        // With no elapsed time the bucket can only spend its initial fill.
        let config = BucketConfig {
            capacity,
            refill_per_interval: 1,
            interval_ms: 60_000,
        };
        let mut bucket = TokenBucket::new(config, 0);
        let mut permits = 0_u64;
        for _ in 0 .. attempts {
            if bucket.try_acquire(0).permitted {
                permits += 1;
            }
        }
        prop_assert!(permits <= capacity);
    }
}
