// crates/load-gate-core/tests/admission_unit.rs
// ============================================================================
// Module: Admission Controller Unit Tests
// Description: Keyed bucket behavior, tier interplay, concurrency, pruning.
// Purpose: Validate no-double-spend and per-class isolation under load.
// ============================================================================

//! ## Overview
//! Unit-level tests for admission-control invariants:
//! - Lazy entry creation and per-class bucket independence
//! - Sustained + burst interplay with refund on partial denial
//! - No double-spend when many threads race one key
//! - Idle-TTL pruning bounds map growth

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
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::thread;

use load_gate_core::AdmissionController;
use load_gate_core::AdmissionPolicy;
use load_gate_core::BucketConfig;
use load_gate_core::ClientId;
use load_gate_core::Clock;
use load_gate_core::EndpointClass;
use load_gate_core::ManualClock;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn small_policy() -> AdmissionPolicy {
    AdmissionPolicy {
        general_sustained: BucketConfig {
            capacity: 10,
            refill_per_interval: 10,
            interval_ms: 60_000,
        },
        general_burst: BucketConfig {
            capacity: 3,
            refill_per_interval: 3,
            interval_ms: 10_000,
        },
        heavy_hourly: BucketConfig {
            capacity: 2,
            refill_per_interval: 2,
            interval_ms: 3_600_000,
        },
    }
}

fn controller(policy: AdmissionPolicy) -> (Arc<AdmissionController>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::starting_at(0));
    let clock_handle: Arc<dyn Clock> = clock.clone();
    let controller = Arc::new(AdmissionController::new(policy, clock_handle));
    (controller, clock)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn entries_are_created_lazily() {
    let (controller, _clock) = controller(small_policy());
    assert_eq!(controller.tracked_clients(), 0);
    controller.allow(&ClientId::new("a"), EndpointClass::General);
    controller.allow(&ClientId::new("b"), EndpointClass::Heavy);
    assert_eq!(controller.tracked_clients(), 2);
}

#[test]
fn heavy_quota_is_independent_of_general_buckets() {
    let (controller, _clock) = controller(small_policy());
    let client = ClientId::new("worker");
    // Exhaust the heavy quota.
    assert!(controller.allow(&client, EndpointClass::Heavy).permitted);
    assert!(controller.allow(&client, EndpointClass::Heavy).permitted);
    assert!(!controller.allow(&client, EndpointClass::Heavy).permitted);
    // General requests are unaffected.
    assert!(controller.allow(&client, EndpointClass::General).permitted);
}

#[test]
fn burst_denial_refunds_the_sustained_token() {
    // Sustained: 4 tokens, negligible refill. Burst: 3 tokens per 10 seconds.
    // The fourth immediate call is denied by the burst tier only; without the
    // refund it would also consume the last sustained token.
    let policy = AdmissionPolicy {
        general_sustained: BucketConfig {
            capacity: 4,
            refill_per_interval: 1,
            interval_ms: 3_600_000,
        },
        general_burst: BucketConfig {
            capacity: 3,
            refill_per_interval: 3,
            interval_ms: 10_000,
        },
        heavy_hourly: BucketConfig {
            capacity: 2,
            refill_per_interval: 2,
            interval_ms: 3_600_000,
        },
    };
    let (controller, clock) = controller(policy);
    let client = ClientId::new("bursty");
    for _ in 0 .. 3 {
        assert!(controller.allow(&client, EndpointClass::General).permitted);
    }
    let denied = controller.allow(&client, EndpointClass::General);
    assert!(!denied.permitted);
    assert!(denied.retry_after_ms > 0);
    // Once the burst window refills, the refunded sustained token is grantable.
    clock.advance_ms(10_000);
    assert!(controller.allow(&client, EndpointClass::General).permitted);
    // And the sustained bucket is now empty, so the next call is denied.
    assert!(!controller.allow(&client, EndpointClass::General).permitted);
}

#[test]
fn denied_heavy_request_reports_positive_retry_after() {
    let (controller, _clock) = controller(small_policy());
    let client = ClientId::new("heavy");
    controller.allow(&client, EndpointClass::Heavy);
    controller.allow(&client, EndpointClass::Heavy);
    let denied = controller.allow(&client, EndpointClass::Heavy);
    assert!(!denied.permitted);
    assert!(denied.retry_after_ms > 0);
}

#[test]
fn concurrent_callers_never_double_spend() {
    // K threads race a heavy bucket holding C tokens; at most C may win.
    let mut policy = small_policy();
    policy.heavy_hourly = BucketConfig {
        capacity: 7,
        refill_per_interval: 1,
        interval_ms: 3_600_000,
    };
    let (controller, _clock) = controller(policy);
    let client = ClientId::new("contended");
    let permitted = Arc::new(AtomicU64::new(0));
    let mut handles = Vec::new();
    for _ in 0 .. 32 {
        let controller = Arc::clone(&controller);
        let client = client.clone();
        let permitted = Arc::clone(&permitted);
        handles.push(thread::spawn(move || {
            if controller.allow(&client, EndpointClass::Heavy).permitted {
                permitted.fetch_add(1, Ordering::SeqCst);
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(permitted.load(Ordering::SeqCst), 7);
}

#[test]
fn distinct_clients_do_not_share_buckets() {
    let (controller, _clock) = controller(small_policy());
    let first = ClientId::new("first");
    let second = ClientId::new("second");
    controller.allow(&first, EndpointClass::Heavy);
    controller.allow(&first, EndpointClass::Heavy);
    assert!(!controller.allow(&first, EndpointClass::Heavy).permitted);
    assert!(controller.allow(&second, EndpointClass::Heavy).permitted);
}

#[test]
fn controller_state_is_debug_renderable() {
    // The controller holds its clock as a trait object; keep it printable
    // for diagnostics.
    let (controller, _clock) = controller(small_policy());
    controller.allow(&ClientId::new("visible"), EndpointClass::General);
    let rendered = format!("{controller:?}");
    assert!(rendered.contains("AdmissionController"));
}

#[test]
fn prune_idle_evicts_stale_entries_only() {
    let (controller, clock) = controller(small_policy());
    controller.allow(&ClientId::new("stale"), EndpointClass::General);
    clock.advance_ms(5_000);
    controller.allow(&ClientId::new("fresh"), EndpointClass::General);
    let removed = controller.prune_idle(5_000);
    assert_eq!(removed, 1);
    assert_eq!(controller.tracked_clients(), 1);
}
