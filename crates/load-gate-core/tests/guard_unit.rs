// crates/load-gate-core/tests/guard_unit.rs
// ============================================================================
// Module: Resource Guard Unit Tests
// Description: Concurrency ceiling, memory threshold, and leak-freedom.
// Purpose: Validate reserve/release pairing on every exit path.
// ============================================================================

//! ## Overview
//! Unit-level tests for resource-guard invariants:
//! - The concurrency ceiling is never overshot, even under racing reserves
//! - Memory threshold breach rejects before the counter is touched
//! - The active counter returns to zero for any mix of outcomes

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
use std::thread;

use load_gate_core::EngineError;
use load_gate_core::FixedProbe;
use load_gate_core::GuardConfig;
use load_gate_core::MemoryProbe;
use load_gate_core::ResourceGuard;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn guard_with_headroom(max_concurrent: u64) -> ResourceGuard {
    let probe: Arc<dyn MemoryProbe> = Arc::new(FixedProbe {
        used: 1_000,
        capacity: 1_000_000,
    });
    ResourceGuard::new(
        GuardConfig {
            max_memory_ratio: 0.9,
            max_concurrent,
        },
        probe,
    )
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn sixth_reservation_of_five_is_rejected() {
    let guard = guard_with_headroom(5);
    let mut held = Vec::new();
    for _ in 0 .. 5 {
        held.push(guard.reserve().unwrap());
    }
    let rejected = guard.reserve();
    match rejected {
        Err(EngineError::ResourceExhausted {
            active,
            limit,
            ..
        }) => {
            assert_eq!(active, 5);
            assert_eq!(limit, 5);
        }
        other => panic!("expected resource exhaustion, got {other:?}"),
    }
    drop(held);
    assert_eq!(guard.active_count(), 0);
}

#[test]
fn memory_threshold_breach_rejects_without_reserving() {
    let probe: Arc<dyn MemoryProbe> = Arc::new(FixedProbe {
        used: 950_000,
        capacity: 1_000_000,
    });
    let guard = ResourceGuard::new(
        GuardConfig {
            max_memory_ratio: 0.9,
            max_concurrent: 5,
        },
        probe,
    );
    assert!(guard.reserve().is_err());
    assert_eq!(guard.active_count(), 0);
}

#[test]
fn release_happens_on_drop_even_inside_error_paths() {
    let guard = guard_with_headroom(2);
    let attempt: Result<(), &str> = (|| {
        let _reservation = guard.reserve().map_err(|_| "reserve")?;
        Err("downstream failure")
    })();
    assert!(attempt.is_err());
    assert_eq!(guard.active_count(), 0);
}

#[test]
fn counter_returns_to_zero_across_threads() {
    let guard = Arc::new(guard_with_headroom(4));
    let mut handles = Vec::new();
    for worker in 0 .. 16 {
        let guard = Arc::clone(&guard);
        handles.push(thread::spawn(move || {
            for _ in 0 .. 50 {
                if let Ok(reservation) = guard.reserve() {
                    // Half the workers simulate failing work.
                    if worker % 2 == 0 {
                        drop(reservation);
                    }
                }
                thread::yield_now();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(guard.active_count(), 0);
}

#[test]
fn ceiling_is_never_overshot_under_racing_reserves() {
    let guard = Arc::new(guard_with_headroom(3));
    let mut handles = Vec::new();
    for _ in 0 .. 12 {
        let guard = Arc::clone(&guard);
        handles.push(thread::spawn(move || guard.reserve().ok()));
    }
    let held: Vec<_> = handles.into_iter().filter_map(|handle| handle.join().unwrap()).collect();
    assert!(held.len() <= 3);
    assert_eq!(guard.active_count(), u64::try_from(held.len()).unwrap());
    drop(held);
    assert_eq!(guard.active_count(), 0);
}
