// crates/load-gate-core/src/core/time.rs
// ============================================================================
// Module: Load Gate Time Model
// Description: Clock abstraction for refill math, timeouts, and timestamps.
// Purpose: Keep token-bucket and duration arithmetic deterministic under test.
// Dependencies: std
// ============================================================================

//! ## Overview
//! The runtime never reads wall-clock time directly; every component that
//! needs elapsed time holds a [`Clock`] handle. [`SystemClock`] is the
//! production implementation; [`ManualClock`] lets tests advance time by
//! explicit amounts so refill and backoff math can be asserted exactly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Instant;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

// ============================================================================
// SECTION: Clock Trait
// ============================================================================

/// Time source used for refill arithmetic and duration accounting.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns monotonic milliseconds since an arbitrary process-local origin.
    fn monotonic_ms(&self) -> u64;

    /// Returns wall-clock unix epoch milliseconds.
    fn unix_ms(&self) -> i64;
}

// ============================================================================
// SECTION: System Clock
// ============================================================================

/// Production clock backed by [`Instant`] and [`SystemTime`].
///
/// # Invariants
/// - `monotonic_ms` never decreases between calls.
#[derive(Debug)]
pub struct SystemClock {
    /// Process-local monotonic origin.
    origin: Instant,
}

impl SystemClock {
    /// Creates a system clock with the current instant as origin.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn monotonic_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn unix_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .and_then(|elapsed| i64::try_from(elapsed.as_millis()).ok())
            .unwrap_or(0)
    }
}

// ============================================================================
// SECTION: Manual Clock
// ============================================================================

/// Deterministic clock advanced explicitly by tests.
///
/// # Invariants
/// - Time only moves forward via [`ManualClock::advance_ms`].
#[derive(Debug, Default)]
pub struct ManualClock {
    /// Current monotonic value in milliseconds.
    now_ms: AtomicU64,
}

impl ManualClock {
    /// Creates a manual clock starting at the given millisecond value.
    #[must_use]
    pub fn starting_at(now_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(now_ms),
        }
    }

    /// Advances the clock by the given number of milliseconds.
    pub fn advance_ms(&self, delta: u64) {
        self.now_ms.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn monotonic_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    fn unix_ms(&self) -> i64 {
        i64::try_from(self.now_ms.load(Ordering::SeqCst)).unwrap_or(i64::MAX)
    }
}
