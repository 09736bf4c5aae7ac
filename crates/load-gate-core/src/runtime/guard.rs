// crates/load-gate-core/src/runtime/guard.rs
// ============================================================================
// Module: Resource Guard
// Description: Memory headroom and concurrency ceiling checks for heavy work.
// Purpose: Bound how many heavy operations run at once; never leak the counter.
// Dependencies: crate::core, crate::interfaces, serde
// ============================================================================

//! ## Overview
//! The guard admits a heavy operation only when host memory headroom and the
//! active-operation ceiling allow it. Reservation uses a compare-and-swap
//! loop so concurrent reserves never overshoot the ceiling, and the returned
//! [`Reservation`] decrements the counter in `Drop`, exactly once, on every
//! exit path including failures. A leaked counter would permanently starve
//! future operations, so release is never left to caller discipline.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use serde::Deserialize;
use serde::Serialize;

use crate::core::errors::EngineError;
use crate::interfaces::MemoryProbe;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Ceilings enforced by the resource guard.
///
/// # Invariants
/// - `max_memory_ratio` is within `(0.0, 1.0]`.
/// - `max_concurrent` is greater than zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Maximum used/capacity memory ratio before rejection.
    pub max_memory_ratio: f64,
    /// Maximum concurrently reserved heavy operations.
    pub max_concurrent: u64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            max_memory_ratio: 0.9,
            max_concurrent: 5,
        }
    }
}

// ============================================================================
// SECTION: Reservation
// ============================================================================

/// Scoped reservation token returned by a successful reserve.
///
/// # Invariants
/// - The active counter is decremented exactly once, in `Drop`.
#[derive(Debug)]
pub struct Reservation {
    /// Shared active-operation counter.
    active: Arc<AtomicU64>,
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
    }
}

// ============================================================================
// SECTION: Resource Guard
// ============================================================================

/// Guard enforcing memory and concurrent-operation ceilings.
///
/// # Invariants
/// - `active_count` never exceeds `config.max_concurrent`.
/// - The counter returns to zero once all reservations are dropped.
pub struct ResourceGuard {
    /// Ceiling configuration.
    config: GuardConfig,
    /// Active heavy-operation counter.
    active: Arc<AtomicU64>,
    /// Host memory probe.
    probe: Arc<dyn MemoryProbe>,
}

impl ResourceGuard {
    /// Creates a guard with the given ceilings and memory probe.
    #[must_use]
    pub fn new(config: GuardConfig, probe: Arc<dyn MemoryProbe>) -> Self {
        Self {
            config,
            active: Arc::new(AtomicU64::new(0)),
            probe,
        }
    }

    /// Attempts to reserve capacity for one heavy operation.
    ///
    /// The memory check is skipped when the probe cannot report usage or
    /// capacity; the concurrency ceiling always applies.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ResourceExhausted`] when the memory ratio or
    /// the concurrency ceiling is breached.
    pub fn reserve(&self) -> Result<Reservation, EngineError> {
        if let (Some(used), Some(capacity)) =
            (self.probe.used_bytes(), self.probe.capacity_bytes())
            && capacity > 0
        {
            #[allow(
                clippy::cast_precision_loss,
                reason = "byte counts are compared as ratios; precision loss is immaterial"
            )]
            let ratio = used as f64 / capacity as f64;
            if ratio > self.config.max_memory_ratio {
                return Err(EngineError::ResourceExhausted {
                    active: self.active.load(Ordering::Acquire),
                    limit: self.config.max_concurrent,
                    reason: format!(
                        "memory ratio {ratio:.2} exceeds threshold {threshold:.2}",
                        threshold = self.config.max_memory_ratio
                    ),
                });
            }
        }
        let ceiling = self.config.max_concurrent;
        let reserved = self.active.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
            if current >= ceiling {
                None
            } else {
                Some(current + 1)
            }
        });
        match reserved {
            Ok(_) => Ok(Reservation {
                active: Arc::clone(&self.active),
            }),
            Err(current) => Err(EngineError::ResourceExhausted {
                active: current,
                limit: ceiling,
                reason: "concurrent operation ceiling reached".to_string(),
            }),
        }
    }

    /// Returns the current active-operation count.
    #[must_use]
    pub fn active_count(&self) -> u64 {
        self.active.load(Ordering::Acquire)
    }
}
