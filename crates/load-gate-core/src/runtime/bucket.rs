// crates/load-gate-core/src/runtime/bucket.rs
// ============================================================================
// Module: Token Bucket
// Description: Continuously refilling permit counter for admission control.
// Purpose: Arithmetic primitive behind every rate-limit decision.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`TokenBucket`] holds a capped, continuously refilling count of permits.
//! Refill is proportional to elapsed milliseconds; tokens never exceed
//! capacity and never go negative. The bucket itself performs no locking:
//! callers serialize access per key (see the admission controller).

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Bucket Configuration
// ============================================================================

/// Shape of one token bucket.
///
/// # Invariants
/// - `capacity`, `refill_per_interval`, and `interval_ms` are greater than zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketConfig {
    /// Maximum tokens the bucket can hold.
    pub capacity: u64,
    /// Tokens replenished per full interval.
    pub refill_per_interval: u64,
    /// Refill interval length in milliseconds.
    pub interval_ms: u64,
}

impl BucketConfig {
    /// Returns whether the configuration is well-formed.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.capacity > 0 && self.refill_per_interval > 0 && self.interval_ms > 0
    }
}

// ============================================================================
// SECTION: Acquire Outcome
// ============================================================================

/// Outcome of one acquisition attempt.
///
/// # Invariants
/// - `retry_after_ms` is zero exactly when `permitted` is true.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketDecision {
    /// Whether a token was deducted.
    pub permitted: bool,
    /// Tokens remaining after the attempt.
    pub remaining_tokens: f64,
    /// Suggested wait until a token becomes available, in milliseconds.
    pub retry_after_ms: u64,
}

// ============================================================================
// SECTION: Token Bucket
// ============================================================================

/// Per-key permit counter with capacity, refill rate, and burst cap.
///
/// # Invariants
/// - `0.0 <= tokens <= capacity` holds after every operation.
/// - `last_refill_at_ms` never moves backward.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    /// Bucket shape.
    config: BucketConfig,
    /// Current token count.
    tokens: f64,
    /// Monotonic milliseconds of the last refill.
    last_refill_at_ms: u64,
}

impl TokenBucket {
    /// Creates a full bucket anchored at the given monotonic time.
    #[must_use]
    pub fn new(config: BucketConfig, now_ms: u64) -> Self {
        #[allow(
            clippy::cast_precision_loss,
            reason = "capacities are far below the f64 mantissa range"
        )]
        let tokens = config.capacity as f64;
        Self {
            config,
            tokens,
            last_refill_at_ms: now_ms,
        }
    }

    /// Returns the current token count without refilling.
    #[must_use]
    pub const fn tokens(&self) -> f64 {
        self.tokens
    }

    /// Returns the bucket configuration.
    #[must_use]
    pub const fn config(&self) -> &BucketConfig {
        &self.config
    }

    /// Returns the monotonic milliseconds of the last refill.
    #[must_use]
    pub const fn last_refill_at_ms(&self) -> u64 {
        self.last_refill_at_ms
    }

    /// Replenishes tokens for the elapsed time and advances the refill anchor.
    ///
    /// Elapsed time is measured against the caller-supplied monotonic clock;
    /// a stale `now_ms` (before the anchor) refills nothing.
    pub fn refill(&mut self, now_ms: u64) {
        let elapsed_ms = now_ms.saturating_sub(self.last_refill_at_ms);
        if elapsed_ms == 0 {
            return;
        }
        #[allow(
            clippy::cast_precision_loss,
            reason = "rates and elapsed times are far below the f64 mantissa range"
        )]
        let replenished = elapsed_ms as f64 / self.config.interval_ms as f64
            * self.config.refill_per_interval as f64;
        #[allow(
            clippy::cast_precision_loss,
            reason = "capacities are far below the f64 mantissa range"
        )]
        let capacity = self.config.capacity as f64;
        self.tokens = (self.tokens + replenished).min(capacity);
        self.last_refill_at_ms = now_ms;
    }

    /// Refills, then attempts to deduct one token.
    pub fn try_acquire(&mut self, now_ms: u64) -> BucketDecision {
        self.refill(now_ms);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            return BucketDecision {
                permitted: true,
                remaining_tokens: self.tokens,
                retry_after_ms: 0,
            };
        }
        BucketDecision {
            permitted: false,
            remaining_tokens: self.tokens,
            retry_after_ms: self.wait_for_one_token_ms(),
        }
    }

    /// Returns one previously deducted token to the bucket.
    ///
    /// Used when a paired bucket denied the request after this bucket already
    /// charged it; the refund never exceeds capacity.
    pub fn refund_one(&mut self) {
        #[allow(
            clippy::cast_precision_loss,
            reason = "capacities are far below the f64 mantissa range"
        )]
        let capacity = self.config.capacity as f64;
        self.tokens = (self.tokens + 1.0).min(capacity);
    }

    /// Computes the wait until one full token is available, in milliseconds.
    fn wait_for_one_token_ms(&self) -> u64 {
        let deficit = 1.0 - self.tokens;
        if deficit <= 0.0 {
            return 0;
        }
        #[allow(
            clippy::cast_precision_loss,
            reason = "rates and intervals are far below the f64 mantissa range"
        )]
        let per_ms = self.config.refill_per_interval as f64 / self.config.interval_ms as f64;
        let wait_ms = (deficit / per_ms).ceil();
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "wait is ceiled, non-negative, and bounded by interval arithmetic"
        )]
        let wait_ms = if wait_ms.is_finite() && wait_ms >= 0.0 {
            wait_ms as u64
        } else {
            u64::MAX
        };
        wait_ms.max(1)
    }
}
