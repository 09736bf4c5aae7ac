// crates/load-gate-core/src/runtime/admission.rs
// ============================================================================
// Module: Admission Controller
// Description: Keyed token buckets deciding allow/deny per client and class.
// Purpose: Serialize per-key bucket updates without a global lock.
// Dependencies: crate::core, crate::runtime::bucket, serde
// ============================================================================

//! ## Overview
//! The controller owns a sharded map of per-client bucket state. Each shard
//! holds its own mutex so unrelated clients do not contend; within one entry
//! the mutex serializes refill-and-deduct, which is the property that rules
//! out double-spend and lost refills under concurrency.
//!
//! GENERAL requests must pass a sustained bucket and a short-window burst
//! bucket; when the sustained bucket admits but the burst bucket denies, the
//! sustained token is refunded so the denial does not double-charge. HEAVY
//! requests consume from a single hourly quota bucket.
//!
//! Entries are created lazily on first use and evicted by [`AdmissionController::prune_idle`]
//! once idle past a TTL, bounding growth under many distinct client identities.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::hash::BuildHasher;
use std::hash::Hash;
use std::hash::Hasher;
use std::hash::RandomState;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ClientId;
use crate::core::identifiers::EndpointClass;
use crate::core::time::Clock;
use crate::runtime::bucket::BucketConfig;
use crate::runtime::bucket::TokenBucket;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Number of shards in the keyed bucket map.
const SHARD_COUNT: usize = 16;

/// Shard count as the modulus type used for shard selection.
const SHARD_COUNT_U64: u64 = 16;

/// Default idle TTL before a client entry is pruned, in milliseconds.
pub const DEFAULT_IDLE_TTL_MS: u64 = 60 * 60 * 1_000;

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Bucket shapes applied per endpoint class.
///
/// # Invariants
/// - All bucket configurations are well-formed (`BucketConfig::is_valid`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionPolicy {
    /// Sustained-rate bucket for GENERAL requests.
    pub general_sustained: BucketConfig,
    /// Short-window burst bucket for GENERAL requests.
    pub general_burst: BucketConfig,
    /// Hourly quota bucket for HEAVY requests.
    pub heavy_hourly: BucketConfig,
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self {
            // 100 requests/minute sustained.
            general_sustained: BucketConfig {
                capacity: 100,
                refill_per_interval: 100,
                interval_ms: 60_000,
            },
            // 20 requests in any 10-second window.
            general_burst: BucketConfig {
                capacity: 20,
                refill_per_interval: 20,
                interval_ms: 10_000,
            },
            // 10 performance operations/hour.
            heavy_hourly: BucketConfig {
                capacity: 10,
                refill_per_interval: 10,
                interval_ms: 3_600_000,
            },
        }
    }
}

// ============================================================================
// SECTION: Decision
// ============================================================================

/// Outcome of an admission check.
///
/// # Invariants
/// - `retry_after_ms` is zero exactly when `permitted` is true.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdmissionDecision {
    /// Whether the request may proceed.
    pub permitted: bool,
    /// Tokens remaining in the deciding bucket after the attempt.
    pub remaining_tokens: f64,
    /// Suggested wait before retrying, in milliseconds.
    pub retry_after_ms: u64,
}

// ============================================================================
// SECTION: Client Entry
// ============================================================================

/// Lazily created bucket state for one client identity.
///
/// Both classes live under the same mutex entry so a GENERAL check can refund
/// the sustained token atomically when the burst bucket denies.
#[derive(Debug)]
struct ClientEntry {
    /// Sustained-rate bucket for GENERAL requests.
    general_sustained: TokenBucket,
    /// Short-window burst bucket for GENERAL requests.
    general_burst: TokenBucket,
    /// Hourly quota bucket for HEAVY requests.
    heavy_hourly: TokenBucket,
    /// Monotonic milliseconds of the most recent check.
    last_seen_ms: u64,
}

impl ClientEntry {
    /// Creates full buckets for a first-seen client.
    fn new(policy: &AdmissionPolicy, now_ms: u64) -> Self {
        Self {
            general_sustained: TokenBucket::new(policy.general_sustained, now_ms),
            general_burst: TokenBucket::new(policy.general_burst, now_ms),
            heavy_hourly: TokenBucket::new(policy.heavy_hourly, now_ms),
            last_seen_ms: now_ms,
        }
    }
}

// ============================================================================
// SECTION: Admission Controller
// ============================================================================

/// Keyed admission controller with sharded per-client bucket state.
///
/// # Invariants
/// - A bucket for a given key is only mutated under its shard mutex.
/// - Concurrent `allow` calls for one key never double-spend a token.
#[derive(Debug)]
pub struct AdmissionController {
    /// Bucket shapes per endpoint class.
    policy: AdmissionPolicy,
    /// Sharded client entry map; shard chosen by client identity hash.
    shards: Vec<Mutex<HashMap<ClientId, ClientEntry>>>,
    /// Shared hasher state for shard selection.
    hasher: RandomState,
    /// Time source for refill arithmetic.
    clock: Arc<dyn Clock>,
}

impl AdmissionController {
    /// Creates a controller with the given policy and clock.
    #[must_use]
    pub fn new(policy: AdmissionPolicy, clock: Arc<dyn Clock>) -> Self {
        let shards = (0 .. SHARD_COUNT).map(|_| Mutex::new(HashMap::new())).collect();
        Self {
            policy,
            shards,
            hasher: RandomState::new(),
            clock,
        }
    }

    /// Decides whether a request from `client` under `class` may run.
    ///
    /// GENERAL requests must pass both the sustained and burst buckets; HEAVY
    /// requests consume from the hourly quota bucket. A sustained denial is
    /// returned as-is; a burst denial refunds the sustained token first.
    pub fn allow(&self, client: &ClientId, class: EndpointClass) -> AdmissionDecision {
        let now_ms = self.clock.monotonic_ms();
        let mut entries = self.shard_for(client).lock().unwrap_or_else(PoisonError::into_inner);
        let entry = entries
            .entry(client.clone())
            .or_insert_with(|| ClientEntry::new(&self.policy, now_ms));
        entry.last_seen_ms = now_ms;
        match class {
            EndpointClass::Heavy => {
                let decision = entry.heavy_hourly.try_acquire(now_ms);
                AdmissionDecision {
                    permitted: decision.permitted,
                    remaining_tokens: decision.remaining_tokens,
                    retry_after_ms: decision.retry_after_ms,
                }
            }
            EndpointClass::General => {
                let sustained = entry.general_sustained.try_acquire(now_ms);
                if !sustained.permitted {
                    return AdmissionDecision {
                        permitted: false,
                        remaining_tokens: sustained.remaining_tokens,
                        retry_after_ms: sustained.retry_after_ms,
                    };
                }
                let burst = entry.general_burst.try_acquire(now_ms);
                if !burst.permitted {
                    entry.general_sustained.refund_one();
                    return AdmissionDecision {
                        permitted: false,
                        remaining_tokens: burst.remaining_tokens,
                        retry_after_ms: burst.retry_after_ms,
                    };
                }
                AdmissionDecision {
                    permitted: true,
                    remaining_tokens: sustained.remaining_tokens.min(burst.remaining_tokens),
                    retry_after_ms: 0,
                }
            }
        }
    }

    /// Evicts entries idle longer than `idle_ttl_ms`, returning the count removed.
    ///
    /// Hosts call this periodically; the sweep takes each shard mutex in turn
    /// and never blocks checks on other shards.
    pub fn prune_idle(&self, idle_ttl_ms: u64) -> usize {
        let now_ms = self.clock.monotonic_ms();
        let mut removed = 0;
        for shard in &self.shards {
            let mut entries = shard.lock().unwrap_or_else(PoisonError::into_inner);
            let before = entries.len();
            entries.retain(|_, entry| now_ms.saturating_sub(entry.last_seen_ms) < idle_ttl_ms);
            removed += before - entries.len();
        }
        removed
    }

    /// Returns the number of tracked client entries across all shards.
    #[must_use]
    pub fn tracked_clients(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.lock().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }

    /// Selects the shard for a client identity.
    fn shard_for(&self, client: &ClientId) -> &Mutex<HashMap<ClientId, ClientEntry>> {
        let mut hasher = self.hasher.build_hasher();
        client.hash(&mut hasher);
        let index = usize::try_from(hasher.finish() % SHARD_COUNT_U64).unwrap_or(0);
        &self.shards[index]
    }
}
