// crates/load-gate-core/src/core/identifiers.rs
// ============================================================================
// Module: Load Gate Identifiers
// Description: Typed identifiers for clients, operations, and endpoint classes.
// Purpose: Keep identity values distinct from free-form strings across the engine.
// Dependencies: rand, serde
// ============================================================================

//! ## Overview
//! Identifiers are thin newtypes so callers cannot accidentally swap a client
//! identity for an operation identifier. Operation identifiers are generated
//! from a boot-scoped random seed plus a monotonic counter, which keeps them
//! unique within a process without coordinating with external services.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::OnceLock;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use rand::RngCore;
use rand::rngs::OsRng;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Client Identity
// ============================================================================

/// Caller identity used to key admission-control buckets.
///
/// # Invariants
/// - Comparison and hashing use the raw string verbatim; no normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientId(String);

impl ClientId {
    /// Creates a client identity from a raw string.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the raw identity string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// SECTION: Endpoint Class
// ============================================================================

/// Admission class determining which rate-limit policy applies.
///
/// # Invariants
/// - Variants are stable for serialization and metric labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointClass {
    /// Ordinary endpoints with a sustained bucket plus a short burst bucket.
    General,
    /// Performance-test endpoints with a small hourly quota.
    Heavy,
}

impl EndpointClass {
    /// Returns a stable label for the class.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Heavy => "heavy",
        }
    }
}

// ============================================================================
// SECTION: Operation Identifier
// ============================================================================

/// Boot-scoped random seed shared by all generated operation identifiers.
static OPERATION_SEED: OnceLock<u64> = OnceLock::new();

/// Monotonic counter distinguishing operations within one boot.
static OPERATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique identifier assigned to each admitted operation request.
///
/// # Invariants
/// - Generated values are unique within one process boot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId(String);

impl OperationId {
    /// Generates a fresh operation identifier.
    #[must_use]
    pub fn generate() -> Self {
        let seed = *OPERATION_SEED.get_or_init(|| OsRng.next_u64());
        let count = OPERATION_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!("op-{seed:016x}-{count:08x}"))
    }

    /// Creates an operation identifier from a raw string.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the raw identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
