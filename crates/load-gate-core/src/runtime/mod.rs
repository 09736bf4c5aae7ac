// crates/load-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Load Gate Runtime
// Description: Admission, resource guarding, retry, and batch execution.
// Purpose: Own the shared mutable state and the per-request state machine.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The runtime holds the only shared mutable state in the crate: the sharded
//! admission bucket map and the active-operation counter. Both are updated
//! under per-entry exclusivity; a read-then-write without it is exactly the
//! double-spend and counter-leak bug class this design rules out.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod admission;
pub mod bucket;
pub mod engine;
pub mod guard;
pub mod retry;
