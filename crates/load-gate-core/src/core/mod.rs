// crates/load-gate-core/src/core/mod.rs
// ============================================================================
// Module: Load Gate Core Data Model
// Description: Requests, results, identifiers, errors, and the clock seam.
// Purpose: Own the immutable value types flowing through the engine.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Everything in this module is owned exclusively by the worker handling one
//! request and needs no synchronization. Shared mutable state lives in the
//! runtime module (bucket maps, the active-operation counter).

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod errors;
pub mod identifiers;
pub mod request;
pub mod result;
pub mod time;
