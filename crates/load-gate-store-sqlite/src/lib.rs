// crates/load-gate-store-sqlite/src/lib.rs
// ============================================================================
// Module: Load Gate SQLite Store
// Description: SQLite-backed StoragePort for throughput runs.
// Purpose: Crate entry point exposing the store and its configuration.
// Dependencies: load-gate-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! `SQLite` implementation of the [`load_gate_core::StoragePort`] abstraction.
//! Chunked inserts and deletes each commit in their own transaction so a
//! failed chunk never leaves partial rows behind.

/// `SQLite` store implementation.
pub mod store;

pub use crate::store::SqliteJournalMode;
pub use crate::store::SqliteStoragePort;
pub use crate::store::SqliteStoreConfig;
pub use crate::store::SqliteStoreError;
pub use crate::store::SqliteSyncMode;
