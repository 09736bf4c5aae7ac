// crates/load-gate-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for engine wiring and JSON rendering in the CLI.
// Purpose: Ensure rendered output is machine-readable and wiring runs.
// Dependencies: load-gate-cli main helpers
// ============================================================================

//! ## Overview
//! Validates the CLI helper layer: result/failure rendering produces stable
//! JSON fields and `build_engine` assembles a working engine from config.

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
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use load_gate_config::LoadGateConfig;
use load_gate_core::ClientId;
use load_gate_core::EngineError;
use load_gate_core::OperationFailure;
use load_gate_core::OperationId;
use tempfile::TempDir;

use super::build_engine;
use super::render_failure;
use super::render_result;

/// Builds a config whose store lives in a fresh temp directory.
fn config_in(dir: &TempDir) -> LoadGateConfig {
    let mut config = LoadGateConfig::default();
    config.store.path = dir.path().join("cli.db");
    config
}

#[test]
fn failure_rendering_exposes_stable_fields() {
    let failure = OperationFailure::new(
        OperationId::generate(),
        EngineError::RateLimited {
            retry_after_ms: 250,
        },
    );
    let rendered = render_failure(&failure).unwrap();
    let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
    assert_eq!(value["error"], "rate_limit_exceeded");
    assert!(value["operation_id"].as_str().unwrap().starts_with("op-"));
    assert!(value["message"].as_str().unwrap().contains("250"));
}

#[test]
fn engine_built_from_config_runs_an_insert() {
    let dir = TempDir::new().unwrap();
    let engine = build_engine(&config_in(&dir)).unwrap();
    let result = engine.run_insert(&ClientId::new("test"), 20, 5).unwrap();
    assert_eq!(result.records_processed, 20);
    assert_eq!(result.total_batches, 4);
    let rendered = render_result(&result).unwrap();
    let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
    assert_eq!(value["records_processed"], 20);
    assert_eq!(value["status"], "success");
}
