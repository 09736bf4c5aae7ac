//! Config load validation tests for load-gate-config.
// crates/load-gate-config/tests/load_validation.rs
// =============================================================================
// Module: Config Load Validation Tests
// Description: Validate config loading guards (path, size, encoding).
// Purpose: Ensure config input handling is strict and fail-closed.
// =============================================================================

use std::io::Write;
use std::path::Path;

use load_gate_config::ConfigError;
use load_gate_config::LoadGateConfig;
use tempfile::NamedTempFile;

type TestResult = Result<(), String>;

/// Assert that a config load result is an error containing a specific substring.
fn assert_invalid(result: Result<LoadGateConfig, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config load".to_string()),
    }
}

#[test]
fn load_rejects_path_too_long() -> TestResult {
    let long_path = "a".repeat(5_000);
    let path = Path::new(&long_path);
    assert_invalid(LoadGateConfig::load(Some(path)), "config path exceeds max length")?;
    Ok(())
}

#[test]
fn load_rejects_path_component_too_long() -> TestResult {
    let long_component = "a".repeat(300);
    let path = Path::new(&long_component);
    assert_invalid(LoadGateConfig::load(Some(path)), "config path component too long")?;
    Ok(())
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    let payload = vec![b'a'; 1_048_577];
    file.write_all(&payload).map_err(|err| err.to_string())?;
    assert_invalid(LoadGateConfig::load(Some(file.path())), "config file exceeds size limit")?;
    Ok(())
}

#[test]
fn load_rejects_non_utf8_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(&[0xFF, 0xFE, 0xFF]).map_err(|err| err.to_string())?;
    assert_invalid(LoadGateConfig::load(Some(file.path())), "config file must be utf-8")?;
    Ok(())
}

#[test]
fn load_rejects_malformed_toml() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(b"[admission\ncapacity = ").map_err(|err| err.to_string())?;
    assert_invalid(LoadGateConfig::load(Some(file.path())), "config parse error")?;
    Ok(())
}

#[test]
fn load_without_path_yields_valid_defaults() -> TestResult {
    let config = LoadGateConfig::load(None).map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())?;
    if config.limits.max_total_records != 100_000 {
        return Err("unexpected default max_total_records".to_string());
    }
    if config.limits.max_batch_size != 10_000 {
        return Err("unexpected default max_batch_size".to_string());
    }
    Ok(())
}

#[test]
fn load_accepts_partial_file_with_defaults() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(b"[retry]\nmax_attempts = 5\n").map_err(|err| err.to_string())?;
    let config = LoadGateConfig::load(Some(file.path())).map_err(|err| err.to_string())?;
    if config.retry.max_attempts != 5 {
        return Err("retry.max_attempts not applied".to_string());
    }
    if config.limits.delete_chunk_timeout_ms != 30_000 {
        return Err("delete timeout default missing".to_string());
    }
    Ok(())
}

#[test]
fn load_applies_nested_admission_tables() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    let body = b"[admission.heavy_hourly]\n\
                 capacity = 3\n\
                 refill_per_interval = 3\n\
                 interval_ms = 3600000\n";
    file.write_all(body).map_err(|err| err.to_string())?;
    let config = LoadGateConfig::load(Some(file.path())).map_err(|err| err.to_string())?;
    if config.admission.heavy_hourly.capacity != 3 {
        return Err("heavy_hourly.capacity not applied".to_string());
    }
    if config.admission.general_sustained.capacity != 100 {
        return Err("general_sustained default missing".to_string());
    }
    Ok(())
}
