// crates/load-gate-config/src/lib.rs
// ============================================================================
// Module: Load Gate Configuration
// Description: Canonical TOML configuration model with fail-closed validation.
// Purpose: Single source of truth for runtime policy across all binaries.
// Dependencies: load-gate-core, load-gate-store-sqlite, serde, thiserror, toml
// ============================================================================

//! ## Overview
//! Configuration for the load gate runtime. A [`LoadGateConfig`] deserializes
//! from TOML with serde defaults for every section, then [`validate`]s before
//! any component is constructed. Loading fails closed: oversized files,
//! non-UTF-8 content, malformed TOML, and out-of-range values all reject the
//! whole config rather than silently correcting it.
//!
//! [`validate`]: LoadGateConfig::validate

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;

use load_gate_core::AdmissionPolicy;
use load_gate_core::EngineLimits;
use load_gate_core::GuardConfig;
use load_gate_core::RequestLimits;
use load_gate_core::RetryPolicy;
use load_gate_store_sqlite::SqliteStoreConfig;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum total config path length.
const MAX_CONFIG_PATH_LENGTH: usize = 4096;
/// Maximum length of a single config path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum config file size in bytes.
const MAX_CONFIG_BYTES: u64 = 1_048_576;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Filesystem failure while reading the config file.
    #[error("config io error: {0}")]
    Io(String),
    /// Config file content could not be parsed.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Config content parsed but failed validation.
    #[error("config invalid: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Limits Section
// ============================================================================

/// Flat `[limits]` section mapped onto [`EngineLimits`].
///
/// # Invariants
/// - All four fields are greater than zero after validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsSection {
    /// Maximum `total_records` accepted per request.
    #[serde(default = "default_max_total_records")]
    pub max_total_records: u64,
    /// Maximum `batch_size` accepted per request.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: u64,
    /// Per-chunk wall-clock ceiling for inserts, in milliseconds.
    #[serde(default = "default_insert_chunk_timeout_ms")]
    pub insert_chunk_timeout_ms: u64,
    /// Per-chunk wall-clock ceiling for deletes, in milliseconds.
    #[serde(default = "default_delete_chunk_timeout_ms")]
    pub delete_chunk_timeout_ms: u64,
}

impl Default for LimitsSection {
    fn default() -> Self {
        let limits = EngineLimits::default();
        Self {
            max_total_records: limits.request.max_total_records,
            max_batch_size: limits.request.max_batch_size,
            insert_chunk_timeout_ms: limits.insert_chunk_timeout_ms,
            delete_chunk_timeout_ms: limits.delete_chunk_timeout_ms,
        }
    }
}

/// Returns the default request record ceiling.
fn default_max_total_records() -> u64 {
    RequestLimits::default().max_total_records
}

/// Returns the default request batch ceiling.
fn default_max_batch_size() -> u64 {
    RequestLimits::default().max_batch_size
}

/// Returns the default insert chunk timeout.
fn default_insert_chunk_timeout_ms() -> u64 {
    EngineLimits::default().insert_chunk_timeout_ms
}

/// Returns the default delete chunk timeout.
fn default_delete_chunk_timeout_ms() -> u64 {
    EngineLimits::default().delete_chunk_timeout_ms
}

// ============================================================================
// SECTION: Config Model
// ============================================================================

/// Top-level configuration for the load gate runtime.
///
/// # Invariants
/// - A value that came through [`LoadGateConfig::load`] has passed
///   [`LoadGateConfig::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LoadGateConfig {
    /// Per-class rate limit bucket shapes.
    #[serde(default)]
    pub admission: AdmissionPolicy,
    /// Memory ratio and concurrency ceilings.
    #[serde(default)]
    pub resources: GuardConfig,
    /// Retry backoff policy for transient storage failures.
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Request maxima and chunk timeout ceilings.
    #[serde(default)]
    pub limits: LimitsSection,
    /// `SQLite` store settings.
    #[serde(default)]
    pub store: SqliteStoreConfig,
}

impl LoadGateConfig {
    /// Loads configuration from the given path, or defaults when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the path fails safety guards, the file
    /// cannot be read or parsed, or the parsed config fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            None => Self::default(),
            Some(path) => Self::load_from_path(path)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a config file, applying input guards first.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the path or content is rejected.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        validate_config_path(path)?;
        let metadata = fs::metadata(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if metadata.len() > MAX_CONFIG_BYTES {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        let text = String::from_utf8(bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(&text)
    }

    /// Parses config content from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the TOML is malformed.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Validates every section, naming the first offending field.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the rejected value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_admission(&self.admission)?;
        validate_resources(&self.resources)?;
        validate_retry(&self.retry)?;
        validate_limits(&self.limits)?;
        validate_store(&self.store)?;
        Ok(())
    }

    /// Returns the request validation maxima.
    #[must_use]
    pub const fn request_limits(&self) -> RequestLimits {
        RequestLimits {
            max_total_records: self.limits.max_total_records,
            max_batch_size: self.limits.max_batch_size,
        }
    }

    /// Returns the engine limits assembled from the `[limits]` section.
    #[must_use]
    pub const fn engine_limits(&self) -> EngineLimits {
        EngineLimits {
            request: self.request_limits(),
            insert_chunk_timeout_ms: self.limits.insert_chunk_timeout_ms,
            delete_chunk_timeout_ms: self.limits.delete_chunk_timeout_ms,
        }
    }
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates the `[admission]` bucket shapes.
fn validate_admission(policy: &AdmissionPolicy) -> Result<(), ConfigError> {
    for (name, bucket) in [
        ("admission.general_sustained", policy.general_sustained),
        ("admission.general_burst", policy.general_burst),
        ("admission.heavy_hourly", policy.heavy_hourly),
    ] {
        if !bucket.is_valid() {
            return Err(ConfigError::Invalid(format!(
                "{name} capacity, refill_per_interval, and interval_ms must be greater than zero"
            )));
        }
    }
    Ok(())
}

/// Validates the `[resources]` section.
fn validate_resources(resources: &GuardConfig) -> Result<(), ConfigError> {
    if resources.max_memory_ratio <= 0.0 || resources.max_memory_ratio > 1.0 {
        return Err(ConfigError::Invalid(
            "resources.max_memory_ratio must be within (0, 1]".to_string(),
        ));
    }
    if resources.max_concurrent == 0 {
        return Err(ConfigError::Invalid(
            "resources.max_concurrent must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Validates the `[retry]` section.
fn validate_retry(retry: &RetryPolicy) -> Result<(), ConfigError> {
    if retry.max_attempts == 0 {
        return Err(ConfigError::Invalid(
            "retry.max_attempts must be greater than zero".to_string(),
        ));
    }
    if retry.multiplier < 1.0 {
        return Err(ConfigError::Invalid("retry.multiplier must be at least 1.0".to_string()));
    }
    if retry.initial_delay_ms > retry.max_delay_ms {
        return Err(ConfigError::Invalid(
            "retry.initial_delay_ms must not exceed retry.max_delay_ms".to_string(),
        ));
    }
    Ok(())
}

/// Validates the `[limits]` section.
fn validate_limits(limits: &LimitsSection) -> Result<(), ConfigError> {
    if limits.max_total_records == 0 {
        return Err(ConfigError::Invalid(
            "limits.max_total_records must be greater than zero".to_string(),
        ));
    }
    if limits.max_batch_size == 0 {
        return Err(ConfigError::Invalid(
            "limits.max_batch_size must be greater than zero".to_string(),
        ));
    }
    if limits.max_batch_size > limits.max_total_records {
        return Err(ConfigError::Invalid(
            "limits.max_batch_size must not exceed limits.max_total_records".to_string(),
        ));
    }
    if limits.insert_chunk_timeout_ms == 0 {
        return Err(ConfigError::Invalid(
            "limits.insert_chunk_timeout_ms must be greater than zero".to_string(),
        ));
    }
    if limits.delete_chunk_timeout_ms == 0 {
        return Err(ConfigError::Invalid(
            "limits.delete_chunk_timeout_ms must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Validates the `[store]` section.
fn validate_store(store: &SqliteStoreConfig) -> Result<(), ConfigError> {
    if store.path.as_os_str().is_empty() {
        return Err(ConfigError::Invalid("store.path must not be empty".to_string()));
    }
    if store.busy_timeout_ms == 0 {
        return Err(ConfigError::Invalid(
            "store.busy_timeout_ms must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Validates config paths for safety limits.
fn validate_config_path(path: &Path) -> Result<(), ConfigError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_CONFIG_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}
