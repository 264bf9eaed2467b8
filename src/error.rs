//! Error types for fleetcost
//!
//! There are two error types: `FleetcostError` (main error enum) and
//! `ConfigError` (configuration-specific).
//!
//! ## Error Handling Philosophy
//!
//! Library code uses `crate::error::Result<T>` which returns `FleetcostError`.
//! CLI code uses `anyhow::Result<T>` for top-level error handling. The conversion
//! happens at the CLI boundary via `?`, which keeps the source chain intact.
//!
//! ## When to Use Which Error
//!
//! - `ConfigError`: configuration parsing and validation issues, including a
//!   grouping tag list that does not name exactly two tags
//!   - Automatically converted to `FleetcostError::Config` via `#[from]`
//!
//! - `NotFound`: the snapshot references pricing or a zone that was never
//!   fetched for that scope. The snapshot is internally inconsistent, so this
//!   is fatal for the whole run.
//!
//! - `Validation`: malformed raw price attributes, duplicate catalog keys,
//!   bad CLI input (metric names, empty metric sets)
//!
//! - `Snapshot`: a snapshot file that parses but cannot be used
//!
//! Volume ids that do not resolve are *not* errors; the aggregator records
//! them as diagnostics and keeps going.

use thiserror::Error;

/// Main error type for fleetcost
#[derive(Error, Debug)]
pub enum FleetcostError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Not found: {resource_type} - {key}")]
    NotFound { resource_type: String, key: String },

    #[error("Validation error: {field} - {reason}")]
    Validation { field: String, reason: String },

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FleetcostError {
    pub(crate) fn not_found(resource_type: &str, key: impl Into<String>) -> Self {
        FleetcostError::NotFound {
            resource_type: resource_type.to_string(),
            key: key.into(),
        }
    }

    pub(crate) fn validation(field: &str, reason: impl Into<String>) -> Self {
        FleetcostError::Validation {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Grouping needs exactly 2 tag names, got {got}")]
    GroupingTagCount { got: usize },

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Failed to parse config: {0}")]
    ParseError(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, FleetcostError>;
