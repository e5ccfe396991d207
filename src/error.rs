//! Error types for RiskWatch
//!
//! This module defines all error types used by the monitoring core.

use thiserror::Error;

/// Result type alias for monitoring operations
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Main error type for monitoring operations
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Ingestion targeted a dataset that was never registered
    #[error("Dataset not found: {0}")]
    DatasetNotFound(String),

    /// Ingestion carried no records
    #[error("Empty batch for dataset: {dataset}")]
    EmptyBatch { dataset: String },

    /// Drift engine failed for one computation cycle
    #[error("Drift engine failed for dataset {dataset}: {source}")]
    Engine {
        dataset: String,
        #[source]
        source: EngineError,
    },

    /// Invalid service options or registrations
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Exposition registry failure outside of a single metric update
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Errors raised by a drift engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A column required by the mapping is absent from a table
    #[error("Missing column '{column}' in {table} data")]
    MissingColumn { column: String, table: &'static str },

    /// The engine does not know this monitor
    #[error("Unsupported monitor: {0}")]
    UnsupportedMonitor(String),

    /// The mapping lacks a role the monitor requires
    #[error("Monitor {monitor} requires a {role} column")]
    MissingRole {
        monitor: String,
        role: &'static str,
    },

    /// Any other failure reported by an external engine
    #[error("Computation failed: {0}")]
    Failed(String),
}

/// Errors for a single metric update
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Label keys differ from the schema fixed by the first observation
    #[error("Label mismatch for metric {metric}: expected {expected:?}, got {actual:?}")]
    LabelMismatch {
        metric: String,
        expected: Vec<String>,
        actual: Vec<String>,
    },

    /// The exposition library rejected the metric (invalid name, label, ...)
    #[error("Exposition error: {0}")]
    Exposition(#[from] prometheus::Error),

    /// Encoded output was not valid UTF-8
    #[error("Encoding error: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}
