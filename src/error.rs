//! Error types for dirsize-exporter
//!
//! This module defines the error hierarchy for:
//! - Configuration and startup validation (fatal)
//! - Per-subdirectory scan failures (logged, never fatal)
//! - Metrics registration and encoding
//!
//! Per-entry races during a walk are not errors at all: they surface as
//! [`EntryOutcome::Vanished`] and are folded away by the aggregator.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the exporter
#[derive(Error, Debug)]
pub enum ExporterError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors (listener bind, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IOPS budget must grant at least one permit per second
    #[error("Invalid IOPS budget {budget}: must be at least 1 operation per second")]
    InvalidIopsBudget { budget: u32 },

    /// Parent directory missing or not a directory
    #[error("Invalid parent directory '{path}': {reason}")]
    InvalidParentPath { path: PathBuf, reason: String },

    /// Invalid scan parallelism
    #[error("Invalid parallelism {count}: must be between 1 and {max}")]
    InvalidParallelism { count: usize, max: usize },

    /// Invalid exclude pattern
    #[error("Invalid exclude pattern '{pattern}': {reason}")]
    InvalidExcludePattern { pattern: String, reason: String },

    /// Bind address could not be parsed
    #[error("Invalid bind address '{address}': {reason}")]
    InvalidBindAddress { address: String, reason: String },
}

/// Failure of a whole subdirectory scan or of the parent enumeration
#[derive(Error, Debug)]
pub enum ScanError {
    /// The root of a top-level subdirectory could not be stat'ed or listed
    #[error("Cannot read directory '{path}': {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The parent directory could not be listed
    #[error("Cannot enumerate parent directory '{path}': {source}")]
    EnumerationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A concurrent scan task panicked or was aborted
    #[error("Scan task did not complete: {reason}")]
    TaskFailed { reason: String },
}

impl ScanError {
    /// Returns the path associated with this error, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            ScanError::RootUnreadable { path, .. } => Some(path),
            ScanError::EnumerationFailed { path, .. } => Some(path),
            ScanError::TaskFailed { .. } => None,
        }
    }

    /// Whether the failure looks like the directory was removed mid-pass
    pub fn is_not_found(&self) -> bool {
        match self {
            ScanError::RootUnreadable { source, .. }
            | ScanError::EnumerationFailed { source, .. } => {
                source.kind() == io::ErrorKind::NotFound
            }
            ScanError::TaskFailed { .. } => false,
        }
    }
}

/// Metrics registry errors
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Registration or collection failed
    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    /// Encoded output was not valid UTF-8
    #[error("Encoded metrics are not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

impl axum::response::IntoResponse for MetricsError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        tracing::error!(error = %self, "Failed to encode metrics");
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

/// Result type alias for ExporterError
pub type Result<T> = std::result::Result<T, ExporterError>;

/// Result type alias for ScanError
pub type ScanResult<T> = std::result::Result<T, ScanError>;

/// Result type alias for MetricsError
pub type MetricsResult<T> = std::result::Result<T, MetricsError>;

/// Outcome of reading the metadata of a single listed entry
#[derive(Debug)]
pub enum EntryOutcome {
    /// Metadata was read successfully
    Present(std::fs::Metadata),

    /// The entry disappeared or became unreadable after it was listed
    Vanished(io::Error),
}

impl From<io::Result<std::fs::Metadata>> for EntryOutcome {
    fn from(result: io::Result<std::fs::Metadata>) -> Self {
        match result {
            Ok(meta) => EntryOutcome::Present(meta),
            Err(e) => EntryOutcome::Vanished(e),
        }
    }
}
