//! Metrics sink
//!
//! The coordinator publishes finished aggregates through the [`MetricsSink`]
//! trait. [`PrometheusSink`] is the production implementation, backing a
//! registry of `dirsize_*` gauges labelled by directory name.

pub mod registry;

pub use registry::PrometheusSink;

use crate::walker::DirectoryAggregate;

/// Namespace prefixed to every exported metric
pub const NAMESPACE: &str = "dirsize";

/// Label carrying the top-level subdirectory name
pub const DIRECTORY_LABEL: &str = "directory";

/// Receives finished per-subdirectory aggregates
///
/// A publish replaces every previous value for `aggregate.name`.
pub trait MetricsSink: Send + Sync {
    fn publish(&self, aggregate: &DirectoryAggregate);
}

