//! dirsize-exporter - IOPS-budgeted directory size exporter
//!
//! Periodically measures the total size, entry count and newest/oldest mtime
//! of every top-level subdirectory under a parent path and exposes them as
//! Prometheus gauges. Every filesystem metadata operation is paced against a
//! global operations-per-second budget, so a walk never floods a shared
//! network filesystem.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  Parent directory (e.g. /home)                   │
//! │            alice/        bob/        carol/       ...            │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │ lstat / readdir
//!                               ▼
//!                    ┌──────────────────────┐
//!                    │      IopsBudget      │
//!                    │  N permits / second  │
//!                    └──────────┬───────────┘
//!                               │ acquire()
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        ScanCoordinator                           │
//! │  enumerate ─► DirectoryAggregator (per subdir) ─► publish        │
//! │  sleep WAIT_TIME_MINUTES, repeat                                 │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │ DirectoryAggregate
//!                               ▼
//!                    ┌──────────────────────┐
//!                    │    PrometheusSink    │◄── GET /metrics (axum)
//!                    │  dirsize_* gauges    │
//!                    └──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```bash
//! # 100 metadata ops per second, a pass every hour
//! dirsize-exporter /home 100 60
//!
//! # Scrape
//! curl -s localhost:8000/metrics | grep dirsize_total_size_bytes
//! ```

pub mod budget;
pub mod config;
pub mod error;
pub mod metrics;
pub mod server;
pub mod walker;

pub use budget::IopsBudget;
pub use config::{CliArgs, ExporterConfig};
pub use error::{ExporterError, Result};
pub use metrics::{MetricsSink, PrometheusSink};
pub use walker::{DirectoryAggregate, DirectoryAggregator, PassSummary, ScanCoordinator};
