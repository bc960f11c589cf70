//! Scan coordinator - drives the endless measurement loop
//!
//! The coordinator is responsible for:
//! - Enumerating top-level subdirectories of the parent path each pass
//! - Running the aggregator over each, sequentially or bounded-parallel
//! - Publishing finished aggregates to the metrics sink
//! - Sleeping between passes
//!
//! ```text
//!   Idle ─► Enumerating ─► ScanningSubdir(i) ─► Publishing ─┐
//!               ▲                 ▲  (loop over i)          │
//!               │                 └─────────────────────────┤
//!               └──────────────── Sleeping ◄────────────────┘
//! ```

use crate::budget::IopsBudget;
use crate::config::ExporterConfig;
use crate::error::{ScanError, ScanResult};
use crate::metrics::MetricsSink;
use crate::walker::aggregator::DirectoryAggregator;
use humansize::{format_size, BINARY};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Result of one full pass over the parent directory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassSummary {
    /// Top-level subdirectories found
    pub subdirectories: usize,

    /// Subdirectories measured and published
    pub scanned: usize,

    /// Subdirectories whose scan failed
    pub failed: usize,

    /// Sum of published sizes
    pub total_bytes: u64,

    /// Sum of published entry counts
    pub total_entries: u64,

    /// Permits consumed by the pass, enumeration included
    pub permits_used: u64,

    /// Wall-clock time of the pass
    pub duration: Duration,
}

/// Outcome of scanning one subdirectory inside the pass
struct SubdirOutcome {
    bytes: u64,
    entries: u64,
}

/// Coordinates repeated budgeted scans of a parent directory
pub struct ScanCoordinator {
    config: Arc<ExporterConfig>,
    budget: Arc<IopsBudget>,
    aggregator: DirectoryAggregator,
    sink: Arc<dyn MetricsSink>,
}

impl ScanCoordinator {
    /// Create a coordinator sharing `budget` with every scan it starts
    pub fn new(
        config: Arc<ExporterConfig>,
        budget: Arc<IopsBudget>,
        sink: Arc<dyn MetricsSink>,
    ) -> Self {
        let aggregator = DirectoryAggregator::new(Arc::clone(&budget));
        Self {
            config,
            budget,
            aggregator,
            sink,
        }
    }

    /// Run passes forever, sleeping the configured interval between them
    pub async fn run(&self) {
        info!(
            parent = %self.config.parent_dir.display(),
            iops_budget = self.budget.permits_per_second(),
            parallelism = self.config.parallelism,
            wait_secs = self.config.wait_interval.as_secs(),
            "Starting scan loop"
        );

        let mut pass: u64 = 0;
        loop {
            pass += 1;

            match self.run_pass().await {
                Ok(summary) => info!(
                    pass = pass,
                    subdirectories = summary.subdirectories,
                    scanned = summary.scanned,
                    failed = summary.failed,
                    size = %format_size(summary.total_bytes, BINARY),
                    entries = summary.total_entries,
                    permits = summary.permits_used,
                    duration_secs = summary.duration.as_secs(),
                    "Pass completed"
                ),
                Err(e) => error!(pass = pass, error = %e, "Pass failed"),
            }

            debug!(wait_secs = self.config.wait_interval.as_secs(), "Sleeping until next pass");
            tokio::time::sleep(self.config.wait_interval).await;
        }
    }

    /// Enumerate and scan every top-level subdirectory once
    pub async fn run_pass(&self) -> ScanResult<PassSummary> {
        let started = Instant::now();
        let permits_before = self.budget.granted();

        let subdirs = self.enumerate().await?;
        let mut summary = self.scan_subdirectories(subdirs).await;

        summary.permits_used = self.budget.granted() - permits_before;
        summary.duration = started.elapsed();
        Ok(summary)
    }

    /// List the parent directory and keep non-excluded child directories
    ///
    /// Costs one permit for the listing plus one per non-excluded child.
    /// Symlinks to directories are not treated as subdirectories.
    pub async fn enumerate(&self) -> ScanResult<Vec<PathBuf>> {
        let parent = &self.config.parent_dir;
        let enumeration_failed = |source| ScanError::EnumerationFailed {
            path: parent.clone(),
            source,
        };

        self.budget.acquire().await;
        let mut read_dir = tokio::fs::read_dir(parent)
            .await
            .map_err(enumeration_failed)?;

        let mut subdirs = Vec::new();
        while let Some(entry) = read_dir.next_entry().await.map_err(enumeration_failed)? {
            let name = entry.file_name();
            if self.config.is_excluded(&name.to_string_lossy()) {
                debug!(name = %name.to_string_lossy(), "Excluded entry");
                continue;
            }

            // Falls back to an lstat when the dirent carries no type
            self.budget.acquire().await;
            let is_dir = match entry.file_type().await {
                Ok(ft) => ft.is_dir(),
                Err(e) => {
                    debug!(path = %entry.path().display(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            if !is_dir {
                continue;
            }

            subdirs.push(entry.path());
        }

        subdirs.sort();
        debug!(count = subdirs.len(), "Enumerated subdirectories");
        Ok(subdirs)
    }

    /// Scan each directory and publish every successful aggregate
    ///
    /// A failed subdirectory is logged and counted; its siblings are
    /// unaffected and its previously published values stay in the sink.
    pub async fn scan_subdirectories(&self, subdirs: Vec<PathBuf>) -> PassSummary {
        let mut summary = PassSummary {
            subdirectories: subdirs.len(),
            ..Default::default()
        };

        let semaphore = Arc::new(Semaphore::new(self.config.parallelism));
        let mut tasks: JoinSet<ScanResult<SubdirOutcome>> = JoinSet::new();

        for dir in subdirs {
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            let aggregator = self.aggregator.clone();
            let sink = Arc::clone(&self.sink);

            tasks.spawn(async move {
                let _permit = permit;
                let aggregate = aggregator.scan(&dir).await?;
                sink.publish(&aggregate);

                info!(
                    directory = %aggregate.name,
                    size = %format_size(aggregate.total_size_bytes, BINARY),
                    entries = aggregate.entry_count,
                    skipped = aggregate.skipped_entries,
                    duration_ms = aggregate.scan_duration.as_millis() as u64,
                    "Published directory"
                );

                Ok(SubdirOutcome {
                    bytes: aggregate.total_size_bytes,
                    entries: aggregate.entry_count,
                })
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let result = joined.unwrap_or_else(|e| {
                Err(ScanError::TaskFailed {
                    reason: e.to_string(),
                })
            });

            match result {
                Ok(outcome) => {
                    summary.scanned += 1;
                    summary.total_bytes += outcome.bytes;
                    summary.total_entries += outcome.entries;
                }
                Err(e) => {
                    summary.failed += 1;
                    let path = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default();
                    if e.is_not_found() {
                        // Removed between enumeration and scan
                        info!(path = %path, error = %e, "Subdirectory disappeared before scan");
                    } else {
                        warn!(path = %path, error = %e, "Subdirectory scan failed");
                    }
                }
            }
        }

        summary
    }
}
