//! Budgeted directory aggregator
//!
//! Walks one top-level subdirectory depth-first and folds every entry into a
//! [`DirectoryAggregate`]. Each metadata read and each directory listing is
//! charged one permit against the shared [`IopsBudget`].
//!
//! ```text
//!   stack: [root]
//!   │
//!   ├── pop dir ──► acquire ──► read_dir ──► child paths
//!   │                                           │
//!   │              ┌────────────────────────────┘
//!   │              ▼
//!   │   for each child: acquire ──► symlink_metadata
//!   │              │
//!   │              ├── Present(dir)   → fold mtime, count, push on stack
//!   │              ├── Present(other) → fold size, mtime, count
//!   │              └── Vanished       → skip
//!   └── until stack empty
//! ```
//!
//! Symlinks are never followed. A link to a directory counts as one leaf
//! entry of the link's own size.

use crate::budget::IopsBudget;
use crate::error::{EntryOutcome, ScanError, ScanResult};
use chrono::{DateTime, Utc};
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::time::Instant;
use tracing::{debug, trace};

/// Finished measurement of one top-level subdirectory
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryAggregate {
    /// Basename of the top-level subdirectory
    pub name: String,

    /// Sum of sizes of all non-directory entries
    pub total_size_bytes: u64,

    /// Files, directories and symlinks, including the subdirectory itself
    pub entry_count: u64,

    /// Newest mtime seen, including the subdirectory itself
    pub last_modified: SystemTime,

    /// Oldest mtime seen, including the subdirectory itself
    pub oldest_modified: SystemTime,

    /// Entries that vanished or became unreadable mid-walk
    pub skipped_entries: u64,

    /// First permit request to last metadata operation
    pub scan_duration: Duration,

    /// Wall-clock completion time
    pub last_updated: DateTime<Utc>,
}

impl DirectoryAggregate {
    /// Compare everything except the timing fields
    pub fn same_contents(&self, other: &DirectoryAggregate) -> bool {
        self.name == other.name
            && self.total_size_bytes == other.total_size_bytes
            && self.entry_count == other.entry_count
            && self.last_modified == other.last_modified
            && self.oldest_modified == other.oldest_modified
            && self.skipped_entries == other.skipped_entries
    }
}

/// Running totals while a walk is in progress
#[derive(Debug)]
struct Totals {
    size: u64,
    count: u64,
    newest: SystemTime,
    oldest: SystemTime,
    skipped: u64,
}

impl Totals {
    fn from_root(meta: &Metadata) -> Self {
        let mtime = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        Self {
            size: 0,
            count: 1,
            newest: mtime,
            oldest: mtime,
            skipped: 0,
        }
    }

    fn fold(&mut self, meta: &Metadata) {
        self.count += 1;

        // Directories contribute count and mtime only
        if !meta.is_dir() {
            self.size += meta.len();
        }

        if let Ok(mtime) = meta.modified() {
            self.newest = self.newest.max(mtime);
            self.oldest = self.oldest.min(mtime);
        }
    }
}

/// Walks subtrees against a shared IOPS budget
#[derive(Debug, Clone)]
pub struct DirectoryAggregator {
    budget: Arc<IopsBudget>,
}

impl DirectoryAggregator {
    pub fn new(budget: Arc<IopsBudget>) -> Self {
        Self { budget }
    }

    /// Measure the subtree rooted at `path`
    ///
    /// Fails only when the root itself cannot be stat'ed or listed. Entries
    /// that disappear below the root are skipped.
    pub async fn scan(&self, path: &Path) -> ScanResult<DirectoryAggregate> {
        let started = Instant::now();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let root_unreadable = |source: io::Error| ScanError::RootUnreadable {
            path: path.to_path_buf(),
            source,
        };

        let root_meta = self.read_metadata(path).await.map_err(root_unreadable)?;
        if !root_meta.is_dir() {
            return Err(root_unreadable(io::Error::other("not a directory")));
        }

        let mut totals = Totals::from_root(&root_meta);
        let children = self.list(path).await.map_err(root_unreadable)?;

        let mut stack = Vec::new();
        self.visit_entries(children, &mut totals, &mut stack).await;

        while let Some(dir) = stack.pop() {
            match self.list(&dir).await {
                Ok(children) => self.visit_entries(children, &mut totals, &mut stack).await,
                Err(e) => {
                    // The directory itself was already counted
                    debug!(path = %dir.display(), error = %e, "Skipping unreadable directory");
                    totals.skipped += 1;
                }
            }
        }

        let aggregate = DirectoryAggregate {
            name,
            total_size_bytes: totals.size,
            entry_count: totals.count,
            last_modified: totals.newest,
            oldest_modified: totals.oldest,
            skipped_entries: totals.skipped,
            scan_duration: started.elapsed(),
            last_updated: Utc::now(),
        };

        debug!(
            directory = %aggregate.name,
            entries = aggregate.entry_count,
            bytes = aggregate.total_size_bytes,
            skipped = aggregate.skipped_entries,
            duration_ms = aggregate.scan_duration.as_millis() as u64,
            "Directory scanned"
        );

        Ok(aggregate)
    }

    /// Stat each listed child and fold it into `totals`
    async fn visit_entries(
        &self,
        children: Vec<PathBuf>,
        totals: &mut Totals,
        stack: &mut Vec<PathBuf>,
    ) {
        for child in children {
            match self.stat_entry(&child).await {
                EntryOutcome::Present(meta) => {
                    totals.fold(&meta);
                    if meta.is_dir() {
                        stack.push(child);
                    }
                }
                EntryOutcome::Vanished(e) => {
                    trace!(path = %child.display(), error = %e, "Entry vanished mid-walk");
                    totals.skipped += 1;
                }
            }
        }
    }

    /// One permit, one `lstat`
    async fn stat_entry(&self, path: &Path) -> EntryOutcome {
        self.read_metadata(path).await.into()
    }

    async fn read_metadata(&self, path: &Path) -> io::Result<Metadata> {
        self.budget.acquire().await;
        tokio::fs::symlink_metadata(path).await
    }

    /// One permit, one full directory listing
    async fn list(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        self.budget.acquire().await;

        let mut read_dir = tokio::fs::read_dir(path).await?;
        let mut children = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            children.push(entry.path());
        }
        Ok(children)
    }
}
