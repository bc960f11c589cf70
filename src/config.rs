//! Configuration types for dirsize-exporter
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation

use crate::error::ConfigError;
use clap::Parser;
use regex::Regex;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Maximum number of top-level subdirectories scanned concurrently
pub const MAX_PARALLELISM: usize = 64;

/// Default port for the metrics endpoint
pub const DEFAULT_PORT: u16 = 8000;

/// Export per-directory size, entry count and mtime as Prometheus metrics
#[derive(Parser, Debug, Clone)]
#[command(
    name = "dirsize-exporter",
    version,
    about = "Export per-directory size, entry count and mtime as Prometheus metrics",
    long_about = "Periodically walks every top-level subdirectory of PARENT_DIR and exports its \
                  total size, entry count and newest/oldest mtime as Prometheus gauges.\n\n\
                  Every stat and directory listing is charged against an IOPS budget so the \
                  exporter never overloads a shared network filesystem.",
    after_help = "EXAMPLES:\n    \
        dirsize-exporter /home 100 60\n    \
        dirsize-exporter /mnt/nfs/projects 250 30 --port 9100 --parallelism 4\n    \
        dirsize-exporter /home 50 120 --exclude '^\\.snapshot$' --enable-detailed-processing-time-metric"
)]
pub struct CliArgs {
    /// Directory whose top-level subdirectories are measured
    #[arg(value_name = "PARENT_DIR")]
    pub parent_dir: PathBuf,

    /// Maximum filesystem metadata operations per second
    #[arg(value_name = "IOPS_BUDGET")]
    pub iops_budget: u32,

    /// Minutes to wait between full passes
    #[arg(value_name = "WAIT_TIME_MINUTES")]
    pub wait_time_minutes: u64,

    /// Also export how long each directory took to scan
    #[arg(long)]
    pub enable_detailed_processing_time_metric: bool,

    /// Port for the metrics endpoint
    #[arg(long, default_value_t = DEFAULT_PORT, value_name = "PORT")]
    pub port: u16,

    /// Bind address for the metrics endpoint
    #[arg(long, default_value = "0.0.0.0", value_name = "ADDR")]
    pub bind: String,

    /// Number of top-level subdirectories scanned concurrently
    #[arg(short = 'j', long, default_value = "1", value_name = "NUM")]
    pub parallelism: usize,

    /// Skip top-level subdirectories whose name matches pattern (can be repeated)
    #[arg(long = "exclude", value_name = "PATTERN", action = clap::ArgAction::Append)]
    pub exclude_patterns: Vec<String>,

    /// Verbose output (per-directory debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    /// Parent directory to enumerate each pass
    pub parent_dir: PathBuf,

    /// Permits granted per one-second budget window
    pub iops_budget: u32,

    /// Sleep between passes
    pub wait_interval: Duration,

    /// Publish scan duration as a metric
    pub detailed_processing_time: bool,

    /// Metrics endpoint address
    pub listen_addr: SocketAddr,

    /// Concurrent subdirectory scans
    pub parallelism: usize,

    /// Compiled exclude patterns
    pub exclude_patterns: Vec<Regex>,

    /// Verbose logging
    pub verbose: bool,
}

impl ExporterConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        // A zero budget would never grant a permit
        if args.iops_budget == 0 {
            return Err(ConfigError::InvalidIopsBudget {
                budget: args.iops_budget,
            });
        }

        if args.parallelism == 0 || args.parallelism > MAX_PARALLELISM {
            return Err(ConfigError::InvalidParallelism {
                count: args.parallelism,
                max: MAX_PARALLELISM,
            });
        }

        validate_parent_dir(&args.parent_dir)?;

        let exclude_patterns = args
            .exclude_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| ConfigError::InvalidExcludePattern {
                    pattern: p.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let ip: IpAddr = args
            .bind
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::InvalidBindAddress {
                address: args.bind.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            parent_dir: args.parent_dir,
            iops_budget: args.iops_budget,
            wait_interval: Duration::from_secs(args.wait_time_minutes.saturating_mul(60)),
            detailed_processing_time: args.enable_detailed_processing_time_metric,
            listen_addr: SocketAddr::new(ip, args.port),
            parallelism: args.parallelism,
            exclude_patterns,
            verbose: args.verbose,
        })
    }

    /// Check if a top-level subdirectory name should be skipped
    pub fn is_excluded(&self, name: &str) -> bool {
        self.exclude_patterns.iter().any(|re| re.is_match(name))
    }
}

fn validate_parent_dir(path: &Path) -> Result<(), ConfigError> {
    let meta = std::fs::metadata(path).map_err(|e| ConfigError::InvalidParentPath {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    if !meta.is_dir() {
        return Err(ConfigError::InvalidParentPath {
            path: path.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }

    // Listing must work too, otherwise every pass would be empty
    std::fs::read_dir(path).map_err(|e| ConfigError::InvalidParentPath {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    Ok(())
}
