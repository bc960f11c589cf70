//! Prometheus registry backing the `/metrics` endpoint

use crate::error::MetricsResult;
use crate::metrics::{MetricsSink, DIRECTORY_LABEL, NAMESPACE};
use crate::walker::DirectoryAggregate;
use chrono::{DateTime, Utc};
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use std::time::SystemTime;

/// Gauges for every measured directory
pub struct PrometheusSink {
    registry: Registry,
    total_size: GaugeVec,
    latest_mtime: GaugeVec,
    oldest_mtime: GaugeVec,
    entries_count: GaugeVec,
    last_updated: GaugeVec,
    /// Only registered with the detailed processing time flag
    processing_time: Option<GaugeVec>,
}

impl PrometheusSink {
    /// Create a sink with its own registry
    pub fn new(detailed_processing_time: bool) -> MetricsResult<Self> {
        let registry = Registry::new();

        let total_size = register(
            &registry,
            "total_size_bytes",
            "Total Size of the Directory (in bytes)",
        )?;
        let latest_mtime = register(
            &registry,
            "latest_mtime",
            "Newest modified file in the directory (as unix timestamp)",
        )?;
        let oldest_mtime = register(
            &registry,
            "oldest_mtime",
            "Oldest modified file in the directory (as unix timestamp)",
        )?;
        let entries_count = register(
            &registry,
            "entries_count",
            "Total number of entries (files, directories & links) in the directory",
        )?;
        let last_updated = register(
            &registry,
            "last_updated",
            "Last time this directory was processed (as unix timestamp)",
        )?;
        let processing_time = if detailed_processing_time {
            Some(register(
                &registry,
                "processing_time",
                "Time it took to process the directory (in seconds)",
            )?)
        } else {
            None
        };

        Ok(Self {
            registry,
            total_size,
            latest_mtime,
            oldest_mtime,
            entries_count,
            last_updated,
            processing_time,
        })
    }

    /// Render all gauges in the Prometheus text exposition format
    pub fn encode(&self) -> MetricsResult<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8(buf)?)
    }
}

impl MetricsSink for PrometheusSink {
    fn publish(&self, aggregate: &DirectoryAggregate) {
        let labels = [aggregate.name.as_str()];

        self.total_size
            .with_label_values(&labels)
            .set(aggregate.total_size_bytes as f64);
        self.latest_mtime
            .with_label_values(&labels)
            .set(unix_seconds(aggregate.last_modified));
        self.oldest_mtime
            .with_label_values(&labels)
            .set(unix_seconds(aggregate.oldest_modified));
        self.entries_count
            .with_label_values(&labels)
            .set(aggregate.entry_count as f64);
        self.last_updated
            .with_label_values(&labels)
            .set(utc_seconds(aggregate.last_updated));

        if let Some(processing_time) = &self.processing_time {
            processing_time
                .with_label_values(&labels)
                .set(aggregate.scan_duration.as_secs_f64());
        }
    }
}

fn register(registry: &Registry, name: &str, help: &str) -> MetricsResult<GaugeVec> {
    let gauge = GaugeVec::new(Opts::new(name, help).namespace(NAMESPACE), &[DIRECTORY_LABEL])?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

/// Seconds since the epoch, negative for pre-epoch mtimes
fn unix_seconds(time: SystemTime) -> f64 {
    match time.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        Err(e) => -e.duration().as_secs_f64(),
    }
}

fn utc_seconds(time: DateTime<Utc>) -> f64 {
    time.timestamp_millis() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn aggregate(name: &str, size: u64) -> DirectoryAggregate {
        DirectoryAggregate {
            name: name.to_string(),
            total_size_bytes: size,
            entry_count: 3,
            last_modified: SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_500),
            oldest_modified: SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000),
            skipped_entries: 0,
            scan_duration: Duration::from_millis(1500),
            last_updated: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn test_publish_and_encode() {
        let sink = PrometheusSink::new(false).unwrap();
        sink.publish(&aggregate("alice", 150));

        let text = sink.encode().unwrap();
        assert!(text.contains(r#"dirsize_total_size_bytes{directory="alice"} 150"#));
        assert!(text.contains(r#"dirsize_entries_count{directory="alice"} 3"#));
        assert!(text.contains(r#"dirsize_latest_mtime{directory="alice"} 1600000500"#));
        assert!(text.contains(r#"dirsize_oldest_mtime{directory="alice"} 1600000000"#));
        assert!(text.contains(r#"dirsize_last_updated{directory="alice"} 1700000000"#));
        assert!(!text.contains("dirsize_processing_time"));
    }

    #[test]
    fn test_processing_time_only_when_enabled() {
        let sink = PrometheusSink::new(true).unwrap();
        sink.publish(&aggregate("bob", 0));

        let text = sink.encode().unwrap();
        assert!(text.contains(r#"dirsize_processing_time{directory="bob"} 1.5"#));
    }

    #[test]
    fn test_publish_overwrites_previous_value() {
        let sink = PrometheusSink::new(false).unwrap();
        sink.publish(&aggregate("alice", 150));
        sink.publish(&aggregate("alice", 90));
        sink.publish(&aggregate("bob", 7));

        let size = |name: &str| sink.total_size.with_label_values(&[name]).get();
        assert_eq!(size("alice"), 90.0);
        assert_eq!(size("bob"), 7.0);
    }

    #[test]
    fn test_pre_epoch_mtime() {
        let t = SystemTime::UNIX_EPOCH - Duration::from_secs(60);
        assert_eq!(unix_seconds(t), -60.0);
    }
}
