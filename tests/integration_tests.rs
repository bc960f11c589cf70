//! Integration tests for dirsize-exporter
//!
//! These tests build small trees under a temporary directory and run full
//! passes through the public API, checking the exported text format.

use clap::Parser;
use dirsize_exporter::config::{CliArgs, ExporterConfig};
use dirsize_exporter::error::ConfigError;
use dirsize_exporter::metrics::PrometheusSink;
use dirsize_exporter::{IopsBudget, ScanCoordinator};
use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tempfile::tempdir;

fn config_for(parent: &Path, budget: u32, extra: &[&str]) -> ExporterConfig {
    let budget = budget.to_string();
    let mut argv = vec!["dirsize-exporter", parent.to_str().unwrap(), budget.as_str(), "1"];
    argv.extend_from_slice(extra);
    ExporterConfig::from_args(CliArgs::parse_from(argv)).unwrap()
}

fn set_mtime(path: &Path, secs: u64) {
    File::open(path)
        .unwrap()
        .set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
        .unwrap();
}

#[tokio::test]
async fn test_full_pass_exports_metrics() {
    let home = tempdir().unwrap();
    let alice = home.path().join("alice");
    let bob = home.path().join("bob");
    fs::create_dir(&alice).unwrap();
    fs::create_dir(&bob).unwrap();
    fs::write(alice.join("thesis.pdf"), vec![0u8; 100]).unwrap();
    fs::write(alice.join("todo.txt"), vec![0u8; 50]).unwrap();
    set_mtime(&alice.join("thesis.pdf"), 1_600_000_000);
    set_mtime(&alice.join("todo.txt"), 1_600_000_900);
    set_mtime(&alice, 1_500_000_000);
    set_mtime(&bob, 1_550_000_000);

    let config = Arc::new(config_for(
        home.path(),
        1000,
        &["--enable-detailed-processing-time-metric"],
    ));
    let budget = Arc::new(IopsBudget::new(config.iops_budget).unwrap());
    let sink = Arc::new(PrometheusSink::new(config.detailed_processing_time).unwrap());
    let coordinator = ScanCoordinator::new(Arc::clone(&config), budget, sink.clone());

    let summary = coordinator.run_pass().await.unwrap();
    assert_eq!(summary.scanned, 2);
    assert_eq!(summary.failed, 0);

    let text = sink.encode().unwrap();
    assert!(text.contains(r#"dirsize_total_size_bytes{directory="alice"} 150"#));
    assert!(text.contains(r#"dirsize_entries_count{directory="alice"} 3"#));
    assert!(text.contains(r#"dirsize_latest_mtime{directory="alice"} 1600000900"#));
    assert!(text.contains(r#"dirsize_oldest_mtime{directory="alice"} 1500000000"#));
    assert!(text.contains(r#"dirsize_total_size_bytes{directory="bob"} 0"#));
    assert!(text.contains(r#"dirsize_entries_count{directory="bob"} 1"#));
    assert!(text.contains(r#"dirsize_latest_mtime{directory="bob"} 1550000000"#));
    assert!(text.contains(r#"dirsize_processing_time{directory="alice"}"#));
    assert!(text.contains(r#"dirsize_last_updated{directory="bob"}"#));
}

#[tokio::test]
async fn test_failed_subdirectory_keeps_previous_values() {
    let home = tempdir().unwrap();
    let alice = home.path().join("alice");
    fs::create_dir(&alice).unwrap();
    fs::write(alice.join("data"), vec![0u8; 42]).unwrap();
    fs::create_dir(home.path().join("bob")).unwrap();

    let config = Arc::new(config_for(home.path(), 1000, &[]));
    let budget = Arc::new(IopsBudget::new(config.iops_budget).unwrap());
    let sink = Arc::new(PrometheusSink::new(false).unwrap());
    let coordinator = ScanCoordinator::new(Arc::clone(&config), budget, sink.clone());

    coordinator.run_pass().await.unwrap();

    let summary = coordinator
        .scan_subdirectories(vec![alice.clone(), home.path().join("bob")])
        .await;

    // alice was enumerated but is gone by the time it is scanned
    fs::remove_dir_all(&alice).unwrap();
    let summary_after = coordinator
        .scan_subdirectories(vec![alice, home.path().join("bob")])
        .await;

    assert_eq!(summary.failed, 0);
    assert_eq!(summary_after.failed, 1);
    assert_eq!(summary_after.scanned, 1);

    let text = sink.encode().unwrap();
    assert!(text.contains(r#"dirsize_total_size_bytes{directory="alice"} 42"#));
    assert!(text.contains(r#"dirsize_entries_count{directory="bob"} 1"#));
}

#[tokio::test]
async fn test_budget_bounds_pass_duration() {
    let home = tempdir().unwrap();
    let alice = home.path().join("alice");
    fs::create_dir(&alice).unwrap();
    for name in ["a", "b", "c"] {
        fs::write(alice.join(name), b"1").unwrap();
    }

    // listing + alice type check + alice (stat, list, 3 stats) = 7 operations at 2/s
    let config = Arc::new(config_for(home.path(), 2, &[]));
    let started = Instant::now();
    let budget = Arc::new(IopsBudget::new(config.iops_budget).unwrap());
    let sink = Arc::new(PrometheusSink::new(false).unwrap());
    let coordinator = ScanCoordinator::new(Arc::clone(&config), budget, sink);

    let summary = coordinator.run_pass().await.unwrap();

    assert_eq!(summary.permits_used, 7);
    assert!(started.elapsed() >= Duration::from_secs(3));
}

#[test]
fn test_zero_budget_is_fatal() {
    let home = tempdir().unwrap();
    let args = CliArgs::parse_from(["dirsize-exporter", home.path().to_str().unwrap(), "0", "1"]);
    assert!(matches!(
        ExporterConfig::from_args(args),
        Err(ConfigError::InvalidIopsBudget { budget: 0 })
    ));
}
