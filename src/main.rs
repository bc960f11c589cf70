//! dirsize-exporter - IOPS-budgeted directory size exporter
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use dirsize_exporter::config::{CliArgs, ExporterConfig};
use dirsize_exporter::metrics::PrometheusSink;
use dirsize_exporter::{server, IopsBudget, ScanCoordinator};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Setup logging
    setup_logging(args.verbose)?;

    // Validate and create config
    let config = ExporterConfig::from_args(args).context("Invalid configuration")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create async runtime")?;

    runtime.block_on(async { run_async(config).await })
}

async fn run_async(config: ExporterConfig) -> Result<()> {
    let config = Arc::new(config);

    let budget = Arc::new(
        IopsBudget::new(config.iops_budget).context("Invalid IOPS budget")?,
    );
    let sink = Arc::new(
        PrometheusSink::new(config.detailed_processing_time)
            .context("Failed to register metrics")?,
    );

    let coordinator = ScanCoordinator::new(Arc::clone(&config), budget, sink.clone());

    // A bind failure or ctrl-c ends the server, and with it the scan loop
    let listener = tokio::spawn(server::serve(config.listen_addr, sink));

    tokio::select! {
        served = listener => {
            served
                .context("Metrics server task failed")?
                .context("Metrics server failed")?;
            info!("Shutting down");
        }
        _ = coordinator.run() => {}
    }

    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("dirsize_exporter=debug,warn")
    } else {
        EnvFilter::new("dirsize_exporter=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
