//! archive-usage — monthly cumulative storage usage for a data archive.
//!
//! Thin binary entry point. All logic lives in the `archive-usage-core`
//! crate.

mod cli;

use archive_usage_core::job::{start_run, UsageJob};
use archive_usage_core::scanner::UsageEvent;
use archive_usage_core::UsageError;
use clap::Parser;
use cli::{Cli, Commands};
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    // Initialise structured logging, filtered by ARCHIVE_USAGE_LOG.
    let log_level = std::env::var("ARCHIVE_USAGE_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");

        let exit_code = match e.downcast_ref::<UsageError>() {
            Some(UsageError::Config(_)) | Some(UsageError::InvalidMonth(_)) => 2,
            Some(UsageError::ArchiveRoot { .. })
            | Some(UsageError::Io { .. })
            | Some(UsageError::ReportWrite { .. }) => 3,
            _ => 1,
        };
        process::exit(exit_code);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let started_at = chrono::Local::now();
    match cli.command {
        Commands::Report(args) => {
            let config = args.run.resolve()?;
            let handle = start_run(config, started_at)?;

            let mut skipped = 0u64;
            for event in handle.progress_rx.iter() {
                match event {
                    UsageEvent::Skipped { .. } => skipped += 1,
                    UsageEvent::TimestampFallback { path, month } => {
                        tracing::warn!("{} billed to run month {month}", path.display());
                    }
                    _ => {}
                }
            }
            let outcome = handle.wait()?;

            if args.json {
                println!("{}", serde_json::to_string_pretty(&outcome.summary())?);
            } else {
                if skipped > 0 {
                    tracing::warn!("{skipped} directories skipped, see log for details");
                }
                println!("{}", outcome.written.path.display());
            }
        }
        Commands::Scan(args) => {
            let config = args.resolve()?;
            let accumulation = UsageJob::new(config, started_at).compute_usage()?;
            println!("{}", serde_json::to_string_pretty(&accumulation.usage)?);
        }
    }
    Ok(())
}
