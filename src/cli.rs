//! Command-line interface definition.

use archive_usage_core::config::{load_config, UsageConfig};
use archive_usage_core::model::MonthKey;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "archive-usage")]
#[command(about = "Monthly cumulative storage usage report for a data archive", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute usage and write the cumulative monthly report
    Report(ReportArgs),

    /// Compute usage only and print the month -> bytes map as JSON
    Scan(RunArgs),
}

#[derive(Args)]
pub struct ReportArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Print a JSON run summary instead of the report path
    #[arg(long)]
    pub json: bool,
}

/// Options shared by every command. Flags override values from `--config`.
#[derive(Args)]
pub struct RunArgs {
    /// TOML configuration file
    #[arg(short, long, env = "ARCHIVE_USAGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Archive data root
    #[arg(long, env = "ARCHIVE_USAGE_DATA_PATH")]
    pub data_path: Option<PathBuf>,

    /// Directory the report is written into (must exist)
    #[arg(long, env = "ARCHIVE_USAGE_REPORT_PATH")]
    pub report_path: Option<PathBuf>,

    /// Subdivision identifier embedded in the report file name
    #[arg(long, env = "ARCHIVE_USAGE_SUBDIVISION")]
    pub subdivision: Option<String>,

    /// Track identifier embedded in the report file name
    #[arg(long, env = "ARCHIVE_USAGE_TRACK")]
    pub track: Option<String>,

    /// First report month (YYYYMM)
    #[arg(long)]
    pub epoch: Option<MonthKey>,

    /// Worker threads for project sizing (0 = all CPUs)
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,
}

impl RunArgs {
    /// Load the configuration file (or defaults) and apply flag overrides.
    pub fn resolve(&self) -> anyhow::Result<UsageConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => UsageConfig::default(),
        };
        if let Some(data_path) = &self.data_path {
            config.data_path = data_path.clone();
        }
        if let Some(report_path) = &self.report_path {
            config.report_path = report_path.clone();
        }
        if let Some(subdivision) = &self.subdivision {
            config.subdivision = subdivision.clone();
        }
        if let Some(track) = &self.track {
            config.track = track.clone();
        }
        if let Some(epoch) = self.epoch {
            config.epoch = epoch;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "archive-usage",
            "report",
            "--data-path",
            "/archive",
            "--subdivision",
            "EMBL-EBI",
            "--track",
            "PRIDE",
            "--epoch",
            "200601",
            "-j",
            "3",
            "--json",
        ])
        .unwrap();
        let Commands::Report(args) = cli.command else {
            panic!("expected report command");
        };
        assert!(args.json);
        let config = args.run.resolve().unwrap();
        assert_eq!(config.data_path, PathBuf::from("/archive"));
        assert_eq!(config.epoch.to_string(), "200601");
        assert_eq!(config.threads, 3);
        assert_eq!(config.ignored_names, ["bin"]);
    }

    #[test]
    fn bad_epoch_is_rejected_at_parse_time() {
        assert!(Cli::try_parse_from(["archive-usage", "scan", "--epoch", "2006"]).is_err());
    }
}
