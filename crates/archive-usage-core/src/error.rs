/// Error type shared by every phase of a usage run.
///
/// Only a handful of these ever reach the caller: per-directory and per-file
/// failures during accumulation are absorbed and reported as
/// [`crate::scanner::progress::UsageEvent::Skipped`] instead.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UsageError {
    /// The archive root itself could not be listed. Fatal for the run.
    #[error("cannot list archive root {path}: {source}")]
    ArchiveRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The report file could not be written. Fatal for the run.
    #[error("cannot write report {path}: {source}")]
    ReportWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to render report: {0}")]
    Render(#[from] csv::Error),

    #[error("invalid month key {0:?} (expected YYYYMM)")]
    InvalidMonth(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to start worker threads: {0}")]
    Threads(String),

    #[error("usage run thread panicked")]
    WorkerPanicked,
}

pub type Result<T> = std::result::Result<T, UsageError>;
