/// Archive Usage Core — classification, accumulation, and reporting.
///
/// This crate contains all business logic with zero CLI dependencies.
/// A run has two strictly ordered phases: walk the archive tree into a
/// month-keyed [`model::UsageMap`], then collate that map into a cumulative
/// monthly report file.
///
/// # Modules
///
/// - [`model`] — Month keys, the usage map, and classified archive entries.
/// - [`scanner`] — Classification, sizing, timestamp resolution, accumulation.
/// - [`report`] — Cumulative month-by-month report generation.
/// - [`config`] — TOML run configuration.
/// - [`job`] — Two-phase run orchestration and the background run handle.
pub mod config;
pub mod error;
pub mod job;
pub mod model;
pub mod report;
pub mod scanner;

pub use error::{Result, UsageError};
