/// Two-phase usage run.
///
/// 1. [`UsageJob::compute_usage`] classifies and sizes the archive into a
///    fresh [`UsageMap`].
/// 2. [`UsageJob::collate_and_write`] turns that map into the cumulative
///    report and writes it.
///
/// Each run owns its map; nothing is shared between runs. [`start_run`]
/// executes both phases on a background thread and streams
/// [`UsageEvent`]s back to the caller.
use crate::config::UsageConfig;
use crate::error::UsageError;
use crate::model::{MonthKey, UsageMap};
use crate::report::UsageReport;
use crate::scanner::{
    Accumulation, AccumulationStats, Accumulator, EventSink, TimestampResolver, UsageEvent,
};
use chrono::{DateTime, Local};
use crossbeam_channel::{Receiver, Sender};
use serde::Serialize;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

/// Maximum number of progress events that may queue up in the channel.
///
/// The consumer only logs or counts events, so a full channel stalls the
/// run briefly rather than growing the heap without bound.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 4_096;

/// Report produced by phase 2, with where it was written.
#[derive(Debug, Clone)]
pub struct WrittenReport {
    pub path: PathBuf,
    pub report: UsageReport,
}

/// Everything a completed run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub usage: UsageMap,
    pub stats: AccumulationStats,
    pub written: WrittenReport,
    pub duration: Duration,
}

impl RunOutcome {
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            report_path: self.written.path.clone(),
            final_month: self.written.report.final_month(),
            months: self.written.report.lines().len(),
            total_bytes: self.written.report.total(),
            stats: self.stats,
            duration_ms: u64::try_from(self.duration.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Machine-readable run summary.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub report_path: PathBuf,
    pub final_month: MonthKey,
    pub months: usize,
    pub total_bytes: u64,
    #[serde(flatten)]
    pub stats: AccumulationStats,
    pub duration_ms: u64,
}

pub struct UsageJob {
    config: UsageConfig,
    started_at: DateTime<Local>,
    events: EventSink,
}

impl UsageJob {
    /// `started_at` is the run's notion of "now": it picks the report's
    /// final month and is the fallback timestamp for undatable projects.
    pub fn new(config: UsageConfig, started_at: DateTime<Local>) -> Self {
        Self {
            config,
            started_at,
            events: EventSink::disabled(),
        }
    }

    pub fn with_events(mut self, tx: Sender<UsageEvent>) -> Self {
        self.events = EventSink::new(tx);
        self
    }

    pub fn config(&self) -> &UsageConfig {
        &self.config
    }

    /// Phase 1: classify and size the archive into a new usage map.
    pub fn compute_usage(&self) -> Result<Accumulation, UsageError> {
        let root = &self.config.data_path;
        let resolver = TimestampResolver::probe(root, self.started_at);
        let accumulator = Accumulator::new(resolver, self.events.clone());

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.worker_threads())
            .thread_name(|i| format!("archive-usage-{i}"))
            .build()
            .map_err(|e| UsageError::Threads(e.to_string()))?;
        pool.install(|| accumulator.accumulate(root, self.config.ignored_names.as_slice()))?;

        Ok(accumulator.finish())
    }

    /// Phase 2: collate `usage` and write the report file.
    pub fn collate_and_write(&self, usage: &UsageMap) -> Result<WrittenReport, UsageError> {
        info!("Collating data usage");
        let current_month = MonthKey::from_datetime(&self.started_at);
        let report = UsageReport::collate(usage, self.config.epoch, current_month);
        let path = report.write_to(
            &self.config.report_path,
            &self.config.subdivision,
            &self.config.track,
        )?;
        self.events.emit(UsageEvent::ReportWritten {
            path: path.clone(),
            months: report.lines().len(),
        });
        Ok(WrittenReport { path, report })
    }

    /// Run both phases in order.
    pub fn run(&self) -> Result<RunOutcome, UsageError> {
        let start = Instant::now();
        let Accumulation { usage, stats } = self.compute_usage()?;
        let written = self.collate_and_write(&usage)?;
        let duration = start.elapsed();
        info!(
            "Data usage report complete in {duration:?}: {}",
            written.path.display()
        );
        Ok(RunOutcome {
            usage,
            stats,
            written,
            duration,
        })
    }
}

/// Handle to a run executing on a background thread.
pub struct RunHandle {
    /// Receiver for progress events. Disconnects when the run ends.
    pub progress_rx: Receiver<UsageEvent>,
    thread: thread::JoinHandle<Result<RunOutcome, UsageError>>,
}

impl RunHandle {
    /// Block until the run finishes and return its outcome.
    ///
    /// Progress events that do not fit in the bounded channel are dropped,
    /// so waiting without draining `progress_rx` never stalls the run.
    pub fn wait(self) -> Result<RunOutcome, UsageError> {
        self.thread.join().map_err(|_| UsageError::WorkerPanicked)?
    }
}

/// Validate `config` and start a full run on a background thread.
pub fn start_run(config: UsageConfig, started_at: DateTime<Local>) -> Result<RunHandle, UsageError> {
    config.validate()?;
    let (progress_tx, progress_rx) =
        crossbeam_channel::bounded::<UsageEvent>(PROGRESS_CHANNEL_CAPACITY);
    let job = UsageJob::new(config, started_at).with_events(progress_tx);

    let thread = thread::Builder::new()
        .name("archive-usage-run".into())
        .spawn(move || job.run())
        .map_err(|e| UsageError::Threads(e.to_string()))?;

    Ok(RunHandle {
        progress_rx,
        thread,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn config(data: &TempDir, reports: &TempDir) -> UsageConfig {
        UsageConfig {
            data_path: data.path().to_path_buf(),
            report_path: reports.path().to_path_buf(),
            subdivision: "sub".into(),
            track: "track".into(),
            threads: 2,
            ..UsageConfig::default()
        }
    }

    fn started_at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2016, 1, 15, 8, 0, 0).unwrap()
    }

    #[test]
    fn run_on_empty_archive_writes_header_and_epoch_months() {
        let data = TempDir::new().unwrap();
        let reports = TempDir::new().unwrap();
        let outcome = UsageJob::new(config(&data, &reports), started_at())
            .run()
            .unwrap();

        assert_eq!(
            outcome.written.path,
            reports.path().join("201512_sub_track.txt")
        );
        // 200501..=201512
        assert_eq!(outcome.written.report.lines().len(), 132);
        assert_eq!(outcome.summary().total_bytes, 0);
        assert!(outcome.usage.is_empty());
    }

    #[test]
    fn start_run_rejects_invalid_config_before_spawning() {
        let data = TempDir::new().unwrap();
        let reports = TempDir::new().unwrap();
        let mut cfg = config(&data, &reports);
        cfg.track.clear();
        assert!(matches!(
            start_run(cfg, started_at()),
            Err(UsageError::Config(_))
        ));
    }

    #[test]
    fn background_run_streams_events_then_completes() {
        let data = TempDir::new().unwrap();
        let reports = TempDir::new().unwrap();
        std::fs::create_dir_all(data.path().join("2015/10/PXD000001")).unwrap();

        let handle = start_run(config(&data, &reports), started_at()).unwrap();
        let events: Vec<UsageEvent> = handle.progress_rx.iter().collect();
        let outcome = handle.wait().unwrap();

        assert!(matches!(events.first(), Some(UsageEvent::Started { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, UsageEvent::Accumulated { .. })));
        assert!(matches!(
            events.last(),
            Some(UsageEvent::ReportWritten { .. })
        ));
        assert!(outcome.written.path.exists());
    }

    #[test]
    fn wait_without_draining_progress_completes() {
        let data = TempDir::new().unwrap();
        let reports = TempDir::new().unwrap();
        for i in 0..(PROGRESS_CHANNEL_CAPACITY + 64) {
            std::fs::create_dir_all(data.path().join(format!("2015/10/PXD{i:06}"))).unwrap();
        }

        let handle = start_run(config(&data, &reports), started_at()).unwrap();
        let outcome = handle.wait().unwrap();
        assert_eq!(
            outcome.stats.projects,
            (PROGRESS_CHANNEL_CAPACITY + 64) as u64
        );
    }

    #[test]
    fn summary_serialises_flat() {
        let data = TempDir::new().unwrap();
        let reports = TempDir::new().unwrap();
        let outcome = UsageJob::new(config(&data, &reports), started_at())
            .run()
            .unwrap();
        let json = serde_json::to_value(outcome.summary()).unwrap();
        assert_eq!(json["final_month"], "201512");
        assert_eq!(json["projects"], 0);
        assert_eq!(json["timestamp_fallbacks"], 0);
    }
}
