/// Run progress reporting — lightweight messages sent from the run thread
/// to whoever drives the job, via a crossbeam channel.
///
/// Events mirror what is logged through `tracing`. Sending is best effort:
/// an event is dropped when the receiver is gone or the channel is full, so
/// a slow consumer never blocks or fails a run.
use crate::model::MonthKey;
use crossbeam_channel::Sender;
use std::path::PathBuf;
use std::time::Duration;

/// Counters collected while accumulating usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct AccumulationStats {
    /// Projects whose size was attributed to a month.
    pub projects: u64,
    /// Directories or files absorbed as zero contribution.
    pub skipped: u64,
    /// Projects bucketed by the run start time because no timestamp resolved.
    pub timestamp_fallbacks: u64,
}

#[derive(Debug)]
pub enum UsageEvent {
    /// Accumulation started on the given archive root.
    Started { root: PathBuf },
    /// A project's bytes were attributed to `month`.
    ProjectSized {
        path: PathBuf,
        month: MonthKey,
        bytes: u64,
    },
    /// A non-fatal problem; the node contributed nothing.
    Skipped { path: PathBuf, reason: String },
    /// No timestamp could be resolved; the project landed in the run's month.
    TimestampFallback { path: PathBuf, month: MonthKey },
    /// Accumulation finished.
    Accumulated {
        duration: Duration,
        stats: AccumulationStats,
    },
    /// The report file was written.
    ReportWritten { path: PathBuf, months: usize },
}

/// Optional sender for [`UsageEvent`]s.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<Sender<UsageEvent>>,
}

impl EventSink {
    pub fn new(tx: Sender<UsageEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink that discards every event.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    #[inline]
    pub fn emit(&self, event: UsageEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.try_send(event);
        }
    }
}
