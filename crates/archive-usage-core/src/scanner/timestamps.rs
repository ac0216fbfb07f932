/// Earliest-timestamp resolution for private, validated and resubmission
/// projects.
///
/// The month a non-public project is billed to is the month of the earliest
/// creation or modification time found among the files that make up its
/// submission:
///
/// - **Pre-validated** (a `submission.px` sits directly in the project): the
///   direct entries of the project directory.
/// - **Validated**: the direct entries of `internal/` and of `submitted/`,
///   taking the earlier of the two.
///
/// When nothing yields a candidate, the run start time is used, so the
/// project lands in the current month. A resolved timestamp is never later
/// than the run start: future-dated files are billed to the current month.
///
/// Creation and modification times are both candidates because backups and
/// migrations can reset either one. Creation time is not available on every
/// platform and filesystem; [`TimestampResolver::probe`] checks this once per
/// run and, when it is unavailable, only modification times are used.
use crate::model::MonthKey;
use chrono::{DateTime, Local};
use std::path::Path;
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Marker file of a submission that has not been validated yet.
pub const SUBMISSION_FILE: &str = "submission.px";
pub const INTERNAL_DIR: &str = "internal";
pub const SUBMITTED_DIR: &str = "submitted";

/// How a project's timestamp was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampSource {
    Prevalidated,
    Validated,
    /// No candidate found; the run start time was substituted.
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTimestamp {
    pub timestamp: DateTime<Local>,
    pub source: TimestampSource,
}

impl ResolvedTimestamp {
    /// Month bucket this timestamp falls into.
    pub fn month(&self) -> MonthKey {
        MonthKey::from_datetime(&self.timestamp)
    }
}

/// `true` when a project directory directly contains `submission.px`.
pub fn is_prevalidated(project: &Path) -> bool {
    std::fs::symlink_metadata(project.join(SUBMISSION_FILE)).is_ok()
}

/// Whether the filesystem holding `path` reports creation times at all.
pub fn creation_time_supported(path: &Path) -> bool {
    std::fs::metadata(path)
        .and_then(|meta| meta.created())
        .is_ok()
}

#[derive(Debug, Clone, Copy)]
pub struct TimestampResolver {
    fallback: DateTime<Local>,
    use_creation_time: bool,
}

impl TimestampResolver {
    pub fn new(fallback: DateTime<Local>, use_creation_time: bool) -> Self {
        Self {
            fallback,
            use_creation_time,
        }
    }

    /// Build a resolver for a run over `root`, checking creation-time
    /// support on the root itself.
    pub fn probe(root: &Path, fallback: DateTime<Local>) -> Self {
        let use_creation_time = creation_time_supported(root);
        if !use_creation_time {
            info!(
                "Creation time unavailable under {}; using modification time only",
                root.display()
            );
        }
        Self::new(fallback, use_creation_time)
    }

    #[inline]
    pub fn fallback(&self) -> DateTime<Local> {
        self.fallback
    }

    #[inline]
    pub fn uses_creation_time(&self) -> bool {
        self.use_creation_time
    }

    /// Earliest creation or modification time among the direct entries of
    /// `dir` (not recursive).
    ///
    /// Entries whose attributes cannot be read are left out. Returns `None`
    /// when `dir` cannot be listed, is empty, or no attribute was readable.
    pub fn earliest_in_directory(&self, dir: &Path) -> Option<DateTime<Local>> {
        let read_dir = match std::fs::read_dir(dir) {
            Ok(rd) => rd,
            Err(err) => {
                warn!("Unable to list {}: {err}", dir.display());
                return None;
            }
        };

        let mut earliest: Option<SystemTime> = None;
        let mut seen = 0usize;
        for entry in read_dir {
            let path = match entry {
                Ok(e) => e.path(),
                Err(err) => {
                    debug!("Unreadable entry in {}: {err}", dir.display());
                    continue;
                }
            };
            seen += 1;
            let meta = match std::fs::metadata(&path) {
                Ok(m) => m,
                Err(err) => {
                    debug!("Cannot read attributes of {}: {err}", path.display());
                    continue;
                }
            };

            let created = if self.use_creation_time {
                meta.created().ok()
            } else {
                None
            };
            for candidate in [created, meta.modified().ok()].into_iter().flatten() {
                earliest = Some(match earliest {
                    Some(current) if current <= candidate => current,
                    _ => candidate,
                });
            }
        }

        if seen == 0 {
            warn!("No files contained in directory: {}", dir.display());
        }
        earliest.map(DateTime::<Local>::from)
    }

    /// Resolve the timestamp that decides a project's billing month.
    pub fn resolve(&self, project: &Path) -> ResolvedTimestamp {
        let (earliest, source) = if is_prevalidated(project) {
            (
                self.earliest_in_directory(project),
                TimestampSource::Prevalidated,
            )
        } else {
            let internal = self.earliest_in_subdirectory(project, INTERNAL_DIR);
            let submitted = self.earliest_in_subdirectory(project, SUBMITTED_DIR);
            let earliest = match (internal, submitted) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
            (earliest, TimestampSource::Validated)
        };

        match earliest {
            Some(timestamp) if timestamp > self.fallback => {
                warn!(
                    "{} is dated after the run start ({}); using run start",
                    project.display(),
                    timestamp.format("%Y-%m-%d %H:%M:%S")
                );
                ResolvedTimestamp {
                    timestamp: self.fallback,
                    source,
                }
            }
            Some(timestamp) => ResolvedTimestamp { timestamp, source },
            None => {
                warn!(
                    "No timestamp found for {}; using run start {}",
                    project.display(),
                    self.fallback.format("%Y-%m-%d %H:%M:%S")
                );
                ResolvedTimestamp {
                    timestamp: self.fallback,
                    source: TimestampSource::Fallback,
                }
            }
        }
    }

    fn earliest_in_subdirectory(&self, project: &Path, name: &str) -> Option<DateTime<Local>> {
        let sub = project.join(name);
        if !sub.is_dir() {
            warn!("Unable to find directory files for: {}", sub.display());
            return None;
        }
        self.earliest_in_directory(&sub)
    }
}
