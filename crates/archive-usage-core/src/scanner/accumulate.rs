/// Usage accumulation — walks the classified archive and fills a
/// [`UsageMap`].
///
/// Three paths feed the map, in this order:
///
/// 1. **Public**: `YYYY/MM/<project>`. The bucket is the year and month given
///    by the layout; every project directory under a month is summed.
/// 2. **Private/validated**: each remaining top-level directory is one
///    project, bucketed by [`TimestampResolver::resolve`].
/// 3. **Resubmission**: each child of `resub/` is handled exactly like a
///    private project.
///
/// Nothing below the archive root is fatal. Unreadable, empty or misplaced
/// nodes are logged, reported as [`UsageEvent::Skipped`] and contribute zero.
///
/// Project sizing runs on the current rayon pool. Increments go through a
/// single `Mutex<UsageMap>`; the lock is held only for the add itself.
use super::classify::{classify_root, list_children};
use super::progress::{AccumulationStats, EventSink, UsageEvent};
use super::timestamps::{TimestampResolver, TimestampSource};
use crate::error::UsageError;
use crate::model::{ArchiveEntry, MonthKey, UsageMap};
use parking_lot::Mutex;
use rayon::prelude::*;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// The filled map and counters handed over when accumulation finishes.
#[derive(Debug, Clone)]
pub struct Accumulation {
    pub usage: UsageMap,
    pub stats: AccumulationStats,
}

pub struct Accumulator {
    resolver: TimestampResolver,
    events: EventSink,
    usage: Mutex<UsageMap>,
    projects: AtomicU64,
    skipped: AtomicU64,
    fallbacks: AtomicU64,
}

impl Accumulator {
    pub fn new(resolver: TimestampResolver, events: EventSink) -> Self {
        Self {
            resolver,
            events,
            usage: Mutex::new(UsageMap::new()),
            projects: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            fallbacks: AtomicU64::new(0),
        }
    }

    /// Accumulate usage for every classified child of `root`.
    ///
    /// Only a failure to list `root` itself is returned as an error.
    pub fn accumulate<S: AsRef<str>>(&self, root: &Path, ignored: &[S]) -> Result<(), UsageError> {
        let start = Instant::now();
        info!(
            "Starting to calculate data usage in archive directory: {}",
            root.display()
        );
        self.events.emit(UsageEvent::Started {
            root: root.to_path_buf(),
        });

        let classified = classify_root(root, ignored)?;
        for entry in &classified.ignored {
            debug!("Ignoring {}", entry.path.display());
        }

        info!("Calculating public project data usage.");
        for year in &classified.public_years {
            self.accumulate_public_year(year);
        }

        info!("Calculating private project data usage.");
        classified
            .projects
            .par_iter()
            .for_each(|project| self.accumulate_project(project));

        info!("Calculating pending resubmissions project data usage.");
        if classified.resubmission_roots.is_empty() {
            warn!("Resubmission directory not found under {}", root.display());
        }
        for resub in &classified.resubmission_roots {
            self.accumulate_resubmissions(resub);
        }

        let stats = self.stats();
        let duration = start.elapsed();
        info!(
            "Data usage calculated in {duration:?}: {} projects, {} skipped, {} timestamp fallbacks",
            stats.projects, stats.skipped, stats.timestamp_fallbacks
        );
        self.events.emit(UsageEvent::Accumulated { duration, stats });
        Ok(())
    }

    /// Add `bytes` to `key`, returning the month's new total.
    pub fn increment(&self, key: MonthKey, bytes: u64) -> u64 {
        let total = self.usage.lock().increment(key, bytes);
        info!("Updated data usage: {key} {total}");
        total
    }

    pub fn stats(&self) -> AccumulationStats {
        AccumulationStats {
            projects: self.projects.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            timestamp_fallbacks: self.fallbacks.load(Ordering::Relaxed),
        }
    }

    /// Hand over the filled map. Consumes the accumulator so the map cannot
    /// be fed again after the report phase starts.
    pub fn finish(self) -> Accumulation {
        let stats = self.stats();
        Accumulation {
            usage: self.usage.into_inner(),
            stats,
        }
    }

    fn skip(&self, path: &Path, reason: impl Into<String>) {
        let reason = reason.into();
        warn!("{}: {reason}", path.display());
        self.skipped.fetch_add(1, Ordering::Relaxed);
        self.events.emit(UsageEvent::Skipped {
            path: path.to_path_buf(),
            reason,
        });
    }

    fn accumulate_public_year(&self, year: &ArchiveEntry) {
        if !year.is_dir {
            self.skip(&year.path, "year is not a directory");
            return;
        }
        let Ok(year_number) = year.name.parse::<i32>() else {
            self.skip(&year.path, "year name is not a number");
            return;
        };

        let months = match list_children(year) {
            Ok(months) if !months.is_empty() => months,
            Ok(_) => {
                self.skip(&year.path, "public year directory is empty");
                return;
            }
            Err(err) => {
                self.skip(&year.path, format!("cannot list public year: {err}"));
                return;
            }
        };

        for month in &months {
            self.accumulate_public_month(year_number, month);
        }
    }

    fn accumulate_public_month(&self, year: i32, month: &ArchiveEntry) {
        if !month.is_dir {
            self.skip(&month.path, "month is not a directory");
            return;
        }
        let key = match Some(month.name.as_str())
            .filter(|name| !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|name| name.parse::<u32>().ok())
            .and_then(|m| MonthKey::new(year, m).ok())
        {
            Some(key) => key,
            None => {
                self.skip(&month.path, "month name is not a calendar month");
                return;
            }
        };

        let projects = match list_children(month) {
            Ok(projects) => projects,
            Err(err) => {
                error!("Cannot list public month {}: {err}", month.path.display());
                Vec::new()
            }
        };
        if projects.is_empty() {
            self.skip(&month.path, "public month directory is empty");
        }

        let month_total = projects
            .par_iter()
            .map(|project| self.public_project_bytes(key, project))
            .reduce(|| 0, u64::saturating_add);
        self.increment(key, month_total);
    }

    fn public_project_bytes(&self, key: MonthKey, project: &ArchiveEntry) -> u64 {
        if !project.is_dir {
            self.skip(&project.path, "project is not a directory");
            return 0;
        }
        match project.size() {
            Ok(size) => {
                if size.errors > 0 {
                    warn!(
                        "{} unreadable entries under {}",
                        size.errors,
                        project.path.display()
                    );
                }
                info!("Project: {} Size: {}", project.path.display(), size.bytes);
                self.projects.fetch_add(1, Ordering::Relaxed);
                self.events.emit(UsageEvent::ProjectSized {
                    path: project.path.clone(),
                    month: key,
                    bytes: size.bytes,
                });
                size.bytes
            }
            Err(err) => {
                self.skip(&project.path, format!("size not calculated: {err}"));
                0
            }
        }
    }

    fn accumulate_resubmissions(&self, resub: &ArchiveEntry) {
        if !resub.is_dir {
            self.skip(&resub.path, "resubmission root is not a directory");
            return;
        }
        match list_children(resub) {
            Ok(resubmissions) if !resubmissions.is_empty() => resubmissions
                .par_iter()
                .for_each(|project| self.accumulate_project(project)),
            Ok(_) => self.skip(&resub.path, "resubmission directory is empty"),
            Err(err) => self.skip(&resub.path, format!("cannot list resubmissions: {err}")),
        }
    }

    /// Private, validated, or resubmission project: bucket by earliest
    /// timestamp, then attribute the whole tree's size.
    fn accumulate_project(&self, project: &ArchiveEntry) {
        if !project.is_dir {
            self.skip(&project.path, "project is not a directory");
            return;
        }

        let resolved = self.resolver.resolve(&project.path);
        let month = resolved.month();
        let size = match project.size() {
            Ok(size) => size,
            Err(err) => {
                self.skip(&project.path, format!("size not calculated: {err}"));
                return;
            }
        };
        if size.errors > 0 {
            warn!(
                "{} unreadable entries under {}",
                size.errors,
                project.path.display()
            );
        }

        if resolved.source == TimestampSource::Fallback {
            self.fallbacks.fetch_add(1, Ordering::Relaxed);
            self.events.emit(UsageEvent::TimestampFallback {
                path: project.path.clone(),
                month,
            });
        }

        info!("Project: {} {}", project.name, size.bytes);
        self.increment(month, size.bytes);
        self.projects.fetch_add(1, Ordering::Relaxed);
        self.events.emit(UsageEvent::ProjectSized {
            path: project.path.clone(),
            month,
            bytes: size.bytes,
        });
    }
}
