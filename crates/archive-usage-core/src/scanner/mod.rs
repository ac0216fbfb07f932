/// Scanner module — turns an archive directory tree into a [`UsageMap`].
///
/// - [`classify`] partitions the archive root by name pattern.
/// - [`sizing`] computes recursive directory sizes with `jwalk`.
/// - [`timestamps`] resolves the billing month of non-public projects.
/// - [`accumulate`] drives the walk and fills the usage map.
/// - [`progress`] carries run events to the caller.
///
/// [`UsageMap`]: crate::model::UsageMap
pub mod accumulate;
pub mod classify;
pub mod progress;
pub mod sizing;
pub mod timestamps;

pub use accumulate::{Accumulation, Accumulator};
pub use classify::{classify_name, classify_root, ClassifiedRoot, DEFAULT_IGNORED, RESUBMISSION_DIR};
pub use progress::{AccumulationStats, EventSink, UsageEvent};
pub use sizing::{directory_size, DirSize};
pub use timestamps::{ResolvedTimestamp, TimestampResolver, TimestampSource};
