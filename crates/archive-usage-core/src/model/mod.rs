/// Data model for a usage run.
///
/// Re-exports the month key, the month-keyed usage map, and the classified
/// archive entry types.
pub mod entry;
pub mod month;
pub mod usage;

pub use entry::{ArchiveEntry, EntryCategory};
pub use month::{MonthKey, MonthRange, ARCHIVE_EPOCH};
pub use usage::UsageMap;
