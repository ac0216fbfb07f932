/// Directory classification for the archive root.
///
/// The top level of the archive mixes three layouts, told apart purely by
/// name:
///
/// - `YYYY` — public data, organised as `YYYY/MM/<project>`.
/// - `resub` — pending resubmissions, one project per child.
/// - anything else — a single private (pre-validated or validated) project.
///
/// Names listed in the configured ignore set (by default `bin`) are
/// classified as [`EntryCategory::Ignored`] and never accounted.
use crate::error::UsageError;
use crate::model::{ArchiveEntry, EntryCategory};
use std::path::Path;

/// Literal name of the resubmission container.
pub const RESUBMISSION_DIR: &str = "resub";

/// Top-level names skipped unless the configuration says otherwise.
pub const DEFAULT_IGNORED: &[&str] = &["bin"];

/// Archive root children grouped by category, each group sorted by name.
#[derive(Debug, Default)]
pub struct ClassifiedRoot {
    pub public_years: Vec<ArchiveEntry>,
    pub projects: Vec<ArchiveEntry>,
    pub resubmission_roots: Vec<ArchiveEntry>,
    pub ignored: Vec<ArchiveEntry>,
}

impl ClassifiedRoot {
    /// Total number of classified children.
    pub fn len(&self) -> usize {
        self.public_years.len()
            + self.projects.len()
            + self.resubmission_roots.len()
            + self.ignored.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `true` when `name` is exactly four ASCII digits.
pub fn is_year_name(name: &str) -> bool {
    name.len() == 4 && name.bytes().all(|b| b.is_ascii_digit())
}

/// Classify one archive-root child by name.
pub fn classify_name<S: AsRef<str>>(name: &str, ignored: &[S]) -> EntryCategory {
    if is_year_name(name) {
        EntryCategory::PublicYear
    } else if name == RESUBMISSION_DIR {
        EntryCategory::ResubmissionRoot
    } else if ignored.iter().any(|i| i.as_ref() == name) {
        EntryCategory::Ignored
    } else {
        EntryCategory::PrivateOrValidated
    }
}

/// List and classify the immediate children of the archive root.
///
/// Failing to list the root is fatal for the run.
pub fn classify_root<S: AsRef<str>>(
    root: &Path,
    ignored: &[S],
) -> Result<ClassifiedRoot, UsageError> {
    let read_dir = std::fs::read_dir(root).map_err(|source| UsageError::ArchiveRoot {
        path: root.to_path_buf(),
        source,
    })?;

    let mut classified = ClassifiedRoot::default();
    let mut children = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|source| UsageError::ArchiveRoot {
            path: root.to_path_buf(),
            source,
        })?;
        children.push(entry.path());
    }
    children.sort();

    for path in children {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let category = classify_name(&name, ignored);
        let entry = ArchiveEntry::new(path.clone(), path.is_dir(), category);
        match category {
            EntryCategory::PublicYear => classified.public_years.push(entry),
            EntryCategory::ResubmissionRoot => classified.resubmission_roots.push(entry),
            EntryCategory::Ignored => classified.ignored.push(entry),
            _ => classified.projects.push(entry),
        }
    }

    Ok(classified)
}

/// List the children of a non-root directory, tagging each with the
/// category implied by `parent`.
///
/// Returns entries sorted by name. Children of a category with no further
/// structure are tagged with the parent's own category.
pub fn list_children(parent: &ArchiveEntry) -> std::io::Result<Vec<ArchiveEntry>> {
    let category = parent
        .category
        .child_category()
        .unwrap_or(parent.category);
    let mut paths = std::fs::read_dir(&parent.path)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    paths.sort();
    Ok(paths
        .into_iter()
        .map(|path| {
            let is_dir = path.is_dir();
            ArchiveEntry::new(path, is_dir, category)
        })
        .collect())
}
