/// A classified directory node of the archive tree.
///
/// The category is fixed when the entry is listed: top-level names are
/// classified by pattern, deeper entries inherit a category from their
/// parent. The recursive byte size is computed on first request and cached.
use crate::error::UsageError;
use crate::scanner::sizing::{directory_size, DirSize};
use compact_str::CompactString;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Role of a directory within the archive layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryCategory {
    /// Four-digit year directory holding public month directories.
    PublicYear,
    /// Month directory (`01`..`12`) under a public year.
    PublicMonth,
    /// Published project directory under a public month.
    PublicProject,
    /// Top-level private submission, either pre-validated or validated.
    PrivateOrValidated,
    /// The `resub` container.
    ResubmissionRoot,
    /// Pending resubmission project under `resub`.
    ResubmissionProject,
    /// Top-level name excluded from accounting (e.g. `bin`).
    Ignored,
}

impl EntryCategory {
    /// Category assigned to the direct children of a directory of this
    /// category, or `None` when children are not classified further.
    pub fn child_category(self) -> Option<EntryCategory> {
        match self {
            Self::PublicYear => Some(Self::PublicMonth),
            Self::PublicMonth => Some(Self::PublicProject),
            Self::ResubmissionRoot => Some(Self::ResubmissionProject),
            Self::PublicProject
            | Self::PrivateOrValidated
            | Self::ResubmissionProject
            | Self::Ignored => None,
        }
    }

    /// `true` for projects whose month bucket comes from file timestamps
    /// rather than from the directory layout.
    pub fn needs_timestamp(self) -> bool {
        matches!(self, Self::PrivateOrValidated | Self::ResubmissionProject)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::PublicYear => "public year",
            Self::PublicMonth => "public month",
            Self::PublicProject => "public project",
            Self::PrivateOrValidated => "private/validated project",
            Self::ResubmissionRoot => "resubmission root",
            Self::ResubmissionProject => "resubmission project",
            Self::Ignored => "ignored",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Directory name only (not the full path).
    pub name: CompactString,
    pub path: PathBuf,
    /// `false` for stray files sitting where a directory is expected.
    pub is_dir: bool,
    pub category: EntryCategory,
    size: OnceLock<DirSize>,
}

impl ArchiveEntry {
    pub fn new(path: PathBuf, is_dir: bool, category: EntryCategory) -> Self {
        let name = path
            .file_name()
            .map(|n| CompactString::new(n.to_string_lossy()))
            .unwrap_or_default();
        Self {
            name,
            path,
            is_dir,
            category,
            size: OnceLock::new(),
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Recursive byte size of the entry's file tree.
    ///
    /// Computed once; later calls return the cached value. A failed
    /// computation is not cached.
    pub fn size(&self) -> Result<DirSize, UsageError> {
        if let Some(size) = self.size.get() {
            return Ok(*size);
        }
        let size = directory_size(&self.path)?;
        Ok(*self.size.get_or_init(|| size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn child_categories_follow_the_layout() {
        assert_eq!(
            EntryCategory::PublicYear.child_category(),
            Some(EntryCategory::PublicMonth)
        );
        assert_eq!(
            EntryCategory::PublicMonth.child_category(),
            Some(EntryCategory::PublicProject)
        );
        assert_eq!(
            EntryCategory::ResubmissionRoot.child_category(),
            Some(EntryCategory::ResubmissionProject)
        );
        assert_eq!(EntryCategory::PrivateOrValidated.child_category(), None);
    }

    #[test]
    fn only_private_and_resubmission_projects_need_timestamps() {
        assert!(EntryCategory::PrivateOrValidated.needs_timestamp());
        assert!(EntryCategory::ResubmissionProject.needs_timestamp());
        assert!(!EntryCategory::PublicProject.needs_timestamp());
        assert!(!EntryCategory::PublicYear.needs_timestamp());
    }

    #[test]
    fn name_is_taken_from_the_path() {
        let entry = ArchiveEntry::new(
            PathBuf::from("/archive/PXD000001"),
            true,
            EntryCategory::PrivateOrValidated,
        );
        assert_eq!(entry.name, "PXD000001");
    }

    #[test]
    fn size_is_cached_after_first_computation() {
        let tmp = tempfile::TempDir::new().unwrap();
        let project = tmp.path().join("PXD000002");
        fs::create_dir(&project).unwrap();
        fs::write(project.join("a.raw"), vec![0u8; 100]).unwrap();

        let entry = ArchiveEntry::new(project.clone(), true, EntryCategory::PrivateOrValidated);
        assert_eq!(entry.size().unwrap().bytes, 100);

        // Growing the tree afterwards does not change the cached size.
        fs::write(project.join("b.raw"), vec![0u8; 50]).unwrap();
        assert_eq!(entry.size().unwrap().bytes, 100);
    }

    #[test]
    fn size_of_missing_directory_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let entry = ArchiveEntry::new(
            tmp.path().join("gone"),
            true,
            EntryCategory::PublicProject,
        );
        assert!(entry.size().is_err());
    }
}
