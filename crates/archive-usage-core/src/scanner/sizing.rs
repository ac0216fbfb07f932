/// Recursive directory sizing using `jwalk`.
///
/// Projects are already sized concurrently on the rayon pool owned by the
/// run, so each walk here runs with `Parallelism::Serial` rather than
/// spawning a nested pool per project.
///
/// Only regular files contribute bytes. Symlinks are not followed and count
/// as zero. Entries that cannot be read are skipped and tallied in
/// [`DirSize::errors`] so callers can report them.
use crate::error::UsageError;
use std::path::Path;
use tracing::debug;

/// Result of sizing one directory tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirSize {
    /// Sum of logical file lengths.
    pub bytes: u64,
    pub files: u64,
    /// Directories visited, including the root.
    pub dirs: u64,
    /// Entries that could not be read and were left out of `bytes`.
    pub errors: u64,
}

/// Sum the length of every regular file below `root`.
///
/// Fails only when `root` itself cannot be read or is not a directory.
pub fn directory_size(root: &Path) -> Result<DirSize, UsageError> {
    let meta = std::fs::metadata(root).map_err(|source| UsageError::Io {
        path: root.to_path_buf(),
        source,
    })?;
    if !meta.is_dir() {
        return Err(UsageError::Io {
            path: root.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
        });
    }

    let walker = jwalk::WalkDir::new(root)
        .skip_hidden(false)
        .follow_links(false)
        .parallelism(jwalk::Parallelism::Serial);

    let mut size = DirSize::default();
    for entry_result in walker {
        let entry = match entry_result {
            Ok(e) => e,
            Err(err) => {
                // jwalk errors are typically access-denied on directories.
                debug!("Skipping unreadable entry: {err}");
                size.errors += 1;
                continue;
            }
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            size.dirs += 1;
            if let Some(err) = &entry.read_children_error {
                debug!("Cannot list {}: {err}", entry.path().display());
                size.errors += 1;
            }
            continue;
        }
        if !file_type.is_file() {
            continue;
        }

        let path = entry.path();
        match std::fs::symlink_metadata(&path) {
            Ok(meta) => {
                size.bytes = size.bytes.saturating_add(meta.len());
                size.files += 1;
            }
            Err(err) => {
                debug!("Cannot stat {}: {err}", path.display());
                size.errors += 1;
            }
        }
    }

    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_bytes(path: &Path, n: usize) {
        fs::write(path, vec![0u8; n]).unwrap();
    }

    /// ```text
    /// root/
    ///   internal/
    ///     submission.px   (100 bytes)
    ///   submitted/
    ///     a.raw           (200 bytes)
    ///     nested/b.mzml   (300 bytes)
    ///   .hidden           (400 bytes)
    /// ```
    #[test]
    fn sums_every_file_recursively() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("internal")).unwrap();
        fs::create_dir_all(root.join("submitted/nested")).unwrap();
        write_bytes(&root.join("internal/submission.px"), 100);
        write_bytes(&root.join("submitted/a.raw"), 200);
        write_bytes(&root.join("submitted/nested/b.mzml"), 300);
        write_bytes(&root.join(".hidden"), 400);

        let size = directory_size(root).unwrap();
        assert_eq!(size.bytes, 1_000);
        assert_eq!(size.files, 4);
        assert_eq!(size.dirs, 4, "root + internal + submitted + nested");
        assert_eq!(size.errors, 0);
    }

    #[test]
    fn empty_directory_is_zero() {
        let tmp = TempDir::new().unwrap();
        let size = directory_size(tmp.path()).unwrap();
        assert_eq!(size.bytes, 0);
        assert_eq!(size.files, 0);
    }

    /// Sparse files report their logical length, matching how fixtures are built.
    #[test]
    fn sparse_file_counts_logical_length() {
        let tmp = TempDir::new().unwrap();
        let f = fs::File::create(tmp.path().join("sparse.raw")).unwrap();
        f.set_len(1_024).unwrap();
        assert_eq!(directory_size(tmp.path()).unwrap().bytes, 1_024);
    }

    /// A directory that cannot be listed contributes nothing but is counted.
    #[cfg(unix)]
    #[test]
    fn unreadable_subdirectory_is_tallied_as_an_error() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        let locked = root.join("locked");
        fs::create_dir(&locked).unwrap();
        write_bytes(&locked.join("hidden.raw"), 500);
        write_bytes(&root.join("open.raw"), 20);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users read through mode 000; nothing to observe then.
        let listable = fs::read_dir(&locked).is_ok();
        let size = directory_size(root);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        if listable {
            return;
        }

        let size = size.unwrap();
        assert_eq!(size.bytes, 20);
        assert_eq!(size.files, 1);
        assert_eq!(size.errors, 1);
    }

    #[test]
    fn missing_root_is_an_error() {
        let tmp = TempDir::new().unwrap();
        assert!(directory_size(&tmp.path().join("absent")).is_err());
    }

    #[test]
    fn file_root_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("plain.txt");
        write_bytes(&file, 10);
        assert!(directory_size(&file).is_err());
    }
}
