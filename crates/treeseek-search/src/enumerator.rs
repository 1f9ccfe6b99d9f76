//! Single-directory listing.

use std::fs;
use std::io;
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

use compact_str::CompactString;
use tracing::trace;

use treeseek_core::{DirEntryInfo, DirIdentity, EntryKind, SearchError};

/// Children of one directory, plus errors hit while reading them.
#[derive(Debug, Default)]
pub struct Listing {
    pub entries: Vec<DirEntryInfo>,
    /// Errors that cut the listing short. The entries read before are kept.
    pub errors: Vec<SearchError>,
}

impl Listing {
    /// A complete listing.
    pub fn new(entries: Vec<DirEntryInfo>) -> Self {
        Self {
            entries,
            errors: Vec::new(),
        }
    }

    /// Check if every entry was read.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Lists the immediate children of one directory.
///
/// Failures are returned as data so the caller can record them and move on
/// to sibling directories.
pub trait Enumerate: Send + Sync {
    /// List `dir`, classifying each child.
    fn enumerate(&self, dir: &Path) -> Result<Listing, SearchError>;

    /// Resolve the identity of a directory for cycle detection.
    fn identify(&self, dir: &Path) -> io::Result<DirIdentity> {
        dir_identity(dir)
    }
}

/// [`Enumerate`] backed by `std::fs::read_dir`.
#[derive(Debug, Clone, Copy)]
pub struct FsEnumerator {
    follow_symlinks: bool,
}

impl FsEnumerator {
    /// Create an enumerator.
    pub fn new(follow_symlinks: bool) -> Self {
        Self { follow_symlinks }
    }

    fn classify(&self, path: &Path, file_type: fs::FileType) -> EntryKind {
        if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else if file_type.is_symlink() {
            if !self.follow_symlinks {
                return EntryKind::Symlink;
            }
            match fs::metadata(path) {
                Ok(m) if m.is_dir() => EntryKind::Directory,
                Ok(m) if m.is_file() => EntryKind::File,
                Ok(_) => EntryKind::Other,
                // Broken link
                Err(_) => EntryKind::Symlink,
            }
        } else {
            EntryKind::Other
        }
    }
}

impl Default for FsEnumerator {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Enumerate for FsEnumerator {
    fn enumerate(&self, dir: &Path) -> Result<Listing, SearchError> {
        let read_dir = fs::read_dir(dir).map_err(|e| SearchError::from_io(dir, &e))?;

        let mut listing = Listing::default();
        for entry_result in read_dir {
            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    // The iterator may not recover; keep what was read
                    listing.errors.push(SearchError::from_io(dir, &err));
                    break;
                }
            };

            let file_type = match entry.file_type() {
                Ok(t) => t,
                Err(err) => {
                    trace!(path = %entry.path().display(), error = %err, "Skipping entry without file type");
                    continue;
                }
            };

            let path = entry.path();
            let kind = self.classify(&path, file_type);
            let name = CompactString::new(entry.file_name().to_string_lossy());
            listing.entries.push(DirEntryInfo { name, path, kind });
        }

        Ok(listing)
    }
}

/// Resolve the identity of a directory, following symlinks.
#[cfg(unix)]
pub fn dir_identity(path: &Path) -> io::Result<DirIdentity> {
    let metadata = fs::metadata(path)?;
    Ok(DirIdentity::inode(metadata.dev(), metadata.ino()))
}

/// Resolve the identity of a directory, following symlinks.
#[cfg(not(unix))]
pub fn dir_identity(path: &Path) -> io::Result<DirIdentity> {
    // No inodes here; the canonical path is the best identity available
    Ok(DirIdentity::path(fs::canonicalize(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use treeseek_core::ReadErrorKind;

    fn names(entries: &[DirEntryInfo]) -> Vec<(String, EntryKind)> {
        let mut v: Vec<_> = entries
            .iter()
            .map(|e| (e.name.to_string(), e.kind))
            .collect();
        v.sort_by(|a, b| a.0.cmp(&b.0));
        v
    }

    #[test]
    fn test_enumerate_classifies_entries() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();
        fs::write(temp.path().join("file.txt"), "x").unwrap();

        let listing = FsEnumerator::default().enumerate(temp.path()).unwrap();
        assert!(listing.is_complete());
        let entries = listing.entries;
        assert_eq!(
            names(&entries),
            vec![
                ("file.txt".to_string(), EntryKind::File),
                ("sub".to_string(), EntryKind::Directory),
            ]
        );
        assert!(entries.iter().all(|e| e.path.parent() == Some(temp.path())));
    }

    #[test]
    fn test_enumerate_missing_dir_is_read_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("gone");

        let err = FsEnumerator::default().enumerate(&missing).unwrap_err();
        assert_eq!(err.kind, ReadErrorKind::NotFound);
        assert_eq!(err.path, missing);
    }

    #[test]
    fn test_enumerate_file_is_read_error() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("plain");
        fs::write(&file, "x").unwrap();

        let err = FsEnumerator::default().enumerate(&file).unwrap_err();
        assert_eq!(err.path, file);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_classification() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("real")).unwrap();
        std::os::unix::fs::symlink(temp.path().join("real"), temp.path().join("link")).unwrap();
        std::os::unix::fs::symlink(temp.path().join("nowhere"), temp.path().join("broken"))
            .unwrap();

        let followed = FsEnumerator::new(true).enumerate(temp.path()).unwrap().entries;
        assert_eq!(
            names(&followed),
            vec![
                ("broken".to_string(), EntryKind::Symlink),
                ("link".to_string(), EntryKind::Directory),
                ("real".to_string(), EntryKind::Directory),
            ]
        );

        let unfollowed = FsEnumerator::new(false).enumerate(temp.path()).unwrap().entries;
        assert_eq!(
            names(&unfollowed),
            vec![
                ("broken".to_string(), EntryKind::Symlink),
                ("link".to_string(), EntryKind::Symlink),
                ("real".to_string(), EntryKind::Directory),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_identity_through_symlink() {
        let temp = TempDir::new().unwrap();
        let real = temp.path().join("real");
        let link = temp.path().join("link");
        fs::create_dir(&real).unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        assert_eq!(dir_identity(&real).unwrap(), dir_identity(&link).unwrap());
        assert_ne!(
            dir_identity(&real).unwrap(),
            dir_identity(temp.path()).unwrap()
        );
    }
}
