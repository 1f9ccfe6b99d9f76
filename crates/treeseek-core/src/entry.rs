//! Traversal tasks, directory entries and matches.

use std::path::{Path, PathBuf};

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// One directory waiting to be enumerated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Directory to list.
    pub path: PathBuf,
    /// Distance from the search root (root = 0).
    pub depth: u32,
}

impl Task {
    /// Create a task for a directory at the given depth.
    pub fn new(path: impl Into<PathBuf>, depth: u32) -> Self {
        Self {
            path: path.into(),
            depth,
        }
    }

    /// Create the root task.
    pub fn root(path: impl Into<PathBuf>) -> Self {
        Self::new(path, 0)
    }

    /// Depth of the entries found inside this directory.
    pub fn child_depth(&self) -> u32 {
        self.depth + 1
    }
}

/// Kind of a directory entry as reported by the enumerator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory, or a symlink resolved to one when symlinks are followed.
    Directory,
    /// Symbolic link that is not followed, or whose target is missing.
    Symlink,
    /// Sockets, fifos, devices.
    Other,
}

impl EntryKind {
    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory)
    }
}

/// One immediate child of an enumerated directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    /// File name of the entry.
    pub name: CompactString,
    /// Parent path joined with `name`.
    pub path: PathBuf,
    /// Entry kind.
    pub kind: EntryKind,
}

impl DirEntryInfo {
    /// Create a new entry.
    pub fn new(name: impl Into<CompactString>, path: impl Into<PathBuf>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind,
        }
    }

    /// Check if this entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Check if this entry is a dot-file.
    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }
}

/// Identity of a directory used for cycle detection.
///
/// On unix this is the `(device, inode)` pair of the resolved directory, so
/// two paths reaching the same directory through symlinks compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DirIdentity {
    /// Device and inode number.
    Inode { device: u64, inode: u64 },
    /// Canonical, symlink-free path.
    Path(PathBuf),
}

impl DirIdentity {
    /// Create an inode-based identity.
    pub fn inode(device: u64, inode: u64) -> Self {
        Self::Inode { device, inode }
    }

    /// Create a path-based identity.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// Device id, when known.
    pub fn device(&self) -> Option<u64> {
        match self {
            Self::Inode { device, .. } => Some(*device),
            Self::Path(_) => None,
        }
    }
}

/// An entry that satisfied the search predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Match {
    /// Path of the entry as reached by traversal.
    pub path: PathBuf,
    /// Depth of the entry (children of the root are at depth 1).
    pub depth: u32,
}

impl Match {
    /// Create a new match.
    pub fn new(path: impl Into<PathBuf>, depth: u32) -> Self {
        Self {
            path: path.into(),
            depth,
        }
    }

    /// Path of the matched entry.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
