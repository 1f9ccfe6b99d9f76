//! Directory identity tracking for cycle prevention.

use dashmap::DashSet;
use treeseek_core::DirIdentity;

/// Tracks directories already scheduled for traversal.
///
/// A symlink loop or a bind-mounted directory reaches the same identity
/// through different paths; only the first path to claim it is traversed.
#[derive(Debug, Default)]
pub struct VisitedTracker {
    seen: DashSet<DirIdentity>,
}

impl VisitedTracker {
    /// Create a new visited tracker.
    pub fn new() -> Self {
        Self {
            seen: DashSet::new(),
        }
    }

    /// Claim a directory. Returns `true` if this is the first time seeing it.
    ///
    /// Check and insert happen under the same shard lock, so two workers
    /// racing on one identity never both get `true`.
    pub fn try_visit(&self, identity: DirIdentity) -> bool {
        self.seen.insert(identity)
    }

    /// Check if a directory has been claimed (without claiming it).
    pub fn contains(&self, identity: &DirIdentity) -> bool {
        self.seen.contains(identity)
    }

    /// Get the number of directories claimed.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Check if nothing has been claimed.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
