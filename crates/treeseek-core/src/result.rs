//! Search result container and statistics.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::entry::Match;
use crate::error::SearchError;

/// Lifecycle of one search invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum SearchState {
    /// Configured but not started.
    Idle = 0,
    /// Workers are traversing.
    Running = 1,
    /// Every task was processed.
    Completed = 2,
    /// Stopped early by a cancel request or deadline.
    Cancelled = 3,
}

impl SearchState {
    /// Decode a state stored as `u8`.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Running,
            2 => Self::Completed,
            _ => Self::Cancelled,
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// Summary statistics for a search run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Directories enumerated successfully.
    pub dirs_scanned: u64,
    /// Entries seen across all enumerated directories.
    pub entries_seen: u64,
    /// Subdirectories skipped as already visited or on another device.
    pub dirs_skipped: u64,
    /// Tasks left in the queue when the run was cancelled.
    pub tasks_abandoned: u64,
    /// Number of workers that ran.
    pub workers: usize,
    /// Wall-clock duration of the run.
    pub duration: Duration,
}

impl SearchStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Final, immutable outcome of a search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Resolved root that was searched.
    pub root: PathBuf,

    /// Matches in discovery order.
    pub matches: Vec<Match>,

    /// Directories that could not be read.
    pub errors: Vec<SearchError>,

    /// False when the run was cancelled before finishing.
    pub completed: bool,

    /// Terminal state of the run.
    pub state: SearchState,

    /// Summary statistics.
    pub stats: SearchStats,
}

impl SearchResult {
    /// Create a new search result.
    pub fn new(
        root: PathBuf,
        matches: Vec<Match>,
        errors: Vec<SearchError>,
        state: SearchState,
        stats: SearchStats,
    ) -> Self {
        Self {
            root,
            matches,
            errors,
            completed: state == SearchState::Completed,
            state,
            stats,
        }
    }

    /// Check if anything matched.
    pub fn has_matches(&self) -> bool {
        !self.matches.is_empty()
    }

    /// Check if any directory failed to read.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Paths of all matches.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.matches.iter().map(|m| m.path.as_path())
    }

    /// Match paths as a set, for order-independent comparison.
    pub fn path_set(&self) -> HashSet<PathBuf> {
        self.paths().map(Path::to_path_buf).collect()
    }
}
