//! Search progress reporting.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;

/// Progress information during a search.
#[derive(Debug, Clone)]
pub struct SearchProgress {
    /// Number of directories enumerated so far.
    pub dirs_scanned: u64,
    /// Number of entries seen so far.
    pub entries_seen: u64,
    /// Number of matches so far.
    pub matches_found: u64,
    /// Number of unreadable directories so far.
    pub errors_count: u64,
    /// Directory most recently finished.
    pub current_path: PathBuf,
    /// Time elapsed since the search started.
    pub elapsed: Duration,
}

impl SearchProgress {
    /// Create initial progress state.
    pub fn new() -> Self {
        Self {
            dirs_scanned: 0,
            entries_seen: 0,
            matches_found: 0,
            errors_count: 0,
            current_path: PathBuf::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Calculate search rate in directories per second.
    pub fn dirs_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.dirs_scanned as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

impl Default for SearchProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared counters updated by every worker.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    start_time: Instant,
    interval: u64,
    dirs_scanned: AtomicU64,
    entries_seen: AtomicU64,
    dirs_skipped: AtomicU64,
    matches_found: AtomicU64,
    errors_count: AtomicU64,
    tx: broadcast::Sender<SearchProgress>,
}

impl ProgressTracker {
    pub fn new(interval: u64, tx: broadcast::Sender<SearchProgress>) -> Self {
        Self {
            start_time: Instant::now(),
            interval: interval.max(1),
            dirs_scanned: AtomicU64::new(0),
            entries_seen: AtomicU64::new(0),
            dirs_skipped: AtomicU64::new(0),
            matches_found: AtomicU64::new(0),
            errors_count: AtomicU64::new(0),
            tx,
        }
    }

    /// Record one enumerated directory, publishing a snapshot every `interval` directories.
    pub fn record_dir(&self, path: &Path, entries: u64, matches: u64) {
        self.entries_seen.fetch_add(entries, Ordering::Relaxed);
        self.matches_found.fetch_add(matches, Ordering::Relaxed);
        let dirs = self.dirs_scanned.fetch_add(1, Ordering::Relaxed) + 1;
        if dirs % self.interval == 0 {
            self.publish(path);
        }
    }

    pub fn record_skip(&self) {
        self.dirs_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dirs_scanned(&self) -> u64 {
        self.dirs_scanned.load(Ordering::Relaxed)
    }

    pub fn entries_seen(&self) -> u64 {
        self.entries_seen.load(Ordering::Relaxed)
    }

    pub fn dirs_skipped(&self) -> u64 {
        self.dirs_skipped.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Broadcast the current counters. Having no subscribers is fine.
    pub fn publish(&self, current_path: &Path) {
        let _ = self.tx.send(self.snapshot(current_path));
    }

    pub fn snapshot(&self, current_path: &Path) -> SearchProgress {
        SearchProgress {
            dirs_scanned: self.dirs_scanned.load(Ordering::Relaxed),
            entries_seen: self.entries_seen.load(Ordering::Relaxed),
            matches_found: self.matches_found.load(Ordering::Relaxed),
            errors_count: self.errors_count.load(Ordering::Relaxed),
            current_path: current_path.to_path_buf(),
            elapsed: self.start_time.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_per_second() {
        let progress = SearchProgress {
            dirs_scanned: 500,
            elapsed: Duration::from_secs(5),
            ..SearchProgress::new()
        };
        assert!((progress.dirs_per_second() - 100.0).abs() < 0.1);
        assert_eq!(SearchProgress::new().dirs_per_second(), 0.0);
    }

    #[test]
    fn test_publishes_every_interval() {
        let (tx, mut rx) = broadcast::channel(16);
        let tracker = ProgressTracker::new(2, tx);

        tracker.record_dir(Path::new("/r"), 3, 0);
        assert!(rx.try_recv().is_err());

        tracker.record_dir(Path::new("/r/a"), 4, 1);
        let snapshot = rx.try_recv().unwrap();
        assert_eq!(snapshot.dirs_scanned, 2);
        assert_eq!(snapshot.entries_seen, 7);
        assert_eq!(snapshot.matches_found, 1);
        assert_eq!(snapshot.current_path, PathBuf::from("/r/a"));
    }
}
