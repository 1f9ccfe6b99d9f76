//! Search coordinator: owns one run's shared state, starts the worker pool
//! and hands the caller a [`SearchHandle`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use globset::GlobSet;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use treeseek_core::{
    DirEntryInfo, Match, NamePredicate, SearchConfig, SearchResult, SearchState, SearchStats,
    StartError, Task,
};

use crate::aggregator::ResultAggregator;
use crate::enumerator::{Enumerate, FsEnumerator};
use crate::progress::{ProgressTracker, SearchProgress};
use crate::queue::TaskQueue;
use crate::visited::VisitedTracker;
use crate::worker::worker_loop;

/// State shared by the coordinator and every worker of one run.
pub(crate) struct SearchRun {
    pub config: SearchConfig,
    pub root: PathBuf,
    root_device: Option<u64>,
    pub predicate: Box<dyn NamePredicate>,
    ignore: GlobSet,
    pub enumerator: Arc<dyn Enumerate>,
    pub queue: TaskQueue,
    pub visited: VisitedTracker,
    pub results: ResultAggregator,
    pub progress: ProgressTracker,
    cancel: CancellationToken,
    state: AtomicU8,
    live_workers: AtomicUsize,
    duration: Mutex<Option<Duration>>,
}

impl SearchRun {
    pub fn state(&self) -> SearchState {
        SearchState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn transition(&self, from: SearchState, to: SearchState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Called once the last in-flight task completes.
    pub fn finish(&self) {
        if self.transition(SearchState::Running, SearchState::Completed) {
            debug!(root = %self.root.display(), "All tasks processed");
        }
        self.queue.close();
    }

    /// Request an early stop. A no-op once the run has completed.
    pub fn cancel(&self) {
        if self.transition(SearchState::Running, SearchState::Cancelled) {
            info!(root = %self.root.display(), "Search cancelled");
            self.cancel.cancel();
            self.queue.close();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Hidden and ignored entries are neither matched nor descended into.
    pub fn should_skip(&self, entry: &DirEntryInfo) -> bool {
        self.config.should_skip_hidden(&entry.name) || self.ignore.is_match(entry.name.as_str())
    }

    /// Check if a directory lives on a different device than the root.
    pub fn crosses_device(&self, device: Option<u64>) -> bool {
        matches!((self.root_device, device), (Some(root), Some(dev)) if root != dev)
    }

    /// Called by each worker on its way out; the last one closes the match stream.
    pub fn worker_exited(&self) {
        if self.live_workers.fetch_sub(1, Ordering::SeqCst) == 1 {
            *self.duration.lock() = Some(self.progress.elapsed());
            self.results.close_stream();
            self.progress.publish(&self.root);
        }
    }
}

/// Parallel directory-tree searcher.
pub struct Searcher {
    progress_tx: broadcast::Sender<SearchProgress>,
    enumerator: Option<Arc<dyn Enumerate>>,
}

impl Searcher {
    /// Create a new searcher listing directories with `std::fs`.
    pub fn new() -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self {
            progress_tx,
            enumerator: None,
        }
    }

    /// Use a custom directory lister instead of the filesystem one.
    pub fn with_enumerator(mut self, enumerator: impl Enumerate + 'static) -> Self {
        self.enumerator = Some(Arc::new(enumerator));
        self
    }

    /// Subscribe to search progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<SearchProgress> {
        self.progress_tx.subscribe()
    }

    /// Start a search using the config's name pattern.
    pub fn start(&self, config: &SearchConfig) -> Result<SearchHandle, StartError> {
        let pattern = config
            .pattern
            .as_ref()
            .ok_or_else(|| StartError::invalid_config("No name pattern configured"))?;
        let predicate = pattern.compile()?;
        self.start_with(config, predicate)
    }

    /// Start a search with a caller-supplied predicate. The config's pattern is ignored.
    ///
    /// The root is resolved to its canonical path first. Fails before any
    /// worker starts if the root is missing, unreadable, or not a directory.
    pub fn start_with(
        &self,
        config: &SearchConfig,
        predicate: impl NamePredicate + 'static,
    ) -> Result<SearchHandle, StartError> {
        config.check()?;
        let ignore = config.ignore_set()?;

        let root = std::fs::canonicalize(&config.root)
            .map_err(|e| StartError::invalid_root(&config.root, e))?;
        let metadata = std::fs::metadata(&root).map_err(|e| StartError::invalid_root(&root, e))?;
        if !metadata.is_dir() {
            return Err(StartError::NotADirectory { path: root });
        }
        // Opening the root up front turns an unreadable root into a fatal error
        std::fs::read_dir(&root).map_err(|e| StartError::invalid_root(&root, e))?;

        let enumerator = self
            .enumerator
            .clone()
            .unwrap_or_else(|| Arc::new(FsEnumerator::new(config.follow_symlinks)));
        let root_identity = enumerator
            .identify(&root)
            .map_err(|e| StartError::invalid_root(&root, e))?;

        let worker_count = config.worker_count();
        let deadline = config.timeout.map(|t| Instant::now() + t);

        let mut config = config.clone();
        config.root = root.clone();

        let run = Arc::new(SearchRun {
            root: root.clone(),
            root_device: root_identity.device(),
            predicate: Box::new(predicate),
            ignore,
            enumerator,
            queue: TaskQueue::with_deadline(deadline),
            visited: VisitedTracker::new(),
            results: ResultAggregator::new(),
            progress: ProgressTracker::new(config.progress_interval, self.progress_tx.clone()),
            cancel: CancellationToken::new(),
            state: AtomicU8::new(SearchState::Idle as u8),
            live_workers: AtomicUsize::new(0),
            duration: Mutex::new(None),
            config,
        });

        info!(
            root = %root.display(),
            workers = worker_count,
            max_depth = ?run.config.max_depth,
            "Starting search"
        );

        run.visited.try_visit(root_identity);
        run.state.store(SearchState::Running as u8, Ordering::SeqCst);
        run.queue.push(Task::root(&root));

        let mut workers = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            run.live_workers.fetch_add(1, Ordering::SeqCst);
            let worker_run = Arc::clone(&run);
            let spawned = thread::Builder::new()
                .name(format!("treeseek-{id}"))
                .spawn(move || worker_loop(id, worker_run));

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(source) => {
                    error!(worker = id, error = %source, "Failed to spawn worker");
                    run.live_workers.fetch_sub(1, Ordering::SeqCst);
                    run.cancel();
                    join_all(workers);
                    return Err(StartError::Spawn { source });
                }
            }
        }

        Ok(SearchHandle { run, workers })
    }

    /// Run a search to the end and return its result.
    pub fn search(&self, config: &SearchConfig) -> Result<SearchResult, StartError> {
        Ok(self.start(config)?.wait())
    }
}

impl Default for Searcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a running search.
///
/// Dropping the handle without calling [`wait`](Self::wait) cancels the
/// search and joins its workers.
pub struct SearchHandle {
    run: Arc<SearchRun>,
    workers: Vec<JoinHandle<()>>,
}

impl SearchHandle {
    /// Request an early stop. Idempotent; does nothing after completion.
    pub fn cancel(&self) {
        self.run.cancel();
    }

    /// Current state of the run.
    pub fn state(&self) -> SearchState {
        self.run.state()
    }

    /// Check if every worker has exited.
    pub fn is_finished(&self) -> bool {
        self.run.live_workers.load(Ordering::SeqCst) == 0
    }

    /// Number of distinct directories scheduled so far, root included.
    pub fn visited_count(&self) -> usize {
        self.run.visited.len()
    }

    /// Root being searched.
    pub fn root(&self) -> &Path {
        &self.run.root
    }

    /// Stream of matches as they are discovered.
    ///
    /// Returns `Some` on the first call only. Matches found before the call
    /// come first. The stream ends when the run reaches a terminal state.
    pub fn matches(&mut self) -> Option<MatchStream> {
        let rx = self.run.results.take_stream()?;
        Some(MatchStream { rx })
    }

    /// Block until the run completes or is cancelled, then return the result.
    pub fn wait(mut self) -> SearchResult {
        self.join();

        let run = &self.run;
        run.queue.drain_abandoned();
        let state = match run.state() {
            SearchState::Completed => SearchState::Completed,
            _ => SearchState::Cancelled,
        };

        let (matches, errors) = run.results.snapshot();
        let stats = SearchStats {
            dirs_scanned: run.progress.dirs_scanned(),
            entries_seen: run.progress.entries_seen(),
            dirs_skipped: run.progress.dirs_skipped(),
            tasks_abandoned: run.queue.stats().abandoned(),
            workers: run.config.worker_count(),
            duration: run.duration.lock().unwrap_or_else(|| run.progress.elapsed()),
        };

        info!(
            root = %run.root.display(),
            matches = matches.len(),
            errors = errors.len(),
            dirs = stats.dirs_scanned,
            completed = state == SearchState::Completed,
            duration_ms = stats.duration.as_millis() as u64,
            "Search finished"
        );

        SearchResult::new(run.root.clone(), matches, errors, state, stats)
    }

    fn join(&mut self) {
        join_all(std::mem::take(&mut self.workers));
    }
}

impl Drop for SearchHandle {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.run.cancel();
            self.join();
        }
    }
}

fn join_all(workers: Vec<JoinHandle<()>>) {
    for handle in workers {
        if handle.join().is_err() {
            error!("Worker thread panicked outside of task processing");
        }
    }
}

/// Blocking iterator over matches as workers find them.
///
/// Finite: it ends once the search reaches a terminal state. Not
/// restartable; a new search is needed to iterate again.
pub struct MatchStream {
    rx: Receiver<Match>,
}

impl MatchStream {
    /// Wait at most `timeout` for the next match.
    ///
    /// Returns `None` on timeout or when the stream has ended.
    pub fn next_timeout(&self, timeout: Duration) -> Option<Match> {
        self.rx.recv_timeout(timeout).ok()
    }
}

impl Iterator for MatchStream {
    type Item = Match;

    fn next(&mut self) -> Option<Match> {
        self.rx.recv().ok()
    }
}

/// Start a search of `root` with a caller-supplied predicate.
///
/// `concurrency` of 0 uses the available parallelism.
pub fn start_search(
    root: impl Into<PathBuf>,
    predicate: impl NamePredicate + 'static,
    max_depth: Option<u32>,
    concurrency: usize,
) -> Result<SearchHandle, StartError> {
    let mut config = SearchConfig::with_root(root);
    config.max_depth = max_depth;
    config.threads = concurrency;
    Searcher::new().start_with(&config, predicate)
}

/// Search `root` to the end with a caller-supplied predicate.
pub fn search(
    root: impl Into<PathBuf>,
    predicate: impl NamePredicate + 'static,
    max_depth: Option<u32>,
    concurrency: usize,
) -> Result<SearchResult, StartError> {
    Ok(start_search(root, predicate, max_depth, concurrency)?.wait())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use treeseek_core::NamePattern;

    fn create_test_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        fs::create_dir(root.join("dir1")).unwrap();
        fs::create_dir(root.join("dir2")).unwrap();
        fs::create_dir(root.join("dir1/subdir")).unwrap();

        fs::write(root.join("file1.txt"), "hello").unwrap();
        fs::write(root.join("dir1/file2.txt"), "world").unwrap();
        fs::write(root.join("dir1/subdir/file3.txt"), "test").unwrap();
        fs::write(root.join("dir2/file4.log"), "another").unwrap();

        temp
    }

    #[test]
    fn test_basic_search() {
        let temp = create_test_tree();
        let config = SearchConfig::new(temp.path(), NamePattern::glob("*.txt"));

        let result = Searcher::new().search(&config).unwrap();

        assert!(result.completed);
        assert_eq!(result.state, SearchState::Completed);
        assert_eq!(result.matches.len(), 3);
        assert!(result.errors.is_empty());
        assert_eq!(result.stats.dirs_scanned, 4);
    }

    #[test]
    fn test_missing_pattern_rejected() {
        let temp = create_test_tree();
        let config = SearchConfig::with_root(temp.path());

        let err = Searcher::new().start(&config).err().unwrap();
        assert!(matches!(err, StartError::InvalidConfig { .. }));
    }

    #[test]
    fn test_cancel_after_completion_is_noop() {
        let temp = create_test_tree();
        let handle = start_search(temp.path(), |n: &str| n == "file3.txt", None, 2).unwrap();

        while !handle.is_finished() {
            thread::sleep(Duration::from_millis(5));
        }
        handle.cancel();
        handle.cancel();

        let result = handle.wait();
        assert!(result.completed);
        assert_eq!(result.matches.len(), 1);
    }

    #[test]
    fn test_ignore_patterns() {
        let temp = create_test_tree();
        let mut config = SearchConfig::new(temp.path(), NamePattern::glob("file*"));
        config.ignore_patterns = vec!["dir1".to_string()];

        let result = Searcher::new().search(&config).unwrap();

        let names: Vec<_> = result
            .paths()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"file1.txt".to_string()));
        assert!(names.contains(&"file4.log".to_string()));
    }

    #[test]
    fn test_progress_final_snapshot() {
        let temp = create_test_tree();
        let searcher = Searcher::new();
        let mut rx = searcher.subscribe();
        let config = SearchConfig::new(temp.path(), NamePattern::exact("file1.txt"));

        let result = searcher.search(&config).unwrap();

        let mut last = None;
        while let Ok(progress) = rx.try_recv() {
            last = Some(progress);
        }
        let last = last.unwrap();
        assert_eq!(last.dirs_scanned, result.stats.dirs_scanned);
        assert_eq!(last.matches_found, 1);
    }
}
