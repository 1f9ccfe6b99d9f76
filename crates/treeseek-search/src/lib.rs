//! Concurrent directory-tree search engine for treeseek.
//!
//! # Overview
//!
//! `treeseek-search` walks a directory tree with a fixed pool of worker
//! threads and collects every entry whose name satisfies a predicate.
//!
//! - **Task queue** of pending directories with blocking pop and in-flight
//!   counting, so the run ends exactly when the last directory is processed
//! - **Visited tracking** by device and inode, so symlink loops terminate
//! - **Per-directory errors** are recorded and never abort sibling work
//! - **Cooperative cancellation**, explicit or by deadline
//! - **Streaming matches** and progress updates via broadcast channels
//!
//! # Example
//!
//! ```rust,no_run
//! use treeseek_search::{NamePattern, SearchConfig, Searcher};
//!
//! let config = SearchConfig::new("/path/to/search", NamePattern::glob("*.toml"));
//! let result = Searcher::new().search(&config).unwrap();
//!
//! for m in &result.matches {
//!     println!("{} (depth {})", m.path.display(), m.depth);
//! }
//! println!("{} unreadable directories", result.errors.len());
//! ```
//!
//! # Streaming and cancellation
//!
//! ```rust,no_run
//! use treeseek_search::start_search;
//!
//! let mut handle = start_search("/", |name: &str| name == "core", None, 0).unwrap();
//! let stream = handle.matches().unwrap();
//!
//! for (i, m) in stream.enumerate() {
//!     println!("{}", m.path.display());
//!     if i == 9 {
//!         handle.cancel();
//!     }
//! }
//!
//! let result = handle.wait();
//! assert!(result.matches.len() >= 10 || result.completed);
//! ```

mod aggregator;
mod coordinator;
mod enumerator;
mod progress;
mod queue;
mod visited;
mod worker;

pub use aggregator::ResultAggregator;
pub use coordinator::{MatchStream, SearchHandle, Searcher, search, start_search};
pub use enumerator::{Enumerate, FsEnumerator, Listing, dir_identity};
pub use progress::SearchProgress;
pub use queue::{Pop, QueueStats, TaskQueue};
pub use visited::VisitedTracker;

// Re-export core types for convenience
pub use treeseek_core::{
    CompiledPattern, DirEntryInfo, DirIdentity, EntryKind, Match, MatchKind, NamePattern,
    NamePredicate, ReadErrorKind, SearchConfig, SearchError, SearchResult, SearchState,
    SearchStats, StartError, Task,
};
