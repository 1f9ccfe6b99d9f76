//! Core types for treeseek.
//!
//! This crate provides the data structures shared by the search engine and
//! its front ends: configuration, name patterns, traversal tasks, matches,
//! error records and the final search result.

mod config;
mod entry;
mod error;
mod pattern;
mod result;

pub use config::{MatchKind, SearchConfig, SearchConfigBuilder};
pub use entry::{DirEntryInfo, DirIdentity, EntryKind, Match, Task};
pub use error::{ReadErrorKind, SearchError, StartError};
pub use pattern::{CompiledPattern, NamePattern, NamePredicate};
pub use result::{SearchResult, SearchState, SearchStats};
