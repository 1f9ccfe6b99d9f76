//! Search configuration types.

use std::path::{Path, PathBuf};
use std::time::Duration;

use derive_builder::Builder;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::entry::EntryKind;
use crate::error::StartError;
use crate::pattern::NamePattern;

/// Which entry kinds the name predicate is applied to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// Regular files, plus symlinks left unresolved (unfollowed or broken).
    #[default]
    Files,
    /// Directories only.
    Directories,
    /// Every entry.
    Any,
}

impl MatchKind {
    /// Check if an entry of the given kind is eligible for matching.
    pub fn accepts(&self, kind: EntryKind) -> bool {
        match self {
            Self::Files => matches!(kind, EntryKind::File | EntryKind::Symlink),
            Self::Directories => kind.is_dir(),
            Self::Any => true,
        }
    }
}

/// Configuration for a search.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct SearchConfig {
    /// Root directory to search.
    pub root: PathBuf,

    /// Name pattern entries are matched against. Required unless a custom
    /// predicate is supplied when starting the search.
    #[builder(default)]
    #[serde(default)]
    pub pattern: Option<NamePattern>,

    /// Maximum entry depth (None = unlimited). Children of the root are at depth 1.
    #[builder(default)]
    #[serde(default)]
    pub max_depth: Option<u32>,

    /// Number of worker threads (0 = auto-detect).
    #[builder(default = "0")]
    #[serde(default)]
    pub threads: usize,

    /// Traverse symbolic links that point at directories.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub follow_symlinks: bool,

    /// Include hidden entries (starting with .).
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub include_hidden: bool,

    /// Glob patterns for entry names to skip entirely.
    #[builder(default)]
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Which entry kinds may match.
    #[builder(default)]
    #[serde(default)]
    pub match_kind: MatchKind,

    /// Cancel the search automatically after this long.
    #[builder(default)]
    #[serde(default)]
    pub timeout: Option<Duration>,

    /// Publish a progress snapshot every N directories.
    #[builder(default = "64")]
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
}

fn default_true() -> bool {
    true
}

fn default_progress_interval() -> u64 {
    64
}

impl SearchConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.root {
            Some(ref root) if root.as_os_str().is_empty() => {
                return Err("Root path cannot be empty".to_string());
            }
            None => return Err("Root path is required".to_string()),
            _ => {}
        }
        if self.progress_interval == Some(0) {
            return Err("Progress interval must be positive".to_string());
        }
        Ok(())
    }
}

impl SearchConfig {
    /// Create a new search config builder.
    pub fn builder() -> SearchConfigBuilder {
        SearchConfigBuilder::default()
    }

    /// Create a simple config searching `root` for `pattern`.
    pub fn new(root: impl Into<PathBuf>, pattern: NamePattern) -> Self {
        Self {
            pattern: Some(pattern),
            ..Self::with_root(root)
        }
    }

    /// Create a config with no pattern, for use with a custom predicate.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            pattern: None,
            max_depth: None,
            threads: 0,
            follow_symlinks: true,
            include_hidden: true,
            ignore_patterns: Vec::new(),
            match_kind: MatchKind::Files,
            timeout: None,
            progress_interval: default_progress_interval(),
        }
    }

    /// Parse a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, StartError> {
        let config: Self =
            toml::from_str(text).map_err(|e| StartError::invalid_config(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    /// Load a config from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StartError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            StartError::invalid_config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Validate a config that was not produced by the builder.
    pub fn check(&self) -> Result<(), StartError> {
        if self.root.as_os_str().is_empty() {
            return Err(StartError::invalid_config("Root path cannot be empty"));
        }
        if self.progress_interval == 0 {
            return Err(StartError::invalid_config("Progress interval must be positive"));
        }
        Ok(())
    }

    /// Number of workers to start, resolving 0 to the available parallelism.
    pub fn worker_count(&self) -> usize {
        match self.threads {
            0 => num_cpus::get().max(1),
            n => n,
        }
    }

    /// Check if an entry at `depth` lies within the depth limit.
    pub fn within_depth(&self, depth: u32) -> bool {
        self.max_depth.is_none_or(|max| depth <= max)
    }

    /// Check if a directory at `depth` may be descended into.
    ///
    /// Its children would sit at `depth + 1`, so it is only enqueued while that
    /// stays within the limit.
    pub fn may_descend(&self, depth: u32) -> bool {
        self.max_depth.is_none_or(|max| depth < max)
    }

    /// Check if hidden entries should be skipped.
    pub fn should_skip_hidden(&self, name: &str) -> bool {
        !self.include_hidden && name.starts_with('.')
    }

    /// Compile the ignore patterns into a glob set.
    pub fn ignore_set(&self) -> Result<GlobSet, StartError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.ignore_patterns {
            let glob = Glob::new(pattern).map_err(|e| StartError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
            builder.add(glob);
        }
        builder
            .build()
            .map_err(|e| StartError::invalid_config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = SearchConfig::builder()
            .root("/home/user")
            .pattern(Some(NamePattern::exact("notes.md")))
            .threads(4usize)
            .max_depth(Some(3u32))
            .follow_symlinks(false)
            .build()
            .unwrap();

        assert_eq!(config.root, PathBuf::from("/home/user"));
        assert_eq!(config.threads, 4);
        assert_eq!(config.max_depth, Some(3));
        assert!(!config.follow_symlinks);
        assert!(config.include_hidden);
        assert_eq!(config.progress_interval, 64);
    }

    #[test]
    fn test_builder_requires_root() {
        let missing_root = SearchConfig::builder()
            .pattern(Some(NamePattern::exact("x")))
            .build();
        assert!(missing_root.is_err());
        assert!(SearchConfig::builder().root("").build().is_err());

        let config = SearchConfig::builder().root("/tmp").build().unwrap();
        assert!(config.pattern.is_none());
    }

    #[test]
    fn test_config_simple() {
        let config = SearchConfig::new("/srv", NamePattern::exact("a"));
        assert_eq!(config.threads, 0);
        assert!(config.worker_count() >= 1);
        assert!(config.follow_symlinks);
        assert_eq!(config.match_kind, MatchKind::Files);
    }

    #[test]
    fn test_depth_limits() {
        let mut config = SearchConfig::new("/srv", NamePattern::exact("a"));
        assert!(config.within_depth(1000));
        assert!(config.may_descend(1000));

        config.max_depth = Some(2);
        assert!(config.within_depth(2));
        assert!(!config.within_depth(3));
        assert!(config.may_descend(1));
        assert!(!config.may_descend(2));
    }

    #[test]
    fn test_should_skip_hidden() {
        let mut config = SearchConfig::new("/test", NamePattern::exact("a"));
        assert!(!config.should_skip_hidden(".git"));

        config.include_hidden = false;
        assert!(config.should_skip_hidden(".git"));
        assert!(!config.should_skip_hidden("src"));
    }

    #[test]
    fn test_ignore_set() {
        let mut config = SearchConfig::new("/test", NamePattern::exact("a"));
        config.ignore_patterns = vec!["node_modules".to_string(), "*.log".to_string()];
        let set = config.ignore_set().unwrap();

        assert!(set.is_match("node_modules"));
        assert!(set.is_match("build.log"));
        assert!(!set.is_match("src"));
    }

    #[test]
    fn test_match_kind() {
        assert!(MatchKind::Files.accepts(EntryKind::File));
        assert!(MatchKind::Files.accepts(EntryKind::Symlink));
        assert!(!MatchKind::Files.accepts(EntryKind::Directory));
        assert!(!MatchKind::Files.accepts(EntryKind::Other));
        assert!(!MatchKind::Directories.accepts(EntryKind::Other));
        assert!(MatchKind::Directories.accepts(EntryKind::Directory));
        assert!(MatchKind::Any.accepts(EntryKind::Other));
    }

    #[test]
    fn test_from_toml() {
        let config = SearchConfig::from_toml_str(
            r#"
            root = "/var/log"
            max_depth = 4
            threads = 2
            ignore_patterns = ["*.gz"]
            match_kind = "any"

            [pattern]
            mode = "glob"
            value = "*.log"
            "#,
        )
        .unwrap();

        assert_eq!(config.root, PathBuf::from("/var/log"));
        assert_eq!(config.pattern, Some(NamePattern::glob("*.log")));
        assert_eq!(config.max_depth, Some(4));
        assert_eq!(config.match_kind, MatchKind::Any);
        assert!(config.follow_symlinks);

        let bare = SearchConfig::from_toml_str("root = \"/x\"").unwrap();
        assert!(bare.pattern.is_none());
        assert!(SearchConfig::from_toml_str("threads = 2").is_err());
    }
}
