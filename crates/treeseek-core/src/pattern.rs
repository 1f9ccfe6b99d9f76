//! Entry name predicates.

use globset::{Glob, GlobMatcher};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::StartError;

/// Decides whether an entry name is a match.
///
/// Implemented for any `Fn(&str) -> bool + Send + Sync`, so closures can be
/// passed wherever a predicate is expected.
pub trait NamePredicate: Send + Sync {
    /// Check a single entry name (not a path).
    fn matches(&self, name: &str) -> bool;
}

impl<F> NamePredicate for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn matches(&self, name: &str) -> bool {
        self(name)
    }
}

/// Serializable description of a name predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "lowercase")]
pub enum NamePattern {
    /// Name equals the string exactly.
    Exact(String),
    /// Shell glob such as `*.rs` or `Cargo.{toml,lock}`.
    Glob(String),
    /// Regular expression searched in the name.
    Regex(String),
}

impl NamePattern {
    /// Create an exact-name pattern.
    pub fn exact(name: impl Into<String>) -> Self {
        Self::Exact(name.into())
    }

    /// Create a glob pattern.
    pub fn glob(glob: impl Into<String>) -> Self {
        Self::Glob(glob.into())
    }

    /// Create a regex pattern.
    pub fn regex(regex: impl Into<String>) -> Self {
        Self::Regex(regex.into())
    }

    /// The raw pattern text.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Exact(s) | Self::Glob(s) | Self::Regex(s) => s,
        }
    }

    /// Compile into a predicate.
    pub fn compile(&self) -> Result<CompiledPattern, StartError> {
        let invalid = |message: String| StartError::InvalidPattern {
            pattern: self.as_str().to_string(),
            message,
        };

        if self.as_str().is_empty() {
            return Err(invalid("pattern is empty".to_string()));
        }

        match self {
            Self::Exact(name) => Ok(CompiledPattern::Exact(name.clone())),
            Self::Glob(glob) => {
                let matcher = Glob::new(glob)
                    .map_err(|e| invalid(e.to_string()))?
                    .compile_matcher();
                Ok(CompiledPattern::Glob(matcher))
            }
            Self::Regex(regex) => {
                let regex = Regex::new(regex).map_err(|e| invalid(e.to_string()))?;
                Ok(CompiledPattern::Regex(regex))
            }
        }
    }
}

/// A compiled [`NamePattern`].
#[derive(Debug, Clone)]
pub enum CompiledPattern {
    Exact(String),
    Glob(GlobMatcher),
    Regex(Regex),
}

impl NamePredicate for CompiledPattern {
    fn matches(&self, name: &str) -> bool {
        match self {
            Self::Exact(expected) => name == expected,
            Self::Glob(matcher) => matcher.is_match(name),
            Self::Regex(regex) => regex.is_match(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact() {
        let pattern = NamePattern::exact("target.txt").compile().unwrap();
        assert!(pattern.matches("target.txt"));
        assert!(!pattern.matches("target.txt.bak"));
        assert!(!pattern.matches("Target.txt"));
    }

    #[test]
    fn test_glob() {
        let pattern = NamePattern::glob("*.{rs,toml}").compile().unwrap();
        assert!(pattern.matches("main.rs"));
        assert!(pattern.matches("Cargo.toml"));
        assert!(!pattern.matches("README.md"));
    }

    #[test]
    fn test_regex() {
        let pattern = NamePattern::regex(r"^test\d+\.txt$").compile().unwrap();
        assert!(pattern.matches("test2.txt"));
        assert!(!pattern.matches("test.txt"));
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(matches!(
            NamePattern::regex("(unclosed").compile(),
            Err(StartError::InvalidPattern { .. })
        ));
        assert!(matches!(
            NamePattern::glob("a[").compile(),
            Err(StartError::InvalidPattern { .. })
        ));
        assert!(NamePattern::exact("").compile().is_err());
    }

    #[test]
    fn test_closure_predicate() {
        let predicate = |name: &str| name.ends_with(".log");
        assert!(predicate.matches("app.log"));
        assert!(!predicate.matches("app.txt"));
    }
}
