//! Error types for search operations.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fatal errors that prevent a search from starting.
///
/// Once a search is running, failures are recorded as [`SearchError`]s
/// instead and never abort the run.
#[derive(Debug, Error)]
pub enum StartError {
    /// Root path is missing or unreadable.
    #[error("Invalid root {path}: {source}")]
    InvalidRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Root path is not a directory.
    #[error("Root path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Name pattern failed to compile.
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A worker thread could not be spawned.
    #[error("Failed to spawn worker: {source}")]
    Spawn {
        #[source]
        source: std::io::Error,
    },
}

impl StartError {
    /// Create an invalid root error.
    pub fn invalid_root(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::InvalidRoot {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Check if the root path itself was rejected.
    pub fn is_invalid_root(&self) -> bool {
        matches!(self, Self::InvalidRoot { .. } | Self::NotADirectory { .. })
    }
}

/// Kind of a per-directory failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadErrorKind {
    /// Permission was denied.
    PermissionDenied,
    /// Directory vanished before it could be listed.
    NotFound,
    /// Path is no longer a directory.
    NotADirectory,
    /// Any other I/O failure.
    Io,
    /// The worker processing this directory panicked.
    Aborted,
}

impl ReadErrorKind {
    /// Classify an I/O error.
    pub fn from_io(error: &std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            std::io::ErrorKind::NotFound => Self::NotFound,
            std::io::ErrorKind::NotADirectory => Self::NotADirectory,
            _ => Self::Io,
        }
    }
}

/// Recoverable failure to read one directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{}: {message}", path.display())]
pub struct SearchError {
    /// Directory that could not be read.
    pub path: PathBuf,
    /// Kind of failure.
    pub kind: ReadErrorKind,
    /// Human-readable message.
    pub message: String,
}

impl SearchError {
    /// Create a new search error.
    pub fn new(path: impl Into<PathBuf>, kind: ReadErrorKind, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            message: message.into(),
        }
    }

    /// Create a read error from an I/O failure.
    pub fn from_io(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        Self::new(path, ReadErrorKind::from_io(error), format!("Read error: {error}"))
    }

    /// Create a permission denied error.
    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            message: format!("Permission denied: {}", path.display()),
            path,
            kind: ReadErrorKind::PermissionDenied,
        }
    }

    /// Record a directory abandoned by a panicking worker.
    pub fn aborted(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            message: format!("Worker panicked while reading {}", path.display()),
            path,
            kind: ReadErrorKind::Aborted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_error_from_io() {
        let err = SearchError::from_io(
            "/test/path",
            &std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.kind, ReadErrorKind::PermissionDenied);
        assert!(err.message.contains("denied"));

        let err = SearchError::from_io(
            "/test/gone",
            &std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.kind, ReadErrorKind::NotFound);
    }

    #[test]
    fn test_start_error_root_grouping() {
        let err = StartError::invalid_root(
            "/missing",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert!(err.is_invalid_root());
        assert!(StartError::NotADirectory { path: "/etc/hosts".into() }.is_invalid_root());
        assert!(!StartError::invalid_config("threads").is_invalid_root());
    }

    #[test]
    fn test_search_error_display() {
        let err = SearchError::permission_denied("/root/secret");
        assert_eq!(err.to_string(), "/root/secret: Permission denied: /root/secret");
    }
}
