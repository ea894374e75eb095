//! Error handling module for mypkgs
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Parsers are best-effort, so only whole-file failures surface here; malformed
//! lines and stanzas are skipped where they are found.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::SourceKind;

/// Main error type for mypkgs
#[derive(Error, Debug)]
pub enum MypkgsError {
    /// A data source file could not be opened or read
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Log discovery pattern errors
    #[error("Glob error: {0}")]
    Glob(String),

    /// Configuration errors (loading, parsing, validation)
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Every data source failed; nothing can be reported
    #[error("no package data sources were readable:\n{}", FailureList(.failures))]
    NoSources { failures: Vec<SourceFailure> },
}

/// Result type alias for mypkgs operations
pub type Result<T> = std::result::Result<T, MypkgsError>;

impl MypkgsError {
    /// Create a read error for `path`
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// A data source that could not be used during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFailure {
    pub source: SourceKind,
    pub path: PathBuf,
    pub reason: String,
}

impl SourceFailure {
    pub fn new(source: SourceKind, path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            source,
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.source, self.path.display(), self.reason)
    }
}

struct FailureList<'a>(&'a [SourceFailure]);

impl fmt::Display for FailureList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  {}", failure)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MypkgsError::config("extended_states path is empty");
        assert_eq!(
            err.to_string(),
            "Configuration error: extended_states path is empty"
        );
    }

    #[test]
    fn test_read_error_names_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = MypkgsError::read("/var/lib/dpkg/status", io_err);
        assert!(matches!(err, MypkgsError::Read { .. }));
        assert!(err.to_string().contains("/var/lib/dpkg/status"));
    }

    #[test]
    fn test_no_sources_lists_every_path() {
        let err = MypkgsError::NoSources {
            failures: vec![
                SourceFailure::new(SourceKind::ExtendedStates, "/a/extended_states", "missing"),
                SourceFailure::new(SourceKind::Status, "/a/status", "permission denied"),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("extended_states (/a/extended_states): missing"));
        assert!(msg.contains("status (/a/status): permission denied"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: MypkgsError = json_err.into();
        assert!(matches!(err, MypkgsError::Json(_)));
    }
}
