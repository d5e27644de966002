//! Error types for sprint-cleaner.
//!
//! Defines [`CleanerError`], the unified error type for every stage of a run
//! (scan, parse, patch). Messages are written for the operator: each variant
//! says what went wrong and, where there is something to do about it, how to
//! fix it.

use std::fmt;
use std::path::PathBuf;

use crate::config::ConfigError;

// ---------------------------------------------------------------------------
// CleanerError
// ---------------------------------------------------------------------------

/// Unified error type for sprint-cleaner operations.
#[derive(Debug)]
pub enum CleanerError {
    /// No sprint directory was given on the command line, in the
    /// environment, or in configuration.
    NoDirectory,

    /// The sprint directory does not exist.
    DirectoryNotFound {
        /// The directory that was looked up.
        path: PathBuf,
    },

    /// A source file could not be parsed into a clean syntax tree.
    Parse {
        /// The file that failed to parse.
        path: PathBuf,
        /// Human-readable description (usually the first error location).
        detail: String,
    },

    /// Reading or writing a file failed.
    Io {
        /// The file being read or written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Planned edits no longer fit the file on disk.
    Patch {
        /// The file being patched.
        path: PathBuf,
        /// What did not match.
        detail: String,
    },

    /// A configuration file could not be loaded or parsed.
    Config(ConfigError),

    /// The operator interaction failed (closed input, cancelled prompt).
    Interaction(String),
}

impl CleanerError {
    /// Wrap an I/O error with the path it happened on.
    pub const fn io(path: PathBuf, source: std::io::Error) -> Self {
        Self::Io { path, source }
    }

    /// True for errors that concern a single file and must not stop the
    /// rest of the run.
    #[must_use]
    pub const fn is_per_file(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::Io { .. } | Self::Patch { .. })
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for CleanerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDirectory => write!(
                f,
                "no sprint directory provided.\n  To fix: pass --dir <path>, set SPRINT_DIR, or add\n    [sprint]\n    dir = \"<path>\"\n  to sprint-cleaner.toml"
            ),
            Self::DirectoryNotFound { path } => write!(
                f,
                "sprint directory does not exist: {}\n  To fix: check the path passed with --dir or configured as sprint.dir",
                path.display()
            ),
            Self::Parse { path, detail } => {
                write!(f, "failed to parse {}: {detail}", path.display())
            }
            Self::Io { path, source } => write!(f, "I/O error on {}: {source}", path.display()),
            Self::Patch { path, detail } => write!(
                f,
                "cannot patch {}: {detail}\n  To fix: the file changed since it was scanned; run sprint-cleaner again",
                path.display()
            ),
            Self::Config(e) => write!(f, "{e}"),
            Self::Interaction(msg) => write!(f, "prompt failed: {msg}"),
        }
    }
}

impl std::error::Error for CleanerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for CleanerError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn no_directory_mentions_every_source() {
        let msg = CleanerError::NoDirectory.to_string();
        assert!(msg.contains("--dir"));
        assert!(msg.contains("SPRINT_DIR"));
        assert!(msg.contains("sprint-cleaner.toml"));
    }

    #[test]
    fn directory_not_found_shows_path() {
        let err = CleanerError::DirectoryNotFound {
            path: PathBuf::from("/nope/sprint"),
        };
        assert!(err.to_string().contains("/nope/sprint"));
        assert!(!err.is_per_file());
    }

    #[test]
    fn io_error_keeps_source() {
        let err = CleanerError::io(
            PathBuf::from("v1.cy.ts"),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.is_per_file());
        assert!(err.source().is_some());
        assert!(err.to_string().contains("v1.cy.ts"));
    }

    #[test]
    fn parse_error_is_per_file() {
        let err = CleanerError::Parse {
            path: PathBuf::from("v2.cy.ts"),
            detail: "syntax error at line 3".to_owned(),
        };
        assert!(err.is_per_file());
        assert_eq!(
            err.to_string(),
            "failed to parse v2.cy.ts: syntax error at line 3"
        );
    }
}
