//! Sprint directory scanning.
//!
//! Lists the versioned sprint files in a directory, derives each file's
//! version ordinal from its name (`v<digits>` right before the suffix), and
//! loads the raw text. Files that cannot be read are reported individually
//! and do not stop the scan.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::{ConfigError, SprintConfig};
use crate::error::CleanerError;

/// One sprint file, loaded into memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestFile {
    /// Full path to the file.
    pub path: PathBuf,
    /// File name (the last path component), used for display.
    pub name: String,
    /// Version parsed from the file name; `0` when the name carries none.
    pub version: u64,
    /// File contents as read at scan time.
    pub text: String,
}

/// A file that was skipped because of a per-file error.
#[derive(Debug)]
pub struct FileFailure {
    /// The file that failed.
    pub path: PathBuf,
    /// What went wrong.
    pub error: CleanerError,
}

/// Everything read from a sprint directory.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Files read successfully, in scan order.
    pub files: Vec<TestFile>,
    /// Files that matched but could not be read.
    pub failures: Vec<FileFailure>,
}

/// Parse the version ordinal out of a sprint file name.
///
/// `sprint-v12.cy.ts` → 12. Names without a `v<digits>` marker directly
/// before `suffix` (or with a number too large to represent) yield 0.
#[must_use]
pub fn version_ordinal(file_name: &str, suffix: &str) -> u64 {
    let Some(stem) = file_name.strip_suffix(suffix) else {
        return 0;
    };
    let prefix = stem.trim_end_matches(|c: char| c.is_ascii_digit());
    let digits = &stem[prefix.len()..];
    if digits.is_empty() || !prefix.ends_with('v') {
        return 0;
    }
    digits.parse().unwrap_or(0)
}

/// List candidate sprint files in `dir`, sorted by file name.
///
/// Matches every regular file ending in the configured suffix except the
/// base fixture file.
///
/// # Errors
/// Returns [`CleanerError::DirectoryNotFound`] if `dir` is not a directory.
pub fn list_candidates(dir: &Path, sprint: &SprintConfig) -> Result<Vec<PathBuf>, CleanerError> {
    if !dir.is_dir() {
        return Err(CleanerError::DirectoryNotFound {
            path: dir.to_owned(),
        });
    }

    let pattern = format!(
        "{}/*{}",
        glob::Pattern::escape(&dir.to_string_lossy()),
        glob::Pattern::escape(&sprint.suffix)
    );
    let entries = glob::glob(&pattern).map_err(|e| {
        CleanerError::Config(ConfigError {
            path: None,
            message: format!("invalid sprint file pattern '{pattern}': {e}"),
        })
    })?;

    let mut candidates = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) => {
                let is_base = path
                    .file_name()
                    .is_some_and(|name| name.to_string_lossy() == sprint.base_file.as_str());
                if is_base {
                    debug!(path = %path.display(), "skipping base file");
                    continue;
                }
                if path.is_file() {
                    candidates.push(path);
                }
            }
            Err(e) => warn!(path = %e.path().display(), error = %e.error(), "unreadable directory entry"),
        }
    }
    Ok(candidates)
}

/// Read every candidate sprint file in `dir`.
///
/// # Errors
/// Returns [`CleanerError::DirectoryNotFound`] if `dir` is not a directory.
/// Unreadable files are collected in [`ScanOutcome::failures`] instead.
pub fn scan_dir(dir: &Path, sprint: &SprintConfig) -> Result<ScanOutcome, CleanerError> {
    let mut outcome = ScanOutcome::default();

    for path in list_candidates(dir, sprint)? {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                let version = version_ordinal(&name, &sprint.suffix);
                debug!(file = %name, version, bytes = text.len(), "read sprint file");
                outcome.files.push(TestFile {
                    path,
                    name,
                    version,
                    text,
                });
            }
            Err(e) => {
                warn!(file = %name, error = %e, "failed to read sprint file");
                outcome.failures.push(FileFailure {
                    error: CleanerError::io(path.clone(), e),
                    path,
                });
            }
        }
    }

    Ok(outcome)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
