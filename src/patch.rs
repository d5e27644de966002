//! Source patching.
//!
//! Edits are grouped by file and applied in one pass per file, sorted by
//! descending start offset so that applying an edit never shifts the offsets
//! of the edits still to come. Before anything is written, every edit's span
//! is checked against the text it was planned from; a file whose contents
//! moved in the meantime is left untouched and reported.
//!
//! Files are written through a temporary file in the same directory and
//! renamed over the original. A failure on one file does not stop the others.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::CleanerError;
use crate::resolve::{Edit, EditKind};

/// Why a set of edits cannot be applied to a text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatchError {
    /// The span lies outside the text or splits a character.
    OutOfBounds {
        /// Case code of the edit.
        code: String,
        /// Span start.
        start: usize,
        /// Span end.
        end: usize,
    },
    /// The span no longer holds the text the edit was planned from.
    Stale {
        /// Case code of the edit.
        code: String,
        /// Span start.
        start: usize,
    },
    /// Two edits touch the same bytes.
    Overlap {
        /// Case code of the earlier edit.
        first: String,
        /// Case code of the later edit.
        second: String,
    },
}

impl fmt::Display for PatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds { code, start, end } => {
                write!(f, "case {code}: span {start}..{end} is outside the file")
            }
            Self::Stale { code, start } => {
                write!(f, "case {code}: text at offset {start} no longer matches")
            }
            Self::Overlap { first, second } => {
                write!(f, "edits for case {first} and case {second} overlap")
            }
        }
    }
}

impl std::error::Error for PatchError {}

/// Apply `edits` to `text`, all offsets referring to `text`.
///
/// # Errors
/// Returns [`PatchError`] if a span is out of bounds, does not hold the
/// edit's original text, or overlaps another edit. Nothing is applied then.
pub fn apply_edits(text: &str, edits: &[Edit]) -> Result<String, PatchError> {
    let mut ordered: Vec<&Edit> = edits.iter().collect();
    ordered.sort_by(|a, b| b.start.cmp(&a.start));

    for edit in &ordered {
        let Some(current) = text.get(edit.start..edit.end) else {
            return Err(PatchError::OutOfBounds {
                code: edit.code.clone(),
                start: edit.start,
                end: edit.end,
            });
        };
        if current != edit.original {
            return Err(PatchError::Stale {
                code: edit.code.clone(),
                start: edit.start,
            });
        }
    }
    for pair in ordered.windows(2) {
        let (later, earlier) = (pair[0], pair[1]);
        if earlier.end > later.start {
            return Err(PatchError::Overlap {
                first: earlier.code.clone(),
                second: later.code.clone(),
            });
        }
    }

    let mut out = text.to_owned();
    for edit in ordered {
        out.replace_range(edit.start..edit.end, &edit.replacement);
    }
    Ok(out)
}

/// What was done to one file.
#[derive(Debug)]
pub struct FilePatch {
    /// The file.
    pub path: PathBuf,
    /// File name, for display.
    pub file_name: String,
    /// (case code, kind) of each edit, in source order.
    pub applied: Vec<(String, EditKind)>,
    /// Why the file was left untouched, if it was.
    pub error: Option<CleanerError>,
}

impl FilePatch {
    /// True if the file was rewritten.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of the write phase.
#[derive(Debug, Default)]
pub struct PatchReport {
    /// One entry per file with edits, sorted by path.
    pub files: Vec<FilePatch>,
}

impl PatchReport {
    /// Files rewritten successfully.
    pub fn written(&self) -> impl Iterator<Item = &FilePatch> {
        self.files.iter().filter(|f| f.is_ok())
    }

    /// Files left untouched because of an error.
    pub fn failed(&self) -> impl Iterator<Item = &FilePatch> {
        self.files.iter().filter(|f| !f.is_ok())
    }
}

/// Apply all `edits`, one file at a time.
#[must_use]
pub fn patch_files(edits: Vec<Edit>) -> PatchReport {
    let mut by_file: BTreeMap<PathBuf, Vec<Edit>> = BTreeMap::new();
    for edit in edits {
        by_file.entry(edit.file.clone()).or_default().push(edit);
    }

    let mut report = PatchReport::default();
    for (path, mut edits) in by_file {
        edits.sort_by_key(|e| e.start);
        let file_name = edits
            .first()
            .map(|e| e.file_name.clone())
            .unwrap_or_default();
        let applied = edits.iter().map(|e| (e.code.clone(), e.kind)).collect();

        let error = match patch_file(&path, &edits) {
            Ok(()) => {
                info!(file = %file_name, edits = edits.len(), "file updated");
                None
            }
            Err(e) => {
                warn!(file = %file_name, error = %e, "file left untouched");
                Some(e)
            }
        };
        report.files.push(FilePatch {
            path,
            file_name,
            applied,
            error,
        });
    }
    report
}

fn patch_file(path: &Path, edits: &[Edit]) -> Result<(), CleanerError> {
    let text = std::fs::read_to_string(path).map_err(|e| CleanerError::io(path.to_owned(), e))?;
    let patched = apply_edits(&text, edits).map_err(|e| CleanerError::Patch {
        path: path.to_owned(),
        detail: e.to_string(),
    })?;
    write_atomic(path, &patched)
}

fn write_atomic(path: &Path, contents: &str) -> Result<(), CleanerError> {
    let io_err = |e: std::io::Error| CleanerError::io(path.to_owned(), e);
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let permissions = std::fs::metadata(path).map_err(io_err)?.permissions();

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(contents.as_bytes()).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    std::fs::set_permissions(tmp.path(), permissions).map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
