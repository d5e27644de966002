//! One run of the pipeline: scan, extract, analyze, then resolve and patch.
//!
//! All reading and parsing happens in [`scan_sprint`]. [`reconcile`] asks
//! about every duplicate first and only then writes, so an interrupted
//! prompt never leaves a file half-processed.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::analyze::Analysis;
use crate::config::SprintConfig;
use crate::error::CleanerError;
use crate::extract::extract;
use crate::patch::{PatchReport, patch_files};
use crate::resolve::{Prompter, Resolution, resolve_duplicates};
use crate::scan::{FileFailure, scan_dir};
use crate::symbols::SymbolTable;
use crate::syntax::SuiteParser;

/// The read-only result of scanning a sprint directory.
#[derive(Debug)]
pub struct SprintScan {
    /// The scanned directory.
    pub dir: PathBuf,
    /// Names of every candidate file, in scan order.
    pub file_names: Vec<String>,
    /// Files skipped because they could not be read or parsed.
    pub failures: Vec<FileFailure>,
    /// Tracked cases and duplicates.
    pub analysis: Analysis,
}

/// Scan `dir` and analyze every file that reads and parses cleanly.
///
/// # Errors
/// Returns [`CleanerError::DirectoryNotFound`] if `dir` does not exist.
/// Per-file problems end up in [`SprintScan::failures`].
pub fn scan_sprint(
    dir: &Path,
    sprint: &SprintConfig,
    symbols: &SymbolTable,
    parser: &dyn SuiteParser,
) -> Result<SprintScan, CleanerError> {
    let outcome = scan_dir(dir, sprint)?;
    let mut failures = outcome.failures;
    let mut file_names: Vec<String> = outcome.files.iter().map(|f| f.name.clone()).collect();
    file_names.extend(failures.iter().filter_map(|f| {
        f.path.file_name().map(|n| n.to_string_lossy().into_owned())
    }));
    file_names.sort();

    let mut cases = Vec::new();
    for file in &outcome.files {
        match extract(file, parser, symbols) {
            Ok(found) => cases.extend(found),
            Err(error) => {
                warn!(file = %file.name, %error, "skipping file");
                failures.push(FileFailure {
                    path: file.path.clone(),
                    error,
                });
            }
        }
    }

    let analysis = Analysis::new(cases);
    info!(
        dir = %dir.display(),
        files = file_names.len(),
        failed = failures.len(),
        cases = analysis.cases().len(),
        duplicates = analysis.duplicate_count(),
        "scan complete"
    );
    Ok(SprintScan {
        dir: dir.to_owned(),
        file_names,
        failures,
        analysis,
    })
}

/// Decisions and what writing them did.
#[derive(Debug)]
pub struct Reconciliation {
    /// Every decision, the staged edits and the tally.
    pub resolution: Resolution,
    /// Per-file outcome of writing the staged edits.
    pub patches: PatchReport,
}

/// Ask about every duplicate, then write all staged edits.
///
/// # Errors
/// Propagates the prompter's error. Nothing has been written in that case.
pub fn reconcile(scan: &SprintScan, prompter: &mut dyn Prompter) -> Result<Reconciliation, CleanerError> {
    let resolution = resolve_duplicates(&scan.analysis, prompter)?;
    info!(edits = resolution.edits.len(), "decisions collected, writing");
    let patches = patch_files(resolution.edits.clone());
    Ok(Reconciliation {
        resolution,
        patches,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
