//! Test case extraction.
//!
//! Turns one sprint file into [`TestCase`] records: every test declaration
//! inside a group whose resolved title starts with a case code
//! (`"42 - ..."`). Declarations outside any group, or without a case code,
//! are not tracked.

use std::fmt;
use std::ops::Range;
use std::path::PathBuf;

use tracing::debug;

use crate::error::CleanerError;
use crate::scan::TestFile;
use crate::symbols::SymbolTable;
use crate::syntax::{Modifier, SuiteParser};
use crate::title::case_code;

/// Group name used when a group title is not a literal.
pub const UNKNOWN_GROUP: &str = "Unknown";

/// Identity of a logical test case across sprint files.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CaseKey {
    /// Resolved name of the innermost enclosing group.
    pub group: String,
    /// Numeric case code from the title.
    pub code: String,
}

impl fmt::Display for CaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "case {} on \"{}\"", self.code, self.group)
    }
}

/// One tracked test declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestCase {
    /// File the declaration lives in.
    pub file: PathBuf,
    /// File name, for display.
    pub file_name: String,
    /// Version ordinal of the file.
    pub version: u64,
    /// Resolved name of the innermost enclosing group.
    pub group: String,
    /// Case code from the resolved title.
    pub code: String,
    /// Resolved title.
    pub title: String,
    /// Byte range of the declaration in the original text, leading trivia
    /// included.
    pub span: Range<usize>,
    /// Byte range of the callee (`it`, `it.only`, ...) in the original text.
    pub callee: Range<usize>,
    /// Callee base name (`it` or `specify`).
    pub callee_base: String,
    /// Callee modifier as written in source.
    pub modifier: Modifier,
    /// Exact original text of `span`.
    pub raw: String,
    /// True when the declaration is a statement of its own.
    pub standalone: bool,
    /// 1-based line of the call.
    pub line: usize,
}

impl TestCase {
    /// The (group, case code) identity.
    #[must_use]
    pub fn key(&self) -> CaseKey {
        CaseKey {
            group: self.group.clone(),
            code: self.code.clone(),
        }
    }

    /// True if the source already marks the declaration inert (`.skip`).
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.modifier == Modifier::Skip
    }
}

/// Extract the tracked test cases of `file`.
///
/// # Errors
/// Returns [`CleanerError::Parse`] if the file does not parse cleanly, or if
/// the declaration spans it yields overlap (which would make patching
/// unsafe).
pub fn extract(
    file: &TestFile,
    parser: &dyn SuiteParser,
    symbols: &SymbolTable,
) -> Result<Vec<TestCase>, CleanerError> {
    let outline = parser.outline(&file.text).map_err(|e| CleanerError::Parse {
        path: file.path.clone(),
        detail: e.detail,
    })?;

    let group_names: Vec<String> = outline
        .groups
        .iter()
        .map(|g| {
            g.title
                .as_ref()
                .map_or_else(|| UNKNOWN_GROUP.to_owned(), |t| t.resolve(symbols))
        })
        .collect();

    let mut cases = Vec::new();
    for decl in &outline.tests {
        let Some(group) = decl.group.and_then(|g| group_names.get(g)) else {
            continue;
        };
        let Some(title) = decl.title.as_ref().map(|t| t.resolve(symbols)) else {
            continue;
        };
        let Some(code) = case_code(&title) else {
            debug!(file = %file.name, line = decl.line, title = %title, "no case code, not tracked");
            continue;
        };
        let Some(raw) = file.text.get(decl.span.clone()) else {
            return Err(span_error(file, decl.line, "declaration span is out of bounds"));
        };
        cases.push(TestCase {
            file: file.path.clone(),
            file_name: file.name.clone(),
            version: file.version,
            group: group.clone(),
            code: code.to_owned(),
            title: title.clone(),
            span: decl.span.clone(),
            callee: decl.callee.clone(),
            callee_base: decl.base.clone(),
            modifier: decl.modifier,
            raw: raw.to_owned(),
            standalone: decl.standalone,
            line: decl.line,
        });
    }

    check_disjoint(file, &cases)?;
    debug!(file = %file.name, tracked = cases.len(), "extracted test cases");
    Ok(cases)
}

/// Spans must come in source order without overlap.
fn check_disjoint(file: &TestFile, cases: &[TestCase]) -> Result<(), CleanerError> {
    for pair in cases.windows(2) {
        if pair[1].span.start < pair[0].span.end {
            return Err(span_error(
                file,
                pair[1].line,
                &format!("declaration overlaps the one on line {}", pair[0].line),
            ));
        }
    }
    Ok(())
}

fn span_error(file: &TestFile, line: usize, what: &str) -> CleanerError {
    CleanerError::Parse {
        path: file.path.clone(),
        detail: format!("line {line}: {what}"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
