//! Duplicate analysis.
//!
//! Pass 1 builds the [`LatestIndex`]: for each (group, case code) the record
//! with the strictly greatest version ordinal, first-seen winning ties. Pass 2
//! flags every record whose file differs from its key's latest record.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::extract::{CaseKey, TestCase};

/// (group, case code) → index of the authoritative record.
#[derive(Clone, Debug, Default)]
pub struct LatestIndex {
    entries: HashMap<CaseKey, usize>,
}

impl LatestIndex {
    /// Build the index over `cases` in order.
    #[must_use]
    pub fn build(cases: &[TestCase]) -> Self {
        let mut entries: HashMap<CaseKey, usize> = HashMap::new();
        for (i, case) in cases.iter().enumerate() {
            let key = case.key();
            match entries.get(&key) {
                Some(&current) if cases[current].version >= case.version => {
                    if cases[current].version == case.version && cases[current].file != case.file {
                        debug!(
                            key = %key,
                            kept = %cases[current].file_name,
                            other = %case.file_name,
                            "version tie, first seen stays latest"
                        );
                    }
                }
                _ => {
                    entries.insert(key, i);
                }
            }
        }
        Self { entries }
    }

    /// Index of the latest record for `key`.
    #[must_use]
    pub fn get(&self, key: &CaseKey) -> Option<usize> {
        self.entries.get(key).copied()
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no keys are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A duplicate record paired with its key's authoritative record.
#[derive(Clone, Copy, Debug)]
pub struct Duplicate<'a> {
    /// The outdated occurrence.
    pub case: &'a TestCase,
    /// The latest occurrence.
    pub latest: &'a TestCase,
}

/// All records of a run plus the latest index and the duplicates.
#[derive(Clone, Debug, Default)]
pub struct Analysis {
    cases: Vec<TestCase>,
    latest: LatestIndex,
    duplicates: Vec<usize>,
}

impl Analysis {
    /// Analyze `cases` (all files concatenated, in scan order).
    #[must_use]
    pub fn new(cases: Vec<TestCase>) -> Self {
        let latest = LatestIndex::build(&cases);
        let mut duplicates = Vec::new();
        let mut seen_in_file: HashMap<(CaseKey, PathBuf), usize> = HashMap::new();

        for (i, case) in cases.iter().enumerate() {
            let key = case.key();
            if let Some(&first) = seen_in_file.get(&(key.clone(), case.file.clone())) {
                warn!(
                    key = %key,
                    file = %case.file_name,
                    first_line = cases[first].line,
                    line = case.line,
                    "case declared more than once in the same file"
                );
            } else {
                seen_in_file.insert((key.clone(), case.file.clone()), i);
            }

            let Some(latest) = latest.get(&key) else {
                continue;
            };
            if cases[latest].file != case.file {
                duplicates.push(i);
            }
        }

        debug!(
            cases = cases.len(),
            keys = latest.len(),
            duplicates = duplicates.len(),
            "analysis complete"
        );
        Self {
            cases,
            latest,
            duplicates,
        }
    }

    /// Every tracked record, in scan order.
    #[must_use]
    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    /// The latest index.
    #[must_use]
    pub const fn latest_index(&self) -> &LatestIndex {
        &self.latest
    }

    /// The authoritative record for `key`.
    #[must_use]
    pub fn latest(&self, key: &CaseKey) -> Option<&TestCase> {
        self.latest.get(key).map(|i| &self.cases[i])
    }

    /// Number of duplicates.
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.duplicates.len()
    }

    /// Duplicates in encounter order, each with its latest record.
    pub fn duplicates(&self) -> impl Iterator<Item = Duplicate<'_>> {
        self.duplicates.iter().filter_map(|&i| {
            let case = &self.cases[i];
            let latest = self.latest(&case.key())?;
            Some(Duplicate { case, latest })
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
