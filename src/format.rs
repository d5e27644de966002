use anyhow::{Result, bail};
use serde::Serialize;
use std::str::FromStr;

use crate::session::SprintScan;

/// Output format for the scan report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Coloured, human-readable report
    #[default]
    Text,
    /// JSON - machine-parseable, report only
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => bail!("Invalid format '{}'. Use: text or json", s),
        }
    }
}

impl OutputFormat {
    /// Serialize data to the requested format
    pub fn serialize<T: Serialize>(self, data: &T) -> Result<String> {
        match self {
            Self::Json => serde_json::to_string_pretty(data)
                .map_err(|e| anyhow::anyhow!("JSON serialization failed: {}", e)),
            Self::Text => {
                // Text goes through the reporter
                bail!("Text format should not use serialize()")
            }
        }
    }
}

/// Machine-readable scan result.
#[derive(Debug, Serialize)]
pub struct ScanEnvelope {
    /// Sprint directory that was scanned.
    pub dir: String,
    /// Every sprint file name found, sorted.
    pub files: Vec<String>,
    /// Test cases extracted from the files that parsed.
    pub total_cases: usize,
    /// Files skipped because they could not be read or parsed.
    pub failures: Vec<FailureEntry>,
    /// Older copies of cases that a newer sprint also declares.
    pub duplicates: Vec<DuplicateEntry>,
}

/// A file that was skipped.
#[derive(Debug, Serialize)]
pub struct FailureEntry {
    /// Path of the file.
    pub file: String,
    /// Why it was skipped.
    pub error: String,
}

/// One duplicate test case.
#[derive(Debug, Serialize)]
pub struct DuplicateEntry {
    /// Resolved group title.
    pub group: String,
    /// Case code taken from the title.
    pub code: String,
    /// File holding this copy.
    pub file: String,
    /// Sprint version of that file.
    pub version: u64,
    /// 1-based line of the declaration.
    pub line: usize,
    /// Resolved test title.
    pub title: String,
    /// True if this copy is already `.skip`.
    pub skipped: bool,
    /// The copy this one is superseded by.
    pub latest: LatestEntry,
}

/// Latest occurrence of a duplicated case.
#[derive(Debug, Serialize)]
pub struct LatestEntry {
    /// File holding the latest copy.
    pub file: String,
    /// Sprint version of that file.
    pub version: u64,
    /// 1-based line of the declaration.
    pub line: usize,
    /// Resolved test title.
    pub title: String,
}

impl ScanEnvelope {
    /// Envelope for a finished scan.
    #[must_use]
    pub fn new(scan: &SprintScan) -> Self {
        Self {
            dir: scan.dir.display().to_string(),
            files: scan.file_names.clone(),
            total_cases: scan.analysis.cases().len(),
            failures: scan
                .failures
                .iter()
                .map(|f| FailureEntry {
                    file: f.path.display().to_string(),
                    error: f.error.to_string(),
                })
                .collect(),
            duplicates: scan
                .analysis
                .duplicates()
                .map(|d| DuplicateEntry {
                    group: d.case.group.clone(),
                    code: d.case.code.clone(),
                    file: d.case.file_name.clone(),
                    version: d.case.version,
                    line: d.case.line,
                    title: d.case.title.clone(),
                    skipped: d.case.is_skipped(),
                    latest: LatestEntry {
                        file: d.latest.file_name.clone(),
                        version: d.latest.version,
                        line: d.latest.line,
                        title: d.latest.title.clone(),
                    },
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_formats() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("toon".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn text_does_not_serialize() {
        assert!(OutputFormat::Text.serialize(&1).is_err());
    }

    #[test]
    fn json_is_pretty() {
        let out = OutputFormat::Json
            .serialize(&serde_json::json!({"a": 1}))
            .unwrap();
        assert_eq!(out, "{\n  \"a\": 1\n}");
    }
}
