//! Operator-facing report.
//!
//! Everything the operator reads goes through [`Reporter`] to stdout. Logs
//! go to stderr through `tracing` and never mix with this output.

use std::fmt::Write as _;
use std::io::{self, IsTerminal as _, Write};
use std::path::Path;
use std::str::FromStr;

use crate::patch::PatchReport;
use crate::resolve::{EditKind, Review};
use crate::scan::FileFailure;

const RULE_WIDTH: usize = 60;

// ---------------------------------------------------------------------------
// Colour
// ---------------------------------------------------------------------------

/// When to emit ANSI colour codes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorMode {
    /// Colour when stdout is a terminal and `NO_COLOR` is unset.
    #[default]
    Auto,
    /// Always colour.
    Always,
    /// Never colour.
    Never,
}

impl ColorMode {
    /// Whether colour is on for this process.
    #[must_use]
    pub fn enabled(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => {
                std::env::var_os("NO_COLOR").is_none_or(|v| v.is_empty())
                    && io::stdout().is_terminal()
            }
        }
    }
}

impl FromStr for ColorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "always" => Ok(Self::Always),
            "never" => Ok(Self::Never),
            _ => Err(format!("invalid color mode '{s}'. Use: auto, always, or never")),
        }
    }
}

/// ANSI escape sequences, or empty strings when colour is off.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Palette {
    pub bold: &'static str,
    pub dim: &'static str,
    pub underline: &'static str,
    pub gray: &'static str,
    pub red: &'static str,
    pub green: &'static str,
    pub yellow: &'static str,
    pub blue: &'static str,
    pub magenta: &'static str,
    pub cyan: &'static str,
    pub white: &'static str,
    pub reset: &'static str,
}

impl Palette {
    /// Palette with colour on or off.
    #[must_use]
    pub const fn new(enabled: bool) -> Self {
        if enabled {
            Self {
                bold: "\x1b[1m",
                dim: "\x1b[2m",
                underline: "\x1b[4m",
                gray: "\x1b[90m",
                red: "\x1b[91m",
                green: "\x1b[92m",
                yellow: "\x1b[93m",
                blue: "\x1b[34m",
                magenta: "\x1b[95m",
                cyan: "\x1b[36m",
                white: "\x1b[37m",
                reset: "\x1b[0m",
            }
        } else {
            Self::plain()
        }
    }

    /// Palette without any escape codes.
    #[must_use]
    pub const fn plain() -> Self {
        Self {
            bold: "",
            dim: "",
            underline: "",
            gray: "",
            red: "",
            green: "",
            yellow: "",
            blue: "",
            magenta: "",
            cyan: "",
            white: "",
            reset: "",
        }
    }
}

fn rule() -> String {
    "\u{2501}".repeat(RULE_WIDTH)
}

/// Render one duplicate next to its latest occurrence.
#[must_use]
pub fn render_duplicate(p: &Palette, review: &Review<'_>) -> String {
    let Palette {
        bold,
        dim,
        underline,
        yellow,
        green,
        magenta,
        white,
        gray,
        reset,
        ..
    } = *p;
    let dup = review.duplicate.case;
    let latest = review.duplicate.latest;

    let mut s = String::new();
    let _ = writeln!(
        s,
        "\n{magenta}{bold}Duplicate case \"{}\" on \"{}\"{reset} {gray}({}/{}){reset}",
        dup.code, dup.group, review.position, review.total
    );
    let _ = writeln!(
        s,
        "{white}-- Sprint v{} {reset}{yellow}(duplicate){reset} {gray}{}:{}{reset}",
        dup.version, dup.file_name, dup.line
    );
    let _ = writeln!(s, "     {dim}{underline}{}{reset}", dup.title);
    let _ = writeln!(
        s,
        "{white}-- Sprint v{} {reset}{green}[latest version]{reset} {gray}{}:{}{reset}",
        latest.version, latest.file_name, latest.line
    );
    let _ = writeln!(s, "     {dim}{underline}{}{reset}", latest.title);
    s
}

// ---------------------------------------------------------------------------
// Reporter
// ---------------------------------------------------------------------------

/// Writes the run report.
pub struct Reporter<W: Write> {
    out: W,
    palette: Palette,
}

impl<W: Write> Reporter<W> {
    /// Reporter writing to `out`.
    pub const fn new(out: W, palette: Palette) -> Self {
        Self { out, palette }
    }

    /// The palette in use.
    pub const fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Give back the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn header(&mut self) -> io::Result<()> {
        let Palette { cyan, bold, reset, .. } = self.palette;
        writeln!(self.out, "\n{cyan}{bold}Test Case Duplicate Detector{reset}")?;
        writeln!(self.out, "{}", rule())
    }

    pub fn scanning(&mut self, dir: &Path) -> io::Result<()> {
        let Palette { blue, reset, .. } = self.palette;
        writeln!(self.out, "{blue}Scanning directory: {}{reset}", dir.display())
    }

    pub fn no_files(&mut self) -> io::Result<()> {
        writeln!(self.out, "No test files found.")
    }

    pub fn found_files(&mut self, names: &[String]) -> io::Result<()> {
        let Palette { gray, reset, .. } = self.palette;
        writeln!(
            self.out,
            "{gray}Found {} test file(s): {}{reset}",
            names.len(),
            names.join(", ")
        )
    }

    /// Files skipped because they could not be read or parsed.
    pub fn failures(&mut self, failures: &[FileFailure]) -> io::Result<()> {
        let Palette { yellow, bold, reset, .. } = self.palette;
        for failure in failures {
            writeln!(self.out, "{yellow}{bold}Skipped:{reset} {}", failure.error)?;
        }
        Ok(())
    }

    pub fn stats(&mut self, files: usize, cases: usize, duplicates: usize) -> io::Result<()> {
        let Palette { blue, yellow, reset, .. } = self.palette;
        writeln!(self.out, "{blue}\nScan Results:{reset}")?;
        writeln!(self.out, "   Files scanned: {files}")?;
        writeln!(self.out, "   Total test cases: {cases}")?;
        writeln!(self.out, "{yellow}   Duplicates found: {duplicates}{reset}")?;
        writeln!(self.out)
    }

    pub fn clean(&mut self) -> io::Result<()> {
        let Palette { green, bold, reset, .. } = self.palette;
        writeln!(self.out, "{green}{bold}No duplicates found. Your test suite is clean!{reset}")
    }

    pub fn duplicates_intro(&mut self, count: usize) -> io::Result<()> {
        let Palette { red, reset, .. } = self.palette;
        writeln!(self.out, "\nFound {count} duplicate test case(s) to process:")?;
        writeln!(self.out, "{red}Note: Latest version files will not be modified{reset}")?;
        writeln!(self.out, "{}", rule())
    }

    /// List a duplicate without asking about it.
    pub fn duplicate(&mut self, review: &Review<'_>) -> io::Result<()> {
        write!(self.out, "{}", render_duplicate(&self.palette, review))
    }

    /// Per-file summary of the write phase.
    pub fn patch_summary(&mut self, report: &PatchReport) -> io::Result<()> {
        let Palette {
            blue,
            bold,
            magenta,
            white,
            yellow,
            red,
            green,
            reset,
            ..
        } = self.palette;

        if report.files.is_empty() {
            return writeln!(self.out, "\nNo changes were made.");
        }

        writeln!(self.out, "{blue}{bold}\nApplying changes...{reset}")?;
        for file in &report.files {
            if let Some(error) = &file.error {
                writeln!(self.out, "{red}{bold}{} not updated:{reset} {error}", file.file_name)?;
                continue;
            }
            writeln!(
                self.out,
                "{magenta}{} updated ({} modification(s)){reset}",
                file.file_name,
                file.applied.len()
            )?;
            for (code, kind) in &file.applied {
                let color = match kind {
                    EditKind::Skip => yellow,
                    EditKind::Delete => red,
                };
                writeln!(self.out, "{white}- Case {code} {reset}{color}[{kind}]{reset}")?;
            }
        }

        let written = report.written().count();
        if written > 0 {
            writeln!(
                self.out,
                "{green}{bold}\nSuccessfully processed {written} file(s)!{reset}"
            )?;
        }
        let failed = report.failed().count();
        if failed > 0 {
            writeln!(self.out, "{yellow}{bold}{failed} file(s) left untouched.{reset}")?;
        }
        Ok(())
    }

    pub fn done(&mut self) -> io::Result<()> {
        let Palette { cyan, bold, reset, .. } = self.palette;
        writeln!(self.out, "{cyan}{bold}\nAll Done!{reset}")?;
        self.out.flush()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::analyze::Duplicate;
    use crate::error::CleanerError;
    use crate::extract::TestCase;
    use crate::patch::FilePatch;
    use crate::syntax::Modifier;

    fn case(file: &str, version: u64, title: &str) -> TestCase {
        TestCase {
            file: PathBuf::from(file),
            file_name: file.to_owned(),
            version,
            group: "Admin Side".to_owned(),
            code: "10".to_owned(),
            title: title.to_owned(),
            span: 0..1,
            callee: 0..1,
            callee_base: "it".to_owned(),
            modifier: Modifier::None,
            raw: String::new(),
            standalone: true,
            line: 4,
        }
    }

    fn output(f: impl FnOnce(&mut Reporter<Vec<u8>>) -> io::Result<()>) -> String {
        let mut reporter = Reporter::new(Vec::new(), Palette::plain());
        f(&mut reporter).unwrap();
        String::from_utf8(reporter.into_inner()).unwrap()
    }

    #[test]
    fn color_mode_parsing() {
        assert_eq!("ALWAYS".parse::<ColorMode>(), Ok(ColorMode::Always));
        assert_eq!("never".parse::<ColorMode>(), Ok(ColorMode::Never));
        assert!("rainbow".parse::<ColorMode>().is_err());
        assert!(ColorMode::Always.enabled());
        assert!(!ColorMode::Never.enabled());
    }

    #[test]
    fn plain_palette_has_no_escapes() {
        let text = output(|r| {
            r.header()?;
            r.stats(2, 2, 1)?;
            r.done()
        });
        assert!(!text.contains('\x1b'));
        assert!(text.contains("Files scanned: 2"));
        assert!(text.contains("Duplicates found: 1"));
    }

    #[test]
    fn duplicate_shows_both_versions() {
        let dup = case("v1.cy.ts", 1, "10 - Foo");
        let latest = case("v2.cy.ts", 2, "10 - Foo Updated");
        let review = Review {
            position: 1,
            total: 3,
            duplicate: Duplicate {
                case: &dup,
                latest: &latest,
            },
        };
        let text = render_duplicate(&Palette::plain(), &review);
        assert!(text.contains("Duplicate case \"10\" on \"Admin Side\" (1/3)"));
        assert!(text.contains("-- Sprint v1 (duplicate) v1.cy.ts:4"));
        assert!(text.contains("     10 - Foo\n"));
        assert!(text.contains("-- Sprint v2 [latest version]"));
        assert!(text.contains("10 - Foo Updated"));
    }

    #[test]
    fn patch_summary_lists_cases_and_failures() {
        let report = PatchReport {
            files: vec![
                FilePatch {
                    path: PathBuf::from("v1.cy.ts"),
                    file_name: "v1.cy.ts".to_owned(),
                    applied: vec![
                        ("10".to_owned(), EditKind::Skip),
                        ("11".to_owned(), EditKind::Delete),
                    ],
                    error: None,
                },
                FilePatch {
                    path: PathBuf::from("v2.cy.ts"),
                    file_name: "v2.cy.ts".to_owned(),
                    applied: vec![("12".to_owned(), EditKind::Delete)],
                    error: Some(CleanerError::Patch {
                        path: PathBuf::from("v2.cy.ts"),
                        detail: "case 12: text at offset 3 no longer matches".to_owned(),
                    }),
                },
            ],
        };
        let text = output(|r| r.patch_summary(&report));
        assert!(text.contains("v1.cy.ts updated (2 modification(s))"));
        assert!(text.contains("- Case 10 [added skip]"));
        assert!(text.contains("- Case 11 [deleted]"));
        assert!(text.contains("v2.cy.ts not updated"));
        assert!(text.contains("Successfully processed 1 file(s)!"));
        assert!(text.contains("1 file(s) left untouched."));
    }

    #[test]
    fn empty_patch_summary() {
        let text = output(|r| r.patch_summary(&PatchReport::default()));
        assert_eq!(text, "\nNo changes were made.\n");
    }
}
