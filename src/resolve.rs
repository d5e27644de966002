//! Duplicate resolution.
//!
//! Walks the duplicates in order, asks a [`Prompter`] for one [`Decision`]
//! per duplicate, and turns each decision into an [`Edit`] against the
//! original file text. Nothing is written here; edits are applied later in
//! one batch by [`crate::patch`].

use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::{info, warn};

use crate::analyze::{Analysis, Duplicate};
use crate::error::CleanerError;
use crate::extract::TestCase;

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// What the operator wants done with one duplicate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Decision {
    /// Mark the declaration inert (`it.skip`).
    Skip,
    /// Remove the declaration.
    Delete,
    /// Keep it unchanged.
    Leave,
}

impl Decision {
    /// Every choice, in menu order.
    pub const ALL: [Self; 3] = [Self::Skip, Self::Delete, Self::Leave];

    /// Menu label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Skip => "Add .skip to this test",
            Self::Delete => "Delete this test entirely",
            Self::Leave => "Leave it as is",
        }
    }

    /// Single-key shortcut.
    #[must_use]
    pub const fn key(self) -> char {
        match self {
            Self::Skip => 's',
            Self::Delete => 'd',
            Self::Leave => 'l',
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => write!(f, "skip"),
            Self::Delete => write!(f, "delete"),
            Self::Leave => write!(f, "leave"),
        }
    }
}

impl FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "s" | "skip" => Ok(Self::Skip),
            "d" | "delete" => Ok(Self::Delete),
            "l" | "leave" => Ok(Self::Leave),
            other => Err(format!("invalid action '{other}'. Use: skip, delete, or leave")),
        }
    }
}

// ---------------------------------------------------------------------------
// Edits
// ---------------------------------------------------------------------------

/// Kind of modification an [`Edit`] makes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EditKind {
    /// The callee was rewritten to its `.skip` form.
    Skip,
    /// The declaration was removed.
    Delete,
}

impl fmt::Display for EditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => write!(f, "added skip"),
            Self::Delete => write!(f, "deleted"),
        }
    }
}

/// A replacement of `[start, end)` in the original text of `file`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edit {
    /// File to patch.
    pub file: PathBuf,
    /// File name, for display.
    pub file_name: String,
    /// Start offset in the original text.
    pub start: usize,
    /// End offset in the original text.
    pub end: usize,
    /// Text that replaces the span.
    pub replacement: String,
    /// Text the span held when the edit was planned.
    pub original: String,
    /// What the edit does.
    pub kind: EditKind,
    /// Case code of the declaration, for the report.
    pub code: String,
}

impl Edit {
    /// Length of the replaced span.
    #[must_use]
    pub const fn removed_len(&self) -> usize {
        self.end - self.start
    }
}

/// The result of applying one decision to one duplicate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// An edit was staged.
    Staged(Edit),
    /// Skip requested but the declaration is already inert.
    AlreadySkipped,
    /// Leave requested.
    Left,
    /// The decision cannot be carried out safely.
    Refused(String),
}

/// Turn a decision about `case` into an [`Action`].
#[must_use]
pub fn plan(case: &TestCase, decision: Decision) -> Action {
    match decision {
        Decision::Leave => Action::Left,
        Decision::Skip if case.is_skipped() => Action::AlreadySkipped,
        Decision::Skip => {
            let rel = case.callee.start.saturating_sub(case.span.start)
                ..case.callee.end.saturating_sub(case.span.start);
            let (Some(head), Some(tail)) = (case.raw.get(..rel.start), case.raw.get(rel.end..))
            else {
                return Action::Refused("callee lies outside the declaration".to_owned());
            };
            let replacement = format!("{head}{}.skip{tail}", case.callee_base);
            Action::Staged(edit(case, replacement, EditKind::Skip))
        }
        Decision::Delete if !case.standalone => Action::Refused(
            "declaration is part of a larger expression; deleting it would break the code"
                .to_owned(),
        ),
        Decision::Delete => Action::Staged(edit(case, String::new(), EditKind::Delete)),
    }
}

fn edit(case: &TestCase, replacement: String, kind: EditKind) -> Edit {
    Edit {
        file: case.file.clone(),
        file_name: case.file_name.clone(),
        start: case.span.start,
        end: case.span.end,
        replacement,
        original: case.raw.clone(),
        kind,
        code: case.code.clone(),
    }
}

// ---------------------------------------------------------------------------
// Interaction
// ---------------------------------------------------------------------------

/// One duplicate as presented to the operator.
#[derive(Clone, Copy, Debug)]
pub struct Review<'a> {
    /// 1-based position in the duplicate list.
    pub position: usize,
    /// Number of duplicates.
    pub total: usize,
    /// The duplicate and its latest occurrence.
    pub duplicate: Duplicate<'a>,
}

/// The operator-interaction capability.
pub trait Prompter {
    /// Show `review` and return one of `choices`.
    ///
    /// # Errors
    /// Returns [`CleanerError::Interaction`] if no decision can be obtained;
    /// the run then stops before anything is written.
    fn ask(&mut self, review: &Review<'_>, choices: &[Decision]) -> Result<Decision, CleanerError>;

    /// Report what became of the decision.
    fn acknowledge(&mut self, _review: &Review<'_>, _action: &Action) {}
}

/// Answers from a fixed list, in order. Used for scripted runs and tests.
#[derive(Clone, Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<Decision>,
    asked: usize,
}

impl ScriptedPrompter {
    /// Prompter that answers with `answers` in order.
    #[must_use]
    pub fn new(answers: impl IntoIterator<Item = Decision>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            asked: 0,
        }
    }

    /// How many questions were asked.
    #[must_use]
    pub const fn asked(&self) -> usize {
        self.asked
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&mut self, _review: &Review<'_>, choices: &[Decision]) -> Result<Decision, CleanerError> {
        self.asked += 1;
        let answer = self
            .answers
            .pop_front()
            .ok_or_else(|| CleanerError::Interaction("scripted answers exhausted".to_owned()))?;
        if choices.contains(&answer) {
            Ok(answer)
        } else {
            Err(CleanerError::Interaction(format!("'{answer}' is not offered")))
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Counts of what the run decided.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tally {
    /// Skip edits staged.
    pub skipped: usize,
    /// Delete edits staged.
    pub deleted: usize,
    /// Skip requests on already-inert declarations.
    pub already_skipped: usize,
    /// Duplicates left as they are.
    pub left: usize,
    /// Decisions refused as unsafe.
    pub refused: usize,
}

/// Edits gathered over all duplicates.
#[derive(Clone, Debug, Default)]
pub struct Resolution {
    /// Staged edits, in duplicate order.
    pub edits: Vec<Edit>,
    /// What happened, by kind.
    pub tally: Tally,
}

/// Ask about every duplicate in `analysis` and collect the resulting edits.
///
/// # Errors
/// Propagates the prompter's error; no edits are returned in that case.
pub fn resolve_duplicates(
    analysis: &Analysis,
    prompter: &mut dyn Prompter,
) -> Result<Resolution, CleanerError> {
    let total = analysis.duplicate_count();
    let mut resolution = Resolution::default();

    for (i, duplicate) in analysis.duplicates().enumerate() {
        let review = Review {
            position: i + 1,
            total,
            duplicate,
        };
        let decision = prompter.ask(&review, &Decision::ALL)?;
        let action = plan(duplicate.case, decision);
        let case = duplicate.case;

        match &action {
            Action::Staged(edit) => {
                info!(file = %case.file_name, code = %case.code, kind = %edit.kind, "staged edit");
                match edit.kind {
                    EditKind::Skip => resolution.tally.skipped += 1,
                    EditKind::Delete => resolution.tally.deleted += 1,
                }
                resolution.edits.push(edit.clone());
            }
            Action::AlreadySkipped => {
                info!(file = %case.file_name, code = %case.code, "already skipped");
                resolution.tally.already_skipped += 1;
            }
            Action::Left => resolution.tally.left += 1,
            Action::Refused(reason) => {
                warn!(file = %case.file_name, line = case.line, code = %case.code, %reason, "decision refused");
                resolution.tally.refused += 1;
            }
        }
        prompter.acknowledge(&review, &action);
    }

    Ok(resolution)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::Modifier;

    const RAW: &str = "\n  // note\n  it.only(\"10 - Foo\", () => {});";

    fn case(file: &str, version: u64, modifier: Modifier) -> TestCase {
        let offset = 40;
        let callee_at = RAW.find("it.only").unwrap();
        let callee_len = match modifier {
            Modifier::None => 2,
            _ => 7,
        };
        let raw = match modifier {
            Modifier::None => RAW.replace("it.only", "it"),
            Modifier::Skip => RAW.replace("it.only", "it.skip"),
            Modifier::Only => RAW.to_owned(),
        };
        TestCase {
            file: PathBuf::from(file),
            file_name: file.to_owned(),
            version,
            group: "Admin Side".to_owned(),
            code: "10".to_owned(),
            title: "10 - Foo".to_owned(),
            span: offset..offset + raw.len(),
            callee: offset + callee_at..offset + callee_at + callee_len,
            callee_base: "it".to_owned(),
            modifier,
            raw,
            standalone: true,
            line: 3,
        }
    }

    #[test]
    fn skip_rewrites_only_the_callee() {
        let Action::Staged(edit) = plan(&case("v1.cy.ts", 1, Modifier::Only), Decision::Skip) else {
            panic!("expected an edit");
        };
        assert_eq!(edit.kind, EditKind::Skip);
        assert_eq!(edit.start, 40);
        assert_eq!(edit.replacement, "\n  // note\n  it.skip(\"10 - Foo\", () => {});");
        assert_eq!(edit.original, RAW);
    }

    #[test]
    fn skip_on_plain_callee() {
        let Action::Staged(edit) = plan(&case("v1.cy.ts", 1, Modifier::None), Decision::Skip) else {
            panic!("expected an edit");
        };
        assert!(edit.replacement.contains("it.skip(\"10 - Foo\""));
    }

    #[test]
    fn skip_is_idempotent() {
        assert_eq!(
            plan(&case("v1.cy.ts", 1, Modifier::Skip), Decision::Skip),
            Action::AlreadySkipped
        );
    }

    #[test]
    fn delete_empties_whole_span() {
        let c = case("v1.cy.ts", 1, Modifier::None);
        let Action::Staged(edit) = plan(&c, Decision::Delete) else {
            panic!("expected an edit");
        };
        assert_eq!(edit.replacement, "");
        assert_eq!(edit.start..edit.end, c.span);
        assert_eq!(edit.removed_len(), c.raw.len());
    }

    #[test]
    fn delete_of_embedded_declaration_is_refused() {
        let mut c = case("v1.cy.ts", 1, Modifier::None);
        c.standalone = false;
        assert!(matches!(plan(&c, Decision::Delete), Action::Refused(_)));
    }

    #[test]
    fn leave_produces_nothing() {
        assert_eq!(plan(&case("v1.cy.ts", 1, Modifier::None), Decision::Leave), Action::Left);
    }

    #[test]
    fn decision_parsing() {
        assert_eq!("skip".parse::<Decision>(), Ok(Decision::Skip));
        assert_eq!("D".parse::<Decision>(), Ok(Decision::Delete));
        assert_eq!(" leave ".parse::<Decision>(), Ok(Decision::Leave));
        assert!("nuke".parse::<Decision>().is_err());
    }

    #[test]
    fn engine_collects_edits_and_tally() {
        let analysis = Analysis::new(vec![
            case("v1.cy.ts", 1, Modifier::None),
            case("v2.cy.ts", 2, Modifier::Skip),
            case("v3.cy.ts", 3, Modifier::None),
        ]);
        let mut prompter = ScriptedPrompter::new([Decision::Delete, Decision::Skip]);
        let resolution = resolve_duplicates(&analysis, &mut prompter).unwrap();
        assert_eq!(prompter.asked(), 2);
        assert_eq!(resolution.edits.len(), 1);
        assert_eq!(resolution.edits[0].file_name, "v1.cy.ts");
        assert_eq!(
            resolution.tally,
            Tally {
                deleted: 1,
                already_skipped: 1,
                ..Tally::default()
            }
        );
    }

    #[test]
    fn exhausted_script_is_an_error() {
        let analysis = Analysis::new(vec![
            case("v1.cy.ts", 1, Modifier::None),
            case("v2.cy.ts", 2, Modifier::None),
        ]);
        let err = resolve_duplicates(&analysis, &mut ScriptedPrompter::default()).unwrap_err();
        assert!(matches!(err, CleanerError::Interaction(_)));
    }
}
