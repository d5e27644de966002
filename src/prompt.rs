//! Terminal prompters.
//!
//! [`TerminalPrompter`] shows each duplicate and asks for a decision: an
//! arrow-key menu when stdin and stdout are a terminal, a numbered line
//! prompt otherwise. [`FixedPrompter`] answers every duplicate the same way
//! (`--action`).

use std::io::{self, BufRead, IsTerminal as _, Write};

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::{cursor, queue, terminal};
use tracing::debug;

use crate::error::CleanerError;
use crate::report::{Palette, render_duplicate};
use crate::resolve::{Action, Decision, Prompter, Review};

const QUESTION: &str = "What do you want to do with this duplicate?";

fn interaction(e: &io::Error) -> CleanerError {
    CleanerError::Interaction(e.to_string())
}

fn cancelled() -> CleanerError {
    CleanerError::Interaction("cancelled, no files were changed".to_owned())
}

/// Print what became of a decision.
fn acknowledge_to(out: &mut impl Write, p: &Palette, action: &Action) -> io::Result<()> {
    let line = match action {
        Action::Staged(_) => return Ok(()),
        Action::AlreadySkipped => "Already skipped, no changes needed.".to_owned(),
        Action::Left => "Leaving test as is.".to_owned(),
        Action::Refused(reason) => format!("{}Not changed: {reason}{}", p.yellow, p.reset),
    };
    writeln!(out, "{line}")
}

fn acknowledge_stdout(p: &Palette, action: &Action) {
    if let Err(e) = acknowledge_to(&mut io::stdout(), p, action) {
        debug!(error = %e, "could not print decision outcome");
    }
}

// ---------------------------------------------------------------------------
// Interactive
// ---------------------------------------------------------------------------

/// Asks the operator on the terminal.
pub struct TerminalPrompter {
    palette: Palette,
    menu: bool,
}

impl TerminalPrompter {
    /// Prompter using the arrow-key menu when attached to a terminal.
    #[must_use]
    pub fn new(palette: Palette) -> Self {
        Self {
            palette,
            menu: io::stdin().is_terminal() && io::stdout().is_terminal(),
        }
    }
}

impl Prompter for TerminalPrompter {
    fn ask(&mut self, review: &Review<'_>, choices: &[Decision]) -> Result<Decision, CleanerError> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", render_duplicate(&self.palette, review)).map_err(|e| interaction(&e))?;
        if self.menu {
            menu(&mut stdout, &self.palette, choices)
        } else {
            read_choice(&mut io::stdin().lock(), &mut stdout, &self.palette, choices)
        }
    }

    fn acknowledge(&mut self, _review: &Review<'_>, action: &Action) {
        acknowledge_stdout(&self.palette, action);
    }
}

/// Restores cooked mode and the cursor when dropped.
struct RawMode;

impl RawMode {
    fn enter() -> Result<Self, CleanerError> {
        terminal::enable_raw_mode().map_err(|e| interaction(&e))?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        crossterm::execute!(io::stdout(), cursor::Show).ok();
        terminal::disable_raw_mode().ok();
    }
}

fn menu(out: &mut impl Write, p: &Palette, choices: &[Decision]) -> Result<Decision, CleanerError> {
    if choices.is_empty() {
        return Err(CleanerError::Interaction("no choices offered".to_owned()));
    }
    let lines = u16::try_from(choices.len() + 1).unwrap_or(u16::MAX);
    let mut selected = 0;

    let guard = RawMode::enter()?;
    queue!(out, cursor::Hide).map_err(|e| interaction(&e))?;
    draw_menu(out, p, choices, selected).map_err(|e| interaction(&e))?;

    let decision = loop {
        let Event::Key(key) = event::read().map_err(|e| interaction(&e))? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Err(cancelled());
            }
            KeyCode::Esc => return Err(cancelled()),
            KeyCode::Enter => break choices[selected],
            KeyCode::Up | KeyCode::Char('k') => {
                selected = selected.checked_sub(1).unwrap_or(choices.len() - 1);
            }
            KeyCode::Down | KeyCode::Char('j') | KeyCode::Tab => {
                selected = (selected + 1) % choices.len();
            }
            KeyCode::Char(c) => {
                if let Some(d) = choices.iter().find(|d| d.key() == c.to_ascii_lowercase()) {
                    break *d;
                }
            }
            _ => {}
        }
        queue!(
            out,
            cursor::MoveUp(lines),
            cursor::MoveToColumn(0),
            terminal::Clear(terminal::ClearType::FromCursorDown)
        )
        .map_err(|e| interaction(&e))?;
        draw_menu(out, p, choices, selected).map_err(|e| interaction(&e))?;
    };

    // Collapse the menu into the answered question.
    queue!(
        out,
        cursor::MoveUp(lines),
        cursor::MoveToColumn(0),
        terminal::Clear(terminal::ClearType::FromCursorDown)
    )
    .map_err(|e| interaction(&e))?;
    write!(
        out,
        "{}?{} {QUESTION} {}{}{}\r\n",
        p.green, p.reset, p.cyan, decision.label(), p.reset
    )
    .map_err(|e| interaction(&e))?;
    out.flush().map_err(|e| interaction(&e))?;
    drop(guard);
    Ok(decision)
}

fn draw_menu(out: &mut impl Write, p: &Palette, choices: &[Decision], selected: usize) -> io::Result<()> {
    write!(
        out,
        "{}?{} {QUESTION} {}(arrows, enter, or s/d/l){}\r\n",
        p.green, p.reset, p.gray, p.reset
    )?;
    for (i, choice) in choices.iter().enumerate() {
        if i == selected {
            write!(out, "{}\u{276f} {}{}\r\n", p.cyan, choice.label(), p.reset)?;
        } else {
            write!(out, "  {}\r\n", choice.label())?;
        }
    }
    out.flush()
}

// ---------------------------------------------------------------------------
// Line prompt
// ---------------------------------------------------------------------------

/// Read a decision line by line: a number from the list or `s`/`d`/`l`.
///
/// # Errors
/// Returns [`CleanerError::Interaction`] if input ends before a valid answer.
pub fn read_choice(
    input: &mut impl BufRead,
    out: &mut impl Write,
    p: &Palette,
    choices: &[Decision],
) -> Result<Decision, CleanerError> {
    let io_err = |e: io::Error| interaction(&e);
    writeln!(out, "{}?{} {QUESTION}", p.green, p.reset).map_err(io_err)?;
    for (i, choice) in choices.iter().enumerate() {
        writeln!(out, "  {}) {} [{}]", i + 1, choice.label(), choice.key()).map_err(io_err)?;
    }

    let mut line = String::new();
    loop {
        write!(out, "> ").map_err(io_err)?;
        out.flush().map_err(io_err)?;
        line.clear();
        if input.read_line(&mut line).map_err(io_err)? == 0 {
            return Err(CleanerError::Interaction(
                "input closed before a decision was made".to_owned(),
            ));
        }
        let answer = line.trim();
        let picked = answer
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| choices.get(i).copied())
            .or_else(|| answer.parse::<Decision>().ok().filter(|d| choices.contains(d)));
        match picked {
            Some(decision) => return Ok(decision),
            None => writeln!(
                out,
                "{}Please answer 1-{} or one of: {}{}",
                p.yellow,
                choices.len(),
                choices.iter().map(|d| d.key().to_string()).collect::<Vec<_>>().join(", "),
                p.reset
            )
            .map_err(io_err)?,
        }
    }
}

// ---------------------------------------------------------------------------
// Fixed answer
// ---------------------------------------------------------------------------

/// Gives the same decision for every duplicate, echoing each one.
pub struct FixedPrompter {
    decision: Decision,
    palette: Palette,
}

impl FixedPrompter {
    #[must_use]
    pub const fn new(decision: Decision, palette: Palette) -> Self {
        Self { decision, palette }
    }
}

impl Prompter for FixedPrompter {
    fn ask(&mut self, review: &Review<'_>, choices: &[Decision]) -> Result<Decision, CleanerError> {
        if !choices.contains(&self.decision) {
            return Err(CleanerError::Interaction(format!(
                "'{}' is not offered",
                self.decision
            )));
        }
        let p = &self.palette;
        print!("{}", render_duplicate(p, review));
        println!("{}?{} {QUESTION} {}{}{}", p.green, p.reset, p.cyan, self.decision.label(), p.reset);
        Ok(self.decision)
    }

    fn acknowledge(&mut self, _review: &Review<'_>, action: &Action) {
        acknowledge_stdout(&self.palette, action);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
