use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use sprint_cleaner::config::CleanerConfig;
use sprint_cleaner::error::CleanerError;
use sprint_cleaner::format::{OutputFormat, ScanEnvelope};
use sprint_cleaner::prompt::{FixedPrompter, TerminalPrompter};
use sprint_cleaner::report::{ColorMode, Palette, Reporter};
use sprint_cleaner::resolve::{Decision, Prompter, Review};
use sprint_cleaner::session::{reconcile, scan_sprint};
use sprint_cleaner::symbols::load_symbols;
use sprint_cleaner::syntax::TypeScriptParser;
use sprint_cleaner::telemetry;

/// Detect and manage duplicate test cases across sprint versions
///
/// Scans a directory of versioned sprint files (name-v1.cy.ts,
/// name-v2.cy.ts, ...), finds test cases whose (group, case code) also
/// appears in a newer sprint, and asks what to do with each older copy.
/// Latest version files are never modified.
///
/// The directory comes from --dir, then SPRINT_DIR, then sprint.dir in
/// sprint-cleaner.toml (or config.sprintDir in package.json).
///
/// EXAMPLES:
///
///   sprint-cleaner --dir cypress/e2e/tests/Sprint
///   sprint-cleaner --check --format json
///   sprint-cleaner --action skip
#[derive(Parser)]
#[command(name = "sprint-cleaner")]
#[command(version, about)]
struct Cli {
    /// Sprint directory path
    #[arg(short, long, env = "SPRINT_DIR")]
    dir: Option<PathBuf>,

    /// Configuration file (default: sprint-cleaner.toml, then package.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Report duplicates without asking or writing anything
    #[arg(long, conflicts_with = "action")]
    check: bool,

    /// Apply one decision to every duplicate: skip, delete, or leave
    #[arg(long)]
    action: Option<Decision>,

    /// Report format: text or json (json implies --check)
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    /// Colour: auto, always, or never
    #[arg(long, default_value = "auto")]
    color: ColorMode,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init();
    run(&cli)
}

fn run(cli: &Cli) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to read the working directory")?;
    let (config, source) =
        CleanerConfig::discover(&cwd, cli.config.as_deref()).map_err(CleanerError::from)?;
    debug!(?source, "configuration loaded");

    if cli.format == OutputFormat::Json {
        return run_json(cli, &cwd, &config);
    }

    let palette = Palette::new(cli.color.enabled());
    let mut report = Reporter::new(io::stdout(), palette);
    report.header()?;

    let dir = config
        .sprint_dir(cli.dir.as_deref())
        .ok_or(CleanerError::NoDirectory)?;
    let dir = cwd.join(dir);
    report.scanning(&dir)?;

    let symbols = load_symbols(&config.symbols);
    let scan = scan_sprint(&dir, &config.sprint, &symbols, &TypeScriptParser)?;

    if scan.file_names.is_empty() {
        report.no_files()?;
        return Ok(());
    }
    report.found_files(&scan.file_names)?;
    report.failures(&scan.failures)?;

    let total = scan.analysis.duplicate_count();
    report.stats(scan.file_names.len(), scan.analysis.cases().len(), total)?;
    if total == 0 {
        report.clean()?;
        return Ok(());
    }
    report.duplicates_intro(total)?;

    if cli.check {
        for (i, duplicate) in scan.analysis.duplicates().enumerate() {
            report.duplicate(&Review {
                position: i + 1,
                total,
                duplicate,
            })?;
        }
        return Ok(report.done()?);
    }

    let mut prompter: Box<dyn Prompter> = match cli.action {
        Some(decision) => Box::new(FixedPrompter::new(decision, palette)),
        None => Box::new(TerminalPrompter::new(palette)),
    };
    let outcome = reconcile(&scan, prompter.as_mut())?;
    debug!(tally = ?outcome.resolution.tally, "resolution finished");

    report.patch_summary(&outcome.patches)?;
    report.done()?;
    Ok(())
}

fn run_json(cli: &Cli, cwd: &Path, config: &CleanerConfig) -> Result<()> {
    let dir = config
        .sprint_dir(cli.dir.as_deref())
        .ok_or(CleanerError::NoDirectory)?;
    let dir = cwd.join(dir);
    let symbols = load_symbols(&config.symbols);
    let scan = scan_sprint(&dir, &config.sprint, &symbols, &TypeScriptParser)?;
    println!("{}", cli.format.serialize(&ScanEnvelope::new(&scan))?);
    Ok(())
}
