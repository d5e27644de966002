//! Shared test helpers for sprint-cleaner integration tests.
//!
//! All tests use temp directories, no side effects on the real repo.
//! Each test gets its own project via `SprintProject::new()`.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

use sprint_cleaner::config::SprintConfig;
use sprint_cleaner::session::{SprintScan, scan_sprint};
use sprint_cleaner::symbols::SymbolTable;
use sprint_cleaner::syntax::TypeScriptParser;

/// Relative sprint directory inside a project.
pub const SPRINT_REL: &str = "cypress/e2e/tests/Sprint";

/// A temp project with a sprint directory.
pub struct SprintProject {
    dir: TempDir,
}

impl SprintProject {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        std::fs::create_dir_all(dir.path().join(SPRINT_REL)).unwrap();
        Self { dir }
    }

    /// Project root (the working directory for CLI runs).
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn sprint_dir(&self) -> PathBuf {
        self.root().join(SPRINT_REL)
    }

    /// Write a sprint file.
    pub fn add(&self, name: &str, content: &str) -> &Self {
        std::fs::write(self.sprint_dir().join(name), content).unwrap();
        self
    }

    /// Write a file relative to the project root.
    pub fn add_root_file(&self, rel: &str, content: &str) -> &Self {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
        self
    }

    pub fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.sprint_dir().join(name)).unwrap()
    }

    /// Scan the sprint directory with default settings.
    pub fn scan(&self, symbols: &SymbolTable) -> SprintScan {
        scan_sprint(&self.sprint_dir(), &SprintConfig::default(), symbols, &TypeScriptParser)
            .expect("scan should succeed")
    }

    pub fn run(&self, args: &[&str]) -> Output {
        run_in(self.root(), args)
    }

    pub fn run_ok(&self, args: &[&str]) -> String {
        run_ok(self.root(), args)
    }

    pub fn run_fails(&self, args: &[&str]) -> String {
        run_fails(self.root(), args)
    }
}

/// Run sprint-cleaner with the given args in the given directory.
///
/// `SPRINT_DIR` is cleared so the caller's environment cannot leak in.
pub fn run_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sprint-cleaner"))
        .args(args)
        .current_dir(dir)
        .env_remove("SPRINT_DIR")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .output()
        .expect("failed to execute sprint-cleaner")
}

/// Run sprint-cleaner and assert it succeeds. Returns stdout as string.
pub fn run_ok(dir: &Path, args: &[&str]) -> String {
    let out = run_in(dir, args);
    let stderr = String::from_utf8_lossy(&out.stderr);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(
        out.status.success(),
        "sprint-cleaner {} failed:\nstdout: {stdout}\nstderr: {stderr}",
        args.join(" "),
    );
    stdout.to_string()
}

/// Run sprint-cleaner and assert it fails. Returns stderr as string.
pub fn run_fails(dir: &Path, args: &[&str]) -> String {
    let out = run_in(dir, args);
    assert!(
        !out.status.success(),
        "Expected sprint-cleaner {} to fail, but it succeeded.\nstdout: {}",
        args.join(" "),
        String::from_utf8_lossy(&out.stdout),
    );
    assert_eq!(out.status.code(), Some(1));
    String::from_utf8_lossy(&out.stderr).to_string()
}

/// A sprint file with one group holding `cases` as `(code, title rest)`.
pub fn sprint_file(group: &str, cases: &[(&str, &str)]) -> String {
    use std::fmt::Write as _;
    let mut s = format!("describe(\"{group}\", () => {{\n");
    for (code, rest) in cases {
        let _ = writeln!(s, "  it(\"{code} - {rest}\", () => {{\n    cy.visit(\"/\");\n  }});\n");
    }
    s.push_str("});\n");
    s
}
