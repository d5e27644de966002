//! sprint-cleaner library crate, re-exported for integration tests.
//!
//! The primary interface is the `sprint-cleaner` binary. This lib.rs exposes
//! the pipeline stages so that tests can scan, resolve, and patch sprint
//! directories directly without going through the CLI.

pub mod analyze;
pub mod config;
pub mod error;
pub mod extract;
pub mod format;
pub mod patch;
pub mod prompt;
pub mod report;
pub mod resolve;
pub mod scan;
pub mod session;
pub mod symbols;
pub mod syntax;
pub mod telemetry;
pub mod title;
