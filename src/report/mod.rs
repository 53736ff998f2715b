//! Reporting of harness progress and results.
//!
//! ## Reporter Trait
//!
//! The driver and the controller never print. They hand events to a [`Reporter`] passed in by the caller,
//! which keeps output format (console, JSON, nothing at all in tests) separate from execution.
//!
//! ## Modules
//!
//! - `console` - pytest-style terminal output
//! - `json` - machine-readable run report

mod console;
mod json;

use std::time::Duration;

use tpcheck_core::CategoryId;

use crate::driver::{CategoryReport, CategoryStats, FixtureReport};
use crate::runner::Invocation;

pub use console::{ColorChoice, ConsoleReporter};
pub use json::{JsonReport, write_json_report};

/// Severity of a free-form reporter message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Info,
    Warn,
    Error,
}

/// Receives harness events.
///
/// Implement this trait to customize output format.
pub trait Reporter {
    /// Free-form leveled message (discovery problems, configuration notes).
    fn emit(&mut self, level: Level, message: &str);

    /// Called once before the first category, with the number of fixtures per category.
    fn on_run_start(&mut self, _plan: &[(CategoryId, usize)]) {}

    /// Called when a category begins
    fn on_category_start(&mut self, category: CategoryId, invocation: &Invocation, fixture_count: usize);

    /// Called when a fixture has been run and verified (or failed to run)
    fn on_fixture_complete(&mut self, report: &FixtureReport);

    /// Called when all fixtures of a category are done
    fn on_category_complete(&mut self, report: &CategoryReport);

    /// Called when all categories have completed
    fn on_run_complete(&mut self, summary: &RunSummary);
}

/// Reporter that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn emit(&mut self, _level: Level, _message: &str) {}
    fn on_category_start(&mut self, _category: CategoryId, _invocation: &Invocation, _fixture_count: usize) {}
    fn on_fixture_complete(&mut self, _report: &FixtureReport) {}
    fn on_category_complete(&mut self, _report: &CategoryReport) {}
    fn on_run_complete(&mut self, _summary: &RunSummary) {}
}

/// Result of a whole harness run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub categories: Vec<CategoryReport>,
    /// Categories skipped because their fixtures could not be listed, with the reason.
    pub skipped: Vec<(CategoryId, String)>,
    pub duration: Duration,
}

impl RunSummary {
    pub fn totals(&self) -> CategoryStats {
        let mut totals = CategoryStats::default();
        for category in &self.categories {
            totals.merge(&category.stats());
        }
        totals
    }

    pub fn is_success(&self) -> bool {
        self.totals().is_success()
    }

    /// Process exit code for the run: 0 when everything passed, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.is_success())
    }

    /// Every fixture that did not pass, in run order.
    pub fn unsuccessful(&self) -> impl Iterator<Item = &FixtureReport> {
        self.categories
            .iter()
            .flat_map(|c| c.fixtures.iter())
            .filter(|f| f.verdict() != crate::driver::Verdict::Pass)
    }
}
