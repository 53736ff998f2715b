//! Default console reporter (pytest-style)

use std::io::{self, IsTerminal, Write};

use tpcheck_core::CategoryId;

use super::{Level, Reporter, RunSummary};
use crate::driver::{CategoryReport, FixtureReport, Verdict};
use crate::runner::Invocation;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const BOLD_RED: &str = "\x1b[1;31m";
const BOLD_GREEN: &str = "\x1b[1;32m";

/// When to emit ANSI colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Color when stdout is a terminal and `NO_COLOR` is unset
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    pub fn enabled(self) -> bool {
        match self {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => std::env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal(),
        }
    }
}

/// Writes human-readable progress and a final summary.
pub struct ConsoleReporter<W: Write> {
    out: W,
    verbose: bool,
    color: bool,
}

impl ConsoleReporter<io::Stdout> {
    pub fn stdout(verbose: bool, color: ColorChoice) -> Self {
        Self::new(io::stdout(), verbose, color.enabled())
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W, verbose: bool, color: bool) -> Self {
        Self { out, verbose, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, style: &str, text: &str) -> String {
        if self.color {
            format!("{style}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn line(&mut self, text: impl AsRef<str>) {
        // Console output is best effort; a closed stdout must not abort the run.
        let _ = writeln!(self.out, "{}", text.as_ref());
    }

    fn status(&self, verdict: Verdict) -> String {
        let style = match verdict {
            Verdict::Pass => GREEN,
            Verdict::Fail => RED,
            Verdict::Error => YELLOW,
        };
        self.paint(style, verdict.as_str())
    }

    fn fixture_details(&self, report: &FixtureReport, show_diagnostics: bool) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(error) = report.error() {
            lines.push(format!("    {error}"));
            return lines;
        }
        let Some(verification) = report.verification() else {
            return lines;
        };
        for failure in verification.failures() {
            lines.push(format!("    {failure}"));
        }
        if self.verbose && verification.annotations.is_partial() && !verification.counts.is_checkable() {
            lines.push(format!(
                "    note: declares only {}; diagnostic counts not checked",
                verification.annotations
            ));
        }
        if show_diagnostics && !verification.execution.stderr.is_empty() {
            lines.push("    captured diagnostics:".to_string());
            for diag in verification.execution.stderr.lines() {
                lines.push(format!("      | {diag}"));
            }
        }
        lines
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn emit(&mut self, level: Level, message: &str) {
        let prefix = match level {
            Level::Info => self.paint(BOLD, "note"),
            Level::Warn => self.paint(YELLOW, "warning"),
            Level::Error => self.paint(RED, "error"),
        };
        self.line(format!("{prefix}: {message}"));
    }

    fn on_run_start(&mut self, plan: &[(CategoryId, usize)]) {
        let total: usize = plan.iter().map(|(_, n)| n).sum();
        let banner = self.paint(BOLD, "=================== tpcheck session starts ===================");
        self.line(banner);
        self.line(format!(
            "collected {} fixture run(s) across {} categor{}",
            total,
            plan.len(),
            if plan.len() == 1 { "y" } else { "ies" }
        ));
        self.line("");
    }

    fn on_category_start(&mut self, category: CategoryId, invocation: &Invocation, fixture_count: usize) {
        let header = format!(
            "--- {} ({}, {} fixture(s)) ---",
            category,
            category.info().fixture_pattern,
            fixture_count
        );
        let header = self.paint(BOLD, &header);
        self.line(header);
        if self.verbose {
            self.line(format!("    $ {invocation}"));
        }
    }

    fn on_fixture_complete(&mut self, report: &FixtureReport) {
        let status = self.status(report.verdict());
        if self.verbose {
            self.line(format!(
                "{} {} ({}ms)",
                report.path.display(),
                status,
                report.duration.as_millis()
            ));
        } else {
            self.line(format!("{} {}", report.path.display(), status));
        }
        for detail in self.fixture_details(report, false) {
            self.line(detail);
        }
    }

    fn on_category_complete(&mut self, report: &CategoryReport) {
        let stats = report.stats();
        let info = report.category.info();
        let mut summary = format!("{}/{} of {} are ok", stats.exit_code_ok, stats.run, info.fixture_pattern);
        if stats.count_checked > 0 {
            summary.push_str(&format!(
                ", {}/{} diagnostic count checks ok",
                stats.count_checked - stats.count_mismatches,
                stats.count_checked
            ));
        }
        if stats.errors > 0 {
            summary.push_str(&format!(", {} could not be run", stats.errors));
        }
        self.line(summary);
        self.line("");
    }

    fn on_run_complete(&mut self, summary: &RunSummary) {
        let unsuccessful: Vec<&FixtureReport> = summary.unsuccessful().collect();
        if !unsuccessful.is_empty() {
            let title = self.paint(BOLD_RED, "=================== FAILURES ===================");
            self.line(title);
            for report in unsuccessful {
                self.line("");
                let heading = format!("___________ {} [{}] ___________", report.path.display(), report.category);
                let heading = self.paint(BOLD, &heading);
                self.line(heading);
                for detail in self.fixture_details(report, self.verbose) {
                    self.line(detail);
                }
            }
            self.line("");
        }

        for (category, reason) in &summary.skipped {
            self.line(format!("skipped {category}: {reason}"));
        }

        let totals = summary.totals();
        let mut parts = Vec::new();
        if totals.passed > 0 {
            parts.push(format!("{} passed", totals.passed));
        }
        if totals.failed > 0 {
            parts.push(format!("{} failed", totals.failed));
        }
        if totals.errors > 0 {
            parts.push(format!("{} error(s)", totals.errors));
        }
        if !summary.skipped.is_empty() {
            parts.push(format!("{} category(ies) skipped", summary.skipped.len()));
        }
        if parts.is_empty() {
            parts.push("no fixtures ran".to_string());
        }

        let text = format!(
            "=================== {} in {:.2}s ===================",
            parts.join(", "),
            summary.duration.as_secs_f64()
        );
        let style = if totals.is_success() { BOLD_GREEN } else { BOLD_RED };
        let text = self.paint(style, &text);
        self.line(text);
    }
}
