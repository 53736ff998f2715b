//! Category test driver: run every fixture of one category and verify it.
//!
//! Per fixture, the driver
//! 1. reads the fixture text,
//! 2. runs the category's invocation on it,
//! 3. counts the diagnostics the compiler emitted,
//! 4. extracts the counts the fixture declares,
//! 5. compares the two, and
//! 6. checks the exit code against the category's expected code.
//!
//! The exit-code and count checks are independent: both are always evaluated and both are reported. A fixture
//! is executed exactly once.
//!
//! ## Concurrency
//!
//! Fixtures share no state. With more than one job they run on a scoped rayon pool and the per-fixture
//! reports are collected in fixture order, then handed to the reporter. With one job each report reaches the
//! reporter as soon as the fixture finishes.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use thiserror::Error;
use tpcheck_core::{
    CategoryId, CommentSyntax, CountComparison, ExpectedCounts, compare_counts, count_diagnostics,
    extract_expected_counts_with,
};

use crate::report::Reporter;
use crate::runner::{ExecutionResult, FixtureExecutor, Invocation, RunError};

// ============================================================================
// Per-fixture results
// ============================================================================

/// Infrastructure failure for one fixture. Never a verification verdict.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read fixture: {0}")]
    Unreadable(#[source] io::Error),

    #[error(transparent)]
    Run(#[from] RunError),
}

/// A single failed check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckFailure {
    ExitCode { expected: i32, actual: i32, hint: &'static str },
    Counts { message: String },
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckFailure::ExitCode { expected, actual, hint } => {
                write!(f, "exit code: expected {expected}, got {actual} ({hint})")
            }
            CheckFailure::Counts { message } => write!(f, "diagnostic counts: {message}"),
        }
    }
}

/// Everything observed and derived for a fixture that ran to completion.
#[derive(Debug, Clone)]
pub struct Verification {
    pub expected_exit_code: i32,
    pub execution: ExecutionResult,
    /// Counts as declared by the fixture's own directives.
    pub annotations: ExpectedCounts,
    /// Comparison against the effective expectation (directives, or the category's required counts).
    pub counts: CountComparison,
    pub exit_code_hint: &'static str,
}

impl Verification {
    pub fn exit_code_ok(&self) -> bool {
        self.execution.exit_code == self.expected_exit_code
    }

    /// `true` when the counts match or count verification does not apply.
    pub fn counts_ok(&self) -> bool {
        !self.counts.is_mismatch()
    }

    pub fn passed(&self) -> bool {
        self.exit_code_ok() && self.counts_ok()
    }

    /// The failed checks, exit code first.
    pub fn failures(&self) -> Vec<CheckFailure> {
        let mut failures = Vec::new();
        if !self.exit_code_ok() {
            failures.push(CheckFailure::ExitCode {
                expected: self.expected_exit_code,
                actual: self.execution.exit_code,
                hint: self.exit_code_hint,
            });
        }
        if let Some(message) = self.counts.mismatch_message() {
            failures.push(CheckFailure::Counts { message });
        }
        failures
    }
}

/// Terminal state of a fixture.
#[derive(Debug)]
pub enum FixtureStatus {
    Checked(Verification),
    Error(FixtureError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    Pass,
    Fail,
    Error,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Pass => "PASSED",
            Verdict::Fail => "FAILED",
            Verdict::Error => "ERROR",
        }
    }
}

/// Result of running one fixture.
#[derive(Debug)]
pub struct FixtureReport {
    pub path: PathBuf,
    pub category: CategoryId,
    pub status: FixtureStatus,
    pub duration: Duration,
}

impl FixtureReport {
    pub fn verdict(&self) -> Verdict {
        match &self.status {
            FixtureStatus::Checked(v) if v.passed() => Verdict::Pass,
            FixtureStatus::Checked(_) => Verdict::Fail,
            FixtureStatus::Error(_) => Verdict::Error,
        }
    }

    pub fn verification(&self) -> Option<&Verification> {
        match &self.status {
            FixtureStatus::Checked(v) => Some(v),
            FixtureStatus::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&FixtureError> {
        match &self.status {
            FixtureStatus::Checked(_) => None,
            FixtureStatus::Error(e) => Some(e),
        }
    }
}

// ============================================================================
// Per-category aggregate
// ============================================================================

/// Aggregate counters for a set of fixtures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryStats {
    pub run: usize,
    pub exit_code_ok: usize,
    pub count_checked: usize,
    pub count_mismatches: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
}

impl CategoryStats {
    fn record(&mut self, report: &FixtureReport) {
        self.run += 1;
        match report.verdict() {
            Verdict::Pass => self.passed += 1,
            Verdict::Fail => self.failed += 1,
            Verdict::Error => self.errors += 1,
        }
        if let Some(v) = report.verification() {
            self.exit_code_ok += usize::from(v.exit_code_ok());
            self.count_checked += usize::from(v.counts.is_checkable());
            self.count_mismatches += usize::from(v.counts.is_mismatch());
        }
    }

    pub fn merge(&mut self, other: &CategoryStats) {
        self.run += other.run;
        self.exit_code_ok += other.exit_code_ok;
        self.count_checked += other.count_checked;
        self.count_mismatches += other.count_mismatches;
        self.passed += other.passed;
        self.failed += other.failed;
        self.errors += other.errors;
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.errors == 0
    }
}

/// All fixture results of one category.
#[derive(Debug)]
pub struct CategoryReport {
    pub category: CategoryId,
    pub invocation: Invocation,
    pub fixtures: Vec<FixtureReport>,
    pub duration: Duration,
}

impl CategoryReport {
    pub fn stats(&self) -> CategoryStats {
        let mut stats = CategoryStats::default();
        for report in &self.fixtures {
            stats.record(report);
        }
        stats
    }

    /// Fixtures whose exit code differed from the category's.
    pub fn exit_code_mismatches(&self) -> impl Iterator<Item = &FixtureReport> {
        self.fixtures
            .iter()
            .filter(|r| r.verification().is_some_and(|v| !v.exit_code_ok()))
    }

    /// Fixtures whose diagnostic counts differed from their declared counts.
    pub fn count_mismatches(&self) -> impl Iterator<Item = &FixtureReport> {
        self.fixtures
            .iter()
            .filter(|r| r.verification().is_some_and(|v| v.counts.is_mismatch()))
    }

    /// Fixtures that could not be executed.
    pub fn infrastructure_failures(&self) -> impl Iterator<Item = &FixtureReport> {
        self.fixtures.iter().filter(|r| r.error().is_some())
    }

    pub fn is_success(&self) -> bool {
        self.stats().is_success()
    }
}

// ============================================================================
// Driver
// ============================================================================

/// Runs the fixtures of one category against one invocation.
pub struct CategoryDriver<'a, E: FixtureExecutor + ?Sized> {
    category: CategoryId,
    invocation: Invocation,
    executor: &'a E,
    comment_syntax: &'a CommentSyntax,
    jobs: usize,
}

impl<'a, E: FixtureExecutor + ?Sized> CategoryDriver<'a, E> {
    pub fn new(
        category: CategoryId,
        invocation: Invocation,
        executor: &'a E,
        comment_syntax: &'a CommentSyntax,
    ) -> Self {
        Self {
            category,
            invocation,
            executor,
            comment_syntax,
            jobs: 1,
        }
    }

    /// Number of fixtures executed concurrently (at least 1).
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    /// Run and verify a single fixture.
    pub fn run_fixture(&self, path: &Path) -> FixtureReport {
        let start = Instant::now();
        let status = match self.verify(path) {
            Ok(verification) => FixtureStatus::Checked(verification),
            Err(e) => {
                tracing::warn!(fixture = %path.display(), error = %e, "fixture could not be executed");
                FixtureStatus::Error(e)
            }
        };
        FixtureReport {
            path: path.to_path_buf(),
            category: self.category,
            status,
            duration: start.elapsed(),
        }
    }

    fn verify(&self, path: &Path) -> Result<Verification, FixtureError> {
        let info = self.category.info();
        let text = fs::read_to_string(path).map_err(FixtureError::Unreadable)?;

        let execution = self.executor.execute(&self.invocation, &text)?;
        let actual = count_diagnostics(&execution.stderr);

        let annotations = extract_expected_counts_with(&text, self.comment_syntax);
        let counts = compare_counts(annotations.or_required(info.required_counts), actual);
        if annotations.is_partial() && !counts.is_checkable() {
            tracing::debug!(
                fixture = %path.display(),
                declared = %annotations,
                "only one count directive present; diagnostic counts are not checked"
            );
        }

        Ok(Verification {
            expected_exit_code: info.expected_exit_code,
            execution,
            annotations,
            counts,
            exit_code_hint: info.failure_hint,
        })
    }

    /// Run every fixture and report as results become available.
    pub fn run(&self, fixtures: &[PathBuf], reporter: &mut dyn Reporter) -> CategoryReport {
        let start = Instant::now();
        reporter.on_category_start(self.category, &self.invocation, fixtures.len());

        let reports: Vec<FixtureReport> = if self.jobs <= 1 || fixtures.len() <= 1 {
            fixtures
                .iter()
                .map(|path| {
                    let report = self.run_fixture(path);
                    reporter.on_fixture_complete(&report);
                    report
                })
                .collect()
        } else {
            let reports = self.run_parallel(fixtures);
            for report in &reports {
                reporter.on_fixture_complete(report);
            }
            reports
        };

        let report = CategoryReport {
            category: self.category,
            invocation: self.invocation.clone(),
            fixtures: reports,
            duration: start.elapsed(),
        };

        let stats = report.stats();
        tracing::info!(
            category = %self.category,
            run = stats.run,
            exit_code_ok = stats.exit_code_ok,
            count_mismatches = stats.count_mismatches,
            errors = stats.errors,
            "category complete"
        );
        reporter.on_category_complete(&report);
        report
    }

    fn run_parallel(&self, fixtures: &[PathBuf]) -> Vec<FixtureReport> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build_scoped(rayon::ThreadBuilder::run, |pool| {
                pool.install(|| fixtures.par_iter().map(|path| self.run_fixture(path)).collect::<Vec<_>>())
            })
            .unwrap_or_else(|e| {
                tracing::warn!("failed to create thread pool ({e}), running sequentially");
                fixtures.iter().map(|path| self.run_fixture(path)).collect()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tpcheck_core::DiagnosticCounts;

    use crate::report::{Level, RunSummary};

    /// Executor returning a canned result, recording every input it was given.
    struct Canned {
        exit_code: i32,
        stderr: &'static str,
        inputs: Mutex<Vec<String>>,
    }

    impl Canned {
        fn new(exit_code: i32, stderr: &'static str) -> Self {
            Self {
                exit_code,
                stderr,
                inputs: Mutex::new(Vec::new()),
            }
        }
    }

    impl FixtureExecutor for Canned {
        fn execute(&self, _invocation: &Invocation, input: &str) -> Result<ExecutionResult, RunError> {
            self.inputs.lock().unwrap().push(input.to_string());
            Ok(ExecutionResult {
                exit_code: self.exit_code,
                stdout: String::new(),
                stderr: self.stderr.to_string(),
                duration: Duration::ZERO,
            })
        }
    }

    struct Failing;

    impl FixtureExecutor for Failing {
        fn execute(&self, invocation: &Invocation, _input: &str) -> Result<ExecutionResult, RunError> {
            Err(RunError::BrokenPipe {
                program: invocation.program().to_string_lossy().into_owned(),
            })
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl Reporter for Recorder {
        fn emit(&mut self, level: Level, message: &str) {
            self.events.push(format!("{level:?}: {message}"));
        }
        fn on_category_start(&mut self, category: CategoryId, _invocation: &Invocation, fixture_count: usize) {
            self.events.push(format!("start {category} {fixture_count}"));
        }
        fn on_fixture_complete(&mut self, report: &FixtureReport) {
            let name = report.path.file_name().unwrap().to_string_lossy().into_owned();
            self.events.push(format!("{name} {}", report.verdict().as_str()));
        }
        fn on_category_complete(&mut self, report: &CategoryReport) {
            self.events.push(format!("done {}", report.stats().run));
        }
        fn on_run_complete(&mut self, _summary: &RunSummary) {}
    }

    fn fixture(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, text).unwrap();
        path
    }

    fn driver<'a, E: FixtureExecutor>(
        category: CategoryId,
        executor: &'a E,
        syntax: &'a CommentSyntax,
    ) -> CategoryDriver<'a, E> {
        CategoryDriver::new(category, Invocation::new("tpcas"), executor, syntax)
    }

    #[test]
    fn clean_fixture_passes() {
        let tmp = tempfile::tempdir().unwrap();
        let path = fixture(tmp.path(), "ok.tpc", "// nb_warnings=0\n// nb_errors=0\nvalid code");
        let exec = Canned::new(0, "");
        let syntax = CommentSyntax::default();

        let report = driver(CategoryId::SemanticClean, &exec, &syntax).run_fixture(&path);
        assert_eq!(report.verdict(), Verdict::Pass);
        assert!(report.verification().unwrap().counts.is_checkable());
        assert_eq!(exec.inputs.lock().unwrap()[0], "// nb_warnings=0\n// nb_errors=0\nvalid code");
    }

    #[test]
    fn partial_annotation_only_checks_exit_code() {
        let tmp = tempfile::tempdir().unwrap();
        let path = fixture(tmp.path(), "e.tpc", "// nb_errors=2\nbroken code");
        let exec = Canned::new(2, "error: a\nerror: b\n");
        let syntax = CommentSyntax::default();

        let report = driver(CategoryId::SemanticError, &exec, &syntax).run_fixture(&path);
        let v = report.verification().unwrap();
        assert!(v.exit_code_ok());
        assert!(!v.counts.is_checkable());
        assert!(v.annotations.is_partial());
        assert_eq!(report.verdict(), Verdict::Pass);
    }

    #[test]
    fn both_failures_are_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let path = fixture(tmp.path(), "w.tpc", "// nb_warnings=1\n// nb_errors=0\n");
        let exec = Canned::new(1, "warning: a\nwarning: b\n");
        let syntax = CommentSyntax::default();

        let report = driver(CategoryId::SemanticWarning, &exec, &syntax).run_fixture(&path);
        let failures = report.verification().unwrap().failures();
        assert_eq!(report.verdict(), Verdict::Fail);
        assert_eq!(failures.len(), 2);
        assert_eq!(
            failures[1].to_string(),
            "diagnostic counts: expected (W=1, E=0), got (W=2, E=0)"
        );
    }

    #[test]
    fn semantic_clean_requires_zero_counts_without_annotations() {
        let tmp = tempfile::tempdir().unwrap();
        let path = fixture(tmp.path(), "g.tpc", "int main(void) { return 0; }");
        let exec = Canned::new(0, "warning: unused variable\n");
        let syntax = CommentSyntax::default();

        let report = driver(CategoryId::SemanticClean, &exec, &syntax).run_fixture(&path);
        let v = report.verification().unwrap();
        assert_eq!(v.counts.actual, DiagnosticCounts::new(1, 0));
        assert_eq!(report.verdict(), Verdict::Fail);

        // Same fixture, same output, but a category without required counts.
        let report = driver(CategoryId::SyntaxAccept, &exec, &syntax).run_fixture(&path);
        assert_eq!(report.verdict(), Verdict::Pass);
    }

    #[test]
    fn semantic_clean_leaves_partial_annotations_unchecked() {
        let tmp = tempfile::tempdir().unwrap();
        let path = fixture(tmp.path(), "w.tpc", "// nb_warnings=1\nint x;");
        let exec = Canned::new(0, "warning: x\n");
        let syntax = CommentSyntax::default();

        let report = driver(CategoryId::SemanticClean, &exec, &syntax).run_fixture(&path);
        let v = report.verification().unwrap();
        assert!(v.annotations.is_partial());
        assert!(!v.counts.is_checkable());
        assert_eq!(v.counts.verdict(), None);
        assert!(v.failures().is_empty());
        assert_eq!(report.verdict(), Verdict::Pass);
    }

    #[test]
    fn unreadable_fixture_is_an_error_not_a_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let exec = Canned::new(0, "");
        let syntax = CommentSyntax::default();

        let report = driver(CategoryId::SyntaxAccept, &exec, &syntax).run_fixture(&tmp.path().join("gone.tpc"));
        assert_eq!(report.verdict(), Verdict::Error);
        assert!(matches!(report.error(), Some(FixtureError::Unreadable(_))));
        assert!(exec.inputs.lock().unwrap().is_empty());
    }

    #[test]
    fn run_errors_do_not_affect_other_counters() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = vec![
            fixture(tmp.path(), "a.tpc", "x"),
            fixture(tmp.path(), "b.tpc", "y"),
        ];
        let syntax = CommentSyntax::default();
        let mut recorder = Recorder::default();

        let report = driver(CategoryId::SyntaxAccept, &Failing, &syntax).run(&paths, &mut recorder);
        let stats = report.stats();
        assert_eq!(stats.run, 2);
        assert_eq!(stats.errors, 2);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.exit_code_ok, 0);
        assert_eq!(report.infrastructure_failures().count(), 2);
    }

    #[test]
    fn parallel_run_reports_in_fixture_order() {
        let tmp = tempfile::tempdir().unwrap();
        let paths: Vec<PathBuf> = (0..16)
            .map(|i| fixture(tmp.path(), &format!("f{i:02}.tpc"), "int x;"))
            .collect();
        let exec = Canned::new(1, "error: bad\n");
        let syntax = CommentSyntax::default();
        let mut recorder = Recorder::default();

        let report = driver(CategoryId::SyntaxReject, &exec, &syntax)
            .with_jobs(4)
            .run(&paths, &mut recorder);

        assert_eq!(report.stats().passed, 16);
        assert_eq!(exec.inputs.lock().unwrap().len(), 16);
        let expected: Vec<String> = std::iter::once("start syntax-reject 16".to_string())
            .chain((0..16).map(|i| format!("f{i:02}.tpc PASSED")))
            .chain(std::iter::once("done 16".to_string()))
            .collect();
        assert_eq!(recorder.events, expected);
    }
}
