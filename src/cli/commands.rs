//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use tpcheck_core::CommentSyntax;

use crate::discovery::FsDiscovery;
use crate::driver::{CategoryDriver, FixtureReport, Verdict};
use crate::harness::{Harness, HarnessConfig, PlannedCategory, default_jobs};
use crate::report::{ConsoleReporter, Reporter, write_json_report};
use crate::runner::{Invocation, ProcessRunner};

use super::{CheckArgs, CliError, CliResult, ExitCode, ListArgs, RunArgs, SelectionArgs};

// ============================================================================
// Configuration
// ============================================================================

fn comment_syntax(markers: &[String]) -> CommentSyntax {
    if markers.is_empty() {
        CommentSyntax::default()
    } else {
        CommentSyntax::new(markers.iter().cloned())
    }
}

fn apply_selection(mut config: HarnessConfig, selection: &SelectionArgs) -> HarnessConfig {
    if !selection.categories.is_empty() {
        config.categories = selection.categories.clone();
    }
    if selection.no_instrumented {
        config = config.without_instrumented();
    }
    config.filter = selection.filter.clone();
    config.comment_syntax = comment_syntax(&selection.comment_markers);
    config
}

/// Convert `run` arguments into a validated configuration.
pub fn run_config(args: &RunArgs) -> CliResult<HarnessConfig> {
    let config = HarnessConfig {
        root: args.target.root.clone(),
        executable: args.target.executable.clone(),
        instrumentation_tool: args.target.instrumentation_tool.clone(),
        jobs: args.jobs.unwrap_or_else(default_jobs),
        timeout: Duration::from_secs(args.timeout),
        ..HarnessConfig::default()
    };
    Ok(apply_selection(config, &args.selection).validate()?)
}

// ============================================================================
// run
// ============================================================================

/// Run the selected categories and print a pytest-style report.
pub fn run_fixtures(args: &RunArgs) -> CliResult<ExitCode> {
    let config = run_config(args)?;
    tracing::debug!(?config, "starting harness run");

    let mut reporter = ConsoleReporter::stdout(args.verbose, args.color);
    let summary = Harness::new(config).run(&mut reporter)?;

    if let Some(path) = &args.json {
        write_json_report(&summary, path)
            .map_err(|e| CliError::failure(format!("Error writing JSON report to {}: {}", path.display(), e)))?;
    }

    Ok(ExitCode(summary.exit_code()))
}

// ============================================================================
// list
// ============================================================================

/// Print the fixtures each selected category would run, without running them.
pub fn list_fixtures(args: &ListArgs) -> CliResult<ExitCode> {
    let config = HarnessConfig {
        root: args.root.clone(),
        ..HarnessConfig::default()
    };
    let config = apply_selection(config, &args.selection).validate()?;
    let harness = Harness::with_parts(config, FsDiscovery, ProcessRunner::new());

    let mut out = io::stdout().lock();
    write_plan(&mut out, &harness.plan()?)
        .map_err(|e| CliError::failure(format!("Error writing fixture list: {e}")))?;
    Ok(ExitCode::SUCCESS)
}

fn write_plan(out: &mut impl Write, plan: &[PlannedCategory]) -> io::Result<()> {
    let mut total = 0;
    for entry in plan {
        let info = entry.category().info();
        match entry {
            PlannedCategory::Ready { fixtures, .. } => {
                writeln!(
                    out,
                    "{} ({}, expects exit {}): {} fixture(s)",
                    info.canonical,
                    info.fixture_pattern,
                    info.expected_exit_code,
                    fixtures.len()
                )?;
                for fixture in fixtures {
                    writeln!(out, "  {}", fixture.display())?;
                }
                total += fixtures.len();
            }
            PlannedCategory::Skipped { reason, .. } => {
                writeln!(out, "{} ({}): skipped, {}", info.canonical, info.fixture_pattern, reason)?;
            }
        }
    }
    writeln!(out, "{total} fixture run(s) in {} categor(ies)", plan.len())
}

// ============================================================================
// check
// ============================================================================

/// Run a single fixture and print everything the harness observed.
pub fn check_fixture(args: &CheckArgs) -> CliResult<ExitCode> {
    if !args.file.is_file() {
        return Err(CliError::usage(format!("Error: fixture `{}` not found", args.file.display())));
    }

    let invocation = Invocation::for_category(args.category.info(), &args.executable, &args.instrumentation_tool);
    let runner = ProcessRunner::with_timeout(Duration::from_secs(args.timeout));
    let syntax = comment_syntax(&args.comment_markers);
    let driver = CategoryDriver::new(args.category, invocation, &runner, &syntax);
    let report = driver.run_fixture(&args.file);

    let color = args.color.enabled();
    let mut out = io::stdout().lock();
    write_check(&mut out, driver.invocation(), &report, color)
        .map_err(|e| CliError::failure(format!("Error writing report: {e}")))?;

    let passed = report.verdict() == Verdict::Pass;
    Ok(if passed { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn write_check(out: &mut impl Write, invocation: &Invocation, report: &FixtureReport, color: bool) -> io::Result<()> {
    let info = report.category.info();
    writeln!(out, "fixture:    {}", report.path.display())?;
    writeln!(out, "category:   {} ({})", info.canonical, info.description)?;
    writeln!(out, "invocation: {invocation} < {}", display_name(&report.path))?;

    if let Some(v) = report.verification() {
        writeln!(out, "exit code:  {} (expected {})", v.execution.exit_code, v.expected_exit_code)?;
        writeln!(out, "declared:   {}", v.annotations)?;
        writeln!(out, "actual:     {}", v.counts.actual)?;
        if !v.counts.is_checkable() {
            writeln!(out, "counts:     not checked")?;
        }
        for failure in v.failures() {
            writeln!(out, "failure:    {failure}")?;
        }
        if !v.execution.stderr.is_empty() {
            writeln!(out, "--- stderr ---")?;
            write!(out, "{}", v.execution.stderr)?;
            if !v.execution.stderr.ends_with('\n') {
                writeln!(out)?;
            }
        }
    }
    if let Some(error) = report.error() {
        writeln!(out, "error:      {error}")?;
    }

    let mut reporter = ConsoleReporter::new(&mut *out, false, color);
    reporter.on_fixture_complete(report);
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use clap::Parser;

    use crate::cli::{Cli, Command};
    use crate::driver::{FixtureStatus, Verification};
    use crate::runner::ExecutionResult;
    use tpcheck_core::{CategoryId, DiagnosticCounts, ExpectedCounts, compare_counts};

    fn run_args(argv: &[&str]) -> RunArgs {
        let mut full = vec!["tpcheck", "run"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Some(Command::Run(args)) => args,
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn run_config_missing_root_is_usage_error() {
        let err = run_config(&run_args(&["--root", "/definitely/not/here"])).unwrap_err();
        assert_eq!(err.exit_code, ExitCode::USAGE);
        assert!(err.message.contains("/definitely/not/here"), "{}", err.message);
    }

    #[test]
    fn run_config_applies_selection() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().to_str().unwrap();
        let config = run_config(&run_args(&[
            "--root",
            root,
            "--no-instrumented",
            "-j",
            "3",
            "--timeout",
            "0",
            "--comment-marker",
            "#",
        ]))
        .unwrap();
        assert_eq!(config.categories.len(), 5);
        assert_eq!(config.jobs, 3);
        assert!(config.timeout.is_zero());
        assert_eq!(config.comment_syntax.markers().collect::<Vec<_>>(), ["#"]);

        // Selecting only instrumented categories and then excluding them leaves nothing to run.
        let err = run_config(&run_args(&["--root", root, "-c", "memcheck-good", "--no-instrumented"])).unwrap_err();
        assert_eq!(err.exit_code, ExitCode::USAGE);
    }

    #[test]
    fn plan_listing() {
        let plan = vec![
            PlannedCategory::Ready {
                category: CategoryId::SyntaxReject,
                fixtures: vec![PathBuf::from("t/syn-err/a.c"), PathBuf::from("t/syn-err/b.c")],
            },
            PlannedCategory::Skipped {
                category: CategoryId::SemanticWarning,
                reason: "fixture directory `t/warn` does not exist".to_string(),
            },
        ];
        let mut out = Vec::new();
        write_plan(&mut out, &plan).unwrap();
        insta::assert_snapshot!(String::from_utf8(out).unwrap().trim_end(), @r"
        syntax-reject (syn-err/*, expects exit 1): 2 fixture(s)
          t/syn-err/a.c
          t/syn-err/b.c
        semantic-warning (warn/*): skipped, fixture directory `t/warn` does not exist
        2 fixture run(s) in 2 categor(ies)
        ");
    }

    #[test]
    fn check_output() {
        let expected = ExpectedCounts::new(Some(1), Some(0));
        let report = FixtureReport {
            path: PathBuf::from("warn/unused.c"),
            category: CategoryId::SemanticWarning,
            status: FixtureStatus::Checked(Verification {
                expected_exit_code: 0,
                execution: ExecutionResult {
                    exit_code: 0,
                    stdout: String::new(),
                    stderr: "3:5: warning: unused x\n4:5: warning: unused y".to_string(),
                    duration: Duration::ZERO,
                },
                annotations: expected,
                counts: compare_counts(expected, DiagnosticCounts::new(2, 0)),
                exit_code_hint: CategoryId::SemanticWarning.info().failure_hint,
            }),
            duration: Duration::ZERO,
        };
        let invocation = Invocation::new("./bin/tpcas").with_flags(["--only-semantic"]);

        let mut out = Vec::new();
        write_check(&mut out, &invocation, &report, false).unwrap();
        insta::assert_snapshot!(String::from_utf8(out).unwrap().trim_end(), @r"
        fixture:    warn/unused.c
        category:   semantic-warning (Programs with semantic warnings are accepted.)
        invocation: ./bin/tpcas --only-semantic < unused.c
        exit code:  0 (expected 0)
        declared:   (W=1, E=0)
        actual:     (W=2, E=0)
        failure:    diagnostic counts: expected (W=1, E=0), got (W=2, E=0)
        --- stderr ---
        3:5: warning: unused x
        4:5: warning: unused y
        warn/unused.c FAILED
            diagnostic counts: expected (W=1, E=0), got (W=2, E=0)
        ");
    }

    #[test]
    fn check_missing_fixture_is_usage_error() {
        let cli = Cli::try_parse_from(["tpcheck", "check", "/definitely/not/here.c", "-c", "good"]).unwrap();
        let Some(Command::Check(args)) = cli.command else {
            panic!("expected check");
        };
        let err = check_fixture(&args).unwrap_err();
        assert_eq!(err.exit_code, ExitCode::USAGE);
    }
}
