//! CLI module for the tpcheck harness
//!
//! This module provides the command-line interface for the harness.
//!
//! ## Commands
//!
//! - `run` - Run the selected categories against the compiler (the default when no subcommand is given)
//! - `list` - Show the fixtures each category would run
//! - `check <file>` - Run a single fixture and show everything observed
//!
//! ## Modules
//!
//! - `commands` - Command implementations
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
use tpcheck_core::CategoryId;
use tpcheck_core::category::INSTRUMENTATION_TOOL;

use crate::harness::{DEFAULT_EXECUTABLE, DEFAULT_ROOT, HarnessError};
use crate::report::ColorChoice;
use crate::version::TPCHECK_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    /// At least one fixture failed or could not be run.
    pub const FAILURE: ExitCode = ExitCode(1);
    /// The harness itself was misconfigured.
    pub const USAGE: ExitCode = ExitCode(2);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }

    /// Create a configuration error (exit code 2).
    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::USAGE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<HarnessError> for CliError {
    fn from(e: HarnessError) -> Self {
        CliError::usage(format!("Error: {e}"))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Regression-test harness for a compiler front end
#[derive(Parser, Debug)]
#[command(name = "tpcheck")]
#[command(version = TPCHECK_VERSION)]
#[command(about = "Run compiler fixtures and verify exit codes and diagnostic counts", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Options for the default `run` action
    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the fixture categories against the compiler
    Run(RunArgs),

    /// List the fixtures each category would run
    List(ListArgs),

    /// Run one fixture and show the full verdict
    Check(CheckArgs),
}

/// Where the fixtures and the compiler live.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Fixture root directory
    #[arg(long, value_name = "DIR", default_value = DEFAULT_ROOT)]
    pub root: PathBuf,

    /// Compiler executable under test
    #[arg(short = 'e', long, value_name = "PATH", default_value = DEFAULT_EXECUTABLE)]
    pub executable: PathBuf,

    /// Instrumentation tool used by the instrumented categories
    #[arg(long, value_name = "PATH", default_value = INSTRUMENTATION_TOOL)]
    pub instrumentation_tool: PathBuf,
}

/// Which fixtures to run.
#[derive(Args, Debug, Clone)]
pub struct SelectionArgs {
    /// Category to run (repeatable; default: all)
    #[arg(short = 'c', long = "category", value_name = "NAME")]
    pub categories: Vec<CategoryId>,

    /// Skip the categories that run under the instrumentation tool
    #[arg(long)]
    pub no_instrumented: bool,

    /// Only run fixtures whose file name contains EXPR
    #[arg(short = 'k', value_name = "EXPR")]
    pub filter: Option<String>,

    /// Comment marker that introduces count directives (repeatable; default: `//` and `/*`)
    #[arg(long = "comment-marker", value_name = "MARKER")]
    pub comment_markers: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Number of fixtures run concurrently (default: available CPUs)
    #[arg(short = 'j', long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Per-fixture timeout in seconds (0 disables)
    #[arg(long, value_name = "SECS", default_value_t = 10)]
    pub timeout: u64,

    /// Verbose output (invocations, timings, captured diagnostics of failures)
    #[arg(short, long)]
    pub verbose: bool,

    /// When to use colors
    #[arg(long, value_enum, value_name = "WHEN", default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Also write a JSON report to PATH
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Fixture root directory
    #[arg(long, value_name = "DIR", default_value = DEFAULT_ROOT)]
    pub root: PathBuf,

    #[command(flatten)]
    pub selection: SelectionArgs,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Fixture file to run
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Category whose expectations apply
    #[arg(short = 'c', long, value_name = "NAME")]
    pub category: CategoryId,

    /// Compiler executable under test
    #[arg(short = 'e', long, value_name = "PATH", default_value = DEFAULT_EXECUTABLE)]
    pub executable: PathBuf,

    /// Instrumentation tool used by the instrumented categories
    #[arg(long, value_name = "PATH", default_value = INSTRUMENTATION_TOOL)]
    pub instrumentation_tool: PathBuf,

    /// Timeout in seconds (0 disables)
    #[arg(long, value_name = "SECS", default_value_t = 10)]
    pub timeout: u64,

    /// Comment marker that introduces count directives (repeatable)
    #[arg(long = "comment-marker", value_name = "MARKER")]
    pub comment_markers: Vec<String>,

    /// When to use colors
    #[arg(long, value_enum, value_name = "WHEN", default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
pub fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Some(Command::Run(args)) => commands::run_fixtures(&args),
        Some(Command::List(args)) => commands::list_fixtures(&args),
        Some(Command::Check(args)) => commands::check_fixture(&args),
        None => commands::run_fixtures(&cli.run),
    }
}

// ============================================================================
// Tests
// ============================================================================
