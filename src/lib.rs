#![forbid(unsafe_code)]
//! Regression-test harness for a compiler front end.
//!
//! `tpcheck` feeds fixture files to a compiler under test, checks its exit code against the fixture's
//! category, and checks the number of warnings and errors it printed against counts the fixture declares in
//! its own comments. The pure verification core (annotation extraction, diagnostic counting, comparison, the
//! category table) lives in [`tpcheck_core`]; this crate adds processes, the file system, and reporting.
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! - **True invariants**: If a panic represents a harness bug (logic error), use `.expect("INVARIANT: reason")`
//!   with a clear explanation.

pub mod cli;
pub mod discovery;
pub mod driver;
pub mod harness;
pub mod report;
pub mod runner;
pub mod version;

pub use tpcheck_core::{CategoryId, CommentSyntax, DiagnosticCounts, ExpectedCounts};

pub use discovery::{FixtureDiscovery, FsDiscovery};
pub use driver::{CategoryDriver, CategoryReport, FixtureReport, Verdict};
pub use harness::{Harness, HarnessConfig, HarnessError};
pub use report::{ConsoleReporter, Reporter, RunSummary};
pub use runner::{ExecutionResult, FixtureExecutor, Invocation, ProcessRunner, RunError};
