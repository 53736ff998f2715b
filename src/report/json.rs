//! Machine-readable run report.

use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;
use tpcheck_core::{DiagnosticCounts, ExpectedCounts};

use super::RunSummary;
use crate::driver::{CategoryReport, FixtureReport};
use crate::version::TPCHECK_VERSION;

#[derive(Debug, Serialize)]
pub struct JsonReport {
    pub version: &'static str,
    pub success: bool,
    pub duration_secs: f64,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub categories: Vec<JsonCategory>,
    pub skipped: Vec<JsonSkipped>,
}

#[derive(Debug, Serialize)]
pub struct JsonCategory {
    pub name: &'static str,
    pub pattern: &'static str,
    pub invocation: String,
    pub expected_exit_code: i32,
    pub run: usize,
    pub exit_code_ok: usize,
    pub count_checked: usize,
    pub count_mismatches: usize,
    pub fixtures: Vec<JsonFixture>,
}

#[derive(Debug, Serialize)]
pub struct JsonFixture {
    pub path: String,
    pub verdict: &'static str,
    pub duration_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared: Option<JsonExpected>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<JsonCounts>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JsonExpected {
    pub warnings: Option<u32>,
    pub errors: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct JsonCounts {
    pub warnings: u32,
    pub errors: u32,
}

#[derive(Debug, Serialize)]
pub struct JsonSkipped {
    pub name: &'static str,
    pub reason: String,
}

impl From<ExpectedCounts> for JsonExpected {
    fn from(c: ExpectedCounts) -> Self {
        Self {
            warnings: c.warnings,
            errors: c.errors,
        }
    }
}

impl From<DiagnosticCounts> for JsonCounts {
    fn from(c: DiagnosticCounts) -> Self {
        Self {
            warnings: c.warnings,
            errors: c.errors,
        }
    }
}

impl From<&FixtureReport> for JsonFixture {
    fn from(report: &FixtureReport) -> Self {
        let verification = report.verification();
        Self {
            path: report.path.display().to_string(),
            verdict: report.verdict().as_str(),
            duration_ms: report.duration.as_millis(),
            exit_code: verification.map(|v| v.execution.exit_code),
            declared: verification.map(|v| v.annotations.into()),
            actual: verification.map(|v| v.counts.actual.into()),
            failures: verification
                .map(|v| v.failures().iter().map(ToString::to_string).collect())
                .unwrap_or_default(),
            error: report.error().map(ToString::to_string),
        }
    }
}

impl From<&CategoryReport> for JsonCategory {
    fn from(report: &CategoryReport) -> Self {
        let info = report.category.info();
        let stats = report.stats();
        Self {
            name: info.canonical,
            pattern: info.fixture_pattern,
            invocation: report.invocation.to_string(),
            expected_exit_code: info.expected_exit_code,
            run: stats.run,
            exit_code_ok: stats.exit_code_ok,
            count_checked: stats.count_checked,
            count_mismatches: stats.count_mismatches,
            fixtures: report.fixtures.iter().map(JsonFixture::from).collect(),
        }
    }
}

impl From<&RunSummary> for JsonReport {
    fn from(summary: &RunSummary) -> Self {
        let totals = summary.totals();
        Self {
            version: TPCHECK_VERSION,
            success: totals.is_success(),
            duration_secs: summary.duration.as_secs_f64(),
            passed: totals.passed,
            failed: totals.failed,
            errors: totals.errors,
            categories: summary.categories.iter().map(JsonCategory::from).collect(),
            skipped: summary
                .skipped
                .iter()
                .map(|(category, reason)| JsonSkipped {
                    name: category.as_str(),
                    reason: reason.clone(),
                })
                .collect(),
        }
    }
}

/// Serialize `summary` as pretty JSON into `path`.
pub fn write_json_report(summary: &RunSummary, path: &Path) -> io::Result<()> {
    let json = serde_json::to_string_pretty(&JsonReport::from(summary)).map_err(io::Error::other)?;
    fs::write(path, json + "\n")
}
