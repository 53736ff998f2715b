//! Harness controller: run the selected categories in order and collect one summary.
//!
//! The controller owns configuration and fixture selection. Per-fixture work is delegated to
//! [`CategoryDriver`]; output goes to the caller's [`Reporter`].

use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tpcheck_core::category::INSTRUMENTATION_TOOL;
use tpcheck_core::{CategoryId, CommentSyntax};

use crate::discovery::{DiscoveryError, FixtureDiscovery, FsDiscovery};
use crate::driver::CategoryDriver;
use crate::report::{Level, Reporter, RunSummary};
use crate::runner::{FixtureExecutor, Invocation, ProcessRunner};

/// Default fixture root, relative to the working directory.
pub const DEFAULT_ROOT: &str = "tests";

/// Default compiler under test.
pub const DEFAULT_EXECUTABLE: &str = "./bin/tpcas";

/// Default per-invocation timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration errors. These abort the run before any fixture executes.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("fixture root `{}` is not a directory", .0.display())]
    RootNotFound(PathBuf),

    #[error("no categories selected")]
    NoCategories,

    #[error("invalid fixture pattern for category `{category}`: {source}")]
    Discovery {
        category: CategoryId,
        #[source]
        source: DiscoveryError,
    },
}

/// Validated harness configuration.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub root: PathBuf,
    pub executable: PathBuf,
    /// Categories to run, in run order.
    pub categories: Vec<CategoryId>,
    pub jobs: usize,
    /// Per-invocation timeout. Zero disables the limit.
    pub timeout: Duration,
    pub instrumentation_tool: PathBuf,
    /// Only run fixtures whose file name contains this substring.
    pub filter: Option<String>,
    pub comment_syntax: CommentSyntax,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            executable: PathBuf::from(DEFAULT_EXECUTABLE),
            categories: CategoryId::all().collect(),
            jobs: default_jobs(),
            timeout: DEFAULT_TIMEOUT,
            instrumentation_tool: PathBuf::from(INSTRUMENTATION_TOOL),
            filter: None,
            comment_syntax: CommentSyntax::default(),
        }
    }
}

/// One worker per available CPU.
pub fn default_jobs() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

impl HarnessConfig {
    /// Check the configuration and normalize the category list to run order without duplicates.
    pub fn validate(mut self) -> Result<Self, HarnessError> {
        if !self.root.is_dir() {
            return Err(HarnessError::RootNotFound(self.root));
        }
        self.categories.sort();
        self.categories.dedup();
        if self.categories.is_empty() {
            return Err(HarnessError::NoCategories);
        }
        self.jobs = self.jobs.max(1);
        Ok(self)
    }

    /// Drop the instrumented categories.
    pub fn without_instrumented(mut self) -> Self {
        self.categories.retain(|c| !c.info().instrumented);
        self
    }

    pub fn invocation_for(&self, category: CategoryId) -> Invocation {
        Invocation::for_category(category.info(), &self.executable, &self.instrumentation_tool)
    }

    fn matches_filter(&self, path: &Path) -> bool {
        let Some(filter) = self.filter.as_deref() else {
            return true;
        };
        path.file_name()
            .is_some_and(|name| name.to_string_lossy().contains(filter))
    }
}

/// Fixtures selected for one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedCategory {
    Ready { category: CategoryId, fixtures: Vec<PathBuf> },
    /// The fixture directory is missing; the category is reported and skipped.
    Skipped { category: CategoryId, reason: String },
}

impl PlannedCategory {
    pub fn category(&self) -> CategoryId {
        match self {
            PlannedCategory::Ready { category, .. } | PlannedCategory::Skipped { category, .. } => *category,
        }
    }
}

/// Runs categories against a compiler.
pub struct Harness<D = FsDiscovery, E = ProcessRunner> {
    config: HarnessConfig,
    discovery: D,
    executor: E,
}

impl Harness {
    /// A harness over the local file system and real processes.
    pub fn new(config: HarnessConfig) -> Self {
        let executor = ProcessRunner::with_timeout(config.timeout);
        Self::with_parts(config, FsDiscovery, executor)
    }
}

impl<D: FixtureDiscovery, E: FixtureExecutor> Harness<D, E> {
    pub fn with_parts(config: HarnessConfig, discovery: D, executor: E) -> Self {
        Self {
            config,
            discovery,
            executor,
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// List the fixtures of every selected category without running anything.
    pub fn plan(&self) -> Result<Vec<PlannedCategory>, HarnessError> {
        self.config
            .categories
            .iter()
            .map(|&category| self.plan_category(category))
            .collect()
    }

    fn plan_category(&self, category: CategoryId) -> Result<PlannedCategory, HarnessError> {
        let pattern = category.info().fixture_pattern;
        match self.discovery.discover(&self.config.root, pattern) {
            Ok(fixtures) => Ok(PlannedCategory::Ready {
                category,
                fixtures: fixtures
                    .into_iter()
                    .filter(|path| self.config.matches_filter(path))
                    .collect(),
            }),
            Err(e @ DiscoveryError::MissingDir(_)) => Ok(PlannedCategory::Skipped {
                category,
                reason: e.to_string(),
            }),
            Err(source) => Err(HarnessError::Discovery { category, source }),
        }
    }

    /// Run every selected category and report the results.
    ///
    /// Fixture failures never abort the sweep; only configuration problems found while planning do.
    pub fn run(&self, reporter: &mut dyn Reporter) -> Result<RunSummary, HarnessError> {
        let start = Instant::now();
        let plan = self.plan()?;

        let counts: Vec<(CategoryId, usize)> = plan
            .iter()
            .filter_map(|entry| match entry {
                PlannedCategory::Ready { category, fixtures } => Some((*category, fixtures.len())),
                PlannedCategory::Skipped { .. } => None,
            })
            .collect();
        reporter.on_run_start(&counts);

        let mut summary = RunSummary::default();
        for entry in plan {
            match entry {
                PlannedCategory::Ready { category, fixtures } => {
                    let driver = CategoryDriver::new(
                        category,
                        self.config.invocation_for(category),
                        &self.executor,
                        &self.config.comment_syntax,
                    )
                    .with_jobs(self.config.jobs);
                    summary.categories.push(driver.run(&fixtures, reporter));
                }
                PlannedCategory::Skipped { category, reason } => {
                    tracing::warn!(%category, %reason, "skipping category");
                    reporter.emit(Level::Warn, &format!("skipping {category}: {reason}"));
                    summary.skipped.push((category, reason));
                }
            }
        }

        summary.duration = start.elapsed();
        reporter.on_run_complete(&summary);
        Ok(summary)
    }
}
