//! Fixture category registry.
//!
//! Each category names a fixture directory, the flags the compiler is invoked with, the exit code it must
//! return, and whether the run happens under the memory-instrumentation tool. The table order is the order in
//! which the harness runs categories.
//!
//! ## Notes
//! - The table is the single source of truth: downstream code matches on [`CategoryId`] or reads
//!   [`CategoryInfo`], never compares category names as strings.
//! - Instrumented categories reuse the syntax fixtures and exit codes; the instrumentation tool reports memory
//!   errors with [`INSTRUMENTATION_ERROR_EXIT_CODE`], which no category expects.

use crate::counts::DiagnosticCounts;

/// Stable identifier for a fixture category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CategoryId {
    SyntaxAccept,
    SyntaxReject,
    SemanticError,
    SemanticWarning,
    SemanticClean,
    InstrumentedAccept,
    InstrumentedReject,
}

/// Memory-instrumentation tool used as the invocation prefix for instrumented categories.
pub const INSTRUMENTATION_TOOL: &str = "valgrind";

/// Exit code the instrumentation tool returns when it detects a memory error.
pub const INSTRUMENTATION_ERROR_EXIT_CODE: i32 = 42;

/// Flags passed to [`INSTRUMENTATION_TOOL`]: distinct exit code on memory errors, no leak check, origin tracking.
pub const INSTRUMENTATION_FLAGS: &[&str] =
    &["--error-exitcode=42", "--leak-check=no", "--track-origins=yes", "--quiet"];

/// Compiler flag that stops after building the syntax tree.
pub const FLAG_ONLY_TREE: &str = "--only-tree";

/// Compiler flag that stops after semantic analysis.
pub const FLAG_ONLY_SEMANTIC: &str = "--only-semantic";

/// Metadata entry for a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryInfo {
    pub id: CategoryId,
    /// Name used on the command line and in reports.
    pub canonical: &'static str,
    pub aliases: &'static [&'static str],
    pub description: &'static str,
    /// `<dir>/<file glob>`, relative to the fixture root.
    pub fixture_pattern: &'static str,
    /// Flags passed to the compiler under test.
    pub flags: &'static [&'static str],
    pub expected_exit_code: i32,
    /// Run under [`INSTRUMENTATION_TOOL`].
    pub instrumented: bool,
    /// Counts a fixture must produce when it declares no count directive.
    pub required_counts: Option<DiagnosticCounts>,
    /// Message attached to an exit-code mismatch.
    pub failure_hint: &'static str,
}

impl CategoryInfo {
    /// Directory component of [`CategoryInfo::fixture_pattern`].
    pub fn fixture_dir(&self) -> &'static str {
        self.fixture_pattern.rsplit_once('/').map_or("", |(dir, _)| dir)
    }

    /// File-name glob component of [`CategoryInfo::fixture_pattern`].
    pub fn file_glob(&self) -> &'static str {
        self.fixture_pattern.rsplit_once('/').map_or(self.fixture_pattern, |(_, glob)| glob)
    }
}

/// Registry of categories, in run order.
pub const CATEGORIES: &[CategoryInfo] = &[
    CategoryInfo {
        id: CategoryId::SyntaxAccept,
        canonical: "syntax-accept",
        aliases: &["good", "valid"],
        description: "Syntactically valid programs are accepted.",
        fixture_pattern: "good/*",
        flags: &[FLAG_ONLY_TREE],
        expected_exit_code: 0,
        instrumented: false,
        required_counts: None,
        failure_hint: "Input was not accepted while it should",
    },
    CategoryInfo {
        id: CategoryId::SyntaxReject,
        canonical: "syntax-reject",
        aliases: &["syn-err", "invalid"],
        description: "Syntactically invalid programs are rejected with exit code 1.",
        fixture_pattern: "syn-err/*",
        flags: &[FLAG_ONLY_TREE],
        expected_exit_code: 1,
        instrumented: false,
        required_counts: None,
        failure_hint: "Input was accepted while it should not",
    },
    CategoryInfo {
        id: CategoryId::SemanticError,
        canonical: "semantic-error",
        aliases: &["sem-err"],
        description: "Programs with semantic errors are rejected with exit code 2.",
        fixture_pattern: "sem-err/*",
        flags: &[FLAG_ONLY_SEMANTIC],
        expected_exit_code: 2,
        instrumented: false,
        required_counts: None,
        failure_hint: "Semantic errors were not reported while they should",
    },
    CategoryInfo {
        id: CategoryId::SemanticWarning,
        canonical: "semantic-warning",
        aliases: &["warn"],
        description: "Programs with semantic warnings are accepted.",
        fixture_pattern: "warn/*",
        flags: &[FLAG_ONLY_SEMANTIC],
        expected_exit_code: 0,
        instrumented: false,
        required_counts: None,
        failure_hint: "Warnings must not prevent acceptance",
    },
    CategoryInfo {
        id: CategoryId::SemanticClean,
        canonical: "semantic-clean",
        aliases: &["sem-good"],
        description: "Valid programs pass semantic analysis without any diagnostic.",
        fixture_pattern: "good/*",
        flags: &[FLAG_ONLY_SEMANTIC],
        expected_exit_code: 0,
        instrumented: false,
        required_counts: Some(DiagnosticCounts::ZERO),
        failure_hint: "Valid input was rejected by semantic analysis",
    },
    CategoryInfo {
        id: CategoryId::InstrumentedAccept,
        canonical: "instrumented-accept",
        aliases: &["memcheck-good"],
        description: "Valid programs are accepted under memory instrumentation.",
        fixture_pattern: "good/*",
        flags: &[FLAG_ONLY_TREE],
        expected_exit_code: 0,
        instrumented: true,
        required_counts: None,
        failure_hint: "Input was not accepted under instrumentation (exit 42 means a memory error)",
    },
    CategoryInfo {
        id: CategoryId::InstrumentedReject,
        canonical: "instrumented-reject",
        aliases: &["memcheck-syn-err"],
        description: "Invalid programs are rejected under memory instrumentation.",
        fixture_pattern: "syn-err/*",
        flags: &[FLAG_ONLY_TREE],
        expected_exit_code: 1,
        instrumented: true,
        required_counts: None,
        failure_hint: "Input was not rejected cleanly under instrumentation (exit 42 means a memory error)",
    },
];

/// Resolve a category name or alias to its stable id.
pub fn from_str(name: &str) -> Option<CategoryId> {
    if let Some(info) = CATEGORIES.iter().find(|c| c.canonical == name) {
        return Some(info.id);
    }
    CATEGORIES
        .iter()
        .find(|c| c.aliases.contains(&name))
        .map(|c| c.id)
}

/// Return the canonical spelling for a category.
pub fn as_str(id: CategoryId) -> &'static str {
    info_for(id).canonical
}

/// Return the metadata entry for a category.
pub fn info_for(id: CategoryId) -> &'static CategoryInfo {
    CATEGORIES.iter().find(|c| c.id == id).expect("category info missing")
}

impl CategoryId {
    /// All categories in run order.
    pub fn all() -> impl Iterator<Item = CategoryId> {
        CATEGORIES.iter().map(|c| c.id)
    }

    pub fn info(self) -> &'static CategoryInfo {
        info_for(self)
    }

    pub fn as_str(self) -> &'static str {
        as_str(self)
    }
}

impl std::fmt::Display for CategoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CategoryId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        from_str(s).ok_or_else(|| {
            let known: Vec<&str> = CATEGORIES.iter().map(|c| c.canonical).collect();
            format!("unknown category `{s}` (expected one of: {})", known.join(", "))
        })
    }
}
