//! Reconciling expected and actual diagnostic counts.

use crate::counts::{DiagnosticCounts, ExpectedCounts};

/// Expected and actual counts for one fixture run, plus the derived verdict.
///
/// Built by [`compare_counts`]; the verdict is derived on demand so the two inputs are always retained for
/// reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountComparison {
    pub expected: ExpectedCounts,
    pub actual: DiagnosticCounts,
}

impl CountComparison {
    /// Whether count verification applies (both directives present).
    pub fn is_checkable(&self) -> bool {
        self.expected.is_fully_present()
    }

    /// `Some(true)` if the counts match, `Some(false)` if they differ, `None` if not checkable.
    pub fn verdict(&self) -> Option<bool> {
        self.expected.complete().map(|expected| expected == self.actual)
    }

    /// `true` only for a checkable comparison whose counts differ.
    pub fn is_mismatch(&self) -> bool {
        self.verdict() == Some(false)
    }

    /// Render `expected (W=x, E=y), got (W=x', E=y')` for a mismatch.
    ///
    /// ## Returns
    /// - `None` when the comparison matches or is not checkable.
    pub fn mismatch_message(&self) -> Option<String> {
        self.is_mismatch()
            .then(|| format!("expected {}, got {}", self.expected, self.actual))
    }
}

/// Compare possibly partial expected counts against actual counts.
///
/// ## Examples
/// ```rust
/// use tpcheck_core::{compare_counts, DiagnosticCounts, ExpectedCounts};
///
/// let cmp = compare_counts(ExpectedCounts::new(Some(1), Some(0)), DiagnosticCounts::new(2, 0));
/// assert_eq!(cmp.verdict(), Some(false));
/// assert_eq!(cmp.mismatch_message().as_deref(), Some("expected (W=1, E=0), got (W=2, E=0)"));
/// ```
pub fn compare_counts(expected: ExpectedCounts, actual: DiagnosticCounts) -> CountComparison {
    CountComparison { expected, actual }
}
