//! Counting severity markers in a compiler's diagnostic stream.
//!
//! The compiler under test is a black box; the only contract relied on is that every warning line contains
//! `warning:` and every error line contains `error:`.

use crate::counts::DiagnosticCounts;

/// Marker identifying a warning line.
pub const WARNING_MARKER: &str = "warning:";

/// Marker identifying an error line.
pub const ERROR_MARKER: &str = "error:";

/// Count warning and error lines in `stream`.
///
/// ## Notes
/// - Matching is a case-sensitive substring test, scoped per line.
/// - A line containing both markers counts once for each severity.
/// - A line containing the same marker twice still counts once.
///
/// ## Examples
/// ```rust
/// use tpcheck_core::{count_diagnostics, DiagnosticCounts};
///
/// let stream = "error: position: 3:1: undeclared `x`\nwarning: position: 4:2: narrowing\n";
/// assert_eq!(count_diagnostics(stream), DiagnosticCounts::new(1, 1));
/// ```
pub fn count_diagnostics(stream: &str) -> DiagnosticCounts {
    stream.lines().fold(DiagnosticCounts::ZERO, |mut counts, line| {
        if line.contains(WARNING_MARKER) {
            counts.warnings += 1;
        }
        if line.contains(ERROR_MARKER) {
            counts.errors += 1;
        }
        counts
    })
}
