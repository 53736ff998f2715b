//! Expected-count directives embedded in fixture text.
//!
//! A fixture declares how many diagnostics the compiler should emit for it with comment directives:
//!
//! ```text
//! // nb_warnings=1
//! // nb_errors=0
//! int main(void) { ... }
//! ```
//!
//! ## Notes
//!
//! - A directive is `<comment marker>`, optional spaces/tabs, `<name>=<digits>`. It may follow code on the same line.
//! - When a name appears more than once, the first occurrence in document order wins. This is not an error.
//! - A digit run that does not fit in `u32` is not a directive; the scan moves on to the next candidate.

use crate::counts::ExpectedCounts;

/// Directive name for the expected number of warning lines.
pub const NB_WARNINGS: &str = "nb_warnings";

/// Directive name for the expected number of error lines.
pub const NB_ERRORS: &str = "nb_errors";

/// Comment markers that may introduce a directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentSyntax {
    markers: Vec<String>,
}

impl CommentSyntax {
    /// Line and block comment openers of the C-like fixture language.
    pub const C_MARKERS: &'static [&'static str] = &["//", "/*"];

    /// Build a syntax from explicit markers. Empty markers are ignored.
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            markers: markers.into_iter().map(Into::into).filter(|m: &String| !m.is_empty()).collect(),
        }
    }

    pub fn markers(&self) -> impl Iterator<Item = &str> {
        self.markers.iter().map(String::as_str)
    }
}

impl Default for CommentSyntax {
    fn default() -> Self {
        Self::new(Self::C_MARKERS.iter().copied())
    }
}

/// Extract both expected counts using the default C comment markers.
///
/// ## Examples
/// ```rust
/// use tpcheck_core::{extract_expected_counts, ExpectedCounts};
///
/// let expected = extract_expected_counts("// nb_errors=2\nbroken code");
/// assert_eq!(expected, ExpectedCounts::new(None, Some(2)));
/// assert!(!expected.is_fully_present());
/// ```
pub fn extract_expected_counts(text: &str) -> ExpectedCounts {
    extract_expected_counts_with(text, &CommentSyntax::default())
}

/// Extract both expected counts using the given comment markers.
pub fn extract_expected_counts_with(text: &str, syntax: &CommentSyntax) -> ExpectedCounts {
    ExpectedCounts::new(
        find_directive(text, syntax, NB_WARNINGS),
        find_directive(text, syntax, NB_ERRORS),
    )
}

/// Find the first directive named `name` in `text`.
///
/// ## Returns
/// - `Some(value)` for the first well-formed directive in document order, `None` if there is none.
pub fn find_directive(text: &str, syntax: &CommentSyntax, name: &str) -> Option<u32> {
    text.lines().find_map(|line| directive_in_line(line, syntax, name))
}

fn directive_in_line(line: &str, syntax: &CommentSyntax, name: &str) -> Option<u32> {
    // Several markers can match one line; the leftmost candidate is the earliest in the document.
    let mut earliest: Option<(usize, u32)> = None;
    for marker in syntax.markers() {
        let found = line
            .match_indices(marker)
            .find_map(|(idx, _)| parse_directive(&line[idx + marker.len()..], name).map(|v| (idx, v)));
        if let Some((idx, value)) = found {
            if earliest.is_none_or(|(best, _)| idx < best) {
                earliest = Some((idx, value));
            }
        }
    }
    earliest.map(|(_, value)| value)
}

fn parse_directive(after_marker: &str, name: &str) -> Option<u32> {
    let rest = after_marker.trim_start_matches([' ', '\t']);
    let value = rest.strip_prefix(name)?.strip_prefix('=')?;
    let end = value.find(|c: char| !c.is_ascii_digit()).unwrap_or(value.len());
    value[..end].parse().ok()
}
