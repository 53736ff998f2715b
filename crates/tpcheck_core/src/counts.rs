//! Diagnostic count values shared by the extractor, the counter, and the comparator.

use std::fmt;

/// A fully known pair of diagnostic counts.
///
/// Produced by [`crate::count_diagnostics`] (actual counts) and by [`ExpectedCounts::complete`] once both
/// annotation directives are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DiagnosticCounts {
    pub warnings: u32,
    pub errors: u32,
}

impl DiagnosticCounts {
    /// No warnings and no errors.
    pub const ZERO: DiagnosticCounts = DiagnosticCounts { warnings: 0, errors: 0 };

    pub const fn new(warnings: u32, errors: u32) -> Self {
        Self { warnings, errors }
    }
}

impl fmt::Display for DiagnosticCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(W={}, E={})", self.warnings, self.errors)
    }
}

/// Expected counts as declared by a fixture's annotation directives.
///
/// Either field may be absent. Count verification only applies when both are present; see
/// [`ExpectedCounts::is_fully_present`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ExpectedCounts {
    pub warnings: Option<u32>,
    pub errors: Option<u32>,
}

impl ExpectedCounts {
    /// No directive found.
    pub const ABSENT: ExpectedCounts = ExpectedCounts { warnings: None, errors: None };

    pub const fn new(warnings: Option<u32>, errors: Option<u32>) -> Self {
        Self { warnings, errors }
    }

    /// `true` only when both the warning and the error directive were found.
    pub fn is_fully_present(&self) -> bool {
        self.warnings.is_some() && self.errors.is_some()
    }

    /// `true` when exactly one of the two directives was found.
    ///
    /// Such fixtures are exempt from count verification, which is easy to miss when writing them.
    pub fn is_partial(&self) -> bool {
        self.warnings.is_some() != self.errors.is_some()
    }

    /// `true` when no directive was found at all.
    pub fn is_absent(&self) -> bool {
        self.warnings.is_none() && self.errors.is_none()
    }

    /// Return the counts when both directives are present.
    pub fn complete(&self) -> Option<DiagnosticCounts> {
        Some(DiagnosticCounts::new(self.warnings?, self.errors?))
    }

    /// Fall back to counts a category requires when the fixture declares no directive at all.
    ///
    /// Any directive opts the fixture out of the fallback: a full pair keeps its own expectation, and a
    /// partial one stays unchecked like in every other category.
    pub fn or_required(self, required: Option<DiagnosticCounts>) -> Self {
        match required {
            Some(required) if self.is_absent() => required.into(),
            _ => self,
        }
    }
}

impl From<DiagnosticCounts> for ExpectedCounts {
    fn from(counts: DiagnosticCounts) -> Self {
        Self::new(Some(counts.warnings), Some(counts.errors))
    }
}

impl fmt::Display for ExpectedCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: Option<u32>| v.map_or_else(|| "?".to_string(), |n| n.to_string());
        write!(f, "(W={}, E={})", show(self.warnings), show(self.errors))
    }
}
