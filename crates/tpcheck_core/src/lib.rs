//! Provide the pure verification core of the `tpcheck` compiler regression harness.
//!
//! Everything here is deterministic and free of I/O: the harness crate feeds in fixture text and captured
//! diagnostic streams, and gets back counts, comparisons, and the fixed category table.
//!
//! ## Notes
//!
//! - This is a "verification core" crate: **no IO**, no global state, no process handling.
//! - Current scope: annotation extraction ([`annotations`]), diagnostic counting ([`diagnostics`]), count
//!   comparison ([`outcome`]), and the category/invocation registry ([`category`]).

pub mod annotations;
pub mod category;
pub mod counts;
pub mod diagnostics;
pub mod outcome;

pub use annotations::{CommentSyntax, extract_expected_counts, extract_expected_counts_with};
pub use category::{CategoryId, CategoryInfo};
pub use counts::{DiagnosticCounts, ExpectedCounts};
pub use diagnostics::count_diagnostics;
pub use outcome::{CountComparison, compare_counts};
