//! Source-position primitives shared by tokens and AST nodes.

use std::ops::Range;

/// A span representing a byte range in the query text.
/// This is the canonical span type used throughout the analyzer.
pub type Span = Range<usize>;

/// Merges two spans into a single span covering both.
pub fn merge_spans(start: &Span, end: &Span) -> Span {
    start.start..end.end
}
