//! PromQL recording-rule candidate analysis with rich diagnostics.
//!
//! This library parses PromQL queries and analyzes the resulting expression
//! trees: it finds the subtrees that are safe to precompute as recording
//! rules, renders value-insensitive signatures for them, derives stable
//! rule names, and diffs the selectors of related queries. Errors are
//! reported through miette for readable diagnostic messages.
//!
//! # Example
//!
//! ```
//! use promql_analyzer::{ExtractOptions, extract_candidates, parse};
//!
//! let result = parse(r#"sum by (job) (http_requests_total{env="prod"})"#);
//! assert!(result.diagnostics.is_empty());
//!
//! let expr = result.ast.expect("query parses");
//! let report = extract_candidates(&expr, &ExtractOptions::default());
//!
//! // The whole query is safe to precompute; its rule name is stable
//! // across matcher-value changes.
//! assert_eq!(report.candidates.len(), 1);
//! assert!(report.candidates[0].metric_name.starts_with("recording_rule_"));
//! ```

pub mod analysis;
pub mod ast;
pub mod diag;
pub mod lexer;
pub mod parser;

// Re-export syntax primitives.
pub use ast::{Expr, Span, SelectorWithPath, collect_selectors, walk_expr};

// Re-export diagnostics and lexer types for convenience.
pub use diag::{Diag, DiagLabel, DiagSeverity, LabelRole};
pub use lexer::token::{Token, TokenKind};
pub use lexer::{Lexer, LexerResult, tokenize};

// Re-export the parser entry points.
pub use parser::{ParseResult, Parser, parse};

// Re-export the analysis layer.
pub use analysis::{
    DiffReason, DiffSide, ExtractOptions, ExtractionReport, LabelVariance, MatcherSetDiff,
    QueryReport, RuleCandidate, SafeRoot, SelectorDiffEntry, Signature, SignatureError,
    SignatureOptions, diff_matcher_sets, diff_selector_sets, expr_signature, extract_candidates,
    extract_from_queries, find_safe_roots, hashed_metric_name, is_safe,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_api_accessible() {
        let _span: Span = 0..5;
        let result = parse("up");
        assert!(result.ast.is_some());
    }
}
