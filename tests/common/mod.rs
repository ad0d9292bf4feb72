//! Common test utilities
//!
//! This module contains shared test helpers and fixtures used across
//! multiple integration test suites.
//!
//! # Diagnostic Helpers
//! - [`format_diagnostics`] - Format diagnostics for display in assertions
//! - [`assert_no_parse_errors`] - Assert that parsing produced no diagnostics
//! - [`assert_has_diagnostic_containing`] - Assert that a diagnostic mentions specific text
//!
//! # Parsing Helpers
//! - [`assert_parses_cleanly`] - Assert that a query parses without diagnostics
//! - [`parse_cleanly`] - Parse a query and return its AST, panicking on errors
//! - [`tokenize_cleanly`] - Tokenize a query and return its tokens, panicking on errors
//!
//! # Extraction Helpers
//! - [`extract_cleanly`] - Parse a query and extract rule candidates with default options

#![allow(dead_code)]

use promql_analyzer::analysis::{ExtractOptions, ExtractionReport, extract_candidates};
use promql_analyzer::ast::Expr;
use promql_analyzer::lexer::Lexer;
use promql_analyzer::{ParseResult, Token, parse};

// ============================================================================
// Diagnostic Formatting and Assertion Helpers
// ============================================================================

/// Format diagnostics for display in assertion messages.
///
/// This is commonly used to show diagnostic details when tests fail.
///
/// # Example
/// ```no_run
/// let result = parse(source);
/// let diag_text = format_diagnostics(&result.diagnostics);
/// assert!(diag_text.contains("expected text"), "Diagnostics: {diag_text}");
/// ```
pub fn format_diagnostics(diags: &[miette::Report]) -> String {
    diags
        .iter()
        .map(|diag| format!("{diag:?}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Assert that a parse result contains no diagnostics.
///
/// # Panics
/// Panics if any diagnostics are present, showing the query and diagnostics.
///
/// # Example
/// ```no_run
/// let result = parse(query);
/// assert_no_parse_errors(&result, query);
/// ```
pub fn assert_no_parse_errors(result: &ParseResult, source: &str) {
    assert!(
        result.diagnostics.is_empty(),
        "unexpected diagnostics for `{source}`:\n{}",
        format_diagnostics(&result.diagnostics)
    );
}

/// Assert that parsing a query produced a diagnostic containing the given text.
///
/// # Panics
/// Panics if no diagnostic contains the text, showing what was produced instead.
///
/// # Example
/// ```no_run
/// assert_has_diagnostic_containing("sum(up", "expected ')'");
/// ```
pub fn assert_has_diagnostic_containing(source: &str, text: &str) {
    let result = parse(source);
    let diag_text = format_diagnostics(&result.diagnostics);
    assert!(
        diag_text.contains(text),
        "expected a diagnostic containing '{text}' for `{source}`, but found:\n{diag_text}"
    );
}

// ============================================================================
// Parsing Helpers
// ============================================================================

/// Assert that a query parses without any diagnostics.
///
/// This is useful for tests that just want to verify parsing succeeds
/// without needing to inspect the AST.
///
/// # Panics
/// Panics if parsing produces any diagnostics.
///
/// # Example
/// ```no_run
/// assert_parses_cleanly("sum by (job) (rate(http_requests_total[5m]))");
/// ```
pub fn assert_parses_cleanly(source: &str) {
    let result = parse(source);
    assert_no_parse_errors(&result, source);
}

/// Parse a query and return the AST, panicking if any diagnostics occur.
///
/// This is useful when you need the AST but want to fail fast if parsing fails.
///
/// # Panics
/// Panics if parsing produces any diagnostics or if no AST is produced.
///
/// # Example
/// ```no_run
/// let expr = parse_cleanly("sum(rate(http_requests_total[5m]))");
/// ```
pub fn parse_cleanly(source: &str) -> Expr {
    let result = parse(source);
    assert_no_parse_errors(&result, source);
    result
        .ast
        .unwrap_or_else(|| panic!("expected AST for query: {source}"))
}

/// Tokenize a query and return tokens, panicking if any diagnostics occur.
///
/// This is useful for tests that work directly with tokens.
///
/// # Panics
/// Panics if tokenization produces any diagnostics.
///
/// # Example
/// ```no_run
/// let tokens = tokenize_cleanly("sum(up)");
/// assert_eq!(tokens.len(), 5); // sum, (, up, ), EOF
/// ```
pub fn tokenize_cleanly(source: &str) -> Vec<Token> {
    let lexed = Lexer::new(source).tokenize();
    assert!(
        lexed.diagnostics.is_empty(),
        "unexpected lexer diagnostics for `{source}`:\n{:?}",
        lexed.diagnostics
    );
    lexed.tokens
}

// ============================================================================
// Extraction Helpers
// ============================================================================

/// Parse a query and extract rule candidates with default options.
///
/// # Panics
/// Panics if parsing produces diagnostics, no AST, or a signature error.
///
/// # Example
/// ```no_run
/// let report = extract_cleanly("sum by (job) (rate(http_requests_total[5m]))");
/// assert_eq!(report.candidates.len(), 1);
/// ```
pub fn extract_cleanly(source: &str) -> ExtractionReport {
    let expr = parse_cleanly(source);
    let report = extract_candidates(&expr, &ExtractOptions::default());
    assert!(
        report.errors.is_empty(),
        "unexpected signature errors for `{source}`: {:?}",
        report.errors
    );
    report
}

/// Collect just the generated metric names from a query, in discovery order.
///
/// # Panics
/// Panics under the same conditions as [`extract_cleanly`].
pub fn candidate_names(source: &str) -> Vec<String> {
    extract_cleanly(source)
        .candidates
        .into_iter()
        .map(|candidate| candidate.metric_name)
        .collect()
}
