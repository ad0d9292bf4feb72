//! Recording-rule candidate extraction.
//!
//! Ties the pipeline together: find the safe subtree roots of an
//! expression, render a signature for each, and derive the hashed rule
//! name. The batch entry parses each query independently, so one broken
//! input never costs the rest of the batch its results.

use miette::Report;

use crate::ast::{Expr, Span};
use crate::parser;

use super::naming::hashed_metric_name;
use super::safety::find_safe_roots;
use super::signature::{Signature, SignatureError, SignatureOptions, expr_signature};

/// Default prefix for hashed rule names.
pub const DEFAULT_PREFIX: &str = "recording_rule";

/// Configuration for candidate extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Prefix for hashed rule names.
    pub prefix: String,
    /// Signature rendering options.
    pub signature: SignatureOptions,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            signature: SignatureOptions::default(),
        }
    }
}

/// A recording-rule candidate extracted from a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleCandidate {
    /// Display form of the safe subtree; usable as the rule's expression.
    pub display: String,
    /// Canonical value-insensitive signature of the subtree.
    pub signature: Signature,
    /// Hashed metric name for the generated rule.
    pub metric_name: String,
    /// Location of the subtree in the query text.
    pub span: Span,
}

/// Extraction results for one expression.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    /// Candidates in query order.
    pub candidates: Vec<RuleCandidate>,
    /// Signature failures; each one cost only its own subtree.
    pub errors: Vec<SignatureError>,
}

/// Extracts every recording-rule candidate from `root`.
///
/// Candidates are owned records; nothing borrows from the tree.
pub fn extract_candidates(root: &Expr, options: &ExtractOptions) -> ExtractionReport {
    let mut report = ExtractionReport::default();

    for safe_root in find_safe_roots(root) {
        match expr_signature(safe_root.expr, &options.signature) {
            Ok(signature) => {
                let metric_name = hashed_metric_name(&signature, &options.prefix);
                report.candidates.push(RuleCandidate {
                    display: safe_root.expr.to_string(),
                    signature,
                    metric_name,
                    span: safe_root.expr.span(),
                });
            }
            Err(error) => report.errors.push(error),
        }
    }

    report
}

/// Extraction outcome for one query string.
#[derive(Debug)]
pub struct QueryReport {
    /// The query as given.
    pub query: String,
    /// Extraction results, or the rendered diagnostics when the query did
    /// not parse cleanly.
    pub outcome: Result<ExtractionReport, Vec<Report>>,
}

/// Runs extraction over a batch of queries.
///
/// Each query is parsed independently; inputs with diagnostics yield an
/// `Err` outcome carrying those diagnostics, and every other input still
/// produces its full report.
pub fn extract_from_queries<I, S>(queries: I, options: &ExtractOptions) -> Vec<QueryReport>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    queries
        .into_iter()
        .map(|query| {
            let query = query.as_ref();
            let parsed = parser::parse(query);
            let outcome = match parsed.ast {
                Some(expr) if parsed.diagnostics.is_empty() => {
                    Ok(extract_candidates(&expr, options))
                }
                _ => Err(parsed.diagnostics),
            };
            QueryReport {
                query: query.to_string(),
                outcome,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Expr {
        parser::parse(source).ast.expect("expression should parse")
    }

    fn extract(source: &str) -> ExtractionReport {
        extract_candidates(&parse(source), &ExtractOptions::default())
    }

    #[test]
    fn extracts_whole_safe_expression() {
        let report = extract(r#"sum by (job) (http_requests_total{env="prod"})"#);
        assert!(report.errors.is_empty());
        assert_eq!(report.candidates.len(), 1);

        let candidate = &report.candidates[0];
        assert_eq!(
            candidate.display,
            r#"sum by (job) (http_requests_total{env="prod"})"#
        );
        assert_eq!(
            candidate.signature.as_str(),
            "sum_by(job)_http_requests_total{env=?}"
        );
        assert!(candidate.metric_name.starts_with("recording_rule_"));
    }

    #[test]
    fn value_changes_do_not_change_the_rule_name() {
        let prod = extract(r#"sum(http_requests_total{job="a"}) by (job)"#);
        let staging = extract(r#"sum(http_requests_total{job="b"}) by (job)"#);
        assert_eq!(
            prod.candidates[0].metric_name,
            staging.candidates[0].metric_name
        );
    }

    #[test]
    fn operator_changes_change_the_rule_name() {
        let sum = extract("sum by (job) (up)");
        let avg = extract("avg by (job) (up)");
        assert_ne!(sum.candidates[0].metric_name, avg.candidates[0].metric_name);
    }

    #[test]
    fn unsafe_parent_yields_child_candidate() {
        let report = extract("topk(5, sum by (job) (up))");
        assert_eq!(report.candidates.len(), 1);
        assert_eq!(report.candidates[0].display, "sum by (job) (up)");
    }

    #[test]
    fn selector_under_rate_is_a_candidate() {
        let report = extract("rate(http_requests_total[5m])");
        assert_eq!(report.candidates.len(), 1);
        assert_eq!(report.candidates[0].display, "http_requests_total");
        assert_eq!(report.candidates[0].span, 5..24);
    }

    #[test]
    fn binary_query_yields_one_candidate_per_operand() {
        let report = extract("sum(errors_total) / sum(requests_total)");
        assert_eq!(report.candidates.len(), 2);
        assert_eq!(report.candidates[0].display, "sum(errors_total)");
        assert_eq!(report.candidates[1].display, "sum(requests_total)");
    }

    #[test]
    fn number_only_query_has_no_candidates() {
        let report = extract("1 + 1");
        assert!(report.candidates.is_empty());
        assert!(report.errors.is_empty());
    }

    #[test]
    fn candidates_own_their_data() {
        let report = {
            let expr = parse("sum(up)");
            extract_candidates(&expr, &ExtractOptions::default())
            // The tree is dropped here; candidates must survive it.
        };
        assert_eq!(report.candidates[0].display, "sum(up)");
    }

    #[test]
    fn custom_prefix_is_used() {
        let options = ExtractOptions {
            prefix: "precomputed".to_string(),
            ..ExtractOptions::default()
        };
        let report = extract_candidates(&parse("sum(up)"), &options);
        assert!(report.candidates[0].metric_name.starts_with("precomputed_"));
    }

    #[test]
    fn batch_isolates_broken_inputs() {
        let reports = extract_from_queries(
            ["sum(up)", "sum(", "avg(up)"],
            &ExtractOptions::default(),
        );
        assert_eq!(reports.len(), 3);

        assert!(reports[0].outcome.is_ok());
        assert!(reports[1].outcome.is_err());
        assert!(reports[2].outcome.is_ok());

        let last = reports[2].outcome.as_ref().expect("report");
        assert_eq!(last.candidates.len(), 1);
    }

    #[test]
    fn batch_preserves_input_order_and_text() {
        let queries = vec!["up".to_string(), "broken{".to_string()];
        let reports = extract_from_queries(&queries, &ExtractOptions::default());
        assert_eq!(reports[0].query, "up");
        assert_eq!(reports[1].query, "broken{");
    }

    #[test]
    fn batch_rejects_inputs_with_lexer_diagnostics() {
        // The string token is produced despite the bad escape, but the
        // query still carries a diagnostic and is rejected.
        let reports = extract_from_queries([r#"up{job="a\q"}"#], &ExtractOptions::default());
        let error = reports[0].outcome.as_ref().expect_err("diagnostics");
        assert!(!error.is_empty());
    }
}
