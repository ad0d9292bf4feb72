//! Signature and naming tests
//!
//! This suite checks the properties the deduplication pipeline depends on:
//! signatures must be stable across runs, invariant to matcher values, and
//! sensitive to structure, and the derived metric names must be collision
//! free at realistic fleet sizes.
//!
//! Test Categories:
//! - Determinism
//! - Value invariance across query fleets
//! - Structure sensitivity
//! - Matcher operator handling
//! - Hashed name format and collision resistance

mod common;

use std::collections::HashSet;

use common::parse_cleanly;
use promql_analyzer::analysis::{
    DEFAULT_PREFIX, SignatureOptions, expr_signature, hashed_metric_name,
};

fn signature_of(source: &str) -> String {
    let expr = parse_cleanly(source);
    expr_signature(&expr, &SignatureOptions::default())
        .unwrap_or_else(|err| panic!("no signature for `{source}`: {err}"))
        .as_str()
        .to_owned()
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn repeated_parses_yield_identical_signatures() {
    let source = r#"sum by (job, env) (http_requests_total{env=~"prod-.*", job="api"})"#;
    let first = signature_of(source);
    for _ in 0..10 {
        assert_eq!(signature_of(source), first);
    }
}

#[test]
fn formatting_differences_do_not_change_the_signature() {
    let compact = signature_of(r#"sum by (job)(http_requests_total{env="prod"})"#);
    let spaced = signature_of(
        "sum by ( job ) (\n  http_requests_total{ env = \"prod\" }\n)",
    );
    assert_eq!(compact, spaced);
}

// ============================================================================
// Value Invariance
// ============================================================================

#[test]
fn per_environment_fleet_collapses_to_one_signature() {
    // Dashboards templated per environment differ only in matcher values.
    // All of them should share one signature and therefore one rule.
    let signatures: HashSet<String> = (0..20)
        .map(|i| signature_of(&format!(r#"sum by (job) (http_requests_total{{env="env-{i}"}})"#)))
        .collect();
    assert_eq!(signatures.len(), 1, "expected a single shared signature");
}

#[test]
fn regex_and_literal_values_share_a_signature() {
    let literal = signature_of(r#"count(up{instance="10.0.0.1:9100"})"#);
    let regex = signature_of(r#"count(up{instance=~"10\\..*"})"#);
    assert_eq!(literal, regex);
}

#[test]
fn offset_does_not_affect_the_signature() {
    assert_eq!(
        signature_of("sum(http_requests_total)"),
        signature_of("sum(http_requests_total offset 1h)"),
    );
}

// ============================================================================
// Structure Sensitivity
// ============================================================================

#[test]
fn different_metric_names_produce_different_signatures() {
    assert_ne!(
        signature_of("sum by (job) (http_requests_total)"),
        signature_of("sum by (job) (http_errors_total)"),
    );
}

#[test]
fn different_matcher_names_produce_different_signatures() {
    assert_ne!(
        signature_of(r#"sum(up{job="api"})"#),
        signature_of(r#"sum(up{env="api"})"#),
    );
}

#[test]
fn grouping_differences_produce_different_signatures() {
    let variants = [
        "sum(up)",
        "sum by () (up)",
        "sum by (job) (up)",
        "sum by (job, env) (up)",
        "sum without (job) (up)",
        "avg by (job) (up)",
    ];
    let signatures: HashSet<String> = variants.iter().map(|q| signature_of(q)).collect();
    assert_eq!(
        signatures.len(),
        variants.len(),
        "every grouping variant should be distinct"
    );
}

#[test]
fn nesting_depth_is_part_of_the_signature() {
    assert_ne!(
        signature_of("sum by (job) (up)"),
        signature_of("sum by (job) (count by (job) (up))"),
    );
}

#[test]
fn aggregation_parameters_are_part_of_the_signature() {
    let five = signature_of("topk(5, http_requests_total)");
    let ten = signature_of("topk(10, http_requests_total)");
    assert_ne!(five, ten);
    assert!(five.contains("num(5.000000)"), "got {five}");
}

// ============================================================================
// Matcher Operator Handling
// ============================================================================

#[test]
fn matcher_operators_fold_by_default() {
    assert_eq!(
        signature_of(r#"sum(up{job="api"})"#),
        signature_of(r#"sum(up{job=~"api-.*"})"#),
    );
    assert_eq!(
        signature_of(r#"sum(up{job!="api"})"#),
        signature_of(r#"sum(up{job!~"api-.*"})"#),
    );
}

#[test]
fn distinguishing_operators_splits_equality_from_regex() {
    let options = SignatureOptions {
        distinguish_matcher_op: true,
    };
    let eq = parse_cleanly(r#"sum(up{job="api"})"#);
    let re = parse_cleanly(r#"sum(up{job=~"api-.*"})"#);
    let eq_sig = expr_signature(&eq, &options).unwrap();
    let re_sig = expr_signature(&re, &options).unwrap();
    assert_ne!(eq_sig, re_sig);
    assert!(re_sig.as_str().contains("job=~?"), "got {re_sig}");
}

// ============================================================================
// Hashed Names
// ============================================================================

#[test]
fn hashed_names_use_the_prefix_and_a_short_digest() {
    let expr = parse_cleanly("sum by (job) (http_requests_total)");
    let signature = expr_signature(&expr, &SignatureOptions::default()).unwrap();
    let name = hashed_metric_name(&signature, DEFAULT_PREFIX);

    let digest = name
        .strip_prefix("recording_rule_")
        .unwrap_or_else(|| panic!("unexpected name {name}"));
    assert_eq!(digest.len(), 12);
    assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn equal_signatures_map_to_equal_names() {
    let a = parse_cleanly(r#"sum by (job) (up{env="a"})"#);
    let b = parse_cleanly(r#"sum by (job) (up{env="b"})"#);
    let options = SignatureOptions::default();
    let sig_a = expr_signature(&a, &options).unwrap();
    let sig_b = expr_signature(&b, &options).unwrap();
    assert_eq!(sig_a, sig_b);
    assert_eq!(
        hashed_metric_name(&sig_a, DEFAULT_PREFIX),
        hashed_metric_name(&sig_b, DEFAULT_PREFIX),
    );
}

#[test]
fn ten_thousand_distinct_queries_produce_no_name_collisions() {
    // The 48-bit digest prefix keeps names short; at fleet scale the
    // collision chance must stay negligible in practice.
    let options = SignatureOptions::default();
    let mut names = HashSet::new();
    let mut signatures = HashSet::new();

    for i in 0..10_000 {
        let source = format!("sum by (job) (metric_{i}_total)");
        let expr = parse_cleanly(&source);
        let signature = expr_signature(&expr, &options).unwrap();
        names.insert(hashed_metric_name(&signature, DEFAULT_PREFIX));
        signatures.insert(signature.as_str().to_owned());
    }

    assert_eq!(signatures.len(), 10_000, "signatures should all be distinct");
    assert_eq!(names.len(), 10_000, "names should all be distinct");
}
