//! Compares the selector sets of two versions of a query and shows label
//! variance across a templated query family.

use promql_analyzer::analysis::{DiffReason, LabelVariance, diff_selector_sets};
use promql_analyzer::ast::VectorSelector;
use promql_analyzer::{collect_selectors, parse};

fn main() {
    diff_two_versions();
    variance_across_environments();
}

fn diff_two_versions() {
    println!("=== selector diff ===");

    let before = r#"sum by (job) (rate(http_requests_total{env="prod"}[5m])) / up{env="prod"}"#;
    let after = r#"sum by (job) (rate(http_requests_total{env="prod", region="eu"}[5m])) / up{env="prod"}"#;

    println!("left:  {before}");
    println!("right: {after}");

    let left = parse(before).ast.expect("demo query must parse");
    let right = parse(after).ast.expect("demo query must parse");

    let entries = diff_selector_sets(&left, &right);
    if entries.is_empty() {
        println!("selector sets agree");
        return;
    }

    for entry in &entries {
        let metric = if entry.metric.is_empty() {
            "(nameless)"
        } else {
            entry.metric.as_str()
        };
        match &entry.reason {
            DiffReason::OnlyOneSide => {
                println!("  {metric}: only on the {} side: {}", entry.side, entry.rendered);
            }
            DiffReason::MatchersDiffer { differing } => {
                let labels: Vec<_> = differing.iter().map(|l| l.as_str()).collect();
                println!(
                    "  {metric} ({}): {} (differs on {})",
                    entry.side,
                    entry.rendered,
                    labels.join(", ")
                );
            }
        }
    }
}

fn variance_across_environments() {
    println!("\n=== label variance ===");

    let family = [
        r#"sum by (job) (http_requests_total{job="api", env="prod"})"#,
        r#"sum by (job) (http_requests_total{job="api", env="staging"})"#,
        r#"sum by (job) (http_requests_total{job="api", env="dev"})"#,
    ];

    let parsed: Vec<_> = family
        .iter()
        .map(|query| parse(query).ast.expect("demo query must parse"))
        .collect();
    let selectors: Vec<&VectorSelector> = parsed
        .iter()
        .flat_map(collect_selectors)
        .map(|found| found.selector)
        .collect();

    println!("{} selector(s) across {} queries", selectors.len(), family.len());

    let variance = LabelVariance::across(&selectors);
    for label in &variance.fixed {
        println!("  ✓ {label} is fixed across the family");
    }
    for label in &variance.varying {
        println!("  ✗ {label} varies (template dimension)");
    }
}
