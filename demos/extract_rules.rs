//! End-to-end rule extraction over a small dashboard of queries.
//!
//! Parses each query, reports the recording-rule candidates found in it,
//! and shows how equivalent queries collapse onto one generated rule name.

use std::collections::BTreeMap;

use promql_analyzer::analysis::{ExtractOptions, extract_from_queries};

fn main() {
    let dashboard = [
        // Two panels that differ only in the environment they template in.
        r#"sum by (job) (http_requests_total{env="prod"})"#,
        r#"sum by (job) (http_requests_total{env="staging"})"#,
        // A classic rate panel; only the inner selector is safe.
        r#"sum by (job) (rate(http_requests_total{env="prod"}[5m]))"#,
        // An error-ratio panel with two independent candidates.
        "sum by (job) (errors_total) / sum by (job) (requests_total)",
        // A panel that slipped a typo into the dashboard JSON.
        "sum by (job) (rate(http_requests_total[5m])",
    ];

    let reports = extract_from_queries(dashboard, &ExtractOptions::default());

    let mut rules: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut failures = 0usize;

    for report in &reports {
        println!("\n=== {} ===", report.query);
        match &report.outcome {
            Ok(extraction) => {
                if extraction.candidates.is_empty() {
                    println!("  no safe subtrees");
                }
                for candidate in &extraction.candidates {
                    println!("  ✓ {}", candidate.display);
                    println!("    signature: {}", candidate.signature);
                    println!("    rule name: {}", candidate.metric_name);
                    rules
                        .entry(candidate.metric_name.clone())
                        .or_default()
                        .push(candidate.display.clone());
                }
            }
            Err(diagnostics) => {
                failures += 1;
                println!("  rejected with {} diagnostic(s):", diagnostics.len());
                for diag in diagnostics {
                    println!("{diag:?}");
                }
            }
        }
    }

    println!("\n=== rule summary ===");
    for (name, uses) in &rules {
        println!("{name}: {} use(s)", uses.len());
    }
    println!(
        "{} quer(ies) analyzed, {} rejected, {} distinct rule(s)",
        reports.len(),
        failures,
        rules.len()
    );
}
