//! Matcher-set and selector-set diffing.
//!
//! Comparison is lexical: matchers are identified by label name, and two
//! matchers agree only when operator and value are byte-identical. No
//! attempt is made to decide semantic equivalence of regexes, so
//! `job=~"a|b"` and `job=~"b|a"` count as differing.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use smol_str::SmolStr;

use crate::ast::{Expr, LabelMatcher, VectorSelector, collect_selectors};

/// Which input expression a diff entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffSide {
    Left,
    Right,
}

impl fmt::Display for DiffSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffSide::Left => write!(f, "left"),
            DiffSide::Right => write!(f, "right"),
        }
    }
}

/// Result of comparing two matcher collections by label name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatcherSetDiff {
    /// True when both collections mention exactly the same label names,
    /// whatever their operators and values.
    pub names_match: bool,
    /// Names present on both sides with identical operator and value,
    /// ascending.
    pub matching: Vec<SmolStr>,
    /// Names whose matchers differ, or that appear on one side only,
    /// ascending.
    pub differing: Vec<SmolStr>,
}

impl MatcherSetDiff {
    /// True when the two collections are indistinguishable.
    pub fn is_identical(&self) -> bool {
        self.names_match && self.differing.is_empty()
    }
}

/// Indexes matchers by label name; a repeated name keeps the last matcher.
fn index_by_name(matchers: &[LabelMatcher]) -> BTreeMap<SmolStr, &LabelMatcher> {
    let mut map = BTreeMap::new();
    for matcher in matchers {
        map.insert(matcher.name.clone(), matcher);
    }
    map
}

/// Compares two matcher collections label name by label name.
///
/// Matcher order is irrelevant. A name on both sides lands in `matching`
/// or `differing` depending on whether operator and value agree; a name on
/// one side only lands in `differing` and clears `names_match`.
pub fn diff_matcher_sets(left: &[LabelMatcher], right: &[LabelMatcher]) -> MatcherSetDiff {
    let left_by_name = index_by_name(left);
    let right_by_name = index_by_name(right);

    let names: BTreeSet<&SmolStr> = left_by_name.keys().chain(right_by_name.keys()).collect();

    let mut names_match = true;
    let mut matching = Vec::new();
    let mut differing = Vec::new();

    for name in names {
        match (left_by_name.get(name), right_by_name.get(name)) {
            (Some(l), Some(r)) => {
                if l.op == r.op && l.value == r.value {
                    matching.push(name.clone());
                } else {
                    differing.push(name.clone());
                }
            }
            _ => {
                names_match = false;
                differing.push(name.clone());
            }
        }
    }

    MatcherSetDiff {
        names_match,
        matching,
        differing,
    }
}

/// Why a selector was reported by [`diff_selector_sets`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffReason {
    /// The metric appears in only one of the two expressions.
    OnlyOneSide,
    /// The metric appears in both expressions with differing matcher sets.
    MatchersDiffer { differing: Vec<SmolStr> },
}

/// One reported selector in a selector-set diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorDiffEntry {
    /// Metric name the selector was keyed under; empty for nameless
    /// selectors.
    pub metric: SmolStr,
    /// Which expression the selector came from.
    pub side: DiffSide,
    /// Display form of the selector.
    pub rendered: String,
    pub reason: DiffReason,
}

/// Indexes every selector in `expr` by metric name; a metric selected more
/// than once keeps the last selector.
fn selectors_by_metric(expr: &Expr) -> BTreeMap<SmolStr, &VectorSelector> {
    let mut map = BTreeMap::new();
    for found in collect_selectors(expr) {
        let key = found.selector.name.clone().unwrap_or_default();
        map.insert(key, found.selector);
    }
    map
}

/// Reports the selectors on which two expressions disagree.
///
/// Metrics are visited in ascending name order. A metric present on both
/// sides is reported (left entry, then right entry, adjacent) when its
/// matcher sets differ in any way; a metric present on one side only is
/// reported alone. Identical selectors produce no entries.
pub fn diff_selector_sets(left: &Expr, right: &Expr) -> Vec<SelectorDiffEntry> {
    let left_by_metric = selectors_by_metric(left);
    let right_by_metric = selectors_by_metric(right);

    let metrics: BTreeSet<&SmolStr> = left_by_metric
        .keys()
        .chain(right_by_metric.keys())
        .collect();

    let mut entries = Vec::new();
    for metric in metrics {
        match (left_by_metric.get(metric), right_by_metric.get(metric)) {
            (Some(l), Some(r)) => {
                let diff = diff_matcher_sets(&l.matchers, &r.matchers);
                if !diff.names_match || !diff.differing.is_empty() {
                    entries.push(entry(
                        metric,
                        DiffSide::Left,
                        l,
                        DiffReason::MatchersDiffer {
                            differing: diff.differing.clone(),
                        },
                    ));
                    entries.push(entry(
                        metric,
                        DiffSide::Right,
                        r,
                        DiffReason::MatchersDiffer {
                            differing: diff.differing,
                        },
                    ));
                }
            }
            (Some(l), None) => entries.push(entry(metric, DiffSide::Left, l, DiffReason::OnlyOneSide)),
            (None, Some(r)) => {
                entries.push(entry(metric, DiffSide::Right, r, DiffReason::OnlyOneSide));
            }
            (None, None) => {}
        }
    }

    entries
}

fn entry(
    metric: &SmolStr,
    side: DiffSide,
    selector: &VectorSelector,
    reason: DiffReason,
) -> SelectorDiffEntry {
    SelectorDiffEntry {
        metric: metric.clone(),
        side,
        rendered: selector.to_string(),
        reason,
    }
}

/// Label-value variance across a family of selectors.
///
/// Used to tell which label values stay constant across otherwise-identical
/// queries (and could be baked into one recording rule) and which ones vary
/// (and must stay as rule dimensions).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelVariance {
    /// Labels present in every selector with a single value, ascending.
    pub fixed: Vec<SmolStr>,
    /// Labels missing from some selector or carrying more than one value,
    /// ascending.
    pub varying: Vec<SmolStr>,
}

impl LabelVariance {
    /// Classifies every label name seen across `selectors`.
    ///
    /// Only values are compared; matcher operators are ignored, so
    /// `job="a"` and `job=~"a"` count as the same value.
    pub fn across(selectors: &[&VectorSelector]) -> Self {
        if selectors.is_empty() {
            return Self::default();
        }

        let mut seen: BTreeMap<SmolStr, (usize, BTreeSet<&SmolStr>)> = BTreeMap::new();
        for selector in selectors {
            for (name, matcher) in index_by_name(&selector.matchers) {
                let slot = seen.entry(name).or_insert_with(|| (0, BTreeSet::new()));
                slot.0 += 1;
                slot.1.insert(&matcher.value);
            }
        }

        let total = selectors.len();
        let mut variance = Self::default();
        for (name, (count, values)) in seen {
            if count == total && values.len() == 1 {
                variance.fixed.push(name);
            } else {
                variance.varying.push(name);
            }
        }
        variance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    fn parse(source: &str) -> Expr {
        parser::parse(source).ast.expect("expression should parse")
    }

    fn matchers_of(expr: &Expr) -> &[LabelMatcher] {
        let Expr::Selector(selector) = expr else {
            panic!("expected selector");
        };
        &selector.matchers
    }

    fn diff(left: &str, right: &str) -> MatcherSetDiff {
        let left = parse(left);
        let right = parse(right);
        diff_matcher_sets(matchers_of(&left), matchers_of(&right))
    }

    #[test]
    fn identical_matcher_sets() {
        let result = diff(r#"up{job="a", env="prod"}"#, r#"up{env="prod", job="a"}"#);
        assert!(result.names_match);
        assert_eq!(result.matching, vec!["env", "job"]);
        assert!(result.differing.is_empty());
        assert!(result.is_identical());
    }

    #[test]
    fn differing_value_keeps_names_matching() {
        let result = diff(r#"up{env="prod"}"#, r#"up{env="staging"}"#);
        assert!(result.names_match);
        assert_eq!(result.differing, vec!["env"]);
        assert!(result.matching.is_empty());
        assert!(!result.is_identical());
    }

    #[test]
    fn differing_operator_is_a_difference() {
        let result = diff(r#"up{job="api"}"#, r#"up{job=~"api"}"#);
        assert!(result.names_match);
        assert_eq!(result.differing, vec!["job"]);
    }

    #[test]
    fn one_sided_name_clears_names_match() {
        let result = diff(r#"up{job="a", pod="x"}"#, r#"up{job="a"}"#);
        assert!(!result.names_match);
        assert_eq!(result.matching, vec!["job"]);
        assert_eq!(result.differing, vec!["pod"]);
    }

    #[test]
    fn repeated_name_keeps_the_last_matcher() {
        let result = diff(r#"up{a="1", a="2"}"#, r#"up{a="2"}"#);
        assert!(result.names_match);
        assert_eq!(result.matching, vec!["a"]);
    }

    #[test]
    fn output_is_sorted_ascending() {
        let result = diff(
            r#"up{z="1", m="1", a="1"}"#,
            r#"up{z="2", m="1", a="2"}"#,
        );
        assert_eq!(result.differing, vec!["a", "z"]);
        assert_eq!(result.matching, vec!["m"]);
    }

    #[test]
    fn empty_sets_are_identical() {
        let result = diff_matcher_sets(&[], &[]);
        assert!(result.is_identical());
    }

    #[test]
    fn selector_sets_report_differing_values() {
        let entries = diff_selector_sets(
            &parse(r#"up{env="prod"}"#),
            &parse(r#"up{env="staging"}"#),
        );
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].side, DiffSide::Left);
        assert_eq!(entries[0].rendered, r#"up{env="prod"}"#);
        assert_eq!(entries[1].side, DiffSide::Right);
        assert_eq!(entries[1].rendered, r#"up{env="staging"}"#);
        for entry in &entries {
            assert_eq!(entry.metric, "up");
            assert_eq!(
                entry.reason,
                DiffReason::MatchersDiffer {
                    differing: vec!["env".into()]
                }
            );
        }
    }

    #[test]
    fn identical_expressions_produce_no_entries() {
        let source = r#"sum(rate(http_requests_total{job="api"}[5m]))"#;
        assert!(diff_selector_sets(&parse(source), &parse(source)).is_empty());
    }

    #[test]
    fn one_sided_metric_is_reported_alone() {
        let entries = diff_selector_sets(&parse("up + extra_metric"), &parse("up"));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].metric, "extra_metric");
        assert_eq!(entries[0].side, DiffSide::Left);
        assert_eq!(entries[0].reason, DiffReason::OnlyOneSide);
    }

    #[test]
    fn metrics_are_reported_in_ascending_order() {
        let entries = diff_selector_sets(
            &parse(r#"zebra{a="1"} + alpha{a="1"}"#),
            &parse(r#"zebra{a="2"} + alpha{a="2"}"#),
        );
        let metrics: Vec<&str> = entries.iter().map(|e| e.metric.as_str()).collect();
        assert_eq!(metrics, vec!["alpha", "alpha", "zebra", "zebra"]);
    }

    #[test]
    fn set_level_diff_is_symmetric() {
        let left = parse(r#"a{x="1"} + b + lonely"#);
        let right = parse(r#"a{x="2"} + b"#);

        let forward = diff_selector_sets(&left, &right);
        let backward = diff_selector_sets(&right, &left);

        let metrics = |entries: &[SelectorDiffEntry]| -> Vec<SmolStr> {
            entries.iter().map(|e| e.metric.clone()).collect()
        };
        assert_eq!(metrics(&forward), metrics(&backward));
    }

    #[test]
    fn nameless_selectors_key_as_empty_name() {
        let entries = diff_selector_sets(
            &parse(r#"{job="a"}"#),
            &parse(r#"{job="b"}"#),
        );
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].metric, "");
    }

    #[test]
    fn repeated_metric_keeps_the_last_selector() {
        // `up` appears twice on the left; the later selector wins.
        let entries = diff_selector_sets(
            &parse(r#"up{env="old"} + up{env="prod"}"#),
            &parse(r#"up{env="prod"}"#),
        );
        assert!(entries.is_empty());
    }

    #[test]
    fn selectors_inside_nested_expressions_are_compared() {
        let entries = diff_selector_sets(
            &parse(r#"sum(rate(errors_total{code="500"}[5m]))"#),
            &parse(r#"sum(rate(errors_total{code="503"}[5m]))"#),
        );
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].metric, "errors_total");
    }

    #[test]
    fn label_variance_splits_fixed_and_varying() {
        let exprs: Vec<Expr> = [
            r#"up{job="api", env="prod"}"#,
            r#"up{job="api", env="staging"}"#,
            r#"up{job="api", env="dev"}"#,
        ]
        .iter()
        .map(|source| parse(source))
        .collect();

        let selectors: Vec<&VectorSelector> = exprs
            .iter()
            .map(|expr| {
                let Expr::Selector(selector) = expr else {
                    panic!("expected selector");
                };
                selector
            })
            .collect();

        let variance = LabelVariance::across(&selectors);
        assert_eq!(variance.fixed, vec!["job"]);
        assert_eq!(variance.varying, vec!["env"]);
    }

    #[test]
    fn label_missing_somewhere_is_varying() {
        let with_pod = parse(r#"up{job="api", pod="x"}"#);
        let without_pod = parse(r#"up{job="api"}"#);
        let selectors: Vec<&VectorSelector> = [&with_pod, &without_pod]
            .iter()
            .map(|expr| {
                let Expr::Selector(selector) = *expr else {
                    panic!("expected selector");
                };
                selector
            })
            .collect();

        let variance = LabelVariance::across(&selectors);
        assert_eq!(variance.fixed, vec!["job"]);
        assert_eq!(variance.varying, vec!["pod"]);
    }

    #[test]
    fn label_variance_ignores_matcher_operators() {
        let equality = parse(r#"up{job="api"}"#);
        let regex = parse(r#"up{job=~"api"}"#);
        let selectors: Vec<&VectorSelector> = [&equality, &regex]
            .iter()
            .map(|expr| {
                let Expr::Selector(selector) = *expr else {
                    panic!("expected selector");
                };
                selector
            })
            .collect();

        let variance = LabelVariance::across(&selectors);
        assert_eq!(variance.fixed, vec!["job"]);
        assert!(variance.varying.is_empty());
    }

    #[test]
    fn label_variance_of_empty_family_is_empty() {
        let variance = LabelVariance::across(&[]);
        assert!(variance.fixed.is_empty());
        assert!(variance.varying.is_empty());
    }
}
