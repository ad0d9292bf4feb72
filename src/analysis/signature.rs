//! Canonical signatures for safe subtrees.
//!
//! A signature captures the shape of a subtree (operators, grouping
//! dimensions, metric names, matcher label names) while replacing every
//! concrete matcher value with a `?` placeholder. Two queries that differ
//! only in matcher values therefore produce the same signature, which is
//! what lets them share one recording rule.

use std::fmt;

use crate::ast::{AggregateExpr, Expr, GroupingMode, Span, VectorSelector};
use crate::diag::Diag;

/// A canonical, value-insensitive encoding of a subtree.
///
/// Equality of signatures defines recording-rule-candidate equivalence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature(String);

impl Signature {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Signature {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Rendering options for signature generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureOptions {
    /// Preserve each matcher's operator (`=`, `!=`, `=~`, `!~`) instead of
    /// folding every operator to `=`. Off by default, so `up{job="a"}` and
    /// `up{job=~"a"}` share a signature.
    pub distinguish_matcher_op: bool,
}

/// Error produced when a subtree contains a node kind signatures do not
/// cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    UnsupportedNode { kind: &'static str, span: Span },
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureError::UnsupportedNode { kind, .. } => {
                write!(f, "no signature defined for {kind} nodes")
            }
        }
    }
}

impl std::error::Error for SignatureError {}

impl SignatureError {
    /// Converts the error into a diagnostic pointing at the offending node.
    pub fn to_diag(&self) -> Diag {
        match self {
            SignatureError::UnsupportedNode { kind, span } => {
                Diag::error(format!("no signature defined for {kind} nodes"))
                    .with_primary_label(span.clone(), "unsupported node")
                    .with_help("only selectors, aggregations and numbers have signatures")
            }
        }
    }
}

/// Renders the signature of `expr`.
///
/// Covered kinds are vector selectors, aggregations (parameter and body
/// included) and number literals; any other kind in the subtree yields
/// [`SignatureError::UnsupportedNode`]. Offset modifiers do not contribute.
pub fn expr_signature(
    expr: &Expr,
    options: &SignatureOptions,
) -> Result<Signature, SignatureError> {
    let mut parts = Vec::new();
    render_into(expr, options, &mut parts)?;
    Ok(Signature(parts.join("_")))
}

fn render_into(
    expr: &Expr,
    options: &SignatureOptions,
    parts: &mut Vec<String>,
) -> Result<(), SignatureError> {
    match expr {
        Expr::Aggregate(aggregate) => {
            parts.push(aggregate_token(aggregate));
            if let Some(param) = &aggregate.param {
                render_into(param, options, parts)?;
            }
            render_into(&aggregate.expr, options, parts)
        }
        Expr::Selector(selector) => {
            parts.push(selector_token(selector, options));
            Ok(())
        }
        Expr::Number(number) => {
            parts.push(format!("num({:.6})", number.value));
            Ok(())
        }
        other => Err(SignatureError::UnsupportedNode {
            kind: other.kind_name(),
            span: other.span(),
        }),
    }
}

/// `sum`, `sum_by(a,b)` or `sum_without(a,b)`.
///
/// An explicit empty grouping renders `sum_by()`, distinct from no grouping
/// at all; dimension order is preserved as written.
fn aggregate_token(aggregate: &AggregateExpr) -> String {
    match &aggregate.grouping {
        Some(grouping) => {
            let mode = match grouping.mode {
                GroupingMode::By => "by",
                GroupingMode::Without => "without",
            };
            format!(
                "{}_{}({})",
                aggregate.op.name(),
                mode,
                grouping.labels.join(",")
            )
        }
        None => aggregate.op.name().to_string(),
    }
}

/// `metric{label=?,other=?}` in declared matcher order.
fn selector_token(selector: &VectorSelector, options: &SignatureOptions) -> String {
    let mut token = String::from(selector.name.as_deref().unwrap_or(""));
    if selector.matchers.is_empty() {
        return token;
    }

    token.push('{');
    for (index, matcher) in selector.matchers.iter().enumerate() {
        if index > 0 {
            token.push(',');
        }
        token.push_str(&matcher.name);
        if options.distinguish_matcher_op {
            token.push_str(&matcher.op.to_string());
        } else {
            token.push('=');
        }
        token.push('?');
    }
    token.push('}');
    token
}
