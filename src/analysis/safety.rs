//! Extraction safety classification.
//!
//! A subtree can be turned into a recording rule only when re-evaluating it
//! ahead of time preserves the query's meaning. That holds for plain vector
//! selectors and for `sum`, `avg` and `count` aggregations over a safe
//! subtree; every other node kind (parameterized aggregations, binary and
//! unary operators, function calls, ranges, subqueries, literals) is
//! classified unsafe.

use crate::ast::{AggregateOp, Expr, ExprVisitor, VisitFlow, walk_expr};

/// Returns true if the subtree rooted at `expr` is safe to extract.
pub fn is_safe(expr: &Expr) -> bool {
    match expr {
        Expr::Selector(_) => true,
        Expr::Aggregate(aggregate) => {
            matches!(
                aggregate.op,
                AggregateOp::Sum | AggregateOp::Avg | AggregateOp::Count
            ) && is_safe(&aggregate.expr)
        }
        _ => false,
    }
}

/// The root of a maximal safe subtree.
#[derive(Debug, Clone)]
pub struct SafeRoot<'a> {
    pub expr: &'a Expr,
}

/// Visitor recording safe subtree roots.
///
/// A safe node is recorded and its subtree pruned, so nothing nested inside
/// a reported root is reported again. Unsafe nodes are descended into, which
/// lets each safe subtree under an unsafe operator surface independently.
pub struct SafeRootFinder<'a> {
    roots: Vec<SafeRoot<'a>>,
}

impl<'a> SafeRootFinder<'a> {
    pub fn new() -> Self {
        Self { roots: Vec::new() }
    }

    pub fn into_roots(self) -> Vec<SafeRoot<'a>> {
        self.roots
    }
}

impl<'a> Default for SafeRootFinder<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> ExprVisitor<'a> for SafeRootFinder<'a> {
    fn visit(&mut self, node: &'a Expr, _path: &[&'a Expr]) -> VisitFlow {
        if is_safe(node) {
            self.roots.push(SafeRoot { expr: node });
            VisitFlow::Prune
        } else {
            VisitFlow::Descend
        }
    }
}

/// Finds every maximal safe subtree in `root`, in query order.
pub fn find_safe_roots(root: &Expr) -> Vec<SafeRoot<'_>> {
    let mut finder = SafeRootFinder::new();
    walk_expr(&mut finder, root);
    finder.into_roots()
}
