//! Expression tree traversal.
//!
//! [`ExprVisitor`] receives every node in pre-order together with the chain of
//! ancestors leading to it, and controls descent per node: [`VisitFlow::Descend`]
//! continues into children, [`VisitFlow::Prune`] skips the node's subtree while
//! the walk continues elsewhere. Child order follows the written query, with an
//! aggregation parameter visited before the aggregated expression.

use super::expr::{Expr, VectorSelector};

/// Controls traversal after visiting a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitFlow {
    /// Continue into the node's children.
    Descend,
    /// Skip the node's children; the walk continues with its siblings.
    Prune,
}

/// Visitor over an expression tree.
///
/// `path` holds the ancestors of `node` from the root downwards and does not
/// include `node` itself. The slice is only valid for the duration of the call;
/// copy it out (e.g. `path.to_vec()`) to retain it.
pub trait ExprVisitor<'a> {
    fn visit(&mut self, node: &'a Expr, path: &[&'a Expr]) -> VisitFlow;
}

/// Walks `root` in pre-order, invoking `visitor` for every node reached.
pub fn walk_expr<'a, V: ExprVisitor<'a>>(visitor: &mut V, root: &'a Expr) {
    let mut path = Vec::new();
    walk_with_path(visitor, root, &mut path);
}

fn walk_with_path<'a, V: ExprVisitor<'a>>(
    visitor: &mut V,
    node: &'a Expr,
    path: &mut Vec<&'a Expr>,
) {
    if visitor.visit(node, path) == VisitFlow::Prune {
        return;
    }
    path.push(node);
    for child in node.children() {
        walk_with_path(visitor, child, path);
    }
    path.pop();
}

/// A vector selector found during traversal, with the ancestors above it.
#[derive(Debug, Clone)]
pub struct SelectorWithPath<'a> {
    pub selector: &'a VectorSelector,
    /// Ancestors from the root down to (excluding) the selector node.
    pub path: Vec<&'a Expr>,
}

struct SelectorCollector<'a> {
    found: Vec<SelectorWithPath<'a>>,
}

impl<'a> ExprVisitor<'a> for SelectorCollector<'a> {
    fn visit(&mut self, node: &'a Expr, path: &[&'a Expr]) -> VisitFlow {
        if let Expr::Selector(selector) = node {
            self.found.push(SelectorWithPath {
                selector,
                path: path.to_vec(),
            });
        }
        VisitFlow::Descend
    }
}

/// Collects every vector selector in `root`, in query order.
///
/// Selectors inside range selections are included: `rate(foo[5m])` yields the
/// selector for `foo` with the range selection and the call on its path.
pub fn collect_selectors(root: &Expr) -> Vec<SelectorWithPath<'_>> {
    let mut collector = SelectorCollector { found: Vec::new() };
    walk_expr(&mut collector, root);
    collector.found
}
