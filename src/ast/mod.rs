//! Abstract syntax tree for PromQL expressions.
//!
//! Every node carries a [`Span`] into the original source text so diagnostics
//! and extraction results can point back at the query. [`expr`] defines the
//! node types, [`visit`] the traversal machinery over them.

pub mod expr;
pub mod span;
pub mod visit;

pub use expr::{
    AggregateExpr, AggregateOp, BinaryExpr, BinaryOp, DurationLit, Expr, FunctionCall,
    GroupModifier, GroupSide, Grouping, GroupingMode, LabelMatcher, MatchOp, MatrixSelector,
    NumberLiteral, ParenExpr, StringLiteral, SubqueryExpr, UnaryExpr, UnaryOp, VectorMatching,
    VectorSelector,
};
pub use span::{Span, merge_spans};
pub use visit::{ExprVisitor, SelectorWithPath, VisitFlow, collect_selectors, walk_expr};
