//! Expression AST nodes for PromQL.
//!
//! This module defines the complete expression system the analyzer works on:
//! vector selectors with label matchers, aggregations with grouping clauses,
//! arithmetic/comparison/set binary operations with vector-matching
//! modifiers, function calls, range and subquery selection, and literals.
//!
//! Every node carries a byte-offset [`Span`] into the query text and
//! implements [`Display`](fmt::Display), reproducing a canonical query-text
//! form.

use crate::ast::Span;
use smol_str::SmolStr;
use std::fmt;

// ============================================================================
// Expr - Top-level expression type
// ============================================================================

/// Represents any expression in PromQL.
///
/// The enum is closed: adding a grammar form means adding a variant here, and
/// exhaustive matches in [`Expr::children`] and the analysis layer force a
/// decision about how the new form traverses and classifies.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Instant vector selector: `metric{label="value"}`
    Selector(VectorSelector),

    /// Aggregation: `sum by (job) (expr)`
    Aggregate(AggregateExpr),

    /// Number literal, including `Inf` and `NaN`
    Number(NumberLiteral),

    /// String literal (function arguments only)
    String(StringLiteral),

    /// Unary expression: `-expr`, `+expr`
    Unary(UnaryExpr),

    /// Binary operation: `a + b`, `a and b`, `a == bool b`
    Binary(BinaryExpr),

    /// Parenthesized expression: `(expr)`
    Paren(ParenExpr),

    /// Function call: `rate(expr)`
    Call(FunctionCall),

    /// Range selection over a vector selector: `metric[5m]`
    Matrix(MatrixSelector),

    /// Subquery: `expr[1h:5m]`
    Subquery(SubqueryExpr),
}

impl Expr {
    /// Returns the span of this expression.
    pub fn span(&self) -> Span {
        match self {
            Expr::Selector(sel) => sel.span.clone(),
            Expr::Aggregate(agg) => agg.span.clone(),
            Expr::Number(num) => num.span.clone(),
            Expr::String(s) => s.span.clone(),
            Expr::Unary(u) => u.span.clone(),
            Expr::Binary(b) => b.span.clone(),
            Expr::Paren(p) => p.span.clone(),
            Expr::Call(call) => call.span.clone(),
            Expr::Matrix(m) => m.span.clone(),
            Expr::Subquery(sq) => sq.span.clone(),
        }
    }

    /// Returns a human-readable name for this node kind, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Expr::Selector(_) => "vector selector",
            Expr::Aggregate(_) => "aggregation",
            Expr::Number(_) => "number literal",
            Expr::String(_) => "string literal",
            Expr::Unary(_) => "unary expression",
            Expr::Binary(_) => "binary expression",
            Expr::Paren(_) => "parentheses",
            Expr::Call(_) => "function call",
            Expr::Matrix(_) => "range selector",
            Expr::Subquery(_) => "subquery",
        }
    }

    /// Returns the direct children of this node in grammar order.
    ///
    /// For aggregations the parameter (when present) precedes the aggregated
    /// expression, matching the order the two appear in source.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Selector(_) | Expr::Number(_) | Expr::String(_) => Vec::new(),
            Expr::Aggregate(agg) => {
                let mut children = Vec::with_capacity(2);
                if let Some(param) = &agg.param {
                    children.push(param.as_ref());
                }
                children.push(agg.expr.as_ref());
                children
            }
            Expr::Unary(u) => vec![u.expr.as_ref()],
            Expr::Binary(b) => vec![b.lhs.as_ref(), b.rhs.as_ref()],
            Expr::Paren(p) => vec![p.expr.as_ref()],
            Expr::Call(call) => call.args.iter().collect(),
            Expr::Matrix(m) => vec![m.expr.as_ref()],
            Expr::Subquery(sq) => vec![sq.expr.as_ref()],
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Selector(sel) => write!(f, "{sel}"),
            Expr::Aggregate(agg) => write!(f, "{agg}"),
            Expr::Number(num) => write!(f, "{num}"),
            Expr::String(s) => write!(f, "{s}"),
            Expr::Unary(u) => write!(f, "{u}"),
            Expr::Binary(b) => write!(f, "{b}"),
            Expr::Paren(p) => write!(f, "{p}"),
            Expr::Call(call) => write!(f, "{call}"),
            Expr::Matrix(m) => write!(f, "{m}"),
            Expr::Subquery(sq) => write!(f, "{sq}"),
        }
    }
}

// ============================================================================
// Selectors and matchers
// ============================================================================

/// Label matcher operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchOp {
    /// Exact equality (=)
    Equal,
    /// Exact inequality (!=)
    NotEqual,
    /// Regex match (=~)
    Regex,
    /// Negated regex match (!~)
    NotRegex,
}

impl fmt::Display for MatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchOp::Equal => write!(f, "="),
            MatchOp::NotEqual => write!(f, "!="),
            MatchOp::Regex => write!(f, "=~"),
            MatchOp::NotRegex => write!(f, "!~"),
        }
    }
}

/// A single label matcher: `name op "value"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMatcher {
    /// The label name being matched.
    pub name: SmolStr,
    /// The matcher operator.
    pub op: MatchOp,
    /// The (unescaped) value to match against.
    pub value: SmolStr,
    /// Span covering the entire matcher.
    pub span: Span,
}

impl fmt::Display for LabelMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.op)?;
        write_quoted(f, &self.value)
    }
}

/// A raw duration literal such as `5m` or `1h30m`.
///
/// The source text is preserved verbatim; the analyzer never needs the
/// resolved value, only faithful re-rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurationLit {
    /// The duration text as written (may carry a leading `-` for offsets).
    pub text: SmolStr,
    /// Span in source.
    pub span: Span,
}

impl fmt::Display for DurationLit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// An instant vector selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorSelector {
    /// The metric name; `None` for nameless selectors like `{job="api"}`.
    pub name: Option<SmolStr>,
    /// Label matchers in declared order.
    pub matchers: Vec<LabelMatcher>,
    /// Optional `offset` modifier.
    pub offset: Option<DurationLit>,
    /// Span covering the full selector.
    pub span: Span,
}

impl VectorSelector {
    /// Writes the selector without its offset modifier. Range selectors use
    /// this so the offset can be placed after the `[range]` bracket.
    fn fmt_base(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "{name}")?;
        }
        if self.name.is_none() || !self.matchers.is_empty() {
            write!(f, "{{")?;
            for (i, matcher) in self.matchers.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{matcher}")?;
            }
            write!(f, "}}")?;
        }
        Ok(())
    }
}

impl fmt::Display for VectorSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_base(f)?;
        if let Some(offset) = &self.offset {
            write!(f, " offset {offset}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Aggregations
// ============================================================================

/// Aggregation operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateOp {
    Sum,
    Avg,
    Count,
    Min,
    Max,
    Group,
    Stddev,
    Stdvar,
    Topk,
    Bottomk,
    Quantile,
    CountValues,
}

impl AggregateOp {
    /// Returns the operator's lowercase source-text name.
    pub fn name(&self) -> &'static str {
        match self {
            AggregateOp::Sum => "sum",
            AggregateOp::Avg => "avg",
            AggregateOp::Count => "count",
            AggregateOp::Min => "min",
            AggregateOp::Max => "max",
            AggregateOp::Group => "group",
            AggregateOp::Stddev => "stddev",
            AggregateOp::Stdvar => "stdvar",
            AggregateOp::Topk => "topk",
            AggregateOp::Bottomk => "bottomk",
            AggregateOp::Quantile => "quantile",
            AggregateOp::CountValues => "count_values",
        }
    }

    /// Returns true if the operator takes a leading parameter
    /// (`topk(5, expr)`).
    pub fn takes_param(&self) -> bool {
        matches!(
            self,
            AggregateOp::Topk
                | AggregateOp::Bottomk
                | AggregateOp::Quantile
                | AggregateOp::CountValues
        )
    }
}

impl fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Grouping clause mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupingMode {
    /// Keep only the listed dimensions.
    By,
    /// Drop the listed dimensions.
    Without,
}

impl fmt::Display for GroupingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupingMode::By => write!(f, "by"),
            GroupingMode::Without => write!(f, "without"),
        }
    }
}

/// A `by (...)` / `without (...)` grouping clause.
///
/// An explicit empty clause (`by ()`) is distinct from an absent one: the
/// former aggregates everything into a single series, the latter leaves the
/// operator's default behavior. The [`AggregateExpr`] holds
/// `Option<Grouping>` to keep that distinction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grouping {
    /// Whether this is a `by` or `without` clause.
    pub mode: GroupingMode,
    /// Dimension names in declared order.
    pub labels: Vec<SmolStr>,
    /// Span covering the clause.
    pub span: Span,
}

impl fmt::Display for Grouping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (", self.mode)?;
        for (i, label) in self.labels.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{label}")?;
        }
        write!(f, ")")
    }
}

/// An aggregation expression.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateExpr {
    /// The aggregation operator.
    pub op: AggregateOp,
    /// Optional grouping clause.
    pub grouping: Option<Grouping>,
    /// Leading parameter for parameterized operators (`topk`, `bottomk`,
    /// `quantile`, `count_values`).
    pub param: Option<Box<Expr>>,
    /// The aggregated expression.
    pub expr: Box<Expr>,
    /// Span covering the full aggregation.
    pub span: Span,
}

impl fmt::Display for AggregateExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.op)?;
        if let Some(grouping) = &self.grouping {
            write!(f, " {grouping} ")?;
        }
        write!(f, "(")?;
        if let Some(param) = &self.param {
            write!(f, "{param}, ")?;
        }
        write!(f, "{})", self.expr)
    }
}

// ============================================================================
// Literals
// ============================================================================

/// A number literal.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberLiteral {
    /// The numeric value; may be infinite or NaN.
    pub value: f64,
    /// Span in source.
    pub span: Span,
}

impl fmt::Display for NumberLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// A string literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringLiteral {
    /// The unescaped string value.
    pub value: SmolStr,
    /// Span in source.
    pub span: Span,
}

impl fmt::Display for StringLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_quoted(f, &self.value)
    }
}

// ============================================================================
// Operators
// ============================================================================

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Unary plus (+)
    Plus,
    /// Unary minus (-)
    Minus,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Plus => write!(f, "+"),
            UnaryOp::Minus => write!(f, "-"),
        }
    }
}

/// Binary operators, covering arithmetic, comparison, and set operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    // Comparison
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    // Set operations
    And,
    Or,
    Unless,
}

impl BinaryOp {
    /// Returns true for comparison operators, which accept the `bool`
    /// modifier.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Lt
                | BinaryOp::Gt
                | BinaryOp::LtEq
                | BinaryOp::GtEq
        )
    }

    /// Returns true for the set operators `and`, `or`, `unless`.
    pub fn is_set_operator(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or | BinaryOp::Unless)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOp::Add => write!(f, "+"),
            BinaryOp::Sub => write!(f, "-"),
            BinaryOp::Mul => write!(f, "*"),
            BinaryOp::Div => write!(f, "/"),
            BinaryOp::Mod => write!(f, "%"),
            BinaryOp::Pow => write!(f, "^"),
            BinaryOp::Eq => write!(f, "=="),
            BinaryOp::NotEq => write!(f, "!="),
            BinaryOp::Lt => write!(f, "<"),
            BinaryOp::Gt => write!(f, ">"),
            BinaryOp::LtEq => write!(f, "<="),
            BinaryOp::GtEq => write!(f, ">="),
            BinaryOp::And => write!(f, "and"),
            BinaryOp::Or => write!(f, "or"),
            BinaryOp::Unless => write!(f, "unless"),
        }
    }
}

// ============================================================================
// Compound expressions
// ============================================================================

/// A unary expression.
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    /// The operator.
    pub op: UnaryOp,
    /// The operand.
    pub expr: Box<Expr>,
    /// Span covering operator and operand.
    pub span: Span,
}

impl fmt::Display for UnaryExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op, self.expr)
    }
}

/// Which side of a binary operation receives extra series in many-to-one /
/// one-to-many matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupSide {
    Left,
    Right,
}

impl fmt::Display for GroupSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupSide::Left => write!(f, "group_left"),
            GroupSide::Right => write!(f, "group_right"),
        }
    }
}

/// A `group_left (...)` / `group_right (...)` modifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupModifier {
    /// Which side carries the higher cardinality.
    pub side: GroupSide,
    /// Labels copied from the "one" side.
    pub labels: Vec<SmolStr>,
}

/// An `on (...)` / `ignoring (...)` vector-matching clause, with an optional
/// group modifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorMatching {
    /// True for `on`, false for `ignoring`.
    pub on: bool,
    /// The labels to match (or ignore).
    pub labels: Vec<SmolStr>,
    /// Optional `group_left`/`group_right` modifier.
    pub group: Option<GroupModifier>,
}

impl fmt::Display for VectorMatching {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = if self.on { "on" } else { "ignoring" };
        write!(f, "{tag} (")?;
        for (i, label) in self.labels.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{label}")?;
        }
        write!(f, ")")?;
        if let Some(group) = &self.group {
            write!(f, " {} (", group.side)?;
            for (i, label) in group.labels.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{label}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// A binary operation.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    /// The operator.
    pub op: BinaryOp,
    /// Left operand.
    pub lhs: Box<Expr>,
    /// Right operand.
    pub rhs: Box<Expr>,
    /// Whether the comparison carries the `bool` modifier.
    pub return_bool: bool,
    /// Optional vector-matching clause.
    pub matching: Option<VectorMatching>,
    /// Span covering both operands.
    pub span: Span,
}

impl fmt::Display for BinaryExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.lhs, self.op)?;
        if self.return_bool {
            write!(f, " bool")?;
        }
        if let Some(matching) = &self.matching {
            write!(f, " {matching}")?;
        }
        write!(f, " {}", self.rhs)
    }
}

/// A parenthesized expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ParenExpr {
    /// The inner expression.
    pub expr: Box<Expr>,
    /// Span including the parentheses.
    pub span: Span,
}

impl fmt::Display for ParenExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.expr)
    }
}

/// A function call.
///
/// Function names are not validated against a registry; unknown functions
/// parse fine and classify as unsafe, so new upstream functions never break
/// analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    /// The function name as written.
    pub name: SmolStr,
    /// Arguments in order.
    pub args: Vec<Expr>,
    /// Span covering the call.
    pub span: Span,
}

impl fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ")")
    }
}

/// A range selection over a vector selector.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixSelector {
    /// The underlying selector; always `Expr::Selector`, enforced at parse
    /// time, typed as `Expr` so traversal stays uniform.
    pub expr: Box<Expr>,
    /// The range duration.
    pub range: DurationLit,
    /// Span covering selector and range.
    pub span: Span,
}

impl fmt::Display for MatrixSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The inner selector's offset renders after the range bracket.
        if let Expr::Selector(sel) = self.expr.as_ref() {
            sel.fmt_base(f)?;
            write!(f, "[{}]", self.range)?;
            if let Some(offset) = &sel.offset {
                write!(f, " offset {offset}")?;
            }
            Ok(())
        } else {
            write!(f, "{}[{}]", self.expr, self.range)
        }
    }
}

/// A subquery expression.
#[derive(Debug, Clone, PartialEq)]
pub struct SubqueryExpr {
    /// The inner expression being re-evaluated.
    pub expr: Box<Expr>,
    /// The window to evaluate over.
    pub range: DurationLit,
    /// The resolution step; `None` uses the engine default.
    pub step: Option<DurationLit>,
    /// Optional `offset` modifier.
    pub offset: Option<DurationLit>,
    /// Span covering the full subquery.
    pub span: Span,
}

impl fmt::Display for SubqueryExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}:", self.expr, self.range)?;
        if let Some(step) = &self.step {
            write!(f, "{step}")?;
        }
        write!(f, "]")?;
        if let Some(offset) = &self.offset {
            write!(f, " offset {offset}")?;
        }
        Ok(())
    }
}

/// Writes a string value double-quoted with escapes, the inverse of the
/// lexer's unescaping.
fn write_quoted(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    use fmt::Write;

    f.write_char('"')?;
    for ch in value.chars() {
        match ch {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            _ => f.write_char(ch)?,
        }
    }
    f.write_char('"')
}
