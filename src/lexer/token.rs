//! Token types and representations for PromQL lexical analysis.

use crate::ast::Span;
use smol_str::SmolStr;
use std::fmt;

/// The kind of a lexical token in PromQL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Aggregation operators (keywords)
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

    // Grouping and vector-matching modifiers (keywords)
    By,
    Without,
    On,
    Ignoring,
    GroupLeft,
    GroupRight,
    Offset,
    Bool,

    // Set operators (keywords)
    And,
    Or,
    Unless,

    // Identifiers
    Identifier(SmolStr),
    /// Identifier containing at least one ':', valid only as a metric name
    /// (the form recording rules produce).
    MetricIdentifier(SmolStr),

    // Literals (raw source text preserved)
    NumberLiteral(SmolStr),
    StringLiteral(SmolStr),
    DurationLiteral(SmolStr),

    // Arithmetic operators
    Plus,    // +
    Minus,   // -
    Star,    // *
    Slash,   // /
    Percent, // %
    Caret,   // ^

    // Comparison and matcher operators
    Assign,     // =
    Eq,         // ==
    NotEq,      // !=
    Lt,         // <
    Gt,         // >
    LtEq,       // <=
    GtEq,       // >=
    EqRegex,    // =~
    NotEqRegex, // !~

    // Punctuation
    LParen,   // (
    RParen,   // )
    LBrace,   // {
    RBrace,   // }
    LBracket, // [
    RBracket, // ]
    Comma,    // ,
    Colon,    // : (subquery step separator, inside brackets only)

    // Special
    Eof,
}

impl TokenKind {
    /// Returns true if this token kind is a keyword.
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::Sum
                | TokenKind::Avg
                | TokenKind::Count
                | TokenKind::Min
                | TokenKind::Max
                | TokenKind::Group
                | TokenKind::Stddev
                | TokenKind::Stdvar
                | TokenKind::Topk
                | TokenKind::Bottomk
                | TokenKind::Quantile
                | TokenKind::CountValues
                | TokenKind::By
                | TokenKind::Without
                | TokenKind::On
                | TokenKind::Ignoring
                | TokenKind::GroupLeft
                | TokenKind::GroupRight
                | TokenKind::Offset
                | TokenKind::Bool
                | TokenKind::And
                | TokenKind::Or
                | TokenKind::Unless
        )
    }

    /// Returns true if this token kind names an aggregation operator.
    pub fn is_aggregation_op(&self) -> bool {
        matches!(
            self,
            TokenKind::Sum
                | TokenKind::Avg
                | TokenKind::Count
                | TokenKind::Min
                | TokenKind::Max
                | TokenKind::Group
                | TokenKind::Stddev
                | TokenKind::Stdvar
                | TokenKind::Topk
                | TokenKind::Bottomk
                | TokenKind::Quantile
                | TokenKind::CountValues
        )
    }

    /// Returns true if this token kind is a literal.
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            TokenKind::NumberLiteral(_)
                | TokenKind::StringLiteral(_)
                | TokenKind::DurationLiteral(_)
        )
    }

    /// Returns true if this token kind is an operator.
    pub fn is_operator(&self) -> bool {
        matches!(
            self,
            TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Star
                | TokenKind::Slash
                | TokenKind::Percent
                | TokenKind::Caret
                | TokenKind::Assign
                | TokenKind::Eq
                | TokenKind::NotEq
                | TokenKind::Lt
                | TokenKind::Gt
                | TokenKind::LtEq
                | TokenKind::GtEq
                | TokenKind::EqRegex
                | TokenKind::NotEqRegex
                | TokenKind::And
                | TokenKind::Or
                | TokenKind::Unless
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Sum => write!(f, "sum"),
            TokenKind::Avg => write!(f, "avg"),
            TokenKind::Count => write!(f, "count"),
            TokenKind::Min => write!(f, "min"),
            TokenKind::Max => write!(f, "max"),
            TokenKind::Group => write!(f, "group"),
            TokenKind::Stddev => write!(f, "stddev"),
            TokenKind::Stdvar => write!(f, "stdvar"),
            TokenKind::Topk => write!(f, "topk"),
            TokenKind::Bottomk => write!(f, "bottomk"),
            TokenKind::Quantile => write!(f, "quantile"),
            TokenKind::CountValues => write!(f, "count_values"),
            TokenKind::By => write!(f, "by"),
            TokenKind::Without => write!(f, "without"),
            TokenKind::On => write!(f, "on"),
            TokenKind::Ignoring => write!(f, "ignoring"),
            TokenKind::GroupLeft => write!(f, "group_left"),
            TokenKind::GroupRight => write!(f, "group_right"),
            TokenKind::Offset => write!(f, "offset"),
            TokenKind::Bool => write!(f, "bool"),
            TokenKind::And => write!(f, "and"),
            TokenKind::Or => write!(f, "or"),
            TokenKind::Unless => write!(f, "unless"),
            TokenKind::Identifier(name) => write!(f, "{name}"),
            TokenKind::MetricIdentifier(name) => write!(f, "{name}"),
            TokenKind::NumberLiteral(n) => write!(f, "{n}"),
            TokenKind::StringLiteral(s) => write!(f, "\"{s}\""),
            TokenKind::DurationLiteral(d) => write!(f, "{d}"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::Star => write!(f, "*"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::Percent => write!(f, "%"),
            TokenKind::Caret => write!(f, "^"),
            TokenKind::Assign => write!(f, "="),
            TokenKind::Eq => write!(f, "=="),
            TokenKind::NotEq => write!(f, "!="),
            TokenKind::Lt => write!(f, "<"),
            TokenKind::Gt => write!(f, ">"),
            TokenKind::LtEq => write!(f, "<="),
            TokenKind::GtEq => write!(f, ">="),
            TokenKind::EqRegex => write!(f, "=~"),
            TokenKind::NotEqRegex => write!(f, "!~"),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::LBrace => write!(f, "{{"),
            TokenKind::RBrace => write!(f, "}}"),
            TokenKind::LBracket => write!(f, "["),
            TokenKind::RBracket => write!(f, "]"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Eof => write!(f, "<EOF>"),
        }
    }
}

/// A lexical token with its kind and source span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The kind of token.
    pub kind: TokenKind,
    /// The span in source text.
    pub span: Span,
}

impl Token {
    /// Creates a new token.
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Returns the source slice covered by this token.
    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        &source[self.span.clone()]
    }
}
