//! Keyword recognition and classification for PromQL.
//!
//! PromQL keywords are case-insensitive, matching the upstream Prometheus
//! lexer behavior.

use super::token::TokenKind;

/// Looks up a keyword by name (case-insensitive).
pub fn lookup_keyword(name: &str) -> Option<TokenKind> {
    match name.to_ascii_lowercase().as_str() {
        // Aggregation operators
        "sum" => Some(TokenKind::Sum),
        "avg" => Some(TokenKind::Avg),
        "count" => Some(TokenKind::Count),
        "min" => Some(TokenKind::Min),
        "max" => Some(TokenKind::Max),
        "group" => Some(TokenKind::Group),
        "stddev" => Some(TokenKind::Stddev),
        "stdvar" => Some(TokenKind::Stdvar),
        "topk" => Some(TokenKind::Topk),
        "bottomk" => Some(TokenKind::Bottomk),
        "quantile" => Some(TokenKind::Quantile),
        "count_values" => Some(TokenKind::CountValues),

        // Grouping and vector-matching modifiers
        "by" => Some(TokenKind::By),
        "without" => Some(TokenKind::Without),
        "on" => Some(TokenKind::On),
        "ignoring" => Some(TokenKind::Ignoring),
        "group_left" => Some(TokenKind::GroupLeft),
        "group_right" => Some(TokenKind::GroupRight),
        "offset" => Some(TokenKind::Offset),
        "bool" => Some(TokenKind::Bool),

        // Set operators
        "and" => Some(TokenKind::And),
        "or" => Some(TokenKind::Or),
        "unless" => Some(TokenKind::Unless),

        _ => None,
    }
}

/// Returns true if the given name is a keyword (case-insensitive).
pub fn is_keyword(name: &str) -> bool {
    lookup_keyword(name).is_some()
}
