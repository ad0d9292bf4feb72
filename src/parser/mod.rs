//! Parser infrastructure for PromQL syntax.
//!
//! The parser consumes a token stream produced by the lexer and constructs
//! an expression AST while preserving diagnostics from both stages.

pub mod expr;
pub mod stream;

use crate::ast::Expr;
use crate::diag::{Diag, SourceFile, convert_diagnostics_to_reports};
use crate::lexer::token::{Token, TokenKind};
use miette::Report;

pub use expr::ExpressionParser;

/// Result of parsing a PromQL query.
#[derive(Debug)]
pub struct ParseResult {
    /// The parsed expression, or None if parsing failed.
    pub ast: Option<Expr>,
    /// All collected diagnostics rendered as miette reports.
    pub diagnostics: Vec<Report>,
}

/// PromQL parser.
pub struct Parser<'source> {
    tokens: Vec<Token>,
    diagnostics: Vec<Diag>,
    source: &'source str,
}

impl<'source> Parser<'source> {
    /// Creates a new parser from a token stream.
    pub fn new(mut tokens: Vec<Token>, source: &'source str) -> Self {
        if tokens.is_empty() {
            tokens.push(Token::new(TokenKind::Eof, 0..0));
        } else if !matches!(tokens.last().map(|t| &t.kind), Some(TokenKind::Eof)) {
            let eof_pos = tokens.last().map(|t| t.span.end).unwrap_or(0);
            tokens.push(Token::new(TokenKind::Eof, eof_pos..eof_pos));
        }

        Self {
            tokens,
            diagnostics: Vec::new(),
            source,
        }
    }

    /// Parses the token stream into an expression AST.
    pub fn parse(mut self) -> ParseResult {
        let ast = match expr::parse_expression(&self.tokens, self.source) {
            Ok(expr) => Some(expr),
            Err(diag) => {
                self.diagnostics.push(*diag);
                None
            }
        };

        let source = SourceFile::new(self.source);
        let reports = convert_diagnostics_to_reports(&self.diagnostics, &source);

        ParseResult {
            ast,
            diagnostics: reports,
        }
    }

    /// Merges lexer diagnostics with parser diagnostics.
    pub fn with_lexer_diagnostics(mut self, lex_diags: Vec<Diag>) -> Self {
        let mut all_diags = lex_diags;
        all_diags.append(&mut self.diagnostics);
        self.diagnostics = all_diags;
        self
    }
}

/// Parses a PromQL query into an expression AST.
///
/// This is the main entry point for parsing. Lexer and parser diagnostics
/// are combined in the result, lexer diagnostics first.
pub fn parse(source: &str) -> ParseResult {
    let lexed = crate::lexer::tokenize(source);
    Parser::new(lexed.tokens, source)
        .with_lexer_diagnostics(lexed.diagnostics)
        .parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    #[test]
    fn parser_creation_normalizes_missing_eof() {
        let tokens = vec![Token::new(TokenKind::Identifier("up".into()), 0..2)];
        let parser = Parser::new(tokens, "up");
        assert_eq!(parser.tokens.len(), 2);
        assert_eq!(parser.tokens[1].kind, TokenKind::Eof);
    }

    #[test]
    fn parse_simple_query() {
        let result = parse("sum(up)");
        assert!(result.diagnostics.is_empty());
        let ast = result.ast.expect("expression should parse");
        assert!(matches!(ast, Expr::Aggregate(_)));
    }

    #[test]
    fn parse_returns_none_on_syntax_error() {
        let result = parse("sum(up");
        assert!(result.ast.is_none());
        assert!(!result.diagnostics.is_empty());
    }

    #[test]
    fn parse_empty_input_is_an_error() {
        let result = parse("");
        assert!(result.ast.is_none());
        assert_eq!(result.diagnostics.len(), 1);
    }

    #[test]
    fn lexer_diagnostics_are_merged() {
        // The invalid escape is a lexer error, but the string token is still
        // produced, so the parse itself succeeds.
        let result = parse(r#"up{job="a\q"}"#);
        assert!(result.ast.is_some());
        assert!(!result.diagnostics.is_empty());
    }

    #[test]
    fn parser_never_panics_on_random_inputs() {
        fn random_token_kind(seed: &mut u64) -> TokenKind {
            *seed = seed
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            match *seed % 16 {
                0 => TokenKind::Sum,
                1 => TokenKind::By,
                2 => TokenKind::LParen,
                3 => TokenKind::RParen,
                4 => TokenKind::LBrace,
                5 => TokenKind::RBrace,
                6 => TokenKind::LBracket,
                7 => TokenKind::RBracket,
                8 => TokenKind::Colon,
                9 => TokenKind::Comma,
                10 => TokenKind::Plus,
                11 => TokenKind::Offset,
                12 => TokenKind::NumberLiteral("1".into()),
                13 => TokenKind::DurationLiteral("5m".into()),
                14 => TokenKind::StringLiteral("v".into()),
                _ => TokenKind::Identifier("x".into()),
            }
        }

        let padding = "x".repeat(64);
        let mut seed = 0xC0FFEE_u64;
        for _ in 0..10_000 {
            seed = seed
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let token_count = (seed % 32) as usize;

            let mut tokens = Vec::with_capacity(token_count + 1);
            let mut cursor = 0usize;

            for _ in 0..token_count {
                let kind = random_token_kind(&mut seed);
                let end = cursor + 1;
                tokens.push(Token::new(kind, cursor..end));
                cursor = end;
            }

            let result =
                catch_unwind(AssertUnwindSafe(|| Parser::new(tokens, &padding).parse()));
            assert!(result.is_ok(), "parser panicked on randomized token stream");
        }
    }
}
