//! Lexical analysis for PromQL.
//!
//! This module implements a robust, error-tolerant lexer that converts PromQL
//! query text into a stream of tokens. The lexer integrates with the
//! diagnostic infrastructure to provide rich error reporting, and keeps
//! scanning after errors so a single pass reports every problem it can find.

pub mod keywords;
pub mod token;

use crate::diag::Diag;
use smol_str::SmolStr;
use token::{Token, TokenKind};

/// Result of lexical analysis.
///
/// Contains both the tokens produced and any diagnostics encountered during scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerResult {
    /// The tokens produced, including an EOF token at the end.
    pub tokens: Vec<Token>,
    /// Diagnostics (errors, warnings) encountered during lexing.
    pub diagnostics: Vec<Diag>,
}

/// A lexical analyzer for PromQL query text.
///
/// The lexer scans source text character by character and produces tokens.
/// It continues scanning after errors to provide comprehensive diagnostics.
pub struct Lexer<'a> {
    /// The source text being lexed.
    source: &'a str,
    /// Current byte position in source.
    pos: usize,
    /// Accumulated tokens.
    tokens: Vec<Token>,
    /// Accumulated diagnostics.
    diagnostics: Vec<Diag>,
    /// Whether the scanner is inside a `[...]` range. Inside brackets `:` is
    /// the subquery step separator; outside it is part of a metric name.
    bracket_open: bool,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given query text.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            tokens: Vec::new(),
            diagnostics: Vec::new(),
            bracket_open: false,
        }
    }

    /// Tokenizes the query text and returns the result.
    ///
    /// This consumes the lexer and returns both tokens and diagnostics.
    pub fn tokenize(mut self) -> LexerResult {
        while !self.is_at_end() {
            self.skip_whitespace_and_comments();
            if self.is_at_end() {
                break;
            }
            self.scan_token();
        }

        // Always add EOF token
        let eof_pos = self.source.len();
        self.tokens.push(Token::new(TokenKind::Eof, eof_pos..eof_pos));

        LexerResult {
            tokens: self.tokens,
            diagnostics: self.diagnostics,
        }
    }

    /// Scans a single token.
    fn scan_token(&mut self) {
        let start = self.pos;
        let ch = self.advance();

        match ch {
            // Single-character tokens
            '(' => self.add_token(TokenKind::LParen, start),
            ')' => self.add_token(TokenKind::RParen, start),
            '{' => self.add_token(TokenKind::LBrace, start),
            '}' => self.add_token(TokenKind::RBrace, start),
            ',' => self.add_token(TokenKind::Comma, start),
            '+' => self.add_token(TokenKind::Plus, start),
            '-' => self.add_token(TokenKind::Minus, start),
            '*' => self.add_token(TokenKind::Star, start),
            '/' => self.add_token(TokenKind::Slash, start),
            '%' => self.add_token(TokenKind::Percent, start),
            '^' => self.add_token(TokenKind::Caret, start),

            '[' => {
                self.bracket_open = true;
                self.add_token(TokenKind::LBracket, start);
            }
            ']' => {
                self.bracket_open = false;
                self.add_token(TokenKind::RBracket, start);
            }

            // Multi-character operators
            '=' => {
                if self.match_char('=') {
                    self.add_token(TokenKind::Eq, start);
                } else if self.match_char('~') {
                    self.add_token(TokenKind::EqRegex, start);
                } else {
                    self.add_token(TokenKind::Assign, start);
                }
            }
            '!' => {
                if self.match_char('=') {
                    self.add_token(TokenKind::NotEq, start);
                } else if self.match_char('~') {
                    self.add_token(TokenKind::NotEqRegex, start);
                } else {
                    self.error(start, "unexpected character '!'");
                    // Error recovery: skip this character
                }
            }
            '<' => {
                if self.match_char('=') {
                    self.add_token(TokenKind::LtEq, start);
                } else {
                    self.add_token(TokenKind::Lt, start);
                }
            }
            '>' => {
                if self.match_char('=') {
                    self.add_token(TokenKind::GtEq, start);
                } else {
                    self.add_token(TokenKind::Gt, start);
                }
            }

            // Subquery step separator inside brackets; outside brackets a
            // colon can only start a metric name.
            ':' => {
                if self.bracket_open {
                    self.add_token(TokenKind::Colon, start);
                } else {
                    self.scan_identifier_or_keyword(start);
                }
            }

            // String literals (both quote styles)
            '"' | '\'' => self.scan_string_literal(start, ch),

            // Numbers and durations
            '0'..='9' => self.scan_number_or_duration(start),
            '.' if self.peek().is_ascii_digit() => self.scan_number_or_duration(start),

            // Identifiers and keywords
            'a'..='z' | 'A'..='Z' | '_' => self.scan_identifier_or_keyword(start),

            // Invalid character
            _ => {
                self.error(start, &format!("invalid character '{}'", ch));
                // Error recovery: skip this character and continue
            }
        }
    }

    /// Scans an identifier, metric identifier, or keyword.
    fn scan_identifier_or_keyword(&mut self, start: usize) {
        while self.is_identifier_continue(self.peek()) {
            self.advance();
        }

        let text = &self.source[start..self.pos];

        if text.contains(':') {
            // Only valid as a metric name; the parser rejects other uses.
            self.add_token(TokenKind::MetricIdentifier(SmolStr::new(text)), start);
        } else if text.eq_ignore_ascii_case("inf") || text.eq_ignore_ascii_case("nan") {
            // Non-finite numbers are case-insensitive words, like upstream.
            self.add_token(TokenKind::NumberLiteral(SmolStr::new(text)), start);
        } else if let Some(kind) = keywords::lookup_keyword(text) {
            self.add_token(kind, start);
        } else {
            self.add_token(TokenKind::Identifier(SmolStr::new(text)), start);
        }
    }

    /// Scans a string literal delimited by the given quote character.
    fn scan_string_literal(&mut self, start: usize, quote: char) {
        let mut value = String::new();
        let mut terminated = false;

        while !self.is_at_end() {
            let ch = self.peek();
            if ch == quote {
                self.advance();
                terminated = true;
                break;
            }
            if ch == '\n' {
                // Strings do not span lines
                break;
            }
            if ch == '\\' {
                self.advance(); // consume backslash
                if self.is_at_end() {
                    break;
                }
                let escaped = self.advance();
                match escaped {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    '\'' => value.push('\''),
                    '"' => value.push('"'),
                    '\\' => value.push('\\'),
                    'u' => {
                        // Unicode escape sequence: \uXXXX
                        let mut hex = String::new();
                        let mut valid = true;
                        for _ in 0..4 {
                            if self.peek().is_ascii_hexdigit() {
                                hex.push(self.advance());
                            } else {
                                self.error(self.pos, "invalid unicode escape sequence");
                                valid = false;
                                break;
                            }
                        }
                        if valid && let Ok(code) = u32::from_str_radix(&hex, 16) {
                            if let Some(ch) = char::from_u32(code) {
                                value.push(ch);
                            } else {
                                self.error(start, "invalid unicode code point");
                            }
                        }
                    }
                    _ => {
                        self.error(
                            self.pos - escaped.len_utf8(),
                            &format!("invalid escape sequence '\\{}'", escaped),
                        );
                        value.push(escaped);
                    }
                }
            } else {
                value.push(self.advance());
            }
        }

        if !terminated {
            self.error_span(start..self.pos, "unclosed string literal", "L001");
            // Error recovery: synthesize closing quote
        }

        self.add_token(TokenKind::StringLiteral(SmolStr::new(value)), start);
    }

    /// Scans a number literal or a duration like `1h30m`.
    fn scan_number_or_duration(&mut self, start: usize) {
        // Hex integers: 0x1f / 0X1F
        if &self.source[start..self.pos] == "0" && matches!(self.peek(), 'x' | 'X') {
            self.advance();
            let digits_start = self.pos;
            while self.peek().is_ascii_hexdigit() {
                self.advance();
            }
            if self.pos == digits_start {
                self.error_span(start..self.pos, "malformed hexadecimal literal", "L002");
                return;
            }
            self.add_number(start);
            return;
        }

        let mut is_float = self.source.as_bytes()[start] == b'.';

        // Integer part (or fractional continuation when entered at '.')
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if !is_float && self.peek() == '.' {
            is_float = true;
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        if matches!(self.peek(), 'e' | 'E') {
            self.advance();
            if matches!(self.peek(), '+' | '-') {
                self.advance();
            }
            let exp_start = self.pos;
            while self.peek().is_ascii_digit() {
                self.advance();
            }
            if self.pos == exp_start {
                self.error_span(
                    start..self.pos,
                    &format!(
                        "malformed exponent in numeric literal '{}'",
                        &self.source[start..self.pos]
                    ),
                    "L002",
                );
                return;
            }
        } else if !is_float && is_duration_unit_start(self.peek()) {
            self.scan_duration_rest(start);
            return;
        }

        self.add_number(start);
    }

    /// Scans the remaining `<digits><unit>` groups of a duration whose first
    /// digit run is already consumed and whose next character starts a unit.
    fn scan_duration_rest(&mut self, start: usize) {
        loop {
            if !self.consume_duration_unit() {
                while self.peek().is_ascii_alphanumeric() {
                    self.advance();
                }
                self.error_span(
                    start..self.pos,
                    &format!("bad duration syntax '{}'", &self.source[start..self.pos]),
                    "L002",
                );
                return;
            }
            if !self.peek().is_ascii_digit() {
                break;
            }
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text = &self.source[start..self.pos];
        self.add_token(TokenKind::DurationLiteral(SmolStr::new(text)), start);
    }

    /// Consumes one duration unit (`ms`, `s`, `m`, `h`, `d`, `w`, `y`).
    fn consume_duration_unit(&mut self) -> bool {
        match self.peek() {
            'm' => {
                self.advance();
                if self.peek() == 's' {
                    self.advance();
                }
                true
            }
            's' | 'h' | 'd' | 'w' | 'y' => {
                self.advance();
                true
            }
            _ => false,
        }
    }

    /// Emits a number token, rejecting trailing identifier characters
    /// (`5x`, `12foo`).
    fn add_number(&mut self, start: usize) {
        if self.peek().is_ascii_alphabetic() || self.peek() == '_' {
            while self.peek().is_ascii_alphanumeric() || self.peek() == '_' {
                self.advance();
            }
            self.error_span(
                start..self.pos,
                &format!(
                    "bad number or duration syntax '{}'",
                    &self.source[start..self.pos]
                ),
                "L002",
            );
            return;
        }

        let text = &self.source[start..self.pos];
        self.add_token(TokenKind::NumberLiteral(SmolStr::new(text)), start);
    }

    /// Skips whitespace and `#` line comments.
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance();
                }
                '#' => {
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    /// Returns true if the character can continue an identifier. Colons are
    /// identifier characters only outside brackets.
    fn is_identifier_continue(&self, ch: char) -> bool {
        ch.is_ascii_alphanumeric() || ch == '_' || (ch == ':' && !self.bracket_open)
    }

    /// Adds a token to the token stream.
    fn add_token(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token::new(kind, start..self.pos));
    }

    /// Adds an error diagnostic covering the single character at `pos`.
    ///
    /// The span end lands on the next character boundary so multi-byte
    /// characters produce valid spans.
    fn error(&mut self, pos: usize, message: &str) {
        let end = self.source[pos..]
            .chars()
            .next()
            .map_or(pos, |ch| pos + ch.len_utf8());
        self.error_span(pos..end, message, "L001");
    }

    /// Adds an error diagnostic with an explicit span and code.
    fn error_span(&mut self, span: std::ops::Range<usize>, message: &str, code: &str) {
        self.diagnostics.push(
            Diag::error(message)
                .with_primary_label(span, "here")
                .with_code(code),
        );
    }

    /// Returns the current character without advancing.
    fn peek(&self) -> char {
        self.source[self.pos..].chars().next().unwrap_or('\0')
    }

    /// Advances and returns the current character.
    ///
    /// Stays in place at end of input. A literal NUL byte in the source is a
    /// real character and still advances.
    fn advance(&mut self) -> char {
        match self.source[self.pos..].chars().next() {
            Some(ch) => {
                self.pos += ch.len_utf8();
                ch
            }
            None => '\0',
        }
    }

    /// Matches and consumes a character if it matches the expected one.
    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Returns true if at end of input.
    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }
}

/// Returns true if the character can start a duration unit.
fn is_duration_unit_start(ch: char) -> bool {
    matches!(ch, 'm' | 's' | 'h' | 'd' | 'w' | 'y')
}

/// Convenience function to tokenize a query string.
///
/// This is the main entry point for lexical analysis.
pub fn tokenize(source: &str) -> LexerResult {
    Lexer::new(source).tokenize()
}
