//! Expression parsing for PromQL.
//!
//! This module implements expression parsing with the standard PromQL
//! precedence rules, selector/matcher syntax, aggregation modifiers, range
//! and subquery suffixes, and structured diagnostics.

use crate::ast::{
    AggregateExpr, AggregateOp, BinaryExpr, BinaryOp, DurationLit, Expr, FunctionCall,
    GroupModifier, GroupSide, Grouping, GroupingMode, LabelMatcher, MatchOp, MatrixSelector,
    NumberLiteral, ParenExpr, Span, StringLiteral, SubqueryExpr, UnaryExpr, UnaryOp,
    VectorMatching, VectorSelector,
};
use crate::diag::Diag;
use crate::lexer::token::{Token, TokenKind};
use crate::parser::stream::{ParseResult, TokenStream};
use smol_str::SmolStr;

/// Parser for PromQL expressions.
pub struct ExpressionParser<'a> {
    stream: TokenStream<'a>,
    source: &'a str,
}

impl<'a> ExpressionParser<'a> {
    /// Creates a new expression parser.
    ///
    /// `source` is the query text the tokens were produced from; it is needed
    /// to recover the written form of keyword tokens used as label names.
    pub fn new(tokens: &'a [Token], source: &'a str) -> Self {
        Self {
            stream: TokenStream::new(tokens),
            source,
        }
    }

    /// Parses an expression using standard precedence rules.
    pub fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.parse_or_expression()
    }

    /// Returns an error if unconsumed tokens remain before EOF.
    pub fn expect_consumed(&self) -> ParseResult<()> {
        if self.stream.check(&TokenKind::Eof) {
            Ok(())
        } else {
            Err(self.stream.error_here(format!(
                "unexpected '{}' after the expression",
                self.stream.current().kind
            )))
        }
    }

    fn parse_or_expression(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_and_expression()?;

        while self.stream.check(&TokenKind::Or) {
            self.stream.advance();
            let matching = self.parse_vector_matching()?;
            let right = self.parse_and_expression()?;
            let span = left.span().start..right.span().end;
            left = Expr::Binary(BinaryExpr {
                op: BinaryOp::Or,
                lhs: Box::new(left),
                rhs: Box::new(right),
                return_bool: false,
                matching,
                span,
            });
        }

        Ok(left)
    }

    fn parse_and_expression(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_comparison_expression()?;

        loop {
            let op = match &self.stream.current().kind {
                TokenKind::And => BinaryOp::And,
                TokenKind::Unless => BinaryOp::Unless,
                _ => break,
            };

            self.stream.advance();
            let matching = self.parse_vector_matching()?;
            let right = self.parse_comparison_expression()?;
            let span = left.span().start..right.span().end;
            left = Expr::Binary(BinaryExpr {
                op,
                lhs: Box::new(left),
                rhs: Box::new(right),
                return_bool: false,
                matching,
                span,
            });
        }

        Ok(left)
    }

    fn parse_comparison_expression(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_additive_expression()?;

        loop {
            let op = match &self.stream.current().kind {
                TokenKind::Eq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::NotEq,
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::LtEq => BinaryOp::LtEq,
                TokenKind::GtEq => BinaryOp::GtEq,
                _ => break,
            };

            self.stream.advance();
            let return_bool = self.stream.consume(&TokenKind::Bool);
            let matching = self.parse_vector_matching()?;
            let right = self.parse_additive_expression()?;
            let span = left.span().start..right.span().end;
            left = Expr::Binary(BinaryExpr {
                op,
                lhs: Box::new(left),
                rhs: Box::new(right),
                return_bool,
                matching,
                span,
            });
        }

        Ok(left)
    }

    fn parse_additive_expression(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_multiplicative_expression()?;

        loop {
            let op = match &self.stream.current().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };

            self.stream.advance();
            let matching = self.parse_vector_matching()?;
            let right = self.parse_multiplicative_expression()?;
            let span = left.span().start..right.span().end;
            left = Expr::Binary(BinaryExpr {
                op,
                lhs: Box::new(left),
                rhs: Box::new(right),
                return_bool: false,
                matching,
                span,
            });
        }

        Ok(left)
    }

    fn parse_multiplicative_expression(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_power_expression()?;

        loop {
            let op = match &self.stream.current().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };

            self.stream.advance();
            let matching = self.parse_vector_matching()?;
            let right = self.parse_power_expression()?;
            let span = left.span().start..right.span().end;
            left = Expr::Binary(BinaryExpr {
                op,
                lhs: Box::new(left),
                rhs: Box::new(right),
                return_bool: false,
                matching,
                span,
            });
        }

        Ok(left)
    }

    // Power is right-associative: `a ^ b ^ c` is `a ^ (b ^ c)`.
    fn parse_power_expression(&mut self) -> ParseResult<Expr> {
        let left = self.parse_unary_expression()?;

        if self.stream.check(&TokenKind::Caret) {
            self.stream.advance();
            let matching = self.parse_vector_matching()?;
            let right = self.parse_power_expression()?;
            let span = left.span().start..right.span().end;
            return Ok(Expr::Binary(BinaryExpr {
                op: BinaryOp::Pow,
                lhs: Box::new(left),
                rhs: Box::new(right),
                return_bool: false,
                matching,
                span,
            }));
        }

        Ok(left)
    }

    fn parse_unary_expression(&mut self) -> ParseResult<Expr> {
        let op = match &self.stream.current().kind {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Minus,
            _ => return self.parse_postfix_expression(),
        };

        let start = self.stream.current().span.start;
        self.stream.advance();
        let operand = self.parse_unary_expression()?;
        let span = start..operand.span().end;

        // A sign directly on a number literal folds into the literal.
        if let Expr::Number(number) = operand {
            let value = match op {
                UnaryOp::Plus => number.value,
                UnaryOp::Minus => -number.value,
            };
            return Ok(Expr::Number(NumberLiteral { value, span }));
        }

        Ok(Expr::Unary(UnaryExpr {
            op,
            expr: Box::new(operand),
            span,
        }))
    }

    fn parse_postfix_expression(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary_expression()?;

        loop {
            if self.stream.check(&TokenKind::LBracket) {
                expr = self.parse_range_suffix(expr)?;
                continue;
            }
            if self.stream.check(&TokenKind::Offset) {
                expr = self.parse_offset_suffix(expr)?;
                continue;
            }
            break;
        }

        Ok(expr)
    }

    fn parse_primary_expression(&mut self) -> ParseResult<Expr> {
        match &self.stream.current().kind {
            TokenKind::NumberLiteral(_) => self.parse_number_literal(),
            TokenKind::StringLiteral(_) => self.parse_string_literal(),
            TokenKind::LParen => self.parse_paren_expression(),
            TokenKind::LBrace => self.parse_vector_selector(None, None),
            TokenKind::Identifier(_) => self.parse_identifier_expression(),
            TokenKind::MetricIdentifier(_) => self.parse_metric_identifier_selector(),
            kind if kind.is_aggregation_op() => self.parse_aggregate_expression(),
            kind => Err(self
                .stream
                .error_here(format!("expected expression, found '{kind}'"))),
        }
    }

    /// An identifier starts either a function call (`rate(...)`) or a vector
    /// selector (`up`, `up{job="api"}`).
    fn parse_identifier_expression(&mut self) -> ParseResult<Expr> {
        let token = self.stream.current();
        let TokenKind::Identifier(name) = &token.kind else {
            return Err(self.stream.error_here("expected identifier"));
        };
        let name = name.clone();
        let name_span = token.span.clone();
        self.stream.advance();

        if self.stream.check(&TokenKind::LParen) {
            return self.parse_call_arguments(name, name_span);
        }
        self.parse_vector_selector(Some(name), Some(name_span))
    }

    /// A metric identifier (contains `:`) is always a vector selector; colons
    /// are not valid in function names.
    fn parse_metric_identifier_selector(&mut self) -> ParseResult<Expr> {
        let token = self.stream.current();
        let TokenKind::MetricIdentifier(name) = &token.kind else {
            return Err(self.stream.error_here("expected metric identifier"));
        };
        let name = name.clone();
        let name_span = token.span.clone();
        self.stream.advance();
        self.parse_vector_selector(Some(name), Some(name_span))
    }

    fn parse_vector_selector(
        &mut self,
        name: Option<SmolStr>,
        name_span: Option<Span>,
    ) -> ParseResult<Expr> {
        let start = name_span
            .as_ref()
            .map(|s| s.start)
            .unwrap_or_else(|| self.stream.current().span.start);
        let mut end = name_span.as_ref().map(|s| s.end).unwrap_or(start);

        let mut matchers = Vec::new();
        if self.stream.check(&TokenKind::LBrace) {
            let (parsed, braces_span) = self.parse_label_matchers()?;
            matchers = parsed;
            end = braces_span.end;
        }

        if name.is_none() && matchers.is_empty() {
            return Err(Box::new(
                Diag::error("vector selector must contain at least one matcher")
                    .with_primary_label(start..end, "empty selector"),
            ));
        }

        Ok(Expr::Selector(VectorSelector {
            name,
            matchers,
            offset: None,
            span: start..end,
        }))
    }

    fn parse_label_matchers(&mut self) -> ParseResult<(Vec<LabelMatcher>, Span)> {
        let start = self.stream.expect(TokenKind::LBrace)?.start;
        let mut matchers = Vec::new();

        if !self.stream.check(&TokenKind::RBrace) {
            loop {
                matchers.push(self.parse_label_matcher()?);
                if !self.stream.consume(&TokenKind::Comma) {
                    break;
                }
                // Trailing comma before the closing brace.
                if self.stream.check(&TokenKind::RBrace) {
                    break;
                }
            }
        }

        let end = self.stream.expect(TokenKind::RBrace)?.end;
        Ok((matchers, start..end))
    }

    fn parse_label_matcher(&mut self) -> ParseResult<LabelMatcher> {
        let name_span = self.stream.current().span.clone();
        let Some(name) = self.current_label_name() else {
            return Err(self.stream.error_here(format!(
                "expected label name, found '{}'",
                self.stream.current().kind
            )));
        };
        self.stream.advance();

        let op = match &self.stream.current().kind {
            TokenKind::Assign => MatchOp::Equal,
            TokenKind::NotEq => MatchOp::NotEqual,
            TokenKind::EqRegex => MatchOp::Regex,
            TokenKind::NotEqRegex => MatchOp::NotRegex,
            kind => {
                return Err(self.stream.error_here(format!(
                    "expected label matching operator ('=', '!=', '=~' or '!~'), found '{kind}'"
                )));
            }
        };
        self.stream.advance();

        let token = self.stream.current();
        let TokenKind::StringLiteral(value) = &token.kind else {
            return Err(self.stream.error_here(format!(
                "expected string as matcher value, found '{}'",
                token.kind
            )));
        };
        let value = value.clone();
        let end = token.span.end;
        self.stream.advance();

        Ok(LabelMatcher {
            name,
            op,
            value,
            span: name_span.start..end,
        })
    }

    fn parse_aggregate_expression(&mut self) -> ParseResult<Expr> {
        let start = self.stream.current().span.start;
        let Some(op) = aggregate_op_of(&self.stream.current().kind) else {
            return Err(self.stream.error_here(format!(
                "expected aggregation operator, found '{}'",
                self.stream.current().kind
            )));
        };
        self.stream.advance();

        let mut grouping = self.parse_grouping_clause()?;

        self.stream.expect(TokenKind::LParen)?;

        let mut param = None;
        if op.takes_param() {
            let parsed = self.parse_expression()?;
            if !self.stream.consume(&TokenKind::Comma) {
                return Err(self.stream.error_here(format!(
                    "'{}' requires a parameter followed by ',' before its expression",
                    op.name()
                )));
            }
            param = Some(Box::new(parsed));
        }

        let body = self.parse_expression()?;
        let mut end = self.stream.expect(TokenKind::RParen)?.end;

        if let Some(postfix) = self.parse_grouping_clause()? {
            if let Some(existing) = &grouping {
                return Err(Box::new(
                    Diag::error("grouping clause given twice for one aggregation")
                        .with_primary_label(postfix.span.clone(), "second grouping here")
                        .with_secondary_label(existing.span.clone(), "first grouping here"),
                ));
            }
            end = postfix.span.end;
            grouping = Some(postfix);
        }

        Ok(Expr::Aggregate(AggregateExpr {
            op,
            grouping,
            param,
            expr: Box::new(body),
            span: start..end,
        }))
    }

    /// Parses an optional `by (...)` / `without (...)` clause.
    fn parse_grouping_clause(&mut self) -> ParseResult<Option<Grouping>> {
        let mode = match &self.stream.current().kind {
            TokenKind::By => GroupingMode::By,
            TokenKind::Without => GroupingMode::Without,
            _ => return Ok(None),
        };

        let start = self.stream.current().span.start;
        self.stream.advance();
        let (labels, labels_span) = self.parse_grouping_labels()?;

        Ok(Some(Grouping {
            mode,
            labels,
            span: start..labels_span.end,
        }))
    }

    /// Parses a parenthesized label list: `(job, instance)`, `()`, `(job,)`.
    fn parse_grouping_labels(&mut self) -> ParseResult<(Vec<SmolStr>, Span)> {
        let start = self.stream.expect(TokenKind::LParen)?.start;
        let mut labels = Vec::new();

        if !self.stream.check(&TokenKind::RParen) {
            loop {
                let Some(name) = self.current_label_name() else {
                    return Err(self.stream.error_here(format!(
                        "expected label name, found '{}'",
                        self.stream.current().kind
                    )));
                };
                self.stream.advance();
                labels.push(name);

                if !self.stream.consume(&TokenKind::Comma) {
                    break;
                }
                if self.stream.check(&TokenKind::RParen) {
                    break;
                }
            }
        }

        let end = self.stream.expect(TokenKind::RParen)?.end;
        Ok((labels, start..end))
    }

    /// Parses an optional `on (...)` / `ignoring (...)` clause with an
    /// optional `group_left` / `group_right` modifier after it.
    fn parse_vector_matching(&mut self) -> ParseResult<Option<VectorMatching>> {
        let on = match &self.stream.current().kind {
            TokenKind::On => true,
            TokenKind::Ignoring => false,
            _ => return Ok(None),
        };
        self.stream.advance();

        let (labels, _) = self.parse_grouping_labels()?;
        let mut matching = VectorMatching {
            on,
            labels,
            group: None,
        };

        let side = match &self.stream.current().kind {
            TokenKind::GroupLeft => Some(GroupSide::Left),
            TokenKind::GroupRight => Some(GroupSide::Right),
            _ => None,
        };
        if let Some(side) = side {
            self.stream.advance();
            // The label list is optional; a following `(` always binds to
            // the modifier, so `group_left (foo)` takes `foo` as a label.
            let labels = if self.stream.check(&TokenKind::LParen) {
                self.parse_grouping_labels()?.0
            } else {
                Vec::new()
            };
            matching.group = Some(GroupModifier { side, labels });
        }

        Ok(Some(matching))
    }

    fn parse_call_arguments(&mut self, name: SmolStr, name_span: Span) -> ParseResult<Expr> {
        self.stream.expect(TokenKind::LParen)?;
        let mut args = Vec::new();

        if !self.stream.check(&TokenKind::RParen) {
            loop {
                args.push(self.parse_expression()?);
                if !self.stream.consume(&TokenKind::Comma) {
                    break;
                }
            }
        }

        let end = self.stream.expect(TokenKind::RParen)?.end;
        Ok(Expr::Call(FunctionCall {
            name,
            args,
            span: name_span.start..end,
        }))
    }

    fn parse_paren_expression(&mut self) -> ParseResult<Expr> {
        let start = self.stream.expect(TokenKind::LParen)?.start;
        let inner = self.parse_expression()?;
        let end = self.stream.expect(TokenKind::RParen)?.end;

        Ok(Expr::Paren(ParenExpr {
            expr: Box::new(inner),
            span: start..end,
        }))
    }

    fn parse_number_literal(&mut self) -> ParseResult<Expr> {
        let token = self.stream.current();
        let TokenKind::NumberLiteral(raw) = &token.kind else {
            return Err(self.stream.error_here("expected number"));
        };
        let span = token.span.clone();
        let Some(value) = parse_number_text(raw) else {
            return Err(self
                .stream
                .error_here(format!("invalid number literal '{raw}'")));
        };
        self.stream.advance();

        Ok(Expr::Number(NumberLiteral { value, span }))
    }

    fn parse_string_literal(&mut self) -> ParseResult<Expr> {
        let token = self.stream.current();
        let TokenKind::StringLiteral(value) = &token.kind else {
            return Err(self.stream.error_here("expected string"));
        };
        let literal = StringLiteral {
            value: value.clone(),
            span: token.span.clone(),
        };
        self.stream.advance();

        Ok(Expr::String(literal))
    }

    /// Parses `[range]` into a range selection or `[range:step]` into a
    /// subquery over the expression parsed so far.
    fn parse_range_suffix(&mut self, expr: Expr) -> ParseResult<Expr> {
        let bracket_start = self.stream.expect(TokenKind::LBracket)?.start;
        let range = self.parse_duration()?;

        if self.stream.consume(&TokenKind::Colon) {
            let step = if self.stream.check(&TokenKind::RBracket) {
                None
            } else {
                Some(self.parse_duration()?)
            };
            let end = self.stream.expect(TokenKind::RBracket)?.end;
            let start = expr.span().start;
            return Ok(Expr::Subquery(SubqueryExpr {
                expr: Box::new(expr),
                range,
                step,
                offset: None,
                span: start..end,
            }));
        }

        let end = self.stream.expect(TokenKind::RBracket)?.end;
        if !matches!(expr, Expr::Selector(_)) {
            return Err(Box::new(
                Diag::error(format!(
                    "range selection is only valid over a vector selector, not {}",
                    expr.kind_name()
                ))
                .with_primary_label(bracket_start..end, "range applied here")
                .with_help("use a subquery such as '[1h:5m]' to select over an expression"),
            ));
        }

        let start = expr.span().start;
        Ok(Expr::Matrix(MatrixSelector {
            expr: Box::new(expr),
            range,
            span: start..end,
        }))
    }

    /// Parses `offset <duration>` and attaches it to the selector, range
    /// selection, or subquery it follows.
    fn parse_offset_suffix(&mut self, expr: Expr) -> ParseResult<Expr> {
        let offset_span = self.stream.expect(TokenKind::Offset)?;

        let minus_start = if self.stream.check(&TokenKind::Minus) {
            let start = self.stream.current().span.start;
            self.stream.advance();
            Some(start)
        } else {
            None
        };

        let mut duration = self.parse_duration()?;
        if let Some(start) = minus_start {
            duration = DurationLit {
                text: SmolStr::new(format!("-{}", duration.text)),
                span: start..duration.span.end,
            };
        }
        let end = duration.span.end;

        let offset_start = offset_span.start;
        let duplicate = move |first: &DurationLit| {
            Box::new(
                Diag::error("offset may not be set multiple times")
                    .with_primary_label(offset_start..end, "second offset here")
                    .with_secondary_label(first.span.clone(), "first offset here"),
            )
        };

        match expr {
            Expr::Selector(mut selector) => {
                if let Some(first) = &selector.offset {
                    return Err(duplicate(first));
                }
                selector.offset = Some(duration);
                selector.span = selector.span.start..end;
                Ok(Expr::Selector(selector))
            }
            Expr::Matrix(mut matrix) => {
                let Expr::Selector(selector) = matrix.expr.as_mut() else {
                    return Err(Box::new(
                        Diag::error("offset modifier does not apply here")
                            .with_primary_label(offset_span, "offset here"),
                    ));
                };
                if let Some(first) = &selector.offset {
                    return Err(duplicate(first));
                }
                selector.offset = Some(duration);
                matrix.span = matrix.span.start..end;
                Ok(Expr::Matrix(matrix))
            }
            Expr::Subquery(mut subquery) => {
                if let Some(first) = &subquery.offset {
                    return Err(duplicate(first));
                }
                subquery.offset = Some(duration);
                subquery.span = subquery.span.start..end;
                Ok(Expr::Subquery(subquery))
            }
            other => Err(Box::new(
                Diag::error(format!(
                    "offset modifier does not apply to {}; it must follow a selector, \
                     range selection, or subquery",
                    other.kind_name()
                ))
                .with_primary_label(offset_span, "offset here"),
            )),
        }
    }

    fn parse_duration(&mut self) -> ParseResult<DurationLit> {
        let token = self.stream.current();
        let TokenKind::DurationLiteral(text) = &token.kind else {
            return Err(self.stream.error_here(format!(
                "expected duration (such as '5m' or '1h30m'), found '{}'",
                token.kind
            )));
        };
        let literal = DurationLit {
            text: text.clone(),
            span: token.span.clone(),
        };
        self.stream.advance();

        Ok(literal)
    }

    /// Returns the current token's text if it can serve as a label name.
    ///
    /// Keywords are valid label names, so `by (and)` and `{offset="1"}` both
    /// parse; the written form is recovered from the source text.
    fn current_label_name(&self) -> Option<SmolStr> {
        let token = self.stream.current();
        match &token.kind {
            TokenKind::Identifier(name) => Some(name.clone()),
            kind if kind.is_keyword() => {
                // Tokens built by hand may carry spans outside the source;
                // fall back to the keyword's canonical spelling.
                let text = match self.source.get(token.span.clone()) {
                    Some(text) => SmolStr::new(text),
                    None => SmolStr::new(kind.to_string()),
                };
                Some(text)
            }
            _ => None,
        }
    }
}

fn aggregate_op_of(kind: &TokenKind) -> Option<AggregateOp> {
    let op = match kind {
        TokenKind::Sum => AggregateOp::Sum,
        TokenKind::Avg => AggregateOp::Avg,
        TokenKind::Count => AggregateOp::Count,
        TokenKind::Min => AggregateOp::Min,
        TokenKind::Max => AggregateOp::Max,
        TokenKind::Group => AggregateOp::Group,
        TokenKind::Stddev => AggregateOp::Stddev,
        TokenKind::Stdvar => AggregateOp::Stdvar,
        TokenKind::Topk => AggregateOp::Topk,
        TokenKind::Bottomk => AggregateOp::Bottomk,
        TokenKind::Quantile => AggregateOp::Quantile,
        TokenKind::CountValues => AggregateOp::CountValues,
        _ => return None,
    };
    Some(op)
}

/// Converts a number token's text to its value.
///
/// Handles `inf`/`nan` in any casing and `0x` hexadecimal integers, neither
/// of which `f64::from_str` accepts.
fn parse_number_text(text: &str) -> Option<f64> {
    if text.eq_ignore_ascii_case("inf") {
        return Some(f64::INFINITY);
    }
    if text.eq_ignore_ascii_case("nan") {
        return Some(f64::NAN);
    }
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).ok().map(|v| v as f64);
    }
    text.parse::<f64>().ok()
}

/// Parses a complete expression from a token stream.
///
/// Fails if tokens remain after the expression.
pub fn parse_expression(tokens: &[Token], source: &str) -> ParseResult<Expr> {
    let mut parser = ExpressionParser::new(tokens, source);
    let expr = parser.parse_expression()?;
    parser.expect_consumed()?;
    Ok(expr)
}
