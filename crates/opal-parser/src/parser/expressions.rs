//! Precedence-climbing expression parser.
//!
//! `binary_expr` parses a primary (or prefix) expression, applies
//! postfix `++`/`--` and `as Type` casts, then climbs left-associative
//! binary operators by precedence, wrapping completed nodes with
//! `open_before`. String literals dispatch through the interpolation
//! scanner to decide between Literal and InterpolatedString.

use opal_common::TokenKind;

use crate::event::NodeKind;
use crate::interp;

use super::{decorators, MarkClosed, Parser};

/// Binding strength of a binary operator; 0 means "not an operator".
fn precedence(kind: TokenKind) -> u8 {
    match kind {
        TokenKind::PipePipe => 1,
        TokenKind::AmpAmp => 2,
        TokenKind::EqEq | TokenKind::NotEq => 3,
        TokenKind::Lt | TokenKind::LtEq | TokenKind::Gt | TokenKind::GtEq => 4,
        TokenKind::Plus | TokenKind::Minus => 5,
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => 6,
        _ => 0,
    }
}

/// Parse an expression at the lowest precedence.
pub(crate) fn expr(p: &mut Parser) {
    let _ = binary_expr(p, 1);
}

/// Parse an expression whose operators bind at least as tightly as
/// `min_prec`. Right operands use `prec + 1`, giving left associativity.
pub(crate) fn binary_expr(p: &mut Parser, min_prec: u8) -> Option<MarkClosed> {
    let mut lhs = primary(p)?;

    // Postfix increment/decrement.
    if p.at(TokenKind::PlusPlus) || p.at(TokenKind::MinusMinus) {
        let m = p.open_before(lhs, NodeKind::PostfixExpr);
        p.bump();
        lhs = p.close(m);
    }

    // `as Type[?]` casts, possibly chained.
    while p.at(TokenKind::As) {
        let m = p.open_before(lhs, NodeKind::TypeCast);
        p.bump(); // as
        if p.at(TokenKind::Ident) {
            p.bump();
            if p.at(TokenKind::Question) {
                p.bump();
            }
        } else {
            p.error_expected(TokenKind::Ident, "type cast");
        }
        lhs = p.close(m);
    }

    loop {
        let prec = precedence(p.current());
        if prec == 0 || prec < min_prec {
            break;
        }
        let m = p.open_before(lhs, NodeKind::BinaryExpr);
        p.bump(); // operator
        let _ = binary_expr(p, prec + 1);
        lhs = p.close(m);
    }

    Some(lhs)
}

/// Parse an atom or prefix expression.
fn primary(p: &mut Parser) -> Option<MarkClosed> {
    match p.current() {
        // Unary negation / logical not.
        TokenKind::Bang | TokenKind::Minus => {
            let m = p.open(NodeKind::UnaryExpr);
            p.bump();
            let _ = primary(p);
            Some(p.close(m))
        }

        // Prefix increment/decrement.
        TokenKind::PlusPlus | TokenKind::MinusMinus => {
            let m = p.open(NodeKind::PrefixExpr);
            p.bump();
            let _ = primary(p);
            Some(p.close(m))
        }

        TokenKind::Integer
        | TokenKind::Float
        | TokenKind::Boolean
        | TokenKind::Duration
        | TokenKind::None => {
            let m = p.open(NodeKind::Literal);
            p.bump();
            Some(p.close(m))
        }

        TokenKind::String => Some(string_literal(p)),

        TokenKind::At => decorators::decorator_expr(p),

        TokenKind::Ident => {
            if p.nth(1) == TokenKind::Dot && p.nth(2) == TokenKind::Ident {
                let m = p.open(NodeKind::QualifiedRef);
                p.bump(); // first segment
                p.bump(); // .
                p.bump(); // second segment
                if p.at(TokenKind::Dot) && p.nth(1) == TokenKind::Ident {
                    p.error_with_details(
                        "qualified references have exactly two segments",
                        "expression",
                        "Use `Type.Member`",
                    );
                    while p.at(TokenKind::Dot) && p.nth(1) == TokenKind::Ident {
                        p.bump();
                        p.bump();
                    }
                }
                Some(p.close(m))
            } else {
                let m = p.open(NodeKind::Identifier);
                p.bump();
                Some(p.close(m))
            }
        }

        TokenKind::LBracket => Some(array_literal(p)),

        TokenKind::LBrace => Some(object_literal(p)),

        _ => {
            p.error_unexpected("expression");
            p.bump_raw();
            None
        }
    }
}

/// Parse `[ expr, … ]` with an optional trailing comma.
pub(crate) fn array_literal(p: &mut Parser) -> MarkClosed {
    let m = p.open(NodeKind::ArrayLiteral);
    p.bump(); // [
    p.skip_newlines();
    while !p.at(TokenKind::RBracket) && !p.at(TokenKind::Eof) {
        let before = p.checkpoint();
        let _ = binary_expr(p, 1);
        p.skip_newlines();
        if p.at(TokenKind::Comma) {
            p.bump();
            p.skip_newlines();
        } else if p.checkpoint() == before {
            break;
        } else if !p.at(TokenKind::RBracket) {
            break;
        }
    }
    p.expect(TokenKind::RBracket, "array literal");
    p.close(m)
}

/// Parse `{ name: expr, … }` with an optional trailing comma.
pub(crate) fn object_literal(p: &mut Parser) -> MarkClosed {
    let m = p.open(NodeKind::ObjectLiteral);
    p.bump(); // {
    p.skip_newlines();
    while !p.at(TokenKind::RBrace) && !p.at(TokenKind::Eof) {
        let f = p.open(NodeKind::ObjectField);
        if p.at(TokenKind::Ident) {
            p.bump();
        } else {
            p.error_expected(TokenKind::Ident, "object field");
            p.close(f);
            if !p.at(TokenKind::RBrace) && !p.at(TokenKind::Eof) {
                p.bump_raw();
                continue;
            }
            break;
        }
        p.expect(TokenKind::Colon, "object field");
        let _ = binary_expr(p, 1);
        p.close(f);
        p.skip_newlines();
        if p.at(TokenKind::Comma) {
            p.bump();
            p.skip_newlines();
        } else {
            break;
        }
    }
    p.expect(TokenKind::RBrace, "object literal");
    p.close(m)
}

/// Parse a string token, choosing Literal for plain strings and
/// InterpolatedString (with one StringPart per scanner part, decorator
/// parts wrapping a Decorator child) when the content references value
/// decorators.
pub(crate) fn string_literal(p: &mut Parser) -> MarkClosed {
    let text = p.current_text();
    let (quote, inner) = split_quotes(text);
    let parts = interp::scan_string_parts(inner, quote, p.registries.decorators);
    let has_decorator = parts.iter().any(|part| part.is_decorator);

    if !has_decorator {
        let m = p.open(NodeKind::Literal);
        p.bump();
        p.close(m)
    } else {
        let m = p.open(NodeKind::InterpolatedString);
        p.bump(); // the whole string token
        for part in &parts {
            let pm = p.open(NodeKind::StringPart);
            if part.is_decorator {
                let d = p.open(NodeKind::Decorator);
                p.close(d);
            }
            p.close(pm);
        }
        p.close(m)
    }
}

/// Split a raw string token into its quote character and inner content.
/// Unterminated strings (no closing quote) keep everything after the
/// opening quote.
pub(crate) fn split_quotes(text: &str) -> (char, &str) {
    let quote = text.chars().next().unwrap_or('"');
    let inner = &text[quote.len_utf8()..];
    let inner = match inner.strip_suffix(quote) {
        Some(stripped) => stripped,
        None => inner,
    };
    (quote, inner)
}
