//! Pattern parser for `when` arms.
//!
//! Primary patterns: `else`, string literals, regexes (`r"…"`), numeric
//! ranges (`200 ... 299`), plain literals, and qualified `Type.Member`
//! references. `|` folds alternatives left into PatternOr.

use opal_common::TokenKind;

use crate::event::NodeKind;

use super::{MarkClosed, Parser};

/// Parse a pattern, folding `|` alternatives into PatternOr.
pub(crate) fn pattern_or(p: &mut Parser) {
    let Some(mut lhs) = pattern_primary(p) else {
        return;
    };
    while p.at(TokenKind::Pipe) {
        let m = p.open_before(lhs, NodeKind::PatternOr);
        p.bump(); // |
        let _ = pattern_primary(p);
        lhs = p.close(m);
    }
}

/// Parse a single primary pattern.
fn pattern_primary(p: &mut Parser) -> Option<MarkClosed> {
    match p.current() {
        TokenKind::Else => {
            let m = p.open(NodeKind::PatternElse);
            p.bump();
            Some(p.close(m))
        }

        TokenKind::String => {
            let m = p.open(NodeKind::PatternLiteral);
            p.bump();
            Some(p.close(m))
        }

        // Regex pattern: the identifier `r` immediately followed by a string.
        TokenKind::Ident
            if p.current_text() == "r"
                && p.nth(1) == TokenKind::String
                && !p.nth_token(1).has_space_before =>
        {
            let m = p.open(NodeKind::PatternRegex);
            p.bump(); // r
            p.bump(); // "…"
            Some(p.close(m))
        }

        // Numeric range pattern: `200 ... 299`.
        TokenKind::Integer if p.nth(1) == TokenKind::Ellipsis => {
            let m = p.open(NodeKind::PatternRange);
            p.bump(); // start
            p.bump(); // ...
            if p.at(TokenKind::Integer) {
                p.bump();
            } else {
                p.error_with_details(
                    "range pattern needs an integer end",
                    "when pattern",
                    "Close the range, like `200 ... 299`",
                );
            }
            Some(p.close(m))
        }

        TokenKind::Integer | TokenKind::Float | TokenKind::Boolean | TokenKind::Duration => {
            let m = p.open(NodeKind::PatternLiteral);
            p.bump();
            Some(p.close(m))
        }

        // Qualified reference: `Type.Member`.
        TokenKind::Ident if p.nth(1) == TokenKind::Dot && p.nth(2) == TokenKind::Ident => {
            let m = p.open(NodeKind::QualifiedRef);
            p.bump(); // Type
            p.bump(); // .
            p.bump(); // Member
            if p.at(TokenKind::Dot) && p.nth(1) == TokenKind::Ident {
                p.error_with_details(
                    "qualified references have exactly two segments",
                    "when pattern",
                    "Use `Type.Member`",
                );
                while p.at(TokenKind::Dot) && p.nth(1) == TokenKind::Ident {
                    p.bump();
                    p.bump();
                }
            }
            Some(p.close(m))
        }

        TokenKind::Arrow => {
            p.error_with_details(
                "missing pattern before `->`",
                "when pattern",
                "Every arm starts with a pattern, like `\"prod\" ->`",
            );
            None
        }

        _ => {
            p.error_unexpected("when pattern");
            p.bump_raw();
            None
        }
    }
}
