//! Control-flow statement parsers: if/else chains, for loops with
//! plan-time ranges, try/catch/finally, and when pattern matches.
//!
//! Control-flow statements do not get step boundaries of their own;
//! statements inside their blocks do.

use opal_common::TokenKind;

use crate::event::NodeKind;

use super::{decorators, expressions, items, patterns, Parser};

// ── If ───────────────────────────────────────────────────────────────────

/// Parse `if cond { … } [else (if … | { … })]`.
pub(crate) fn if_stmt(p: &mut Parser) {
    p.trace_enter("if_stmt");
    let m = p.open(NodeKind::If);
    p.bump(); // if

    if p.at(TokenKind::LBrace) || p.at(TokenKind::Newline) || p.at(TokenKind::Eof) {
        p.error_with_details(
            "missing condition after `if`",
            "if condition",
            "Add a condition between `if` and the block",
        );
    } else {
        expressions::expr(p);
    }

    if p.at(TokenKind::LBrace) {
        p.block("if body");
    } else {
        p.error_full(
            "missing block after `if` condition",
            "if body",
            "Wrap the branch in `{ … }`",
            "if @env.DEBUG == \"1\" { echo debugging }",
            "",
        );
    }

    // `else` may sit on the next line after the closing brace.
    let cp = p.checkpoint();
    p.skip_newlines();
    if p.at(TokenKind::Else) {
        let e = p.open(NodeKind::Else);
        p.bump(); // else
        if p.at(TokenKind::If) {
            if_stmt(p); // chained else-if
        } else if p.at(TokenKind::LBrace) {
            p.block("else body");
        } else {
            p.error_with_details(
                "missing block after `else`",
                "else body",
                "Wrap the branch in `{ … }` or chain with `else if`",
            );
        }
        p.close(e);
    } else {
        p.rewind(cp);
    }

    p.close(m);
    p.trace_exit("if_stmt");
}

// ── For ──────────────────────────────────────────────────────────────────

/// Parse `for name in collection { … }`.
///
/// The collection is a plan-time range (`1...5`, `@var.lo...@var.hi`),
/// an identifier, a decorator, or an array literal.
pub(crate) fn for_stmt(p: &mut Parser) {
    p.trace_enter("for_stmt");
    let m = p.open(NodeKind::For);
    p.bump(); // for

    if p.at(TokenKind::Ident) {
        p.bump();
    } else {
        p.error_full(
            "missing loop variable after `for`",
            "loop variable",
            "Name the loop variable right after `for`",
            "for host in hosts { echo @var.host }",
            "for loops unroll at plan-time",
        );
    }

    p.expect(TokenKind::In, "for loop");

    if at_range_collection(p) {
        range(p);
    } else {
        match p.current() {
            TokenKind::Ident => {
                let id = p.open(NodeKind::Identifier);
                p.bump();
                p.close(id);
            }
            TokenKind::At => {
                let _ = decorators::decorator_expr(p);
            }
            TokenKind::LBracket => {
                expressions::array_literal(p);
            }
            _ => {
                p.error_full(
                    "missing collection after `in`",
                    "for loop",
                    "Loop over a range, variable, decorator, or array",
                    "for i in 1...5 { echo @var.i }",
                    "for loops unroll at plan-time",
                );
            }
        }
    }

    if p.at(TokenKind::LBrace) {
        p.block("loop body");
    } else {
        p.error_full(
            "missing block after `for` header",
            "loop body",
            "Wrap the loop body in `{ … }`",
            "for i in 1...3 { echo @var.i }",
            "",
        );
    }

    p.close(m);
    p.trace_exit("for_stmt");
}

/// Range detection: `INTEGER ...` or a decorator reference followed by `...`.
fn at_range_collection(p: &Parser) -> bool {
    if p.at(TokenKind::Integer) && p.nth(1) == TokenKind::Ellipsis {
        return true;
    }
    if p.at(TokenKind::At) && p.nth(1) == TokenKind::Ident {
        let mut k = 2;
        while p.nth(k) == TokenKind::Dot && p.nth(k + 1) == TokenKind::Ident {
            k += 2;
        }
        return p.nth(k) == TokenKind::Ellipsis;
    }
    false
}

/// Parse `start ... end` where each bound is an integer or a decorator.
fn range(p: &mut Parser) {
    let m = p.open(NodeKind::Range);
    range_bound(p);
    if p.at(TokenKind::Ellipsis) {
        p.bump();
    } else {
        p.error_expected(TokenKind::Ellipsis, "range");
    }
    range_bound(p);
    p.close(m);
}

fn range_bound(p: &mut Parser) {
    match p.current() {
        TokenKind::Integer => {
            let lit = p.open(NodeKind::Literal);
            p.bump();
            p.close(lit);
        }
        TokenKind::At => {
            let _ = decorators::decorator_expr(p);
        }
        _ => {
            p.error_with_details(
                "range bounds must be integers or decorators",
                "range",
                "Use literal integers or decorator values, like `1...@var.count`",
            );
        }
    }
}

// ── Try / Catch / Finally ────────────────────────────────────────────────

/// Parse `try { … } [catch { … }] [finally { … }]`.
pub(crate) fn try_stmt(p: &mut Parser) {
    p.trace_enter("try_stmt");
    let m = p.open(NodeKind::Try);
    p.bump(); // try

    if p.at(TokenKind::LBrace) {
        p.block("try body");
    } else {
        p.error_with_details(
            "missing block after `try`",
            "try body",
            "Wrap the guarded statements in `{ … }`",
        );
    }

    let cp = p.checkpoint();
    p.skip_newlines();
    if p.at(TokenKind::Catch) {
        let c = p.open(NodeKind::Catch);
        p.bump();
        if p.at(TokenKind::LBrace) {
            p.block("catch body");
        } else {
            p.error_with_details(
                "missing block after `catch`",
                "catch body",
                "Wrap the handler in `{ … }`",
            );
        }
        p.close(c);
    } else {
        p.rewind(cp);
    }

    let cp = p.checkpoint();
    p.skip_newlines();
    if p.at(TokenKind::Finally) {
        let f = p.open(NodeKind::Finally);
        p.bump();
        if p.at(TokenKind::LBrace) {
            p.block("finally body");
        } else {
            p.error_with_details(
                "missing block after `finally`",
                "finally body",
                "Wrap the cleanup in `{ … }`",
            );
        }
        p.close(f);
    } else {
        p.rewind(cp);
    }

    p.close(m);
    p.trace_exit("try_stmt");
}

// ── When ─────────────────────────────────────────────────────────────────

/// Parse `when expr { arm+ }` where each arm is `pattern -> (body)`.
pub(crate) fn when_stmt(p: &mut Parser) {
    p.trace_enter("when_stmt");
    let m = p.open(NodeKind::When);
    p.bump(); // when

    if p.at(TokenKind::LBrace) {
        p.error_with_details(
            "missing match expression after `when`",
            "when expression",
            "Add the value to match on, like `when @env.STAGE { … }`",
        );
    } else {
        expressions::expr(p);
    }

    if !p.expect(TokenKind::LBrace, "when body") {
        p.close(m);
        p.trace_exit("when_stmt");
        return;
    }

    loop {
        p.skip_newlines();
        if p.at(TokenKind::RBrace) || p.at(TokenKind::Eof) {
            break;
        }
        let before = p.checkpoint();
        when_arm(p);
        if p.checkpoint() == before {
            p.bump_raw();
        }
    }

    p.expect(TokenKind::RBrace, "when body");
    p.close(m);
    p.trace_exit("when_stmt");
}

/// One `pattern -> body` arm. The body is a block, a statement-shaped
/// call/shell/decorator, or an expression.
fn when_arm(p: &mut Parser) {
    let a = p.open(NodeKind::WhenArm);
    patterns::pattern_or(p);
    p.expect(TokenKind::Arrow, "when arm");
    match p.current() {
        TokenKind::LBrace => p.block("when arm"),
        TokenKind::Ident => items::identifier_statement(p),
        TokenKind::At => decorators::decorator_statement(p),
        TokenKind::Newline | TokenKind::RBrace | TokenKind::Eof => {
            p.error_with_details(
                "missing body after `->`",
                "when arm",
                "Give the arm an expression, statement, or `{ … }` block",
            );
        }
        _ => {
            expressions::expr(p);
        }
    }
    p.close(a);
}
