//! Shell sub-parser: whitespace-sensitive argument grouping, operator
//! chaining, and redirection.
//!
//! A shell command is a run of arguments terminated by a shell operator
//! (`&& || | ; > >> <`) or a statement boundary (newline, `}`, end of
//! file, or `else`). An argument is a run of tokens with no whitespace
//! between them: `deployment.yaml` is one argument of three tokens,
//! `-f` one argument of two.

use opal_common::TokenKind;

use crate::event::NodeKind;

use super::{decorators, expressions, Parser};

/// A complete shell statement: the first command plus any chained
/// operators and redirects. Callers wrap this in one step.
pub(crate) fn shell_statement(p: &mut Parser) {
    p.trace_enter("shell_statement");
    shell_command(p);
    continue_chain(p);
    p.trace_exit("shell_statement");
}

/// Handle what follows a command (or a statement-position decorator):
/// redirects open Redirect nodes, chain operators start a further
/// command. `echo a > out && echo b` stays within one statement.
pub(crate) fn continue_chain(p: &mut Parser) {
    loop {
        if p.current().is_redirect_op() {
            let m = p.open(NodeKind::Redirect);
            p.bump(); // > >> <
            let t = p.open(NodeKind::RedirectTarget);
            if at_boundary(p) || p.current().is_shell_operator() {
                p.error_with_details(
                    "missing redirect target",
                    "redirect",
                    "Name the file or decorator to redirect to",
                );
            } else {
                shell_arg(p);
            }
            p.close(t);
            p.close(m);
            continue;
        }

        if p.current().is_shell_chain_op() {
            p.bump(); // && || | ;
            p.skip_newlines();
            if at_boundary(p) || p.current().is_shell_operator() {
                p.error_with_details(
                    "missing command after shell operator",
                    "shell command",
                    "Add the next command after the operator",
                );
                break;
            }
            shell_command(p);
            continue;
        }

        break;
    }
}

/// Statement boundaries that end a shell command. `else` lets `if`/`else`
/// and `when` arms steal the token.
fn at_boundary(p: &Parser) -> bool {
    matches!(
        p.current(),
        TokenKind::Newline | TokenKind::RBrace | TokenKind::Eof | TokenKind::Else
    )
}

/// Parse one ShellCommand node: arguments until an operator or boundary.
pub(crate) fn shell_command(p: &mut Parser) {
    let m = p.open(NodeKind::ShellCommand);
    while !p.current().is_shell_operator() && !at_boundary(p) {
        let before = p.checkpoint();
        shell_arg(p);
        if p.checkpoint() == before {
            // shell_arg must consume; never loop in place.
            p.bump_raw();
        }
    }
    p.close(m);
}

/// Parse one ShellArg node.
///
/// The first token is consumed unconditionally: strings go through the
/// interpolation path, `@` attempts a decorator (no block in shell
/// context; unregistered names stay literal text), anything else is a
/// plain token. Adjacent tokens (no whitespace before them) are then
/// absorbed into the same argument.
pub(crate) fn shell_arg(p: &mut Parser) {
    let m = p.open(NodeKind::ShellArg);

    match p.current() {
        TokenKind::String => {
            expressions::string_literal(p);
        }
        TokenKind::At => {
            // On rewind the `@` was consumed as literal text and the
            // adjacency loop below picks up the rest.
            let _ = decorators::decorator_shell_arg(p);
        }
        _ => p.bump(),
    }

    while !p.current().is_shell_operator()
        && !at_boundary(p)
        && !p.at(TokenKind::Eof)
        && !p.current_has_space()
    {
        if p.at(TokenKind::String) {
            expressions::string_literal(p);
        } else {
            p.bump();
        }
    }

    p.close(m);
}
