//! Post-parse semantic validation of pipe and redirect operators.
//!
//! A single walk over the token vector (not the events) finds every
//! `|`, `>`, `>>`, and `<` whose neighbors are decorators, and checks
//! the registered I/O capabilities: the left side of a pipe must
//! produce stdout, the right side must accept stdin, and redirect
//! targets must support the requested file mode. Plain shell words and
//! unregistered decorators are skipped; the parser has already
//! reported unknown names.

use opal_common::{Diagnostic, Position, Token, TokenKind};
use opal_registry::{Registries, RedirectMode, ResolvedDecorator};

/// Validate pipes and redirects against the registries. Diagnostics are
/// returned in token order for appending after the parse diagnostics.
pub fn validate_semantics(
    source: &str,
    tokens: &[Token],
    registries: &Registries<'_>,
) -> Vec<Diagnostic> {
    let mut diags = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::Pipe => {
                validate_pipe(source, tokens, registries, i, token, &mut diags);
            }
            TokenKind::Gt | TokenKind::Append | TokenKind::Lt => {
                validate_redirect(source, tokens, registries, i, token, &mut diags);
            }
            _ => {}
        }
    }

    diags
}

fn position_of(token: &Token) -> Position {
    Position::new(token.span.start, token.span.len(), token.line, token.col)
}

fn validate_pipe(
    source: &str,
    tokens: &[Token],
    registries: &Registries<'_>,
    i: usize,
    pipe: &Token,
    diags: &mut Vec<Diagnostic>,
) {
    // Left side: the decorator whose output feeds the pipe.
    if let Some(name) = left_decorator_name(source, tokens, i) {
        if let Some(resolved) = resolve_longest(registries, &name) {
            let supports = resolved.io.map(|io| io.stdout).unwrap_or(false);
            if !supports {
                diags.push(
                    Diagnostic::error(
                        format!("@{} does not support piped output (stdout)", resolved.name),
                        "pipe",
                        position_of(pipe),
                    )
                    .with_suggestion(format!(
                        "@{} cannot sit on the left side of `|`",
                        resolved.name
                    )),
                );
            }
        }
    }

    // Right side: the decorator consuming the piped input.
    if let Some(name) = right_decorator_name(source, tokens, i) {
        if let Some(resolved) = resolve_longest(registries, &name) {
            let supports = resolved.io.map(|io| io.stdin).unwrap_or(false);
            if !supports {
                diags.push(
                    Diagnostic::error(
                        format!("@{} does not support piped input (stdin)", resolved.name),
                        "pipe",
                        position_of(pipe),
                    )
                    .with_suggestion(format!(
                        "@{} cannot sit on the right side of `|`",
                        resolved.name
                    )),
                );
            }
        }
    }
}

fn validate_redirect(
    source: &str,
    tokens: &[Token],
    registries: &Registries<'_>,
    i: usize,
    op: &Token,
    diags: &mut Vec<Diagnostic>,
) {
    let Some(name) = right_decorator_name(source, tokens, i) else {
        return; // plain file targets are always allowed
    };
    let Some(resolved) = resolve_longest(registries, &name) else {
        return;
    };

    let (mode, verb) = match op.kind {
        TokenKind::Gt => (RedirectMode::Overwrite, "overwrite (>)"),
        TokenKind::Append => (RedirectMode::Append, "append (>>)"),
        TokenKind::Lt => (RedirectMode::Input, "input redirection (<)"),
        _ => unreachable!(),
    };

    // The runtime file-I/O interface wins; the older schema-level
    // redirect capability is the fallback.
    let supported = if let Some(file_io) = resolved.file_io {
        match mode {
            RedirectMode::Overwrite => file_io.write,
            RedirectMode::Append => file_io.append,
            RedirectMode::Input => file_io.read,
        }
    } else if let Some(redirect) = resolved.redirect {
        redirect.supports(mode)
    } else {
        false
    };

    if !supported {
        diags.push(
            Diagnostic::error(
                format!("@{} does not support {verb}", resolved.name),
                "redirect",
                position_of(op),
            )
            .with_suggestion(format!(
                "Pick a redirect mode @{} supports, or use a different target",
                resolved.name
            )),
        );
    }
}

// ── Neighbor scanning ────────────────────────────────────────────────────

fn is_trivia(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::Newline | TokenKind::Comment)
}

fn prev_significant(tokens: &[Token], mut i: usize) -> Option<usize> {
    loop {
        if i == 0 {
            return None;
        }
        i -= 1;
        if !is_trivia(tokens[i].kind) {
            return Some(i);
        }
    }
}

fn next_significant(tokens: &[Token], mut i: usize) -> Option<usize> {
    loop {
        i += 1;
        if i >= tokens.len() {
            return None;
        }
        if !is_trivia(tokens[i].kind) {
            return Some(i);
        }
    }
}

/// Find the dotted decorator name ending at `end` (an identifier token),
/// scanning backward through `.ident` pairs to the leading `@`.
fn name_ending_at(source: &str, tokens: &[Token], end: usize) -> Option<String> {
    if tokens[end].kind != TokenKind::Ident {
        return None;
    }
    let mut segments = vec![tokens[end].text(source)];
    let mut i = end;
    loop {
        let prev = prev_significant(tokens, i)?;
        match tokens[prev].kind {
            TokenKind::Dot => {
                let before = prev_significant(tokens, prev)?;
                if tokens[before].kind == TokenKind::Ident {
                    segments.push(tokens[before].text(source));
                    i = before;
                } else {
                    return None;
                }
            }
            TokenKind::At => {
                segments.reverse();
                return Some(segments.join("."));
            }
            _ => return None,
        }
    }
}

/// The decorator to the left of a pipe. When the previous token is `}`,
/// walk back over the balanced block (and a balanced `(…)` argument
/// list before it) to the owning decorator's name.
fn left_decorator_name(source: &str, tokens: &[Token], pipe: usize) -> Option<String> {
    let mut j = prev_significant(tokens, pipe)?;

    if tokens[j].kind == TokenKind::RBrace {
        j = match_backward(tokens, j, TokenKind::LBrace, TokenKind::RBrace)?;
        j = prev_significant(tokens, j)?;
    }
    if tokens[j].kind == TokenKind::RParen {
        j = match_backward(tokens, j, TokenKind::LParen, TokenKind::RParen)?;
        j = prev_significant(tokens, j)?;
    }

    name_ending_at(source, tokens, j)
}

/// Walk backward from a closing delimiter to its matching opener.
fn match_backward(
    tokens: &[Token],
    close: usize,
    open_kind: TokenKind,
    close_kind: TokenKind,
) -> Option<usize> {
    let mut depth = 1u32;
    let mut i = close;
    while i > 0 {
        i -= 1;
        if tokens[i].kind == close_kind {
            depth += 1;
        } else if tokens[i].kind == open_kind {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// The decorator immediately to the right of an operator.
fn right_decorator_name(source: &str, tokens: &[Token], op: usize) -> Option<String> {
    let at = next_significant(tokens, op)?;
    if tokens[at].kind != TokenKind::At {
        return None;
    }
    let first = next_significant(tokens, at)?;
    if tokens[first].kind != TokenKind::Ident {
        return None;
    }
    let mut segments = vec![tokens[first].text(source)];
    let mut i = first;
    while let Some(dot) = next_significant(tokens, i) {
        if tokens[dot].kind != TokenKind::Dot {
            break;
        }
        let Some(seg) = next_significant(tokens, dot) else {
            break;
        };
        if tokens[seg].kind != TokenKind::Ident {
            break;
        }
        segments.push(tokens[seg].text(source));
        i = seg;
    }
    Some(segments.join("."))
}

/// Resolve the longest registered prefix of a dotted name.
fn resolve_longest<'a>(
    registries: &Registries<'a>,
    dotted: &str,
) -> Option<ResolvedDecorator<'a>> {
    let segments: Vec<&str> = dotted.split('.').collect();
    for n in (1..=segments.len()).rev() {
        let candidate = segments[..n].join(".");
        if let Some(resolved) = registries.resolve(&candidate) {
            return Some(resolved);
        }
    }
    None
}
