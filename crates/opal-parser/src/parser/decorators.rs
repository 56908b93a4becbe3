//! Decorator parser: `@ Name[.Name]* [(args)] [{ block }]`.
//!
//! Name resolution picks the longest dot-separated prefix registered in
//! either registry; the remaining `.ident` becomes primary-parameter
//! dot sugar when the descriptor declares a primary parameter.
//! Parameter binding is Kotlin-style: a forward scan reserves every
//! name supplied as `name=value`, and positional arguments fill the
//! remaining slots of the required-then-optional order. Literal
//! argument values are validated against the parameter schema.

use opal_common::{SchemaCode, TokenKind};
use opal_registry::{BlockRequirement, ParamSchema, ResolvedDecorator};
use rustc_hash::FxHashSet;

use crate::event::NodeKind;

use super::{schema, shell, MarkClosed, Parser};

/// Where the decorator appears; controls block handling and what an
/// unregistered name means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DecoratorContext {
    /// Statement position: blocks are parsed and block requirements
    /// enforced; chained shell operators may follow.
    Statement,
    /// Shell argument: no block; unregistered names rewind so `@` stays
    /// literal argument text.
    Shell,
    /// Expression position (conditions, collections, argument values):
    /// a following `{` belongs to the enclosing statement.
    Expression,
}

/// Statement-position decorator, plus any chained shell operators
/// (`@retry { … } && echo done`). One step covers the whole chain.
pub(crate) fn decorator_statement(p: &mut Parser) {
    if decorator(p, DecoratorContext::Statement).is_some()
        && (p.current().is_shell_operator())
    {
        shell::continue_chain(p);
    }
}

/// Expression-position decorator.
pub(crate) fn decorator_expr(p: &mut Parser) -> Option<MarkClosed> {
    decorator(p, DecoratorContext::Expression)
}

/// Shell-argument decorator. Returns `None` after consuming just the `@`
/// when the name is unregistered; the caller keeps consuming the run of
/// adjacent tokens as literal argument text.
pub(crate) fn decorator_shell_arg(p: &mut Parser) -> Option<MarkClosed> {
    decorator(p, DecoratorContext::Shell)
}

fn decorator(p: &mut Parser, ctx: DecoratorContext) -> Option<MarkClosed> {
    p.trace_enter("decorator");
    let deco_pos = p.current_position();

    if p.nth(1) != TokenKind::Ident {
        match ctx {
            DecoratorContext::Shell => {
                p.bump(); // literal @
            }
            _ => {
                p.error_with_details(
                    "expected decorator name after `@`",
                    "decorator",
                    "Decorators are written `@name`, like `@env.HOME`",
                );
                p.bump();
            }
        }
        p.trace_exit("decorator");
        return None;
    }

    // Scan the maximal dotted identifier sequence without consuming.
    let mut segments: Vec<String> = Vec::new();
    let mut k = 1;
    loop {
        segments.push(p.nth_text(k).to_string());
        if p.nth(k + 1) == TokenKind::Dot && p.nth(k + 2) == TokenKind::Ident {
            k += 2;
        } else {
            break;
        }
    }

    // Longest registered prefix, across both registries.
    let mut matched = 0;
    let mut name = String::new();
    for n in (1..=segments.len()).rev() {
        let candidate = segments[..n].join(".");
        if p.registries.is_registered(&candidate) {
            matched = n;
            name = candidate;
            break;
        }
    }

    if matched == 0 {
        if ctx == DecoratorContext::Shell {
            // Rewind to right after `@`: the argument is literal text.
            p.bump();
            p.trace_exit("decorator");
            return None;
        }
        name = segments.join(".");
        p.error_with_details(
            &format!("unknown decorator '@{name}'"),
            "decorator",
            "Check the decorator name against the registered set",
        );
        matched = segments.len();
    }

    let regs = p.registries;
    let resolved = regs.resolve(&name);
    p.decorator_count += 1;

    let m = p.open(NodeKind::Decorator);
    p.bump(); // @
    p.bump(); // first name segment
    for _ in 1..matched {
        p.bump(); // .
        p.bump(); // segment
    }

    let mut provided: FxHashSet<String> = FxHashSet::default();

    // Primary-parameter dot sugar: `@env.HOME` binds HOME to `property`.
    if let Some(d) = resolved {
        if let Some(primary) = d.primary_param {
            if p.at(TokenKind::Dot) && p.nth(1) == TokenKind::Ident {
                p.bump(); // .
                let value_pos = p.current_position();
                let value_text = p.current_text().to_string();
                p.bump(); // value identifier
                provided.insert(primary.to_string());
                if let Some(param) = d.param(primary) {
                    schema::validate_sugar_value(p, &name, param, &value_text, value_pos);
                }
            }
        }
    }

    if p.at(TokenKind::LParen) {
        decorator_args(p, &name, resolved, &mut provided);
    }

    if ctx == DecoratorContext::Statement {
        let block = resolved.map(|d| d.block);
        if p.at(TokenKind::LBrace) {
            if block == Some(BlockRequirement::Forbidden) {
                p.error_with_details(
                    &format!("@{name} cannot have a block"),
                    "decorator",
                    "Remove the `{ … }` block",
                );
            }
            p.block("decorator block");
        } else if block == Some(BlockRequirement::Required) {
            p.error_full(
                &format!("@{name} requires a block"),
                "decorator",
                "Add a `{ … }` block with the statements to wrap",
                &format!("@{name}(…) {{ echo hi }}"),
                "",
            );
        }
    }

    // Required parameters not supplied positionally, by name, or by sugar.
    if let Some(d) = resolved {
        for param in d.params.iter() {
            if param.required && !provided.contains(&param.name) {
                let example = param.example.clone().unwrap_or_else(|| "value".to_string());
                let suggestion = if d.primary_param == Some(param.name.as_str()) {
                    format!(
                        "Use dot syntax like @{name}.{example} or provide {}=\"{example}\"",
                        param.name
                    )
                } else {
                    format!("Provide {}=… in @{name}(…)", param.name)
                };
                p.error_schema(
                    deco_pos,
                    &format!("@{name}"),
                    SchemaCode::RequiredMissing,
                    &param.name,
                    format!("missing required parameter '{}'", param.name),
                    suggestion,
                    param.expected_type(),
                    "nothing".to_string(),
                );
            }
        }
    }

    let closed = p.close(m);
    p.trace_exit("decorator");
    Some(closed)
}

/// Parse `( arg, … )`, binding each argument to a schema parameter.
fn decorator_args<'a>(
    p: &mut Parser,
    name: &str,
    resolved: Option<ResolvedDecorator<'a>>,
    provided: &mut FxHashSet<String>,
) {
    let pl = p.open(NodeKind::ParamList);
    p.bump(); // (
    p.skip_newlines();

    let reservations = scan_named_reservations(p, resolved);
    let order: Vec<&ParamSchema> = resolved.map(|d| d.positional_order()).unwrap_or_default();
    let mut filled: FxHashSet<String> = FxHashSet::default();
    let mut positional_cursor = 0usize;

    while !p.at(TokenKind::RParen) && !p.at(TokenKind::Eof) {
        let before = p.checkpoint();

        if p.at(TokenKind::Ident) && p.nth(1) == TokenKind::Eq {
            named_argument(p, name, resolved, provided, &mut filled);
        } else {
            positional_argument(
                p,
                name,
                resolved,
                &order,
                &reservations,
                &mut positional_cursor,
                provided,
                &mut filled,
            );
        }

        p.skip_newlines();
        if p.eat(TokenKind::Comma) {
            p.skip_newlines();
        } else if p.checkpoint() == before {
            p.bump_raw();
        } else {
            break;
        }
    }

    if !p.expect(TokenKind::RParen, "decorator arguments") {
        // Unclosed argument list: synchronize, but leave a `{` for the
        // block and a newline for the next statement.
        if !p.at(TokenKind::LBrace) && !p.at(TokenKind::Newline) {
            p.recover();
        }
    }
    p.close(pl);
}

/// One `name = value` argument. Diagnostics fire while the cursor still
/// sits on the parameter name so they point at it.
fn named_argument<'a>(
    p: &mut Parser,
    deco: &str,
    resolved: Option<ResolvedDecorator<'a>>,
    provided: &mut FxHashSet<String>,
    filled: &mut FxHashSet<String>,
) {
    let pm = p.open(NodeKind::Param);
    let given = p.current_text().to_string();
    let context = format!("@{deco}");

    let mut schema_param: Option<&'a ParamSchema> = None;
    if let Some(d) = resolved {
        let (canonical, remapped) = d.canonical_param_name(&given);
        if remapped {
            p.warning_with_details(
                &format!("parameter '{given}' is deprecated, use '{canonical}'"),
                &context,
                &format!("Rename '{given}' to '{canonical}'"),
            );
        }
        schema_param = d.param(&canonical);
        if schema_param.is_none() {
            let valid: Vec<&str> = d.params.iter().map(|pr| pr.name.as_str()).collect();
            p.error_with_details(
                &format!("unknown parameter '{given}' for @{deco}"),
                &context,
                &format!("Valid parameters: {}", valid.join(", ")),
            );
        } else if filled.contains(&canonical) {
            p.error_with_details(
                &format!("duplicate parameter '{canonical}'"),
                &context,
                "Each parameter may be supplied once",
            );
        } else {
            filled.insert(canonical.clone());
            provided.insert(canonical);
        }
    }

    p.bump(); // name
    p.bump(); // =
    schema::argument_value(p, deco, schema_param);
    p.close(pm);
}

/// One positional argument: bind to the first unfilled, unreserved slot
/// of the required-then-optional order.
#[allow(clippy::too_many_arguments)]
fn positional_argument<'a>(
    p: &mut Parser,
    deco: &str,
    resolved: Option<ResolvedDecorator<'a>>,
    order: &[&'a ParamSchema],
    reservations: &FxHashSet<String>,
    cursor: &mut usize,
    provided: &mut FxHashSet<String>,
    filled: &mut FxHashSet<String>,
) {
    let pm = p.open(NodeKind::Param);

    let mut target: Option<&ParamSchema> = None;
    while *cursor < order.len() {
        let candidate = order[*cursor];
        *cursor += 1;
        if filled.contains(&candidate.name) || reservations.contains(&candidate.name) {
            continue;
        }
        target = Some(candidate);
        break;
    }

    match target {
        Some(param) => {
            filled.insert(param.name.clone());
            provided.insert(param.name.clone());
        }
        None => {
            if resolved.is_some() {
                let count = resolved.map(|d| d.params.len()).unwrap_or(0);
                p.error_with_details(
                    "too many positional arguments",
                    &format!("@{deco}"),
                    &format!("@{deco} takes at most {count} parameters"),
                );
            }
        }
    }

    schema::argument_value(p, deco, target);
    p.close(pm);
}

/// Forward scan of the argument tokens: every bare `ident =` at paren
/// depth zero reserves that (deprecation-remapped) name from positional
/// filling, so `@retry(delay=2s, 3)` binds 3 to `times`.
fn scan_named_reservations(
    p: &Parser,
    resolved: Option<ResolvedDecorator<'_>>,
) -> FxHashSet<String> {
    let mut set = FxHashSet::default();
    let mut depth: u32 = 0;
    let mut k = 0;
    loop {
        match p.nth(k) {
            TokenKind::Eof => break,
            TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
            TokenKind::RParen => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            TokenKind::RBracket | TokenKind::RBrace => depth = depth.saturating_sub(1),
            TokenKind::Ident if depth == 0 && p.nth(k + 1) == TokenKind::Eq => {
                let raw = p.nth_text(k);
                let name = match resolved {
                    Some(d) => d.canonical_param_name(raw).0,
                    None => raw.to_string(),
                };
                set.insert(name);
            }
            _ => {}
        }
        k += 1;
    }
    set
}
