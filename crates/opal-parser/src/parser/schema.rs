//! Schema-driven validation of decorator argument values.
//!
//! Scalar literals are checked directly against the parameter schema
//! (type, range, length, pattern, format, enum membership). Object and
//! array literals are parsed through the expression grammar first, then
//! reconstructed from the just-emitted events and validated one level
//! deep. Any identifier or decorator inside a value defers validation
//! to runtime.

use opal_common::{Position, SchemaCode, TokenKind};
use opal_registry::{ParamSchema, ParamType};
use regex::Regex;

use crate::event::NodeKind;
use crate::interp;

use super::{decorators, expressions, Parser, WorkEvent};

/// A literal value reconstructed from the event stream.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LiteralValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Duration(String),
    Array(Vec<LiteralValue>),
    Object(Vec<(String, LiteralValue)>),
}

impl LiteralValue {
    fn word(&self) -> &'static str {
        match self {
            LiteralValue::Str(_) => "string",
            LiteralValue::Int(_) => "integer",
            LiteralValue::Float(_) => "float",
            LiteralValue::Bool(_) => "boolean",
            LiteralValue::Duration(_) => "duration",
            LiteralValue::Array(_) => "array",
            LiteralValue::Object(_) => "object",
        }
    }

    fn render(&self) -> String {
        match self {
            LiteralValue::Str(s) => format!("\"{s}\""),
            LiteralValue::Int(n) => n.to_string(),
            LiteralValue::Float(n) => n.to_string(),
            LiteralValue::Bool(b) => b.to_string(),
            LiteralValue::Duration(d) => d.clone(),
            LiteralValue::Array(_) => "array".to_string(),
            LiteralValue::Object(_) => "object".to_string(),
        }
    }
}

/// Parse one decorator argument value and validate it against the bound
/// parameter's schema (when there is one).
pub(crate) fn argument_value(p: &mut Parser, deco: &str, param: Option<&ParamSchema>) {
    match p.current() {
        TokenKind::LBrace | TokenKind::LBracket => {
            let pos = p.current_position();
            let checkpoint = p.events_len();
            if p.at(TokenKind::LBrace) {
                expressions::object_literal(p);
            } else {
                expressions::array_literal(p);
            }
            if let Some(param) = param {
                // Identifiers or decorators inside the literal defer
                // validation to runtime.
                if let Some(value) = reconstruct(p, checkpoint) {
                    validate_composite(p, deco, param, &value, pos);
                }
            }
        }

        TokenKind::String => {
            let pos = p.current_position();
            let raw = p.current_text().to_string();
            expressions::string_literal(p);
            if let Some(param) = param {
                let (quote, inner) = expressions::split_quotes(&raw);
                let parts = interp::scan_string_parts(inner, quote, p.registries.decorators);
                if parts.iter().any(|part| part.is_decorator) {
                    return; // interpolated value, dynamic
                }
                validate_scalar(p, deco, param, TokenKind::String, inner, pos);
            }
        }

        TokenKind::Integer | TokenKind::Float | TokenKind::Boolean | TokenKind::Duration => {
            let pos = p.current_position();
            let kind = p.current();
            let text = p.current_text().to_string();
            let lit = p.open(NodeKind::Literal);
            p.bump();
            p.close(lit);
            if let Some(param) = param {
                validate_scalar(p, deco, param, kind, &text, pos);
            }
        }

        TokenKind::Ident => {
            // Variable reference: accepted as-is, its type is a runtime
            // concern.
            let id = p.open(NodeKind::Identifier);
            p.bump();
            p.close(id);
        }

        TokenKind::At => {
            let _ = decorators::decorator_expr(p);
        }

        _ => {
            p.error_with_details(
                &format!("unexpected parameter value in @{deco}"),
                "decorator arguments",
                "Parameter values are literals, identifiers, objects, or arrays",
            );
            if !p.at(TokenKind::RParen) && !p.at(TokenKind::Comma) && !p.at(TokenKind::Eof) {
                p.bump_raw();
            }
        }
    }
}

/// Validate a primary-parameter dot-sugar value (`@env.HOME`). The
/// identifier text is the supplied string value.
pub(crate) fn validate_sugar_value(
    p: &mut Parser,
    deco: &str,
    param: &ParamSchema,
    text: &str,
    pos: Position,
) {
    match param.ty {
        ParamType::String => string_constraints(p, deco, param, text, pos),
        ParamType::Enum => enum_check(p, deco, param, text, pos),
        _ => {
            type_mismatch(p, deco, param, "identifier", pos);
        }
    }
}

// ── Scalar validation ────────────────────────────────────────────────────

fn validate_scalar(
    p: &mut Parser,
    deco: &str,
    param: &ParamSchema,
    got: TokenKind,
    text: &str,
    pos: Position,
) {
    match (&param.ty, got) {
        (ParamType::String, TokenKind::String) => string_constraints(p, deco, param, text, pos),
        (ParamType::Enum, TokenKind::String) => enum_check(p, deco, param, text, pos),
        (ParamType::Int, TokenKind::Integer) => numeric_constraints(p, deco, param, text, pos),
        (ParamType::Int, TokenKind::Float) => {
            let message = format!("parameter '{}' expects integer, got float", param.name);
            p.error_schema(
                pos,
                &format!("@{deco}"),
                SchemaCode::IntRequired,
                &param.name,
                message,
                "Drop the fractional part".to_string(),
                param.expected_type(),
                "float".to_string(),
            );
        }
        (ParamType::Float, TokenKind::Integer | TokenKind::Float) => {
            numeric_constraints(p, deco, param, text, pos)
        }
        (ParamType::Bool, TokenKind::Boolean) => {}
        (ParamType::Duration, TokenKind::Duration) => {}
        (_, got) => {
            type_mismatch(p, deco, param, got.describe(), pos);
        }
    }
}

fn type_mismatch(p: &mut Parser, deco: &str, param: &ParamSchema, got_word: &str, pos: Position) {
    let message = format!(
        "parameter '{}' expects {}, got {}",
        param.name,
        param.ty.word(),
        got_word
    );
    let suggestion = match &param.example {
        Some(example) => format!("e.g. {}={example}", param.name),
        None => format!("Provide a {} value", param.ty.word()),
    };
    p.error_schema(
        pos,
        &format!("@{deco}"),
        SchemaCode::TypeMismatch,
        &param.name,
        message,
        suggestion,
        param.expected_type(),
        got_word.to_string(),
    );
}

fn numeric_constraints(
    p: &mut Parser,
    deco: &str,
    param: &ParamSchema,
    text: &str,
    pos: Position,
) {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    let Ok(value) = cleaned.parse::<f64>() else {
        return;
    };
    let below = param.min.is_some_and(|min| value < min);
    let above = param.max.is_some_and(|max| value > max);
    if below || above {
        let expected = match (param.min, param.max) {
            (Some(min), Some(max)) => format!("{} between {min} and {max}", param.ty.word()),
            (Some(min), None) => format!("{} >= {min}", param.ty.word()),
            (None, Some(max)) => format!("{} <= {max}", param.ty.word()),
            (None, None) => unreachable!(),
        };
        let message = format!("parameter '{}' must be {expected}, got {text}", param.name);
        p.error_schema(
            pos,
            &format!("@{deco}"),
            SchemaCode::RangeViolation,
            &param.name,
            message,
            format!("Use a value in range for '{}'", param.name),
            expected,
            text.to_string(),
        );
    }
}

fn string_constraints(p: &mut Parser, deco: &str, param: &ParamSchema, text: &str, pos: Position) {
    let len = text.chars().count();
    let too_short = param.min_length.is_some_and(|min| len < min);
    let too_long = param.max_length.is_some_and(|max| len > max);
    if too_short || too_long {
        let expected = match (param.min_length, param.max_length) {
            (Some(min), Some(max)) => format!("string of {min} to {max} characters"),
            (Some(min), None) => format!("string of at least {min} characters"),
            (None, Some(max)) => format!("string of at most {max} characters"),
            (None, None) => unreachable!(),
        };
        let message = format!(
            "parameter '{}' must be a {expected}, got {len} characters",
            param.name
        );
        p.error_schema(
            pos,
            &format!("@{deco}"),
            SchemaCode::LengthViolation,
            &param.name,
            message,
            format!("Adjust the length of '{}'", param.name),
            expected,
            format!("\"{text}\""),
        );
        return;
    }

    if let Some(pattern) = &param.pattern {
        // A schema with an invalid regex is a registration bug; the
        // parser does not punish scripts for it.
        if let Ok(re) = Regex::new(pattern) {
            if !re.is_match(text) {
                let message = format!(
                    "parameter '{}' must match pattern {pattern}, got \"{text}\"",
                    param.name
                );
                p.error_schema(
                    pos,
                    &format!("@{deco}"),
                    SchemaCode::PatternMismatch,
                    &param.name,
                    message,
                    format!("Match the pattern {pattern}"),
                    format!("string matching {pattern}"),
                    format!("\"{text}\""),
                );
                return;
            }
        }
    }

    if let Some(format) = &param.format {
        if !format_matches(format, text) {
            let message = format!(
                "parameter '{}' is not a valid {format}: \"{text}\"",
                param.name
            );
            p.error_schema(
                pos,
                &format!("@{deco}"),
                SchemaCode::FormatInvalid,
                &param.name,
                message,
                format!("Provide a well-formed {format}"),
                format!("string ({format})"),
                format!("\"{text}\""),
            );
        }
    }
}

/// Known named formats. Unknown format names validate nothing.
fn format_matches(format: &str, text: &str) -> bool {
    match format {
        "identifier" => {
            let mut chars = text.chars();
            match chars.next() {
                Some(c) if c.is_alphabetic() || c == '_' => {}
                _ => return false,
            }
            chars.all(|c| c.is_alphanumeric() || c == '_')
        }
        "uri" => text.contains("://") && !text.starts_with("://"),
        _ => true,
    }
}

fn enum_check(p: &mut Parser, deco: &str, param: &ParamSchema, text: &str, pos: Position) {
    if param.enum_values.iter().any(|v| v == text) {
        return;
    }
    if let Some((_, replacement)) = param
        .deprecated_enum_values
        .iter()
        .find(|(old, _)| old == text)
    {
        let message = format!(
            "enum value '{text}' for parameter '{}' is deprecated, use '{replacement}'",
            param.name
        );
        p.warning_schema(
            pos,
            &format!("@{deco}"),
            SchemaCode::EnumDeprecated,
            &param.name,
            message,
            format!("Replace '{text}' with '{replacement}'"),
            param.expected_type(),
            format!("\"{text}\""),
        );
        return;
    }
    let message = format!("invalid value '{text}' for parameter '{}'", param.name);
    p.error_schema(
        pos,
        &format!("@{deco}"),
        SchemaCode::EnumInvalid,
        &param.name,
        message,
        format!("Valid values: {}", param.enum_values.join(", ")),
        param.expected_type(),
        format!("\"{text}\""),
    );
}

// ── Event-walk reconstruction ────────────────────────────────────────────

/// Rebuild the literal value of the object/array just parsed from the
/// working events. Returns `None` when the literal contains anything
/// dynamic (identifiers, decorators, wrapped expressions).
fn reconstruct(p: &Parser, checkpoint: usize) -> Option<LiteralValue> {
    let events = p.events_since(checkpoint);
    // Any wrapped node means expression machinery ran inside the value.
    for event in events {
        if let WorkEvent::Open {
            forward_parent: Some(_),
            ..
        } = event
        {
            return None;
        }
    }
    let (value, _) = node_value(p, events, 0)?;
    Some(value)
}

/// Parse one node starting at `events[i]`, returning its value and the
/// index just past its Close.
fn node_value(p: &Parser, events: &[WorkEvent], i: usize) -> Option<(LiteralValue, usize)> {
    let kind = match events.get(i)? {
        WorkEvent::Open { kind: Some(k), .. } => *k,
        _ => return None,
    };
    match kind {
        NodeKind::Literal => {
            let mut j = i + 1;
            let mut value = None;
            loop {
                match events.get(j)? {
                    WorkEvent::Token { index } => {
                        value = token_value(p, *index);
                        j += 1;
                    }
                    WorkEvent::Close => return Some((value?, j + 1)),
                    _ => return None,
                }
            }
        }

        NodeKind::ArrayLiteral => {
            let mut j = i + 1;
            let mut items = Vec::new();
            loop {
                match events.get(j)? {
                    // Delimiters and commas.
                    WorkEvent::Token { .. } => j += 1,
                    WorkEvent::Open { .. } => {
                        let (item, next) = node_value(p, events, j)?;
                        items.push(item);
                        j = next;
                    }
                    WorkEvent::Close => return Some((LiteralValue::Array(items), j + 1)),
                    _ => return None,
                }
            }
        }

        NodeKind::ObjectLiteral => {
            let mut j = i + 1;
            let mut fields = Vec::new();
            loop {
                match events.get(j)? {
                    WorkEvent::Token { .. } => j += 1,
                    WorkEvent::Open {
                        kind: Some(NodeKind::ObjectField),
                        ..
                    } => {
                        let (name, value, next) = field_value(p, events, j)?;
                        fields.push((name, value));
                        j = next;
                    }
                    WorkEvent::Close => return Some((LiteralValue::Object(fields), j + 1)),
                    _ => return None,
                }
            }
        }

        // Identifiers, decorators, interpolated strings, expressions:
        // not a static literal.
        _ => None,
    }
}

/// Parse an ObjectField: name token, `:` token, one value node, Close.
fn field_value(
    p: &Parser,
    events: &[WorkEvent],
    i: usize,
) -> Option<(String, LiteralValue, usize)> {
    let mut j = i + 1;
    let name = match events.get(j)? {
        WorkEvent::Token { index } => p.token_text(*index).to_string(),
        _ => return None,
    };
    j += 1;
    // Skip the `:` (and any stray tokens until the value node opens).
    loop {
        match events.get(j)? {
            WorkEvent::Token { .. } => j += 1,
            WorkEvent::Open { .. } => break,
            _ => return None,
        }
    }
    let (value, mut j) = node_value(p, events, j)?;
    loop {
        match events.get(j)? {
            WorkEvent::Token { .. } => j += 1,
            WorkEvent::Close => return Some((name, value, j + 1)),
            _ => return None,
        }
    }
}

fn token_value(p: &Parser, index: u32) -> Option<LiteralValue> {
    let text = p.token_text(index);
    Some(match p.token_kind(index) {
        TokenKind::Integer => {
            let cleaned: String = text.chars().filter(|c| *c != '_').collect();
            LiteralValue::Int(cleaned.parse().ok()?)
        }
        TokenKind::Float => {
            let cleaned: String = text.chars().filter(|c| *c != '_').collect();
            LiteralValue::Float(cleaned.parse().ok()?)
        }
        TokenKind::Boolean => LiteralValue::Bool(text == "true"),
        TokenKind::Duration => LiteralValue::Duration(text.to_string()),
        TokenKind::String => {
            let (_, inner) = expressions::split_quotes(text);
            LiteralValue::Str(inner.to_string())
        }
        _ => return None,
    })
}

// ── Composite validation ─────────────────────────────────────────────────

fn type_matches(ty: &ParamType, value: &LiteralValue) -> bool {
    matches!(
        (ty, value),
        (ParamType::String | ParamType::Enum, LiteralValue::Str(_))
            | (ParamType::Int, LiteralValue::Int(_))
            | (ParamType::Float, LiteralValue::Int(_) | LiteralValue::Float(_))
            | (ParamType::Bool, LiteralValue::Bool(_))
            | (ParamType::Duration, LiteralValue::Duration(_))
            | (ParamType::Object { .. }, LiteralValue::Object(_))
            | (ParamType::Array { .. }, LiteralValue::Array(_))
    )
}

fn validate_composite(
    p: &mut Parser,
    deco: &str,
    param: &ParamSchema,
    value: &LiteralValue,
    pos: Position,
) {
    match (&param.ty, value) {
        (
            ParamType::Object {
                fields,
                additional_allowed,
            },
            LiteralValue::Object(entries),
        ) => {
            for (fname, fvalue) in entries {
                match fields.iter().find(|f| &f.name == fname) {
                    Some(field) => {
                        if !type_matches(&field.ty, fvalue) {
                            let path = format!("{}.{fname}", param.name);
                            let message = format!(
                                "field '{fname}' of parameter '{}' expects {}, got {}",
                                param.name,
                                field.ty.word(),
                                fvalue.word()
                            );
                            p.error_schema(
                                pos,
                                &format!("@{deco}"),
                                SchemaCode::ObjectFieldType,
                                &path,
                                message,
                                format!("Provide a {} value for '{fname}'", field.ty.word()),
                                field.expected_type(),
                                fvalue.render(),
                            );
                        }
                    }
                    None => {
                        if !additional_allowed {
                            let path = format!("{}.{fname}", param.name);
                            let valid: Vec<&str> =
                                fields.iter().map(|f| f.name.as_str()).collect();
                            let message = format!(
                                "unknown field '{fname}' in parameter '{}'",
                                param.name
                            );
                            p.error_schema(
                                pos,
                                &format!("@{deco}"),
                                SchemaCode::AdditionalProp,
                                &path,
                                message,
                                format!("Valid fields: {}", valid.join(", ")),
                                param.expected_type(),
                                fvalue.render(),
                            );
                        }
                    }
                }
            }
            for field in fields.iter().filter(|f| f.required) {
                if !entries.iter().any(|(n, _)| n == &field.name) {
                    let path = format!("{}.{}", param.name, field.name);
                    let message = format!(
                        "missing required field '{}' in parameter '{}'",
                        field.name, param.name
                    );
                    p.error_schema(
                        pos,
                        &format!("@{deco}"),
                        SchemaCode::RequiredMissing,
                        &path,
                        message,
                        format!("Add {}: … to the object", field.name),
                        field.expected_type(),
                        "nothing".to_string(),
                    );
                }
            }
        }

        (ParamType::Array { element }, LiteralValue::Array(items)) => {
            for (idx, item) in items.iter().enumerate() {
                if !type_matches(element, item) {
                    let path = format!("{}[{idx}]", param.name);
                    let message = format!(
                        "element {idx} of parameter '{}' expects {}, got {}",
                        param.name,
                        element.word(),
                        item.word()
                    );
                    p.error_schema(
                        pos,
                        &format!("@{deco}"),
                        SchemaCode::ArrayElementType,
                        &path,
                        message,
                        format!("Use {} elements only", element.word()),
                        element.describe(),
                        item.render(),
                    );
                }
            }
        }

        _ => {
            type_mismatch(p, deco, param, value.word(), pos);
        }
    }
}
