//! Opal parser: recursive descent over a token stream, producing a flat
//! event log plus structured diagnostics.
//!
//! Opal fuses structured constructs (functions, structs, enums, control
//! flow, pattern matching) with free-form shell commands and a
//! decorator sublanguage (`@retry(times=3) { … }`). The parser turns a
//! token vector into:
//!
//! - an **event stream** (Open/Close/Token/StepEnter/StepExit) that is
//!   the syntax tree in linearized form, and
//! - **diagnostics** carrying position, context, expected/actual
//!   tokens, suggestion, example, and structured schema codes.
//!
//! Parsing never fails: malformed input yields a well-formed (balanced)
//! event stream plus errors. Callers decide what to do based on
//! [`ParseTree::ok`]. A second pass validates pipe and redirect
//! operators against the decorator registries' I/O capabilities.

pub mod event;
pub mod interp;
mod parser;
pub mod semantic;
pub mod tree;

use std::time::{Duration, Instant};

use opal_lexer::Lexer;

pub use event::{Event, EventKind, NodeKind};
pub use interp::{scan_string_parts, StringPart};
pub use opal_common::{
    Diagnostic, LexError, Position, SchemaCode, SchemaViolation, Severity, Token, TokenKind,
};
pub use opal_registry::Registries;
pub use semantic::validate_semantics;
pub use tree::{debug_tree, syntax_tree, SyntaxElement, SyntaxNode, SyntaxToken};

/// How much telemetry a parse records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TelemetryMode {
    /// No telemetry (the default).
    #[default]
    Off,
    /// Counts only.
    Basic,
    /// Counts plus per-phase durations.
    Timing,
}

/// How much debug tracing a parse records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DebugLevel {
    /// No tracing (the default).
    #[default]
    Off,
    /// Enter/exit records for the major parse handlers.
    Paths,
    /// Per-event tracing.
    Detailed,
}

/// One debug trace record.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugEvent {
    pub depth: u32,
    pub message: String,
}

/// Parse configuration: telemetry, debug tracing, and the registries to
/// consult. The registries are shared read-only handles; the builtin
/// set is frozen at first use.
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions<'reg> {
    pub telemetry: TelemetryMode,
    pub debug: DebugLevel,
    pub registries: Registries<'reg>,
}

impl Default for ParseOptions<'static> {
    fn default() -> Self {
        Self {
            telemetry: TelemetryMode::Off,
            debug: DebugLevel::Off,
            registries: Registries::builtin(),
        }
    }
}

impl<'reg> ParseOptions<'reg> {
    pub fn with_registries(registries: Registries<'reg>) -> Self {
        Self {
            telemetry: TelemetryMode::Off,
            debug: DebugLevel::Off,
            registries,
        }
    }
}

/// Parse telemetry. Durations are present in `Timing` mode only.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Telemetry {
    pub token_count: usize,
    pub event_count: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub statement_count: u32,
    pub decorator_count: u32,
    pub lex_time: Option<Duration>,
    pub parse_time: Option<Duration>,
    pub validate_time: Option<Duration>,
}

/// The result of a parse: source, tokens, events, and diagnostics.
///
/// Events are strictly balanced even for malformed input; consumers
/// reconstruct tree shape by scanning them (or via [`ParseTree::syntax`]).
#[derive(Debug)]
pub struct ParseTree {
    pub source: String,
    pub tokens: Vec<Token>,
    pub events: Vec<Event>,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub telemetry: Option<Telemetry>,
    pub debug_events: Vec<DebugEvent>,
}

impl ParseTree {
    /// Whether parsing completed without errors. Warnings never block.
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Text of the token at `index`.
    pub fn token_text(&self, index: u32) -> &str {
        self.tokens[index as usize].text(&self.source)
    }

    /// Materialize the rowan tree view of the events.
    pub fn syntax(&self) -> SyntaxNode {
        tree::syntax_tree(self)
    }

    /// Render the tree as an indented debug listing.
    pub fn debug_tree(&self) -> String {
        tree::debug_tree(&self.syntax())
    }
}

/// Parse source bytes. Invalid UTF-8 is replaced, not rejected; the
/// lexer reports what it cannot tokenize.
pub fn parse(bytes: &[u8], options: &ParseOptions<'_>) -> ParseTree {
    let source = String::from_utf8_lossy(bytes);
    parse_string(&source, options)
}

/// Parse a source string: lex, parse, validate.
pub fn parse_string(source: &str, options: &ParseOptions<'_>) -> ParseTree {
    let lex_start = Instant::now();
    let (tokens, lex_errors) = Lexer::tokenize(source);
    let lex_time = lex_start.elapsed();
    run(source, tokens, lex_errors, options, Some(lex_time))
}

/// Parse a pre-lexed token vector over the same source bytes. Used by
/// benchmarks and callers that share lex results.
pub fn parse_tokens(source: &str, tokens: Vec<Token>, options: &ParseOptions<'_>) -> ParseTree {
    run(source, tokens, Vec::new(), options, None)
}

fn run(
    source: &str,
    tokens: Vec<Token>,
    lex_errors: Vec<LexError>,
    options: &ParseOptions<'_>,
    lex_time: Option<Duration>,
) -> ParseTree {
    let parse_start = Instant::now();
    let mut p = parser::Parser::new(source, &tokens, options.registries, options.debug);
    p.file();
    let raw = p.finish();
    let parse_time = parse_start.elapsed();

    // Lexer errors first (they were discovered first), then parse
    // diagnostics, then the semantic pass as a suffix.
    let mut errors: Vec<Diagnostic> = Vec::with_capacity(lex_errors.len() + raw.errors.len());
    if !lex_errors.is_empty() {
        let line_index = opal_common::LineIndex::new(source);
        for lex_error in &lex_errors {
            let (line, col) = line_index.line_col(lex_error.span.start);
            errors.push(Diagnostic::error(
                lex_error.to_string(),
                "lexer",
                Position::new(lex_error.span.start, lex_error.span.len(), line, col),
            ));
        }
    }
    errors.extend(raw.errors);

    let validate_start = Instant::now();
    errors.extend(validate_semantics(source, &tokens, &options.registries));
    let validate_time = validate_start.elapsed();

    let telemetry = match options.telemetry {
        TelemetryMode::Off => None,
        mode => {
            let timing = mode == TelemetryMode::Timing;
            Some(Telemetry {
                token_count: tokens.len(),
                event_count: raw.events.len(),
                error_count: errors.len(),
                warning_count: raw.warnings.len(),
                statement_count: raw.statement_count,
                decorator_count: raw.decorator_count,
                lex_time: if timing { lex_time } else { None },
                parse_time: timing.then_some(parse_time),
                validate_time: timing.then_some(validate_time),
            })
        }
    };

    ParseTree {
        source: source.to_string(),
        tokens,
        events: raw.events,
        errors,
        warnings: raw.warnings,
        telemetry,
        debug_events: raw.trace,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_smoke() {
        let tree = parse_string("var x = 42", &ParseOptions::default());
        assert!(tree.ok(), "{:?}", tree.errors);
        assert_eq!(tree.tokens.last().unwrap().kind, TokenKind::Eof);
        assert!(!tree.events.is_empty());
    }

    #[test]
    fn parse_bytes_handles_invalid_utf8() {
        let tree = parse(b"var x = 1\xFF", &ParseOptions::default());
        // The replacement character is not tokenizable; a lex error shows up.
        assert!(!tree.ok());
    }

    #[test]
    fn telemetry_basic_has_counts_but_no_times() {
        let options = ParseOptions {
            telemetry: TelemetryMode::Basic,
            ..ParseOptions::default()
        };
        let tree = parse_string("var x = 1\necho hi", &options);
        let telemetry = tree.telemetry.unwrap();
        assert!(telemetry.token_count > 0);
        assert!(telemetry.event_count > 0);
        assert_eq!(telemetry.statement_count, 2);
        assert!(telemetry.parse_time.is_none());
    }

    #[test]
    fn telemetry_timing_has_durations() {
        let options = ParseOptions {
            telemetry: TelemetryMode::Timing,
            ..ParseOptions::default()
        };
        let tree = parse_string("echo hi", &options);
        let telemetry = tree.telemetry.unwrap();
        assert!(telemetry.lex_time.is_some());
        assert!(telemetry.parse_time.is_some());
        assert!(telemetry.validate_time.is_some());
    }

    #[test]
    fn debug_paths_traces_handlers() {
        let options = ParseOptions {
            debug: DebugLevel::Paths,
            ..ParseOptions::default()
        };
        let tree = parse_string("fun greet() {}", &options);
        assert!(tree
            .debug_events
            .iter()
            .any(|e| e.message == "enter function_decl"));
        assert!(tree
            .debug_events
            .iter()
            .any(|e| e.message == "exit function_decl"));
    }

    #[test]
    fn parse_tokens_matches_parse_string() {
        let source = "fun greet() {}\ngreet()";
        let (tokens, _) = opal_lexer::Lexer::tokenize(source);
        let from_tokens = parse_tokens(source, tokens, &ParseOptions::default());
        let from_string = parse_string(source, &ParseOptions::default());
        assert_eq!(from_tokens.events, from_string.events);
        assert_eq!(from_tokens.errors.len(), from_string.errors.len());
    }
}
