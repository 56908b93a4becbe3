//! Event-based recursive descent parser for Opal.
//!
//! Parse functions call `open()` to start a node, `bump()` to consume
//! tokens, and `close()` to finish the node. Working events are
//! collected into a flat vector; `open_before()` wraps a previously
//! completed node (turning `x` into `BinaryExpr(x + y)`) using the
//! forward-parent technique, and `finish()` resolves those links into
//! the public, strictly balanced event log.
//!
//! The parser never aborts: every problem becomes a diagnostic and the
//! cursor synchronizes to the next `}`, `;`, `fun`, or end of file.
//! Every statement loop asserts forward progress and force-advances one
//! token if a handler stalls, so parsing terminates on any input.

pub(crate) mod control;
pub(crate) mod decorators;
pub(crate) mod expressions;
pub(crate) mod items;
pub(crate) mod patterns;
pub(crate) mod shell;
mod schema;

use opal_common::{Diagnostic, Position, SchemaCode, Token, TokenKind};
use opal_registry::Registries;
use rustc_hash::FxHashSet;

use crate::event::{Event, NodeKind};
use crate::{DebugEvent, DebugLevel};

/// A working event. Resolved into the public [`Event`] log by
/// [`Parser::finish`].
#[derive(Debug)]
pub(crate) enum WorkEvent {
    /// Start of a node. `kind` becomes `None` (a tombstone) when the
    /// event has already been emitted through a forward-parent chain.
    Open {
        kind: Option<NodeKind>,
        forward_parent: Option<usize>,
    },
    /// End of the innermost open node.
    Close,
    /// A consumed token (index into the token vector).
    Token { index: u32 },
    StepEnter,
    StepExit,
}

/// An opaque marker for a started but not-yet-closed node.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MarkOpened {
    index: usize,
    kind: NodeKind,
}

/// An opaque marker for a completed node, usable with `open_before()`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MarkClosed {
    index: usize,
}

/// Everything the parse run produces, before assembly into a ParseTree.
pub(crate) struct RawParse {
    pub events: Vec<Event>,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub trace: Vec<DebugEvent>,
    pub statement_count: u32,
    pub decorator_count: u32,
}

pub(crate) struct Parser<'src, 'reg> {
    source: &'src str,
    tokens: &'src [Token],
    pos: usize,
    events: Vec<WorkEvent>,
    pub(crate) errors: Vec<Diagnostic>,
    pub(crate) warnings: Vec<Diagnostic>,
    pub(crate) registries: Registries<'reg>,
    /// Names of top-level functions, pre-scanned so that `deploy(x)` can
    /// be told apart from the shell command `deploy (x)`.
    fn_names: FxHashSet<&'src str>,
    debug: DebugLevel,
    trace: Vec<DebugEvent>,
    trace_depth: u32,
    statement_count: u32,
    pub(crate) decorator_count: u32,
}

impl<'src, 'reg> Parser<'src, 'reg> {
    pub(crate) fn new(
        source: &'src str,
        tokens: &'src [Token],
        registries: Registries<'reg>,
        debug: DebugLevel,
    ) -> Self {
        let fn_names = collect_function_names(source, tokens);
        Self {
            source,
            tokens,
            pos: 0,
            // ~3 events per token (Open/Token/Close), with a small floor.
            events: Vec::with_capacity(16usize.max(tokens.len() * 3)),
            errors: Vec::new(),
            warnings: Vec::new(),
            registries,
            fn_names,
            debug,
            trace: Vec::new(),
            trace_depth: 0,
            statement_count: 0,
            decorator_count: 0,
        }
    }

    // ── Lookahead ──────────────────────────────────────────────────────

    /// Index of the first non-comment token at or after `from`.
    fn significant_index(&self, from: usize) -> usize {
        let mut i = from;
        while i < self.tokens.len() && self.tokens[i].kind == TokenKind::Comment {
            i += 1;
        }
        i.min(self.tokens.len().saturating_sub(1))
    }

    fn current_index(&self) -> usize {
        self.significant_index(self.pos)
    }

    /// Kind of the current significant token (comments are invisible).
    pub(crate) fn current(&self) -> TokenKind {
        self.current_token().kind
    }

    /// The current significant token. The token vector always ends with
    /// `Eof`, which this returns when the cursor is at the end.
    pub(crate) fn current_token(&self) -> &Token {
        &self.tokens[self.current_index()]
    }

    /// Kind of the Nth significant token ahead (`nth(0)` == `current()`).
    pub(crate) fn nth(&self, n: usize) -> TokenKind {
        self.nth_token(n).kind
    }

    pub(crate) fn nth_token(&self, n: usize) -> &Token {
        let mut i = self.significant_index(self.pos);
        for _ in 0..n {
            if self.tokens[i].kind == TokenKind::Eof {
                break;
            }
            i = self.significant_index(i + 1);
        }
        &self.tokens[i]
    }

    pub(crate) fn at(&self, kind: TokenKind) -> bool {
        self.current() == kind
    }

    pub(crate) fn at_any(&self, kinds: &[TokenKind]) -> bool {
        kinds.contains(&self.current())
    }

    /// Text of the current significant token.
    pub(crate) fn current_text(&self) -> &'src str {
        self.current_token().text(self.source)
    }

    pub(crate) fn nth_text(&self, n: usize) -> &'src str {
        self.nth_token(n).text(self.source)
    }

    /// Whether whitespace (or a comment) separates the current token from
    /// the one before it. Drives shell-argument grouping.
    pub(crate) fn current_has_space(&self) -> bool {
        let i = self.current_index();
        // An intervening comment separates as surely as a space does.
        if i > self.pos {
            return true;
        }
        self.tokens[i].has_space_before
    }

    // ── Node management ────────────────────────────────────────────────

    /// Start a new node of the given kind. The returned marker must be
    /// passed back to `close()`.
    pub(crate) fn open(&mut self, kind: NodeKind) -> MarkOpened {
        let mark = MarkOpened {
            index: self.events.len(),
            kind,
        };
        self.events.push(WorkEvent::Open {
            kind: Some(kind),
            forward_parent: None,
        });
        self.trace_detail(|| format!("open {}", kind.name()));
        mark
    }

    /// Start a new node BEFORE a previously completed one, wrapping it.
    ///
    /// Instead of inserting into the event vector (which would invalidate
    /// earlier marks), the completed node's Open event gets a
    /// forward-parent link to the new wrapper; `finish()` untangles the
    /// chain.
    pub(crate) fn open_before(&mut self, completed: MarkClosed, kind: NodeKind) -> MarkOpened {
        let mark = MarkOpened {
            index: self.events.len(),
            kind,
        };
        self.events.push(WorkEvent::Open {
            kind: Some(kind),
            forward_parent: None,
        });
        if let WorkEvent::Open { forward_parent, .. } = &mut self.events[completed.index] {
            *forward_parent = Some(mark.index);
        }
        self.trace_detail(|| format!("open_before {}", kind.name()));
        mark
    }

    /// Close a node. The marker's kind is the one recorded by `open()`.
    pub(crate) fn close(&mut self, m: MarkOpened) -> MarkClosed {
        debug_assert!(
            matches!(self.events[m.index], WorkEvent::Open { kind: Some(k), .. } if k == m.kind),
            "close() must receive the marker returned by open()"
        );
        self.events.push(WorkEvent::Close);
        self.trace_detail(|| format!("close {}", m.kind.name()));
        MarkClosed { index: m.index }
    }

    /// Emit a StepEnter/StepExit pair around an executable statement.
    pub(crate) fn step(&mut self, f: impl FnOnce(&mut Self)) {
        self.events.push(WorkEvent::StepEnter);
        self.statement_count += 1;
        f(self);
        self.events.push(WorkEvent::StepExit);
    }

    // ── Token consumption ──────────────────────────────────────────────

    /// Consume the current significant token, emitting a Token event.
    /// Comments before it are skipped without events. No-op at EOF.
    pub(crate) fn bump(&mut self) {
        let i = self.current_index();
        let kind = self.tokens[i].kind;
        if kind == TokenKind::Eof {
            return;
        }
        self.events.push(WorkEvent::Token { index: i as u32 });
        self.trace_detail(|| format!("token {kind:?}"));
        self.pos = i + 1;
    }

    /// Advance the cursor past the current significant token WITHOUT
    /// emitting an event. Used for recovery and separators that do not
    /// belong in the tree. No-op at EOF.
    pub(crate) fn bump_raw(&mut self) {
        let i = self.current_index();
        if self.tokens[i].kind == TokenKind::Eof {
            self.pos = i;
            return;
        }
        self.pos = i + 1;
    }

    /// If the current token matches, consume it and return true.
    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Expect a specific token: consume it on match, otherwise emit an
    /// expected-token diagnostic (keyed on `expected × context`) and
    /// return false without consuming.
    pub(crate) fn expect(&mut self, kind: TokenKind, context: &str) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            self.error_expected(kind, context);
            false
        }
    }

    /// Consume newline (and comment) tokens without events.
    pub(crate) fn skip_newlines(&mut self) {
        loop {
            let i = self.current_index();
            if self.tokens[i].kind == TokenKind::Newline {
                self.pos = i + 1;
            } else {
                break;
            }
        }
    }

    /// Whether the cursor sits on a recovery synchronization point.
    pub(crate) fn is_sync_token(&self) -> bool {
        matches!(
            self.current(),
            TokenKind::RBrace | TokenKind::Semicolon | TokenKind::Fun | TokenKind::Eof
        )
    }

    /// Advance (without events) until a synchronization point.
    pub(crate) fn recover(&mut self) {
        while !self.is_sync_token() {
            self.bump_raw();
        }
    }

    /// Save/restore for speculative newline skipping (`}` `\n` `else`).
    pub(crate) fn checkpoint(&self) -> usize {
        self.pos
    }

    pub(crate) fn rewind(&mut self, checkpoint: usize) {
        self.pos = checkpoint;
    }

    /// Current length of the working event buffer; used by the decorator
    /// engine to reconstruct just-parsed literal values.
    pub(crate) fn events_len(&self) -> usize {
        self.events.len()
    }

    pub(crate) fn events_since(&self, checkpoint: usize) -> &[WorkEvent] {
        &self.events[checkpoint..]
    }

    pub(crate) fn token_text(&self, index: u32) -> &'src str {
        self.tokens[index as usize].text(self.source)
    }

    pub(crate) fn token_kind(&self, index: u32) -> TokenKind {
        self.tokens[index as usize].kind
    }

    /// Whether `name` was declared as a top-level function.
    pub(crate) fn is_known_function(&self, name: &str) -> bool {
        self.fn_names.contains(name)
    }

    // ── Diagnostics ────────────────────────────────────────────────────

    pub(crate) fn position_of(&self, token: &Token) -> Position {
        Position::new(token.span.start, token.span.len(), token.line, token.col)
    }

    pub(crate) fn current_position(&self) -> Position {
        self.position_of(self.current_token())
    }

    pub(crate) fn error_expected(&mut self, expected: TokenKind, context: &str) {
        let got = self.current().describe();
        let mut diag = Diagnostic::error(
            format!(
                "expected `{}` in {}, got `{}`",
                expected.describe(),
                context,
                got
            ),
            context,
            self.current_position(),
        )
        .with_expected(vec![expected.describe().to_string()])
        .with_got(got);
        if let Some((suggestion, example)) = expectation_hint(expected, context) {
            diag = diag.with_suggestion(suggestion).with_example(example);
        }
        self.errors.push(diag);
    }

    pub(crate) fn error_unexpected(&mut self, context: &str) {
        let got = self.current().describe();
        let diag = Diagnostic::error(
            format!("unexpected `{}` in {}", got, context),
            context,
            self.current_position(),
        )
        .with_got(got);
        self.errors.push(diag);
    }

    pub(crate) fn error_with_details(&mut self, message: &str, context: &str, suggestion: &str) {
        let diag = Diagnostic::error(message, context, self.current_position())
            .with_got(self.current().describe())
            .with_suggestion(suggestion);
        self.errors.push(diag);
    }

    pub(crate) fn error_full(
        &mut self,
        message: &str,
        context: &str,
        suggestion: &str,
        example: &str,
        note: &str,
    ) {
        let diag = Diagnostic::error(message, context, self.current_position())
            .with_got(self.current().describe())
            .with_suggestion(suggestion)
            .with_example(example)
            .with_note(note);
        self.errors.push(diag);
    }

    pub(crate) fn warning_with_details(&mut self, message: &str, context: &str, suggestion: &str) {
        let diag = Diagnostic::warning(message, context, self.current_position())
            .with_suggestion(suggestion);
        self.warnings.push(diag);
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn error_schema(
        &mut self,
        position: Position,
        context: &str,
        code: SchemaCode,
        path: &str,
        message: String,
        suggestion: String,
        expected_type: String,
        got_value: String,
    ) {
        let diag = Diagnostic::error(message, context, position)
            .with_suggestion(suggestion)
            .with_schema(code, path, expected_type, got_value);
        self.errors.push(diag);
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn warning_schema(
        &mut self,
        position: Position,
        context: &str,
        code: SchemaCode,
        path: &str,
        message: String,
        suggestion: String,
        expected_type: String,
        got_value: String,
    ) {
        let diag = Diagnostic::warning(message, context, position)
            .with_suggestion(suggestion)
            .with_schema(code, path, expected_type, got_value);
        self.warnings.push(diag);
    }

    // ── Debug tracing ──────────────────────────────────────────────────

    pub(crate) fn trace_enter(&mut self, name: &str) {
        if self.debug != DebugLevel::Off {
            let depth = self.trace_depth;
            self.trace.push(DebugEvent {
                depth,
                message: format!("enter {name}"),
            });
            self.trace_depth += 1;
        }
    }

    pub(crate) fn trace_exit(&mut self, name: &str) {
        if self.debug != DebugLevel::Off {
            self.trace_depth = self.trace_depth.saturating_sub(1);
            let depth = self.trace_depth;
            self.trace.push(DebugEvent {
                depth,
                message: format!("exit {name}"),
            });
        }
    }

    fn trace_detail(&mut self, message: impl FnOnce() -> String) {
        if self.debug == DebugLevel::Detailed {
            let depth = self.trace_depth;
            self.trace.push(DebugEvent {
                depth,
                message: message(),
            });
        }
    }

    // ── Finishing ──────────────────────────────────────────────────────

    /// Resolve forward parents and produce the public event log.
    pub(crate) fn finish(mut self) -> RawParse {
        let mut out: Vec<Event> = Vec::with_capacity(self.events.len());
        let mut kind_stack: Vec<NodeKind> = Vec::new();
        let mut chain: Vec<(usize, Option<NodeKind>)> = Vec::new();

        let mut i = 0;
        while i < self.events.len() {
            match self.events[i] {
                WorkEvent::Open {
                    kind,
                    forward_parent,
                } => {
                    if forward_parent.is_some() {
                        // Follow the chain, then open wrappers outermost-first.
                        chain.clear();
                        let mut current = i;
                        loop {
                            let (k, fp) = match self.events[current] {
                                WorkEvent::Open {
                                    kind,
                                    forward_parent,
                                } => (kind, forward_parent),
                                _ => unreachable!("forward parent must point at an Open"),
                            };
                            chain.push((current, k));
                            match fp {
                                Some(next) => current = next,
                                None => break,
                            }
                        }
                        // Tombstone every chain member except the head so
                        // they are skipped when reached in order.
                        for &(idx, _) in chain.iter().skip(1) {
                            if let WorkEvent::Open {
                                kind,
                                forward_parent,
                            } = &mut self.events[idx]
                            {
                                *kind = None;
                                *forward_parent = None;
                            }
                        }
                        if let WorkEvent::Open { forward_parent, .. } = &mut self.events[i] {
                            *forward_parent = None;
                        }
                        for &(_, k) in chain.iter().rev() {
                            if let Some(k) = k {
                                out.push(Event::open(k));
                                kind_stack.push(k);
                            }
                        }
                    } else if let Some(k) = kind {
                        out.push(Event::open(k));
                        kind_stack.push(k);
                    }
                    // Tombstones fall through silently.
                }
                WorkEvent::Close => {
                    let k = kind_stack
                        .pop()
                        .expect("Close without matching Open in event buffer");
                    out.push(Event::close(k));
                }
                WorkEvent::Token { index } => out.push(Event::token(index)),
                WorkEvent::StepEnter => out.push(Event::step_enter()),
                WorkEvent::StepExit => out.push(Event::step_exit()),
            }
            i += 1;
        }

        debug_assert!(kind_stack.is_empty(), "unbalanced Open/Close events");

        RawParse {
            events: out,
            errors: self.errors,
            warnings: self.warnings,
            trace: self.trace,
            statement_count: self.statement_count,
            decorator_count: self.decorator_count,
        }
    }

    // ── Top-level driver ───────────────────────────────────────────────

    /// Parse a complete source file into a Source node.
    pub(crate) fn file(&mut self) {
        self.trace_enter("file");
        let m = self.open(NodeKind::Source);
        loop {
            self.skip_newlines();
            if self.at(TokenKind::Eof) {
                break;
            }
            let before = self.pos;
            self.statement(true);
            if self.pos == before {
                // A handler refused to consume anything; force progress.
                self.bump_raw();
            }
        }
        self.close(m);
        self.trace_exit("file");
    }

    /// Classify and parse one statement. `top_level` is false inside
    /// blocks, where declarations are rejected.
    pub(crate) fn statement(&mut self, top_level: bool) {
        match self.current() {
            TokenKind::Fun => {
                if !top_level {
                    self.error_with_details(
                        "function declarations must be at top level",
                        "block",
                        "Move the function out of the enclosing block",
                    );
                }
                items::function_decl(self);
            }
            TokenKind::Struct => {
                if !top_level {
                    self.error_with_details(
                        "struct declarations must be at top level",
                        "block",
                        "Move the struct out of the enclosing block",
                    );
                }
                items::struct_decl(self);
            }
            TokenKind::Enum => {
                if !top_level {
                    self.error_with_details(
                        "enum declarations must be at top level",
                        "block",
                        "Move the enum out of the enclosing block",
                    );
                }
                items::enum_decl(self);
            }
            TokenKind::Var => self.step(items::var_decl),
            TokenKind::If => control::if_stmt(self),
            TokenKind::For => control::for_stmt(self),
            TokenKind::Try => control::try_stmt(self),
            TokenKind::When => control::when_stmt(self),
            TokenKind::Catch => {
                self.error_with_details(
                    "`catch` without a matching `try`",
                    "statement",
                    "Start the error handler with `try { … } catch { … }`",
                );
                self.bump_raw();
            }
            TokenKind::Finally => {
                self.error_with_details(
                    "`finally` without a matching `try`",
                    "statement",
                    "`finally` only follows a `try` block",
                );
                self.bump_raw();
            }
            TokenKind::Else => {
                self.error_with_details(
                    "`else` without a matching `if`",
                    "statement",
                    "`else` must directly follow an `if` block",
                );
                self.bump_raw();
            }
            TokenKind::At => self.step(decorators::decorator_statement),
            TokenKind::Ident => self.step(items::identifier_statement),
            TokenKind::Eof => {}
            _ => {
                // Not a statement starter; skip it silently.
                self.bump_raw();
            }
        }
    }

    /// Parse a `{ … }` block of statements.
    pub(crate) fn block(&mut self, context: &str) {
        self.trace_enter("block");
        let m = self.open(NodeKind::Block);
        if !self.expect(TokenKind::LBrace, context) {
            self.close(m);
            self.trace_exit("block");
            return;
        }
        loop {
            self.skip_newlines();
            if self.at(TokenKind::RBrace) || self.at(TokenKind::Eof) {
                break;
            }
            let before = self.pos;
            self.statement(false);
            if self.pos == before {
                self.bump_raw();
            }
        }
        self.expect(TokenKind::RBrace, "block");
        self.close(m);
        self.trace_exit("block");
    }
}

/// Pre-scan the token vector for top-level function names.
///
/// Walks brace depth; every `fun` at depth zero records the first
/// identifier after it (skipping newlines and comments).
fn collect_function_names<'src>(source: &'src str, tokens: &[Token]) -> FxHashSet<&'src str> {
    let mut names = FxHashSet::default();
    let mut depth: u32 = 0;
    let mut i = 0;
    while i < tokens.len() {
        match tokens[i].kind {
            TokenKind::LBrace => depth += 1,
            TokenKind::RBrace => depth = depth.saturating_sub(1),
            TokenKind::Fun if depth == 0 => {
                let mut j = i + 1;
                while j < tokens.len()
                    && matches!(tokens[j].kind, TokenKind::Newline | TokenKind::Comment)
                {
                    j += 1;
                }
                if j < tokens.len() && tokens[j].kind == TokenKind::Ident {
                    names.insert(tokens[j].text(source));
                }
            }
            _ => {}
        }
        i += 1;
    }
    names
}

/// Canonical suggestion/example templates keyed on `expected × context`.
fn expectation_hint(expected: TokenKind, context: &str) -> Option<(&'static str, &'static str)> {
    Some(match (expected, context) {
        (TokenKind::RParen, "parameter list") => (
            "Add `)` to close the parameter list",
            "fun greet(name String) {}",
        ),
        (TokenKind::RParen, "decorator arguments") => (
            "Add `)` to close the decorator arguments",
            "@retry(times=3) { echo hi }",
        ),
        (TokenKind::RParen, "variable block") => (
            "Add `)` to close the `var (` block",
            "var (\n  a = 1\n  b = 2\n)",
        ),
        (TokenKind::LBrace, "function body") => (
            "Add `{` to open the function body",
            "fun deploy() { echo deploying }",
        ),
        (TokenKind::LBrace, "struct body") => (
            "Add `{` to open the struct body",
            "struct Host { name String }",
        ),
        (TokenKind::LBrace, "enum body") => (
            "Add `{` to open the enum body",
            "enum Env { Dev, Prod }",
        ),
        (TokenKind::LBrace, "when body") => (
            "Add `{` and at least one `pattern -> body` arm",
            "when @env.STAGE { \"prod\" -> deploy() }",
        ),
        (TokenKind::RBrace, "block") => ("Add `}` to close the block", "{ echo hi }"),
        (TokenKind::RBrace, "struct body") => (
            "Add `}` to close the struct body",
            "struct Host { name String }",
        ),
        (TokenKind::RBrace, "enum body") => (
            "Add `}` to close the enum body",
            "enum Env { Dev, Prod }",
        ),
        (TokenKind::RBrace, "when body") => (
            "Add `}` to close the `when` body",
            "when x { else -> echo default }",
        ),
        (TokenKind::Ident, "function name") => (
            "Name the function right after `fun`",
            "fun deploy() {}",
        ),
        (TokenKind::Ident, "struct name") => ("Name the struct", "struct Host { name String }"),
        (TokenKind::Ident, "enum name") => ("Name the enum", "enum Env { Dev, Prod }"),
        (TokenKind::Ident, "variable name") => (
            "Name the variable right after `var`",
            "var retries = 3",
        ),
        (TokenKind::Ident, "parameter name") => (
            "Parameters are `name Type` pairs",
            "fun greet(name String) {}",
        ),
        (TokenKind::Ident, "loop variable") => (
            "Name the loop variable right after `for`",
            "for host in hosts { echo @var.host }",
        ),
        (TokenKind::Ident, "enum member") => (
            "Enum members are bare identifiers",
            "enum Env { Dev, Prod }",
        ),
        (TokenKind::In, "for loop") => (
            "Add `in` between the loop variable and its collection",
            "for host in hosts { echo @var.host }",
        ),
        (TokenKind::Eq, "variable declaration") => (
            "Add `=` and an initial value",
            "var retries = 3",
        ),
        (TokenKind::Arrow, "when arm") => (
            "Add `->` between the pattern and its body",
            "\"prod\" -> deploy()",
        ),
        (TokenKind::RBracket, "array literal") => (
            "Add `]` to close the array",
            "[\"a\", \"b\"]",
        ),
        (TokenKind::Colon, "object field") => (
            "Object fields are `name: value` pairs",
            "{ level: \"info\", color: true }",
        ),
        (TokenKind::RBrace, "object literal") => (
            "Add `}` to close the object",
            "{ level: \"info\" }",
        ),
        _ => return None,
    })
}
