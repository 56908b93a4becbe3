//! Universal invariants: every input, valid or garbage, must yield a
//! balanced event stream, strictly ordered token events, deterministic
//! output, and non-empty diagnostics.

use opal_parser::{parse_string, parse_tokens, EventKind, NodeKind, ParseOptions, ParseTree};

const CORPUS: &[&str] = &[
    "",
    "fun greet() {}",
    "var x = 42",
    "echo \"hello\"",
    "echo a > out && echo b",
    "deploy -f deployment.yaml --verbose",
    "@env.HOME(default=\"/root\")",
    "@retry(times=3, delay=2s) {\n  curl https://example.com\n}",
    "if @env.DEBUG == \"1\" {\n  echo debug\n} else {\n  echo quiet\n}",
    "for i in 1...5 {\n  echo @var.i\n}",
    "try {\n  risky\n} catch {\n  echo no\n} finally {\n  echo bye\n}",
    "when @env.STAGE {\n  \"prod\" -> deploy_all\n  else -> echo skip\n}",
    "struct Host {\n  name String\n  port Int = 22\n}",
    "enum Env { Dev, Prod = \"production\" }",
    "var (\n  a = 1\n  b = 2\n)",
    "fun motd() = echo welcome",
    // Malformed inputs: the invariants still hold.
    "fun",
    "fun greet( {",
    "var x =",
    "@retry(",
    "when {",
    "if { }",
    "}}}}",
    "(((",
    "@ @ @",
    "else else else",
    "struct S { fun bad() {} }",
    "echo a | | b",
    "for in in in",
    "\"unterminated",
];

fn parse(source: &str) -> ParseTree {
    parse_string(source, &ParseOptions::default())
}

/// Invariant 2 + 3: Open/Close strictly balanced with equal payloads;
/// steps balanced and nested only where executable statements live
/// (top-level Source, Blocks, and `= body` Function shorthands).
#[test]
fn events_are_balanced_and_steps_nest_correctly() {
    for source in CORPUS {
        let tree = parse(source);
        let mut stack: Vec<NodeKind> = Vec::new();
        let mut step_depth = 0u32;
        for event in &tree.events {
            match event.kind {
                EventKind::Open => stack.push(event.node_kind().expect("valid kind")),
                EventKind::Close => {
                    let open = stack.pop().unwrap_or_else(|| {
                        panic!("unbalanced Close in {source:?}");
                    });
                    assert_eq!(
                        open,
                        event.node_kind().unwrap(),
                        "Close payload mismatch in {source:?}"
                    );
                }
                EventKind::StepEnter => {
                    step_depth += 1;
                    let parent = stack.last().copied();
                    assert!(
                        matches!(
                            parent,
                            Some(NodeKind::Source | NodeKind::Block | NodeKind::Function)
                        ),
                        "step outside Source/Block/Function in {source:?}: {parent:?}"
                    );
                }
                EventKind::StepExit => {
                    assert!(step_depth > 0, "StepExit without StepEnter in {source:?}");
                    step_depth -= 1;
                }
                EventKind::Token => {}
            }
        }
        assert!(stack.is_empty(), "unclosed nodes in {source:?}: {stack:?}");
        assert_eq!(step_depth, 0, "unclosed step in {source:?}");
    }
}

/// Invariant 5: token events reference strictly increasing indices (a
/// subsequence of the token stream, nothing duplicated or reordered).
#[test]
fn token_events_are_a_strict_subsequence() {
    for source in CORPUS {
        let tree = parse(source);
        let mut last: Option<u32> = None;
        for event in &tree.events {
            if event.kind == EventKind::Token {
                if let Some(prev) = last {
                    assert!(
                        event.data > prev,
                        "token order violation in {source:?}: {prev} then {}",
                        event.data
                    );
                }
                last = Some(event.data);
                assert!((event.data as usize) < tree.tokens.len());
            }
        }
    }
}

/// Invariant 6: determinism, and `parse` == `parse_tokens` over the
/// same lex result.
#[test]
fn parsing_is_deterministic() {
    for source in CORPUS {
        let first = parse(source);
        let second = parse(source);
        assert_eq!(first.events, second.events, "nondeterminism on {source:?}");
        assert_eq!(first.errors.len(), second.errors.len());

        let (tokens, _) = opal_lexer::Lexer::tokenize(source);
        let from_tokens = parse_tokens(source, tokens, &ParseOptions::default());
        assert_eq!(
            first.events, from_tokens.events,
            "parse_tokens mismatch on {source:?}"
        );
    }
}

/// Invariant 8: every error carries a message and context; every schema
/// error carries all four structured fields.
#[test]
fn diagnostics_are_fully_populated() {
    for source in CORPUS {
        let tree = parse(source);
        for diag in tree.errors.iter().chain(tree.warnings.iter()) {
            assert!(!diag.message.is_empty(), "empty message for {source:?}");
            assert!(!diag.context.is_empty(), "empty context for {source:?}");
            if let Some(schema) = &diag.schema {
                assert!(!schema.path.is_empty());
                assert!(!schema.expected_type.is_empty());
                assert!(!schema.got_value.is_empty());
                assert!(!schema.code.as_str().is_empty());
            }
        }
    }
}

/// Event count grows linearly with repeated statements.
#[test]
fn event_count_grows_linearly() {
    let base = parse("").events.len();
    let ten = parse(&"echo hello world\n".repeat(10)).events.len();
    let twenty = parse(&"echo hello world\n".repeat(20)).events.len();
    assert_eq!(twenty - base, 2 * (ten - base));
}

/// The rowan view can always be materialized (a second balance check,
/// through GreenNodeBuilder's own nesting discipline).
#[test]
fn syntax_tree_materializes_for_all_inputs() {
    for source in CORPUS {
        let tree = parse(source);
        let node = tree.syntax();
        assert_eq!(node.kind().node_kind(), Some(NodeKind::Source));
    }
}

/// Warnings never affect `ok()`.
#[test]
fn warnings_do_not_block() {
    let tree = parse("@retry(attempts=3) { echo hi }");
    assert!(tree.ok());
    assert!(!tree.warnings.is_empty());
}
