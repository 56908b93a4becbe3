//! Golden event-stream fixtures: canonical snippets must produce the
//! exact numeric event sequences stored in `tests/golden/`. These pin
//! the stable NodeKind numbering and token indices.

use opal_parser::{parse_string, ParseOptions};

fn assert_golden(source: &str, fixture: &str) {
    let tree = parse_string(source, &ParseOptions::default());
    assert!(tree.ok(), "{source:?}: {:#?}", tree.errors);
    let actual = serde_json::to_value(&tree.events).expect("events serialize");
    let expected: serde_json::Value =
        serde_json::from_str(fixture).expect("fixture parses as JSON");
    assert_eq!(actual, expected, "event mismatch for {source:?}");
}

#[test]
fn golden_empty_function() {
    assert_golden(
        "fun greet() {}",
        include_str!("golden/empty_function.json"),
    );
}

#[test]
fn golden_var_decl() {
    assert_golden("var x = 42", include_str!("golden/var_decl.json"));
}

#[test]
fn golden_shell_command() {
    assert_golden("echo \"hello\"", include_str!("golden/shell_command.json"));
}
