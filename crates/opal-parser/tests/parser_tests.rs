//! Parser integration tests: statement shapes, event sequences, step
//! discipline, and error recovery.

use insta::assert_snapshot;
use opal_parser::{parse_string, EventKind, ParseOptions, ParseTree};

fn parse(source: &str) -> ParseTree {
    parse_string(source, &ParseOptions::default())
}

/// Render events compactly: `O:`/`C:` node kinds, `T:` token text,
/// `>`/`<` for steps.
fn evs(tree: &ParseTree) -> Vec<String> {
    tree.events
        .iter()
        .map(|e| match e.kind {
            EventKind::Open => format!("O:{}", e.node_kind().unwrap().name()),
            EventKind::Close => format!("C:{}", e.node_kind().unwrap().name()),
            EventKind::Token => format!("T:{}", tree.token_text(e.data)),
            EventKind::StepEnter => ">".to_string(),
            EventKind::StepExit => "<".to_string(),
        })
        .collect()
}

fn assert_clean(tree: &ParseTree) {
    assert!(tree.ok(), "unexpected errors: {:#?}", tree.errors);
}

// ── Scenario S1: empty function ────────────────────────────────────────

#[test]
fn empty_function_event_shape() {
    let tree = parse("fun greet() {}");
    assert_clean(&tree);
    assert_eq!(
        evs(&tree),
        vec![
            "O:Source",
            "O:Function",
            "T:fun",
            "T:greet",
            "O:ParamList",
            "T:(",
            "T:)",
            "C:ParamList",
            "O:Block",
            "T:{",
            "T:}",
            "C:Block",
            "C:Function",
            "C:Source",
        ]
    );
}

// ── Scenario S2: var declaration ───────────────────────────────────────

#[test]
fn var_decl_event_shape() {
    let tree = parse("var x = 42");
    assert_clean(&tree);
    assert_eq!(
        evs(&tree),
        vec![
            "O:Source",
            ">",
            "O:VarDecl",
            "T:var",
            "T:x",
            "T:=",
            "O:Literal",
            "T:42",
            "C:Literal",
            "C:VarDecl",
            "<",
            "C:Source",
        ]
    );
}

// ── Scenario S3: shell command ─────────────────────────────────────────

#[test]
fn shell_command_two_args() {
    let tree = parse("echo \"hello\"");
    assert_clean(&tree);
    assert_eq!(
        evs(&tree),
        vec![
            "O:Source",
            ">",
            "O:ShellCommand",
            "O:ShellArg",
            "T:echo",
            "C:ShellArg",
            "O:ShellArg",
            "O:Literal",
            "T:\"hello\"",
            "C:Literal",
            "C:ShellArg",
            "C:ShellCommand",
            "<",
            "C:Source",
        ]
    );
}

// ── Scenario S9: redirect plus chain in one step ───────────────────────

#[test]
fn redirect_then_chain_is_one_step() {
    let tree = parse("echo a > out && echo b");
    assert_clean(&tree);
    assert_eq!(
        evs(&tree),
        vec![
            "O:Source",
            ">",
            "O:ShellCommand",
            "O:ShellArg",
            "T:echo",
            "C:ShellArg",
            "O:ShellArg",
            "T:a",
            "C:ShellArg",
            "C:ShellCommand",
            "O:Redirect",
            "T:>",
            "O:RedirectTarget",
            "O:ShellArg",
            "T:out",
            "C:ShellArg",
            "C:RedirectTarget",
            "C:Redirect",
            "T:&&",
            "O:ShellCommand",
            "O:ShellArg",
            "T:echo",
            "C:ShellArg",
            "O:ShellArg",
            "T:b",
            "C:ShellArg",
            "C:ShellCommand",
            "<",
            "C:Source",
        ]
    );
}

// ── Scenario S10: struct inside a function body ────────────────────────

#[test]
fn struct_in_block_errors_and_continues() {
    let tree = parse("fun deploy() { struct X {} }\nvar ok = 1");
    assert_eq!(tree.errors.len(), 1, "{:#?}", tree.errors);
    assert!(tree.errors[0]
        .message
        .contains("struct declarations must be at top level"));
    // Parsing continued: the var declaration after it parsed cleanly.
    assert!(evs(&tree).contains(&"O:VarDecl".to_string()));
}

// ── Functions ──────────────────────────────────────────────────────────

#[test]
fn function_with_params_and_defaults() {
    let tree = parse("fun greet(name String, times Int = 1) {\n  echo hi\n}");
    assert_clean(&tree);
    assert_snapshot!(tree.debug_tree(), @r#"
Source
  Function
    'fun'
    'greet'
    ParamList
      '('
      Param
        'name'
        TypeAnnotation
          'String'
      ','
      Param
        'times'
        TypeAnnotation
          'Int'
        DefaultValue
          '='
          Literal
            '1'
      ')'
    Block
      '{'
      Step
        ShellCommand
          ShellArg
            'echo'
          ShellArg
            'hi'
      '}'
"#);
}

#[test]
fn function_with_optional_type() {
    let tree = parse("fun f(tag String?) {}");
    assert_clean(&tree);
}

#[test]
fn function_expression_body_gets_own_step() {
    let tree = parse("fun motd() = echo welcome");
    assert_clean(&tree);
    assert_eq!(
        evs(&tree),
        vec![
            "O:Source",
            "O:Function",
            "T:fun",
            "T:motd",
            "O:ParamList",
            "T:(",
            "T:)",
            "C:ParamList",
            "T:=",
            ">",
            "O:ShellCommand",
            "O:ShellArg",
            "T:echo",
            "C:ShellArg",
            "O:ShellArg",
            "T:welcome",
            "C:ShellArg",
            "C:ShellCommand",
            "<",
            "C:Function",
            "C:Source",
        ]
    );
}

#[test]
fn missing_param_type_is_an_error() {
    let tree = parse("fun greet(name) {}");
    assert_eq!(tree.errors.len(), 1);
    assert!(tree.errors[0].message.contains("missing type annotation"));
    assert_eq!(tree.errors[0].example, "fun greet(name String) {}");
}

#[test]
fn grouped_params_share_trailing_type() {
    // `a, b Int`: only the last name carries the annotation, no errors.
    let tree = parse("fun add(a, b Int) {}");
    assert_clean(&tree);
}

#[test]
fn missing_function_body() {
    let tree = parse("fun ghost()");
    assert_eq!(tree.errors.len(), 1);
    assert!(tree.errors[0].message.contains("missing function body"));
    assert!(!tree.errors[0].suggestion.is_empty());
}

#[test]
fn unclosed_param_list_suggestion() {
    let tree = parse("fun greet( {}");
    assert!(!tree.ok());
    assert!(
        tree.errors.iter().any(|e| {
            e.suggestion == "Add `)` to close the parameter list"
                && e.example == "fun greet(name String) {}"
        }),
        "{:#?}",
        tree.errors
    );
}

// ── Structs and enums ──────────────────────────────────────────────────

#[test]
fn struct_with_fields_and_defaults() {
    let tree = parse("struct Host {\n  name String\n  port Int = 22\n}");
    assert_clean(&tree);
    let events = evs(&tree);
    assert_eq!(
        events.iter().filter(|e| *e == "O:StructField").count(),
        2
    );
}

#[test]
fn struct_inheritance_rejected() {
    let tree = parse("struct Web : Base { name String }");
    assert_eq!(tree.errors.len(), 1);
    assert!(tree.errors[0].message.contains("inheritance"));
    // The body still parsed.
    assert!(evs(&tree).contains(&"O:StructField".to_string()));
}

#[test]
fn struct_method_rejected_and_skipped() {
    let tree = parse("struct S {\n  fun bad() { echo no }\n  name String\n}");
    assert_eq!(tree.errors.len(), 1);
    assert!(tree.errors[0].message.contains("methods are not supported"));
    assert!(evs(&tree).contains(&"O:StructField".to_string()));
}

#[test]
fn enum_members_with_string_defaults() {
    let tree = parse("enum Env {\n  Dev = \"development\"\n  Prod = \"production\"\n}");
    assert_clean(&tree);
    assert_eq!(
        evs(&tree).iter().filter(|e| *e == "O:EnumMember").count(),
        2
    );
}

#[test]
fn enum_non_string_default_rejected() {
    let tree = parse("enum Env { Dev = 3 }");
    assert_eq!(tree.errors.len(), 1);
    assert!(tree.errors[0].message.contains("string literals"));
    assert_eq!(tree.errors[0].example, "enum Env { Prod = \"production\" }");
}

// ── Var declarations ───────────────────────────────────────────────────

#[test]
fn var_block_form() {
    let tree = parse("var (\n  a = 1\n  b = \"two\"\n)");
    assert_clean(&tree);
    assert_eq!(evs(&tree).iter().filter(|e| *e == "O:VarDecl").count(), 2);
    // One step for the whole block form.
    assert_eq!(evs(&tree).iter().filter(|e| *e == ">").count(), 1);
}

#[test]
fn var_missing_value() {
    let tree = parse("var x =");
    assert_eq!(tree.errors.len(), 1);
    assert!(tree.errors[0].message.contains("missing value"));
}

#[test]
fn compound_assignment() {
    let tree = parse("count += 1");
    assert_clean(&tree);
    let events = evs(&tree);
    assert!(events.contains(&"O:Assignment".to_string()));
    assert!(events.contains(&"T:+=".to_string()));
}

// ── Identifier statement classification ────────────────────────────────

#[test]
fn known_function_call() {
    let tree = parse("fun deploy() {}\ndeploy()");
    assert_clean(&tree);
    assert!(evs(&tree).contains(&"O:FunctionCall".to_string()));
}

#[test]
fn unknown_function_call_errors_but_parses() {
    let tree = parse("deploy(1)");
    assert_eq!(tree.errors.len(), 1);
    assert!(tree.errors[0].message.contains("unknown function 'deploy'"));
    assert!(evs(&tree).contains(&"O:FunctionCall".to_string()));
}

#[test]
fn spaced_paren_is_shell_not_call() {
    // `deploy (x)` has whitespace before `(`: shell command, not a call.
    let tree = parse("deploy (x)");
    let events = evs(&tree);
    assert!(events.contains(&"O:ShellCommand".to_string()));
    assert!(!events.contains(&"O:FunctionCall".to_string()));
}

// ── Control flow ───────────────────────────────────────────────────────

#[test]
fn if_else_chain() {
    let tree = parse("if a == 1 {\n  echo one\n} else if a == 2 {\n  echo two\n} else {\n  echo many\n}");
    assert_clean(&tree);
    let events = evs(&tree);
    assert_eq!(events.iter().filter(|e| *e == "O:If").count(), 2);
    assert_eq!(events.iter().filter(|e| *e == "O:Else").count(), 2);
}

#[test]
fn control_flow_has_no_step_but_inner_statements_do() {
    let tree = parse("if ready {\n  echo go\n}");
    assert_clean(&tree);
    let events = evs(&tree);
    // Exactly one step: the shell command inside the block.
    assert_eq!(events.iter().filter(|e| *e == ">").count(), 1);
    let if_pos = events.iter().position(|e| e == "O:If").unwrap();
    let step_pos = events.iter().position(|e| e == ">").unwrap();
    assert!(step_pos > if_pos, "step must be inside the if, not around it");
}

#[test]
fn for_over_range() {
    let tree = parse("for i in 1...5 {\n  echo @var.i\n}");
    assert_clean(&tree);
    assert!(evs(&tree).contains(&"O:Range".to_string()));
}

#[test]
fn for_over_decorator_range() {
    let tree = parse("for i in @var.lo...@var.hi {\n  echo hi\n}");
    assert_clean(&tree);
    assert!(evs(&tree).contains(&"O:Range".to_string()));
}

#[test]
fn for_missing_in() {
    let tree = parse("for host hosts { echo hi }");
    assert!(!tree.ok());
    let err = &tree.errors[0];
    assert!(err.message.contains("expected `in`"));
    assert_eq!(
        err.suggestion,
        "Add `in` between the loop variable and its collection"
    );
}

#[test]
fn for_missing_collection_has_note() {
    let tree = parse("for host in { echo hi }");
    assert!(!tree.ok());
    assert!(tree
        .errors
        .iter()
        .any(|e| e.note == "for loops unroll at plan-time"));
}

#[test]
fn try_catch_finally() {
    let tree = parse("try {\n  risky\n} catch {\n  echo failed\n} finally {\n  echo done\n}");
    assert_clean(&tree);
    let events = evs(&tree);
    assert!(events.contains(&"O:Try".to_string()));
    assert!(events.contains(&"O:Catch".to_string()));
    assert!(events.contains(&"O:Finally".to_string()));
}

#[test]
fn orphan_clauses_are_errors() {
    for (source, fragment) in [
        ("else { echo hi }", "`else` without a matching `if`"),
        ("catch { echo hi }", "`catch` without a matching `try`"),
        ("finally { echo hi }", "`finally` without a matching `try`"),
    ] {
        let tree = parse(source);
        assert!(
            tree.errors.iter().any(|e| e.message.contains(fragment)),
            "missing {fragment:?} for {source:?}: {:#?}",
            tree.errors
        );
    }
}

// ── When ───────────────────────────────────────────────────────────────

#[test]
fn when_arms_all_pattern_kinds() {
    let tree = parse(concat!(
        "when @env.STAGE {\n",
        "  \"prod\" -> echo production\n",
        "  r\"dev.*\" -> echo development\n",
        "  200 ... 299 -> echo ok\n",
        "  \"a\" | \"b\" -> echo ab\n",
        "  else -> echo other\n",
        "}"
    ));
    assert_clean(&tree);
    let events = evs(&tree);
    assert_eq!(events.iter().filter(|e| *e == "O:WhenArm").count(), 5);
    assert!(events.contains(&"O:PatternRegex".to_string()));
    assert!(events.contains(&"O:PatternRange".to_string()));
    assert!(events.contains(&"O:PatternOr".to_string()));
    assert!(events.contains(&"O:PatternElse".to_string()));
}

#[test]
fn when_arm_block_body() {
    let tree = parse("when x {\n  \"a\" -> {\n    echo a\n  }\n}");
    assert_clean(&tree);
}

#[test]
fn when_qualified_ref_pattern() {
    let tree = parse("when env {\n  Env.Prod -> echo prod\n}");
    assert_clean(&tree);
    assert!(evs(&tree).contains(&"O:QualifiedRef".to_string()));
}

#[test]
fn when_missing_arrow() {
    let tree = parse("when x {\n  \"a\" echo a\n}");
    assert!(!tree.ok());
    assert!(tree.errors[0].message.contains("expected `->`"));
}

// ── Expressions ────────────────────────────────────────────────────────

#[test]
fn binary_precedence_shape() {
    let tree = parse("var x = 1 + 2 * 3");
    assert_clean(&tree);
    assert_snapshot!(tree.debug_tree(), @r"
Source
  Step
    VarDecl
      'var'
      'x'
      '='
      BinaryExpr
        Literal
          '1'
        '+'
        BinaryExpr
          Literal
            '2'
          '*'
          Literal
            '3'
");
}

#[test]
fn comparison_and_logic() {
    let tree = parse("var ok = a >= 2 && b != c || !d");
    assert_clean(&tree);
    let events = evs(&tree);
    assert_eq!(events.iter().filter(|e| *e == "O:BinaryExpr").count(), 4);
    assert!(events.contains(&"O:UnaryExpr".to_string()));
}

#[test]
fn postfix_prefix_and_cast() {
    let tree = parse("var a = x++\nvar b = --y\nvar c = n as String?");
    assert_clean(&tree);
    let events = evs(&tree);
    assert!(events.contains(&"O:PostfixExpr".to_string()));
    assert!(events.contains(&"O:PrefixExpr".to_string()));
    assert!(events.contains(&"O:TypeCast".to_string()));
}

#[test]
fn qualified_ref_two_segments_only() {
    let tree = parse("var x = Env.Prod");
    assert_clean(&tree);
    assert!(evs(&tree).contains(&"O:QualifiedRef".to_string()));

    let tree = parse("var x = a.b.c");
    assert_eq!(tree.errors.len(), 1);
    assert!(tree.errors[0].message.contains("exactly two segments"));
}

#[test]
fn array_and_object_literals() {
    let tree = parse("var xs = [1, 2, 3,]\nvar o = { name: \"x\", deep: { on: true } }");
    assert_clean(&tree);
    let events = evs(&tree);
    assert_eq!(events.iter().filter(|e| *e == "O:ArrayLiteral").count(), 1);
    assert_eq!(events.iter().filter(|e| *e == "O:ObjectLiteral").count(), 2);
    assert_eq!(events.iter().filter(|e| *e == "O:ObjectField").count(), 3);
}

#[test]
fn duration_literal_expression() {
    let tree = parse("var t = 30s");
    assert_clean(&tree);
    assert!(evs(&tree).contains(&"T:30s".to_string()));
}

// ── Strings and interpolation ──────────────────────────────────────────

#[test]
fn interpolated_string_structure() {
    let tree = parse("var home = \"dir: @env.HOME!\"");
    assert_clean(&tree);
    let events = evs(&tree);
    assert!(events.contains(&"O:InterpolatedString".to_string()));
    // literal "dir: ", decorator @env.HOME, literal "!"
    assert_eq!(events.iter().filter(|e| *e == "O:StringPart").count(), 3);
    assert_eq!(events.iter().filter(|e| *e == "O:Decorator").count(), 1);
}

#[test]
fn email_in_string_stays_literal() {
    let tree = parse("var mail = \"user@example.com\"");
    assert_clean(&tree);
    let events = evs(&tree);
    assert!(!events.contains(&"O:InterpolatedString".to_string()));
    assert!(events.contains(&"O:Literal".to_string()));
}

#[test]
fn single_quotes_never_interpolate() {
    let tree = parse("var raw = 'home: @env.HOME'");
    assert_clean(&tree);
    assert!(!evs(&tree).contains(&"O:InterpolatedString".to_string()));
}

// ── Recovery ───────────────────────────────────────────────────────────

#[test]
fn garbage_still_produces_balanced_tree() {
    let tree = parse(")))) ]]] ,,, ::");
    // No hang, no panic, events balanced (checked via the rowan view).
    let _ = tree.syntax();
}

#[test]
fn empty_input() {
    let tree = parse("");
    assert_clean(&tree);
    assert_eq!(evs(&tree), vec!["O:Source", "C:Source"]);
}

#[test]
fn comments_and_blank_lines_are_invisible() {
    let tree = parse("# a comment\n\nvar x = 1 # trailing\n");
    assert_clean(&tree);
    let events = evs(&tree);
    assert!(!events.iter().any(|e| e.starts_with("T:#")));
}
