//! Declaration parsers: functions, structs, enums, variable declarations,
//! plus the classifier for statements that start with a bare identifier
//! (function call vs. assignment vs. shell command).

use opal_common::TokenKind;

use crate::event::NodeKind;

use super::{expressions, shell, Parser};

// ── Function Declaration ─────────────────────────────────────────────────

/// Parse `fun name [paramList] ( = body | block )`.
pub(crate) fn function_decl(p: &mut Parser) {
    p.trace_enter("function_decl");
    let m = p.open(NodeKind::Function);

    p.bump(); // fun

    if p.at(TokenKind::Ident) {
        p.bump();
    } else {
        p.error_expected(TokenKind::Ident, "function name");
    }

    if p.at(TokenKind::LParen) {
        param_list(p);
    }

    if p.at(TokenKind::Eq) {
        // Expression-bodied form: the body is one executable step.
        p.bump(); // =
        p.step(|p| match p.current() {
            TokenKind::At => super::decorators::decorator_statement(p),
            TokenKind::Ident => identifier_statement(p),
            TokenKind::Newline | TokenKind::Eof => {
                p.error_with_details(
                    "missing function body after `=`",
                    "function body",
                    "Add an expression or shell command after `=`",
                );
            }
            _ => {
                expressions::expr(p);
            }
        });
    } else if p.at(TokenKind::LBrace) {
        p.block("function body");
    } else {
        p.error_full(
            "missing function body",
            "function body",
            "Add a `{ … }` block or `= expression` body",
            "fun deploy() { echo deploying }",
            "",
        );
    }

    p.close(m);
    p.trace_exit("function_decl");
}

// ── Parameter List ───────────────────────────────────────────────────────

/// Parse `( (param ( ',' param )* )? )`.
pub(crate) fn param_list(p: &mut Parser) {
    let m = p.open(NodeKind::ParamList);
    p.bump(); // (
    p.skip_newlines();

    if !p.at(TokenKind::RParen) && !p.at(TokenKind::Eof) {
        loop {
            param(p);
            p.skip_newlines();
            if p.eat(TokenKind::Comma) {
                p.skip_newlines();
                if p.at(TokenKind::RParen) {
                    break; // trailing comma
                }
            } else {
                break;
            }
        }
    }

    p.expect(TokenKind::RParen, "parameter list");
    p.close(m);
}

/// Parse one parameter: `name Type[?] [= defaultExpr]`.
///
/// Type annotations are required; `name, alias Type` groups share the
/// trailing annotation and only its last member carries the node.
fn param(p: &mut Parser) {
    let m = p.open(NodeKind::Param);

    if p.at(TokenKind::Ident) {
        p.bump();
    } else {
        p.error_expected(TokenKind::Ident, "parameter name");
        p.close(m);
        return;
    }

    if at_type_annotation(p) {
        let ann = p.open(NodeKind::TypeAnnotation);
        p.bump(); // type name
        if p.at(TokenKind::Question) {
            p.bump();
        }
        p.close(ann);
    } else if !grouped_name_ahead(p) {
        p.error_full(
            "missing type annotation for parameter",
            "parameter list",
            "Every parameter needs a type, like `name String`",
            "fun greet(name String) {}",
            "",
        );
    }

    if p.at(TokenKind::Eq) {
        let def = p.open(NodeKind::DefaultValue);
        p.bump(); // =
        expressions::expr(p);
        p.close(def);
    }

    p.close(m);
}

/// Go-style annotation check: the current token is an identifier whose
/// next token terminates a parameter (or is `?` followed by one).
fn at_type_annotation(p: &Parser) -> bool {
    if p.current() != TokenKind::Ident {
        return false;
    }
    let terminates = |k: TokenKind| {
        matches!(
            k,
            TokenKind::Comma
                | TokenKind::RParen
                | TokenKind::Eq
                | TokenKind::Newline
                | TokenKind::LBrace
                | TokenKind::RBrace
                | TokenKind::Eof
        )
    };
    terminates(p.nth(1)) || (p.nth(1) == TokenKind::Question && terminates(p.nth(2)))
}

/// After a bare name, look ahead for `, alias Type` grouping so the
/// missing-annotation diagnostic stays quiet for `a, b Int`.
fn grouped_name_ahead(p: &Parser) -> bool {
    let mut k = 0;
    loop {
        if p.nth(k) != TokenKind::Comma || p.nth(k + 1) != TokenKind::Ident {
            return false;
        }
        match p.nth(k + 2) {
            TokenKind::Ident => return true,
            TokenKind::Comma => k += 2,
            _ => return false,
        }
    }
}

// ── Struct Declaration ───────────────────────────────────────────────────

/// Parse `struct Name { field Type [= default], ... }`.
///
/// Inheritance clauses and method declarations are rejected with
/// dedicated diagnostics; the balanced skipper resumes on the next
/// field delimiter.
pub(crate) fn struct_decl(p: &mut Parser) {
    p.trace_enter("struct_decl");
    let m = p.open(NodeKind::StructDecl);

    p.bump(); // struct

    if p.at(TokenKind::Ident) {
        p.bump();
    } else {
        p.error_expected(TokenKind::Ident, "struct name");
    }

    if p.at(TokenKind::Colon) || (p.at(TokenKind::Ident) && p.current_text() == "extends") {
        p.error_with_details(
            "struct inheritance is not supported",
            "struct declaration",
            "Use composition: add a field of the base struct type instead",
        );
        while !p.at(TokenKind::LBrace) && !p.at(TokenKind::Eof) && !p.at(TokenKind::Newline) {
            p.bump_raw();
        }
    }

    if !p.expect(TokenKind::LBrace, "struct body") {
        p.close(m);
        p.trace_exit("struct_decl");
        return;
    }

    loop {
        p.skip_newlines();
        if p.at(TokenKind::RBrace) || p.at(TokenKind::Eof) {
            break;
        }

        if p.at(TokenKind::Fun) {
            p.error_with_details(
                "struct methods are not supported",
                "struct body",
                "Declare the function at top level and pass the struct to it",
            );
            skip_balanced(p);
            continue;
        }
        if p.at(TokenKind::Ident) && p.nth(1) == TokenKind::LParen {
            p.error_with_details(
                "struct methods are not supported",
                "struct body",
                "Struct bodies contain only `name Type` fields",
            );
            skip_balanced(p);
            continue;
        }

        let before = p.checkpoint();
        struct_field(p);
        p.eat(TokenKind::Comma);
        if p.checkpoint() == before {
            p.bump_raw();
        }
    }

    p.expect(TokenKind::RBrace, "struct body");
    p.close(m);
    p.trace_exit("struct_decl");
}

/// Parse one struct field: `name Type[?] [= default]`.
fn struct_field(p: &mut Parser) {
    let m = p.open(NodeKind::StructField);

    if p.at(TokenKind::Ident) {
        p.bump();
    } else {
        p.error_expected(TokenKind::Ident, "struct field");
        p.close(m);
        return;
    }

    if at_type_annotation(p) {
        let ann = p.open(NodeKind::TypeAnnotation);
        p.bump();
        if p.at(TokenKind::Question) {
            p.bump();
        }
        p.close(ann);
    } else if !grouped_name_ahead(p) {
        p.error_full(
            "missing type annotation for field",
            "struct body",
            "Every field needs a type, like `name String`",
            "struct Host { name String }",
            "",
        );
    }

    if p.at(TokenKind::Eq) {
        let def = p.open(NodeKind::DefaultValue);
        p.bump();
        expressions::expr(p);
        p.close(def);
    }

    p.close(m);
}

/// Walk past a rejected construct, balancing `()`, `[]`, and `{}`,
/// stopping at the next delimiter at depth zero.
fn skip_balanced(p: &mut Parser) {
    let mut depth: u32 = 0;
    loop {
        match p.current() {
            TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => {
                depth += 1;
                p.bump_raw();
            }
            TokenKind::RParen | TokenKind::RBracket => {
                if depth == 0 {
                    return;
                }
                depth -= 1;
                p.bump_raw();
            }
            TokenKind::RBrace => {
                if depth == 0 {
                    return;
                }
                depth -= 1;
                p.bump_raw();
            }
            TokenKind::Comma | TokenKind::Newline if depth == 0 => return,
            TokenKind::Eof => return,
            _ => p.bump_raw(),
        }
    }
}

// ── Enum Declaration ─────────────────────────────────────────────────────

/// Parse `enum Name [Type] { Member [= "literal"], ... }`.
pub(crate) fn enum_decl(p: &mut Parser) {
    p.trace_enter("enum_decl");
    let m = p.open(NodeKind::EnumDecl);

    p.bump(); // enum

    if p.at(TokenKind::Ident) {
        p.bump();
    } else {
        p.error_expected(TokenKind::Ident, "enum name");
    }

    // Optional backing type: `enum Env String { … }`.
    if p.at(TokenKind::Ident) {
        let ann = p.open(NodeKind::TypeAnnotation);
        p.bump();
        p.close(ann);
    }

    if !p.expect(TokenKind::LBrace, "enum body") {
        p.close(m);
        p.trace_exit("enum_decl");
        return;
    }

    loop {
        p.skip_newlines();
        if p.at(TokenKind::RBrace) || p.at(TokenKind::Eof) {
            break;
        }

        let before = p.checkpoint();
        enum_member(p);
        p.eat(TokenKind::Comma);
        if p.checkpoint() == before {
            p.bump_raw();
        }
    }

    p.expect(TokenKind::RBrace, "enum body");
    p.close(m);
    p.trace_exit("enum_decl");
}

/// Parse one enum member: `Name [= "string"]`. Defaults must be strings.
fn enum_member(p: &mut Parser) {
    let m = p.open(NodeKind::EnumMember);

    if p.at(TokenKind::Ident) {
        p.bump();
    } else {
        p.error_expected(TokenKind::Ident, "enum member");
        p.close(m);
        return;
    }

    if p.at(TokenKind::Eq) {
        p.bump();
        if p.at(TokenKind::String) {
            let lit = p.open(NodeKind::Literal);
            p.bump();
            p.close(lit);
        } else {
            p.error_full(
                "enum member defaults must be string literals",
                "enum body",
                "Use a quoted string as the member value",
                "enum Env { Prod = \"production\" }",
                "",
            );
            if !p.at(TokenKind::RBrace) && !p.at(TokenKind::Newline) && !p.at(TokenKind::Eof) {
                p.bump_raw();
            }
        }
    }

    p.close(m);
}

// ── Variable Declaration ─────────────────────────────────────────────────

/// Parse `var name = expr` or the block form
/// `var ( name = expr (newline|;)+ ... )`.
pub(crate) fn var_decl(p: &mut Parser) {
    p.trace_enter("var_decl");
    if p.nth(1) == TokenKind::LParen {
        // Block form: the `var ( )` tokens frame one binding per line.
        p.bump(); // var
        p.bump(); // (
        loop {
            while matches!(p.current(), TokenKind::Newline | TokenKind::Semicolon) {
                p.bump_raw();
            }
            if p.at(TokenKind::RParen) || p.at(TokenKind::Eof) {
                break;
            }
            let before = p.checkpoint();
            var_binding(p);
            if p.checkpoint() == before {
                p.bump_raw();
            }
        }
        p.expect(TokenKind::RParen, "variable block");
    } else {
        let m = p.open(NodeKind::VarDecl);
        p.bump(); // var
        if p.at(TokenKind::Ident) {
            p.bump();
        } else {
            p.error_expected(TokenKind::Ident, "variable name");
        }
        if p.expect(TokenKind::Eq, "variable declaration") {
            if p.at_any(&[TokenKind::Newline, TokenKind::Eof]) {
                p.error_with_details(
                    "missing value after `=`",
                    "variable declaration",
                    "Give the variable an initial value",
                );
            } else {
                expressions::expr(p);
            }
        }
        p.close(m);
    }
    p.trace_exit("var_decl");
}

/// One `name = expr` binding inside a `var ( … )` block.
fn var_binding(p: &mut Parser) {
    let m = p.open(NodeKind::VarDecl);
    if p.at(TokenKind::Ident) {
        p.bump();
    } else {
        p.error_expected(TokenKind::Ident, "variable name");
        p.close(m);
        return;
    }
    if p.expect(TokenKind::Eq, "variable declaration") {
        if p.at_any(&[
            TokenKind::Newline,
            TokenKind::Semicolon,
            TokenKind::RParen,
            TokenKind::Eof,
        ]) {
            p.error_with_details(
                "missing value after `=`",
                "variable declaration",
                "Give the variable an initial value",
            );
        } else {
            expressions::expr(p);
        }
    }
    p.close(m);
}

// ── Identifier Statement ─────────────────────────────────────────────────

/// Classify a statement that starts with a bare identifier:
///
/// 1. `name(` with the paren adjacent is a function call; unknown names
///    get an error but still parse as a call.
/// 2. `name +=` (or any compound assignment) is an assignment.
/// 3. Anything else is a shell command.
pub(crate) fn identifier_statement(p: &mut Parser) {
    if p.nth(1) == TokenKind::LParen && !p.nth_token(1).has_space_before {
        let name = p.current_text().to_string();
        if !p.is_known_function(&name) {
            p.error_with_details(
                &format!("unknown function '{name}'"),
                "statement",
                &format!("Declare it with `fun {name}(…) {{ … }}` before calling it"),
            );
        }
        function_call(p);
        return;
    }

    if p.nth(1).is_assignment_op() {
        assignment(p);
        return;
    }

    shell::shell_statement(p);
}

/// Parse `name(arg, …)` as a FunctionCall node.
fn function_call(p: &mut Parser) {
    p.trace_enter("function_call");
    let m = p.open(NodeKind::FunctionCall);
    p.bump(); // name
    p.bump(); // (
    p.skip_newlines();
    if !p.at(TokenKind::RParen) && !p.at(TokenKind::Eof) {
        loop {
            expressions::expr(p);
            p.skip_newlines();
            if p.eat(TokenKind::Comma) {
                p.skip_newlines();
                if p.at(TokenKind::RParen) {
                    break;
                }
            } else {
                break;
            }
        }
    }
    p.expect(TokenKind::RParen, "argument list");
    p.close(m);
    p.trace_exit("function_call");
}

/// Parse `name op= expr` as an Assignment node.
fn assignment(p: &mut Parser) {
    let m = p.open(NodeKind::Assignment);
    p.bump(); // name
    p.bump(); // compound assignment operator
    if matches!(p.current(), TokenKind::Newline | TokenKind::Eof) {
        p.error_with_details(
            "missing value after assignment operator",
            "assignment",
            "Give the assignment a right-hand side",
        );
    } else {
        expressions::expr(p);
    }
    p.close(m);
}
