use super::Parser;
use crate::arena::AstArena;
use crate::ast::{AstContext, BinaryOp, DecTarget, Expr, ExprKind, Program, StmtKind};
use crate::error::Diagnostic;
use crate::intern::Interner;
use crate::lexer::Lexer;

fn with_program<R>(source: &str, f: impl FnOnce(&Program<'_>, &Interner) -> R) -> R {
    let mut interner = Interner::new();
    let tokens = Lexer::new(source, &mut interner)
        .tokenize()
        .expect("scan should succeed");
    let arena = AstArena::new();
    let ctx = AstContext::new(&arena);
    let mut parser = Parser::new(tokens, &mut interner, ctx);
    let program = parser.parse_program().expect("parse should succeed");
    f(&program, &interner)
}

fn parse_err(source: &str) -> Diagnostic {
    let mut interner = Interner::new();
    let tokens = Lexer::new(source, &mut interner)
        .tokenize()
        .expect("scan should succeed");
    let arena = AstArena::new();
    let ctx = AstContext::new(&arena);
    let mut parser = Parser::new(tokens, &mut interner, ctx);
    parser.parse_program().expect_err("parse should fail")
}

#[test]
fn dec_binds_a_name_with_initializer() {
    with_program("dec total = 42", |program, interner| {
        assert_eq!(program.body.len(), 1);
        match &program.body[0].kind {
            StmtKind::Dec { target, exposed, secret, .. } => {
                assert!(!exposed);
                assert!(!secret);
                match target {
                    DecTarget::Name(sym) => assert_eq!(interner.resolve(*sym), "total"),
                    other => panic!("expected scalar target, got {:?}", other),
                }
            }
            other => panic!("expected dec, got {:?}", other),
        }
    });
}

#[test]
fn dec_without_initializer_fails() {
    let err = parse_err("dec total");
    assert!(err.message.contains("initializer"), "{}", err.message);
}

#[test]
fn expose_and_secret_modifiers() {
    with_program("expose dec a = 1\nsecret dec k = \"s\"", |program, _| {
        match &program.body[0].kind {
            StmtKind::Dec { exposed, .. } => assert!(exposed),
            other => panic!("expected dec, got {:?}", other),
        }
        match &program.body[1].kind {
            StmtKind::Dec { secret, .. } => assert!(secret),
            other => panic!("expected dec, got {:?}", other),
        }
    });
}

#[test]
fn secret_is_rejected_on_functions() {
    let err = parse_err("secret fn f() { return 1 }");
    assert!(err.message.contains("'secret'"), "{}", err.message);
}

#[test]
fn expose_requires_a_declaration() {
    let err = parse_err("expose 1 + 2");
    assert!(err.message.contains("'expose'"), "{}", err.message);
}

#[test]
fn object_destructure_with_rename() {
    with_program("dec { a, b: wide } = source", |program, interner| {
        match &program.body[0].kind {
            StmtKind::Dec { target: DecTarget::Object(props), .. } => {
                assert_eq!(props.len(), 2);
                assert_eq!(interner.resolve(props[0].key), "a");
                assert_eq!(interner.resolve(props[0].binding), "a");
                assert_eq!(interner.resolve(props[1].key), "b");
                assert_eq!(interner.resolve(props[1].binding), "wide");
            }
            other => panic!("expected object destructure, got {:?}", other),
        }
    });
}

#[test]
fn array_destructure_with_hole() {
    with_program("dec [first, , third] = triple", |program, _| {
        match &program.body[0].kind {
            StmtKind::Dec { target: DecTarget::Array(elements), .. } => {
                assert_eq!(elements.len(), 3);
                assert!(elements[0].is_some());
                assert!(elements[1].is_none());
                assert!(elements[2].is_some());
            }
            other => panic!("expected array destructure, got {:?}", other),
        }
    });
}

#[test]
fn reassigning_a_dec_root_fails_with_full_path() {
    let err = parse_err("dec obj = { foo: { bar: \"b\" } }\nobj.foo.bar = \"x\"");
    assert!(
        err.message.contains("Cannot reassign 'obj.foo.bar'"),
        "{}",
        err.message
    );
}

#[test]
fn compound_assignment_to_dec_binding_fails() {
    let err = parse_err("dec n = 1\nn += 2");
    assert!(err.message.contains("Cannot reassign 'n'"), "{}", err.message);
}

#[test]
fn computed_member_reassignment_names_the_index() {
    let err = parse_err("dec rows = [1, 2]\nrows[0] = 9");
    assert!(err.message.contains("Cannot reassign 'rows[0]'"), "{}", err.message);
}

#[test]
fn assignment_to_unbound_name_parses() {
    with_program("counter = 1\ncounter += 1", |program, _| {
        assert_eq!(program.body.len(), 2);
    });
}

#[test]
fn function_scope_limits_immutability() {
    // The inner `dec x` dies with the function scope; top-level `x = 2`
    // refers to some other binding and must still parse.
    with_program("fn f() {\n  dec x = 1\n}\nx = 2", |program, _| {
        assert_eq!(program.body.len(), 2);
    });
}

#[test]
fn memo_async_function_flags() {
    with_program("memo async fn slow(n) { return n }", |program, _| {
        match &program.body[0].kind {
            StmtKind::Function { is_async, memoized, params, .. } => {
                assert!(is_async);
                assert!(memoized);
                assert_eq!(params.len(), 1);
            }
            other => panic!("expected function, got {:?}", other),
        }
    });
}

#[test]
fn elif_becomes_nested_else_if() {
    with_program(
        "if a { print 1 } elif b { print 2 } else { print 3 }",
        |program, _| {
            match &program.body[0].kind {
                StmtKind::If { alternate: Some(stmt), .. } => match &stmt.kind {
                    StmtKind::If { alternate: Some(inner), .. } => {
                        assert!(matches!(inner.kind, StmtKind::Block(_)));
                    }
                    other => panic!("expected nested if, got {:?}", other),
                },
                other => panic!("expected if with alternate, got {:?}", other),
            }
        },
    );
}

#[test]
fn enum_members_with_explicit_values() {
    with_program("enum Color { RED, GREEN = 10, BLUE }", |program, _| {
        match &program.body[0].kind {
            StmtKind::EnumDecl { members, .. } => {
                assert_eq!(members.len(), 3);
                assert_eq!(members[0].value, None);
                assert_eq!(members[1].value, Some(10));
                assert_eq!(members[2].value, None);
            }
            other => panic!("expected enum, got {:?}", other),
        }
    });
}

#[test]
fn dep_with_dotted_path_and_overrides() {
    with_program("as mailer dep services.mail({ retries: 3 })", |program, interner| {
        match &program.body[0].kind {
            StmtKind::Dep { alias, path, overrides } => {
                assert_eq!(interner.resolve(*alias), "mailer");
                let segments: Vec<&str> =
                    path.iter().map(|s| interner.resolve(*s)).collect();
                assert_eq!(segments, vec!["services", "mail"]);
                assert!(overrides.is_some());
            }
            other => panic!("expected dep, got {:?}", other),
        }
    });
}

#[test]
fn arg_and_env_required_markers() {
    with_program("arg !apiUrl\nenv PORT = 3000", |program, _| {
        match &program.body[0].kind {
            StmtKind::Arg { required, default, .. } => {
                assert!(required);
                assert!(default.is_none());
            }
            other => panic!("expected arg, got {:?}", other),
        }
        match &program.body[1].kind {
            StmtKind::Env { required, default, .. } => {
                assert!(!required);
                assert!(default.is_some());
            }
            other => panic!("expected env, got {:?}", other),
        }
    });
}

// ----------------------------------------------------------------------
// `|` disambiguation
// ----------------------------------------------------------------------

#[test]
fn bar_pair_with_fat_arrow_is_a_pattern_match() {
    with_program(
        "| score > 90 | => print \"A\"\n| score > 80 | => print \"B\"",
        |program, _| {
            assert_eq!(program.body.len(), 1, "adjacent guards accumulate");
            match &program.body[0].kind {
                StmtKind::PatternMatch { arms, is_regex } => {
                    assert_eq!(arms.len(), 2);
                    assert!(!is_regex);
                }
                other => panic!("expected pattern match, got {:?}", other),
            }
        },
    );
}

#[test]
fn bar_without_fat_arrow_is_bitwise_or() {
    with_program("dec mask = flags | 4", |program, _| {
        match &program.body[0].kind {
            StmtKind::Dec { init, .. } => match &init.kind {
                ExprKind::Binary { op: BinaryOp::BitOr, .. } => {}
                other => panic!("expected bitwise-or, got {:?}", other),
            },
            other => panic!("expected dec, got {:?}", other),
        }
    });
}

#[test]
fn guard_with_arrow_on_next_line_still_matches() {
    with_program("| ready |\n=> print \"go\"", |program, _| {
        assert!(matches!(
            program.body[0].kind,
            StmtKind::PatternMatch { .. }
        ));
    });
}

#[test]
fn regex_guard_form() {
    with_program("/^ab+/ => print \"match\"\n/c$/ => print \"other\"", |program, _| {
        match &program.body[0].kind {
            StmtKind::PatternMatch { arms, is_regex } => {
                assert!(is_regex);
                assert_eq!(arms.len(), 2);
            }
            other => panic!("expected regex match, got {:?}", other),
        }
    });
}

#[test]
fn guards_allow_logical_operators() {
    with_program("| x > 1 && y < 2 | => print \"both\"", |program, _| {
        match &program.body[0].kind {
            StmtKind::PatternMatch { arms, .. } => match &arms[0].guard.kind {
                ExprKind::Binary { op: BinaryOp::And, .. } => {}
                other => panic!("expected &&, got {:?}", other),
            },
            other => panic!("expected pattern match, got {:?}", other),
        }
    });
}

// ----------------------------------------------------------------------
// Flow, pipe, ranges
// ----------------------------------------------------------------------

#[test]
fn flow_at_statement_head() {
    with_program("transform >> addOne double", |program, interner| {
        match &program.body[0].kind {
            StmtKind::Expression(expr) => match &expr.kind {
                ExprKind::Flow { target, functions } => {
                    assert_eq!(interner.resolve(*target), "transform");
                    let names: Vec<&str> =
                        functions.iter().map(|s| interner.resolve(*s)).collect();
                    assert_eq!(names, vec!["addOne", "double"]);
                }
                other => panic!("expected flow, got {:?}", other),
            },
            other => panic!("expected expression statement, got {:?}", other),
        }
    });
}

#[test]
fn shr_with_numeric_operand_is_a_shift() {
    with_program("dec shifted = bits >> 2", |program, _| {
        match &program.body[0].kind {
            StmtKind::Dec { init, .. } => match &init.kind {
                ExprKind::Binary { op: BinaryOp::Shr, .. } => {}
                other => panic!("expected shift, got {:?}", other),
            },
            other => panic!("expected dec, got {:?}", other),
        }
    });
}

#[test]
fn pipe_is_left_associative() {
    with_program("dec r = 5 ~> double ~> addOne", |program, interner| {
        match &program.body[0].kind {
            StmtKind::Dec { init, .. } => match &init.kind {
                ExprKind::Pipe { left, right } => {
                    // Outer right is addOne; inner pipe is 5 ~> double.
                    match &right.kind {
                        ExprKind::Identifier(sym) => {
                            assert_eq!(interner.resolve(*sym), "addOne")
                        }
                        other => panic!("expected identifier, got {:?}", other),
                    }
                    assert!(matches!(left.kind, ExprKind::Pipe { .. }));
                }
                other => panic!("expected pipe, got {:?}", other),
            },
            other => panic!("expected dec, got {:?}", other),
        }
    });
}

#[test]
fn range_is_half_open_pair() {
    with_program("dec r = 0..5", |program, _| {
        match &program.body[0].kind {
            StmtKind::Dec { init, .. } => {
                assert!(matches!(init.kind, ExprKind::Range { .. }));
            }
            other => panic!("expected dec, got {:?}", other),
        }
    });
}

// ----------------------------------------------------------------------
// Template strings
// ----------------------------------------------------------------------

fn template_of<'p, 'a>(program: &'p Program<'a>) -> (&'p Vec<crate::intern::Symbol>, &'p Vec<&'a Expr<'a>>) {
    match &program.body[0].kind {
        StmtKind::Dec { init, .. } => match &init.kind {
            ExprKind::Template { parts, exprs } => (parts, exprs),
            other => panic!("expected template, got {:?}", other),
        },
        other => panic!("expected dec, got {:?}", other),
    }
}

#[test]
fn template_alternates_parts_and_expressions() {
    with_program(r#"dec s = "sum: ${a + b}, done""#, |program, interner| {
        let (parts, exprs) = template_of(program);
        assert_eq!(parts.len(), 2);
        assert_eq!(exprs.len(), 1);
        assert_eq!(interner.resolve(parts[0]), "sum: ");
        assert_eq!(interner.resolve(parts[1]), ", done");
        assert!(matches!(exprs[0].kind, ExprKind::Binary { .. }));
    });
}

#[test]
fn template_expression_parses_nested_calls() {
    with_program(r#"dec s = "v: ${items.filter(pick).length}""#, |program, _| {
        let (parts, exprs) = template_of(program);
        assert_eq!(parts.len(), 2);
        assert!(matches!(exprs[0].kind, ExprKind::Member { .. }));
    });
}

#[test]
fn malformed_template_expression_fails_the_parse() {
    let err = parse_err(r#"dec s = "v: ${a +}""#);
    assert!(err.message.contains("template"), "{}", err.message);
}

// ----------------------------------------------------------------------
// JS and shell blocks
// ----------------------------------------------------------------------

#[test]
fn js_block_reassembles_strict_equality() {
    with_program("dec ok = js(a) { return a === 1; }", |program, interner| {
        match &program.body[0].kind {
            StmtKind::Dec { init, .. } => match &init.kind {
                ExprKind::JsBlock { body, .. } => {
                    let text = interner.resolve(*body);
                    assert!(text.contains("==="), "{text}");
                    assert!(!text.contains("== ="), "{text}");
                }
                other => panic!("expected js block, got {:?}", other),
            },
            other => panic!("expected dec, got {:?}", other),
        }
    });
}

#[test]
fn js_block_logging_a_secret_fails() {
    let err = parse_err("secret dec k = \"s\"\njs(k) { console.log(k); }");
    assert!(err.message.contains("'k'"), "{}", err.message);
    assert!(err.message.contains("console"), "{}", err.message);
}

#[test]
fn js_block_using_a_secret_without_console_parses() {
    with_program("secret dec k = \"s\"\njs(k) { send(k); }", |program, _| {
        assert_eq!(program.body.len(), 2);
    });
}

#[test]
fn js_block_with_non_secret_console_parses() {
    with_program("dec v = 1\njs(v) { console.log(v); }", |program, _| {
        assert_eq!(program.body.len(), 2);
    });
}

#[test]
fn shell_block_expression() {
    with_program("dec out = shell(host) { ping -c 1 $host }", |program, interner| {
        match &program.body[0].kind {
            StmtKind::Dec { init, .. } => match &init.kind {
                ExprKind::ShellBlock { inputs, body } => {
                    assert_eq!(inputs.len(), 1);
                    assert_eq!(interner.resolve(*body), "ping -c 1 $host");
                }
                other => panic!("expected shell block, got {:?}", other),
            },
            other => panic!("expected dec, got {:?}", other),
        }
    });
}

// ----------------------------------------------------------------------
// Test-harness statements
// ----------------------------------------------------------------------

#[test]
fn describe_test_expect_assert() {
    let source = "describe \"math\" {\n  test \"adds\" {\n    expect add(1, 2) toEqual 3\n    assert true, \"sanity\"\n  }\n}";
    with_program(source, |program, interner| {
        match &program.body[0].kind {
            StmtKind::DescribeBlock { body, .. } => match &body[0].kind {
                StmtKind::TestBlock { body, .. } => {
                    match &body[0].kind {
                        StmtKind::ExpectStmt { matcher, expected, .. } => {
                            assert_eq!(interner.resolve(*matcher), "toEqual");
                            assert!(expected.is_some());
                        }
                        other => panic!("expected expect, got {:?}", other),
                    }
                    assert!(matches!(body[1].kind, StmtKind::AssertStmt { .. }));
                }
                other => panic!("expected test block, got {:?}", other),
            },
            other => panic!("expected describe block, got {:?}", other),
        }
    });
}

#[test]
fn try_requires_catch_or_finally() {
    let err = parse_err("try { risky() }");
    assert!(err.message.contains("catch"), "{}", err.message);
}

#[test]
fn arrow_functions_both_forms() {
    with_program("dec f = x => x + 1\ndec g = (a, b) => { return a }", |program, _| {
        for stmt in &program.body {
            match &stmt.kind {
                StmtKind::Dec { init, .. } => {
                    assert!(matches!(init.kind, ExprKind::Arrow { .. }));
                }
                other => panic!("expected dec, got {:?}", other),
            }
        }
    });
}

#[test]
fn is_and_is_not_operators() {
    with_program("dec a = e is NotFound\ndec b = e is not NotFound", |program, _| {
        let ops: Vec<BinaryOp> = program
            .body
            .iter()
            .map(|stmt| match &stmt.kind {
                StmtKind::Dec { init, .. } => match &init.kind {
                    ExprKind::Binary { op, .. } => *op,
                    other => panic!("expected binary, got {:?}", other),
                },
                other => panic!("expected dec, got {:?}", other),
            })
            .collect();
        assert_eq!(ops, vec![BinaryOp::Is, BinaryOp::IsNot]);
    });
}
