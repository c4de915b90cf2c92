// Parser robustness tests for the Falcon front-end
//
// Every case runs the scanner and parser end to end and checks both the
// outcome and that nothing panics.

use falcon::ast::Program;
use falcon::error::FalconError;
use falcon::lexer::Lexer;
use falcon::parser::Parser;
use std::panic::{self, AssertUnwindSafe};

enum Expect {
    Parses,
    Fails(Option<&'static str>),
}

struct Case {
    name: &'static str,
    input: String,
    expect: Expect,
}

/// Named group of cases; `run` returns one line per case that went wrong.
struct Suite {
    name: &'static str,
    cases: Vec<Case>,
}

impl Suite {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            cases: Vec::new(),
        }
    }

    fn ok(&mut self, name: &'static str, input: impl Into<String>) {
        self.push(name, input, Expect::Parses);
    }

    fn err(&mut self, name: &'static str, input: impl Into<String>) {
        self.push(name, input, Expect::Fails(None));
    }

    fn err_with(&mut self, name: &'static str, input: impl Into<String>, message: &'static str) {
        self.push(name, input, Expect::Fails(Some(message)));
    }

    fn push(&mut self, name: &'static str, input: impl Into<String>, expect: Expect) {
        self.cases.push(Case {
            name,
            input: input.into(),
            expect,
        });
    }

    fn run(&self) -> Vec<String> {
        self.cases
            .iter()
            .filter_map(|case| {
                check(case).map(|reason| format!("{}/{}: {}", self.name, case.name, reason))
            })
            .collect()
    }
}

/// `None` when the case behaved as expected.
fn check(case: &Case) -> Option<String> {
    let outcome = match panic::catch_unwind(AssertUnwindSafe(|| parse_input(&case.input))) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let message = payload
                .downcast_ref::<String>()
                .cloned()
                .or_else(|| payload.downcast_ref::<&str>().map(|s| s.to_string()))
                .unwrap_or_else(|| "unknown panic".to_string());
            return Some(format!("panicked: {}", message));
        }
    };

    match (outcome, &case.expect) {
        (Ok(_), Expect::Parses) | (Err(_), Expect::Fails(None)) => None,
        (Ok(_), Expect::Fails(_)) => Some("parsed, but an error was expected".to_string()),
        (Err(error), Expect::Parses) => Some(format!("unexpected error: {}", error.message)),
        (Err(error), Expect::Fails(Some(expected))) if !error.message.contains(expected) => Some(
            format!("error '{}' does not mention '{}'", error.message, expected),
        ),
        (Err(_), Expect::Fails(Some(_))) => None,
    }
}

/// Parse input, failing with the first recorded diagnostic
fn parse_input(input: &str) -> Result<Program, FalconError> {
    let mut parser = Parser::new(Lexer::new(input));
    let program = parser.parse_program();
    match parser.diagnostics().first() {
        Some(error) => Err(error.clone()),
        None => Ok(program),
    }
}

// ============================================================================
// Test Suite Creation Functions
// ============================================================================

fn create_malformed_expressions_tests() -> Suite {
    let mut suite = Suite::new("Malformed Expressions");

    // === PARENTHESES TESTS ===

    suite.err_with(
        "unmatched_opening_paren",
        "(1 + 2",
        "expected next token to be ), got EOF instead"
    );

    suite.err_with(
        "unmatched_opening_paren_nested",
        "((1 + 2)",
        "expected next token to be )"
    );

    suite.err_with(
        "unmatched_closing_paren",
        "1 + 2)",
        "no prefix parse function for ) found"
    );

    suite.err_with(
        "empty_parentheses",
        "()",
        "no prefix parse function for ) found"
    );

    suite.err_with(
        "empty_parentheses_in_expression",
        "1 + ()",
        "no prefix parse function for ) found"
    );

    // === BRACKET TESTS ===

    suite.err_with(
        "unmatched_opening_bracket",
        "[1, 2",
        "expected next token to be ], got EOF instead"
    );

    // === BRACE TESTS ===

    suite.err_with(
        "unclosed_hash",
        "{1: 2",
        "expected next token to be ,"
    );

    suite.err_with(
        "unclosed_block",
        "if (true) { 1",
        "expected next token to be }, got EOF instead"
    );

    suite.err_with(
        "unmatched_closing_brace",
        "let x = 1 }",
        "no prefix parse function for } found"
    );

    suite
}

fn create_edge_case_tests() -> Suite {
    let mut suite = Suite::new("Edge Cases");

    suite.ok("empty_input", "");
    suite.ok("only_whitespace", "   \n\t  \r\n");

    // EOF conditions
    suite.err_with(
        "unexpected_eof_after_operator",
        "1 +",
        "no prefix parse function for EOF found"
    );
    suite.err("unexpected_eof_in_expression", "1 + (");

    let depth = 10_000;
    suite.ok("deeply_nested_parens", "(".repeat(depth) + "1" + &")".repeat(depth));
    suite.ok("deeply_nested_prefix", "-".repeat(5_000) + "1");

    // Digits split identifiers: `foobar` then `123`
    suite.ok("identifier_then_digits", "foobar123");

    suite.err_with(
        "unterminated_string",
        "let s = \"hello",
        "unterminated string literal"
    );
    suite.err_with(
        "illegal_character",
        "5 @ 5",
        "illegal character '@'"
    );

    suite
}

fn create_operator_tests() -> Suite {
    let mut suite = Suite::new("Operator Tests");

    // Missing operands
    suite.err("missing_left_operand", "+ 1");
    suite.err("missing_right_operand", "1 +");
    suite.err("missing_both_operands", "+");

    suite.err("double_plus", "1 ++ 2");
    // Minus doubles as a prefix operator
    suite.ok("double_minus", "1 -- 2"); // Parsed as 1 - (-2)
    suite.ok("mixed_operators", "1 +- 2"); // Parsed as 1 + (-2)
    suite.ok("bang_prefix", "!true");

    // Comparison operators
    suite.ok("comparison_equal", "1 == 2");
    suite.ok("comparison_not_equal", "1 != 2");
    suite.ok("comparison_less", "1 < 2");
    suite.ok("comparison_greater", "1 > 2");

    // Assignment is only a statement form
    suite.err_with(
        "bare_assignment",
        "1 = 2",
        "no prefix parse function for = found"
    );

    suite
}

fn create_control_flow_tests() -> Suite {
    let mut suite = Suite::new("Control Flow Tests");

    suite.ok("valid_if", "if (true) { x }");
    suite.ok("valid_if_else", "if (x < y) { x } else { y }");
    suite.err_with(
        "if_missing_parens",
        "if true { 1 }",
        "expected next token to be ("
    );
    suite.err_with(
        "if_missing_body",
        "if (true)",
        "expected next token to be {, got EOF instead"
    );
    suite.err_with(
        "else_without_block",
        "if (true) { 1 } else 2",
        "expected next token to be {"
    );

    suite
}

fn create_function_tests() -> Suite {
    let mut suite = Suite::new("Function Tests");

    // Literals
    suite.ok("function_literal", "fn(x, y) { x + y }");
    suite.ok("function_no_params", "fn() { return 1; }");
    suite.err_with(
        "unclosed_parameter_list",
        "fn(x, y { x }",
        "expected next token to be )"
    );
    suite.err_with(
        "non_identifier_parameter",
        "fn(1) {}",
        "expected next token to be IDENT, got INT instead"
    );
    suite.err("named_function_literal", "fn x() {}");

    // Calls
    suite.ok("simple_function_call", "foo()");
    suite.ok("function_call_with_args", "foo(1, 2, 3)");
    suite.ok("immediate_call", "fn(x) { x }(5)");
    suite.err_with(
        "missing_closing_paren",
        "foo(1, 2",
        "expected next token to be )"
    );
    suite.err("missing_opening_paren", "foo 1, 2)");
    suite.err("trailing_comma", "foo(1, 2,)");

    suite
}

fn create_statement_tests() -> Suite {
    let mut suite = Suite::new("Statement Tests");

    suite.ok("let_statement", "let x = 5;");
    suite.ok("let_without_semicolon", "let x = 5");
    suite.err_with(
        "let_missing_assign",
        "let x 5;",
        "expected next token to be ="
    );
    suite.err_with(
        "let_missing_name",
        "let = 5;",
        "expected next token to be IDENT"
    );
    suite.err_with(
        "let_missing_value",
        "let x =",
        "no prefix parse function for EOF found"
    );
    suite.ok("return_value", "return 10;");
    suite.ok("bare_return", "return;");

    suite
}

fn create_literal_tests() -> Suite {
    let mut suite = Suite::new("Literal Tests");

    suite.ok("integer_literal", "42");
    suite.ok("string_literal", "\"hello\"");
    suite.ok("escaped_string_literal", "\"say \\\"hi\\\"\"");
    suite.ok("boolean_true", "true");
    suite.ok("boolean_false", "false");
    suite.ok("array_literal", "[1, 2, 3]");
    suite.ok("empty_array", "[]");
    suite.ok("hash_literal", "{\"a\": 1, \"b\": 2}");
    suite.ok("empty_hash", "{}");

    suite.err_with(
        "integer_overflow",
        "99999999999999999999",
        "could not parse 99999999999999999999 as integer"
    );

    suite
}

fn create_mixed_construct_tests() -> Suite {
    let mut suite = Suite::new("Mixed Construct Tests");

    suite.ok(
        "complex_expression",
        "let result = add(five, 10) * [1, 2][0] + {\"k\": 3}[\"k\"];"
    );

    suite.err(
        "mixed_paren_bracket_error",
        "let x = [1 + (2 * 3];"
    );

    suite
}

// ============================================================================
// Direct checks of the documented parser properties
// ============================================================================

#[test]
fn let_statement_binds_name() {
    let mut parser = Parser::new(Lexer::new("let x = 5;"));
    let program = parser.parse_program();

    assert!(parser.errors().is_empty());
    assert_eq!(program.statements.len(), 1);
    match &program.statements[0] {
        falcon::Statement::Let { name, .. } => assert_eq!(name.value, "x"),
        other => panic!("expected let statement, got {:?}", other),
    }
}

#[test]
fn bad_statement_does_not_hide_the_next_one() {
    let mut parser = Parser::new(Lexer::new("let x 5;\nreturn 10;\nlet y = x;"));
    let program = parser.parse_program();

    assert_eq!(
        parser.errors(),
        vec!["expected next token to be =, got INT instead".to_string()]
    );
    assert_eq!(program.to_string(), "return 10;\nlet y = x;");
}

#[test]
fn scanner_eof_is_terminal() {
    let mut lexer = Lexer::new("let");
    assert_eq!(lexer.next_token().kind, falcon::TokenKind::Let);
    for _ in 0..3 {
        assert_eq!(lexer.next_token().kind, falcon::TokenKind::Eof);
    }
}

// ============================================================================
// Suite runner
// ============================================================================

#[test]
fn comprehensive_parser_tests() {
    let suites = [
        create_malformed_expressions_tests(),
        create_edge_case_tests(),
        create_operator_tests(),
        create_control_flow_tests(),
        create_function_tests(),
        create_statement_tests(),
        create_literal_tests(),
        create_mixed_construct_tests(),
    ];

    let failures: Vec<String> = suites.iter().flat_map(Suite::run).collect();
    assert!(failures.is_empty(), "failing cases:\n{}", failures.join("\n"));
}
