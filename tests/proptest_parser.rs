//! Property-based tests with proptest.
//!
//! Lexing and parsing are pure functions of the line, so running them twice
//! must give the same result. Small arithmetic programs are checked against
//! the same computation done in Rust.

use pangsh::lexer::tokenize;
use pangsh::parser::construct_ast;
use pangsh::{Environment, Interpreter, MemWriter, Value};
use proptest::prelude::*;
use std::collections::HashMap;

/// Variable names that never collide with a keyword.
fn var_name() -> impl Strategy<Value = String> {
    "v_[a-z0-9_]{0,8}".prop_map(|s| s)
}

/// Lines built from the characters the lexer knows, plus a few it rejects.
fn shell_line() -> impl Strategy<Value = String> {
    "[a-z0-9 $=+*/%();\"'@._-]{0,40}".prop_map(|s| s)
}

fn shell() -> (Interpreter, MemWriter) {
    let output = MemWriter::new();
    let sh = Interpreter::new(Environment::with_vars(HashMap::new()))
        .with_output(Box::new(output.clone()));
    (sh, output)
}

proptest! {
    #[test]
    fn lex_and_parse_are_deterministic(line in shell_line()) {
        let first = tokenize(&line);
        let second = tokenize(&line);
        prop_assert_eq!(&first, &second);

        if let Ok(tokens) = first {
            let a = construct_ast(tokens.clone());
            let b = construct_ast(tokens);
            prop_assert_eq!(a, b);
        }
    }

    #[test]
    fn arbitrary_text_never_panics(line in "\\PC{0,60}") {
        if let Ok(tokens) = tokenize(&line) {
            let _ = construct_ast(tokens);
        }
    }

    #[test]
    fn evaluating_arbitrary_expressions_never_panics(expr in "[0-9 +*/%().\"-]{0,24}") {
        let (mut sh, _) = shell();
        let _ = sh.run_line(&format!("v_x = {expr}"));
    }

    #[test]
    fn integer_arithmetic_matches_rust(
        name in var_name(),
        a in 0i64..10_000,
        b in 0i64..10_000,
        c in 1i64..100,
    ) {
        let (mut sh, _) = shell();
        sh.run_line(&format!("{name} = ({a} + {b}) * {c} - {b} % {c}")).unwrap();
        prop_assert_eq!(sh.env().get_var(&name), Some(&Value::Int((a + b) * c - b % c)));
    }

    #[test]
    fn compound_assignment_matches_plain(
        name in var_name(),
        a in 0i64..10_000,
        b in 0i64..10_000,
    ) {
        let (mut sh, _) = shell();
        sh.run_line(&format!("{name} = {a}; {name} += {b}; {name} *= 2")).unwrap();
        prop_assert_eq!(sh.env().get_var(&name), Some(&Value::Int((a + b) * 2)));
    }

    #[test]
    fn echo_prints_string_literals(text in "[a-zA-Z0-9 ,.!?]{0,30}") {
        let (mut sh, output) = shell();
        sh.run_line(&format!("echo \"{text}\"")).unwrap();
        prop_assert_eq!(output.contents(), format!("{text}\n"));
    }

    #[test]
    fn variables_enter_expressions_as_values(text in "[a-z ]{0,12}", n in 0i64..5) {
        let (mut sh, output) = shell();
        sh.run_line(&format!("v_s = \"{text}\"; v_n = {n}; echo $v_s * $v_n")).unwrap();
        prop_assert_eq!(output.contents(), format!("{}\n", text.repeat(n as usize)));
    }
}
