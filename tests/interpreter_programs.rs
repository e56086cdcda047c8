//! Interpreter program tests
//!
//! Runs complete programs through the public interpreter API and checks
//! printed output, final bindings and per-statement error reporting.

use kleene::interpreter::{EvalError, Number, Value};
use kleene::{Interpreter, InterpreterConfig};
use proptest::prelude::*;

fn run(source: &str) -> Interpreter {
    let mut interp = Interpreter::default();
    let report = interp.run_source(source).expect("program parses");
    assert!(report.is_success(), "errors: {:?}", report.errors);
    interp
}

fn int(interp: &Interpreter, name: &str) -> i64 {
    match interp.lookup(name) {
        Some(Value::Number(Number::Int(n))) => n,
        other => panic!("{name} is not an integer: {other:?}"),
    }
}

#[test]
fn functions_use_defaults_and_named_arguments() {
    let interp = run(
        "#^add(#a, #b = 10) { return #a + #b; }\n\
         #x = #^add(1);\n\
         #y = #^add(#b = 2, #a = 3);",
    );
    assert_eq!(int(&interp, "#x"), 11);
    assert_eq!(int(&interp, "#y"), 5);
}

#[test]
fn call_binding_errors_are_reported_per_statement() {
    let mut interp = Interpreter::default();
    let report = interp
        .run_source(
            "#^f(#a) { return #a; }\n\
             #x = #^f(1, 2);\n\
             #y = #^f(#z = 1);\n\
             #w = #^f();\n\
             #v = #^f(#a = 1);",
        )
        .unwrap();
    assert_eq!(report.executed, 5);
    assert_eq!(report.errors.len(), 3);
    assert_eq!(report.errors[0].line, 2);
    assert!(matches!(report.errors[0].error, EvalError::TooManyArguments { .. }));
    assert!(matches!(report.errors[1].error, EvalError::UnknownParameter { .. }));
    assert!(matches!(report.errors[2].error, EvalError::MissingArgument { .. }));
    assert_eq!(int(&interp, "#v"), 1);
}

#[test]
fn function_bodies_see_their_definition_scope() {
    let mut interp = run(
        "$x = a;\n\
         $^f() { return $x; }\n\
         { $x = b; print $^f(); }\n\
         print $x;",
    );
    assert_eq!(interp.take_output(), vec!["{a}".to_string(), "{a}".to_string()]);
}

#[test]
fn export_moves_a_binding_outward() {
    let mut interp = run("{ $y = c; export $y; }\nprint $y;");
    assert_eq!(interp.take_output(), vec!["{c}".to_string()]);
}

#[test]
fn rebinding_a_name_read_from_an_enclosing_frame_fails() {
    let mut interp = Interpreter::default();
    let report = interp
        .run_source(
            "$^f() { $x = a; { $y = $x; $x = b; } return $x; }\n\
             $z = $^f();",
        )
        .unwrap();
    assert_eq!(report.errors.len(), 1);
    assert!(matches!(
        &report.errors[0].error,
        EvalError::ShadowsFreeVariable { name } if name == "$x"
    ));
    assert_eq!(interp.environment().depth(), 1);
}

#[test]
fn quit_stops_the_program() {
    let mut interp = Interpreter::default();
    let report = interp.run_source("print 1;\nquit;\nprint 2;").unwrap();
    assert!(report.quit);
    assert_eq!(report.executed, 2);
    assert_eq!(interp.take_output(), vec!["1".to_string()]);
}

#[test]
fn halt_on_error_stops_at_the_first_failure() {
    let source = "#a = 1 / 0;\nprint 2;";

    let mut lenient = Interpreter::default();
    let report = lenient.run_source(source).unwrap();
    assert_eq!(report.errors.len(), 1);
    assert!(matches!(report.errors[0].error, EvalError::DivisionByZero));
    assert_eq!(lenient.take_output(), vec!["2".to_string()]);

    let mut strict = Interpreter::new(InterpreterConfig {
        halt_on_error: true,
        ..InterpreterConfig::default()
    });
    let report = strict.run_source(source).unwrap();
    assert_eq!(report.errors.len(), 1);
    assert!(strict.take_output().is_empty());
}

#[test]
fn assert_and_require_report_their_messages() {
    let mut interp = Interpreter::default();
    let report = interp
        .run_source("assert 1 == 2, \"numbers differ\";\nrequire a & b;\nrequire a | b;")
        .unwrap();
    assert_eq!(report.errors.len(), 2);
    assert!(matches!(
        &report.errors[0].error,
        EvalError::AssertionFailed { message } if message == "numbers differ"
    ));
    assert!(matches!(report.errors[1].error, EvalError::RequirementFailed { .. }));
}

#[test]
fn loops_and_conditionals_drive_numeric_state() {
    let interp = run(
        "#i = 0;\n\
         #sum = 0;\n\
         while (#i < 5) { #i += 1; if (#i % 2 == 0) { continue; } #sum += #i; }",
    );
    assert_eq!(int(&interp, "#i"), 5);
    assert_eq!(int(&interp, "#sum"), 9);
}

#[test]
fn composition_with_the_universal_language_is_the_identity() {
    let interp = run("$t = a:b | c;\n$u = $t _o_ .*;\n#same = #^equivalent($t, $u);");
    assert_eq!(int(&interp, "#same"), 1);
}

#[test]
fn syntax_errors_are_reported_before_running() {
    let mut interp = Interpreter::default();
    let err = interp.run_source("print 1;\n$x = ;").unwrap_err();
    assert!(matches!(err, EvalError::Syntax(ref parse) if parse.line == 2));
    assert!(interp.take_output().is_empty());
}

fn statement(kind: usize) -> &'static str {
    match kind {
        0 => "$x = a;",
        1 => "assert 0;",
        2 => "print #^f(1);",
        _ => "{ $y = b; export $y; }",
    }
}

proptest! {
    #[test]
    fn frames_are_released_on_every_exit_path(
        program in prop::collection::vec((0usize..4, 0usize..4), 1..8)
    ) {
        let mut source = String::from("#^f(#a) { { { return #a; } } }\n");
        for (kind, depth) in &program {
            source.push_str(&"{ ".repeat(*depth));
            source.push_str(statement(*kind));
            source.push_str(&" }".repeat(*depth));
            source.push('\n');
        }

        let mut interp = Interpreter::default();
        let report = interp.run_source(&source).unwrap();
        let failing = program.iter().filter(|(kind, _)| *kind == 1).count();
        prop_assert_eq!(report.errors.len(), failing);
        prop_assert_eq!(interp.environment().depth(), 1);
        prop_assert_eq!(interp.environment().live_frames(), 1);
    }
}
