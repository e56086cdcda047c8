//! Configuration files driving an interpreter

use kleene::{Interpreter, InterpreterConfig, RtnConvention};
use tempfile::TempDir;

fn load(json: &str) -> InterpreterConfig {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("kleene.json");
    std::fs::write(&path, json).unwrap();
    InterpreterConfig::load(&path).unwrap()
}

#[test]
fn enumeration_limit_truncates_printed_nets() {
    let mut interp = Interpreter::new(load(r#"{ "max_enumerated_strings": 2 }"#));
    let report = interp.run_source("print a | b | c;\nprint a | b;").unwrap();
    assert!(report.is_success(), "errors: {:?}", report.errors);
    let output = interp.take_output();
    assert!(output[0].ends_with(", ...}"), "{}", output[0]);
    assert_eq!(output[0].matches(", ").count(), 2);
    assert_eq!(output[1], "{a, b}");
}

#[test]
fn halt_on_error_from_file_stops_the_run() {
    let config = load(r#"{ "halt_on_error": true, "rtn_convention": "sap" }"#);
    assert_eq!(config.rtn_convention, RtnConvention::Sap);
    let mut interp = Interpreter::new(config);
    let report = interp
        .run_source("print 1;\nassert 0;\nprint 2;")
        .unwrap();
    assert_eq!(report.executed, 2);
    assert_eq!(interp.take_output(), vec!["1".to_string()]);
}

#[test]
fn fixed_seed_makes_random_generation_repeatable() {
    let source = "$r = $^randGen(a* b*, #num = 5, #max = 6);";
    let run = || {
        let mut interp = Interpreter::new(load(r#"{ "random_seed": 11 }"#));
        assert!(interp.run_source(source).unwrap().is_success());
        let r = interp.net("$r").unwrap();
        interp.strings(&r).0
    };
    assert_eq!(run(), run());
}
