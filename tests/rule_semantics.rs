//! Alternation rule tests
//!
//! Rules are compiled from source and checked by applying them to strings.

use kleene::fsm::{algebra, paths};
use kleene::interpreter::{EvalError, Number, Value};
use kleene::Interpreter;

fn compile(source: &str) -> Interpreter {
    let mut interp = Interpreter::default();
    let report = interp.run_source(source).expect("program parses");
    assert!(report.is_success(), "errors: {:?}", report.errors);
    interp
}

fn apply(interp: &mut Interpreter, name: &str, input: &str) -> Vec<String> {
    let fst = interp.net(name).expect("net is bound");
    interp.apply(&fst, input)
}

fn first_error(source: &str) -> EvalError {
    let mut interp = Interpreter::default();
    let mut report = interp.run_source(source).expect("program parses");
    assert!(!report.errors.is_empty(), "expected a failure");
    report.errors.remove(0).error
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn obligatory_rule_rewrites_every_occurrence() {
    let mut interp = compile("$r = a -> b;");
    assert_eq!(apply(&mut interp, "$r", "a"), strings(&["b"]));
    assert_eq!(apply(&mut interp, "$r", "ab"), strings(&["bb"]));
    assert_eq!(apply(&mut interp, "$r", "cac"), strings(&["cbc"]));
    assert_eq!(apply(&mut interp, "$r", ""), strings(&[""]));
}

#[test]
fn optional_rule_keeps_the_original_as_well() {
    let mut interp = compile("$r = a (->) b;");
    assert_eq!(apply(&mut interp, "$r", "a"), strings(&["a", "b"]));
}

#[test]
fn missing_context_equals_empty_context() {
    let interp = compile("$r1 = a -> b;\n$r2 = a -> b / \"\" _ \"\";");
    let r1 = interp.net("$r1").unwrap();
    let r2 = interp.net("$r2").unwrap();
    assert!(algebra::equivalent(&r1, &r2));
}

#[test]
fn contexts_select_occurrences() {
    let mut interp = compile("$r = a -> b / c _ ;\n$s = a -> b / _ c || d _ ;");
    assert_eq!(apply(&mut interp, "$r", "caa"), strings(&["cba"]));
    assert_eq!(apply(&mut interp, "$r", "aa"), strings(&["aa"]));
    assert_eq!(apply(&mut interp, "$s", "acdaa"), strings(&["bcdba"]));
}

#[test]
fn boundary_contexts_anchor_at_string_edges() {
    let mut interp = compile("$r = a -> b / # _ ;\n$s = a -> b / _ # ;");
    assert_eq!(apply(&mut interp, "$r", "aa"), strings(&["ba"]));
    assert_eq!(apply(&mut interp, "$s", "aa"), strings(&["ab"]));
}

#[test]
fn lower_contexts_see_earlier_rewrites() {
    let mut interp = compile("$r = a -> b / .::b _ ;");
    assert_eq!(apply(&mut interp, "$r", "ba"), strings(&["bb"]));
    assert_eq!(apply(&mut interp, "$r", "ca"), strings(&["ca"]));
    assert_eq!(apply(&mut interp, "$r", "baa"), strings(&["bbb"]));
}

#[test]
fn contexts_must_be_acceptors() {
    assert!(matches!(first_error("$r = a -> b / c:d _ ;"), EvalError::RuleSemantic(_)));
    assert!(matches!(
        first_error("$r = a -> b / c::(c:d) _ ;"),
        EvalError::RuleSemantic(_)
    ));
}

#[test]
fn markup_insertions_must_be_acceptors() {
    assert!(matches!(first_error("$r = a -> x:y ... z;"), EvalError::RuleSemantic(_)));
}

#[test]
fn parallel_rules_rewrite_simultaneously() {
    let mut interp = compile("$r = a -> b ,, b -> a;");
    assert_eq!(apply(&mut interp, "$r", "ab"), strings(&["ba"]));
}

#[test]
fn matched_where_clause_equals_explicit_parallel_rules() {
    let interp = compile(
        "$w = $x -> $y {where $x in $@(a, b), $y in $@(c, d)};\n\
         $p = a -> c ,, b -> d;",
    );
    let w = interp.net("$w").unwrap();
    let p = interp.net("$p").unwrap();
    assert!(algebra::equivalent(&w, &p));
}

#[test]
fn mixed_where_clause_takes_every_combination() {
    let mut interp = compile("$r = $x -> $y {where mixed $x in $@(a), $y in $@(c, d)};");
    assert_eq!(apply(&mut interp, "$r", "a"), strings(&["c", "d"]));
}

#[test]
fn matched_where_clause_lists_must_agree_in_length() {
    let err = first_error("$r = $x -> $y {where $x in $@(a, b), $y in $@(c)};");
    assert!(matches!(
        err,
        EvalError::WhereClauseLength { ref name, expected: 2, found: 1 } if name == "$y"
    ));
}

#[test]
fn epenthesis_inserts_between_contexts() {
    let mut interp = compile("$r = \"\" -> x / a _ b;");
    assert_eq!(apply(&mut interp, "$r", "ab"), strings(&["axb"]));
    assert_eq!(apply(&mut interp, "$r", "ba"), strings(&["ba"]));
}

#[test]
fn unconditioned_epenthesis_fills_every_position() {
    let mut interp = compile("$r = \"\" -> x;\n#empty = #^isEmpty($r);");
    assert!(matches!(interp.lookup("#empty"), Some(Value::Number(Number::Int(0)))));
    assert_eq!(apply(&mut interp, "$r", ""), strings(&["x"]));
    assert_eq!(apply(&mut interp, "$r", "b"), strings(&["xbx"]));
}

#[test]
fn epenthesis_may_be_anchored_at_either_edge() {
    let mut interp = compile("$l = \"\" -> x / # _ ;\n$r = \"\" -> x / _ # ;");
    assert_eq!(apply(&mut interp, "$l", ""), strings(&["x"]));
    assert_eq!(apply(&mut interp, "$l", "b"), strings(&["xb"]));
    assert_eq!(apply(&mut interp, "$r", "b"), strings(&["bx"]));
}

#[test]
fn starred_input_still_inserts_where_nothing_matches() {
    let mut interp = compile("$r = a* -> x;");
    assert_eq!(apply(&mut interp, "$r", ""), strings(&["x"]));
    assert_eq!(apply(&mut interp, "$r", "b"), strings(&["xbx"]));
}

#[test]
fn optional_input_splits_into_rewrite_and_insertion() {
    let mut interp = compile("$r = b? -> x / a _ c;");
    assert_eq!(apply(&mut interp, "$r", "abc"), strings(&["axc"]));
    assert_eq!(apply(&mut interp, "$r", "ac"), strings(&["axc"]));
}

#[test]
fn empty_matches_with_a_policy_are_rejected() {
    assert!(matches!(first_error("$r = a* @-> x;"), EvalError::RuleSemantic(_)));
}

#[test]
fn leftmost_longest_rewrites_maximal_runs() {
    let mut interp = compile("$r = a+ @-> x;");
    assert_eq!(apply(&mut interp, "$r", "aaba"), strings(&["xbx"]));
}

#[test]
fn leftmost_shortest_rewrites_minimal_runs() {
    let mut interp = compile("$r = a+ @> x;");
    assert_eq!(apply(&mut interp, "$r", "aa"), strings(&["xx"]));
}

#[test]
fn direction_decides_overlapping_matches() {
    let mut interp = compile("$l = (a b | b c) @-> x;\n$r = (a b | b c) ->@ x;");
    assert_eq!(apply(&mut interp, "$l", "abc"), strings(&["xc"]));
    assert_eq!(apply(&mut interp, "$r", "abc"), strings(&["ax"]));
}

#[test]
fn markup_brackets_each_match() {
    let mut interp = compile("$r = a -> x ... y;");
    assert_eq!(apply(&mut interp, "$r", "bab"), strings(&["bxayb"]));
}

#[test]
fn markup_requires_a_right_arrow() {
    assert!(matches!(first_error("$r = a <- x ... y;"), EvalError::RuleSemantic(_)));
}

#[test]
fn left_arrow_rules_rewrite_the_lower_side() {
    let interp = compile("$r = a <- b;");
    let r = interp.net("$r").unwrap();
    let b = interp.symbols().code("b").unwrap();
    let a = interp.symbols().code("a").unwrap();
    let upper = paths::apply_up(&r, &[b]);
    let (found, complete) = paths::collect(&upper, paths::Bounds::default());
    assert!(complete);
    assert_eq!(found, vec![(vec![a], vec![a])]);
}

#[test]
fn parallel_rules_must_share_a_direction() {
    assert!(matches!(
        first_error("$r = a -> b ,, c <- d;"),
        EvalError::RuleSemantic(_)
    ));
}

#[test]
fn transducer_rules_use_the_given_relation() {
    let mut interp = compile("$r = a:b -> / _ c;");
    assert_eq!(apply(&mut interp, "$r", "acab"), strings(&["bcab"]));
}

#[test]
fn restriction_limits_where_a_language_may_occur() {
    let mut interp = compile("$r = a => b _ ;\n#ok = #^isEmpty($r);");
    assert!(matches!(interp.lookup("#ok"), Some(Value::Number(Number::Int(0)))));
    assert_eq!(apply(&mut interp, "$r", "ba"), strings(&["ba"]));
    assert_eq!(apply(&mut interp, "$r", "cc"), strings(&["cc"]));
    assert!(apply(&mut interp, "$r", "a").is_empty());
    assert!(apply(&mut interp, "$r", "aba").is_empty());
}
