//! Syntactic to semantic rule expansion
//!
//! Each where-clause assignment produces its own evaluation of the rule. A
//! rule whose input side accepts both the empty string and something longer
//! is split into a basic record (non-empty input) and an epenthesis record
//! (empty input), because the two are constrained differently downstream.

use tracing::debug;

use super::where_clause::{self, Bindings};
use super::{
    ContextSide, ContextSyntax, Direction, RuleKind, RuleSemantics, RuleSyntax, SemanticContext,
    SemanticMapping, SideSyntax,
};
use crate::fsm::{Fst, algebra};
use crate::interpreter::ast::Expr;
use crate::interpreter::{EvalError, Interpreter, Result, Value};

/// Evaluate `rule` into compiler records.
pub fn expand(interp: &mut Interpreter, rule: &RuleSyntax) -> Result<Vec<RuleSemantics>> {
    let solutions = where_clause::resolve(interp, &rule.where_clauses)?;
    let mut records = Vec::new();
    for bindings in solutions {
        let frame = interp.env.current();
        let evaluated = interp.in_frame(frame, |interp| {
            bind(interp, bindings)?;
            evaluate(interp, rule)
        })?;
        records.extend(split(rule, evaluated)?);
    }
    debug!(records = records.len(), "expanded rule");
    Ok(records)
}

fn bind(interp: &mut Interpreter, bindings: Bindings) -> Result<()> {
    for (var, net) in bindings {
        interp.env.put(&var.name, Value::Net(net.share()))?;
    }
    Ok(())
}

struct Evaluated {
    mapping: SemanticMapping,
    contexts: Vec<SemanticContext>,
}

fn evaluate(interp: &mut Interpreter, rule: &RuleSyntax) -> Result<Evaluated> {
    let direction = rule.arrow.direction;
    let mapping = match &rule.kind {
        RuleKind::Mapping { lhs, rhs } => SemanticMapping::Mapping {
            upper: acceptor(interp, lhs, "the left side of a rule")?,
            lower: acceptor(interp, rhs, "the right side of a rule")?,
        },
        RuleKind::Transducer { lhs } => SemanticMapping::Transducer(interp.eval_net(lhs)?),
        RuleKind::Markup { lhs, before, after } => {
            if direction != Direction::Right {
                return Err(EvalError::RuleSemantic(
                    "markup rules must rewrite left to right".to_string(),
                ));
            }
            SemanticMapping::Markup {
                upper: acceptor(interp, lhs, "a marked-up expression")?,
                before: optional_acceptor(interp, before.as_ref(), "markup")?,
                after: optional_acceptor(interp, after.as_ref(), "markup")?,
            }
        }
    };

    let contexts = if rule.contexts.is_empty() {
        vec![SemanticContext::default()]
    } else {
        rule.contexts
            .iter()
            .map(|context| evaluate_context(interp, context, direction))
            .collect::<Result<_>>()?
    };
    Ok(Evaluated { mapping, contexts })
}

fn acceptor(interp: &mut Interpreter, expr: &Expr, role: &str) -> Result<Fst> {
    let fst = interp.eval_net(expr)?;
    if fst.is_acceptor() {
        Ok(fst)
    } else {
        Err(EvalError::RuleSemantic(format!("{role} must be an acceptor")))
    }
}

fn optional_acceptor(interp: &mut Interpreter, expr: Option<&Expr>, role: &str) -> Result<Fst> {
    match expr {
        Some(expr) => acceptor(interp, expr, role),
        None => Ok(Fst::epsilon()),
    }
}

fn evaluate_context(
    interp: &mut Interpreter,
    context: &ContextSyntax,
    direction: Direction,
) -> Result<SemanticContext> {
    Ok(SemanticContext {
        left: evaluate_side(interp, context.left.as_ref(), direction)?,
        right: evaluate_side(interp, context.right.as_ref(), direction)?,
    })
}

fn evaluate_side(
    interp: &mut Interpreter,
    side: Option<&SideSyntax>,
    direction: Direction,
) -> Result<ContextSide> {
    let Some(side) = side else {
        return Ok(ContextSide::default());
    };
    let first = acceptor(interp, &side.first, "a context")?;
    match &side.second {
        Some(second) => Ok(ContextSide {
            upper: Some(first),
            lower: Some(acceptor(interp, second, "a context")?),
        }),
        // One-level contexts constrain the input side.
        None => Ok(match direction {
            Direction::Right => ContextSide {
                upper: Some(first),
                lower: None,
            },
            Direction::Left => ContextSide {
                upper: None,
                lower: Some(first),
            },
        }),
    }
}

fn split(rule: &RuleSyntax, evaluated: Evaluated) -> Result<Vec<RuleSemantics>> {
    let arrow = rule.arrow;
    let direction = arrow.direction;
    let Evaluated { mapping, contexts } = evaluated;
    let record = |mapping, epenthesis| RuleSemantics {
        arrow,
        mapping,
        contexts: contexts.clone(),
        epenthesis,
    };

    let input = input_side(&mapping, direction);
    if !input.accepts_empty_input() {
        return Ok(vec![record(mapping, false)]);
    }
    if arrow.policy.is_extremal() {
        return Err(EvalError::RuleSemantic(
            "a rule with a match policy cannot match the empty string".to_string(),
        ));
    }
    if algebra::is_empty(&algebra::difference(&input, &Fst::epsilon())) {
        return Ok(vec![record(mapping, true)]);
    }

    let (basic, epenthesis) = match mapping {
        SemanticMapping::Mapping { upper, lower } => match direction {
            Direction::Right => (
                SemanticMapping::Mapping {
                    upper: non_empty(&upper),
                    lower: lower.clone(),
                },
                SemanticMapping::Mapping {
                    upper: Fst::epsilon(),
                    lower,
                },
            ),
            Direction::Left => (
                SemanticMapping::Mapping {
                    upper: upper.clone(),
                    lower: non_empty(&lower),
                },
                SemanticMapping::Mapping {
                    upper,
                    lower: Fst::epsilon(),
                },
            ),
        },
        SemanticMapping::Transducer(t) => {
            let some = algebra::plus(&Fst::any());
            match direction {
                Direction::Right => (
                    SemanticMapping::Transducer(algebra::compose(&some, &t)),
                    SemanticMapping::Transducer(algebra::compose(&Fst::epsilon(), &t)),
                ),
                Direction::Left => (
                    SemanticMapping::Transducer(algebra::compose(&t, &some)),
                    SemanticMapping::Transducer(algebra::compose(&t, &Fst::epsilon())),
                ),
            }
        }
        SemanticMapping::Markup {
            upper,
            before,
            after,
        } => (
            SemanticMapping::Markup {
                upper: non_empty(&upper),
                before: before.clone(),
                after: after.clone(),
            },
            SemanticMapping::Markup {
                upper: Fst::epsilon(),
                before,
                after,
            },
        ),
    };
    Ok(vec![record(basic, false), record(epenthesis, true)])
}

/// The side of `mapping` the rule matches against.
fn input_side(mapping: &SemanticMapping, direction: Direction) -> Fst {
    match (mapping, direction) {
        (SemanticMapping::Mapping { upper, .. }, Direction::Right) => upper.clone(),
        (SemanticMapping::Mapping { lower, .. }, Direction::Left) => lower.clone(),
        (SemanticMapping::Transducer(t), Direction::Right) => algebra::project_input(t),
        (SemanticMapping::Transducer(t), Direction::Left) => algebra::project_output(t),
        (SemanticMapping::Markup { upper, .. }, _) => upper.clone(),
    }
}

fn non_empty(fst: &Fst) -> Fst {
    algebra::difference(fst, &Fst::epsilon())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::parse_program;
    use crate::interpreter::ast::Stmt;

    fn rules_of(source: &str) -> Vec<RuleSyntax> {
        let program = parse_program(source).unwrap();
        match &program.statements[0].stmt {
            Stmt::Assign {
                value: Expr::Rules(rules),
                ..
            } => rules.clone(),
            other => panic!("expected a rule assignment, got {other:?}"),
        }
    }

    fn expand_source(source: &str) -> Result<Vec<RuleSemantics>> {
        let mut interp = Interpreter::default();
        let mut records = Vec::new();
        for rule in rules_of(source) {
            records.extend(expand(&mut interp, &rule)?);
        }
        Ok(records)
    }

    #[test]
    fn plain_rules_give_one_record_with_a_default_context() {
        let records = expand_source("$r = a -> b;").unwrap();
        assert_eq!(records.len(), 1);
        assert!(!records[0].epenthesis);
        assert_eq!(records[0].contexts.len(), 1);
        assert!(records[0].contexts[0].left.upper.is_none());
    }

    #[test]
    fn optional_inputs_split_into_basic_and_epenthesis() {
        let records = expand_source("$r = a? -> b;").unwrap();
        assert_eq!(records.len(), 2);
        assert!(!records[0].epenthesis);
        assert!(records[1].epenthesis);
    }

    #[test]
    fn empty_inputs_are_pure_epenthesis() {
        let records = expand_source("$r = \"\" -> b / a _ ;").unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].epenthesis);
    }

    #[test]
    fn extremal_policies_reject_empty_matches() {
        let err = expand_source("$r = a* @-> b;").unwrap_err();
        assert!(matches!(err, EvalError::RuleSemantic(_)));
    }

    #[test]
    fn where_clauses_evaluate_the_rule_per_assignment() {
        let records =
            expand_source("$r = $x -> $y {where $x in $@(a, b), $y in $@(c, d)};").unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn left_arrow_contexts_constrain_the_lower_side() {
        let records = expand_source("$r = a <- b / c _ ;").unwrap();
        let left = &records[0].contexts[0].left;
        assert!(left.upper.is_none());
        assert!(left.lower.is_some());
    }
}
