//! Where-clause resolution
//!
//! `matched` clauses pair their lists element by element, `mixed` clauses
//! take every combination, and separate clauses multiply.

use super::{WhereClause, WhereKind};
use crate::interpreter::ast::Ident;
use crate::interpreter::{EvalError, Interpreter, NetValue, Result, Value};

/// One assignment of nets to where-clause variables.
pub type Bindings = Vec<(Ident, NetValue)>;

/// Every variable assignment the clauses describe, in source order.
///
/// Clauses combine as a cartesian product. A rule without clauses has exactly
/// one, empty, assignment.
pub fn resolve(interp: &mut Interpreter, clauses: &[WhereClause]) -> Result<Vec<Bindings>> {
    let mut solutions: Vec<Bindings> = vec![Vec::new()];
    for clause in clauses {
        let sets = clause_solutions(interp, clause)?;
        solutions = solutions
            .iter()
            .flat_map(|prefix| {
                sets.iter().map(move |set| {
                    let mut combined = prefix.clone();
                    combined.extend(set.iter().cloned());
                    combined
                })
            })
            .collect();
    }
    Ok(solutions)
}

fn clause_solutions(interp: &mut Interpreter, clause: &WhereClause) -> Result<Vec<Bindings>> {
    let mut lists = Vec::with_capacity(clause.bindings.len());
    for (var, expr) in &clause.bindings {
        let items = match interp.eval_expr(expr)? {
            Value::NetList(items) => items,
            other => {
                return Err(EvalError::TypeMismatch {
                    context: format!("where-clause variable {var}"),
                    expected: "net list",
                    found: other.describe(),
                });
            }
        };
        lists.push((var, items));
    }

    match clause.kind {
        WhereKind::Matched => {
            let expected = lists.first().map_or(0, |(_, items)| items.len());
            if let Some((var, items)) = lists.iter().find(|(_, items)| items.len() != expected) {
                return Err(EvalError::WhereClauseLength {
                    name: var.name.clone(),
                    expected,
                    found: items.len(),
                });
            }
            Ok((0..expected)
                .map(|i| {
                    lists
                        .iter()
                        .map(|(var, items)| ((*var).clone(), items[i].clone()))
                        .collect()
                })
                .collect())
        }
        WhereKind::Mixed => {
            let mut sets: Vec<Bindings> = vec![Vec::new()];
            for (var, items) in &lists {
                sets = sets
                    .into_iter()
                    .flat_map(|prefix| {
                        items.iter().map(move |item| {
                            let mut extended = prefix.clone();
                            extended.push(((*var).clone(), item.clone()));
                            extended
                        })
                    })
                    .collect();
            }
            Ok(sets)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::ast::{Expr, IdentKind};

    fn var(name: &str) -> Ident {
        Ident::new(name, IdentKind::Net)
    }

    fn list(symbols: &[&str]) -> Expr {
        Expr::NetList(symbols.iter().map(|s| Expr::Symbol(s.to_string())).collect())
    }

    fn clause(kind: WhereKind, bindings: Vec<(Ident, Expr)>) -> WhereClause {
        WhereClause { kind, bindings }
    }

    #[test]
    fn no_clauses_yield_one_empty_assignment() {
        let mut interp = Interpreter::default();
        let solutions = resolve(&mut interp, &[]).unwrap();
        assert_eq!(solutions.len(), 1);
        assert!(solutions[0].is_empty());
    }

    #[test]
    fn matched_lists_are_zipped() {
        let mut interp = Interpreter::default();
        let clauses = [clause(
            WhereKind::Matched,
            vec![(var("$x"), list(&["a", "b", "c"])), (var("$y"), list(&["d", "e", "f"]))],
        )];
        let solutions = resolve(&mut interp, &clauses).unwrap();
        assert_eq!(solutions.len(), 3);
        assert!(solutions.iter().all(|set| set.len() == 2));
    }

    #[test]
    fn mixed_lists_form_a_product() {
        let mut interp = Interpreter::default();
        let clauses = [clause(
            WhereKind::Mixed,
            vec![(var("$x"), list(&["a", "b"])), (var("$y"), list(&["c", "d", "e"]))],
        )];
        assert_eq!(resolve(&mut interp, &clauses).unwrap().len(), 6);
    }

    #[test]
    fn clauses_multiply() {
        let mut interp = Interpreter::default();
        let clauses = [
            clause(WhereKind::Matched, vec![(var("$x"), list(&["a", "b"]))]),
            clause(WhereKind::Matched, vec![(var("$y"), list(&["c", "d"]))]),
        ];
        assert_eq!(resolve(&mut interp, &clauses).unwrap().len(), 4);
    }

    #[test]
    fn unequal_matched_lists_are_rejected() {
        let mut interp = Interpreter::default();
        let clauses = [clause(
            WhereKind::Matched,
            vec![(var("$x"), list(&["a", "b"])), (var("$y"), list(&["c"]))],
        )];
        let err = resolve(&mut interp, &clauses).unwrap_err();
        assert!(matches!(
            err,
            EvalError::WhereClauseLength { ref name, expected: 2, found: 1 } if name == "$y"
        ));
    }

    #[test]
    fn non_list_ranges_are_type_errors() {
        let mut interp = Interpreter::default();
        let clauses = [clause(
            WhereKind::Matched,
            vec![(var("$x"), Expr::Symbol("a".to_string()))],
        )];
        assert!(matches!(
            resolve(&mut interp, &clauses),
            Err(EvalError::TypeMismatch { .. })
        ));
    }
}
