//! Right-linear grammar linking
//!
//! `$>name = ...;` binds a production without evaluating it. `$^start($>root)`
//! collects every production reachable from the root, compiles each body with
//! its references to other productions kept as reserved negative labels, and
//! then splices the components into one automaton, replacing each reference
//! arc by an epsilon jump to the referenced component's start state.
//!
//! Only right-linear grammars are accepted: a reference must be the last
//! thing a path does before it ends.

use std::collections::{HashMap, VecDeque};

use thiserror::Error;
use tracing::debug;

use crate::fsm::{Arc, Fst, algebra};
use crate::interpreter::value::Production;
use crate::interpreter::{EvalError, Interpreter, Result, Value};
use crate::symbols::{EPSILON, Label};

/// Grammar-specific failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GrammarError {
    /// A production refers to another one somewhere other than at the end.
    #[error("production {production} refers to {reference} in a non-final position")]
    NotRightLinear {
        /// Production whose body is at fault
        production: String,
        /// Production referenced too early
        reference: String,
    },
}

/// Compile the grammar rooted at `root` into a single automaton.
pub fn link(interp: &mut Interpreter, root: &Production) -> Result<Fst> {
    let productions = reachable(interp, root)?;
    let labels: HashMap<String, Label> = productions
        .iter()
        .zip(1..)
        .map(|(production, index): (&Production, Label)| (production.name.clone(), -index))
        .collect();
    debug!(productions = productions.len(), "linking grammar");

    let previous = interp.production_labels.replace(labels);
    let compiled = compile_components(interp, &productions);
    interp.production_labels = previous;
    let components = compiled?;

    let mut linked = Fst::empty();
    let mut starts = Vec::with_capacity(components.len());
    for component in &components {
        let offset = linked.splice(component);
        starts.push(offset + component.start());
    }
    linked.set_start(starts[0]);

    for state in 0..linked.num_states() {
        for arc in linked.arcs_mut(state).iter_mut() {
            if arc.input < 0 {
                let index = usize::try_from(-arc.input - 1).unwrap_or(0);
                *arc = Arc::new(EPSILON, EPSILON, starts[index]);
            }
        }
    }
    linked.refresh_flags();
    Ok(algebra::trim(&algebra::rm_epsilon(&linked)))
}

/// The root and every production it reaches, breadth first.
fn reachable(interp: &Interpreter, root: &Production) -> Result<Vec<Production>> {
    let mut found = vec![root.clone()];
    let mut queue = VecDeque::from([root.clone()]);
    while let Some(production) = queue.pop_front() {
        let mut names = Vec::new();
        production
            .body
            .for_each_production(&mut |ident| names.push(ident.name.clone()));
        for name in names {
            if found.iter().any(|known| known.name == name) {
                continue;
            }
            let next = match interp.env.lookup(&name) {
                Some((_, Value::Production(next))) => next.clone(),
                Some((_, other)) => {
                    return Err(EvalError::TypeMismatch {
                        context: format!("grammar reference {name}"),
                        expected: "production",
                        found: other.describe(),
                    });
                }
                None => return Err(EvalError::UndefinedIdentifier { name }),
            };
            found.push(next.clone());
            queue.push_back(next);
        }
    }
    Ok(found)
}

fn compile_components(interp: &mut Interpreter, productions: &[Production]) -> Result<Vec<Fst>> {
    let mut components = Vec::with_capacity(productions.len());
    for production in productions {
        let body = interp.eval_net(&production.body)?;
        let component = algebra::trim(&algebra::rm_epsilon(&body));
        check_right_linear(&component, production, productions)?;
        components.push(component);
    }
    Ok(components)
}

fn check_right_linear(
    component: &Fst,
    production: &Production,
    productions: &[Production],
) -> Result<()> {
    for state in 0..component.num_states() {
        for arc in component.arcs(state) {
            if arc.input >= 0 {
                continue;
            }
            let target = arc.target;
            if !component.is_final(target) || !component.arcs(target).is_empty() {
                let reference = usize::try_from(-arc.input - 1)
                    .ok()
                    .and_then(|index| productions.get(index))
                    .map_or_else(|| arc.input.to_string(), |p| p.name.clone());
                return Err(GrammarError::NotRightLinear {
                    production: production.name.clone(),
                    reference,
                }
                .into());
            }
        }
    }
    Ok(())
}
