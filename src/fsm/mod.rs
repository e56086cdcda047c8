//! Reference finite-state backend
//!
//! A deliberately small automaton library over explicit state and arc
//! vectors. Every arc carries an `(input, output)` label pair; an acceptor is
//! an automaton whose arcs all carry identical labels. `(EPSILON, EPSILON)` is
//! the only epsilon. Unknown symbols are represented with the `IDENTITY` and
//! `UNKNOWN` wildcards, which are expanded against a concrete sigma whenever
//! two automata are combined (see [`sigma`]).
//!
//! The interpreter only talks to this module through [`Fst`] and the free
//! functions in [`algebra`] and [`paths`], which keeps the backend swappable.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::symbols::{self, EPSILON, IDENTITY, Label, UNKNOWN};

/// Automaton operations (union, composition, determinization, ...).
pub mod algebra;
/// String enumeration, path extraction and random generation.
pub mod paths;
/// Sigma harmonization and wildcard expansion.
pub mod sigma;

/// Index of a state within an [`Fst`].
pub type StateId = usize;

/// Errors raised by automaton operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FsmError {
    /// The operation is only defined for acceptors.
    #[error("{operation} requires an acceptor, got a transducer")]
    NotAcceptor {
        /// Name of the rejected operation
        operation: &'static str,
    },

    /// Iteration bounds were inverted.
    #[error("invalid iteration bounds {{{min},{max}}}")]
    InvalidBounds {
        /// Lower bound
        min: u32,
        /// Upper bound
        max: u32,
    },
}

/// Convenience result alias for automaton operations
pub type FsmResult<T> = std::result::Result<T, FsmError>;

/// A labelled transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Arc {
    /// Upper-side label
    pub input: Label,
    /// Lower-side label
    pub output: Label,
    /// Destination state
    pub target: StateId,
}

impl Arc {
    /// Create a new arc.
    pub fn new(input: Label, output: Label, target: StateId) -> Self {
        Self {
            input,
            output,
            target,
        }
    }

    /// Whether this arc consumes nothing on either side.
    pub fn is_epsilon(&self) -> bool {
        self.input == EPSILON && self.output == EPSILON
    }

    /// The label pair of this arc.
    pub fn label(&self) -> (Label, Label) {
        (self.input, self.output)
    }
}

/// A single automaton state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct State {
    /// Outgoing arcs
    pub arcs: Vec<Arc>,
    /// Whether the state is final
    pub is_final: bool,
}

/// A finite-state acceptor or transducer.
#[derive(Debug, Clone, PartialEq)]
pub struct Fst {
    states: Vec<State>,
    start: StateId,
    sigma: BTreeSet<Label>,
    contains_other: bool,
}

impl Default for Fst {
    fn default() -> Self {
        Self::empty()
    }
}

impl Fst {
    /// The empty language: a single non-final start state.
    pub fn empty() -> Self {
        Self {
            states: vec![State::default()],
            start: 0,
            sigma: BTreeSet::new(),
            contains_other: false,
        }
    }

    /// The language containing only the empty string.
    pub fn epsilon() -> Self {
        let mut fst = Self::empty();
        fst.set_final(0, true);
        fst
    }

    /// A single-arc acceptor for `label`.
    pub fn symbol(label: Label) -> Self {
        Self::pair(label, label)
    }

    /// A single-arc automaton mapping `input` to `output`.
    pub fn pair(input: Label, output: Label) -> Self {
        let mut fst = Self::empty();
        let end = fst.add_state();
        fst.set_final(end, true);
        fst.add_arc(0, Arc::new(input, output, end));
        fst
    }

    /// Any single symbol (`.`).
    pub fn any() -> Self {
        Self::symbol(IDENTITY)
    }

    /// `.*`, the universal acceptor.
    pub fn universal() -> Self {
        let mut fst = Self::epsilon();
        fst.add_arc(0, Arc::new(IDENTITY, IDENTITY, 0));
        fst
    }

    /// An acceptor for exactly the given label sequence.
    pub fn string(labels: &[Label]) -> Self {
        let mut fst = Self::empty();
        let mut current = 0;
        for &label in labels {
            let next = fst.add_state();
            fst.add_arc(current, Arc::new(label, label, next));
            current = next;
        }
        fst.set_final(current, true);
        fst
    }

    /// A linear automaton for a sequence of label pairs.
    pub fn pairs(labels: &[(Label, Label)]) -> Self {
        let mut fst = Self::empty();
        let mut current = 0;
        for &(input, output) in labels {
            let next = fst.add_state();
            fst.add_arc(current, Arc::new(input, output, next));
            current = next;
        }
        fst.set_final(current, true);
        fst
    }

    /// Append a fresh non-final state.
    pub fn add_state(&mut self) -> StateId {
        self.states.push(State::default());
        self.states.len() - 1
    }

    /// Add an arc, updating sigma and the wildcard flag.
    pub fn add_arc(&mut self, from: StateId, arc: Arc) {
        for label in [arc.input, arc.output] {
            if symbols::is_sigma_label(label) {
                self.sigma.insert(label);
            } else if symbols::is_wildcard(label) {
                self.contains_other = true;
            }
        }
        self.states[from].arcs.push(arc);
    }

    /// Mark or unmark a state as final.
    pub fn set_final(&mut self, state: StateId, is_final: bool) {
        self.states[state].is_final = is_final;
    }

    /// Change the start state.
    pub fn set_start(&mut self, state: StateId) {
        self.start = state;
    }

    /// The start state.
    pub fn start(&self) -> StateId {
        self.start
    }

    /// All states.
    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// Outgoing arcs of `state`.
    pub fn arcs(&self, state: StateId) -> &[Arc] {
        &self.states[state].arcs
    }

    /// Mutable access to the arcs of `state`.
    pub(crate) fn arcs_mut(&mut self, state: StateId) -> &mut Vec<Arc> {
        &mut self.states[state].arcs
    }

    /// Whether `state` is final.
    pub fn is_final(&self, state: StateId) -> bool {
        self.states[state].is_final
    }

    /// Number of states.
    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    /// Number of arcs.
    pub fn num_arcs(&self) -> usize {
        self.states.iter().map(|s| s.arcs.len()).sum()
    }

    /// Symbols this automaton is explicitly defined over.
    pub fn sigma(&self) -> &BTreeSet<Label> {
        &self.sigma
    }

    /// Add symbols to sigma without touching arcs.
    pub fn extend_sigma(&mut self, labels: impl IntoIterator<Item = Label>) {
        self.sigma
            .extend(labels.into_iter().filter(|&l| symbols::is_sigma_label(l)));
    }

    /// Whether any arc mentions a wildcard.
    pub fn contains_other(&self) -> bool {
        self.contains_other
    }

    /// Recompute the wildcard flag from the arcs.
    pub fn refresh_flags(&mut self) {
        self.contains_other = self
            .states
            .iter()
            .flat_map(|s| s.arcs.iter())
            .any(|a| symbols::is_wildcard(a.input) || symbols::is_wildcard(a.output));
    }

    /// True when every arc carries identical labels and no arc denotes a
    /// mapping between two different unknown symbols.
    pub fn is_acceptor(&self) -> bool {
        self.states
            .iter()
            .flat_map(|s| s.arcs.iter())
            .all(|a| a.input == a.output && a.input != UNKNOWN)
    }

    /// Whether the empty string is accepted (on the upper side).
    pub fn accepts_empty(&self) -> bool {
        self.epsilon_closure(self.start)
            .iter()
            .any(|&s| self.states[s].is_final)
    }

    /// Whether the upper side accepts the empty string (ignoring output).
    pub fn accepts_empty_input(&self) -> bool {
        let mut seen = BTreeSet::new();
        let mut stack = vec![self.start];
        while let Some(state) = stack.pop() {
            if !seen.insert(state) {
                continue;
            }
            if self.states[state].is_final {
                return true;
            }
            for arc in &self.states[state].arcs {
                if arc.input == EPSILON {
                    stack.push(arc.target);
                }
            }
        }
        false
    }

    /// States reachable from `state` through epsilon arcs, `state` included.
    pub fn epsilon_closure(&self, state: StateId) -> BTreeSet<StateId> {
        let mut closure = BTreeSet::new();
        let mut stack = vec![state];
        while let Some(s) = stack.pop() {
            if closure.insert(s) {
                for arc in &self.states[s].arcs {
                    if arc.is_epsilon() {
                        stack.push(arc.target);
                    }
                }
            }
        }
        closure
    }

    /// Every label pair used by an arc, epsilon excluded.
    pub fn labels(&self) -> BTreeSet<(Label, Label)> {
        self.states
            .iter()
            .flat_map(|s| s.arcs.iter())
            .filter(|a| !a.is_epsilon())
            .map(Arc::label)
            .collect()
    }

    /// Append a copy of `other`'s states; returns the offset of its states.
    pub fn splice(&mut self, other: &Fst) -> StateId {
        let offset = self.states.len();
        for state in &other.states {
            let arcs = state
                .arcs
                .iter()
                .map(|a| Arc::new(a.input, a.output, a.target + offset))
                .collect();
            self.states.push(State {
                arcs,
                is_final: state.is_final,
            });
        }
        self.sigma.extend(other.sigma.iter().copied());
        self.contains_other |= other.contains_other;
        offset
    }

    /// Rewrite every arc label through `f`, dropping nothing.
    pub fn map_labels(&mut self, f: impl Fn(Label, Label) -> (Label, Label)) {
        for state in &mut self.states {
            for arc in &mut state.arcs {
                let (input, output) = f(arc.input, arc.output);
                arc.input = input;
                arc.output = output;
            }
        }
        self.refresh_flags();
    }

    /// Remove labels from sigma (used after markers are erased).
    pub fn retain_sigma(&mut self, keep: impl Fn(Label) -> bool) {
        self.sigma.retain(|&l| keep(l));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::FIRST_USER;

    #[test]
    fn constructors_track_sigma_and_wildcards() {
        let a = Fst::symbol(FIRST_USER);
        assert!(a.sigma().contains(&FIRST_USER));
        assert!(!a.contains_other());
        assert!(a.is_acceptor());

        let any = Fst::any();
        assert!(any.contains_other());
        assert!(any.sigma().is_empty());
    }

    #[test]
    fn accepts_empty_follows_epsilon_arcs() {
        let mut fst = Fst::empty();
        let next = fst.add_state();
        fst.add_arc(0, Arc::new(EPSILON, EPSILON, next));
        fst.set_final(next, true);
        assert!(fst.accepts_empty());
        assert!(!Fst::symbol(FIRST_USER).accepts_empty());
    }

    #[test]
    fn unknown_pairs_are_not_acceptors() {
        let fst = Fst::pair(UNKNOWN, UNKNOWN);
        assert!(!fst.is_acceptor());
        assert!(Fst::pair(FIRST_USER, FIRST_USER).is_acceptor());
    }
}
