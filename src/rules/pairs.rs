//! Pair-symbol alphabets for rule compilation
//!
//! While a rule is compiled every arc label `(upper, lower)` is one symbol.
//! All automata of a compilation are expanded to one shared sigma before any
//! of them is combined, so the algebra never widens a wildcard halfway through
//! and `.:.` keeps meaning "identity on a symbol nobody mentioned".

use std::collections::BTreeSet;

use super::ContextSide;
use crate::fsm::{Arc, Fst, algebra, sigma};
use crate::symbols::{
    self, EPSILON, IDENTITY, INSIDE_CLOSE, INSIDE_OPEN, Label, RESTRICT_DELIM, UNKNOWN,
    WORD_BOUNDARY,
};

/// An arc label treated as a single symbol.
pub type Pair = (Label, Label);

/// Opens a rewritten span.
pub const OPEN: Pair = (INSIDE_OPEN, INSIDE_OPEN);
/// Closes a rewritten span.
pub const CLOSE: Pair = (INSIDE_CLOSE, INSIDE_CLOSE);
/// String edge.
pub const BOUNDARY: Pair = (WORD_BOUNDARY, WORD_BOUNDARY);
/// Marks the span under test in the restriction construction.
pub const DELIMITER: Pair = (RESTRICT_DELIM, RESTRICT_DELIM);

/// Which level of a pair a context constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// The upper (input) level
    Upper,
    /// The lower (output) level
    Lower,
}

impl Level {
    fn of(self, pair: &Pair) -> Label {
        match self {
            Level::Upper => pair.0,
            Level::Lower => pair.1,
        }
    }
}

/// The alphabet shared by one compilation.
#[derive(Debug, Clone)]
pub struct PairWorld {
    /// User symbols plus every marker
    sigma: BTreeSet<Label>,
    /// Every non-marker pair over the user symbols, `?` and epsilon
    pi: BTreeSet<Pair>,
}

impl PairWorld {
    /// Build the alphabet covering every symbol of `automata`.
    pub fn new<'a>(automata: impl IntoIterator<Item = &'a Fst>) -> Self {
        let mut sigma: BTreeSet<Label> = automata
            .into_iter()
            .flat_map(|fst| fst.sigma().iter().copied())
            .collect();
        sigma.extend([WORD_BOUNDARY, RESTRICT_DELIM, INSIDE_OPEN, INSIDE_CLOSE]);
        let pi = sigma::pair_alphabet(&sigma);
        Self { sigma, pi }
    }

    /// All non-marker pairs (Π).
    pub fn pi(&self) -> &BTreeSet<Pair> {
        &self.pi
    }

    /// Pairs that copy a symbol unchanged.
    pub fn identity(&self) -> BTreeSet<Pair> {
        self.select(|&(upper, lower)| upper == lower && upper != UNKNOWN)
    }

    /// Pairs that consume nothing on the upper level.
    pub fn inserting(&self) -> BTreeSet<Pair> {
        self.select(|&(upper, _)| upper == EPSILON)
    }

    /// Pairs that consume an upper symbol.
    pub fn consuming(&self) -> BTreeSet<Pair> {
        self.select(|&(upper, _)| upper != EPSILON)
    }

    /// Π plus the span brackets.
    pub fn spans(&self) -> BTreeSet<Pair> {
        let mut labels = self.pi.clone();
        labels.extend([OPEN, CLOSE]);
        labels
    }

    /// Π plus the span brackets and the boundary.
    pub fn universe(&self) -> BTreeSet<Pair> {
        let mut labels = self.spans();
        labels.insert(BOUNDARY);
        labels
    }

    fn select(&self, keep: impl Fn(&Pair) -> bool) -> BTreeSet<Pair> {
        self.pi.iter().copied().filter(|pair| keep(pair)).collect()
    }

    /// A copy of `fst` expanded to this alphabet.
    pub fn adopt(&self, fst: &Fst) -> Fst {
        let mut fst = fst.clone();
        sigma::expand(&mut fst, &self.sigma);
        fst
    }

    fn blank(&self, states: usize) -> Fst {
        let mut fst = Fst::empty();
        for _ in 1..states {
            fst.add_state();
        }
        fst.extend_sigma(self.sigma.iter().copied());
        fst
    }

    /// The empty string.
    pub fn epsilon(&self) -> Fst {
        let mut fst = self.blank(1);
        fst.set_final(0, true);
        fst
    }

    /// Exactly one pair from `labels`.
    pub fn one_of(&self, labels: &BTreeSet<Pair>) -> Fst {
        let mut fst = self.blank(2);
        fst.set_final(1, true);
        for &(upper, lower) in labels {
            fst.add_arc(0, Arc::new(upper, lower, 1));
        }
        fst
    }

    /// A single pair.
    pub fn pair(&self, pair: Pair) -> Fst {
        self.one_of(&BTreeSet::from([pair]))
    }

    /// Any sequence over `labels`.
    pub fn star_of(&self, labels: &BTreeSet<Pair>) -> Fst {
        let mut fst = self.epsilon();
        for &(upper, lower) in labels {
            fst.add_arc(0, Arc::new(upper, lower, 0));
        }
        fst
    }

    /// A non-empty sequence over `labels`.
    pub fn plus_of(&self, labels: &BTreeSet<Pair>) -> Fst {
        algebra::concat(&self.one_of(labels), &self.star_of(labels))
    }

    /// Lift an acceptor to the pair world: each symbol becomes every pair
    /// carrying it on `level`, and insertions on that level as well as span
    /// brackets are skipped freely.
    pub fn lift(&self, acceptor: &Fst, level: Level) -> Fst {
        let source = self.adopt(acceptor);
        let skipped: Vec<Pair> = self
            .pi
            .iter()
            .copied()
            .filter(|pair| level.of(pair) == EPSILON)
            .chain([OPEN, CLOSE])
            .collect();

        let mut out = self.blank(source.num_states());
        out.set_start(source.start());
        for state in 0..source.num_states() {
            out.set_final(state, source.is_final(state));
            for &(upper, lower) in &skipped {
                out.add_arc(state, Arc::new(upper, lower, state));
            }
            for arc in source.arcs(state) {
                let target = arc.target;
                match arc.input {
                    EPSILON => out.add_arc(state, Arc::new(EPSILON, EPSILON, target)),
                    label if symbols::is_marker(label) => {
                        out.add_arc(state, Arc::new(label, label, target))
                    }
                    IDENTITY => {
                        for pair in self
                            .pi
                            .iter()
                            .filter(|pair| matches!(level.of(pair), IDENTITY | UNKNOWN))
                        {
                            out.add_arc(state, Arc::new(pair.0, pair.1, target));
                        }
                    }
                    label => {
                        for pair in self.pi.iter().filter(|pair| level.of(pair) == label) {
                            out.add_arc(state, Arc::new(pair.0, pair.1, target));
                        }
                    }
                }
            }
        }
        out
    }

    /// Lift one side of a context. An absent level does not constrain.
    pub fn lift_side(&self, side: &ContextSide) -> Fst {
        match (&side.upper, &side.lower) {
            (None, None) => self.lift(&Fst::epsilon(), Level::Upper),
            (Some(upper), None) => self.lift(upper, Level::Upper),
            (None, Some(lower)) => self.lift(lower, Level::Lower),
            (Some(upper), Some(lower)) => {
                algebra::intersect(&self.lift(upper, Level::Upper), &self.lift(lower, Level::Lower))
            }
        }
    }

    /// Strings that do not end inside a rewritten span.
    pub fn not_inside(&self) -> Fst {
        let mut fst = self.blank(2);
        fst.set_final(0, true);
        for &(upper, lower) in self.pi.iter().chain([&BOUNDARY]) {
            fst.add_arc(0, Arc::new(upper, lower, 0));
            fst.add_arc(1, Arc::new(upper, lower, 1));
        }
        fst.add_arc(0, Arc::new(OPEN.0, OPEN.1, 1));
        fst.add_arc(1, Arc::new(CLOSE.0, CLOSE.1, 0));
        fst
    }

    /// Word prefixes (opening `#` included) that end with unrewritten
    /// material or the opening boundary itself.
    pub fn ends_outside(&self) -> Fst {
        // 0: after outside material, 1: inside a span, 2: right after a span
        let mut fst = self.blank(3);
        fst.set_final(0, true);
        for &(upper, lower) in self.pi.iter().chain([&BOUNDARY]) {
            fst.add_arc(0, Arc::new(upper, lower, 0));
            fst.add_arc(2, Arc::new(upper, lower, 0));
            fst.add_arc(1, Arc::new(upper, lower, 1));
        }
        for from in [0, 2] {
            fst.add_arc(from, Arc::new(OPEN.0, OPEN.1, 1));
        }
        fst.add_arc(1, Arc::new(CLOSE.0, CLOSE.1, 2));
        let prefix = algebra::concat(&self.pair(BOUNDARY), &self.star_of(&self.spans()));
        algebra::intersect(&fst, &prefix)
    }

    /// Word suffixes (closing `#` included) that start with unrewritten
    /// material or the closing boundary itself.
    pub fn starts_outside(&self) -> Fst {
        let mut outside = self.pi.clone();
        outside.insert(BOUNDARY);
        let leading = algebra::concat(&self.one_of(&outside), &self.star_of(&self.universe()));
        let suffix = algebra::concat(&self.star_of(&self.spans()), &self.pair(BOUNDARY));
        algebra::intersect(&leading, &suffix)
    }

    /// Replace the given marker pairs by epsilon and remove the epsilons.
    pub fn erase(&self, fst: &Fst, markers: &[Label]) -> Fst {
        let mut erased = fst.clone();
        erased.map_labels(|upper, lower| {
            if upper == lower && markers.contains(&upper) {
                (EPSILON, EPSILON)
            } else {
                (upper, lower)
            }
        });
        algebra::rm_epsilon(&erased)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::FIRST_USER;

    const A: Label = FIRST_USER;
    const B: Label = FIRST_USER + 1;

    fn world() -> PairWorld {
        PairWorld::new([&Fst::symbol(A), &Fst::symbol(B)])
    }

    fn accepts_pairs(fst: &Fst, pairs: &[Pair]) -> bool {
        !algebra::is_empty(&algebra::intersect(fst, &Fst::pairs(pairs)))
    }

    #[test]
    fn alphabet_covers_user_symbols_unknown_and_epsilon() {
        let world = world();
        // (a, b, ?, eps) squared minus (eps, eps), plus the identity wildcard
        assert_eq!(world.pi().len(), 16);
        assert!(world.identity().contains(&(A, A)));
        assert!(world.identity().contains(&(IDENTITY, IDENTITY)));
        assert!(!world.identity().contains(&(UNKNOWN, UNKNOWN)));
        assert!(world.inserting().iter().all(|&(upper, _)| upper == EPSILON));
    }

    #[test]
    fn upper_lift_ignores_the_lower_level_and_brackets() {
        let world = world();
        let lifted = world.lift(&Fst::symbol(A), Level::Upper);
        assert!(accepts_pairs(&lifted, &[(A, B)]));
        assert!(accepts_pairs(&lifted, &[OPEN, (A, EPSILON), CLOSE]));
        assert!(accepts_pairs(&lifted, &[(EPSILON, B), (A, A)]));
        assert!(!accepts_pairs(&lifted, &[(B, A)]));
    }

    #[test]
    fn lower_lift_matches_output_symbols() {
        let world = world();
        let lifted = world.lift(&Fst::symbol(A), Level::Lower);
        assert!(accepts_pairs(&lifted, &[(B, A)]));
        assert!(accepts_pairs(&lifted, &[(B, EPSILON), (EPSILON, A)]));
        assert!(!accepts_pairs(&lifted, &[(A, B)]));
    }

    #[test]
    fn not_inside_tracks_span_brackets() {
        let world = world();
        let fst = world.not_inside();
        assert!(accepts_pairs(&fst, &[BOUNDARY, OPEN, (A, B), CLOSE]));
        assert!(!accepts_pairs(&fst, &[BOUNDARY, OPEN, (A, B)]));
    }

    #[test]
    fn outside_positions_stay_within_the_word() {
        let world = world();
        let ends = world.ends_outside();
        assert!(accepts_pairs(&ends, &[BOUNDARY]));
        assert!(accepts_pairs(&ends, &[BOUNDARY, OPEN, (A, B), CLOSE, (A, A)]));
        assert!(!accepts_pairs(&ends, &[BOUNDARY, OPEN, (A, B), CLOSE]));
        assert!(!accepts_pairs(&ends, &[BOUNDARY, (A, A), BOUNDARY]));

        let starts = world.starts_outside();
        assert!(accepts_pairs(&starts, &[BOUNDARY]));
        assert!(accepts_pairs(&starts, &[(A, A), BOUNDARY]));
        assert!(!accepts_pairs(&starts, &[OPEN, (A, B), CLOSE, BOUNDARY]));
        assert!(!accepts_pairs(&starts, &[BOUNDARY, (A, A), BOUNDARY]));
        assert!(algebra::is_empty(&algebra::intersect(&starts, &world.epsilon())));
    }

    #[test]
    fn erase_drops_markers() {
        let world = world();
        let marked = algebra::concat_all([&world.pair(DELIMITER), &world.pair((A, A))]);
        let erased = world.erase(&marked, &[RESTRICT_DELIM]);
        assert!(accepts_pairs(&erased, &[(A, A)]));
    }
}
