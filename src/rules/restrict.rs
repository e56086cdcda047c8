//! Context restriction
//!
//! `restriction(D, [(L, C, R), ...])` accepts the strings in which every
//! occurrence of `D` sits inside one of the allowed `L C R` frames. The
//! occurrence under test is bracketed by delimiters, every bracketing that no
//! frame licenses is collected, and the delimiter-free result is complemented.

use std::collections::BTreeSet;

use super::pairs::{BOUNDARY, DELIMITER, Pair, PairWorld};
use crate::fsm::{Fst, algebra};
use crate::symbols::{self, RESTRICT_DELIM, WORD_BOUNDARY};

/// Strings over `universe` whose `domain` occurrences all fall inside an
/// `allowed` frame `(left, center, right)`.
pub fn restriction(
    world: &PairWorld,
    domain: &Fst,
    allowed: &[(Fst, Fst, Fst)],
    universe: &BTreeSet<Pair>,
) -> Fst {
    let any = world.star_of(universe);
    let delimiter = world.pair(DELIMITER);

    let marked = algebra::concat_all([&any, &delimiter, domain, &delimiter, &any]);
    let frames: Vec<Fst> = allowed
        .iter()
        .map(|(left, center, right)| {
            algebra::concat_all([&any, left, &delimiter, center, &delimiter, right, &any])
        })
        .collect();

    let unlicensed = algebra::difference(&marked, &algebra::union_all(&frames));
    let violations = world.erase(&unlicensed, &[RESTRICT_DELIM]);
    algebra::complement_over(&violations, universe)
}

/// `center => L1 _ R1, L2 _ R2, ...` over plain acceptors. An absent context
/// side matches anything, and `#` in a context matches the string edge.
pub fn restrict_acceptor(center: &Fst, contexts: &[(Option<Fst>, Option<Fst>)]) -> Fst {
    let world = PairWorld::new(
        std::iter::once(center).chain(
            contexts
                .iter()
                .flat_map(|(left, right)| left.iter().chain(right.iter())),
        ),
    );
    let symbols = world.identity();
    let mut universe = symbols.clone();
    universe.insert(BOUNDARY);

    let center = world.adopt(center);
    let side = |fst: &Option<Fst>| match fst {
        Some(fst) => world.adopt(fst),
        None => world.epsilon(),
    };
    let allowed: Vec<(Fst, Fst, Fst)> = contexts
        .iter()
        .map(|(left, right)| (side(left), center.clone(), side(right)))
        .collect();

    let restricted = restriction(&world, &center, &allowed, &universe);
    let boundary = world.pair(BOUNDARY);
    let framed = algebra::concat_all([&boundary, &world.star_of(&symbols), &boundary]);
    let mut result = world.erase(&algebra::intersect(&restricted, &framed), &[WORD_BOUNDARY]);
    result.retain_sigma(|label| !symbols::is_marker(label));
    algebra::optimize(&result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::paths;
    use crate::symbols::{FIRST_USER, Label};

    const A: Label = FIRST_USER;
    const B: Label = FIRST_USER + 1;
    const C: Label = FIRST_USER + 2;

    #[test]
    fn occurrences_outside_the_context_are_rejected() {
        // a => b _
        let fst = restrict_acceptor(
            &Fst::symbol(A),
            &[(Some(Fst::symbol(B)), None)],
        );
        assert!(paths::accepts(&fst, &[B, A]));
        assert!(paths::accepts(&fst, &[C, B, A, B]));
        assert!(paths::accepts(&fst, &[C]));
        assert!(!paths::accepts(&fst, &[A]));
        assert!(!paths::accepts(&fst, &[B, A, A]));
    }

    #[test]
    fn any_listed_context_licenses_an_occurrence() {
        // a => b _ , _ c
        let fst = restrict_acceptor(
            &Fst::symbol(A),
            &[(Some(Fst::symbol(B)), None), (None, Some(Fst::symbol(C)))],
        );
        assert!(paths::accepts(&fst, &[B, A]));
        assert!(paths::accepts(&fst, &[A, C]));
        assert!(!paths::accepts(&fst, &[C, A]));
    }

    #[test]
    fn boundary_contexts_anchor_to_the_string_edge() {
        // a => # _
        let fst = restrict_acceptor(
            &Fst::symbol(A),
            &[(Some(Fst::symbol(WORD_BOUNDARY)), None)],
        );
        assert!(paths::accepts(&fst, &[A, B]));
        assert!(!paths::accepts(&fst, &[B, A]));
        assert!(!fst.sigma().contains(&WORD_BOUNDARY));
    }
}
