use std::collections::BTreeSet;

use super::{Arc, Fst};
use crate::symbols::{self, EPSILON, IDENTITY, Label, UNKNOWN};

/// Teach `fst` about symbols it did not know, expanding its wildcard arcs so
/// the language stays the same once those symbols are part of sigma.
///
/// * `.:.` (identity) gains `s:s`
/// * `?:?` (distinct unknowns) gains `s:?`, `?:s` and `s:t` for `s != t`
/// * `?:x` gains `s:x`, `x:?` gains `x:s`
///
/// Markers are never matched by wildcards and are only recorded in sigma.
pub fn expand(fst: &mut Fst, new: &BTreeSet<Label>) {
    let fresh: Vec<Label> = new
        .iter()
        .copied()
        .filter(|&l| {
            symbols::is_sigma_label(l) && !symbols::is_marker(l) && !fst.sigma().contains(&l)
        })
        .collect();
    fst.extend_sigma(new.iter().copied());
    if fresh.is_empty() || !fst.contains_other() {
        return;
    }

    for state in 0..fst.num_states() {
        let mut added = Vec::new();
        for arc in fst.arcs(state) {
            let target = arc.target;
            match (arc.input, arc.output) {
                (IDENTITY, IDENTITY) => {
                    for &s in &fresh {
                        added.push(Arc::new(s, s, target));
                    }
                }
                (UNKNOWN, UNKNOWN) => {
                    for &s in &fresh {
                        added.push(Arc::new(s, UNKNOWN, target));
                        added.push(Arc::new(UNKNOWN, s, target));
                        for &t in &fresh {
                            if s != t {
                                added.push(Arc::new(s, t, target));
                            }
                        }
                    }
                }
                (UNKNOWN, other) => {
                    for &s in &fresh {
                        added.push(Arc::new(s, other, target));
                    }
                }
                (other, UNKNOWN) => {
                    for &s in &fresh {
                        added.push(Arc::new(other, s, target));
                    }
                }
                _ => {}
            }
        }
        fst.arcs_mut(state).extend(added);
    }
}

/// Bring two automata to a common sigma.
pub fn harmonize(a: &mut Fst, b: &mut Fst) {
    let union: BTreeSet<Label> = a.sigma().union(b.sigma()).copied().collect();
    expand(a, &union);
    expand(b, &union);
}

/// Clone-and-harmonize helper for binary operations.
pub fn harmonized(a: &Fst, b: &Fst) -> (Fst, Fst) {
    let mut a = a.clone();
    let mut b = b.clone();
    harmonize(&mut a, &mut b);
    (a, b)
}

/// Every label pair over `sigma` for an acceptor: `s:s` plus `.:.`.
pub fn acceptor_alphabet(sigma: &BTreeSet<Label>) -> BTreeSet<(Label, Label)> {
    let mut labels: BTreeSet<(Label, Label)> = sigma.iter().map(|&s| (s, s)).collect();
    labels.insert((IDENTITY, IDENTITY));
    labels
}

/// Every label pair a transducer over `sigma` may use, markers excluded:
/// all `x:y` with `x, y` in sigma, `?` or epsilon (not both epsilon), plus
/// the identity wildcard.
pub fn pair_alphabet(sigma: &BTreeSet<Label>) -> BTreeSet<(Label, Label)> {
    let mut sides: Vec<Label> = sigma
        .iter()
        .copied()
        .filter(|&l| !symbols::is_marker(l))
        .collect();
    sides.push(UNKNOWN);
    sides.push(EPSILON);
    let mut labels = BTreeSet::new();
    for &x in &sides {
        for &y in &sides {
            if x == EPSILON && y == EPSILON {
                continue;
            }
            labels.insert((x, y));
        }
    }
    labels.insert((IDENTITY, IDENTITY));
    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::paths;
    use crate::symbols::FIRST_USER;

    const A: Label = FIRST_USER;
    const B: Label = FIRST_USER + 1;

    #[test]
    fn identity_wildcard_gains_new_symbols() {
        let mut any = Fst::any();
        expand(&mut any, &BTreeSet::from([A]));
        assert!(any.sigma().contains(&A));
        assert!(paths::accepts(&any, &[A]));
    }

    #[test]
    fn known_symbols_are_not_duplicated() {
        let mut fst = Fst::symbol(A);
        let before = fst.num_arcs();
        expand(&mut fst, &BTreeSet::from([A, B]));
        assert_eq!(fst.num_arcs(), before);
        assert!(fst.sigma().contains(&B));
    }

    #[test]
    fn distinct_unknowns_expand_to_cross_pairs() {
        let mut fst = Fst::pair(UNKNOWN, UNKNOWN);
        expand(&mut fst, &BTreeSet::from([A, B]));
        let labels = fst.labels();
        assert!(labels.contains(&(A, B)));
        assert!(labels.contains(&(A, UNKNOWN)));
        assert!(!labels.contains(&(A, A)));
    }

    #[test]
    fn markers_are_not_matched_by_wildcards() {
        let mut any = Fst::any();
        expand(&mut any, &BTreeSet::from([crate::symbols::WORD_BOUNDARY]));
        assert_eq!(any.num_arcs(), 1);
    }
}
