use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use super::sigma::{self, harmonized};
use super::{Arc, Fst, FsmError, FsmResult, StateId};
use crate::symbols::{EPSILON, IDENTITY, Label, UNKNOWN};

/// `a | b`
pub fn union(a: &Fst, b: &Fst) -> Fst {
    let (a, b) = harmonized(a, b);
    let mut out = Fst::empty();
    let oa = out.splice(&a);
    let ob = out.splice(&b);
    out.add_arc(0, Arc::new(EPSILON, EPSILON, a.start() + oa));
    out.add_arc(0, Arc::new(EPSILON, EPSILON, b.start() + ob));
    out
}

/// Union of many automata; the empty language for no input.
pub fn union_all<'a>(items: impl IntoIterator<Item = &'a Fst>) -> Fst {
    let mut iter = items.into_iter();
    let Some(first) = iter.next() else {
        return Fst::empty();
    };
    iter.fold(first.clone(), |acc, next| union(&acc, next))
}

/// `a b`
pub fn concat(a: &Fst, b: &Fst) -> Fst {
    let (a, b) = harmonized(a, b);
    let mut out = a.clone();
    let ob = out.splice(&b);
    for state in 0..a.num_states() {
        if a.is_final(state) {
            out.set_final(state, false);
            out.add_arc(state, Arc::new(EPSILON, EPSILON, b.start() + ob));
        }
    }
    out
}

/// Concatenation of a sequence; epsilon for no input.
pub fn concat_all<'a>(items: impl IntoIterator<Item = &'a Fst>) -> Fst {
    items
        .into_iter()
        .fold(Fst::epsilon(), |acc, next| concat(&acc, next))
}

/// `a*`
pub fn star(a: &Fst) -> Fst {
    let mut out = Fst::epsilon();
    let offset = out.splice(a);
    out.add_arc(0, Arc::new(EPSILON, EPSILON, a.start() + offset));
    for state in 0..a.num_states() {
        if a.is_final(state) {
            out.add_arc(state + offset, Arc::new(EPSILON, EPSILON, 0));
        }
    }
    out
}

/// `a+`
pub fn plus(a: &Fst) -> Fst {
    let mut out = a.clone();
    for state in 0..a.num_states() {
        if a.is_final(state) {
            out.add_arc(state, Arc::new(EPSILON, EPSILON, a.start()));
        }
    }
    out
}

/// `a?`
pub fn optional(a: &Fst) -> Fst {
    union(a, &Fst::epsilon())
}

/// `a{min,max}`; `max == None` means unbounded.
pub fn repeat(a: &Fst, min: u32, max: Option<u32>) -> FsmResult<Fst> {
    if let Some(max) = max {
        if max < min {
            return Err(FsmError::InvalidBounds { min, max });
        }
    }
    let mut out = Fst::epsilon();
    for _ in 0..min {
        out = concat(&out, a);
    }
    match max {
        None => out = concat(&out, &star(a)),
        Some(max) => {
            let opt = optional(a);
            for _ in min..max {
                out = concat(&out, &opt);
            }
        }
    }
    Ok(out)
}

/// Swap upper and lower labels.
pub fn invert(a: &Fst) -> Fst {
    let mut out = a.clone();
    invert_in_place(&mut out);
    out
}

/// Swap the sides of every arc of `fst`.
pub fn invert_in_place(fst: &mut Fst) {
    fst.map_labels(|i, o| (o, i));
}

fn project_label(label: Label) -> (Label, Label) {
    match label {
        UNKNOWN => (IDENTITY, IDENTITY),
        other => (other, other),
    }
}

/// The upper-side language.
pub fn project_input(a: &Fst) -> Fst {
    let mut out = a.clone();
    project_input_in_place(&mut out);
    out
}

/// Replace `fst` by its upper-side language.
pub fn project_input_in_place(fst: &mut Fst) {
    fst.map_labels(|i, _| project_label(i));
}

/// The lower-side language.
pub fn project_output(a: &Fst) -> Fst {
    let mut out = a.clone();
    project_output_in_place(&mut out);
    out
}

/// Replace `fst` by its lower-side language.
pub fn project_output_in_place(fst: &mut Fst) {
    fst.map_labels(|_, o| project_label(o));
}

/// Reverse every path.
pub fn reverse(a: &Fst) -> Fst {
    let mut out = Fst::empty();
    let offset = out.num_states();
    for _ in 0..a.num_states() {
        out.add_state();
    }
    out.extend_sigma(a.sigma().iter().copied());
    for (state, data) in a.states().iter().enumerate() {
        for arc in &data.arcs {
            out.add_arc(
                arc.target + offset,
                Arc::new(arc.input, arc.output, state + offset),
            );
        }
        if data.is_final {
            out.add_arc(0, Arc::new(EPSILON, EPSILON, state + offset));
        }
    }
    out.set_final(a.start() + offset, true);
    out
}

/// Drop states that are unreachable from the start or cannot reach a final
/// state. The start state is always kept.
pub fn trim(a: &Fst) -> Fst {
    let n = a.num_states();
    let mut accessible = vec![false; n];
    let mut stack = vec![a.start()];
    while let Some(s) = stack.pop() {
        if !std::mem::replace(&mut accessible[s], true) {
            stack.extend(a.arcs(s).iter().map(|arc| arc.target));
        }
    }

    let mut incoming: Vec<Vec<StateId>> = vec![Vec::new(); n];
    for (state, data) in a.states().iter().enumerate() {
        for arc in &data.arcs {
            incoming[arc.target].push(state);
        }
    }
    let mut coaccessible = vec![false; n];
    let mut stack: Vec<StateId> = (0..n).filter(|&s| a.is_final(s)).collect();
    while let Some(s) = stack.pop() {
        if !std::mem::replace(&mut coaccessible[s], true) {
            stack.extend(incoming[s].iter().copied());
        }
    }

    let mut remap = vec![None; n];
    let mut out = Fst::empty();
    out.extend_sigma(a.sigma().iter().copied());
    remap[a.start()] = Some(0);
    out.set_final(0, a.is_final(a.start()));
    for s in 0..n {
        if s != a.start() && accessible[s] && coaccessible[s] {
            let id = out.add_state();
            out.set_final(id, a.is_final(s));
            remap[s] = Some(id);
        }
    }
    for s in 0..n {
        let Some(from) = remap[s] else { continue };
        if !coaccessible[s] {
            continue;
        }
        for arc in a.arcs(s) {
            if let Some(to) = remap[arc.target] {
                if coaccessible[arc.target] {
                    out.add_arc(from, Arc::new(arc.input, arc.output, to));
                }
            }
        }
    }
    out
}

/// Remove epsilon arcs.
pub fn rm_epsilon(a: &Fst) -> Fst {
    let mut out = Fst::empty();
    for _ in 1..a.num_states() {
        out.add_state();
    }
    out.extend_sigma(a.sigma().iter().copied());
    out.set_start(a.start());
    for state in 0..a.num_states() {
        let mut seen = BTreeSet::new();
        for q in a.epsilon_closure(state) {
            if a.is_final(q) {
                out.set_final(state, true);
            }
            for arc in a.arcs(q) {
                if !arc.is_epsilon() && seen.insert(*arc) {
                    out.add_arc(state, *arc);
                }
            }
        }
    }
    trim(&out)
}

/// Subset construction over label pairs.
pub fn determinize(a: &Fst) -> Fst {
    let mut out = Fst::empty();
    out.extend_sigma(a.sigma().iter().copied());

    let closure_of = |set: &BTreeSet<StateId>| -> BTreeSet<StateId> {
        set.iter().flat_map(|&s| a.epsilon_closure(s)).collect()
    };

    let initial = a.epsilon_closure(a.start());
    let mut ids: HashMap<BTreeSet<StateId>, StateId> = HashMap::new();
    out.set_final(0, initial.iter().any(|&s| a.is_final(s)));
    ids.insert(initial.clone(), 0);
    let mut queue = VecDeque::from([initial]);

    while let Some(set) = queue.pop_front() {
        let from = ids[&set];
        let mut moves: BTreeMap<(Label, Label), BTreeSet<StateId>> = BTreeMap::new();
        for &s in &set {
            for arc in a.arcs(s) {
                if !arc.is_epsilon() {
                    moves.entry(arc.label()).or_default().insert(arc.target);
                }
            }
        }
        for ((input, output), targets) in moves {
            let next = closure_of(&targets);
            let to = match ids.get(&next) {
                Some(&id) => id,
                None => {
                    let id = out.add_state();
                    out.set_final(id, next.iter().any(|&s| a.is_final(s)));
                    ids.insert(next.clone(), id);
                    queue.push_back(next);
                    id
                }
            };
            out.add_arc(from, Arc::new(input, output, to));
        }
    }
    out
}

/// Minimal deterministic automaton over label pairs (Brzozowski).
pub fn minimize(a: &Fst) -> Fst {
    trim(&determinize(&reverse(&determinize(&reverse(a)))))
}

/// Epsilon removal followed by minimization.
pub fn optimize(a: &Fst) -> Fst {
    minimize(&rm_epsilon(a))
}

/// Complement relative to `alphabet*`, treating label pairs as symbols.
pub fn complement_over(a: &Fst, alphabet: &BTreeSet<(Label, Label)>) -> Fst {
    let mut widened = a.clone();
    let labels: BTreeSet<Label> = alphabet.iter().flat_map(|&(i, o)| [i, o]).collect();
    sigma::expand(&mut widened, &labels);
    let det = determinize(&widened);
    let mut out = Fst::empty();
    for _ in 1..det.num_states() {
        out.add_state();
    }
    out.extend_sigma(det.sigma().iter().copied());
    let sink = out.add_state();
    for state in 0..det.num_states() {
        out.set_final(state, !det.is_final(state));
        let mut present = BTreeSet::new();
        for arc in det.arcs(state) {
            if alphabet.contains(&arc.label()) {
                present.insert(arc.label());
                out.add_arc(state, *arc);
            }
        }
        for &(input, output) in alphabet {
            if !present.contains(&(input, output)) {
                out.add_arc(state, Arc::new(input, output, sink));
            }
        }
    }
    out.set_final(sink, true);
    for &(input, output) in alphabet {
        out.add_arc(sink, Arc::new(input, output, sink));
    }
    trim(&out)
}

/// `~a` over the acceptor alphabet of `a`'s sigma.
pub fn complement(a: &Fst) -> FsmResult<Fst> {
    if !a.is_acceptor() {
        return Err(FsmError::NotAcceptor {
            operation: "complement",
        });
    }
    let alphabet = sigma::acceptor_alphabet(a.sigma());
    Ok(complement_over(a, &alphabet))
}

/// Product construction over label pairs.
pub fn intersect(a: &Fst, b: &Fst) -> Fst {
    let (a, b) = harmonized(a, b);
    product(&a, &b)
}

fn product(a: &Fst, b: &Fst) -> Fst {
    let mut out = Fst::empty();
    out.extend_sigma(a.sigma().iter().copied());
    out.extend_sigma(b.sigma().iter().copied());

    let mut ids: HashMap<(StateId, StateId), StateId> = HashMap::new();
    ids.insert((a.start(), b.start()), 0);
    out.set_final(0, a.is_final(a.start()) && b.is_final(b.start()));
    let mut queue = VecDeque::from([(a.start(), b.start())]);

    let visit = |out: &mut Fst,
                     queue: &mut VecDeque<(StateId, StateId)>,
                     ids: &mut HashMap<(StateId, StateId), StateId>,
                     pair: (StateId, StateId)| {
        *ids.entry(pair).or_insert_with(|| {
            let id = out.add_state();
            out.set_final(id, a.is_final(pair.0) && b.is_final(pair.1));
            queue.push_back(pair);
            id
        })
    };

    while let Some((p, q)) = queue.pop_front() {
        let from = ids[&(p, q)];
        for arc in a.arcs(p) {
            if arc.is_epsilon() {
                let to = visit(&mut out, &mut queue, &mut ids, (arc.target, q));
                out.add_arc(from, Arc::new(EPSILON, EPSILON, to));
            }
        }
        for arc in b.arcs(q) {
            if arc.is_epsilon() {
                let to = visit(&mut out, &mut queue, &mut ids, (p, arc.target));
                out.add_arc(from, Arc::new(EPSILON, EPSILON, to));
            }
        }
        for x in a.arcs(p).iter().filter(|arc| !arc.is_epsilon()) {
            for y in b.arcs(q).iter().filter(|arc| arc.label() == x.label()) {
                let to = visit(&mut out, &mut queue, &mut ids, (x.target, y.target));
                out.add_arc(from, Arc::new(x.input, x.output, to));
            }
        }
    }
    trim(&out)
}

/// `a - b`, treating label pairs as symbols.
pub fn difference(a: &Fst, b: &Fst) -> Fst {
    let (a, b) = harmonized(a, b);
    let mut alphabet = a.labels();
    alphabet.extend(b.labels());
    product(&a, &complement_over(&b, &alphabet))
}

/// Whether the automaton accepts nothing.
pub fn is_empty(a: &Fst) -> bool {
    let trimmed = trim(a);
    !trimmed.states().iter().any(|s| s.is_final)
}

/// Language (pair-language) equivalence.
pub fn equivalent(a: &Fst, b: &Fst) -> bool {
    is_empty(&difference(a, b)) && is_empty(&difference(b, a))
}

fn cross_labels(x: Label, y: Label) -> Vec<(Label, Label)> {
    match (x, y) {
        (IDENTITY, IDENTITY) => vec![(IDENTITY, IDENTITY), (UNKNOWN, UNKNOWN)],
        (IDENTITY, y) => vec![(UNKNOWN, y)],
        (x, IDENTITY) => vec![(x, UNKNOWN)],
        (x, y) => vec![(x, y)],
    }
}

fn side_label(label: Label) -> Label {
    if label == IDENTITY { UNKNOWN } else { label }
}

/// Cross product `a:b` of two acceptors. Symbols are paired left to right
/// and the shorter side is padded with epsilon at the end.
pub fn cross_product(a: &Fst, b: &Fst) -> FsmResult<Fst> {
    if !a.is_acceptor() || !b.is_acceptor() {
        return Err(FsmError::NotAcceptor {
            operation: "cross product",
        });
    }
    let (a, b) = harmonized(a, b);
    let a = rm_epsilon(&a);
    let b = rm_epsilon(&b);

    #[derive(Clone, Copy, PartialEq, Eq, Hash)]
    enum Mode {
        Both,
        LowerOnly,
        UpperOnly,
    }

    let mut out = Fst::empty();
    out.extend_sigma(a.sigma().iter().copied());
    let mut ids: HashMap<(StateId, StateId, Mode), StateId> = HashMap::new();
    let initial = (a.start(), b.start(), Mode::Both);
    ids.insert(initial, 0);
    let mut queue = VecDeque::from([initial]);

    let is_final = |(p, q, mode): (StateId, StateId, Mode)| match mode {
        Mode::Both => a.is_final(p) && b.is_final(q),
        Mode::LowerOnly => b.is_final(q),
        Mode::UpperOnly => a.is_final(p),
    };
    out.set_final(0, is_final(initial));

    while let Some(key) = queue.pop_front() {
        let from = ids[&key];
        let (p, q, mode) = key;
        let mut moves: Vec<((Label, Label), (StateId, StateId, Mode))> = Vec::new();
        match mode {
            Mode::Both => {
                for x in a.arcs(p) {
                    for y in b.arcs(q) {
                        for label in cross_labels(x.input, y.input) {
                            moves.push((label, (x.target, y.target, Mode::Both)));
                        }
                    }
                }
                if a.is_final(p) {
                    moves.push(((EPSILON, EPSILON), (p, q, Mode::LowerOnly)));
                }
                if b.is_final(q) {
                    moves.push(((EPSILON, EPSILON), (p, q, Mode::UpperOnly)));
                }
            }
            Mode::LowerOnly => {
                for y in b.arcs(q) {
                    moves.push(((EPSILON, side_label(y.input)), (p, y.target, mode)));
                }
            }
            Mode::UpperOnly => {
                for x in a.arcs(p) {
                    moves.push(((side_label(x.input), EPSILON), (x.target, q, mode)));
                }
            }
        }
        for ((input, output), next) in moves {
            let to = match ids.get(&next) {
                Some(&id) => id,
                None => {
                    let id = out.add_state();
                    out.set_final(id, is_final(next));
                    ids.insert(next, id);
                    queue.push_back(next);
                    id
                }
            };
            out.add_arc(from, Arc::new(input, output, to));
        }
    }
    Ok(rm_epsilon(&out))
}

/// Label pairs produced when `a`'s output wildcard meets `b`'s input wildcard.
fn compose_wildcards(a: (Label, Label), b: (Label, Label)) -> Vec<(Label, Label)> {
    match (a, b) {
        ((IDENTITY, IDENTITY), (IDENTITY, IDENTITY)) => vec![(IDENTITY, IDENTITY)],
        ((IDENTITY, IDENTITY), (UNKNOWN, z)) => vec![(UNKNOWN, z)],
        ((UNKNOWN, UNKNOWN), (IDENTITY, IDENTITY)) => vec![(UNKNOWN, UNKNOWN)],
        ((x, UNKNOWN), (IDENTITY, IDENTITY)) => vec![(x, UNKNOWN)],
        ((UNKNOWN, UNKNOWN), (UNKNOWN, UNKNOWN)) => {
            vec![(IDENTITY, IDENTITY), (UNKNOWN, UNKNOWN)]
        }
        ((x, UNKNOWN), (UNKNOWN, z)) => vec![(x, z)],
        _ => Vec::new(),
    }
}

/// Relational composition `a _o_ b`.
pub fn compose(a: &Fst, b: &Fst) -> Fst {
    let (a, b) = harmonized(a, b);
    let mut out = Fst::empty();
    out.extend_sigma(a.sigma().iter().copied());

    let mut ids: HashMap<(StateId, StateId), StateId> = HashMap::new();
    ids.insert((a.start(), b.start()), 0);
    out.set_final(0, a.is_final(a.start()) && b.is_final(b.start()));
    let mut queue = VecDeque::from([(a.start(), b.start())]);

    while let Some((p, q)) = queue.pop_front() {
        let from = ids[&(p, q)];
        let mut moves: Vec<((Label, Label), (StateId, StateId))> = Vec::new();
        for x in a.arcs(p) {
            if x.output == EPSILON {
                moves.push(((x.input, EPSILON), (x.target, q)));
                continue;
            }
            for y in b.arcs(q) {
                if y.input == EPSILON {
                    continue;
                }
                let wild_out = x.output == IDENTITY || x.output == UNKNOWN;
                let wild_in = y.input == IDENTITY || y.input == UNKNOWN;
                if wild_out && wild_in {
                    for label in compose_wildcards(x.label(), y.label()) {
                        moves.push((label, (x.target, y.target)));
                    }
                } else if !wild_out && !wild_in && x.output == y.input {
                    moves.push(((x.input, y.output), (x.target, y.target)));
                }
            }
        }
        for y in b.arcs(q) {
            if y.input == EPSILON {
                moves.push(((EPSILON, y.output), (p, y.target)));
            }
        }
        for ((input, output), next) in moves {
            let to = match ids.get(&next) {
                Some(&id) => id,
                None => {
                    let id = out.add_state();
                    out.set_final(id, a.is_final(next.0) && b.is_final(next.1));
                    ids.insert(next, id);
                    queue.push_back(next);
                    id
                }
            };
            out.add_arc(from, Arc::new(input, output, to));
        }
    }
    trim(&out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::paths::{accepts, transduce};
    use crate::symbols::FIRST_USER;

    const A: Label = FIRST_USER;
    const B: Label = FIRST_USER + 1;
    const C: Label = FIRST_USER + 2;

    #[test]
    fn union_and_concat_accept_expected_strings() {
        let ab = concat(&Fst::symbol(A), &Fst::symbol(B));
        let lang = union(&ab, &Fst::symbol(C));
        assert!(accepts(&lang, &[A, B]));
        assert!(accepts(&lang, &[C]));
        assert!(!accepts(&lang, &[A]));
    }

    #[test]
    fn star_accepts_repetitions_and_empty() {
        let lang = star(&Fst::symbol(A));
        assert!(accepts(&lang, &[]));
        assert!(accepts(&lang, &[A, A, A]));
        assert!(!accepts(&lang, &[B]));
    }

    #[test]
    fn repeat_respects_bounds() {
        let lang = repeat(&Fst::symbol(A), 2, Some(3)).unwrap();
        assert!(!accepts(&lang, &[A]));
        assert!(accepts(&lang, &[A, A]));
        assert!(accepts(&lang, &[A, A, A]));
        assert!(!accepts(&lang, &[A, A, A, A]));
        assert!(repeat(&Fst::symbol(A), 3, Some(2)).is_err());
    }

    #[test]
    fn complement_uses_identity_wildcard() {
        let not_a = complement(&Fst::symbol(A)).unwrap();
        assert!(!accepts(&not_a, &[A]));
        assert!(accepts(&not_a, &[]));
        assert!(accepts(&not_a, &[A, A]));
        let widened = intersect(&not_a, &Fst::symbol(B));
        assert!(accepts(&widened, &[B]));
    }

    #[test]
    fn difference_removes_strings() {
        let lang = difference(&star(&Fst::symbol(A)), &Fst::epsilon());
        assert!(!accepts(&lang, &[]));
        assert!(accepts(&lang, &[A]));
    }

    #[test]
    fn any_minus_symbol_excludes_that_symbol() {
        let lang = difference(&Fst::any(), &Fst::symbol(A));
        assert!(!accepts(&lang, &[A]));
        let with_b = intersect(&lang, &Fst::symbol(B));
        assert!(accepts(&with_b, &[B]));
    }

    #[test]
    fn cross_product_pads_shorter_side() {
        let upper = Fst::string(&[A, B]);
        let lower = Fst::symbol(C);
        let cp = cross_product(&upper, &lower).unwrap();
        assert_eq!(transduce(&cp, &[A, B]), vec![vec![C]]);
    }

    #[test]
    fn compose_chains_mappings() {
        let ab = Fst::pair(A, B);
        let bc = Fst::pair(B, C);
        let ac = compose(&ab, &bc);
        assert_eq!(transduce(&ac, &[A]), vec![vec![C]]);
    }

    #[test]
    fn composition_with_universal_identity_is_neutral() {
        let ab = Fst::pair(A, B);
        let left = compose(&Fst::universal(), &ab);
        let right = compose(&ab, &Fst::universal());
        assert!(equivalent(&optimize(&left), &optimize(&ab)));
        assert!(equivalent(&optimize(&right), &optimize(&ab)));
    }

    #[test]
    fn minimize_merges_equivalent_states() {
        let lang = union(&Fst::string(&[A, B]), &Fst::string(&[C, B]));
        let min = minimize(&lang);
        assert_eq!(min.num_states(), 3);
        assert!(equivalent(&min, &lang));
    }

    #[test]
    fn reverse_reverses_strings() {
        let rev = reverse(&Fst::string(&[A, B]));
        assert!(accepts(&rev, &[B, A]));
        assert!(!accepts(&rev, &[A, B]));
    }

    mod laws {
        use super::*;
        use proptest::prelude::*;

        fn language() -> impl Strategy<Value = Fst> {
            let leaf = prop_oneof![
                Just(Fst::symbol(A)),
                Just(Fst::symbol(B)),
                Just(Fst::epsilon()),
            ];
            leaf.prop_recursive(4, 24, 2, |inner| {
                prop_oneof![
                    (inner.clone(), inner.clone()).prop_map(|(a, b)| union(&a, &b)),
                    (inner.clone(), inner.clone()).prop_map(|(a, b)| concat(&a, &b)),
                    inner.prop_map(|a| star(&a)),
                ]
            })
        }

        fn word() -> impl Strategy<Value = Vec<Label>> {
            prop::collection::vec(prop_oneof![Just(A), Just(B)], 0..6)
        }

        proptest! {
            #[test]
            fn minimization_preserves_membership(lang in language(), input in word()) {
                prop_assert_eq!(accepts(&minimize(&lang), &input), accepts(&lang, &input));
            }

            #[test]
            fn union_is_commutative(a in language(), b in language()) {
                prop_assert!(equivalent(&union(&a, &b), &union(&b, &a)));
            }

            #[test]
            fn reversing_twice_is_the_identity(lang in language()) {
                prop_assert!(equivalent(&reverse(&reverse(&lang)), &lang));
            }

            #[test]
            fn difference_and_intersection_partition(
                a in language(),
                b in language(),
                input in word(),
            ) {
                let inside = accepts(&intersect(&a, &b), &input);
                let outside = accepts(&difference(&a, &b), &input);
                prop_assert_eq!(inside || outside, accepts(&a, &input));
                prop_assert!(!(inside && outside));
            }
        }
    }
}
