use std::collections::{BTreeSet, VecDeque};

use super::algebra::{compose, project_output, trim};
use super::{Arc, Fst, StateId};
use crate::symbols::{EPSILON, Label};

/// A path's upper and lower label sequences, epsilons removed.
pub type PathPair = (Vec<Label>, Vec<Label>);

/// Limits for path enumeration over possibly cyclic automata.
#[derive(Debug, Clone, Copy)]
pub struct Bounds {
    /// Maximum number of distinct paths reported
    pub max_paths: usize,
    /// Maximum number of arcs on a path
    pub max_length: usize,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            max_paths: 100,
            max_length: 64,
        }
    }
}

/// Enumerate distinct `(upper, lower)` strings breadth first, handing each to
/// `visit`. Returns `false` when the bounds cut the enumeration short.
pub fn enumerate(fst: &Fst, bounds: Bounds, mut visit: impl FnMut(&[Label], &[Label])) -> bool {
    let fst = trim(fst);
    let mut seen: BTreeSet<PathPair> = BTreeSet::new();
    let mut queue: VecDeque<(StateId, Vec<Label>, Vec<Label>, usize)> =
        VecDeque::from([(fst.start(), Vec::new(), Vec::new(), 0)]);
    let mut complete = true;

    while let Some((state, upper, lower, depth)) = queue.pop_front() {
        if fst.is_final(state) {
            let key = (upper.clone(), lower.clone());
            if !seen.contains(&key) {
                if seen.len() >= bounds.max_paths {
                    return false;
                }
                visit(&upper, &lower);
                seen.insert(key);
            }
        }
        if depth >= bounds.max_length {
            if !fst.arcs(state).is_empty() {
                complete = false;
            }
            continue;
        }
        for arc in fst.arcs(state) {
            let mut upper = upper.clone();
            let mut lower = lower.clone();
            if arc.input != EPSILON {
                upper.push(arc.input);
            }
            if arc.output != EPSILON {
                lower.push(arc.output);
            }
            queue.push_back((arc.target, upper, lower, depth + 1));
        }
    }
    complete
}

/// Collect enumerated paths into a sorted vector.
pub fn collect(fst: &Fst, bounds: Bounds) -> (Vec<PathPair>, bool) {
    let mut found = BTreeSet::new();
    let complete = enumerate(fst, bounds, |upper, lower| {
        found.insert((upper.to_vec(), lower.to_vec()));
    });
    (found.into_iter().collect(), complete)
}

/// Whether the upper side accepts `input`.
pub fn accepts(fst: &Fst, input: &[Label]) -> bool {
    let composed = compose(&Fst::string(input), fst);
    trim(&composed).states().iter().any(|s| s.is_final)
}

/// Apply `fst` downward to an input string, as an automaton over outputs.
pub fn apply_down(fst: &Fst, input: &[Label]) -> Fst {
    project_output(&compose(&Fst::string(input), fst))
}

/// Apply `fst` upward to an output string, as an automaton over inputs.
pub fn apply_up(fst: &Fst, output: &[Label]) -> Fst {
    let composed = compose(fst, &Fst::string(output));
    super::algebra::project_input(&composed)
}

/// Distinct output strings for `input`, sorted.
pub fn transduce(fst: &Fst, input: &[Label]) -> Vec<Vec<Label>> {
    let (paths, _) = collect(&apply_down(fst, input), Bounds::default());
    let outputs: BTreeSet<Vec<Label>> = paths.into_iter().map(|(upper, _)| upper).collect();
    outputs.into_iter().collect()
}

/// A single path with the fewest arcs, or the empty language.
pub fn shortest_path(fst: &Fst) -> Fst {
    let fst = trim(fst);
    let mut previous: Vec<Option<(StateId, Arc)>> = vec![None; fst.num_states()];
    let mut visited = vec![false; fst.num_states()];
    visited[fst.start()] = true;
    let mut queue = VecDeque::from([fst.start()]);

    let mut goal = None;
    while let Some(state) = queue.pop_front() {
        if fst.is_final(state) {
            goal = Some(state);
            break;
        }
        for arc in fst.arcs(state) {
            if !visited[arc.target] {
                visited[arc.target] = true;
                previous[arc.target] = Some((state, *arc));
                queue.push_back(arc.target);
            }
        }
    }

    let Some(mut state) = goal else {
        let mut empty = Fst::empty();
        empty.extend_sigma(fst.sigma().iter().copied());
        return empty;
    };
    let mut labels = Vec::new();
    while let Some((from, arc)) = previous[state] {
        labels.push(arc.label());
        state = from;
    }
    labels.reverse();
    let mut out = Fst::pairs(&labels);
    out.extend_sigma(fst.sigma().iter().copied());
    out
}

/// Small xorshift generator for random path generation.
#[derive(Debug, Clone)]
pub struct XorShift(u64);

impl XorShift {
    /// Seed the generator; a zero seed is replaced by a fixed constant.
    pub fn new(seed: u64) -> Self {
        Self(if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed })
    }

    /// Next raw value.
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    /// Uniform index below `bound` (which must be non-zero).
    pub fn below(&mut self, bound: usize) -> usize {
        (self.next_u64() % bound as u64) as usize
    }
}

/// Union of up to `count` random accepting paths, each at most
/// `max_length` arcs long.
pub fn random_paths(fst: &Fst, count: usize, max_length: usize, rng: &mut XorShift) -> Fst {
    let fst = trim(fst);
    let mut found: BTreeSet<Vec<(Label, Label)>> = BTreeSet::new();
    for _ in 0..count {
        let mut state = fst.start();
        let mut labels = Vec::new();
        loop {
            let arcs = fst.arcs(state);
            let stop_here = fst.is_final(state);
            if (stop_here && (arcs.is_empty() || rng.below(arcs.len() + 1) == 0))
                || labels.len() >= max_length
            {
                break;
            }
            if arcs.is_empty() {
                break;
            }
            let arc = arcs[rng.below(arcs.len())];
            labels.push(arc.label());
            state = arc.target;
        }
        if fst.is_final(state) {
            found.insert(labels);
        }
    }
    let mut out = Fst::empty();
    for path in &found {
        out = super::algebra::union(&out, &Fst::pairs(path));
    }
    out.extend_sigma(fst.sigma().iter().copied());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::algebra::{star, union};
    use crate::symbols::FIRST_USER;

    const A: Label = FIRST_USER;
    const B: Label = FIRST_USER + 1;

    #[test]
    fn enumeration_is_bounded_on_cycles() {
        let lang = star(&Fst::symbol(A));
        let bounds = Bounds {
            max_paths: 3,
            max_length: 10,
        };
        let (paths, complete) = collect(&lang, bounds);
        assert_eq!(paths.len(), 3);
        assert!(!complete);
    }

    #[test]
    fn finite_languages_enumerate_completely() {
        let lang = union(&Fst::string(&[A, B]), &Fst::symbol(B));
        let (paths, complete) = collect(&lang, Bounds::default());
        assert!(complete);
        assert_eq!(paths.len(), 2);
    }

    #[test]
    fn shortest_path_picks_fewest_arcs() {
        let lang = union(&Fst::string(&[A, A, A]), &Fst::symbol(B));
        let best = shortest_path(&lang);
        assert!(accepts(&best, &[B]));
        assert!(!accepts(&best, &[A, A, A]));
    }

    #[test]
    fn random_paths_are_accepted() {
        let lang = union(&Fst::string(&[A, B]), &Fst::symbol(B));
        let mut rng = XorShift::new(7);
        let sample = random_paths(&lang, 10, 8, &mut rng);
        let (paths, _) = collect(&sample, Bounds::default());
        assert!(!paths.is_empty());
        for (upper, _) in paths {
            assert!(accepts(&lang, &upper));
        }
    }
}
