//! Walkinshaw landmark matcher (§4.2.2): pick a small set of high-confidence
//! "landmark" pairs, then expand outward along shared transitions until no
//! more compatible neighbors remain.

use std::collections::HashSet;

use bimap::BiMap;
use itertools::Itertools;

use crate::combiner::Combiners;
use crate::error::Result;
use crate::graph::{Graph, StateId};
use crate::matcher::{normalize, Matcher, Matching};
use crate::scorer::{ScoreMatrix, Scores};

/// Hook invoked when landmark selection finds nothing, e.g. because every
/// left state has two-or-more close competing right states. The default
/// gives up (empty set); the LTS variant seeds the search from the
/// initial-state pair instead.
pub trait FallbackHook<S, T> {
    fn fallback(
        &self,
        left: &Graph<S, T>,
        right: &Graph<S, T>,
        matrix: &ScoreMatrix,
        left_states: &[StateId],
        right_states: &[StateId],
    ) -> Option<(StateId, StateId)>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoFallback;

impl<S, T> FallbackHook<S, T> for NoFallback {
    fn fallback(&self, _: &Graph<S, T>, _: &Graph<S, T>, _: &ScoreMatrix, _: &[StateId], _: &[StateId]) -> Option<(StateId, StateId)> {
        None
    }
}

/// LTS variant: returns the single compatible initial-state pair with the
/// highest score, if any.
#[derive(Debug, Default, Clone, Copy)]
pub struct LtsInitialFallback;

impl<S, T> FallbackHook<S, T> for LtsInitialFallback {
    fn fallback(
        &self,
        left: &Graph<S, T>,
        right: &Graph<S, T>,
        matrix: &ScoreMatrix,
        left_states: &[StateId],
        right_states: &[StateId],
    ) -> Option<(StateId, StateId)> {
        let mut best: Option<(StateId, StateId, f64)> = None;
        for (i, &l) in left_states.iter().enumerate() {
            if !left.is_initial(l) {
                continue;
            }
            for (j, &r) in right_states.iter().enumerate() {
                if !right.is_initial(r) {
                    continue;
                }
                let score = matrix.get(i, j);
                if !score.is_finite() {
                    continue;
                }
                if best.map(|(_, _, b)| score > b).unwrap_or(true) {
                    best = Some((l, r, score));
                }
            }
        }
        best.map(|(l, r, _)| (l, r))
    }
}

pub struct WalkinshawMatcher<H = NoFallback> {
    pub tau: f64,
    pub rho: f64,
    pub fallback: H,
}

impl WalkinshawMatcher<NoFallback> {
    pub fn new(tau: f64, rho: f64) -> Self {
        Self {
            tau,
            rho,
            fallback: NoFallback,
        }
    }
}

impl<H> WalkinshawMatcher<H> {
    pub fn with_fallback(tau: f64, rho: f64, fallback: H) -> Self {
        Self { tau, rho, fallback }
    }
}

impl<S, T, H: FallbackHook<S, T>> Matcher<S, T> for WalkinshawMatcher<H> {
    fn compute(&self, left: &Graph<S, T>, right: &Graph<S, T>, scores: &Scores, combiners: &Combiners<S, T>) -> Result<Matching> {
        let start = std::time::Instant::now();
        let matrix = normalize(&scores.matrix);
        let left_states = &scores.left_states;
        let right_states = &scores.right_states;
        let rows = matrix.rows();
        let cols = matrix.cols();

        let mut pairs: Vec<(usize, usize, f64)> = Vec::new();
        for i in 0..rows {
            for j in 0..cols {
                let s = matrix.get(i, j);
                if s.is_finite() {
                    pairs.push((i, j, s));
                }
            }
        }
        pairs.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap());

        let top_count = ((self.tau * (rows as f64) * (cols as f64)).ceil() as usize).min(pairs.len());
        let top = &pairs[..top_count];

        let mut landmarks: std::collections::HashMap<usize, usize> = std::collections::HashMap::new();
        let mut used_left: HashSet<usize> = HashSet::new();
        let mut used_right: HashSet<usize> = HashSet::new();
        let seen_left_order: Vec<usize> = top.iter().map(|&(i, _, _)| i).unique().collect();

        for i in seen_left_order {
            let mut group: Vec<(usize, f64)> = top
                .iter()
                .filter(|&&(gi, gj, _)| gi == i && !used_right.contains(&gj))
                .map(|&(_, j, s)| (j, s))
                .collect();
            if group.is_empty() {
                continue;
            }
            group.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
            #[allow(clippy::if_same_then_else)]
            let adopt = if group.len() == 1 {
                Some(group[0].0)
            } else if group[0].1 > group[1].1 * self.rho {
                Some(group[0].0)
            } else {
                None
            };
            if let Some(j) = adopt {
                landmarks.insert(i, j);
                used_left.insert(i);
                used_right.insert(j);
            }
        }

        if landmarks.is_empty() {
            if let Some((l, r)) = self.fallback.fallback(left, right, &matrix, left_states, right_states) {
                let li = left_states.iter().position(|&s| s == l).unwrap();
                let ri = right_states.iter().position(|&s| s == r).unwrap();
                landmarks.insert(li, ri);
                used_left.insert(li);
                used_right.insert(ri);
            }
        }

        expand(left, right, combiners, &matrix, left_states, right_states, &mut landmarks, &mut used_left, &mut used_right);

        let mut map = BiMap::new();
        for (&li, &ri) in &landmarks {
            let _ = map.insert(left_states[li], right_states[ri]);
        }
        tracing::debug!(
            "walkinshaw matcher over {}x{} scores took {} microseconds",
            rows,
            cols,
            start.elapsed().as_micros()
        );
        Ok(Matching::from_bimap(map))
    }
}

#[allow(clippy::too_many_arguments)]
fn expand<S, T>(
    left: &Graph<S, T>,
    right: &Graph<S, T>,
    combiners: &Combiners<S, T>,
    matrix: &ScoreMatrix,
    left_states: &[StateId],
    right_states: &[StateId],
    landmarks: &mut std::collections::HashMap<usize, usize>,
    used_left: &mut HashSet<usize>,
    used_right: &mut HashSet<usize>,
) {
    loop {
        let mut candidates = relevant_neighbors(left, right, combiners, matrix, left_states, right_states, landmarks, used_left, used_right);
        if candidates.is_empty() {
            break;
        }
        while !candidates.is_empty() {
            let best_idx = candidates
                .iter()
                .enumerate()
                .max_by(|a, b| a.1 .2.partial_cmp(&b.1 .2).unwrap())
                .map(|(i, _)| i)
                .unwrap();
            let (i, j, _) = candidates.remove(best_idx);
            landmarks.insert(i, j);
            used_left.insert(i);
            used_right.insert(j);
            candidates.retain(|&(ci, cj, _)| ci != i && cj != j);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn relevant_neighbors<S, T>(
    left: &Graph<S, T>,
    right: &Graph<S, T>,
    combiners: &Combiners<S, T>,
    matrix: &ScoreMatrix,
    left_states: &[StateId],
    right_states: &[StateId],
    landmarks: &std::collections::HashMap<usize, usize>,
    used_left: &HashSet<usize>,
    used_right: &HashSet<usize>,
) -> Vec<(usize, usize, f64)> {
    let mut found: std::collections::HashMap<(usize, usize), f64> = std::collections::HashMap::new();
    for (&li, &ri) in landmarks {
        let lk = left_states[li];
        let rk = right_states[ri];
        for (lt, rt) in [(true, true), (false, false)] {
            let l_trans: Vec<_> = if lt { left.transitions_from(lk).collect() } else { left.transitions_to(lk).collect() };
            let r_trans: Vec<_> = if rt { right.transitions_from(rk).collect() } else { right.transitions_to(rk).collect() };
            for &l_tid in &l_trans {
                let (l_src, l_prop, l_tgt) = left.transition(l_tid).unwrap();
                let l_other = if lt { l_tgt } else { l_src };
                for &r_tid in &r_trans {
                    let (r_src, r_prop, r_tgt) = right.transition(r_tid).unwrap();
                    let r_other = if rt { r_tgt } else { r_src };
                    if !combiners.transition.are_combinable(l_prop, r_prop) {
                        continue;
                    }
                    let Some(li2) = left_states.iter().position(|&s| s == l_other) else { continue };
                    let Some(ri2) = right_states.iter().position(|&s| s == r_other) else { continue };
                    if used_left.contains(&li2) || used_right.contains(&ri2) {
                        continue;
                    }
                    let score = matrix.get(li2, ri2);
                    if !score.is_finite() {
                        continue;
                    }
                    found.entry((li2, ri2)).or_insert(score);
                }
            }
        }
    }
    found.into_iter().map(|((i, j), s)| (i, j, s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combiner::Combiner;
    use crate::graph::GraphBuilder;

    struct Eq;
    impl<X: PartialEq + Clone> Combiner<X> for Eq {
        fn are_combinable(&self, a: &X, b: &X) -> bool {
            a == b
        }
        fn combine(&self, a: &X, _b: &X) -> X {
            a.clone()
        }
    }

    #[test]
    fn landmark_plus_expansion_matches_identical_chain() {
        let g: Graph<bool, char> = GraphBuilder::new()
            .with_state_properties([true, false, false])
            .with_edge(0, 'a', 1)
            .with_edge(1, 'b', 2)
            .with_initial(0)
            .build();

        let state_c = Eq;
        let trans_c = Eq;
        let combiners = Combiners::new(&state_c, &trans_c);
        let scorer = crate::scorer::GlobalScorer::with_context(0.6, crate::scorer::LtsContext);
        let scores = crate::scorer::Scorer::score(&scorer, &g, &g, &combiners).unwrap();

        let matcher = WalkinshawMatcher::new(0.25, 1.5);
        let matching = matcher.compute(&g, &g, &scores, &combiners).unwrap();

        assert_eq!(matching.len(), 3);
        for l in g.states() {
            assert_eq!(matching.get(l), Some(l));
        }
    }

    #[test]
    fn disjoint_labels_still_pair_the_shared_initial_state() {
        // Scenario S2: L: 0->1 labeled 'a'; R: 0->1 labeled 'b'; both states
        // 0 initial. No transition is combinable across the two graphs, so
        // only the initial-state bonus (LtsContext, backward pass)
        // distinguishes (0,0) from every other cell; it becomes the sole
        // landmark and expansion finds nothing further to add.
        let left: Graph<(), char> = GraphBuilder::new().with_state_properties([(), ()]).with_edge(0, 'a', 1).with_initial(0).build();
        let right: Graph<(), char> = GraphBuilder::new().with_state_properties([(), ()]).with_edge(0, 'b', 1).with_initial(0).build();

        let state_c = Eq;
        let trans_c = Eq;
        let combiners = Combiners::new(&state_c, &trans_c);
        let scorer = crate::scorer::GlobalScorer::with_context(0.6, crate::scorer::LtsContext);
        let scores = crate::scorer::Scorer::score(&scorer, &left, &right, &combiners).unwrap();

        let matcher = WalkinshawMatcher::with_fallback(0.25, 1.5, LtsInitialFallback);
        let matching = matcher.compute(&left, &right, &scores, &combiners).unwrap();

        assert_eq!(matching.len(), 1);
        let l0 = left.states().next().unwrap();
        let r0 = right.states().next().unwrap();
        assert_eq!(matching.get(l0), Some(r0));
    }
}
