//! The local scorer (§4.1): a finite-depth refinement fixed point. Starts
//! from the zero matrix and applies the directional formula `k` times,
//! double-buffered — each iteration reads only from the previous iterate,
//! never from values already written in the same sweep (see DESIGN.md for
//! why double-buffering was chosen over in-place update).

use std::collections::HashMap;

use crate::combiner::Combiners;
use crate::error::{DiffError, Result};
use crate::graph::{Graph, StateId};
use crate::scorer::directional::{directional_score, DirectionalContext, PlainContext};
use crate::scorer::{check_alpha, finalize, require_nonempty, Direction, Scorer, Scores};

/// Finite-refinement scorer with `k = nrOfRefinements` iterations.
pub struct LocalScorer<C = PlainContext> {
    pub nr_of_refinements: usize,
    pub alpha: f64,
    pub context: C,
}

impl LocalScorer<PlainContext> {
    pub fn new(nr_of_refinements: usize, alpha: f64) -> Self {
        Self {
            nr_of_refinements,
            alpha,
            context: PlainContext,
        }
    }
}

impl<C> LocalScorer<C> {
    pub fn with_context(nr_of_refinements: usize, alpha: f64, context: C) -> Self {
        Self {
            nr_of_refinements,
            alpha,
            context,
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn refine_direction<S, T, C: DirectionalContext<S, T>>(
    left: &Graph<S, T>,
    right: &Graph<S, T>,
    dir: Direction,
    combiners: &Combiners<S, T>,
    ctx: &C,
    alpha: f64,
    iterations: usize,
    left_ids: &[StateId],
    right_ids: &[StateId],
    left_idx: &HashMap<StateId, usize>,
    right_idx: &HashMap<StateId, usize>,
) -> Result<Vec<f64>> {
    let cols = right_ids.len();
    let mut prev = vec![0.0_f64; left_ids.len() * cols];

    for _ in 0..iterations {
        let mut next = vec![0.0_f64; left_ids.len() * cols];
        for (i, &l) in left_ids.iter().enumerate() {
            for (j, &r) in right_ids.iter().enumerate() {
                let score = directional_score(left, l, right, r, dir, combiners, ctx, alpha, |ln, rn| {
                    let li = left_idx[&ln];
                    let ri = right_idx[&rn];
                    prev[li * cols + ri]
                })?;
                next[i * cols + j] = score;
            }
        }
        prev = next;
    }
    Ok(prev)
}

impl<S, T, C: DirectionalContext<S, T>> Scorer<S, T> for LocalScorer<C> {
    fn score(&self, left: &Graph<S, T>, right: &Graph<S, T>, combiners: &Combiners<S, T>) -> Result<Scores> {
        let start = std::time::Instant::now();
        require_nonempty(left, right)?;
        check_alpha(self.alpha)?;
        if self.nr_of_refinements == 0 {
            return Err(DiffError::Precondition(
                "nrOfRefinements must be >= 1".to_string(),
            ));
        }

        let left_ids: Vec<StateId> = left.states().collect();
        let right_ids: Vec<StateId> = right.states().collect();
        let left_idx: HashMap<StateId, usize> = left_ids.iter().enumerate().map(|(i, &s)| (s, i)).collect();
        let right_idx: HashMap<StateId, usize> = right_ids.iter().enumerate().map(|(i, &s)| (s, i)).collect();

        let fwd = refine_direction(
            left,
            right,
            Direction::Forward,
            combiners,
            &self.context,
            self.alpha,
            self.nr_of_refinements,
            &left_ids,
            &right_ids,
            &left_idx,
            &right_idx,
        )?;
        let bwd = refine_direction(
            left,
            right,
            Direction::Backward,
            combiners,
            &self.context,
            self.alpha,
            self.nr_of_refinements,
            &left_ids,
            &right_ids,
            &left_idx,
            &right_idx,
        )?;

        let matrix = finalize(&fwd, &bwd, left_ids.len(), right_ids.len());
        tracing::debug!(
            "local scorer ({} refinements) over {}x{} states took {} microseconds",
            self.nr_of_refinements,
            left_ids.len(),
            right_ids.len(),
            start.elapsed().as_micros()
        );
        Ok(Scores {
            matrix,
            left_states: left_ids,
            right_states: right_ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combiner::{Combiner, Combiners};
    use crate::graph::GraphBuilder;
    use crate::scorer::test_util;

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
    fn identical_two_state_lts_marks_cross_pairs_incompatible() {
        // Scenario S1: L = R, state 0 initial, one transition 0->1. States
        // are distinguished by their initial-ness, so the cross pairs (0,1)
        // and (1,0) are rejected by the state combiner and collapse to
        // -inf, while the diagonal stays finite and in bounds.
        let g: Graph<bool, char> = GraphBuilder::new()
            .with_state_properties([true, false])
            .with_edge(0, 'a', 1)
            .with_initial(0)
            .build();

        let state_c = Eq;
        let trans_c = Eq;
        let combiners = Combiners::new(&state_c, &trans_c);
        let scorer = LocalScorer::with_context(3, 0.6, crate::scorer::LtsContext);
        let scores = scorer.score(&g, &g, &combiners).unwrap();

        assert_eq!(scores.matrix.get(0, 1), f64::NEG_INFINITY);
        assert_eq!(scores.matrix.get(1, 0), f64::NEG_INFINITY);
        for &(r, c) in &[(0, 0), (1, 1)] {
            let v = scores.matrix.get(r, c);
            test_util::assert_in_bounds(v);
            assert!(v.is_finite());
        }
    }

    #[test]
    fn rejects_zero_refinements() {
        let g: Graph<(), ()> = GraphBuilder::new().with_state_properties([()]).build();
        let state_c = Eq;
        let trans_c = Eq;
        let combiners = Combiners::new(&state_c, &trans_c);
        let scorer = LocalScorer::new(0, 0.6);
        assert!(scorer.score(&g, &g, &combiners).is_err());
    }
}
