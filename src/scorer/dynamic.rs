//! The dynamic scorer (§4.1): picks global for small inputs, and falls back
//! to progressively cheaper local refinements as input size grows, since
//! the global linear system's cost is dominated by `(|L|*|R|)` squared.

use crate::combiner::Combiners;
use crate::error::Result;
use crate::graph::Graph;
use crate::scorer::directional::{DirectionalContext, PlainContext};
use crate::scorer::{GlobalScorer, LocalScorer, Scorer, Scores};

const GLOBAL_THRESHOLD: usize = 45;
const LOCAL_FIVE_REFINEMENTS_THRESHOLD: usize = 500;

/// Dispatches to [`GlobalScorer`] or [`LocalScorer`] based on `max(|L|, |R|)`.
pub struct DynamicScorer<C = PlainContext> {
    pub alpha: f64,
    pub context: C,
}

impl DynamicScorer<PlainContext> {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            context: PlainContext,
        }
    }
}

impl<C> DynamicScorer<C> {
    pub fn with_context(alpha: f64, context: C) -> Self {
        Self { alpha, context }
    }
}

impl<S, T, C: DirectionalContext<S, T> + Clone> Scorer<S, T> for DynamicScorer<C> {
    fn score(&self, left: &Graph<S, T>, right: &Graph<S, T>, combiners: &Combiners<S, T>) -> Result<Scores> {
        let size = left.len().max(right.len());
        if size <= GLOBAL_THRESHOLD {
            tracing::debug!("dynamic scorer picked global scorer for size {size}");
            GlobalScorer::with_context(self.alpha, self.context.clone()).score(left, right, combiners)
        } else if size <= LOCAL_FIVE_REFINEMENTS_THRESHOLD {
            tracing::debug!("dynamic scorer picked local scorer (5 refinements) for size {size}");
            LocalScorer::with_context(5, self.alpha, self.context.clone()).score(left, right, combiners)
        } else {
            tracing::debug!("dynamic scorer picked local scorer (1 refinement) for size {size}");
            LocalScorer::with_context(1, self.alpha, self.context.clone()).score(left, right, combiners)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combiner::{Combiner, Combiners};
    use crate::graph::GraphBuilder;
    use crate::scorer::PlainContext;

    struct Always;
    impl<X: Clone> Combiner<X> for Always {
        fn are_combinable(&self, _a: &X, _b: &X) -> bool {
            true
        }
        fn combine(&self, a: &X, _b: &X) -> X {
            a.clone()
        }
    }

    #[test]
    fn picks_global_for_small_inputs() {
        let g: Graph<(), ()> = GraphBuilder::new().with_state_properties([(), ()]).with_edge(0, (), 1).build();
        let state_c = Always;
        let trans_c = Always;
        let combiners = Combiners::new(&state_c, &trans_c);
        let scorer = DynamicScorer::with_context(0.6, PlainContext);
        let scores = scorer.score(&g, &g, &combiners).unwrap();
        assert_eq!(scores.matrix.rows(), 2);
        assert_eq!(scores.matrix.cols(), 2);
    }
}
