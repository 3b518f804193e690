//! The structure comparator (§4.4.7): wires scorer, matcher and merger
//! together behind the tunables enumerated in §6.
//!
//! `compare(L, R) = merge(L, R, match(L, R))`. This function only produces
//! the merged graph; when comparing `DiffAutomaton`s the caller drives the
//! rewriter fixed point (`rewrite::run_to_fixed_point`) separately over the
//! result, since rewriting is specific to that variant while merging is not.

use crate::combiner::{Combiners, DiffAutomatonStateProperty, DiffProperty};
use crate::error::{DiffError, Result};
use crate::graph::Graph;
use crate::matcher::{DynamicMatcher, FallbackHook, Matcher, NoFallback};
use crate::merger::{merge, MergeResult};
use crate::rewrite::{run_to_fixed_point, Rewriter};
use crate::scorer::{DirectionalContext, DynamicScorer, LtsContext, Scorer};

/// Tunables recognized by the orchestrator (§6), with the documented
/// defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiffConfig {
    /// α, the scorer's attenuation factor. Must lie in `[0, 1]`.
    pub attenuation_factor: f64,
    /// τ, the Walkinshaw matcher's landmark threshold. Must lie in `[0, 1]`.
    pub landmark_threshold: f64,
    /// ρ, the Walkinshaw matcher's landmark dominance ratio. Must be `>= 1.0`.
    pub landmark_ratio: f64,
    /// k, the local scorer's refinement count. Must be `>= 1`.
    pub nr_of_refinements: usize,
    /// Size threshold above which the dynamic matcher switches from
    /// Kuhn-Munkres to Walkinshaw.
    pub dynamic_size_threshold: usize,
    /// Whether the global scorer propagates statically determinable scores
    /// before solving the remaining linear system.
    pub optimize_statically_determinable_scores: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            attenuation_factor: 0.6,
            landmark_threshold: 0.25,
            landmark_ratio: 1.5,
            nr_of_refinements: 1,
            dynamic_size_threshold: 45,
            optimize_statically_determinable_scores: true,
        }
    }
}

impl DiffConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.attenuation_factor) {
            return Err(DiffError::Precondition(format!("attenuationFactor {} outside [0,1]", self.attenuation_factor)));
        }
        if !(0.0..=1.0).contains(&self.landmark_threshold) {
            return Err(DiffError::Precondition(format!("landmarkThreshold {} outside [0,1]", self.landmark_threshold)));
        }
        if self.landmark_ratio < 1.0 {
            return Err(DiffError::Precondition(format!("landmarkRatio {} below 1.0", self.landmark_ratio)));
        }
        if self.nr_of_refinements == 0 {
            return Err(DiffError::Precondition("nrOfRefinements must be >= 1".to_string()));
        }
        Ok(())
    }
}

/// Runs the scorer → matcher → merger pipeline over `left` and `right`
/// using the dynamic scorer and dynamic matcher (§4.1/§4.2.5), so small
/// inputs get the exact global score and an optimal Kuhn-Munkres
/// assignment while larger ones fall back to the cheaper local/Walkinshaw
/// pair. `context` supplies the directional-scoring bonus (e.g.
/// [`crate::scorer::LtsContext`] for LTS inputs, [`crate::scorer::PlainContext`]
/// otherwise).
///
/// Uses [`NoFallback`] for the Walkinshaw matcher's landmark fallback; call
/// [`compare_with_fallback`] (or [`compare_lts`] for `LtsContext` inputs) to
/// reach [`crate::matcher::LtsInitialFallback`] instead.
pub fn compare<S, T, C>(left: &Graph<S, T>, right: &Graph<S, T>, combiners: &Combiners<S, T>, context: C, config: &DiffConfig) -> Result<MergeResult<S, T>>
where
    S: Clone,
    T: Clone,
    C: DirectionalContext<S, T> + Clone,
{
    compare_with_fallback(left, right, combiners, context, config, NoFallback)
}

/// `compare`, with the Walkinshaw matcher's landmark fallback hook exposed
/// (§4.2.2): pass [`crate::matcher::LtsInitialFallback`] for LTS inputs where
/// the shared-initial-state pair should seed expansion when no landmark is
/// otherwise adopted, or [`NoFallback`] (what [`compare`] uses) to leave the
/// landmark set empty in that case.
pub fn compare_with_fallback<S, T, C, H>(left: &Graph<S, T>, right: &Graph<S, T>, combiners: &Combiners<S, T>, context: C, config: &DiffConfig, fallback: H) -> Result<MergeResult<S, T>>
where
    S: Clone,
    T: Clone,
    C: DirectionalContext<S, T> + Clone,
    H: FallbackHook<S, T> + Clone,
{
    let start = std::time::Instant::now();
    config.validate()?;

    let scorer = DynamicScorer::with_context(config.attenuation_factor, context);
    let scores = scorer.score(left, right, combiners)?;

    let matcher = DynamicMatcher::with_threshold(config.landmark_threshold, config.landmark_ratio, fallback, config.dynamic_size_threshold);
    let matching = matcher.compute(left, right, &scores, combiners)?;

    for (l, r) in matching.iter() {
        let lp = left.state_property(l).expect("matched left state exists");
        let rp = right.state_property(r).expect("matched right state exists");
        if !combiners.state.are_combinable(lp, rp) {
            return Err(DiffError::Precondition(format!("matched pair ({l}, {r}) has uncombinable state properties")));
        }
    }

    let result = merge(left, right, &matching, combiners);
    tracing::debug!("compare() took {} microseconds", start.elapsed().as_micros());
    Ok(result)
}

/// `compare_with_fallback` preset to [`LtsContext`] and
/// [`crate::matcher::LtsInitialFallback`], the documented default for
/// comparing two LTSs (§4.2.2's fallback policy is opt-in; this is the
/// opt-in entry point).
pub fn compare_lts<S, T>(left: &Graph<S, T>, right: &Graph<S, T>, combiners: &Combiners<S, T>, config: &DiffConfig) -> Result<MergeResult<S, T>>
where
    S: Clone,
    T: Clone,
    LtsContext: DirectionalContext<S, T>,
{
    compare_with_fallback(left, right, combiners, LtsContext, config, crate::matcher::LtsInitialFallback)
}

/// `compare` followed by the rewriter fixed point (§4.4.7, §6's "rewriter
/// list" option): the convenience path for `DiffAutomaton` inputs, where
/// merging and rewriting are usually run back to back. Plain LTS callers
/// (or anyone who wants the unrewritten merge) should call [`compare`]
/// directly instead.
pub fn compare_and_rewrite<U, C>(
    left: &Graph<DiffAutomatonStateProperty, DiffProperty<U>>,
    right: &Graph<DiffAutomatonStateProperty, DiffProperty<U>>,
    combiners: &Combiners<DiffAutomatonStateProperty, DiffProperty<U>>,
    context: C,
    config: &DiffConfig,
    rewriters: &[Box<dyn Rewriter<U> + '_>],
) -> Result<MergeResult<DiffAutomatonStateProperty, DiffProperty<U>>>
where
    U: Clone,
    C: DirectionalContext<DiffAutomatonStateProperty, DiffProperty<U>> + Clone,
{
    let start = std::time::Instant::now();
    let mut result = compare(left, right, combiners, context, config)?;
    run_to_fixed_point(rewriters, &mut result.graph)?;
    tracing::debug!("compare_and_rewrite() took {} microseconds", start.elapsed().as_micros());
    Ok(result)
}
