//! The directional score formula (§4.1) shared by the local and global
//! scorers, plus the context hook that lets the LTS variant fold in its
//! initial-state bonus only for the backward direction.

use crate::combiner::Combiners;
use crate::error::{DiffError, Result};
use crate::graph::{Graph, StateId};
use crate::scorer::Direction;

/// Context-specific numerator/denominator adjustments (Δ_num, Δ_den) added
/// to the directional formula. The plain variant contributes nothing; the
/// LTS variant rewards both-initial pairs on the backward pass.
pub trait DirectionalContext<S, T> {
    fn delta(
        &self,
        left: &Graph<S, T>,
        l: StateId,
        right: &Graph<S, T>,
        r: StateId,
        dir: Direction,
    ) -> (f64, f64);
}

/// No adjustment: plain graphs with no initial-state notion.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainContext;

impl<S, T> DirectionalContext<S, T> for PlainContext {
    fn delta(&self, _left: &Graph<S, T>, _l: StateId, _right: &Graph<S, T>, _r: StateId, _dir: Direction) -> (f64, f64) {
        (0.0, 0.0)
    }
}

/// LTS variant: on the backward pass, adds 1 to the denominator if either
/// state is initial, and 1 to the numerator if both are.
#[derive(Debug, Default, Clone, Copy)]
pub struct LtsContext;

impl<S, T> DirectionalContext<S, T> for LtsContext {
    fn delta(&self, left: &Graph<S, T>, l: StateId, right: &Graph<S, T>, r: StateId, dir: Direction) -> (f64, f64) {
        if dir != Direction::Backward {
            return (0.0, 0.0);
        }
        let li = left.is_initial(l);
        let ri = right.is_initial(r);
        let den = if li || ri { 1.0 } else { 0.0 };
        let num = if li && ri { 1.0 } else { 0.0 };
        (num, den)
    }
}

/// The common-neighbor data needed by the directional formula: the list of
/// neighbor pairs `N`, and the counts `U`/`V` of transitions on each side
/// that matched nothing on the other.
pub(crate) struct NeighborData {
    pub neighbors: Vec<(StateId, StateId)>,
    pub u: usize,
    pub v: usize,
}

pub(crate) fn neighbor_data<S, T>(
    left: &Graph<S, T>,
    l: StateId,
    right: &Graph<S, T>,
    r: StateId,
    dir: Direction,
    combiners: &Combiners<S, T>,
) -> NeighborData {
    let l_trans: Vec<_> = match dir {
        Direction::Forward => left.transitions_from(l).collect(),
        Direction::Backward => left.transitions_to(l).collect(),
    };
    let r_trans: Vec<_> = match dir {
        Direction::Forward => right.transitions_from(r).collect(),
        Direction::Backward => right.transitions_to(r).collect(),
    };

    let mut l_matched = vec![false; l_trans.len()];
    let mut r_matched = vec![false; r_trans.len()];
    let mut neighbors = Vec::new();

    for (i, &lt) in l_trans.iter().enumerate() {
        let (l_source, l_prop, l_target) = left.transition(lt).expect("live transition id");
        for (j, &rt) in r_trans.iter().enumerate() {
            let (r_source, r_prop, r_target) = right.transition(rt).expect("live transition id");
            if !combiners.transition.are_combinable(l_prop, r_prop) {
                continue;
            }
            l_matched[i] = true;
            r_matched[j] = true;
            let pair = match dir {
                Direction::Forward => (l_target, r_target),
                Direction::Backward => (l_source, r_source),
            };
            neighbors.push(pair);
        }
    }

    let u = l_matched.iter().filter(|m| !**m).count();
    let v = r_matched.iter().filter(|m| !**m).count();
    NeighborData { neighbors, u, v }
}

/// Evaluates the directional score formula for a pair, given a lookup for
/// the previous iterate's score on neighbor pairs. Returns `-1.0` directly
/// (without consulting neighbors) when the state properties are not
/// combinable.
#[allow(clippy::too_many_arguments)]
pub(crate) fn directional_score<S, T, C: DirectionalContext<S, T>>(
    left: &Graph<S, T>,
    l: StateId,
    right: &Graph<S, T>,
    r: StateId,
    dir: Direction,
    combiners: &Combiners<S, T>,
    ctx: &C,
    alpha: f64,
    mut prev: impl FnMut(StateId, StateId) -> f64,
) -> Result<f64> {
    let lp = left.state_property(l).expect("live state id");
    let rp = right.state_property(r).expect("live state id");
    if !combiners.state.are_combinable(lp, rp) {
        return Ok(-1.0);
    }

    let NeighborData { neighbors, u, v } = neighbor_data(left, l, right, r, dir, combiners);
    let (delta_num, delta_den) = ctx.delta(left, l, right, r, dir);
    let n_len = neighbors.len();

    let mut numerator = delta_num;
    for &(ln, rn) in &neighbors {
        numerator += 1.0 + alpha * prev(ln, rn);
    }
    let denominator = 2.0 * (u as f64 + v as f64 + n_len as f64 + delta_den);

    let score = if denominator == 0.0 && n_len == 0 {
        0.0
    } else {
        numerator / denominator
    };

    if !(-1.0..=1.0).contains(&score) {
        return Err(DiffError::Precondition(format!(
            "directional score {score} for ({l}, {r}) outside [-1,1]"
        )));
    }
    Ok(score)
}
