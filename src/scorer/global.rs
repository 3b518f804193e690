//! The global scorer (§4.1): finds the same directional fixed point as the
//! local scorer, but exactly, by first propagating every statically
//! determinable score through a worklist, then solving the remainder as a
//! sparse (here: dense, since `nalgebra` has no built-in sparse LU) linear
//! system for the rest.

use std::collections::{HashMap, VecDeque};

use nalgebra::DMatrix;

use crate::combiner::Combiners;
use crate::error::{DiffError, Result};
use crate::graph::{Graph, StateId};
use crate::scorer::directional::{directional_score, neighbor_data, DirectionalContext, PlainContext};
use crate::scorer::{check_alpha, finalize, require_nonempty, Direction, Scorer, Scores};

/// Exact scorer: solves the directional fixed point as a linear system
/// instead of truncating a refinement sequence.
pub struct GlobalScorer<C = PlainContext> {
    pub alpha: f64,
    pub optimize_statically_determinable_scores: bool,
    pub context: C,
}

impl GlobalScorer<PlainContext> {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            optimize_statically_determinable_scores: true,
            context: PlainContext,
        }
    }
}

impl<C> GlobalScorer<C> {
    pub fn with_context(alpha: f64, context: C) -> Self {
        Self {
            alpha,
            optimize_statically_determinable_scores: true,
            context,
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn solve_direction<S, T, C: DirectionalContext<S, T>>(
    left: &Graph<S, T>,
    right: &Graph<S, T>,
    dir: Direction,
    combiners: &Combiners<S, T>,
    ctx: &C,
    alpha: f64,
    optimize: bool,
    left_ids: &[StateId],
    right_ids: &[StateId],
    left_idx: &HashMap<StateId, usize>,
    right_idx: &HashMap<StateId, usize>,
) -> Result<Vec<f64>> {
    let rows = left_ids.len();
    let cols = right_ids.len();
    let pair_index = |i: usize, j: usize| i * cols + j;

    let mut known: HashMap<usize, f64> = HashMap::new();
    let mut dependents: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut neighbor_idx_cache: HashMap<usize, Vec<usize>> = HashMap::new();

    let mut queue: VecDeque<usize> = VecDeque::new();
    for (i, &l) in left_ids.iter().enumerate() {
        for (j, &r) in right_ids.iter().enumerate() {
            let p = pair_index(i, j);
            let nd = neighbor_data(left, l, right, r, dir, combiners);
            let idxs: Vec<usize> = nd
                .neighbors
                .iter()
                .map(|&(ln, rn)| pair_index(left_idx[&ln], right_idx[&rn]))
                .collect();
            neighbor_idx_cache.insert(p, idxs);
            queue.push_back(p);
        }
    }

    if optimize {
        while let Some(p) = queue.pop_front() {
            if known.contains_key(&p) {
                continue;
            }
            let idxs = &neighbor_idx_cache[&p];
            if idxs.contains(&p) {
                // self-referential and not resolvable without solving; leave
                // for the linear system.
                continue;
            }
            let unresolved: Vec<usize> = idxs.iter().copied().filter(|n| !known.contains_key(n)).collect();
            if !unresolved.is_empty() {
                // Not yet resolvable: register `p` as a dependent of each
                // still-unknown neighbor, so resolving any of them re-enqueues
                // `p` for another attempt (spec §4.1's propagation).
                for n in unresolved {
                    dependents.entry(n).or_default().push(p);
                }
                continue;
            }
            let i = p / cols;
            let j = p % cols;
            let l = left_ids[i];
            let r = right_ids[j];
            let value = directional_score(left, l, right, r, dir, combiners, ctx, alpha, |ln, rn| {
                known[&pair_index(left_idx[&ln], right_idx[&rn])]
            })?;
            known.insert(p, value);
            tracing::trace!("statically resolved pair {p} to {value}");
            if let Some(deps) = dependents.remove(&p) {
                for d in deps {
                    queue.push_back(d);
                }
            }
        }
    } else {
        // Optimization disabled: only the directly uncombinable pairs (zero
        // neighbor dependency) are resolved up front; everything else goes
        // through the linear system. This must yield the same result as the
        // optimized path (§9 design note), just via a larger system.
        for (i, &l) in left_ids.iter().enumerate() {
            for (j, &r) in right_ids.iter().enumerate() {
                let lp = left.state_property(l).expect("live state");
                let rp = right.state_property(r).expect("live state");
                if !combiners.state.are_combinable(lp, rp) {
                    known.insert(pair_index(i, j), -1.0);
                }
            }
        }
    }

    let mut unknown_order: Vec<usize> = Vec::new();
    let mut unknown_pos: HashMap<usize, usize> = HashMap::new();
    for i in 0..rows {
        for j in 0..cols {
            let p = pair_index(i, j);
            if !known.contains_key(&p) {
                unknown_pos.insert(p, unknown_order.len());
                unknown_order.push(p);
            }
        }
    }

    let m = unknown_order.len();
    let mut result = vec![0.0_f64; rows * cols];
    for (&p, &v) in &known {
        result[p] = v;
    }

    if m == 0 {
        return Ok(result);
    }

    let mut a = DMatrix::<f64>::zeros(m, m);
    let mut b = nalgebra::DVector::<f64>::zeros(m);

    for (row, &p) in unknown_order.iter().enumerate() {
        let i = p / cols;
        let j = p % cols;
        let l = left_ids[i];
        let r = right_ids[j];
        let nd = neighbor_data(left, l, right, r, dir, combiners);
        let (delta_num, delta_den) = ctx.delta(left, l, right, r, dir);
        let n_len = nd.neighbors.len();
        let denominator = 2.0 * (nd.u as f64 + nd.v as f64 + n_len as f64 + delta_den);

        let mut known_sum = 0.0;
        a[(row, row)] += denominator;
        for &(ln, rn) in &nd.neighbors {
            let q = pair_index(left_idx[&ln], right_idx[&rn]);
            if let Some(&kv) = known.get(&q) {
                known_sum += kv;
            } else {
                let col = unknown_pos[&q];
                a[(row, col)] -= alpha;
            }
        }
        if a[(row, row)] == 0.0 && n_len == 0 {
            a[(row, row)] = 1.0;
        }
        b[row] = n_len as f64 + alpha * known_sum + delta_num;
    }

    let lu = a.lu();
    let x = lu.solve(&b).ok_or_else(|| {
        DiffError::Numerical("global score system is singular".to_string())
    })?;

    for (row, &p) in unknown_order.iter().enumerate() {
        let v = x[row];
        if !(-1.0..=1.0).contains(&v) {
            return Err(DiffError::Precondition(format!(
                "global score {v} at pair index {p} outside [-1,1]"
            )));
        }
        result[p] = v;
    }
    Ok(result)
}

impl<S, T, C: DirectionalContext<S, T>> Scorer<S, T> for GlobalScorer<C> {
    fn score(&self, left: &Graph<S, T>, right: &Graph<S, T>, combiners: &Combiners<S, T>) -> Result<Scores> {
        let start = std::time::Instant::now();
        require_nonempty(left, right)?;
        check_alpha(self.alpha)?;

        let left_ids: Vec<StateId> = left.states().collect();
        let right_ids: Vec<StateId> = right.states().collect();
        let left_idx: HashMap<StateId, usize> = left_ids.iter().enumerate().map(|(i, &s)| (s, i)).collect();
        let right_idx: HashMap<StateId, usize> = right_ids.iter().enumerate().map(|(i, &s)| (s, i)).collect();

        let fwd = solve_direction(
            left,
            right,
            Direction::Forward,
            combiners,
            &self.context,
            self.alpha,
            self.optimize_statically_determinable_scores,
            &left_ids,
            &right_ids,
            &left_idx,
            &right_idx,
        )?;
        let bwd = solve_direction(
            left,
            right,
            Direction::Backward,
            combiners,
            &self.context,
            self.alpha,
            self.optimize_statically_determinable_scores,
            &left_ids,
            &right_ids,
            &left_idx,
            &right_idx,
        )?;

        let matrix = finalize(&fwd, &bwd, left_ids.len(), right_ids.len());
        tracing::debug!(
            "global scorer over {}x{} states took {} microseconds",
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
